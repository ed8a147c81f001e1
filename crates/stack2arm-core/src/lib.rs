//! Template parsing and intrinsic-function reduction for CloudFormation
//! and Heat templates.
//!
//! The pipeline is: parse the text into a [`Template`], run
//! [`Template::reduce_functions`] to replace every intrinsic-function
//! application with its literal result, then [`Template::parse_resources`]
//! to obtain the normalized [`Resource`] entities a translation layer
//! consumes.

pub mod diag;
pub mod dialect;
pub mod error;
pub mod functions;
pub mod resource;
pub mod template;
pub mod value;

use std::collections::BTreeMap;
use std::path::Path;

pub use diag::{Diagnostic, Diagnostics, Severity};
pub use dialect::{Dialect, FunctionKind};
pub use error::ParseError;
pub use resource::Resource;
pub use template::Template;
pub use value::Value;

/// Runs the full pipeline over template text: parse, reduce, extract.
pub fn parse_template(
    source: &str,
) -> Result<(Template, BTreeMap<String, Resource>), ParseError> {
    let mut template = Template::parse(source)?;
    template.reduce_functions()?;
    let resources = template.parse_resources()?;
    Ok((template, resources))
}

/// Reads a template file and runs the full pipeline over its contents.
pub fn parse_file(
    path: impl AsRef<Path>,
) -> Result<(Template, BTreeMap<String, Resource>), ParseError> {
    let source = std::fs::read_to_string(path)
        .map_err(|e| ParseError::TemplateData(format!("could not read template file: {}", e)))?;
    parse_template(&source)
}
