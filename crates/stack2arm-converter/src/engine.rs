use serde_json::{json, Map, Value as Json};
use stack2arm_core::{Diagnostics, Resource};

use crate::config::Config;
use crate::context::Context;
use crate::error::ConvertError;
use crate::translators::{translator_for, ResourceTranslator};

/// Result of converting a source template into an ARM document.
#[derive(Debug)]
pub struct ConvertResult {
    /// The assembled ARM template, ready for serialization.
    pub document: Json,
    pub diagnostics: Diagnostics,
}

/// Converts Heat or CFN template text into an ARM template document.
///
/// Resources with no registered translator are skipped with a warning;
/// everything else either translates fully or fails the whole run.
pub fn convert_template(source: &str, config: &Config) -> Result<ConvertResult, ConvertError> {
    let (mut template, resources) = stack2arm_core::parse_template(source)?;
    let mut diags = template.take_diagnostics();

    let mut translated: Vec<(&Resource, &'static dyn ResourceTranslator)> = Vec::new();
    for resource in resources.values() {
        match translator_for(resource.type_name()) {
            Some(translator) => translated.push((resource, translator)),
            None => diags.warning(
                format!(
                    "no ARM translation for resource type '{}'",
                    resource.type_name()
                ),
                format!("skipping resource '{}'", resource.name),
            ),
        }
    }

    let mut ctx = Context::new(config, &resources);

    // Two phases: every resource's primary output exists before any
    // cross-resource fixup runs.
    for (resource, translator) in &translated {
        translator.translate(resource, &mut ctx, &mut diags)?;
    }
    for (resource, translator) in &translated {
        translator.update_context(resource, &mut ctx, &mut diags)?;
    }

    let data = ctx.finalize();

    let mut document = Map::new();
    document.insert(
        "contentVersion".to_string(),
        json!(config.template_version),
    );
    document.insert("$schema".to_string(), json!(config.schema_url));
    document.insert("parameters".to_string(), Json::Object(data.parameters));
    document.insert("variables".to_string(), Json::Object(data.variables));
    document.insert("resources".to_string(), Json::Array(data.resources));

    Ok(ConvertResult {
        document: Json::Object(document),
        diagnostics: diags,
    })
}
