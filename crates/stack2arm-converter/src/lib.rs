//! Translation of Heat and CloudFormation templates into Azure ARM
//! templates.
//!
//! The core crate turns template text into reduced [`Resource`] entities;
//! this crate maps each entity onto its ARM counterpart through a
//! per-source-type translator and assembles the output document.
//!
//! [`Resource`]: stack2arm_core::Resource

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod names;
pub mod translators;

pub use config::Config;
pub use engine::{convert_template, ConvertResult};
pub use error::ConvertError;
