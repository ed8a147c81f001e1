/// Errors raised while parsing a template or reducing its functions.
///
/// Every variant is fatal to the whole template: there is no partial
/// recovery, since a translation with a hole in it is worthless.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("failed to parse template text: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid template data: {0}")]
    TemplateData(String),

    #[error("{}", unknown_dialect_msg(.field, .suggestion.as_deref()))]
    UnknownDialect {
        field: String,
        suggestion: Option<String>,
    },

    #[error("missing template field '{0}'")]
    MissingField(String),

    #[error("resource has no name")]
    ResourceNameMissing,

    #[error("resource '{name}' has no '{type_field}' field")]
    ResourceTypeMissing { name: String, type_field: String },

    #[error("'{function}': invalid arguments: {reason}")]
    FunctionArgument { function: String, reason: String },

    #[error("'{function}': {reason}")]
    FunctionApplication { function: String, reason: String },
}

fn unknown_dialect_msg(field: &str, suggestion: Option<&str>) -> String {
    match suggestion {
        Some(s) => format!(
            "template top-level fields match no known dialect; '{}' looks closest to '{}'",
            field, s
        ),
        None => "template top-level fields match no known dialect".to_string(),
    }
}

impl ParseError {
    /// Builds an argument-shape error for the named function.
    pub fn argument(function: &str, reason: impl Into<String>) -> Self {
        ParseError::FunctionArgument {
            function: function.to_string(),
            reason: reason.into(),
        }
    }

    /// Builds an application error for the named function.
    pub fn application(function: &str, reason: impl Into<String>) -> Self {
        ParseError::FunctionApplication {
            function: function.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ParseError::MissingField("Resources".to_string());
        assert_eq!(err.to_string(), "missing template field 'Resources'");

        let err = ParseError::argument("Fn::Join", "expected two arguments");
        assert_eq!(
            err.to_string(),
            "'Fn::Join': invalid arguments: expected two arguments"
        );

        let err = ParseError::ResourceTypeMissing {
            name: "web".to_string(),
            type_field: "Type".to_string(),
        };
        assert_eq!(err.to_string(), "resource 'web' has no 'Type' field");
    }

    #[test]
    fn test_unknown_dialect_display() {
        let err = ParseError::UnknownDialect {
            field: "Parameter".to_string(),
            suggestion: Some("Parameters".to_string()),
        };
        let msg = err.to_string();
        assert!(msg.contains("no known dialect"));
        assert!(msg.contains("'Parameter' looks closest to 'Parameters'"));

        let err = ParseError::UnknownDialect {
            field: "bogus".to_string(),
            suggestion: None,
        };
        assert!(!err.to_string().contains("closest"));
    }
}
