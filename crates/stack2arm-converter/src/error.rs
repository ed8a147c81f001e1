use stack2arm_core::ParseError;

/// Errors raised while translating parsed resources into an ARM template.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("failed to read config file: {0}")]
    ConfigIo(std::io::Error),

    #[error("failed to parse config file: {0}")]
    ConfigFormat(#[from] serde_yaml::Error),

    #[error("resource '{resource}' has no '{property}' property")]
    MissingProperty { resource: String, property: String },

    #[error(
        "image '{image}' cannot be mapped to an Azure equivalent; \
         update the '{map_option}' configuration option"
    )]
    UnmappableImage { image: String, map_option: String },

    #[error(
        "image mapping '{entry}' is not valid Azure image data; \
         the required format is 'publisher;offer;sku'"
    )]
    InvalidImageMapping { entry: String },

    #[error("security group '{group}' rule {rule}: missing '{field}' field")]
    SecurityGroupMissingField {
        group: String,
        rule: usize,
        field: String,
    },

    #[error(
        "security group '{group}' rule {rule}: invalid protocol '{protocol}'; \
         valid protocols are 'tcp', 'udp' and '*'"
    )]
    SecurityGroupInvalidProtocol {
        group: String,
        rule: usize,
        protocol: String,
    },

    #[error("'{name}' does not name a resource of the deployment")]
    UnknownReferencedResource { name: String },

    #[error("failed to render output: {0}")]
    Render(#[from] serde_json::Error),

    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ConvertError::MissingProperty {
            resource: "server".to_string(),
            property: "flavor".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "resource 'server' has no 'flavor' property"
        );

        let err = ConvertError::SecurityGroupInvalidProtocol {
            group: "web_sg".to_string(),
            rule: 2,
            protocol: "icmp".to_string(),
        };
        assert!(err.to_string().contains("invalid protocol 'icmp'"));
    }
}
