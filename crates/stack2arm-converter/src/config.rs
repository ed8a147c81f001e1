use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::ConvertError;

/// Converter settings, loadable from a YAML file.
///
/// Every field has a default, so a config file only needs to name the
/// options it overrides. The struct is passed explicitly to whoever needs
/// it; there is no process-wide configuration state.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// The Azure location used for every translated resource.
    pub location: String,
    /// The type of storage account backing the deployment.
    pub storage_account_type: String,
    /// The name of the storage container holding VM disks.
    pub storage_container_name: String,
    /// The ARM API version resources are declared against.
    pub api_version: String,
    /// URL stamped into the output's `$schema` field.
    pub schema_url: String,
    /// Version stamped onto the resulting template.
    pub template_version: String,
    /// Nova flavor name to Azure VM size.
    pub nova_flavor_to_size_map: BTreeMap<String, String>,
    /// Nova image name to Azure image data (`publisher;offer;sku`).
    pub nova_vm_image_map: BTreeMap<String, String>,
    /// EC2 instance type to Azure VM size.
    pub ec2_flavor_to_size_map: BTreeMap<String, String>,
    /// EC2 image name to Azure image data (`publisher;offer;sku`).
    pub ec2_vm_image_map: BTreeMap<String, String>,
    /// The VM size used when a flavor has no mapping.
    pub vm_default_size: String,
}

impl Default for Config {
    fn default() -> Self {
        let flavor_map: BTreeMap<String, String> = [
            ("m1.tiny", "Basic_A0"),
            ("m1.small", "Basic_A1"),
            ("m1.medium", "Basic_A2"),
            ("m1.large", "Basic_A3"),
            ("m1.xlarge", "Basic_A4"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Config {
            location: "West US".to_string(),
            storage_account_type: "Standard_LRS".to_string(),
            storage_container_name: "vhds".to_string(),
            api_version: "2015-05-01-preview".to_string(),
            schema_url: "https://schema.management.azure.com/schemas/\
                         2015-01-01/deploymentTemplate.json#"
                .to_string(),
            template_version: "1.0.0.0".to_string(),
            nova_flavor_to_size_map: flavor_map.clone(),
            nova_vm_image_map: [(
                "ubuntu.12.04.LTS.x86_64",
                "Canonical;UbuntuServer;12.04.5-LTS",
            )]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
            ec2_flavor_to_size_map: flavor_map,
            ec2_vm_image_map: [
                ("U10-x86_64-cfntools", "Canonical;UbuntuServer;12.04.5-LTS"),
                ("F17-x86_64-cfntools", "Canonical;UbuntuServer;12.04.5-LTS"),
            ]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
            vm_default_size: "Basic_A1".to_string(),
        }
    }
}

impl Config {
    /// Loads settings from a YAML file, filling unset options with defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Config, ConvertError> {
        let text = std::fs::read_to_string(path).map_err(ConvertError::ConfigIo)?;
        Ok(serde_yaml::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.location, "West US");
        assert_eq!(config.api_version, "2015-05-01-preview");
        assert_eq!(
            config.nova_flavor_to_size_map.get("m1.small").unwrap(),
            "Basic_A1"
        );
        assert_eq!(config.vm_default_size, "Basic_A1");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "location: North Europe\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.location, "North Europe");
        assert_eq!(config.storage_container_name, "vhds");
    }

    #[test]
    fn test_unknown_option_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "locaton: typo\n").unwrap();

        assert!(matches!(
            Config::from_file(&path),
            Err(ConvertError::ConfigFormat(_))
        ));
    }
}
