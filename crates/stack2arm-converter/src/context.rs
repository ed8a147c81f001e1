use std::collections::BTreeMap;

use serde_json::{json, Map, Value as Json};
use stack2arm_core::Resource;

use crate::config::Config;
use crate::names::var_ref;

/// The shared state of one translation run.
///
/// Translators read the source resources and accumulate the parameters,
/// variables and resources of the output document here. Support-resource
/// needs (a storage account for disks, a virtual network for NIC-less VMs)
/// are flags on this instance; `finalize` materializes each flagged support
/// resource exactly once, no matter how many translators requested it.
pub struct Context<'a> {
    pub config: &'a Config,
    source: &'a BTreeMap<String, Resource>,
    parameters: Map<String, Json>,
    variables: Map<String, Json>,
    resources: Vec<Json>,
    availability_set_names: Vec<String>,
    storage_account_required: bool,
    virtual_network_required: bool,
}

/// The accumulated output sections, ready for document assembly.
pub struct TemplateData {
    pub parameters: Map<String, Json>,
    pub variables: Map<String, Json>,
    pub resources: Vec<Json>,
}

impl<'a> Context<'a> {
    pub fn new(config: &'a Config, source: &'a BTreeMap<String, Resource>) -> Self {
        let mut variables = Map::new();
        variables.insert("location".to_string(), json!(config.location));
        Context {
            config,
            source,
            parameters: Map::new(),
            variables,
            resources: Vec::new(),
            availability_set_names: Vec::new(),
            storage_account_required: false,
            virtual_network_required: false,
        }
    }

    pub fn add_parameter(&mut self, name: impl Into<String>, spec: Json) {
        self.parameters.insert(name.into(), spec);
    }

    pub fn add_variable(&mut self, name: impl Into<String>, value: impl Into<Json>) {
        self.variables.insert(name.into(), value.into());
    }

    pub fn add_resource(&mut self, resource: Json) {
        self.resources.push(resource);
    }

    pub fn set_storage_account_required(&mut self) {
        self.storage_account_required = true;
    }

    pub fn set_virtual_network_required(&mut self) {
        self.virtual_network_required = true;
    }

    /// Registers an availability set name. Returns true the first time the
    /// name is seen; the caller declares the backing resource exactly then.
    pub fn register_availability_set(&mut self, name: &str) -> bool {
        if self.availability_set_names.iter().any(|n| n == name) {
            return false;
        }
        self.availability_set_names.push(name.to_string());
        true
    }

    /// Looks up a source resource by its template name.
    pub fn source_resource(&self, name: &str) -> Option<&'a Resource> {
        self.source.get(name)
    }

    /// Returns every source resource whose named property equals `value`.
    pub fn source_resources_with_property(
        &self,
        key: &str,
        value: &str,
    ) -> Vec<&'a Resource> {
        self.source
            .values()
            .filter(|r| r.property_str(key) == Some(value))
            .collect()
    }

    /// Finds an already-emitted output resource by its type and name fields,
    /// for fixups in the second translation phase.
    pub fn resource_mut(&mut self, type_: &str, name: &str) -> Option<&mut Json> {
        self.resources.iter_mut().find(|r| {
            r.get("type").and_then(Json::as_str) == Some(type_)
                && r.get("name").and_then(Json::as_str) == Some(name)
        })
    }

    /// Materializes the flagged support resources and hands over the
    /// accumulated sections.
    pub fn finalize(mut self) -> TemplateData {
        if self.storage_account_required {
            self.emit_storage_account();
        }
        if self.virtual_network_required {
            self.emit_virtual_network();
        }
        TemplateData {
            parameters: self.parameters,
            variables: self.variables,
            resources: self.resources,
        }
    }

    fn emit_storage_account(&mut self) {
        self.parameters.insert(
            "newStorageAccountName".to_string(),
            json!({
                "type": "string",
                "metadata": {
                    "description": "Unique DNS Name for the Storage Account to \
                                    be used for the deployment."
                }
            }),
        );
        self.variables.insert(
            "storageAccountType".to_string(),
            json!(self.config.storage_account_type),
        );
        self.variables.insert(
            "vmStorageAccountContainerName".to_string(),
            json!(self.config.storage_container_name),
        );
        self.resources.push(json!({
            "type": "Microsoft.Storage/storageAccounts",
            "name": "[parameters('newStorageAccountName')]",
            "apiVersion": self.config.api_version,
            "location": var_ref("location"),
            "properties": {
                "accountType": var_ref("storageAccountType")
            }
        }));
    }

    fn emit_virtual_network(&mut self) {
        self.parameters.insert(
            "newVirtualNetworkName".to_string(),
            json!({
                "type": "string",
                "metadata": {
                    "description": "Name of the Virtual Network to be created \
                                    for supporting this deployment."
                }
            }),
        );
        self.variables.insert(
            "newVirtualNetworkRef".to_string(),
            json!(
                "[resourceId('Microsoft.Network/virtualNetworks', \
                 parameters('newVirtualNetworkName'))]"
            ),
        );
        self.variables
            .insert("defaultSubnetName".to_string(), json!("defaultVNSubnet"));
        self.variables.insert(
            "defaultSubnetRef".to_string(),
            json!(
                "[concat(variables('newVirtualNetworkRef'),'/subnets/',\
                 variables('defaultSubnetName'))]"
            ),
        );
        self.resources.push(json!({
            "type": "Microsoft.Network/virtualNetworks",
            "name": "[parameters('newVirtualNetworkName')]",
            "apiVersion": self.config.api_version,
            "location": var_ref("location"),
            "properties": {
                "subnets": [{
                    "name": var_ref("defaultSubnetName"),
                    "properties": {
                        "addressPrefix": "10.0.0.0/24"
                    }
                }],
                "addressSpace": {
                    "addressPrefixes": ["10.0.0.0/24"]
                }
            }
        }));
    }
}
