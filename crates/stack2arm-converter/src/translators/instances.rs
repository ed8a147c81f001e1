//! Translators for compute instances (Nova servers and EC2 instances).
//!
//! Both map onto `Microsoft.Compute/virtualMachines` through a shared
//! builder; they differ in property names, in the flavor/image maps they
//! consult, and in the EC2 extras (availability sets, port back-references).

use base64::Engine;
use serde_json::{json, Value as Json};
use stack2arm_core::{Diagnostics, Resource};

use crate::context::Context;
use crate::error::ConvertError;
use crate::names::{computer_name, param_ref, var_name, var_ref};
use crate::translators::{required_str, ResourceTranslator};

pub struct NovaServerTranslator;
pub struct Ec2InstanceTranslator;

impl ResourceTranslator for NovaServerTranslator {
    fn source_type(&self) -> &'static str {
        "OS::Nova::Server"
    }

    fn translate(
        &self,
        resource: &Resource,
        ctx: &mut Context<'_>,
        diags: &mut Diagnostics,
    ) -> Result<(), ConvertError> {
        let size = azure_size(
            required_str(resource, "flavor")?,
            &ctx.config.nova_flavor_to_size_map,
            "nova_flavor_to_size_map",
            &ctx.config.vm_default_size,
            diags,
        );
        let image = azure_image(
            required_str(resource, "image")?,
            &ctx.config.nova_vm_image_map,
            "nova_vm_image_map",
        )?;

        let spec = VmSpec {
            size,
            image,
            user_data: resource.property_str("user_data").map(str::to_string),
            port_names: nova_port_names(resource),
            availability_zone: None,
        };
        emit_vm(resource, &spec, ctx)
    }

    fn update_context(
        &self,
        resource: &Resource,
        ctx: &mut Context<'_>,
        _diags: &mut Diagnostics,
    ) -> Result<(), ConvertError> {
        wire_default_nic(resource, &nova_port_names(resource), ctx)
    }
}

impl ResourceTranslator for Ec2InstanceTranslator {
    fn source_type(&self) -> &'static str {
        "AWS::EC2::Instance"
    }

    fn translate(
        &self,
        resource: &Resource,
        ctx: &mut Context<'_>,
        diags: &mut Diagnostics,
    ) -> Result<(), ConvertError> {
        let size = azure_size(
            required_str(resource, "InstanceType")?,
            &ctx.config.ec2_flavor_to_size_map,
            "ec2_flavor_to_size_map",
            &ctx.config.vm_default_size,
            diags,
        );
        let image = azure_image(
            required_str(resource, "ImageId")?,
            &ctx.config.ec2_vm_image_map,
            "ec2_vm_image_map",
        )?;

        let spec = VmSpec {
            size,
            image,
            user_data: resource.property_str("UserData").map(str::to_string),
            port_names: ec2_port_names(resource, ctx),
            availability_zone: resource
                .property_str("AvailabilityZone")
                .map(str::to_string),
        };
        emit_vm(resource, &spec, ctx)
    }

    fn update_context(
        &self,
        resource: &Resource,
        ctx: &mut Context<'_>,
        _diags: &mut Diagnostics,
    ) -> Result<(), ConvertError> {
        let port_names = ec2_port_names(resource, ctx);
        wire_default_nic(resource, &port_names, ctx)?;

        if let Some(zone) = resource.property_str("AvailabilityZone") {
            declare_availability_set(resource, zone, ctx)?;
        }
        Ok(())
    }
}

/// The dialect-independent inputs of the shared VM builder.
struct VmSpec {
    size: String,
    image: AzureImage,
    user_data: Option<String>,
    port_names: Vec<String>,
    availability_zone: Option<String>,
}

struct AzureImage {
    publisher: String,
    offer: String,
    sku: String,
}

/// Maps a source flavor onto an Azure VM size, defaulting with a warning
/// when the flavor has no mapping.
fn azure_size(
    flavor: &str,
    map: &std::collections::BTreeMap<String, String>,
    map_option: &str,
    default: &str,
    diags: &mut Diagnostics,
) -> String {
    match map.get(flavor) {
        Some(size) => size.clone(),
        None => {
            diags.warning(
                format!("no mapping for flavor '{}' in '{}'", flavor, map_option),
                format!("defaulting to VM size '{}'", default),
            );
            default.to_string()
        }
    }
}

/// Maps a source image name onto Azure image data. The mapping value must
/// be of the form `publisher;offer;sku`.
fn azure_image(
    image: &str,
    map: &std::collections::BTreeMap<String, String>,
    map_option: &str,
) -> Result<AzureImage, ConvertError> {
    let entry = map.get(image).ok_or_else(|| ConvertError::UnmappableImage {
        image: image.to_string(),
        map_option: map_option.to_string(),
    })?;

    let parts: Vec<&str> = entry.split(';').collect();
    if parts.len() != 3 {
        return Err(ConvertError::InvalidImageMapping {
            entry: entry.clone(),
        });
    }
    Ok(AzureImage {
        publisher: parts[0].to_string(),
        offer: parts[1].to_string(),
        sku: parts[2].to_string(),
    })
}

/// Names of the port resources a Nova server references in its `networks`.
fn nova_port_names(resource: &Resource) -> Vec<String> {
    let mut names = Vec::new();
    if let Some(networks) = resource.property("networks").and_then(|v| v.as_list()) {
        for entry in networks {
            if let Some(port) = entry.get("port").and_then(|v| v.as_str()) {
                names.push(port.to_string());
            }
        }
    }
    names
}

/// Names of the port resources that reference an EC2 instance through
/// their `device_id`.
fn ec2_port_names(resource: &Resource, ctx: &Context<'_>) -> Vec<String> {
    ctx.source_resources_with_property("device_id", &resource.name)
        .into_iter()
        .filter(|r| r.type_name() == "OS::Neutron::Port")
        .map(|r| r.name.clone())
        .collect()
}

/// Emits the parameters, variables and the virtualMachines resource shared
/// by every instance translation.
fn emit_vm(
    resource: &Resource,
    spec: &VmSpec,
    ctx: &mut Context<'_>,
) -> Result<(), ConvertError> {
    ctx.set_storage_account_required();

    ctx.add_parameter(
        "adminUsername",
        json!({
            "type": "string",
            "metadata": { "description": "User name for the Virtual Machine." }
        }),
    );
    ctx.add_parameter(
        "adminPassword",
        json!({
            "type": "securestring",
            "metadata": { "description": "Password for the Virtual Machine." }
        }),
    );

    let name = &resource.name;
    ctx.add_variable(var_name("vmName", name), json!(name));
    ctx.add_variable(var_name("vmSize", name), json!(spec.size));
    ctx.add_variable(var_name("imgPublisher", name), json!(spec.image.publisher));
    ctx.add_variable(var_name("imgOffer", name), json!(spec.image.offer));
    ctx.add_variable(var_name("imgSku", name), json!(spec.image.sku));

    let mut os_profile = json!({
        "computerName": computer_name(name),
        "adminUsername": param_ref("adminUsername"),
        "adminPassword": param_ref("adminPassword"),
    });
    if let Some(user_data) = spec.user_data.as_deref().filter(|u| !u.is_empty()) {
        // Encoded here once; referencing a variable sidesteps JSON escaping
        // issues with multi-line scripts.
        let encoded = base64::engine::general_purpose::STANDARD.encode(user_data);
        ctx.add_variable(var_name("customData", name), json!(encoded));
        os_profile["customData"] = json!(var_ref(&var_name("customData", name)));
    }

    let nics: Vec<Json> = spec
        .port_names
        .iter()
        .map(|port| {
            json!({
                "id": format!(
                    "[resourceId('Microsoft.Network/networkInterfaces', \
                     variables('{}'))]",
                    var_name("nicName", port)
                )
            })
        })
        .collect();
    if nics.is_empty() {
        ctx.set_virtual_network_required();
    }

    let mut depends_on = vec![json!(
        "[concat('Microsoft.Storage/storageAccounts/', \
         parameters('newStorageAccountName'))]"
    )];
    for port in &spec.port_names {
        depends_on.push(json!(format!(
            "[concat('Microsoft.Network/networkInterfaces/', variables('{}'))]",
            var_name("nicName", port)
        )));
    }

    let mut properties = json!({
        "hardwareProfile": {
            "vmSize": var_ref(&var_name("vmSize", name))
        },
        "storageProfile": {
            "imageReference": {
                "publisher": var_ref(&var_name("imgPublisher", name)),
                "offer": var_ref(&var_name("imgOffer", name)),
                "sku": var_ref(&var_name("imgSku", name)),
                "version": "latest"
            },
            "osDisk": {
                "name": "osdisk",
                "vhd": {
                    "uri": format!(
                        "[concat('http://',parameters('newStorageAccountName'),\
                         '.blob.core.windows.net/',\
                         variables('vmStorageAccountContainerName'),'/',\
                         variables('{}'),'_root.vhd')]",
                        var_name("vmName", name)
                    )
                },
                "caching": "ReadWrite",
                "createOption": "FromImage"
            }
        },
        "osProfile": os_profile,
        "networkProfile": {
            "networkInterfaces": nics
        }
    });

    if let Some(zone) = &spec.availability_zone {
        properties["availabilitySet"] = json!({
            "id": format!(
                "[resourceId('Microsoft.Compute/availabilitySets',\
                 variables('{}'))]",
                var_name("availabilitySetName", zone)
            )
        });
    }

    ctx.add_resource(json!({
        "apiVersion": ctx.config.api_version,
        "type": "Microsoft.Compute/virtualMachines",
        "name": var_ref(&var_name("vmName", name)),
        "location": var_ref("location"),
        "properties": properties,
        "dependsOn": depends_on
    }));

    Ok(())
}

/// When an instance references no ports, attaches it to the deployment's
/// default virtual network through a generated NIC.
fn wire_default_nic(
    resource: &Resource,
    port_names: &[String],
    ctx: &mut Context<'_>,
) -> Result<(), ConvertError> {
    if !port_names.is_empty() {
        return Ok(());
    }

    let name = &resource.name;
    let nic_var = format!("nicName_VM_{}", name);
    let nic_name = format!("nic_VM_{}", name);
    ctx.add_variable(nic_var.clone(), json!(nic_name));

    let vm_name = var_ref(&var_name("vmName", name));
    let vm = ctx
        .resource_mut("Microsoft.Compute/virtualMachines", &vm_name)
        .ok_or_else(|| ConvertError::UnknownReferencedResource { name: name.clone() })?;

    if let Some(depends) = vm.get_mut("dependsOn").and_then(Json::as_array_mut) {
        depends.push(json!(
            "[concat('Microsoft.Network/virtualNetworks/', \
             parameters('newVirtualNetworkName'))]"
        ));
        depends.push(json!(format!(
            "[concat('Microsoft.Network/networkInterfaces/', variables('{}'))]",
            nic_var
        )));
    }
    vm["properties"]["networkProfile"]["networkInterfaces"] = json!([{
        "id": format!(
            "[resourceId('Microsoft.Network/networkInterfaces', \
             variables('{}'))]",
            nic_var
        )
    }]);

    ctx.add_resource(json!({
        "name": var_ref(&nic_var),
        "apiVersion": ctx.config.api_version,
        "location": var_ref("location"),
        "type": "Microsoft.Network/networkInterfaces",
        "dependsOn": [
            "[concat('Microsoft.Network/virtualNetworks/', \
             parameters('newVirtualNetworkName'))]"
        ],
        "properties": {
            "ipConfigurations": [{
                "name": format!("ipConfig_{}", nic_name),
                "properties": {
                    "subnet": { "id": var_ref("defaultSubnetRef") },
                    "privateIPAllocationMethod": "Dynamic"
                }
            }]
        }
    }));

    Ok(())
}

/// Declares the availability set backing an EC2 availability zone, once per
/// zone, and lists it as a dependency of the instance.
fn declare_availability_set(
    resource: &Resource,
    zone: &str,
    ctx: &mut Context<'_>,
) -> Result<(), ConvertError> {
    let set_var = var_name("availabilitySetName", zone);

    let vm_name = var_ref(&var_name("vmName", &resource.name));
    let vm = ctx
        .resource_mut("Microsoft.Compute/virtualMachines", &vm_name)
        .ok_or_else(|| ConvertError::UnknownReferencedResource {
            name: resource.name.clone(),
        })?;
    if let Some(depends) = vm.get_mut("dependsOn").and_then(Json::as_array_mut) {
        depends.push(json!(format!(
            "[concat('Microsoft.Compute/availabilitySets/',variables('{}'))]",
            set_var
        )));
    }

    if ctx.register_availability_set(zone) {
        ctx.add_variable(set_var.clone(), json!(format!("availabilitySet_{}", zone)));
        ctx.add_resource(json!({
            "apiVersion": ctx.config.api_version,
            "type": "Microsoft.Compute/availabilitySets",
            "name": var_ref(&set_var),
            "location": var_ref("location"),
            "properties": {}
        }));
    }
    Ok(())
}
