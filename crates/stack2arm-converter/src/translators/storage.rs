//! Translators for data volumes and their attachments.
//!
//! Stand-alone volumes have no direct ARM equivalent; each one becomes a
//! size parameter plus a blob URI variable. The attachment translators emit
//! nothing of their own: in the second phase they append a data disk to the
//! storage profile of the instance they point at.

use serde_json::json;
use stack2arm_core::{Diagnostics, Resource};

use crate::context::Context;
use crate::error::ConvertError;
use crate::names::{var_name, var_ref};
use crate::translators::{required_str, ResourceTranslator};

pub struct CinderVolumeTranslator;
pub struct EbsVolumeTranslator;
pub struct CinderVolumeAttachmentTranslator;
pub struct EbsVolumeAttachmentTranslator;

impl ResourceTranslator for CinderVolumeTranslator {
    fn source_type(&self) -> &'static str {
        "OS::Cinder::Volume"
    }

    fn translate(
        &self,
        resource: &Resource,
        ctx: &mut Context<'_>,
        _diags: &mut Diagnostics,
    ) -> Result<(), ConvertError> {
        emit_volume(resource, ctx);
        Ok(())
    }
}

impl ResourceTranslator for EbsVolumeTranslator {
    fn source_type(&self) -> &'static str {
        "AWS::EC2::Volume"
    }

    fn translate(
        &self,
        resource: &Resource,
        ctx: &mut Context<'_>,
        _diags: &mut Diagnostics,
    ) -> Result<(), ConvertError> {
        emit_volume(resource, ctx);
        Ok(())
    }
}

/// Emits the size parameter and blob URI variable backing a data volume.
fn emit_volume(resource: &Resource, ctx: &mut Context<'_>) {
    ctx.set_storage_account_required();

    let name = &resource.name;
    ctx.add_parameter(
        var_name("size", name),
        json!({
            "type": "string",
            "metadata": {
                "description": "Size of the data volume in gigabytes."
            }
        }),
    );
    ctx.add_variable(
        var_name("diskUri", name),
        json!(format!(
            "[concat('http://',parameters('newStorageAccountName'),\
             '.blob.core.windows.net/',\
             variables('vmStorageAccountContainerName'),'/{}.vhd')]",
            name
        )),
    );
}

impl ResourceTranslator for CinderVolumeAttachmentTranslator {
    fn source_type(&self) -> &'static str {
        "OS::Cinder::VolumeAttachment"
    }

    fn translate(
        &self,
        _resource: &Resource,
        _ctx: &mut Context<'_>,
        _diags: &mut Diagnostics,
    ) -> Result<(), ConvertError> {
        Ok(())
    }

    fn update_context(
        &self,
        resource: &Resource,
        ctx: &mut Context<'_>,
        _diags: &mut Diagnostics,
    ) -> Result<(), ConvertError> {
        attach_volume(
            resource,
            required_str(resource, "volume_id")?,
            required_str(resource, "instance_uuid")?,
            ctx,
        )
    }
}

impl ResourceTranslator for EbsVolumeAttachmentTranslator {
    fn source_type(&self) -> &'static str {
        "AWS::EC2::VolumeAttachment"
    }

    fn translate(
        &self,
        _resource: &Resource,
        _ctx: &mut Context<'_>,
        _diags: &mut Diagnostics,
    ) -> Result<(), ConvertError> {
        Ok(())
    }

    fn update_context(
        &self,
        resource: &Resource,
        ctx: &mut Context<'_>,
        _diags: &mut Diagnostics,
    ) -> Result<(), ConvertError> {
        attach_volume(
            resource,
            required_str(resource, "VolumeId")?,
            required_str(resource, "InstanceId")?,
            ctx,
        )
    }
}

/// Appends the volume as a data disk on the instance's storage profile.
///
/// The LUN is the disk's position in the list, so repeated attachments to
/// one instance land on distinct LUNs.
fn attach_volume(
    resource: &Resource,
    volume_name: &str,
    instance_name: &str,
    ctx: &mut Context<'_>,
) -> Result<(), ConvertError> {
    let vm_name = var_ref(&var_name("vmName", instance_name));
    let vm = ctx
        .resource_mut("Microsoft.Compute/virtualMachines", &vm_name)
        .ok_or_else(|| ConvertError::UnknownReferencedResource {
            name: resource.name.clone(),
        })?;

    let storage_profile = &mut vm["properties"]["storageProfile"];
    if !storage_profile["dataDisks"].is_array() {
        storage_profile["dataDisks"] = json!([]);
    }
    let lun = storage_profile["dataDisks"].as_array().map_or(0, Vec::len);
    let disk = json!({
        "name": volume_name,
        "diskSizeGB": format!("[parameters('{}')]", var_name("size", volume_name)),
        "lun": lun,
        "vhd": {
            "Uri": var_ref(&var_name("diskUri", volume_name))
        },
        "createOption": "Empty"
    });
    if let Some(disks) = storage_profile["dataDisks"].as_array_mut() {
        disks.push(disk);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    use crate::config::Config;
    use stack2arm_core::{Dialect, Value};

    fn heat_resource(name: &str, type_name: &str, props: Vec<(&str, &str)>) -> Resource {
        let data = Value::Map(vec![
            ("type".to_string(), Value::String(type_name.to_string())),
            (
                "properties".to_string(),
                Value::Map(
                    props
                        .into_iter()
                        .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
                        .collect(),
                ),
            ),
        ]);
        let mut diags = Diagnostics::new();
        Resource::from_raw(name, &data, Dialect::Heat.fields(), &mut diags).unwrap()
    }

    fn vm_stub(ctx: &mut Context<'_>, instance: &str) {
        ctx.add_resource(json!({
            "type": "Microsoft.Compute/virtualMachines",
            "name": format!("[variables('vmName_{}')]", instance),
            "properties": { "storageProfile": {} },
            "dependsOn": []
        }));
    }

    #[test]
    fn test_volume_emits_parameter_and_uri() {
        let config = Config::default();
        let volume = heat_resource("data_vol", "OS::Cinder::Volume", vec![("size", "10")]);
        let source = BTreeMap::new();

        let mut ctx = Context::new(&config, &source);
        let mut diags = Diagnostics::new();
        CinderVolumeTranslator
            .translate(&volume, &mut ctx, &mut diags)
            .unwrap();

        let data = ctx.finalize();
        assert!(data.parameters.contains_key("size_data_vol"));
        assert!(data
            .variables
            .get("diskUri_data_vol")
            .unwrap()
            .as_str()
            .unwrap()
            .contains("/data_vol.vhd"));
        // The volume itself is not an output resource, but it does force
        // the storage account into existence.
        assert_eq!(data.resources.len(), 1);
        assert_eq!(
            data.resources[0]["type"],
            json!("Microsoft.Storage/storageAccounts")
        );
    }

    #[test]
    fn test_attachment_appends_data_disk() {
        let config = Config::default();
        let attachment = heat_resource(
            "vol_attach",
            "OS::Cinder::VolumeAttachment",
            vec![("volume_id", "data_vol"), ("instance_uuid", "server")],
        );
        let source = BTreeMap::new();

        let mut ctx = Context::new(&config, &source);
        vm_stub(&mut ctx, "server");
        let mut diags = Diagnostics::new();
        CinderVolumeAttachmentTranslator
            .update_context(&attachment, &mut ctx, &mut diags)
            .unwrap();

        let data = ctx.finalize();
        let disks = data.resources[0]["properties"]["storageProfile"]["dataDisks"]
            .as_array()
            .unwrap();
        assert_eq!(disks.len(), 1);
        assert_eq!(disks[0]["lun"], json!(0));
        assert_eq!(
            disks[0]["diskSizeGB"],
            json!("[parameters('size_data_vol')]")
        );
    }

    #[test]
    fn test_second_attachment_gets_next_lun() {
        let config = Config::default();
        let first = heat_resource(
            "attach_a",
            "OS::Cinder::VolumeAttachment",
            vec![("volume_id", "vol_a"), ("instance_uuid", "server")],
        );
        let second = heat_resource(
            "attach_b",
            "OS::Cinder::VolumeAttachment",
            vec![("volume_id", "vol_b"), ("instance_uuid", "server")],
        );
        let source = BTreeMap::new();

        let mut ctx = Context::new(&config, &source);
        vm_stub(&mut ctx, "server");
        let mut diags = Diagnostics::new();
        CinderVolumeAttachmentTranslator
            .update_context(&first, &mut ctx, &mut diags)
            .unwrap();
        CinderVolumeAttachmentTranslator
            .update_context(&second, &mut ctx, &mut diags)
            .unwrap();

        let data = ctx.finalize();
        let disks = data.resources[0]["properties"]["storageProfile"]["dataDisks"]
            .as_array()
            .unwrap();
        assert_eq!(disks[1]["lun"], json!(1));
        assert_eq!(disks[1]["name"], json!("vol_b"));
    }

    #[test]
    fn test_attachment_to_unknown_instance_fails() {
        let config = Config::default();
        let attachment = heat_resource(
            "vol_attach",
            "OS::Cinder::VolumeAttachment",
            vec![("volume_id", "data_vol"), ("instance_uuid", "ghost")],
        );
        let source = BTreeMap::new();

        let mut ctx = Context::new(&config, &source);
        let mut diags = Diagnostics::new();
        let err = CinderVolumeAttachmentTranslator
            .update_context(&attachment, &mut ctx, &mut diags)
            .unwrap_err();
        assert!(matches!(err, ConvertError::UnknownReferencedResource { .. }));
    }
}
