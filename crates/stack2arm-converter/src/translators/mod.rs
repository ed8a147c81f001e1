pub mod instances;
pub mod networking;
pub mod storage;

use stack2arm_core::{Diagnostics, Resource};

use crate::context::Context;
use crate::error::ConvertError;

/// One source-resource-type to ARM translation.
///
/// The run is two-phased: `translate` is called on every resource before
/// `update_context` is called on any, so the second phase can rely on every
/// resource's primary output already being in the context. Cross-resource
/// fixups (attaching a disk to a VM, wiring a default NIC) belong in the
/// second phase only.
pub trait ResourceTranslator: Sync {
    /// The source resource type this translator handles.
    fn source_type(&self) -> &'static str;

    /// Phase one: emit this resource's parameters, variables and resources.
    fn translate(
        &self,
        resource: &Resource,
        ctx: &mut Context<'_>,
        diags: &mut Diagnostics,
    ) -> Result<(), ConvertError>;

    /// Phase two: fix up resources emitted in phase one.
    fn update_context(
        &self,
        _resource: &Resource,
        _ctx: &mut Context<'_>,
        _diags: &mut Diagnostics,
    ) -> Result<(), ConvertError> {
        Ok(())
    }
}

static TRANSLATORS: &[&dyn ResourceTranslator] = &[
    &instances::NovaServerTranslator,
    &instances::Ec2InstanceTranslator,
    &networking::NeutronNetTranslator,
    &networking::NeutronSubnetTranslator,
    &networking::NeutronPortTranslator,
    &networking::NeutronSecurityGroupTranslator,
    &networking::Ec2SecurityGroupTranslator,
    &storage::CinderVolumeTranslator,
    &storage::EbsVolumeTranslator,
    &storage::CinderVolumeAttachmentTranslator,
    &storage::EbsVolumeAttachmentTranslator,
];

/// Finds the translator for a source resource type, if one exists.
pub fn translator_for(type_name: &str) -> Option<&'static dyn ResourceTranslator> {
    TRANSLATORS
        .iter()
        .find(|t| t.source_type() == type_name)
        .copied()
}

/// Fetches a string property, failing with the resource and property names.
pub(crate) fn required_str<'r>(
    resource: &'r Resource,
    key: &str,
) -> Result<&'r str, ConvertError> {
    resource
        .property_str(key)
        .ok_or_else(|| ConvertError::MissingProperty {
            resource: resource.name.clone(),
            property: key.to_string(),
        })
}
