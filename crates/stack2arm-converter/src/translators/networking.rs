//! Translators for networking resources.
//!
//! Neutron networks have no stand-alone ARM equivalent: the net translator
//! only defines naming variables, and the subnet translator declares the
//! actual virtual network. Ports become network interfaces; security groups
//! of either dialect become network security groups.

use serde_json::{json, Value as Json};
use stack2arm_core::{Diagnostics, Resource, Value};

use crate::context::Context;
use crate::error::ConvertError;
use crate::names::{var_name, var_ref};
use crate::translators::{required_str, ResourceTranslator};

pub struct NeutronNetTranslator;
pub struct NeutronSubnetTranslator;
pub struct NeutronPortTranslator;
pub struct NeutronSecurityGroupTranslator;
pub struct Ec2SecurityGroupTranslator;

impl ResourceTranslator for NeutronNetTranslator {
    fn source_type(&self) -> &'static str {
        "OS::Neutron::Net"
    }

    fn translate(
        &self,
        resource: &Resource,
        ctx: &mut Context<'_>,
        _diags: &mut Diagnostics,
    ) -> Result<(), ConvertError> {
        let name = &resource.name;
        ctx.add_variable(var_name("virtualNetworkName", name), json!(name));
        ctx.add_variable(
            var_name("virtualNetworkSubnetName", name),
            json!(format!("{}_subnet1", name)),
        );
        ctx.add_variable(
            var_name("virtualNetworkName_ref", name),
            json!(format!(
                "[resourceId('Microsoft.Network/virtualNetworks', \
                 variables('{}'))]",
                var_name("virtualNetworkName", name)
            )),
        );
        ctx.add_variable(
            var_name("virtualNetworkSubnetName_ref", name),
            json!(format!(
                "[concat(variables('{}'),'/subnets/',variables('{}'))]",
                var_name("virtualNetworkName_ref", name),
                var_name("virtualNetworkSubnetName", name)
            )),
        );
        Ok(())
    }
}

impl ResourceTranslator for NeutronSubnetTranslator {
    fn source_type(&self) -> &'static str {
        "OS::Neutron::Subnet"
    }

    fn translate(
        &self,
        resource: &Resource,
        ctx: &mut Context<'_>,
        _diags: &mut Diagnostics,
    ) -> Result<(), ConvertError> {
        let cidr = required_str(resource, "cidr")?;
        ctx.add_variable(var_name("subNetAddressPrefix", &resource.name), json!(cidr));

        let net_name = referenced_net_name(resource, ctx)?;
        ctx.add_resource(json!({
            "apiVersion": ctx.config.api_version,
            "type": "Microsoft.Network/virtualNetworks",
            "name": var_ref(&var_name("virtualNetworkName", &net_name)),
            "location": var_ref("location"),
            "properties": {
                "addressSpace": {
                    "addressPrefixes": [
                        var_ref(&var_name("subNetAddressPrefix", &resource.name))
                    ]
                },
                "subnets": [{
                    "name": var_ref(&var_name("virtualNetworkSubnetName", &net_name)),
                    "properties": {
                        "addressPrefix":
                            var_ref(&var_name("subNetAddressPrefix", &resource.name))
                    }
                }]
            }
        }));
        Ok(())
    }
}

impl ResourceTranslator for NeutronPortTranslator {
    fn source_type(&self) -> &'static str {
        "OS::Neutron::Port"
    }

    fn translate(
        &self,
        resource: &Resource,
        ctx: &mut Context<'_>,
        _diags: &mut Diagnostics,
    ) -> Result<(), ConvertError> {
        let name = &resource.name;
        ctx.add_variable(var_name("nicName", name), json!(name));

        let net_name = referenced_net_name(resource, ctx)?;
        ctx.add_resource(json!({
            "apiVersion": ctx.config.api_version,
            "type": "Microsoft.Network/networkInterfaces",
            "name": var_ref(&var_name("nicName", name)),
            "location": var_ref("location"),
            "dependsOn": [
                format!(
                    "[concat('Microsoft.Network/virtualNetworks/', \
                     variables('{}'))]",
                    var_name("virtualNetworkName", &net_name)
                )
            ],
            "properties": {
                "ipConfigurations": [{
                    "name": format!("ipconfig{}", name),
                    "properties": {
                        "privateIPAllocationMethod": "Dynamic",
                        "subnet": {
                            "id": var_ref(&var_name(
                                "virtualNetworkSubnetName_ref",
                                &net_name
                            ))
                        }
                    }
                }]
            }
        }));
        Ok(())
    }
}

/// Resolves the source network resource a subnet or port points at through
/// its `network_id` property.
fn referenced_net_name(
    resource: &Resource,
    ctx: &Context<'_>,
) -> Result<String, ConvertError> {
    let net_name = required_str(resource, "network_id")?;
    let net = ctx.source_resource(net_name).ok_or_else(|| {
        ConvertError::UnknownReferencedResource {
            name: net_name.to_string(),
        }
    })?;
    Ok(net.name.clone())
}

impl ResourceTranslator for NeutronSecurityGroupTranslator {
    fn source_type(&self) -> &'static str {
        "OS::Neutron::SecurityGroup"
    }

    fn translate(
        &self,
        resource: &Resource,
        ctx: &mut Context<'_>,
        _diags: &mut Diagnostics,
    ) -> Result<(), ConvertError> {
        let rules = neutron_rules(resource)?;
        emit_security_group(resource, rules, ctx);
        Ok(())
    }
}

impl ResourceTranslator for Ec2SecurityGroupTranslator {
    fn source_type(&self) -> &'static str {
        "AWS::EC2::SecurityGroup"
    }

    fn translate(
        &self,
        resource: &Resource,
        ctx: &mut Context<'_>,
        _diags: &mut Diagnostics,
    ) -> Result<(), ConvertError> {
        let rules = ec2_rules(resource)?;
        emit_security_group(resource, rules, ctx);
        Ok(())
    }
}

/// Emits the networkSecurityGroups resource shared by both dialects.
fn emit_security_group(resource: &Resource, rules: Vec<Json>, ctx: &mut Context<'_>) {
    let name = &resource.name;
    ctx.add_variable(
        var_name("secGroupName", name),
        json!(var_name("secGroup", name)),
    );
    ctx.add_resource(json!({
        "apiVersion": ctx.config.api_version,
        "type": "Microsoft.Network/networkSecurityGroups",
        "name": var_ref(&var_name("secGroupName", name)),
        "location": var_ref("location"),
        "properties": {
            "securityRules": rules
        }
    }));
}

const SUPPORTED_PROTOCOLS: &[&str] = &["tcp", "udp", "*"];

fn check_protocol(
    group: &str,
    rule_no: usize,
    rule: &Value,
    field: &str,
) -> Result<String, ConvertError> {
    let protocol = rule.get(field).and_then(|v| v.as_str()).ok_or_else(|| {
        ConvertError::SecurityGroupMissingField {
            group: group.to_string(),
            rule: rule_no + 1,
            field: field.to_string(),
        }
    })?;
    if !SUPPORTED_PROTOCOLS.contains(&protocol.to_lowercase().as_str()) {
        return Err(ConvertError::SecurityGroupInvalidProtocol {
            group: group.to_string(),
            rule: rule_no + 1,
            protocol: protocol.to_string(),
        });
    }
    Ok(protocol.to_string())
}

fn rule_field(
    group: &str,
    rule_no: usize,
    rule: &Value,
    field: &str,
) -> Result<Value, ConvertError> {
    rule.get(field)
        .cloned()
        .ok_or_else(|| ConvertError::SecurityGroupMissingField {
            group: group.to_string(),
            rule: rule_no + 1,
            field: field.to_string(),
        })
}

/// Builds ARM rules from a Neutron group's `rules` list.
///
/// Neutron's specification ties source and destination port ranges
/// together, so both ARM fields receive the same range.
fn neutron_rules(resource: &Resource) -> Result<Vec<Json>, ConvertError> {
    let group = &resource.name;
    let mut out = Vec::new();

    let rules = match resource.property("rules").and_then(|v| v.as_list()) {
        Some(rules) => rules,
        None => return Ok(out),
    };

    for (i, rule) in rules.iter().enumerate() {
        let protocol = check_protocol(group, i, rule, "protocol")?;

        let port_range = match (rule.get("port_range_min"), rule.get("port_range_max")) {
            (Some(min), Some(max)) => {
                format!("{}-{}", min.fold_string(), max.fold_string())
            }
            _ => "*".to_string(),
        };
        let direction = match rule.get("direction").and_then(|v| v.as_str()) {
            Some("egress") => "Outbound",
            _ => "Inbound",
        };
        let remote = rule_field(group, i, rule, "remote_ip_prefix")?;

        out.push(json!({
            "name": format!("{}__rule_{}", group, i),
            "properties": {
                "protocol": protocol,
                "sourcePortRange": port_range,
                "destinationPortRange": port_range,
                "sourceAddressPrefix": remote.fold_string(),
                "destinationAddressPrefix": "*",
                "access": "Allow",
                "direction": direction
            }
        }));
    }
    Ok(out)
}

/// Builds ARM rules from an EC2 group's ingress and egress rule lists.
fn ec2_rules(resource: &Resource) -> Result<Vec<Json>, ConvertError> {
    let group = &resource.name;
    let mut out = Vec::new();
    let mut rule_no = 0;

    for (list_key, direction) in [
        ("SecurityGroupIngress", "Inbound"),
        ("SecurityGroupEgress", "Outbound"),
    ] {
        let rules = match resource.property(list_key).and_then(|v| v.as_list()) {
            Some(rules) => rules,
            None => continue,
        };
        for rule in rules {
            let protocol = check_protocol(group, rule_no, rule, "IpProtocol")?;
            let from = rule_field(group, rule_no, rule, "FromPort")?;
            let to = rule_field(group, rule_no, rule, "ToPort")?;
            let cidr = rule_field(group, rule_no, rule, "CidrIp")?;

            out.push(json!({
                "name": format!("{}_rule_{}", group, rule_no),
                "properties": {
                    "protocol": protocol,
                    "sourcePortRange": from.fold_string(),
                    "destinationPortRange": to.fold_string(),
                    "sourceAddressPrefix": cidr.fold_string(),
                    "destinationAddressPrefix": "*",
                    "direction": direction,
                    "access": "Allow",
                    "priority": 100 + rule_no
                }
            }));
            rule_no += 1;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    use crate::config::Config;
    use stack2arm_core::Dialect;

    fn heat_resource(name: &str, type_name: &str, props: Vec<(&str, Value)>) -> Resource {
        let data = Value::Map(vec![
            ("type".to_string(), Value::String(type_name.to_string())),
            (
                "properties".to_string(),
                Value::Map(
                    props
                        .into_iter()
                        .map(|(k, v)| (k.to_string(), v))
                        .collect(),
                ),
            ),
        ]);
        let mut diags = Diagnostics::new();
        Resource::from_raw(name, &data, Dialect::Heat.fields(), &mut diags).unwrap()
    }

    fn s(text: &str) -> Value {
        Value::String(text.to_string())
    }

    #[test]
    fn test_net_declares_naming_variables_only() {
        let config = Config::default();
        let net = heat_resource("private", "OS::Neutron::Net", vec![("name", s("net"))]);
        let source = BTreeMap::new();

        let mut ctx = Context::new(&config, &source);
        let mut diags = Diagnostics::new();
        NeutronNetTranslator
            .translate(&net, &mut ctx, &mut diags)
            .unwrap();

        let data = ctx.finalize();
        assert_eq!(
            data.variables.get("virtualNetworkName_private").unwrap(),
            &json!("private")
        );
        assert_eq!(
            data.variables
                .get("virtualNetworkSubnetName_private")
                .unwrap(),
            &json!("private_subnet1")
        );
        assert!(data.resources.is_empty());
    }

    #[test]
    fn test_subnet_declares_virtual_network() {
        let config = Config::default();
        let net = heat_resource("private", "OS::Neutron::Net", vec![]);
        let subnet = heat_resource(
            "private_subnet",
            "OS::Neutron::Subnet",
            vec![("network_id", s("private")), ("cidr", s("10.0.0.0/24"))],
        );
        let mut source = BTreeMap::new();
        source.insert("private".to_string(), net);
        source.insert("private_subnet".to_string(), subnet.clone());

        let mut ctx = Context::new(&config, &source);
        let mut diags = Diagnostics::new();
        NeutronSubnetTranslator
            .translate(&subnet, &mut ctx, &mut diags)
            .unwrap();

        let data = ctx.finalize();
        assert_eq!(
            data.variables
                .get("subNetAddressPrefix_private_subnet")
                .unwrap(),
            &json!("10.0.0.0/24")
        );
        let vnet = &data.resources[0];
        assert_eq!(vnet["type"], json!("Microsoft.Network/virtualNetworks"));
        assert_eq!(
            vnet["name"],
            json!("[variables('virtualNetworkName_private')]")
        );
    }

    #[test]
    fn test_port_declares_network_interface() {
        let config = Config::default();
        let net = heat_resource("private", "OS::Neutron::Net", vec![]);
        let port = heat_resource(
            "server_port",
            "OS::Neutron::Port",
            vec![("network_id", s("private"))],
        );
        let mut source = BTreeMap::new();
        source.insert("private".to_string(), net);
        source.insert("server_port".to_string(), port.clone());

        let mut ctx = Context::new(&config, &source);
        let mut diags = Diagnostics::new();
        NeutronPortTranslator
            .translate(&port, &mut ctx, &mut diags)
            .unwrap();

        let data = ctx.finalize();
        let nic = &data.resources[0];
        assert_eq!(nic["type"], json!("Microsoft.Network/networkInterfaces"));
        assert_eq!(
            nic["properties"]["ipConfigurations"][0]["properties"]["subnet"]["id"],
            json!("[variables('virtualNetworkSubnetName_ref_private')]")
        );
    }

    #[test]
    fn test_port_with_dangling_network_fails() {
        let config = Config::default();
        let port = heat_resource(
            "server_port",
            "OS::Neutron::Port",
            vec![("network_id", s("ghost"))],
        );
        let source = BTreeMap::new();

        let mut ctx = Context::new(&config, &source);
        let mut diags = Diagnostics::new();
        let err = NeutronPortTranslator
            .translate(&port, &mut ctx, &mut diags)
            .unwrap_err();
        assert!(matches!(err, ConvertError::UnknownReferencedResource { .. }));
    }

    #[test]
    fn test_neutron_security_group_rules() {
        let config = Config::default();
        let group = heat_resource(
            "web_sg",
            "OS::Neutron::SecurityGroup",
            vec![(
                "rules",
                Value::List(vec![
                    Value::Map(vec![
                        ("protocol".to_string(), s("tcp")),
                        ("port_range_min".to_string(), Value::Number(80.0)),
                        ("port_range_max".to_string(), Value::Number(80.0)),
                        ("remote_ip_prefix".to_string(), s("0.0.0.0/0")),
                    ]),
                    Value::Map(vec![
                        ("protocol".to_string(), s("udp")),
                        ("remote_ip_prefix".to_string(), s("10.0.0.0/24")),
                        ("direction".to_string(), s("egress")),
                    ]),
                ]),
            )],
        );
        let source = BTreeMap::new();

        let mut ctx = Context::new(&config, &source);
        let mut diags = Diagnostics::new();
        NeutronSecurityGroupTranslator
            .translate(&group, &mut ctx, &mut diags)
            .unwrap();

        let data = ctx.finalize();
        let rules = data.resources[0]["properties"]["securityRules"]
            .as_array()
            .unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0]["properties"]["sourcePortRange"], json!("80-80"));
        assert_eq!(rules[0]["properties"]["direction"], json!("Inbound"));
        assert_eq!(rules[1]["properties"]["sourcePortRange"], json!("*"));
        assert_eq!(rules[1]["properties"]["direction"], json!("Outbound"));
    }

    #[test]
    fn test_invalid_protocol_fails() {
        let config = Config::default();
        let group = heat_resource(
            "web_sg",
            "OS::Neutron::SecurityGroup",
            vec![(
                "rules",
                Value::List(vec![Value::Map(vec![
                    ("protocol".to_string(), s("icmp")),
                    ("remote_ip_prefix".to_string(), s("0.0.0.0/0")),
                ])]),
            )],
        );
        let source = BTreeMap::new();

        let mut ctx = Context::new(&config, &source);
        let mut diags = Diagnostics::new();
        let err = NeutronSecurityGroupTranslator
            .translate(&group, &mut ctx, &mut diags)
            .unwrap_err();
        assert!(matches!(
            err,
            ConvertError::SecurityGroupInvalidProtocol { ref protocol, .. }
                if protocol == "icmp"
        ));
    }

    #[test]
    fn test_ec2_security_group_priorities() {
        let config = Config::default();
        let data = Value::Map(vec![
            (
                "Type".to_string(),
                Value::String("AWS::EC2::SecurityGroup".to_string()),
            ),
            (
                "Properties".to_string(),
                Value::Map(vec![(
                    "SecurityGroupIngress".to_string(),
                    Value::List(vec![
                        Value::Map(vec![
                            ("IpProtocol".to_string(), s("tcp")),
                            ("FromPort".to_string(), s("22")),
                            ("ToPort".to_string(), s("22")),
                            ("CidrIp".to_string(), s("0.0.0.0/0")),
                        ]),
                        Value::Map(vec![
                            ("IpProtocol".to_string(), s("tcp")),
                            ("FromPort".to_string(), Value::Number(80.0)),
                            ("ToPort".to_string(), Value::Number(80.0)),
                            ("CidrIp".to_string(), s("0.0.0.0/0")),
                        ]),
                    ]),
                )]),
            ),
        ]);
        let mut diags = Diagnostics::new();
        let group =
            Resource::from_raw("web_sg", &data, Dialect::Cfn.fields(), &mut diags).unwrap();
        let source = BTreeMap::new();

        let mut ctx = Context::new(&config, &source);
        Ec2SecurityGroupTranslator
            .translate(&group, &mut ctx, &mut diags)
            .unwrap();

        let out = ctx.finalize();
        let rules = out.resources[0]["properties"]["securityRules"]
            .as_array()
            .unwrap();
        assert_eq!(rules[0]["properties"]["priority"], json!(100));
        assert_eq!(rules[1]["properties"]["priority"], json!(101));
        assert_eq!(rules[1]["properties"]["destinationPortRange"], json!("80"));
    }
}
