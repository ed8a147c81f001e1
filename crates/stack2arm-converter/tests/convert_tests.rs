//! End-to-end conversion tests: template text in, ARM document out.

use pretty_assertions::assert_eq;
use serde_json::{json, Value as Json};

use stack2arm_converter::{convert_template, Config};

const HEAT_STACK: &str = r#"
heat_template_version: 2013-05-23
description: A server on a private network with an attached data volume.
parameters:
  image_name:
    type: string
    default: ubuntu.12.04.LTS.x86_64
  flavor:
    type: string
    default: m1.small
resources:
  private_net:
    type: OS::Neutron::Net
    properties:
      name: private
  private_subnet:
    type: OS::Neutron::Subnet
    properties:
      network_id: { get_resource: private_net }
      cidr: 10.0.0.0/24
  server_port:
    type: OS::Neutron::Port
    properties:
      network_id: { get_resource: private_net }
  server:
    type: OS::Nova::Server
    properties:
      image: { get_param: image_name }
      flavor: { get_param: flavor }
      networks:
        - port: { get_resource: server_port }
  data_volume:
    type: OS::Cinder::Volume
    properties:
      size: 10
  volume_attachment:
    type: OS::Cinder::VolumeAttachment
    properties:
      volume_id: { get_resource: data_volume }
      instance_uuid: { get_resource: server }
"#;

const CFN_STACK: &str = r##"
{
  "AWSTemplateFormatVersion": "2010-09-09",
  "Parameters": {
    "InstanceType": { "Type": "String", "Default": "m1.small" }
  },
  "Resources": {
    "WebServer": {
      "Type": "AWS::EC2::Instance",
      "Properties": {
        "ImageId": "U10-x86_64-cfntools",
        "InstanceType": { "Ref": "InstanceType" },
        "AvailabilityZone": "zone1",
        "UserData": { "Fn::Base64": { "Fn::Join": ["", ["#!/bin/bash\n", "echo hi\n"]] } }
      }
    },
    "WebSecurityGroup": {
      "Type": "AWS::EC2::SecurityGroup",
      "Properties": {
        "SecurityGroupIngress": [
          { "IpProtocol": "tcp", "FromPort": "80", "ToPort": "80", "CidrIp": "0.0.0.0/0" }
        ]
      }
    }
  }
}
"##;

fn resource_of_type<'a>(document: &'a Json, type_name: &str) -> &'a Json {
    document["resources"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["type"] == json!(type_name))
        .unwrap_or_else(|| panic!("no resource of type '{}'", type_name))
}

#[test]
fn test_heat_stack_converts() {
    let config = Config::default();
    let result = convert_template(HEAT_STACK, &config).unwrap();
    assert!(
        !result.diagnostics.has_errors(),
        "conversion produced errors:\n{}",
        result.diagnostics
    );
    let doc = &result.document;

    // Section order and stamped constants.
    let keys: Vec<&str> = doc.as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        vec!["contentVersion", "$schema", "parameters", "variables", "resources"]
    );
    assert_eq!(doc["contentVersion"], json!("1.0.0.0"));

    // The subnet produced the virtual network, named after the net.
    let vnet = resource_of_type(doc, "Microsoft.Network/virtualNetworks");
    assert_eq!(vnet["name"], json!("[variables('virtualNetworkName_private_net')]"));
    assert_eq!(
        doc["variables"]["subNetAddressPrefix_private_subnet"],
        json!("10.0.0.0/24")
    );

    // The port produced the NIC the server references.
    let nic = resource_of_type(doc, "Microsoft.Network/networkInterfaces");
    assert_eq!(nic["name"], json!("[variables('nicName_server_port')]"));

    let vm = resource_of_type(doc, "Microsoft.Compute/virtualMachines");
    let nic_id = vm["properties"]["networkProfile"]["networkInterfaces"][0]["id"]
        .as_str()
        .unwrap();
    assert!(nic_id.contains("nicName_server_port"));
    assert_eq!(doc["variables"]["vmSize_server"], json!("Basic_A1"));
    assert_eq!(doc["variables"]["imgOffer_server"], json!("UbuntuServer"));

    // The attachment put the volume on the server's storage profile.
    let disks = vm["properties"]["storageProfile"]["dataDisks"]
        .as_array()
        .unwrap();
    assert_eq!(disks.len(), 1);
    assert_eq!(disks[0]["name"], json!("data_volume"));
    assert_eq!(disks[0]["lun"], json!(0));
    assert!(doc["parameters"]
        .as_object()
        .unwrap()
        .contains_key("size_data_volume"));

    // The VM and the volume both need the storage account.
    assert!(doc["parameters"]
        .as_object()
        .unwrap()
        .contains_key("newStorageAccountName"));
    resource_of_type(doc, "Microsoft.Storage/storageAccounts");

    // The server has its port, so no default virtual network was emitted.
    assert!(!doc["parameters"]
        .as_object()
        .unwrap()
        .contains_key("newVirtualNetworkName"));
}

#[test]
fn test_cfn_stack_converts() {
    let config = Config::default();
    let result = convert_template(CFN_STACK, &config).unwrap();
    assert!(!result.diagnostics.has_errors());
    let doc = &result.document;

    let vm = resource_of_type(doc, "Microsoft.Compute/virtualMachines");
    assert_eq!(doc["variables"]["vmName_WebServer"], json!("WebServer"));

    // Userdata was reduced by the parser and base64-encoded here.
    use base64::Engine;
    let encoded = base64::engine::general_purpose::STANDARD.encode("#!/bin/bash\necho hi\n");
    assert_eq!(doc["variables"]["customData_WebServer"], json!(encoded));
    assert_eq!(
        vm["properties"]["osProfile"]["customData"],
        json!("[variables('customData_WebServer')]")
    );

    // The availability zone became an availability set.
    resource_of_type(doc, "Microsoft.Compute/availabilitySets");
    assert_eq!(
        doc["variables"]["availabilitySetName_zone1"],
        json!("availabilitySet_zone1")
    );

    // The security group carries the single ingress rule.
    let sg = resource_of_type(doc, "Microsoft.Network/networkSecurityGroups");
    let rules = sg["properties"]["securityRules"].as_array().unwrap();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0]["properties"]["destinationPortRange"], json!("80"));
    assert_eq!(rules[0]["properties"]["priority"], json!(100));

    // No ports exist, so the VM fell back to the default virtual network.
    assert!(doc["parameters"]
        .as_object()
        .unwrap()
        .contains_key("newVirtualNetworkName"));
}

#[test]
fn test_unknown_types_are_skipped_with_warning() {
    let config = Config::default();
    let source = r#"
heat_template_version: 2013-05-23
parameters: {}
resources:
  router:
    type: OS::Neutron::Router
    properties: {}
  net:
    type: OS::Neutron::Net
    properties: {}
"#;
    let result = convert_template(source, &config).unwrap();
    assert!(result.diagnostics.has_warnings());
    // The net still translated (to variables only).
    assert!(result.document["variables"]
        .as_object()
        .unwrap()
        .contains_key("virtualNetworkName_net"));
}

#[test]
fn test_parse_errors_propagate() {
    let config = Config::default();
    let err = convert_template("bogus_top_level: {}\nresources: {}\n", &config).unwrap_err();
    assert!(err.to_string().contains("no known dialect"));
}

#[test]
fn test_config_overrides_reach_output() {
    let mut config = Config::default();
    config.location = "North Europe".to_string();
    config.template_version = "2.0.0.0".to_string();

    let result = convert_template("parameters: {}\nresources: {}\n", &config).unwrap();
    assert_eq!(result.document["contentVersion"], json!("2.0.0.0"));
    assert_eq!(result.document["variables"]["location"], json!("North Europe"));
}
