use heck::ToUpperCamelCase;

/// Builds a `<prefix>_<resource>` ARM variable name.
///
/// Every per-resource variable follows this scheme, so cross-translator
/// references (a VM naming the NIC variable of a port it never built) only
/// need to agree on the prefix.
pub fn var_name(prefix: &str, resource_name: &str) -> String {
    format!("{}_{}", prefix, resource_name)
}

/// An ARM expression referencing a template variable.
pub fn var_ref(name: &str) -> String {
    format!("[variables('{}')]", name)
}

/// An ARM expression referencing a template parameter.
pub fn param_ref(name: &str) -> String {
    format!("[parameters('{}')]", name)
}

/// Strips every non-alphanumeric character.
pub fn filter_non_alnum(text: &str) -> String {
    text.chars().filter(|c| c.is_alphanumeric()).collect()
}

/// Builds the OS-level computer name for an instance.
///
/// Azure rejects any non-alphanumeric character here.
pub fn computer_name(resource_name: &str) -> String {
    filter_non_alnum(&format!(
        "vmName{}",
        resource_name.to_upper_camel_case()
    ))
}
