use crate::diag::closest_match;
use crate::error::ParseError;

/// The two supported template dialects.
///
/// Each dialect is a closed set of data: its field names, its function
/// trigger names, and its get-attr fallback table. No dialect state lives
/// outside this enum; a `Template` picks one at construction and threads it
/// through explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// CloudFormation-style JSON templates (`Parameters`, `Fn::Join`, ...).
    Cfn,
    /// Heat-style YAML templates (`parameters`, `list_join`, ...).
    Heat,
}

/// The mapping from canonical field roles to a dialect's literal key names.
#[derive(Debug, Clone, Copy)]
pub struct FieldMap {
    pub parameters: &'static str,
    pub resources: &'static str,
    /// The lookup-table section used by the map-find function.
    /// Heat templates have no equivalent.
    pub variables: Option<&'static str>,
    pub outputs: &'static str,
    pub type_: &'static str,
    pub properties: &'static str,
    pub meta: Option<&'static str>,
    /// The key under which a parameter spec carries its default value.
    pub param_default: &'static str,
}

const CFN_FIELDS: FieldMap = FieldMap {
    parameters: "Parameters",
    resources: "Resources",
    variables: Some("Mappings"),
    outputs: "Outputs",
    type_: "Type",
    properties: "Properties",
    meta: Some("Metadata"),
    param_default: "Default",
};

const HEAT_FIELDS: FieldMap = FieldMap {
    parameters: "parameters",
    resources: "resources",
    variables: None,
    outputs: "outputs",
    type_: "type",
    properties: "properties",
    meta: None,
    param_default: "default",
};

/// Top-level keys a well-formed CFN template may use.
const CFN_TOP_LEVEL: &[&str] = &[
    "AWSTemplateFormatVersion",
    "Description",
    "Parameters",
    "Mappings",
    "Resources",
    "Outputs",
];

/// Top-level keys a well-formed Heat template may use.
const HEAT_TOP_LEVEL: &[&str] = &[
    "heat_template_version",
    "description",
    "parameters",
    "resources",
    "outputs",
];

/// Attribute names the CFN get-attr function may fall back on when absent
/// from the template body, with their default values. These attributes are
/// conventionally derived from platform context rather than declared.
const CFN_GET_ATTR_FALLBACKS: &[(&str, &str)] = &[("AvailabilityZone", "")];

impl Dialect {
    /// Detects the dialect of a template from its top-level key set.
    ///
    /// A template is recognized when its keys form a subset of one dialect's
    /// known top-level fields. Dialects are tried in a fixed priority order
    /// (CFN first), so a minimal template valid under both is classified as
    /// CFN.
    pub fn detect<'a>(top_keys: impl Iterator<Item = &'a str> + Clone) -> Result<Dialect, ParseError> {
        for dialect in [Dialect::Cfn, Dialect::Heat] {
            let known = dialect.top_level_fields();
            if top_keys.clone().all(|k| known.contains(&k)) {
                return Ok(dialect);
            }
        }

        // No dialect matched: report the first key neither dialect knows,
        // with a nearest-known-field suggestion.
        let field = top_keys
            .clone()
            .find(|k| !CFN_TOP_LEVEL.contains(k) && !HEAT_TOP_LEVEL.contains(k))
            .unwrap_or("")
            .to_string();
        let all_known = CFN_TOP_LEVEL.iter().chain(HEAT_TOP_LEVEL).copied();
        let suggestion = if field.is_empty() {
            None
        } else {
            closest_match(all_known, &field).map(str::to_string)
        };
        Err(ParseError::UnknownDialect { field, suggestion })
    }

    /// Returns the field map for this dialect.
    pub fn fields(&self) -> &'static FieldMap {
        match self {
            Dialect::Cfn => &CFN_FIELDS,
            Dialect::Heat => &HEAT_FIELDS,
        }
    }

    /// Returns the set of top-level keys this dialect recognizes.
    pub fn top_level_fields(&self) -> &'static [&'static str] {
        match self {
            Dialect::Cfn => CFN_TOP_LEVEL,
            Dialect::Heat => HEAT_TOP_LEVEL,
        }
    }

    /// Returns the intrinsic-function trigger names of this dialect, paired
    /// with the operation each one performs.
    pub fn functions(&self) -> &'static [(&'static str, FunctionKind)] {
        match self {
            Dialect::Cfn => &[
                ("Ref", FunctionKind::Ref),
                ("Fn::Join", FunctionKind::Join),
                ("Fn::Base64", FunctionKind::Base64),
                ("Fn::GetAtt", FunctionKind::GetAttr),
                ("Fn::FindInMap", FunctionKind::MapFind),
            ],
            Dialect::Heat => &[
                ("get_resource", FunctionKind::Ref),
                ("get_param", FunctionKind::Ref),
                ("list_join", FunctionKind::Join),
                ("get_attr", FunctionKind::GetAttr),
            ],
        }
    }

    /// Returns this dialect's get-attr fallback table.
    pub fn get_attr_fallbacks(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Dialect::Cfn => CFN_GET_ATTR_FALLBACKS,
            Dialect::Heat => &[],
        }
    }
}

/// The operation behind an intrinsic-function trigger name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    /// Resolve a parameter or resource reference.
    Ref,
    /// Join a list of strings/numbers with a separator.
    Join,
    /// Dialect-compatibility pass-through; the output format re-wraps the
    /// value in its own encoding primitive downstream.
    Base64,
    /// Walk into another resource's properties.
    GetAttr,
    /// Three-level lookup into the template's mapping tables.
    MapFind,
}
