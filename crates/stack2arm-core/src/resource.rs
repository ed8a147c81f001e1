use std::fmt;

use crate::diag::Diagnostics;
use crate::dialect::FieldMap;
use crate::error::ParseError;
use crate::value::Value;

/// The normalized, dialect-independent form of one declared resource.
///
/// Constructed once per template entry after function reduction, so its
/// property values are fully literal. Translators own the only mutation
/// path: a translator deriving defaults from another resource works on a
/// clone of that resource's properties, never the original.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub name: String,
    type_: String,
    pub properties: Value,
    pub meta: Value,
}

impl Resource {
    /// Builds a resource from its name and raw data, using the dialect's
    /// field names.
    ///
    /// The name and the type field are mandatory. A missing properties
    /// field is tolerated with a warning and replaced by an empty map; the
    /// meta field only exists in dialects that define one.
    pub fn from_raw(
        name: &str,
        data: &Value,
        fields: &FieldMap,
        diags: &mut Diagnostics,
    ) -> Result<Resource, ParseError> {
        if name.is_empty() {
            return Err(ParseError::ResourceNameMissing);
        }

        let type_ = data
            .get(fields.type_)
            .and_then(|v| v.as_str())
            .ok_or_else(|| ParseError::ResourceTypeMissing {
                name: name.to_string(),
                type_field: fields.type_.to_string(),
            })?
            .to_string();

        let properties = match data.get(fields.properties) {
            Some(props) => props.clone(),
            None => {
                diags.warning(
                    format!("resource '{}' has no '{}' field", name, fields.properties),
                    "",
                );
                Value::empty_map()
            }
        };

        let meta = fields
            .meta
            .and_then(|key| data.get(key))
            .cloned()
            .unwrap_or_else(Value::empty_map);

        Ok(Resource {
            name: name.to_string(),
            type_,
            properties,
            meta,
        })
    }

    /// Returns this resource's type name.
    pub fn type_name(&self) -> &str {
        &self.type_
    }

    /// Looks up a property by key.
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Looks up a string property by key.
    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.property(key).and_then(|v| v.as_str())
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.type_)
    }
}
