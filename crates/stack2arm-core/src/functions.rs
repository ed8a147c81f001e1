use crate::diag::Diagnostics;
use crate::dialect::{Dialect, FunctionKind};
use crate::error::ParseError;
use crate::value::Value;

/// Read-only view of the template sections the intrinsic functions consult.
///
/// `resources` is the raw resources sub-tree as it stood before reduction
/// began, so attribute lookups see a consistent snapshot regardless of how
/// far the rebuild has progressed.
pub struct TemplateEnv<'a> {
    pub parameters: &'a Value,
    pub resources: &'a Value,
    pub mappings: &'a Value,
}

/// The set of intrinsic functions active for one template.
///
/// Built once from the template's dialect; each entry carries the data its
/// operation needs (the parameter default key, the properties key, the
/// get-attr fallback table) instead of reaching for any shared state.
#[derive(Debug)]
pub struct FunctionRegistry {
    dialect: Dialect,
}

impl FunctionRegistry {
    /// Creates the registry for a dialect.
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    /// Returns the operation registered under `trigger`, if any.
    pub fn lookup(&self, trigger: &str) -> Option<FunctionKind> {
        self.dialect
            .functions()
            .iter()
            .find(|(name, _)| *name == trigger)
            .map(|(_, kind)| *kind)
    }

    /// Applies the function registered under `trigger` to already-reduced
    /// arguments. The caller guarantees `trigger` was returned by `lookup`.
    pub fn apply(
        &self,
        trigger: &str,
        kind: FunctionKind,
        args: &Value,
        env: &TemplateEnv<'_>,
        diags: &mut Diagnostics,
    ) -> Result<Value, ParseError> {
        let fields = self.dialect.fields();
        match kind {
            FunctionKind::Ref => eval_ref(trigger, args, env, fields.param_default, diags),
            FunctionKind::Join => eval_join(trigger, args),
            FunctionKind::Base64 => eval_base64(trigger, args),
            FunctionKind::GetAttr => eval_get_attr(
                trigger,
                args,
                env,
                fields.properties,
                self.dialect.get_attr_fallbacks(),
                diags,
            ),
            FunctionKind::MapFind => eval_find_in_map(trigger, args, env),
        }
    }
}

/// Resolves a parameter or resource reference.
///
/// A parameter with a default resolves to that default. A parameter without
/// one resolves to its own name with a warning, on the chance the value was
/// never needed downstream. A resource resolves to its name; the source
/// platform's richer per-resource-type resolution is deliberately not
/// emulated.
pub fn eval_ref(
    trigger: &str,
    args: &Value,
    env: &TemplateEnv<'_>,
    param_default_key: &str,
    diags: &mut Diagnostics,
) -> Result<Value, ParseError> {
    let name = args.as_str().ok_or_else(|| {
        ParseError::argument(
            trigger,
            format!("expected a single string name, got {}", args.type_name()),
        )
    })?;

    // Parameters take priority over resources of the same name.
    if let Some(param) = env.parameters.get(name) {
        if let Some(default) = param.get(param_default_key) {
            return Ok(default.clone());
        }
        diags.warning(
            format!("parameter '{}' has no '{}' field", name, param_default_key),
            "returning the parameter name itself in case the value is not needed",
        );
        return Ok(Value::String(name.to_string()));
    }

    if env.resources.contains_key(name) {
        return Ok(Value::String(name.to_string()));
    }

    Err(ParseError::application(
        trigger,
        format!("reference to '{}' could not be resolved", name),
    ))
}

/// Joins a list of strings and numbers with a separator.
///
/// Arguments: `[separator, [item, ...]]` with a non-empty item list.
pub fn eval_join(trigger: &str, args: &Value) -> Result<Value, ParseError> {
    let parts = args.as_list().ok_or_else(|| {
        ParseError::argument(
            trigger,
            format!(
                "expected [separator, items], got {}",
                args.type_name()
            ),
        )
    })?;
    if parts.len() != 2 {
        return Err(ParseError::argument(
            trigger,
            format!("expected exactly two arguments, got {}", parts.len()),
        ));
    }

    let sep = parts[0].as_str().ok_or_else(|| {
        ParseError::argument(
            trigger,
            format!("separator must be a string, got {}", parts[0].type_name()),
        )
    })?;

    let items = parts[1].as_list().ok_or_else(|| {
        ParseError::argument(
            trigger,
            format!(
                "second argument must be a list of strings or numbers, got {}",
                parts[1].type_name()
            ),
        )
    })?;
    if items.is_empty() {
        return Err(ParseError::argument(trigger, "item list is empty"));
    }

    let mut joined = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::String(_) | Value::Number(_) => joined.push(item.fold_string()),
            other => {
                return Err(ParseError::argument(
                    trigger,
                    format!(
                        "item list must hold only strings or numbers, got {}",
                        other.type_name()
                    ),
                ))
            }
        }
    }

    Ok(Value::String(joined.join(sep)))
}

/// The base64 pass-through.
///
/// The output template re-wraps values in its own encoding primitive, so
/// this function only validates the argument and returns it unchanged.
pub fn eval_base64(trigger: &str, args: &Value) -> Result<Value, ParseError> {
    match args {
        Value::String(s) => Ok(Value::String(s.clone())),
        other => Err(ParseError::argument(
            trigger,
            format!("expected a string, got {}", other.type_name()),
        )),
    }
}

/// Walks into another resource's properties.
///
/// Arguments: `[resource_name, index, ...]` of length at least two, indices
/// being strings or integers. An index missing from the tree may instead be
/// satisfied by the dialect's fallback table (e.g. CFN's AvailabilityZone).
pub fn eval_get_attr(
    trigger: &str,
    args: &Value,
    env: &TemplateEnv<'_>,
    properties_key: &str,
    fallbacks: &[(&str, &str)],
    diags: &mut Diagnostics,
) -> Result<Value, ParseError> {
    let indices = args.as_list().ok_or_else(|| {
        ParseError::argument(
            trigger,
            format!("expected a list of indices, got {}", args.type_name()),
        )
    })?;
    if indices.len() < 2 {
        return Err(ParseError::argument(
            trigger,
            format!("expected at least [resource, attribute], got {} element(s)", indices.len()),
        ));
    }
    for index in indices {
        if !matches!(index, Value::String(_) | Value::Number(_)) {
            return Err(ParseError::argument(
                trigger,
                format!("indices must be strings or integers, got {}", index.type_name()),
            ));
        }
    }

    let resource_name = indices[0].as_str().ok_or_else(|| {
        ParseError::argument(trigger, "resource name must be a string")
    })?;
    let resource = env.resources.get(resource_name).ok_or_else(|| {
        ParseError::application(
            trigger,
            format!("resource '{}' does not exist", resource_name),
        )
    })?;

    let mut current = resource.get(properties_key).ok_or_else(|| {
        ParseError::application(
            trigger,
            format!(
                "resource '{}' has no '{}' field",
                resource_name, properties_key
            ),
        )
    })?;

    let mut walked = vec![resource_name.to_string()];
    for index in &indices[1..] {
        let key = index.fold_string();
        current = match get_item(current, index) {
            Some(v) => v,
            None => {
                if let Some((_, default)) = fallbacks.iter().find(|(name, _)| *name == key) {
                    diags.warning(
                        format!("'{}': fallback applied for attribute '{}'", trigger, key),
                        format!("defaulting to '{}'", default),
                    );
                    return Ok(Value::String(default.to_string()));
                }
                return Err(ParseError::application(
                    trigger,
                    format!("no index '{}' under '{}'", key, walked.join(".")),
                ));
            }
        };
        walked.push(key);
    }

    Ok(current.clone())
}

/// Indexes a container with a string key or an integer position.
fn get_item<'a>(container: &'a Value, index: &Value) -> Option<&'a Value> {
    match (container, index) {
        (Value::Map(_), Value::String(key)) => container.get(key),
        (Value::List(items), Value::Number(n)) if n.fract() == 0.0 && *n >= 0.0 => {
            items.get(*n as usize)
        }
        _ => None,
    }
}

/// The three-level lookup into the template's mapping tables.
///
/// Arguments: `[map_name, key, value]`, all strings; every level must exist.
pub fn eval_find_in_map(
    trigger: &str,
    args: &Value,
    env: &TemplateEnv<'_>,
) -> Result<Value, ParseError> {
    let parts = args.as_list().ok_or_else(|| {
        ParseError::argument(
            trigger,
            format!("expected [map, key, value], got {}", args.type_name()),
        )
    })?;
    if parts.iter().any(|p| p.as_str().is_none()) {
        return Err(ParseError::argument(
            trigger,
            "all three arguments must be strings",
        ));
    }
    if parts.len() != 3 {
        return Err(ParseError::argument(
            trigger,
            format!("expected exactly three arguments, got {}", parts.len()),
        ));
    }

    let mut strings = parts.iter().filter_map(Value::as_str);
    let (map_name, key, value) = match (strings.next(), strings.next(), strings.next()) {
        (Some(m), Some(k), Some(v)) => (m, k, v),
        _ => {
            return Err(ParseError::argument(
                trigger,
                "all three arguments must be strings",
            ))
        }
    };

    let mapping = env.mappings.get(map_name).ok_or_else(|| {
        ParseError::application(
            trigger,
            format!("could not find defined mapping '{}'", map_name),
        )
    })?;
    let entry = mapping.get(key).ok_or_else(|| {
        ParseError::application(
            trigger,
            format!("could not find key '{}' in mapping '{}'", key, map_name),
        )
    })?;
    let result = entry.get(value).ok_or_else(|| {
        ParseError::application(
            trigger,
            format!(
                "could not find value '{}' under '{}' in mapping '{}'",
                value, key, map_name
            ),
        )
    })?;

    Ok(result.clone())
}
