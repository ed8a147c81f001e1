use std::collections::BTreeMap;

use crate::diag::Diagnostics;
use crate::dialect::Dialect;
use crate::error::ParseError;
use crate::functions::{FunctionRegistry, TemplateEnv};
use crate::resource::Resource;
use crate::value::Value;

/// A parsed template of either dialect.
///
/// Construction parses the raw text, detects the dialect, validates the
/// mandatory sections and extracts the parameter, resource and mapping
/// sub-trees (the outputs section is discarded; it has no use in
/// translation). The caller then runs `reduce_functions` followed by
/// `parse_resources`, once each; calling `parse_resources` on an unreduced
/// template yields resources whose properties may still contain function
/// nodes.
#[derive(Debug)]
pub struct Template {
    dialect: Dialect,
    parameters: Value,
    resources: Value,
    mappings: Value,
    registry: FunctionRegistry,
    diags: Diagnostics,
}

impl Template {
    /// Parses template text into a `Template`.
    ///
    /// YAML 1.2 is a superset of JSON, so one parse covers both the
    /// JSON-style CFN dialect and the YAML-style Heat dialect.
    pub fn parse(source: &str) -> Result<Template, ParseError> {
        let yaml: serde_yaml::Value = serde_yaml::from_str(source)?;
        let data = Value::from_yaml(&yaml);

        let entries = data.as_map().ok_or_else(|| {
            ParseError::TemplateData("expected a mapping at the top level".to_string())
        })?;

        let dialect = Dialect::detect(entries.iter().map(|(k, _)| k.as_str()))?;
        let fields = dialect.fields();

        for mandatory in [fields.parameters, fields.resources] {
            if !data.contains_key(mandatory) {
                return Err(ParseError::MissingField(mandatory.to_string()));
            }
        }

        let parameters = data.get(fields.parameters).cloned().unwrap_or_else(Value::empty_map);
        let resources = data.get(fields.resources).cloned().unwrap_or_else(Value::empty_map);
        let mappings = fields
            .variables
            .and_then(|key| data.get(key))
            .cloned()
            .unwrap_or_else(Value::empty_map);

        Ok(Template {
            dialect,
            parameters,
            resources,
            mappings,
            registry: FunctionRegistry::new(dialect),
            diags: Diagnostics::new(),
        })
    }

    /// Returns the detected dialect.
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Returns the parameters sub-tree.
    pub fn parameters(&self) -> &Value {
        &self.parameters
    }

    /// Returns the mapping tables sub-tree (empty for Heat templates).
    pub fn mappings(&self) -> &Value {
        &self.mappings
    }

    /// Returns the diagnostics gathered so far.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diags
    }

    /// Consumes the gathered diagnostics, leaving an empty collection.
    pub fn take_diagnostics(&mut self) -> Diagnostics {
        std::mem::take(&mut self.diags)
    }

    /// Reduces every intrinsic-function application in the template.
    ///
    /// The walk is depth-first and bottom-up: every child of a node is fully
    /// reduced before the node itself is examined, so a function always
    /// receives literal arguments even when its invocation wraps another
    /// function. A mapping is a function application iff it has exactly one
    /// key and that key is a registered trigger of the active dialect; any
    /// other mapping passes through with its reduced children in place.
    ///
    /// Function lookups resolve against a snapshot of the sections taken
    /// before the rebuild starts. Running this twice is a no-op: one pass
    /// leaves no trigger keys behind.
    pub fn reduce_functions(&mut self) -> Result<(), ParseError> {
        let parameters = std::mem::replace(&mut self.parameters, Value::Null);
        let resources = std::mem::replace(&mut self.resources, Value::Null);

        let param_snapshot = parameters.clone();
        let resource_snapshot = resources.clone();
        let env = TemplateEnv {
            parameters: &param_snapshot,
            resources: &resource_snapshot,
            mappings: &self.mappings,
        };

        let result = reduce_value(parameters, &self.registry, &env, &mut self.diags).and_then(
            |reduced_params| {
                let reduced_resources =
                    reduce_value(resources, &self.registry, &env, &mut self.diags)?;
                Ok((reduced_params, reduced_resources))
            },
        );

        match result {
            Ok((parameters, resources)) => {
                self.parameters = parameters;
                self.resources = resources;
                Ok(())
            }
            Err(err) => {
                // A single unresolved function anywhere is fatal to the
                // whole template; restore the snapshots for inspection.
                self.parameters = param_snapshot;
                self.resources = resource_snapshot;
                Err(err)
            }
        }
    }

    /// Instantiates a `Resource` for every entry of the resources section.
    ///
    /// No entry is skipped or deduplicated; a duplicate name overwrites the
    /// earlier entry, consistent with mapping semantics.
    pub fn parse_resources(&mut self) -> Result<BTreeMap<String, Resource>, ParseError> {
        let entries = self.resources.as_map().ok_or_else(|| {
            ParseError::TemplateData("resources section is not a mapping".to_string())
        })?;

        let mut resources = BTreeMap::new();
        for (name, data) in entries {
            let resource =
                Resource::from_raw(name, data, self.dialect.fields(), &mut self.diags)?;
            resources.insert(name.clone(), resource);
        }
        Ok(resources)
    }
}

/// Rebuilds a node bottom-up, replacing every recognized function
/// application with its result.
fn reduce_value(
    value: Value,
    registry: &FunctionRegistry,
    env: &TemplateEnv<'_>,
    diags: &mut Diagnostics,
) -> Result<Value, ParseError> {
    match value {
        Value::List(items) => {
            let reduced = items
                .into_iter()
                .map(|item| reduce_value(item, registry, env, diags))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::List(reduced))
        }
        Value::Map(entries) => {
            let reduced = entries
                .into_iter()
                .map(|(key, value)| Ok((key, reduce_value(value, registry, env, diags)?)))
                .collect::<Result<Vec<_>, ParseError>>()?;

            if reduced.len() == 1 {
                if let Some(kind) = registry.lookup(&reduced[0].0) {
                    let (trigger, args) = &reduced[0];
                    return registry.apply(trigger, kind, args, env, diags);
                }
            }
            Ok(Value::Map(reduced))
        }
        scalar => Ok(scalar),
    }
}
