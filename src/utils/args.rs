use crate::errors::ToolError;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Decodes tool arguments into a typed struct. A missing arguments object is
/// treated as `{}` so tools without required fields can be called bare, and a
/// `null` member means the same as leaving it out, so defaults still apply.
pub fn parse_args<T: DeserializeOwned>(tool: &str, args: Value) -> Result<T, ToolError> {
    let args = match args {
        Value::Null => Value::Object(Map::new()),
        other => drop_nulls(other),
    };
    serde_json::from_value(args).map_err(|err| {
        ToolError::invalid_params(format!("Invalid arguments for {}: {}", tool, err))
            .with_hint("Call tools/list to see the argument schema")
    })
}

fn drop_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, drop_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(drop_nulls).collect()),
        other => other,
    }
}

pub fn default_true() -> bool {
    true
}
