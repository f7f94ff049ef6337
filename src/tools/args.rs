use serde_json::{Map, Value};

use webrig_core_types::RigError;

type Args = Map<String, Value>;

pub fn required_str(args: &Args, field: &str) -> Result<String, RigError> {
    match args.get(field) {
        Some(Value::String(value)) if !value.is_empty() => Ok(value.clone()),
        Some(Value::String(_)) => Err(RigError::validation(field, "must not be empty")),
        Some(_) => Err(RigError::validation(field, "must be a string")),
        None => Err(RigError::validation(field, "is required")),
    }
}

pub fn optional_str(args: &Args, field: &str) -> Result<Option<String>, RigError> {
    match args.get(field) {
        Some(Value::String(value)) => Ok(Some(value.clone())),
        Some(Value::Null) | None => Ok(None),
        Some(_) => Err(RigError::validation(field, "must be a string")),
    }
}

pub fn optional_bool(args: &Args, field: &str) -> Result<Option<bool>, RigError> {
    match args.get(field) {
        Some(Value::Bool(value)) => Ok(Some(*value)),
        Some(Value::Null) | None => Ok(None),
        Some(_) => Err(RigError::validation(field, "must be a boolean")),
    }
}

pub fn optional_u64(args: &Args, field: &str) -> Result<Option<u64>, RigError> {
    match args.get(field) {
        Some(Value::Number(value)) => value
            .as_u64()
            .map(Some)
            .ok_or_else(|| RigError::validation(field, "must be a non-negative integer")),
        Some(Value::Null) | None => Ok(None),
        Some(_) => Err(RigError::validation(field, "must be a number")),
    }
}

pub fn optional_object(args: &Args, field: &str) -> Result<Option<Args>, RigError> {
    match args.get(field) {
        Some(Value::Object(value)) => Ok(Some(value.clone())),
        Some(Value::Null) | None => Ok(None),
        Some(_) => Err(RigError::validation(field, "must be an object")),
    }
}

pub fn optional_str_list(args: &Args, field: &str) -> Result<Option<Vec<String>>, RigError> {
    match args.get(field) {
        Some(Value::Array(values)) => values
            .iter()
            .map(|value| match value {
                Value::String(s) => Ok(s.clone()),
                _ => Err(RigError::validation(field, "must be an array of strings")),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
        Some(Value::Null) | None => Ok(None),
        Some(_) => Err(RigError::validation(field, "must be an array")),
    }
}
