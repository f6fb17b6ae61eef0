//! Conversion of untrusted input onto a working copy
//!
//! The pipeline only sees the [`SchemaConverter`] trait. [`FormConverter`]
//! is the default implementation: it walks the schema, coerces each
//! submitted value to its field type and writes it onto the piece.
//! Fields absent from the input keep their current value, so partial
//! bodies are fine as long as required fields end up populated.

use super::error::{Result, SchemaError};
use super::types::{Field, FieldType, Schema};
use crate::Piece;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// Maps raw input fields onto a piece according to a schema
#[async_trait]
pub trait SchemaConverter: Send + Sync {
    /// # Errors
    ///
    /// Returns `SchemaError` if any value is rejected.
    async fn convert(&self, schema: &Schema, input: &Map<String, Value>, piece: &mut Piece) -> Result<()>;
}

/// Default form-style converter
#[derive(Debug, Clone, Copy, Default)]
pub struct FormConverter;

#[async_trait]
impl SchemaConverter for FormConverter {
    async fn convert(&self, schema: &Schema, input: &Map<String, Value>, piece: &mut Piece) -> Result<()> {
        for field in schema.fields() {
            let raw = input.get(&field.name).filter(|value| !is_blank(value));
            match raw {
                Some(raw) => {
                    let value = convert_field(field, raw)?;
                    apply(piece, &field.name, value);
                }
                None if field.required && is_blank(&piece.field(&field.name).unwrap_or(Value::Null)) => {
                    return Err(SchemaError::Required(field.name.clone()));
                }
                None => {}
            }
        }
        Ok(())
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn apply(piece: &mut Piece, name: &str, value: Value) {
    match (name, &value) {
        ("title", Value::String(title)) => piece.title.clone_from(title),
        ("published", Value::Bool(flag)) => piece.published = *flag,
        _ => piece.set_field(name, value),
    }
}

fn invalid(field: &Field, reason: impl Into<String>) -> SchemaError {
    SchemaError::Invalid {
        field: field.name.clone(),
        reason: reason.into(),
    }
}

/// Coerce one raw value to the field's type
///
/// # Errors
///
/// Returns `SchemaError` if the value cannot represent the field type.
pub fn convert_field(field: &Field, raw: &Value) -> Result<Value> {
    match field.field_type {
        FieldType::String => match raw {
            Value::String(s) => Ok(Value::String(s.trim().to_string())),
            Value::Number(n) => Ok(Value::String(n.to_string())),
            Value::Bool(b) => Ok(Value::String(b.to_string())),
            _ => Err(invalid(field, "expected text")),
        },
        FieldType::Integer => match raw {
            Value::Number(n) if n.is_i64() => Ok(raw.clone()),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| invalid(field, format!("'{s}' is not an integer"))),
            _ => Err(invalid(field, "expected an integer")),
        },
        FieldType::Float => match raw {
            Value::Number(_) => Ok(raw.clone()),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| invalid(field, format!("'{s}' is not a number"))),
            _ => Err(invalid(field, "expected a number")),
        },
        FieldType::Boolean => match raw {
            Value::Bool(_) => Ok(raw.clone()),
            Value::Number(n) => Ok(Value::Bool(n.as_i64() != Some(0))),
            Value::String(s) => match s.trim().to_lowercase().as_str() {
                "1" | "true" | "on" | "yes" => Ok(Value::Bool(true)),
                "0" | "false" | "off" | "no" => Ok(Value::Bool(false)),
                other => Err(invalid(field, format!("'{other}' is not a boolean"))),
            },
            _ => Err(invalid(field, "expected a boolean")),
        },
        FieldType::Select => {
            let value = raw
                .as_str()
                .map(str::trim)
                .ok_or_else(|| invalid(field, "expected a choice"))?;
            if field.choices.iter().any(|choice| choice.value == value) {
                Ok(Value::String(value.to_string()))
            } else {
                Err(SchemaError::UnknownChoice {
                    field: field.name.clone(),
                    value: value.to_string(),
                })
            }
        }
        FieldType::Tags => {
            let tags: Vec<String> = match raw {
                Value::String(s) => s.split(',').map(str::to_string).collect(),
                Value::Array(items) => items
                    .iter()
                    .map(|item| item.as_str().map(str::to_string))
                    .collect::<Option<_>>()
                    .ok_or_else(|| invalid(field, "tags must be strings"))?,
                _ => return Err(invalid(field, "expected tags")),
            };
            let mut cleaned: Vec<Value> = Vec::new();
            for tag in tags {
                let tag = Value::String(tag.trim().to_lowercase());
                if tag.as_str().is_some_and(|t| !t.is_empty()) && !cleaned.contains(&tag) {
                    cleaned.push(tag);
                }
            }
            Ok(Value::Array(cleaned))
        }
        FieldType::JoinByOne => match raw {
            Value::String(id) if is_valid_id(id) => Ok(Value::String(id.clone())),
            _ => Err(invalid(field, "expected a piece id")),
        },
        FieldType::JoinByArray => convert_join_array(field, raw),
    }
}

/// Join arrays accept ids or `{value, relationship}` objects; the latter
/// keep their relationship data when the field declares a relationship.
fn convert_join_array(field: &Field, raw: &Value) -> Result<Value> {
    let Value::Array(items) = raw else {
        return Err(invalid(field, "expected a list of piece ids"));
    };
    if let Some(limit) = field.limit
        && items.len() > limit
    {
        return Err(invalid(field, format!("at most {limit} references allowed")));
    }

    let mut seen: Vec<&str> = Vec::new();
    let mut converted = Vec::with_capacity(items.len());
    for item in items {
        let (id, relationship) = match item {
            Value::String(id) => (id.as_str(), None),
            Value::Object(object) => (
                object.get("value").and_then(Value::as_str).unwrap_or_default(),
                object.get("relationship").and_then(Value::as_object),
            ),
            _ => return Err(invalid(field, "expected a piece id")),
        };
        if !is_valid_id(id) {
            return Err(invalid(field, format!("'{id}' is not a piece id")));
        }
        if seen.contains(&id) {
            continue;
        }
        seen.push(id);

        match relationship {
            Some(data) if !field.relationship.is_empty() => {
                let mut pair = Map::new();
                for rel_field in &field.relationship {
                    if let Some(raw) = data.get(&rel_field.name).filter(|v| !is_blank(v)) {
                        pair.insert(rel_field.name.clone(), convert_field(rel_field, raw)?);
                    }
                }
                let mut object = Map::new();
                object.insert("value".into(), Value::String(id.to_string()));
                object.insert("relationship".into(), Value::Object(pair));
                converted.push(Value::Object(object));
            }
            _ => converted.push(Value::String(id.to_string())),
        }
    }
    Ok(Value::Array(converted))
}

fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
