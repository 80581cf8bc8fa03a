//! Flattening of nested JSON documents into path-addressed leaves

use crate::error::{IndexError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use strum::{Display, EnumString};

/// Default traversal limit, equal to serde_json's parse recursion limit
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Kind of a flattened leaf
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Null,
    EmptyObject,
    EmptyArray,
}

/// One scalar leaf of a document, addressed by its full path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlattenedField {
    pub path: String,
    pub field_type: FieldType,
    pub value: Value,
}

impl FlattenedField {
    /// String content, if this is a string leaf
    pub fn as_str(&self) -> Option<&str> {
        match self.field_type {
            FieldType::String => self.value.as_str(),
            _ => None,
        }
    }
}

/// Flat view of a document: path -> leaf, ordered by path
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlattenedDocument {
    leaves: BTreeMap<String, FlattenedField>,
}

impl FlattenedDocument {
    pub fn get(&self, path: &str) -> Option<&FlattenedField> {
        self.leaves.get(path)
    }

    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = &FlattenedField> {
        self.leaves.values()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.leaves.keys().map(String::as_str)
    }
}

/// Flatten `content` into leaves, failing once nesting goes past `max_depth`.
///
/// Object members are joined with `.`, array elements are addressed as `[i]`.
/// The root sits at depth 0.
pub fn flatten(content: &Value, max_depth: usize) -> Result<FlattenedDocument> {
    let mut document = FlattenedDocument::default();
    let mut path = String::new();
    walk(content, &mut path, 0, max_depth, &mut document.leaves)?;
    Ok(document)
}

fn walk(
    value: &Value,
    path: &mut String,
    depth: usize,
    max_depth: usize,
    leaves: &mut BTreeMap<String, FlattenedField>,
) -> Result<()> {
    if depth > max_depth {
        return Err(IndexError::DepthExceeded {
            max_depth,
            path: path.clone(),
        });
    }

    match value {
        Value::Object(members) if members.is_empty() => {
            insert_leaf(leaves, path, FieldType::EmptyObject, value);
        }
        Value::Object(members) => {
            for (name, child) in members {
                let mark = path.len();
                if !path.is_empty() {
                    path.push('.');
                }
                path.push_str(name);
                walk(child, path, depth + 1, max_depth, leaves)?;
                path.truncate(mark);
            }
        }
        Value::Array(elements) if elements.is_empty() => {
            insert_leaf(leaves, path, FieldType::EmptyArray, value);
        }
        Value::Array(elements) => {
            for (index, child) in elements.iter().enumerate() {
                let mark = path.len();
                path.push('[');
                path.push_str(&index.to_string());
                path.push(']');
                walk(child, path, depth + 1, max_depth, leaves)?;
                path.truncate(mark);
            }
        }
        Value::String(_) => insert_leaf(leaves, path, FieldType::String, value),
        Value::Number(_) => insert_leaf(leaves, path, FieldType::Number, value),
        Value::Bool(_) => insert_leaf(leaves, path, FieldType::Boolean, value),
        Value::Null => insert_leaf(leaves, path, FieldType::Null, value),
    }

    Ok(())
}

fn insert_leaf(
    leaves: &mut BTreeMap<String, FlattenedField>,
    path: &str,
    field_type: FieldType,
    value: &Value,
) {
    leaves.insert(
        path.to_string(),
        FlattenedField {
            path: path.to_string(),
            field_type,
            value: value.clone(),
        },
    );
}
