//! Knowledge base loading.
//!
//! Two entry points share one typed path: [`from_file`] for the JSON file
//! named in config and [`from_value`] for an already-parsed document (tests,
//! embedding callers). Any shape problem is an [`AppError::Config`].

use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::AppError;
use super::{Category, Entry, KnowledgeStore, Subcategory};

const SUBCATEGORY_KEY: &str = "subkategori";
const DESCRIPTION_KEY: &str = "deskripsi";

/// Source shape of one `subkategori` member; the name comes from its key.
#[derive(Deserialize)]
struct RawSubcategory {
    #[serde(rename = "deskripsi", default)]
    description: Option<String>,
    #[serde(rename = "contoh_obat", default)]
    examples: Vec<String>,
    #[serde(rename = "dosis_umum", default)]
    usual_dosage: Option<String>,
    #[serde(rename = "efek_samping", default)]
    side_effects: Vec<String>,
}

/// Read and parse the knowledge base file at `path`.
pub fn from_file(path: &Path) -> Result<KnowledgeStore, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;
    from_json_str(&raw)
        .map_err(|e| AppError::Config(format!("{}: {e}", path.display())))
}

pub fn from_json_str(raw: &str) -> Result<KnowledgeStore, AppError> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| AppError::Config(format!("knowledge base parse error: {e}")))?;
    from_value(value)
}

/// Build a store from a parsed JSON document.
pub fn from_value(value: Value) -> Result<KnowledgeStore, AppError> {
    let Value::Object(root) = value else {
        return Err(AppError::Config("knowledge base root must be a JSON object".into()));
    };

    let mut categories = Vec::with_capacity(root.len());
    for (name, body) in root {
        if name.trim().is_empty() {
            return Err(AppError::Config("category name must not be empty".into()));
        }
        let category = match body {
            Value::Array(items) => Category {
                entries: parse_entries(&name, items)?,
                name,
                description: None,
                subcategories: Vec::new(),
            },
            Value::Object(map) => parse_nested(name, map)?,
            other => {
                return Err(AppError::Config(format!(
                    "category '{name}' must be a list of entries or an object, got {}",
                    type_name(&other)
                )));
            }
        };
        categories.push(category);
    }

    Ok(KnowledgeStore::new(categories))
}

fn parse_entries(category: &str, items: Vec<Value>) -> Result<Vec<Entry>, AppError> {
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            let entry: Entry = serde_json::from_value(item).map_err(|e| {
                AppError::Config(format!("entry #{i} in category '{category}': {e}"))
            })?;
            if entry.name.trim().is_empty() {
                return Err(AppError::Config(format!(
                    "entry #{i} in category '{category}' has an empty 'nama'"
                )));
            }
            Ok(entry)
        })
        .collect()
}

fn parse_nested(name: String, mut map: Map<String, Value>) -> Result<Category, AppError> {
    let description = match map.remove(DESCRIPTION_KEY) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => {
            return Err(AppError::Config(format!(
                "category '{name}': '{DESCRIPTION_KEY}' must be a string, got {}",
                type_name(&other)
            )));
        }
    };

    let Some(Value::Object(subs)) = map.remove(SUBCATEGORY_KEY) else {
        return Err(AppError::Config(format!(
            "category '{name}' is an object but has no '{SUBCATEGORY_KEY}' object"
        )));
    };

    let mut subcategories = Vec::with_capacity(subs.len());
    for (sub_name, body) in subs {
        if sub_name.trim().is_empty() {
            return Err(AppError::Config(format!(
                "category '{name}' has a subcategory with an empty name"
            )));
        }
        let raw: RawSubcategory = serde_json::from_value(body).map_err(|e| {
            AppError::Config(format!("subcategory '{sub_name}' in '{name}': {e}"))
        })?;
        subcategories.push(Subcategory {
            name: sub_name,
            description: raw.description,
            examples: raw.examples,
            usual_dosage: raw.usual_dosage,
            side_effects: raw.side_effects,
        });
    }

    Ok(Category { name, description, entries: Vec::new(), subcategories })
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
