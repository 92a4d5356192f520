//! Node manifest model
//!
//! A node image carries `node.json` (structured manifest) and `help.md`
//! (free-text description). [`NodeManifest::parse`] turns them into a
//! validated value: required fields are checked and the optional
//! substructures of `input`/`output` are repaired into their canonical shape.

use crate::error::{MiqroforgeError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Discriminator written to the catalog `type` column for container-backed nodes
pub const CONTAINER_NODE_TYPE: &str = "C";

/// List field that `input` must carry
pub const INPUT_LINK_FIELD: &str = "upstream";
/// List field that `output` must carry
pub const OUTPUT_LINK_FIELD: &str = "downstream";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeManifest {
    pub id: String,
    /// Display name; either a plain string or a per-language object
    pub name: Value,
    pub description: String,
    pub version: String,
    pub color: String,
    pub tag: String,
    pub input: Map<String, Value>,
    pub output: Map<String, Value>,
    pub performance_config_path: String,
    pub example_config_path: String,
    pub contact: Map<String, Value>,
    /// Source image reference, supplied by the pipeline rather than node.json
    pub image: String,
    pub execution_command: String,
}

impl NodeManifest {
    /// Parse and validate `node.json` contents, merging in the help text
    pub fn parse(node_json: &[u8], help: &str, image: &str) -> Result<Self> {
        let document: Value = serde_json::from_slice(node_json)
            .map_err(|e| MiqroforgeError::ManifestParse(format!("node.json: {}", e)))?;
        let Value::Object(mut fields) = document else {
            return Err(MiqroforgeError::ManifestParse(
                "node.json: top level must be an object".to_string(),
            ));
        };

        let id = match fields.remove("id") {
            Some(Value::String(id)) if !id.trim().is_empty() => id,
            Some(Value::String(_)) => {
                return Err(MiqroforgeError::ManifestValidation(
                    "field `id` must not be empty".to_string(),
                ));
            }
            Some(_) => {
                return Err(MiqroforgeError::ManifestValidation(
                    "field `id` must be a string".to_string(),
                ));
            }
            None => {
                return Err(MiqroforgeError::ManifestValidation(
                    "missing required field `id`".to_string(),
                ));
            }
        };

        let mut input = take_section(&mut fields, "input")?;
        let mut output = take_section(&mut fields, "output")?;
        normalize_section(&mut input, INPUT_LINK_FIELD);
        normalize_section(&mut output, OUTPUT_LINK_FIELD);

        let manifest_description = take_string(&mut fields, "description");
        let help = help.trim();
        let description = if help.is_empty() {
            manifest_description
        } else {
            help.to_string()
        };

        let name = match fields.remove("name") {
            Some(Value::Null) | None => Value::String(String::new()),
            Some(name) => name,
        };
        let contact = match fields.remove("contact") {
            Some(Value::Object(contact)) => contact,
            _ => Map::new(),
        };

        Ok(Self {
            id,
            name,
            description,
            version: take_string(&mut fields, "version"),
            color: take_string(&mut fields, "color"),
            tag: take_string(&mut fields, "tag"),
            input,
            output,
            performance_config_path: take_string(&mut fields, "performance_config_path"),
            example_config_path: take_string(&mut fields, "example_config_path"),
            contact,
            image: image.to_string(),
            execution_command: take_string(&mut fields, "execution_command"),
        })
    }

    pub fn node_type(&self) -> &'static str {
        CONTAINER_NODE_TYPE
    }

    pub fn upstream(&self) -> &[Value] {
        link_list(&self.input, INPUT_LINK_FIELD)
    }

    pub fn downstream(&self) -> &[Value] {
        link_list(&self.output, OUTPUT_LINK_FIELD)
    }

    /// Name as shown to operators: the string itself, or the first string
    /// value of a per-language object
    pub fn display_name(&self) -> String {
        match &self.name {
            Value::String(name) => name.clone(),
            Value::Object(names) => names
                .values()
                .find_map(|v| v.as_str().map(str::to_string))
                .unwrap_or_default(),
            other => other.to_string(),
        }
    }
}

fn take_section(fields: &mut Map<String, Value>, key: &str) -> Result<Map<String, Value>> {
    match fields.remove(key) {
        Some(Value::Object(section)) => Ok(section),
        Some(_) => Err(MiqroforgeError::ManifestValidation(format!(
            "field `{}` must be an object",
            key
        ))),
        None => Err(MiqroforgeError::ManifestValidation(format!(
            "missing required field `{}`",
            key
        ))),
    }
}

fn take_string(fields: &mut Map<String, Value>, key: &str) -> String {
    match fields.remove(key) {
        Some(Value::String(s)) => s,
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn link_list<'a>(section: &'a Map<String, Value>, field: &str) -> &'a [Value] {
    section
        .get(field)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Repair the link list and every `web[].ui` entry of one section
pub fn normalize_section(section: &mut Map<String, Value>, link_field: &str) {
    if !section.get(link_field).is_some_and(Value::is_array) {
        section.insert(link_field.to_string(), Value::Array(Vec::new()));
    }

    if let Some(Value::Array(entries)) = section.get_mut("web") {
        for entry in entries.iter_mut() {
            if let Some(ui) = entry.as_object_mut().and_then(|e| e.get_mut("ui")) {
                normalize_ui(ui);
            }
        }
    }
}

/// `"foo"` becomes `{"foo": ""}`; anything else that is not an object becomes `{}`
pub fn normalize_ui(ui: &mut Value) {
    let normalized = match ui.take() {
        Value::Object(map) => Value::Object(map),
        Value::String(key) => {
            let mut map = Map::new();
            map.insert(key, Value::String(String::new()));
            Value::Object(map)
        }
        _ => Value::Object(Map::new()),
    };
    *ui = normalized;
}
