use crate::atom::Atom;
use crate::property::{Property, PropertyKind, PropertyValue};
use crate::registry::Registry;
use serde::Serialize;
use serde_json::{Map, Value, json};

/// A JSON-serializable view of an atom tree.
///
/// Suitable for `mp4dump --json` or for handing a tree to a UI.
#[derive(Debug, Serialize)]
pub struct JsonAtom {
    /// Four-character type code (non-printable bytes shown as '.')
    pub typ: String,
    /// Total size including header, as it would be written now
    pub size: u64,
    pub header_size: u64,
    /// Human-readable box name from the registry, when known
    pub full_name: Option<String>,
    /// True when no schema was registered and the payload is kept verbatim
    pub opaque: bool,
    pub properties: Vec<JsonProperty>,
    pub children: Vec<JsonAtom>,
}

#[derive(Debug, Serialize)]
pub struct JsonProperty {
    pub name: String,
    pub kind: &'static str,
    pub value: Value,
}

pub fn tree_to_json(atom: &Atom, registry: &Registry) -> JsonAtom {
    JsonAtom {
        typ: atom.typ().to_string(),
        size: atom.size(),
        header_size: atom.header_size(),
        full_name: registry.name(atom.typ()).map(str::to_string),
        opaque: atom.is_opaque(),
        properties: atom
            .properties()
            .iter()
            .filter(|p| !p.is_reserved())
            .map(property_to_json)
            .collect(),
        children: atom
            .children()
            .iter()
            .map(|c| tree_to_json(c, registry))
            .collect(),
    }
}

fn property_to_json(p: &Property) -> JsonProperty {
    let value = match (p.kind(), p.value()) {
        (_, PropertyValue::Integer(v)) => json!(v),
        (_, PropertyValue::Bytes(b)) => json!(hex::encode(b)),
        (PropertyKind::Table { columns, .. }, PropertyValue::Rows(rows)) => Value::Array(
            rows.iter()
                .map(|row| {
                    let obj: Map<String, Value> = columns
                        .iter()
                        .zip(row)
                        .map(|(c, v)| (c.name.clone(), json!(v)))
                        .collect();
                    Value::Object(obj)
                })
                .collect(),
        ),
        _ => Value::Null,
    };
    JsonProperty {
        name: p.name().to_string(),
        kind: p.kind().name(),
        value,
    }
}
