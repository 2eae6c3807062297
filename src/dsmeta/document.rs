//! # Documents
//!
//! Conversion between trees and the plain nested-map representation
//! (`serde_json::Value`), plus YAML/JSON text.
//!
//! ## Full format
//!
//! ```yaml
//! type_name: table
//! attributes:
//!   - type_name: list
//!     key: data
//!     value:
//!       - {type_name: string, key: name, value: people}
//!     permissions: {read: [<uuid>], write_value: null}
//! child_nodes: [...]
//! permissions: {...}
//! ```
//!
//! Every attribute carries its `type_name`. Absent keys and permissions are
//! omitted on output and accepted as absent or `null` on input. Round trips are
//! loss-free.
//!
//! ## Simple format
//!
//! ```yaml
//! type_name: table
//! attributes:
//!   data: {name: people, rows: 10}
//!   tags: [a, b]
//! child_nodes: [...]
//! ```
//!
//! Keyed groups are mappings, explicit lists are sequences and scalar kinds are
//! inferred. Strings stay strings even when they look like timestamps; the
//! specification's defaults pass turns them into datetimes where its rules ask
//! for one. Permissions are dropped on output and re-derived by defaults on
//! load. Node-valued attributes have no simple representation.

use crate::attribute::{format_datetime, parse_datetime, Attribute, AttributeKind, AttributeValue};
use crate::error::{MetaError, Result};
use crate::node::{Node, NodeType};
use crate::permissions::Permissions;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

const TYPE_NAME: &str = "type_name";
const KEY: &str = "key";
const VALUE: &str = "value";
const ATTRIBUTES: &str = "attributes";
const CHILD_NODES: &str = "child_nodes";
const PERMISSIONS: &str = "permissions";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Format {
    #[default]
    Full,
    Simple,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Full => "full",
            Format::Simple => "simple",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = MetaError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "full" => Ok(Format::Full),
            "simple" => Ok(Format::Simple),
            other => Err(MetaError::structural(
                "format",
                format!("unknown document format '{}'", other),
            )),
        }
    }
}

/// Text encoding of a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextFormat {
    #[default]
    Yaml,
    Json,
}

impl TextFormat {
    /// `.json` files are JSON, everything else is YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => TextFormat::Json,
            _ => TextFormat::Yaml,
        }
    }

    pub fn parse(&self, text: &str) -> Result<Value> {
        match self {
            TextFormat::Yaml => Ok(serde_yaml::from_str(text)?),
            TextFormat::Json => Ok(serde_json::from_str(text)?),
        }
    }

    pub fn render(&self, value: &Value) -> Result<String> {
        match self {
            TextFormat::Yaml => Ok(serde_yaml::to_string(value)?),
            TextFormat::Json => Ok(serde_json::to_string_pretty(value)?),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TextFormat::Yaml => "yaml",
            TextFormat::Json => "json",
        }
    }
}

impl fmt::Display for TextFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TextFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "yaml" | "yml" => Ok(TextFormat::Yaml),
            "json" => Ok(TextFormat::Json),
            other => Err(format!("unknown text format '{}' (expected yaml or json)", other)),
        }
    }
}

pub fn node_from_value(value: &Value, format: Format) -> Result<Node> {
    match format {
        Format::Full => full::node_from_value(value, "node"),
        Format::Simple => simple::node_from_value(value, "node"),
    }
}

pub fn node_to_value(node: &Node, format: Format) -> Result<Value> {
    match format {
        Format::Full => full::node_to_value(node),
        Format::Simple => simple::node_to_value(node),
    }
}

fn as_object<'a>(value: &'a Value, path: &str, what: &str) -> Result<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| MetaError::structural(path, format!("expected {} mapping", what)))
}

fn check_fields(map: &Map<String, Value>, allowed: &[&str], path: &str) -> Result<()> {
    match map.keys().find(|k| !allowed.contains(&k.as_str())) {
        Some(unknown) => Err(MetaError::structural(
            path,
            format!("unexpected field '{}'", unknown),
        )),
        None => Ok(()),
    }
}

fn node_type(map: &Map<String, Value>, path: &str) -> Result<NodeType> {
    map.get(TYPE_NAME)
        .and_then(Value::as_str)
        .ok_or_else(|| MetaError::structural(path, "missing type_name"))?
        .parse()
        .map_err(|e: String| MetaError::structural(path, e))
}

/// Optional sequence field; absent and `null` both read as empty.
fn sequence<'a>(map: &'a Map<String, Value>, field: &str, path: &str) -> Result<&'a [Value]> {
    match map.get(field) {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(MetaError::structural(
            path,
            format!("{} must be a sequence", field),
        )),
    }
}

fn float(x: f64, path: &str) -> Result<Value> {
    Number::from_f64(x)
        .map(Value::Number)
        .ok_or_else(|| MetaError::structural(path, format!("{} has no document representation", x)))
}

mod full {
    use super::*;

    pub(super) fn node_from_value(value: &Value, path: &str) -> Result<Node> {
        let map = as_object(value, path, "a node")?;
        check_fields(map, &[TYPE_NAME, ATTRIBUTES, CHILD_NODES, PERMISSIONS], path)?;
        let node_type = node_type(map, path)?;

        let attributes = sequence(map, ATTRIBUTES, path)?
            .iter()
            .enumerate()
            .map(|(i, a)| attribute_from_value(a, &format!("{}.{}[{}]", path, ATTRIBUTES, i)))
            .collect::<Result<Vec<_>>>()?;
        let children = sequence(map, CHILD_NODES, path)?
            .iter()
            .enumerate()
            .map(|(i, c)| node_from_value(c, &format!("{}/{}[{}]", path, CHILD_NODES, i)))
            .collect::<Result<Vec<_>>>()?;
        let permissions = permissions_from_value(map.get(PERMISSIONS), path)?;

        Node::new(node_type, attributes, children, permissions)
    }

    fn attribute_from_value(value: &Value, path: &str) -> Result<Attribute> {
        let map = as_object(value, path, "an attribute")?;
        check_fields(map, &[TYPE_NAME, KEY, VALUE, PERMISSIONS], path)?;
        let kind: AttributeKind = map
            .get(TYPE_NAME)
            .and_then(Value::as_str)
            .ok_or_else(|| MetaError::structural(path, "missing type_name"))?
            .parse()
            .map_err(|e: String| MetaError::structural(path, e))?;
        let key = match map.get(KEY) {
            None | Some(Value::Null) => None,
            Some(Value::String(key)) => Some(key.clone()),
            Some(_) => return Err(MetaError::structural(path, "key must be a string")),
        };
        let path = match &key {
            Some(key) => format!("{}({})", path, key),
            None => path.to_string(),
        };
        let raw = map
            .get(VALUE)
            .ok_or_else(|| MetaError::structural(&path, "missing value"))?;
        let value = value_from_raw(kind, raw, &path)?;
        let permissions = permissions_from_value(map.get(PERMISSIONS), &path)?;
        Attribute::new(key, value, permissions)
    }

    fn value_from_raw(kind: AttributeKind, raw: &Value, path: &str) -> Result<AttributeValue> {
        let mismatch = || MetaError::structural(path, format!("value is not a valid {}", kind));
        Ok(match kind {
            AttributeKind::Bool => AttributeValue::Bool(raw.as_bool().ok_or_else(mismatch)?),
            AttributeKind::Int => AttributeValue::Int(raw.as_i64().ok_or_else(mismatch)?),
            AttributeKind::Float => AttributeValue::Float(raw.as_f64().ok_or_else(mismatch)?),
            AttributeKind::String => {
                AttributeValue::String(raw.as_str().ok_or_else(mismatch)?.to_string())
            }
            AttributeKind::DateTime => AttributeValue::DateTime(
                raw.as_str().and_then(parse_datetime).ok_or_else(mismatch)?,
            ),
            AttributeKind::List => AttributeValue::List(members(raw, path)?),
            AttributeKind::Map => {
                let mut map = BTreeMap::new();
                for member in members(raw, path)? {
                    let Some(key) = member.key().map(str::to_string) else {
                        return Err(MetaError::structural(path, "dict members must be keyed"));
                    };
                    if map.insert(key.clone(), member).is_some() {
                        return Err(MetaError::structural(
                            path,
                            format!("duplicate attribute key '{}'", key),
                        ));
                    }
                }
                AttributeValue::Map(map)
            }
            AttributeKind::Node => AttributeValue::Node(Box::new(node_from_value(raw, path)?)),
        })
    }

    fn members(raw: &Value, path: &str) -> Result<Vec<Attribute>> {
        raw.as_array()
            .ok_or_else(|| MetaError::structural(path, "value must be a sequence of attributes"))?
            .iter()
            .enumerate()
            .map(|(i, item)| attribute_from_value(item, &format!("{}[{}]", path, i)))
            .collect()
    }

    fn permissions_from_value(value: Option<&Value>, path: &str) -> Result<Option<Permissions>> {
        match value {
            None | Some(Value::Null) => Ok(None),
            Some(raw) => serde_json::from_value(raw.clone())
                .map(Some)
                .map_err(|e| MetaError::structural(path, format!("malformed permissions: {}", e))),
        }
    }

    pub(super) fn node_to_value(node: &Node) -> Result<Value> {
        let mut map = Map::new();
        map.insert(TYPE_NAME.into(), Value::from(node.node_type().as_str()));
        if !node.attributes().is_empty() {
            let attributes = node
                .attributes()
                .iter()
                .map(|a| attribute_to_value(a, &node.label()))
                .collect::<Result<Vec<_>>>()?;
            map.insert(ATTRIBUTES.into(), Value::Array(attributes));
        }
        if !node.children().is_empty() {
            let children = node
                .children()
                .iter()
                .map(node_to_value)
                .collect::<Result<Vec<_>>>()?;
            map.insert(CHILD_NODES.into(), Value::Array(children));
        }
        if let Some(permissions) = node.permissions() {
            map.insert(PERMISSIONS.into(), serde_json::to_value(permissions)?);
        }
        Ok(Value::Object(map))
    }

    fn attribute_to_value(attribute: &Attribute, path: &str) -> Result<Value> {
        let path = match attribute.key() {
            Some(key) => format!("{}.{}", path, key),
            None => format!("{}[]", path),
        };
        let mut map = Map::new();
        map.insert(TYPE_NAME.into(), Value::from(attribute.kind().as_str()));
        if let Some(key) = attribute.key() {
            map.insert(KEY.into(), Value::from(key));
        }
        let value = match attribute.value() {
            AttributeValue::Bool(b) => Value::Bool(*b),
            AttributeValue::Int(i) => Value::from(*i),
            AttributeValue::Float(x) => float(*x, &path)?,
            AttributeValue::String(s) => Value::from(s.as_str()),
            AttributeValue::DateTime(dt) => Value::from(format_datetime(dt)),
            AttributeValue::List(items) => Value::Array(
                items
                    .iter()
                    .map(|a| attribute_to_value(a, &path))
                    .collect::<Result<Vec<_>>>()?,
            ),
            AttributeValue::Map(items) => Value::Array(
                items
                    .values()
                    .map(|a| attribute_to_value(a, &path))
                    .collect::<Result<Vec<_>>>()?,
            ),
            AttributeValue::Node(node) => node_to_value(node)?,
        };
        map.insert(VALUE.into(), value);
        if let Some(permissions) = attribute.permissions() {
            map.insert(PERMISSIONS.into(), serde_json::to_value(permissions)?);
        }
        Ok(Value::Object(map))
    }
}

mod simple {
    use super::*;

    pub(super) fn node_from_value(value: &Value, path: &str) -> Result<Node> {
        let map = as_object(value, path, "a node")?;
        check_fields(map, &[TYPE_NAME, ATTRIBUTES, CHILD_NODES], path)?;
        let node_type = node_type(map, path)?;

        let attributes = match map.get(ATTRIBUTES) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Object(attributes)) => keyed(attributes, &format!("{}.{}", path, ATTRIBUTES))?,
            Some(_) => {
                return Err(MetaError::structural(path, "attributes must be a mapping"));
            }
        };
        let children = sequence(map, CHILD_NODES, path)?
            .iter()
            .enumerate()
            .map(|(i, c)| node_from_value(c, &format!("{}/{}[{}]", path, CHILD_NODES, i)))
            .collect::<Result<Vec<_>>>()?;

        Node::new(node_type, attributes, children, None)
    }

    fn keyed(map: &Map<String, Value>, path: &str) -> Result<Vec<Attribute>> {
        map.iter()
            .map(|(key, raw)| {
                let value = infer(raw, &format!("{}.{}", path, key))?;
                Ok(Attribute::keyed(key.as_str(), value))
            })
            .collect()
    }

    fn infer(raw: &Value, path: &str) -> Result<AttributeValue> {
        Ok(match raw {
            Value::Null => return Err(MetaError::structural(path, "null values are not allowed")),
            Value::Bool(b) => AttributeValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => AttributeValue::Int(i),
                None => AttributeValue::Float(n.as_f64().ok_or_else(|| {
                    MetaError::structural(path, format!("number {} is out of range", n))
                })?),
            },
            Value::String(s) => AttributeValue::String(s.clone()),
            Value::Array(items) => AttributeValue::List(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| Ok(Attribute::element(infer(item, &format!("{}[{}]", path, i))?)))
                    .collect::<Result<Vec<_>>>()?,
            ),
            Value::Object(map) => AttributeValue::List(keyed(map, path)?),
        })
    }

    pub(super) fn node_to_value(node: &Node) -> Result<Value> {
        let mut map = Map::new();
        map.insert(TYPE_NAME.into(), Value::from(node.node_type().as_str()));
        if !node.attributes().is_empty() {
            let path = node.label();
            let mut attributes = Map::new();
            for attribute in node.attributes() {
                let key = attribute.key().unwrap_or_default();
                attributes.insert(key.to_string(), render(attribute.value(), &format!("{}.{}", path, key))?);
            }
            map.insert(ATTRIBUTES.into(), Value::Object(attributes));
        }
        if !node.children().is_empty() {
            let children = node
                .children()
                .iter()
                .map(node_to_value)
                .collect::<Result<Vec<_>>>()?;
            map.insert(CHILD_NODES.into(), Value::Array(children));
        }
        Ok(Value::Object(map))
    }

    fn render(value: &AttributeValue, path: &str) -> Result<Value> {
        Ok(match value {
            AttributeValue::Bool(b) => Value::Bool(*b),
            AttributeValue::Int(i) => Value::from(*i),
            AttributeValue::Float(x) => float(*x, path)?,
            AttributeValue::String(s) => Value::from(s.as_str()),
            AttributeValue::DateTime(dt) => Value::from(format_datetime(dt)),
            AttributeValue::List(items) if items.iter().all(|a| a.key().is_none()) => Value::Array(
                items
                    .iter()
                    .map(|a| render(a.value(), &format!("{}[]", path)))
                    .collect::<Result<Vec<_>>>()?,
            ),
            AttributeValue::List(items) => {
                let mut map = Map::new();
                for item in items {
                    let key = item.key().unwrap_or_default();
                    map.insert(key.to_string(), render(item.value(), &format!("{}.{}", path, key))?);
                }
                Value::Object(map)
            }
            AttributeValue::Map(items) => {
                let mut map = Map::new();
                for (key, item) in items {
                    map.insert(key.clone(), render(item.value(), &format!("{}.{}", path, key))?);
                }
                Value::Object(map)
            }
            AttributeValue::Node(_) => {
                return Err(MetaError::structural(
                    path,
                    "node-valued attributes cannot be written in simple format",
                ))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::Action;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use uuid::Uuid;

    fn sample() -> Node {
        let owner = Uuid::from_u128(1);
        let column = Node::new(
            NodeType::Column,
            vec![
                Attribute::group(
                    "data",
                    vec![
                        Attribute::keyed("name", "joined"),
                        Attribute::keyed("data_type_name", "datetime"),
                    ],
                )
                .unwrap(),
                Attribute::group(
                    "private_sql_and_synthesis",
                    vec![Attribute::keyed(
                        "lower",
                        Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
                    )],
                )
                .unwrap(),
            ],
            vec![],
            None,
        )
        .unwrap();
        Node::new(
            NodeType::Table,
            vec![
                Attribute::group(
                    "data",
                    vec![
                        Attribute::keyed("name", "people"),
                        Attribute::keyed("rows", 10).with_permissions(
                            Permissions::new()
                                .with(Action::Read, Some([owner].into()))
                                .with(Action::WriteValue, None),
                        ),
                    ],
                )
                .unwrap(),
                Attribute::group(
                    "differential_privacy",
                    vec![Attribute::keyed("budget_epsilon", 1.5)],
                )
                .unwrap(),
                Attribute::explicit_list("tags", ["a", "b"]),
            ],
            vec![column],
            Some(Permissions::new().with(Action::Read, None)),
        )
        .unwrap()
    }

    #[test]
    fn full_format_round_trips() {
        let node = sample();
        let value = node_to_value(&node, Format::Full).unwrap();
        assert_eq!(node_from_value(&value, Format::Full).unwrap(), node);

        for text_format in [TextFormat::Yaml, TextFormat::Json] {
            let text = text_format.render(&value).unwrap();
            let parsed = text_format.parse(&text).unwrap();
            assert_eq!(node_from_value(&parsed, Format::Full).unwrap(), node);
        }
    }

    #[test]
    fn full_format_shape() {
        let value = node_to_value(&sample(), Format::Full).unwrap();
        assert_eq!(value["type_name"], "table");
        assert_eq!(value["permissions"], json!({"read": null}));
        let data = &value["attributes"][0];
        assert_eq!(data["type_name"], "list");
        assert_eq!(data["key"], "data");
        assert!(data.get("permissions").is_none());
        assert_eq!(data["value"][1]["value"], 10);
        assert_eq!(
            data["value"][1]["permissions"]["read"],
            json!(["00000000-0000-0000-0000-000000000001"])
        );
        let tags = &value["attributes"][2]["value"];
        assert!(tags[0].get("key").is_none());
    }

    #[test]
    fn full_format_rejects_malformed_input() {
        let missing_type = json!({"attributes": []});
        assert!(matches!(
            node_from_value(&missing_type, Format::Full),
            Err(MetaError::Structural { .. })
        ));

        let unknown_type = json!({"type_name": "view"});
        assert!(node_from_value(&unknown_type, Format::Full).is_err());

        let wrong_value = json!({"type_name": "table", "attributes": [
            {"type_name": "int", "key": "rows", "value": "ten"}
        ]});
        let err = node_from_value(&wrong_value, Format::Full).unwrap_err();
        assert!(err.to_string().contains("not a valid int"));

        let mixed = json!({"type_name": "table", "attributes": [
            {"type_name": "list", "key": "tags", "value": [
                {"type_name": "string", "value": "a"},
                {"type_name": "string", "key": "b", "value": "b"}
            ]}
        ]});
        assert!(node_from_value(&mixed, Format::Full).is_err());

        let bad_uuid = json!({"type_name": "table", "permissions": {"read": ["nope"]}});
        let err = node_from_value(&bad_uuid, Format::Full).unwrap_err();
        assert!(err.to_string().contains("malformed permissions"));

        let duplicate_children = json!({"type_name": "table", "child_nodes": [
            {"type_name": "column"}, {"type_name": "column"}
        ]});
        assert!(node_from_value(&duplicate_children, Format::Full).is_err());
    }

    #[test]
    fn naive_datetimes_are_read_as_utc() {
        let value = json!({"type_name": "column", "attributes": [
            {"type_name": "datetime", "key": "seen", "value": "2021-03-04T05:06:07"}
        ]});
        let node = node_from_value(&value, Format::Full).unwrap();
        assert_eq!(
            node.attribute("seen").and_then(|a| a.value().as_datetime().copied()),
            Some(Utc.with_ymd_and_hms(2021, 3, 4, 5, 6, 7).unwrap())
        );
    }

    #[test]
    fn simple_format_infers_kinds() {
        let yaml = r#"
type_name: table
attributes:
  data:
    name: people
    rows: 10
  differential_privacy:
    budget_epsilon: 1.5
  tags: [a, b]
child_nodes:
  - type_name: column
    attributes:
      private_sql_and_synthesis:
        lower: 2020-01-01T00:00:00Z
"#;
        let value = TextFormat::Yaml.parse(yaml).unwrap();
        let node = node_from_value(&value, Format::Simple).unwrap();

        assert_eq!(node.attribute_path("data.rows").map(|a| a.kind()), Some(AttributeKind::Int));
        assert_eq!(
            node.attribute_path("differential_privacy.budget_epsilon").map(|a| a.kind()),
            Some(AttributeKind::Float)
        );
        assert!(node.attribute("tags").unwrap().is_explicit_list());
        assert_eq!(
            node.children()[0]
                .attribute_path("private_sql_and_synthesis.lower")
                .map(|a| a.kind()),
            Some(AttributeKind::String)
        );
    }

    #[test]
    fn simple_format_drops_permissions() {
        let value = node_to_value(&sample(), Format::Simple).unwrap();
        assert!(value.get("permissions").is_none());
        assert_eq!(value["attributes"]["data"], json!({"name": "people", "rows": 10}));
        assert_eq!(value["attributes"]["tags"], json!(["a", "b"]));

        let reparsed = node_from_value(&value, Format::Simple).unwrap();
        assert_eq!(
            reparsed.attribute_path("data.rows").and_then(|a| a.value().as_int()),
            Some(10)
        );
        assert!(reparsed.permissions().is_none());
    }

    #[test]
    fn simple_format_cannot_hold_nodes() {
        let nested = Node::empty(NodeType::Table)
            .with_attribute(Attribute::keyed("inner", Node::empty(NodeType::Column)))
            .unwrap();
        assert!(matches!(
            node_to_value(&nested, Format::Simple),
            Err(MetaError::Structural { .. })
        ));
        let value = node_to_value(&nested, Format::Full).unwrap();
        assert_eq!(node_from_value(&value, Format::Full).unwrap(), nested);
    }

    #[test]
    fn text_format_from_extension() {
        assert_eq!(TextFormat::from_path(Path::new("meta.json")), TextFormat::Json);
        assert_eq!(TextFormat::from_path(Path::new("meta.yaml")), TextFormat::Yaml);
        assert_eq!(TextFormat::from_path(Path::new("meta")), TextFormat::Yaml);
    }
}
