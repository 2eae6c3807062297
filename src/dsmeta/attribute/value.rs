//! Attribute values and their kinds.

use super::Attribute;
use crate::node::Node;
use chrono::{DateTime, NaiveDateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The kind of value an attribute holds.
///
/// The string form is the `type_name` used in documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AttributeKind {
    Bool,
    Int,
    Float,
    String,
    DateTime,
    /// Ordered group: either all members keyed or all unkeyed (explicit list).
    List,
    /// Keyed group with members unique by key ("dict").
    Map,
    Node,
}

impl AttributeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeKind::Bool => "boolean",
            AttributeKind::Int => "int",
            AttributeKind::Float => "float",
            AttributeKind::String => "string",
            AttributeKind::DateTime => "datetime",
            AttributeKind::List => "list",
            AttributeKind::Map => "dict",
            AttributeKind::Node => "node",
        }
    }

    pub fn is_scalar(&self) -> bool {
        !matches!(
            self,
            AttributeKind::List | AttributeKind::Map | AttributeKind::Node
        )
    }
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttributeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "boolean" => Ok(AttributeKind::Bool),
            "int" => Ok(AttributeKind::Int),
            "float" => Ok(AttributeKind::Float),
            "string" => Ok(AttributeKind::String),
            "datetime" => Ok(AttributeKind::DateTime),
            "list" => Ok(AttributeKind::List),
            "dict" => Ok(AttributeKind::Map),
            "node" => Ok(AttributeKind::Node),
            other => Err(format!("unknown attribute type_name '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    DateTime(DateTime<Utc>),
    List(Vec<Attribute>),
    Map(BTreeMap<String, Attribute>),
    Node(Box<Node>),
}

impl AttributeValue {
    pub fn kind(&self) -> AttributeKind {
        match self {
            AttributeValue::Bool(_) => AttributeKind::Bool,
            AttributeValue::Int(_) => AttributeKind::Int,
            AttributeValue::Float(_) => AttributeKind::Float,
            AttributeValue::String(_) => AttributeKind::String,
            AttributeValue::DateTime(_) => AttributeKind::DateTime,
            AttributeValue::List(_) => AttributeKind::List,
            AttributeValue::Map(_) => AttributeKind::Map,
            AttributeValue::Node(_) => AttributeKind::Node,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttributeValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            AttributeValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<&DateTime<Utc>> {
        match self {
            AttributeValue::DateTime(dt) => Some(dt),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Attribute]> {
        match self {
            AttributeValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Attribute>> {
        match self {
            AttributeValue::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            AttributeValue::Node(node) => Some(node),
            _ => None,
        }
    }

    /// Looks up a direct member of a keyed group (list or map).
    pub fn member(&self, key: &str) -> Option<&Attribute> {
        match self {
            AttributeValue::List(items) => items.iter().find(|a| a.key() == Some(key)),
            AttributeValue::Map(map) => map.get(key),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Bool(b) => write!(f, "{}", b),
            AttributeValue::Int(i) => write!(f, "{}", i),
            AttributeValue::Float(x) => write!(f, "{}", x),
            AttributeValue::String(s) => write!(f, "'{}'", s),
            AttributeValue::DateTime(dt) => write!(f, "{}", format_datetime(dt)),
            AttributeValue::List(items) => write!(f, "list[{}]", items.len()),
            AttributeValue::Map(map) => write!(f, "dict[{}]", map.len()),
            AttributeValue::Node(node) => write!(f, "{}", node.label()),
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        AttributeValue::Bool(b)
    }
}

impl From<i64> for AttributeValue {
    fn from(i: i64) -> Self {
        AttributeValue::Int(i)
    }
}

impl From<i32> for AttributeValue {
    fn from(i: i32) -> Self {
        AttributeValue::Int(i64::from(i))
    }
}

impl From<f64> for AttributeValue {
    fn from(x: f64) -> Self {
        AttributeValue::Float(x)
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::String(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::String(s)
    }
}

impl From<DateTime<Utc>> for AttributeValue {
    fn from(dt: DateTime<Utc>) -> Self {
        AttributeValue::DateTime(dt)
    }
}

impl From<Node> for AttributeValue {
    fn from(node: Node) -> Self {
        AttributeValue::Node(Box::new(node))
    }
}

impl From<Vec<Attribute>> for AttributeValue {
    fn from(items: Vec<Attribute>) -> Self {
        AttributeValue::List(items)
    }
}

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parses RFC 3339, or a naive `YYYY-MM-DDTHH:MM:SS` timestamp taken as UTC.
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}
