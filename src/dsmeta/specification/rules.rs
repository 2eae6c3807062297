//! Rule tables for the standard specification, version 1.
//!
//! Each node type (and each column data type and connector type) owns a slice
//! of [`KeyRule`]s: the legal attribute keys, their kinds, their permission
//! floor, whether they are required, how their members are checked and the
//! default value filled in when the enclosing group is present.
//!
//! This is the single source of truth for both `apply_defaults` and `verify`.
//! Adding a key means adding an entry here.

use super::roles::PermissionTemplate;
use crate::attribute::{AttributeKind, AttributeValue};
use crate::error::{MetaError, Result};
use crate::node::{Node, NodeType};

use crate::attribute::AttributeKind::{Bool, DateTime, Float, Int, List, String as Str};
use super::roles::PermissionTemplate::{AnalystAttribute, OwnerAttribute, SharedAttribute};

pub const CONNECTOR: &str = "connector";
pub const TYPE_NAME: &str = "type_name";
pub const DATA_TYPE_NAME: &str = "data_type_name";

/// How the members of a group attribute are checked.
#[derive(Debug, Clone, Copy)]
pub enum Members {
    None,
    /// Keyed group with its own rule table.
    Keys(&'static [KeyRule]),
    /// Explicit list whose elements have one of these kinds.
    Elements(&'static [AttributeKind]),
    /// Keyed group where every member, whatever its key, follows one rule.
    AnyKey(&'static KeyRule),
    /// Keyed group dispatched on its `type_name` member.
    Connector,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DefaultValue {
    Bool(bool),
    Int(i64),
    Str(&'static str),
}

impl DefaultValue {
    pub fn to_value(self) -> AttributeValue {
        match self {
            DefaultValue::Bool(b) => AttributeValue::Bool(b),
            DefaultValue::Int(i) => AttributeValue::Int(i),
            DefaultValue::Str(s) => AttributeValue::String(s.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct KeyRule {
    pub key: &'static str,
    pub kinds: &'static [AttributeKind],
    pub floor: PermissionTemplate,
    pub required: bool,
    pub members: Members,
    pub default: Option<DefaultValue>,
}

impl KeyRule {
    const fn new(key: &'static str, kinds: &'static [AttributeKind], floor: PermissionTemplate) -> Self {
        Self {
            key,
            kinds,
            floor,
            required: false,
            members: Members::None,
            default: None,
        }
    }

    const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    const fn members(mut self, members: Members) -> Self {
        self.members = members;
        self
    }

    const fn with_default(mut self, value: DefaultValue) -> Self {
        self.default = Some(value);
        self
    }

    pub fn allows(&self, kind: AttributeKind) -> bool {
        self.kinds.contains(&kind)
    }
}

pub fn find<'a>(rules: &'a [KeyRule], key: &str) -> Option<&'a KeyRule> {
    rules.iter().find(|rule| rule.key == key)
}

// Shared building blocks

const fn group(key: &'static str, floor: PermissionTemplate, members: &'static [KeyRule]) -> KeyRule {
    KeyRule::new(key, &[List], floor).members(Members::Keys(members))
}

const NOT_PUBLIC: DefaultValue = DefaultValue::Bool(false);
const OFF: DefaultValue = DefaultValue::Bool(false);
const ON: DefaultValue = DefaultValue::Bool(true);

const PRIVACY_LEVEL: &[KeyRule] = &[KeyRule::new("privacy_level", &[Int], OwnerAttribute)];

const DIFFERENTIAL_PRIVACY: KeyRule = group("differential_privacy", OwnerAttribute, PRIVACY_LEVEL);

const CONNECTOR_RULE: KeyRule =
    KeyRule::new(CONNECTOR, &[List], SharedAttribute).members(Members::Connector);

// Dataset

const DATASET_DATA: &[KeyRule] = &[
    KeyRule::new("name", &[Str], SharedAttribute).required(),
    KeyRule::new("description", &[Str], SharedAttribute),
    KeyRule::new("metadata_is_public", &[Bool], SharedAttribute).with_default(NOT_PUBLIC),
    KeyRule::new("tags", &[List], SharedAttribute).members(Members::Elements(&[Str])),
];

pub const DATASET: &[KeyRule] = &[
    group("data", SharedAttribute, DATASET_DATA).required(),
    DIFFERENTIAL_PRIVACY,
];

// Database and schema

const NAMED_DATA: &[KeyRule] = &[
    KeyRule::new("name", &[Str], SharedAttribute).required(),
    KeyRule::new("description", &[Str], SharedAttribute),
    KeyRule::new("metadata_is_public", &[Bool], SharedAttribute).with_default(NOT_PUBLIC),
];

const OPTIONALLY_NAMED_DATA: &[KeyRule] = &[
    KeyRule::new("name", &[Str], SharedAttribute),
    KeyRule::new("description", &[Str], SharedAttribute),
    KeyRule::new("metadata_is_public", &[Bool], SharedAttribute).with_default(NOT_PUBLIC),
];

pub const DATABASE: &[KeyRule] = &[
    CONNECTOR_RULE,
    group("data", SharedAttribute, NAMED_DATA).required(),
    DIFFERENTIAL_PRIVACY,
];

pub const SCHEMA: &[KeyRule] = &[
    group("data", SharedAttribute, OPTIONALLY_NAMED_DATA),
    DIFFERENTIAL_PRIVACY,
];

// Table

const TABLE_DATA: &[KeyRule] = &[
    KeyRule::new("name", &[Str], SharedAttribute).required(),
    KeyRule::new("description", &[Str], SharedAttribute),
    KeyRule::new("metadata_is_public", &[Bool], SharedAttribute).with_default(NOT_PUBLIC),
    KeyRule::new("rows", &[Int], OwnerAttribute),
];

const TABLE_DIFFERENTIAL_PRIVACY: &[KeyRule] = &[
    KeyRule::new("budget_delta", &[Float], OwnerAttribute),
    KeyRule::new("budget_epsilon", &[Float], OwnerAttribute),
    KeyRule::new("privacy_column", &[Str], OwnerAttribute),
    KeyRule::new("privacy_level", &[Int], OwnerAttribute),
];

const TABLE_PRIVATE_SQL: &[KeyRule] = &[
    KeyRule::new("censor_dims", &[Bool], OwnerAttribute).with_default(OFF),
    KeyRule::new("clamp_columns", &[Bool], OwnerAttribute).with_default(ON),
    KeyRule::new("clamp_counts", &[Bool], OwnerAttribute).with_default(OFF),
    KeyRule::new("max_ids", &[Int], OwnerAttribute).with_default(DefaultValue::Int(1)),
    KeyRule::new("row_privacy", &[Bool], OwnerAttribute).with_default(OFF),
    KeyRule::new("sample_max_ids", &[Bool], OwnerAttribute).with_default(ON),
    KeyRule::new("tau", &[Float], OwnerAttribute),
    KeyRule::new("use_dpsu", &[Bool], OwnerAttribute).with_default(OFF),
];

const TABLE_PRIVATE_SYNTHESIS: &[KeyRule] =
    &[KeyRule::new("synth_allowed", &[Bool], OwnerAttribute)];

pub const TABLE: &[KeyRule] = &[
    CONNECTOR_RULE,
    group("data", SharedAttribute, TABLE_DATA).required(),
    group("differential_privacy", OwnerAttribute, TABLE_DIFFERENTIAL_PRIVACY),
    group("private_sql", OwnerAttribute, TABLE_PRIVATE_SQL),
    group("private_synthesis", OwnerAttribute, TABLE_PRIVATE_SYNTHESIS),
];

// Columns, one table per data type

const COLUMN_DATA: &[KeyRule] = &[
    KeyRule::new(DATA_TYPE_NAME, &[Str], SharedAttribute).required(),
    KeyRule::new("name", &[Str], SharedAttribute).required(),
    KeyRule::new("description", &[Str], SharedAttribute),
    KeyRule::new("metadata_is_public", &[Bool], SharedAttribute).with_default(NOT_PUBLIC),
    KeyRule::new("selectable", &[Bool], SharedAttribute),
];

const FLOAT_COLUMN_DATA: &[KeyRule] = &[
    KeyRule::new(DATA_TYPE_NAME, &[Str], SharedAttribute).required(),
    KeyRule::new("name", &[Str], SharedAttribute).required(),
    KeyRule::new("description", &[Str], SharedAttribute),
    KeyRule::new("discrete", &[Bool], SharedAttribute),
    KeyRule::new("metadata_is_public", &[Bool], SharedAttribute).with_default(NOT_PUBLIC),
    KeyRule::new("selectable", &[Bool], SharedAttribute),
];

const MACHINE_LEARNING: &[KeyRule] = &[
    KeyRule::new("is_feature", &[Bool], AnalystAttribute),
    KeyRule::new("is_target", &[Bool], AnalystAttribute),
];

const SYNTHESIZABLE: &[KeyRule] = &[KeyRule::new("synthesizable", &[Bool], OwnerAttribute)];

const BOOLEAN_PRIVATE_SQL: &[KeyRule] =
    &[KeyRule::new("private_id", &[Bool], OwnerAttribute).with_default(OFF)];

const DATETIME_PRIVATE_SQL: &[KeyRule] = &[
    KeyRule::new("allowed_values", &[List], OwnerAttribute).members(Members::Elements(&[DateTime])),
    KeyRule::new("auto_bounds_prob", &[Float], OwnerAttribute),
    KeyRule::new("auto_lower", &[DateTime], OwnerAttribute),
    KeyRule::new("auto_upper", &[DateTime], OwnerAttribute),
    KeyRule::new("private_id", &[Bool], OwnerAttribute).with_default(OFF),
    KeyRule::new("use_auto_bounds", &[Bool], OwnerAttribute),
];

const DATETIME_PRIVATE_SQL_AND_SYNTHESIS: &[KeyRule] = &[
    KeyRule::new("bounded", &[Bool], OwnerAttribute).with_default(OFF),
    KeyRule::new("cardinality", &[Int], OwnerAttribute),
    KeyRule::new("lower", &[DateTime], OwnerAttribute),
    KeyRule::new("upper", &[DateTime], OwnerAttribute),
];

const FLOAT_PRIVATE_SQL: &[KeyRule] = &[
    KeyRule::new("allowed_values", &[List], OwnerAttribute).members(Members::Elements(&[Float])),
    KeyRule::new("auto_bounds_prob", &[Float], OwnerAttribute),
    KeyRule::new("auto_lower", &[Float], OwnerAttribute),
    KeyRule::new("auto_upper", &[Float], OwnerAttribute),
    KeyRule::new("private_id", &[Bool], OwnerAttribute).with_default(OFF),
    KeyRule::new("use_auto_bounds", &[Bool], OwnerAttribute),
];

const FLOAT_PRIVATE_SQL_AND_SYNTHESIS: &[KeyRule] = &[
    KeyRule::new("bounded", &[Bool], OwnerAttribute).with_default(OFF),
    KeyRule::new("cardinality", &[Int], OwnerAttribute),
    KeyRule::new("lower", &[Float], OwnerAttribute),
    KeyRule::new("upper", &[Float], OwnerAttribute),
];

const FLOAT_PRIVATE_SYNTHESIS: &[KeyRule] = &[
    KeyRule::new("discrete", &[Bool], OwnerAttribute),
    KeyRule::new("min_step", &[Float], OwnerAttribute),
    KeyRule::new("synthesizable", &[Bool], OwnerAttribute),
];

const INT_PRIVATE_SQL: &[KeyRule] = &[
    KeyRule::new("allowed_values", &[List], OwnerAttribute).members(Members::Elements(&[Int])),
    KeyRule::new("auto_bounds_prob", &[Float], OwnerAttribute),
    KeyRule::new("auto_lower", &[Int], OwnerAttribute),
    KeyRule::new("auto_upper", &[Int], OwnerAttribute),
    KeyRule::new("private_id", &[Bool], OwnerAttribute).with_default(OFF),
    KeyRule::new("use_auto_bounds", &[Bool], OwnerAttribute),
];

const INT_PRIVATE_SQL_AND_SYNTHESIS: &[KeyRule] = &[
    KeyRule::new("bounded", &[Bool], OwnerAttribute).with_default(OFF),
    KeyRule::new("cardinality", &[Int], OwnerAttribute),
    KeyRule::new("lower", &[Int], OwnerAttribute),
    KeyRule::new("upper", &[Int], OwnerAttribute),
];

const INT_PRIVATE_SYNTHESIS: &[KeyRule] = &[
    KeyRule::new("min_step", &[Int], OwnerAttribute),
    KeyRule::new("synthesizable", &[Bool], OwnerAttribute),
];

const STRING_PRIVATE_SQL: &[KeyRule] = &[
    KeyRule::new("allowed_values", &[List], OwnerAttribute).members(Members::Elements(&[Str])),
    KeyRule::new("mask", &[Str], OwnerAttribute),
    KeyRule::new("private_id", &[Bool], OwnerAttribute).with_default(OFF),
];

const STRING_PRIVATE_SQL_AND_SYNTHESIS: &[KeyRule] =
    &[KeyRule::new("cardinality", &[Int], OwnerAttribute)];

pub const BOOLEAN_COLUMN: &[KeyRule] = &[
    group("data", SharedAttribute, COLUMN_DATA).required(),
    group("machine_learning", SharedAttribute, MACHINE_LEARNING),
    group("private_sql", OwnerAttribute, BOOLEAN_PRIVATE_SQL),
    group("private_synthesis", OwnerAttribute, SYNTHESIZABLE),
];

pub const DATETIME_COLUMN: &[KeyRule] = &[
    group("data", SharedAttribute, COLUMN_DATA).required(),
    group("machine_learning", SharedAttribute, MACHINE_LEARNING),
    group("private_sql", OwnerAttribute, DATETIME_PRIVATE_SQL),
    group("private_sql_and_synthesis", OwnerAttribute, DATETIME_PRIVATE_SQL_AND_SYNTHESIS),
    group("private_synthesis", OwnerAttribute, SYNTHESIZABLE),
];

pub const FLOAT_COLUMN: &[KeyRule] = &[
    group("data", SharedAttribute, FLOAT_COLUMN_DATA).required(),
    group("machine_learning", SharedAttribute, MACHINE_LEARNING),
    group("private_sql", OwnerAttribute, FLOAT_PRIVATE_SQL),
    group("private_sql_and_synthesis", OwnerAttribute, FLOAT_PRIVATE_SQL_AND_SYNTHESIS),
    group("private_synthesis", OwnerAttribute, FLOAT_PRIVATE_SYNTHESIS),
];

pub const INT_COLUMN: &[KeyRule] = &[
    group("data", SharedAttribute, COLUMN_DATA).required(),
    group("machine_learning", SharedAttribute, MACHINE_LEARNING),
    group("private_sql", OwnerAttribute, INT_PRIVATE_SQL),
    group("private_sql_and_synthesis", OwnerAttribute, INT_PRIVATE_SQL_AND_SYNTHESIS),
    group("private_synthesis", OwnerAttribute, INT_PRIVATE_SYNTHESIS),
];

pub const STRING_COLUMN: &[KeyRule] = &[
    group("data", SharedAttribute, COLUMN_DATA).required(),
    group("machine_learning", SharedAttribute, MACHINE_LEARNING),
    group("private_sql", OwnerAttribute, STRING_PRIVATE_SQL),
    group("private_sql_and_synthesis", OwnerAttribute, STRING_PRIVATE_SQL_AND_SYNTHESIS),
    group("private_synthesis", OwnerAttribute, SYNTHESIZABLE),
];

// Connectors

const NA_VALUE: KeyRule =
    KeyRule::new("*", &[Str, List], SharedAttribute).members(Members::Elements(&[Str]));

pub const CSV_CONNECTOR: &[KeyRule] = &[
    KeyRule::new(TYPE_NAME, &[Str], SharedAttribute).required(),
    KeyRule::new("decimal", &[Str], SharedAttribute).with_default(DefaultValue::Str(".")),
    KeyRule::new("header_columns", &[List], SharedAttribute).members(Members::Elements(&[Str])),
    KeyRule::new("header_row", &[Int, List], SharedAttribute).members(Members::Elements(&[Int])),
    KeyRule::new("index_col", &[Int, Str, List], SharedAttribute)
        .members(Members::Elements(&[Int, Str])),
    KeyRule::new("na_values", &[List, AttributeKind::Map], SharedAttribute)
        .members(Members::AnyKey(&NA_VALUE)),
    KeyRule::new("sep", &[Str], SharedAttribute).with_default(DefaultValue::Str(",")),
    KeyRule::new("skipinitialspace", &[Bool], SharedAttribute).with_default(OFF),
    KeyRule::new("uri", &[Str], SharedAttribute),
    KeyRule::new("use_original_header", &[Bool], SharedAttribute).with_default(ON),
];

pub const POSTGRESQL_CONNECTOR: &[KeyRule] = &[
    KeyRule::new(TYPE_NAME, &[Str], SharedAttribute).required(),
    KeyRule::new("host", &[Str], OwnerAttribute),
    KeyRule::new("password", &[Str], OwnerAttribute),
    KeyRule::new("port", &[Int], OwnerAttribute),
    KeyRule::new("username", &[Str], OwnerAttribute),
];

pub const MYSQL_CONNECTOR: &[KeyRule] = &[
    KeyRule::new(TYPE_NAME, &[Str], SharedAttribute).required(),
    KeyRule::new("charset", &[Str], OwnerAttribute),
    KeyRule::new("host", &[Str], OwnerAttribute).required(),
    KeyRule::new("password", &[Str], OwnerAttribute),
    KeyRule::new("port", &[Int], OwnerAttribute),
    KeyRule::new("username", &[Str], OwnerAttribute),
];

pub const SQLITE_CONNECTOR: &[KeyRule] = &[
    KeyRule::new(TYPE_NAME, &[Str], SharedAttribute).required(),
    KeyRule::new("uri", &[Str], SharedAttribute).required(),
];

pub fn connector_rules(type_name: &str) -> Option<&'static [KeyRule]> {
    match type_name {
        "csv" => Some(CSV_CONNECTOR),
        "postgresql" => Some(POSTGRESQL_CONNECTOR),
        "mysql" => Some(MYSQL_CONNECTOR),
        "sqlite" => Some(SQLITE_CONNECTOR),
        _ => None,
    }
}

pub fn column_rules(data_type_name: &str) -> Option<&'static [KeyRule]> {
    match data_type_name {
        "boolean" => Some(BOOLEAN_COLUMN),
        "datetime" => Some(DATETIME_COLUMN),
        "float" => Some(FLOAT_COLUMN),
        "int" => Some(INT_COLUMN),
        "string" => Some(STRING_COLUMN),
        _ => None,
    }
}

/// Rule table for a node; columns dispatch on `data.data_type_name`.
pub fn node_rules(node: &Node, path: &str) -> Result<&'static [KeyRule]> {
    match node.node_type() {
        NodeType::Dataset => Ok(DATASET),
        NodeType::Database => Ok(DATABASE),
        NodeType::Schema => Ok(SCHEMA),
        NodeType::Table => Ok(TABLE),
        NodeType::Column => {
            let dtype = node
                .attribute_path("data.data_type_name")
                .and_then(|a| a.value().as_str())
                .ok_or_else(|| {
                    MetaError::specification(path, "column is missing data.data_type_name")
                })?;
            column_rules(dtype).ok_or_else(|| {
                MetaError::specification(path, format!("unknown column data type '{}'", dtype))
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_table_has_unique_keys() {
        let tables: &[&[KeyRule]] = &[
            DATASET,
            DATABASE,
            SCHEMA,
            TABLE,
            BOOLEAN_COLUMN,
            DATETIME_COLUMN,
            FLOAT_COLUMN,
            INT_COLUMN,
            STRING_COLUMN,
            CSV_CONNECTOR,
            POSTGRESQL_CONNECTOR,
            MYSQL_CONNECTOR,
            SQLITE_CONNECTOR,
        ];
        fn check(rules: &[KeyRule]) {
            for (i, rule) in rules.iter().enumerate() {
                assert!(
                    rules[i + 1..].iter().all(|r| r.key != rule.key),
                    "duplicate key {}",
                    rule.key
                );
                if let Members::Keys(members) = rule.members {
                    check(members);
                }
            }
        }
        for table in tables {
            check(table);
        }
    }

    #[test]
    fn boolean_columns_have_no_bounds() {
        assert!(find(BOOLEAN_COLUMN, "private_sql_and_synthesis").is_none());
        assert!(find(INT_COLUMN, "private_sql_and_synthesis").is_some());
    }

    #[test]
    fn bounds_follow_column_kind() {
        fn lower_kind(rules: &[KeyRule]) -> &'static [AttributeKind] {
            match find(rules, "private_sql_and_synthesis").unwrap().members {
                Members::Keys(members) => find(members, "lower").unwrap().kinds,
                _ => panic!("expected keyed members"),
            }
        }
        assert_eq!(lower_kind(INT_COLUMN), &[Int]);
        assert_eq!(lower_kind(FLOAT_COLUMN), &[Float]);
        assert_eq!(lower_kind(DATETIME_COLUMN), &[DateTime]);
    }

    #[test]
    fn dispatch_tables() {
        assert!(connector_rules("csv").is_some());
        assert!(connector_rules("excel").is_none());
        assert!(column_rules("float").is_some());
        assert!(column_rules("decimal").is_none());
    }

    #[test]
    fn column_without_dtype_is_rejected() {
        let column = Node::empty(NodeType::Column);
        assert!(matches!(
            node_rules(&column, "column"),
            Err(MetaError::Specification { .. })
        ));
    }
}
