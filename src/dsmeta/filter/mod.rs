//! # Filtering
//!
//! A [`Filter`] projects a node tree onto a retention table and returns the
//! reduced copy, or `None` when the root itself is not retained.
//!
//! - `retain_nodes` selects nodes by type (`None` is a wildcard) and optional
//!   attribute conditions. A node type with no entry is dropped together with
//!   its subtree. An absent table keeps every node.
//! - `retain_attributes` selects attribute keys per node type. Entries for the
//!   wildcard and for the node's own type are combined. Nested [`Retain::Members`]
//!   tables reach into keyed groups. A group left empty is dropped. An absent
//!   table keeps every attribute.
//!
//! Filtering never alters values: everything in the output is present in the
//! input, with the same value.
//!
//! The named audience views live in [`views`].

pub mod views;

use crate::attribute::{Attribute, AttributeValue};
use crate::node::{Node, NodeType};
use std::collections::BTreeMap;
use tracing::trace;

pub use views::View;

/// What to keep of an attribute found under a retained key.
#[derive(Debug, Clone, PartialEq)]
pub enum Retain {
    /// Keep regardless of value.
    Any,
    /// Keep only when the value equals this one.
    Value(AttributeValue),
    /// Keep the group restricted to these members.
    Members(RetainKeys),
}

pub type RetainKeys = BTreeMap<String, Retain>;

/// Builds a key table where every key is retained regardless of value.
pub fn keys<'a>(keys: impl IntoIterator<Item = &'a str>) -> RetainKeys {
    keys.into_iter()
        .map(|key| (key.to_string(), Retain::Any))
        .collect()
}

/// Conditions a node must meet: attribute path to expected value, `None`
/// meaning only presence is required.
pub type NodeConditions = BTreeMap<String, Option<AttributeValue>>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    retain_nodes: Option<BTreeMap<Option<NodeType>, Option<NodeConditions>>>,
    retain_attributes: Option<BTreeMap<Option<NodeType>, Option<RetainKeys>>>,
}

enum Scope<'a> {
    All,
    Keys(Vec<&'a RetainKeys>),
}

impl Filter {
    /// A filter that keeps everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Retains nodes of `node_type` (all types for `None`) meeting `conditions`.
    pub fn retain_nodes(
        mut self,
        node_type: Option<NodeType>,
        conditions: Option<NodeConditions>,
    ) -> Self {
        self.retain_nodes
            .get_or_insert_with(BTreeMap::new)
            .insert(node_type, conditions);
        self
    }

    /// Retains the given attribute keys on nodes of `node_type` (all types for
    /// `None`); `keys = None` keeps all of their attributes.
    pub fn retain_attributes(mut self, node_type: Option<NodeType>, keys: Option<RetainKeys>) -> Self {
        self.retain_attributes
            .get_or_insert_with(BTreeMap::new)
            .insert(node_type, keys);
        self
    }

    pub fn apply(&self, node: &Node) -> Option<Node> {
        if !self.node_matches(node) {
            trace!(node = %node.label(), "dropped by filter");
            return None;
        }
        let attributes = match self.attribute_scope(node.node_type()) {
            Scope::All => node.attributes().to_vec(),
            Scope::Keys(tables) => filter_attributes(node.attributes(), &tables),
        };
        let children = node
            .children()
            .iter()
            .filter_map(|child| self.apply(child))
            .collect();
        Some(Node::from_parts(
            node.node_type(),
            attributes,
            children,
            node.permissions().cloned(),
        ))
    }

    fn node_matches(&self, node: &Node) -> bool {
        let Some(retain_nodes) = &self.retain_nodes else {
            return true;
        };
        let entry = retain_nodes
            .get(&Some(node.node_type()))
            .or_else(|| retain_nodes.get(&None));
        match entry {
            None => false,
            Some(None) => true,
            Some(Some(conditions)) => conditions.iter().all(|(path, expected)| {
                match (node.attribute_path(path), expected) {
                    (None, _) => false,
                    (Some(_), None) => true,
                    (Some(found), Some(expected)) => found.value() == expected,
                }
            }),
        }
    }

    fn attribute_scope(&self, node_type: NodeType) -> Scope<'_> {
        let Some(retain_attributes) = &self.retain_attributes else {
            return Scope::All;
        };
        let mut tables = Vec::new();
        for key in [None, Some(node_type)] {
            match retain_attributes.get(&key) {
                Some(None) => return Scope::All,
                Some(Some(table)) => tables.push(table),
                None => {}
            }
        }
        Scope::Keys(tables)
    }
}

fn filter_attributes(attributes: &[Attribute], tables: &[&RetainKeys]) -> Vec<Attribute> {
    attributes
        .iter()
        .filter_map(|attribute| filter_attribute(attribute, tables))
        .collect()
}

fn filter_attribute(attribute: &Attribute, tables: &[&RetainKeys]) -> Option<Attribute> {
    let key = attribute.key()?;
    let rules: Vec<&Retain> = tables.iter().filter_map(|table| table.get(key)).collect();

    if rules.iter().any(|rule| matches!(rule, Retain::Any)) {
        return Some(attribute.clone());
    }
    if rules
        .iter()
        .any(|rule| matches!(rule, Retain::Value(value) if value == attribute.value()))
    {
        return Some(attribute.clone());
    }

    let nested: Vec<&RetainKeys> = rules
        .iter()
        .filter_map(|rule| match rule {
            Retain::Members(table) => Some(table),
            _ => None,
        })
        .collect();
    if nested.is_empty() {
        return None;
    }
    let value = match attribute.value() {
        AttributeValue::List(items) if !attribute.is_explicit_list() => {
            AttributeValue::List(filter_attributes(items, &nested))
        }
        AttributeValue::Map(map) => AttributeValue::Map(
            map.iter()
                .filter_map(|(k, member)| filter_attribute(member, &nested).map(|m| (k.clone(), m)))
                .collect(),
        ),
        _ => return None,
    };
    let empty = match &value {
        AttributeValue::List(items) => items.is_empty(),
        AttributeValue::Map(map) => map.is_empty(),
        _ => false,
    };
    if empty {
        None
    } else {
        Some(attribute.with_value(value))
    }
}
