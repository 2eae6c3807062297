//! # Nodes
//!
//! A [`Node`] is one vertex of the metadata tree: a [`NodeType`] tag, a keyed
//! list of [`Attribute`]s, ordered child nodes and optional [`Permissions`].
//!
//! ```text
//! dataset
//! └── database
//!     └── schema
//!         └── table
//!             └── column
//! ```
//!
//! Nodes are plain values. `merge`, `readable_by` and the specification and
//! filter passes all return new trees; nothing holds a reference back into a
//! parent.
//!
//! ## Natural Identity
//!
//! Siblings are matched during a merge by `(type, name)`, where the name is the
//! `name` member of the node's `data` group (or a top-level `name` attribute for
//! nodes without a `data` group). Two children with the same identity cannot
//! coexist under one parent.

use crate::attribute::{check_list, Attribute, ListShape};
use crate::error::{MetaError, Result};
use crate::merge::{find_duplicate, merge_lists, MergeOptions, Mergeable};
use crate::permissions::{Action, Permissions, Principals};
use std::fmt;
use std::str::FromStr;
use tracing::trace;

pub const DATA: &str = "data";
pub const NAME: &str = "name";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeType {
    Dataset,
    Database,
    Schema,
    Table,
    Column,
}

impl NodeType {
    pub const ALL: [NodeType; 5] = [
        NodeType::Dataset,
        NodeType::Database,
        NodeType::Schema,
        NodeType::Table,
        NodeType::Column,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Dataset => "dataset",
            NodeType::Database => "database",
            NodeType::Schema => "schema",
            NodeType::Table => "table",
            NodeType::Column => "column",
        }
    }

    /// The only node type allowed directly below this one.
    pub fn child_type(&self) -> Option<NodeType> {
        match self {
            NodeType::Dataset => Some(NodeType::Database),
            NodeType::Database => Some(NodeType::Schema),
            NodeType::Schema => Some(NodeType::Table),
            NodeType::Table => Some(NodeType::Column),
            NodeType::Column => None,
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        NodeType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown node type_name '{}'", s))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    node_type: NodeType,
    attributes: Vec<Attribute>,
    children: Vec<Node>,
    permissions: Option<Permissions>,
}

impl Node {
    /// Builds a node, rejecting unkeyed or duplicate attributes and children
    /// that share a natural identity.
    pub fn new(
        node_type: NodeType,
        attributes: Vec<Attribute>,
        children: Vec<Node>,
        permissions: Option<Permissions>,
    ) -> Result<Self> {
        let node = Self {
            node_type,
            attributes,
            children,
            permissions,
        };
        node.validate()?;
        Ok(node)
    }

    pub fn empty(node_type: NodeType) -> Self {
        Self {
            node_type,
            attributes: Vec::new(),
            children: Vec::new(),
            permissions: None,
        }
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Result<Self> {
        self.set_attribute(attribute)?;
        Ok(self)
    }

    pub fn with_child(mut self, child: Node) -> Result<Self> {
        self.add_child(child)?;
        Ok(self)
    }

    pub fn with_permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = Some(permissions);
        self
    }

    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn permissions(&self) -> Option<&Permissions> {
        self.permissions.as_ref()
    }

    pub fn set_permissions(&mut self, permissions: Option<Permissions>) {
        self.permissions = permissions;
    }

    /// The node's natural name: `data.name`, else a top-level `name`.
    pub fn name(&self) -> Option<&str> {
        self.attribute_path("data.name")
            .or_else(|| self.attribute(NAME))
            .and_then(|a| a.value().as_str())
    }

    pub fn identity(&self) -> (NodeType, Option<&str>) {
        (self.node_type, self.name())
    }

    /// `table(users)`, or just `table` for an unnamed node.
    pub fn label(&self) -> String {
        match self.name() {
            Some(name) => format!("{}({})", self.node_type, name),
            None => self.node_type.to_string(),
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.key() == Some(key))
    }

    /// Dot-separated lookup, e.g. `"connector.type_name"`.
    pub fn attribute_path(&self, path: &str) -> Option<&Attribute> {
        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };
        let attribute = self.attribute(head)?;
        match rest {
            Some(rest) => attribute.get_path(rest),
            None => Some(attribute),
        }
    }

    /// Inserts or replaces the attribute with the same key; returns the old one.
    pub fn set_attribute(&mut self, attribute: Attribute) -> Result<Option<Attribute>> {
        let Some(key) = attribute.key().map(str::to_string) else {
            return Err(MetaError::structural(
                self.label(),
                "node attributes must be keyed",
            ));
        };
        attribute.validate(&format!("{}.{}", self.label(), key))?;
        match self.attributes.iter_mut().find(|a| a.key() == Some(key.as_str())) {
            Some(slot) => Ok(Some(std::mem::replace(slot, attribute))),
            None => {
                self.attributes.push(attribute);
                Ok(None)
            }
        }
    }

    pub fn remove_attribute(&mut self, key: &str) -> Option<Attribute> {
        let index = self.attributes.iter().position(|a| a.key() == Some(key))?;
        Some(self.attributes.remove(index))
    }

    pub fn child(&self, node_type: NodeType, name: &str) -> Option<&Node> {
        self.children
            .iter()
            .find(|c| c.identity() == (node_type, Some(name)))
    }

    pub fn add_child(&mut self, child: Node) -> Result<()> {
        if let Some(existing) = self.children.iter().find(|c| c.identity() == child.identity()) {
            return Err(MetaError::structural(
                self.label(),
                format!("duplicate child node {}", existing.label()),
            ));
        }
        self.children.push(child);
        Ok(())
    }

    pub fn remove_child(&mut self, node_type: NodeType, name: &str) -> Option<Node> {
        let index = self
            .children
            .iter()
            .position(|c| c.identity() == (node_type, Some(name)))?;
        Some(self.children.remove(index))
    }

    /// Copy pruned to what `requester` may read, or `None` if the node itself
    /// is hidden. Attributes without permissions inherit the node's decision.
    pub fn readable_by(&self, requester: Option<&Principals>) -> Option<Node> {
        if !Permissions::is_allowed(self.permissions(), Some(Action::Read), requester) {
            return None;
        }
        Some(Node {
            node_type: self.node_type,
            attributes: self
                .attributes
                .iter()
                .filter_map(|a| a.readable_by(requester))
                .collect(),
            children: self
                .children
                .iter()
                .filter_map(|c| c.readable_by(requester))
                .collect(),
            permissions: self.permissions.clone(),
        })
    }

    /// Assembles a node from parts already known to be valid, e.g. a filtered
    /// subset of a valid node.
    pub(crate) fn from_parts(
        node_type: NodeType,
        attributes: Vec<Attribute>,
        children: Vec<Node>,
        permissions: Option<Permissions>,
    ) -> Self {
        Self {
            node_type,
            attributes,
            children,
            permissions,
        }
    }

    pub(crate) fn attributes_mut(&mut self) -> &mut Vec<Attribute> {
        &mut self.attributes
    }

    pub(crate) fn children_mut(&mut self) -> &mut Vec<Node> {
        &mut self.children
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let label = self.label();
        if check_list(&self.attributes, &label)? == ListShape::Explicit {
            return Err(MetaError::structural(label, "node attributes must be keyed"));
        }
        for attribute in &self.attributes {
            attribute.validate(&format!("{}.{}", label, attribute.key().unwrap_or_default()))?;
        }
        if let Some((i, j)) = find_duplicate(&self.children)? {
            return Err(MetaError::structural(
                label,
                format!(
                    "child nodes {} and {} share an identity",
                    self.children[i].label(),
                    self.children[j].label()
                ),
            ));
        }
        Ok(())
    }
}

impl Mergeable for Node {
    fn same_identity(&self, other: &Self) -> Result<bool> {
        Ok(self.identity() == other.identity())
    }

    fn merge(&self, other: &Self, options: &MergeOptions) -> Result<Self> {
        if self.node_type != other.node_type {
            return Err(MetaError::Merge(format!(
                "cannot merge {} with {}",
                self.label(),
                other.label()
            )));
        }
        trace!(node = %self.label(), overwrite = options.overwrite, "merging node");

        let attributes = merge_lists(&self.attributes, &other.attributes, options)?;
        if attributes.len() > self.attributes.len() {
            options.require(self.permissions(), Action::WriteAttributes, || self.label())?;
        }

        let children = merge_lists(&self.children, &other.children, options)?;
        if children.len() > self.children.len() {
            options.require(self.permissions(), Action::WriteChildNodes, || self.label())?;
        }

        let permissions =
            Permissions::merge(self.permissions(), other.permissions(), options.overwrite);
        if permissions.as_ref() != self.permissions() {
            options.require(self.permissions(), Action::WritePermissions, || self.label())?;
        }

        Node::new(self.node_type, attributes, children, permissions)
    }

    fn describe(&self) -> String {
        format!("node {}", self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::AttributeValue;
    use uuid::Uuid;

    fn data(name: &str) -> Attribute {
        Attribute::group(DATA, vec![Attribute::keyed(NAME, name)]).unwrap()
    }

    fn column(name: &str, bounds: Vec<Attribute>) -> Node {
        let mut attributes = vec![data(name)];
        if !bounds.is_empty() {
            attributes.push(Attribute::group("private_sql_and_synthesis", bounds).unwrap());
        }
        Node::new(NodeType::Column, attributes, vec![], None).unwrap()
    }

    fn table(name: &str, columns: Vec<Node>) -> Node {
        Node::new(NodeType::Table, vec![data(name)], columns, None).unwrap()
    }

    fn bound(node: &Node, key: &str) -> Option<i64> {
        node.attribute_path(&format!("private_sql_and_synthesis.{}", key))
            .and_then(|a| a.value().as_int())
    }

    #[test]
    fn node_type_parsing() {
        assert_eq!("table".parse::<NodeType>().unwrap(), NodeType::Table);
        assert!("view".parse::<NodeType>().is_err());
        assert_eq!(NodeType::Table.child_type(), Some(NodeType::Column));
        assert_eq!(NodeType::Column.child_type(), None);
    }

    #[test]
    fn name_and_label() {
        let t = table("users", vec![]);
        assert_eq!(t.name(), Some("users"));
        assert_eq!(t.label(), "table(users)");

        let fallback = Node::empty(NodeType::Schema)
            .with_attribute(Attribute::keyed(NAME, "public"))
            .unwrap();
        assert_eq!(fallback.name(), Some("public"));
        assert_eq!(Node::empty(NodeType::Schema).label(), "schema");
    }

    #[test]
    fn rejects_duplicate_children() {
        let err = Node::new(
            NodeType::Table,
            vec![data("t")],
            vec![column("age", vec![]), column("age", vec![])],
            None,
        )
        .unwrap_err();
        assert!(matches!(err, MetaError::Structural { .. }));

        let mut t = table("t", vec![column("age", vec![])]);
        assert!(t.add_child(column("age", vec![])).is_err());
        assert!(t.add_child(column("height", vec![])).is_ok());
        assert_eq!(t.children().len(), 2);
    }

    #[test]
    fn rejects_unkeyed_attributes() {
        let err = Node::new(NodeType::Column, vec![Attribute::element(1)], vec![], None);
        assert!(err.is_err());

        let mut node = Node::empty(NodeType::Column);
        assert!(node.set_attribute(Attribute::element(1)).is_err());
    }

    #[test]
    fn set_and_remove_attribute() {
        let mut node = column("age", vec![]);
        assert!(node
            .set_attribute(Attribute::keyed("note", "x"))
            .unwrap()
            .is_none());
        let old = node.set_attribute(Attribute::keyed("note", "y")).unwrap();
        assert_eq!(old.and_then(|a| a.value().as_str().map(String::from)), Some("x".into()));
        assert_eq!(
            node.attribute("note").map(|a| a.value().clone()),
            Some(AttributeValue::from("y"))
        );
        assert!(node.remove_attribute("note").is_some());
        assert!(node.attribute("note").is_none());
    }

    #[test]
    fn non_conflicting_bounds_coexist() {
        let a = column("age", vec![Attribute::keyed("lower", 0)]);
        let b = column("age", vec![Attribute::keyed("upper", 120)]);

        let merged = a.merge(&b, &MergeOptions::default()).unwrap();
        assert_eq!(bound(&merged, "lower"), Some(0));
        assert_eq!(bound(&merged, "upper"), Some(120));
    }

    #[test]
    fn conflicting_bounds_need_overwrite() {
        let a = column("age", vec![Attribute::keyed("lower", 0)]);
        let b = column("age", vec![Attribute::keyed("lower", 5)]);

        assert!(matches!(
            a.merge(&b, &MergeOptions::default()),
            Err(MetaError::Merge(_))
        ));
        let merged = a.merge(&b, &MergeOptions::new(true)).unwrap();
        assert_eq!(bound(&merged, "lower"), Some(5));
    }

    #[test]
    fn merge_is_identity_on_itself() {
        let t = table(
            "users",
            vec![
                column("age", vec![Attribute::keyed("lower", 0)]),
                column("name", vec![]),
            ],
        );
        assert_eq!(t.merge(&t, &MergeOptions::default()).unwrap(), t);
    }

    #[test]
    fn children_merge_by_name() {
        let a = table("users", vec![column("age", vec![Attribute::keyed("lower", 0)])]);
        let b = table(
            "users",
            vec![
                column("email", vec![]),
                column("age", vec![Attribute::keyed("upper", 99)]),
            ],
        );

        let merged = a.merge(&b, &MergeOptions::default()).unwrap();
        let names: Vec<_> = merged.children().iter().filter_map(|c| c.name()).collect();
        assert_eq!(names, vec!["age", "email"]);
        let age = merged.child(NodeType::Column, "age").unwrap();
        assert_eq!(bound(age, "upper"), Some(99));
    }

    #[test]
    fn different_types_do_not_merge() {
        let a = table("x", vec![]);
        let b = Node::new(NodeType::Schema, vec![data("x")], vec![], None).unwrap();
        assert!(matches!(
            a.merge(&b, &MergeOptions::default()),
            Err(MetaError::Merge(_))
        ));
    }

    #[test]
    fn adding_children_is_gated() {
        let owner = Uuid::from_u128(1);
        let locked = table("t", vec![]).with_permissions(
            Permissions::new().with(Action::WriteChildNodes, Some([owner].into())),
        );
        let incoming = table("t", vec![column("age", vec![])]);

        let stranger = MergeOptions::default().with_requester([Uuid::from_u128(7)].into());
        assert!(matches!(
            locked.merge(&incoming, &stranger),
            Err(MetaError::Permission {
                action: Action::WriteChildNodes,
                ..
            })
        ));

        let as_owner = MergeOptions::default().with_requester([owner].into());
        assert_eq!(locked.merge(&incoming, &as_owner).unwrap().children().len(), 1);
    }

    #[test]
    fn readable_by_prunes_children() {
        let owner = Uuid::from_u128(1);
        let hidden = column("ssn", vec![])
            .with_permissions(Permissions::new().with(Action::Read, Some([owner].into())));
        let t = table("users", vec![column("age", vec![]), hidden]);

        let visible = t.readable_by(Some(&Principals::new())).unwrap();
        assert_eq!(visible.children().len(), 1);
        assert_eq!(t.readable_by(Some(&[owner].into())).unwrap(), t);
        assert_eq!(t.readable_by(None).unwrap(), t);
    }
}
