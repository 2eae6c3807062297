//! # Attribute Model
//!
//! An [`Attribute`] is a typed value attached to a node, optionally keyed and
//! optionally carrying its own [`Permissions`].
//!
//! | Kind | `type_name` | Value |
//! |------|-------------|-------|
//! | `Bool` | `boolean` | `true` / `false` |
//! | `Int` | `int` | 64-bit integer |
//! | `Float` | `float` | 64-bit float |
//! | `String` | `string` | text |
//! | `DateTime` | `datetime` | UTC timestamp |
//! | `List` | `list` | ordered group of attributes |
//! | `Map` | `dict` | keyed group of attributes |
//! | `Node` | `node` | nested sub-tree |
//!
//! ## Sibling Lists
//!
//! A list of sibling attributes is either fully keyed, with unique keys, or fully
//! unkeyed. The unkeyed form is an *explicit list* (e.g. `tags`) whose elements
//! are positional and identified only by their value. Mixing the two forms is a
//! structural error.
//!
//! ## Usage
//!
//! ```ignore
//! let connector = Attribute::group("connector", vec![
//!     Attribute::keyed("type_name", "csv"),
//!     Attribute::keyed("uri", "a.csv"),
//! ])?;
//! assert_eq!(connector.get_path("uri").and_then(|a| a.value().as_str()), Some("a.csv"));
//! ```

mod merge;
mod value;

pub use value::{format_datetime, parse_datetime, AttributeKind, AttributeValue};

use crate::error::{MetaError, Result};
use crate::permissions::{Action, Permissions, Principals};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    key: Option<String>,
    value: AttributeValue,
    permissions: Option<Permissions>,
}

/// Shape of a sibling list after validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListShape {
    Empty,
    Keyed,
    Explicit,
}

impl Attribute {
    /// Builds an attribute, validating any nested groups.
    pub fn new(
        key: Option<String>,
        value: AttributeValue,
        permissions: Option<Permissions>,
    ) -> Result<Self> {
        let attribute = Self {
            key,
            value,
            permissions,
        };
        attribute.validate(&attribute.describe())?;
        Ok(attribute)
    }

    /// Keyed scalar (or already validated) value.
    pub fn keyed(key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Self {
            key: Some(key.into()),
            value: value.into(),
            permissions: None,
        }
    }

    /// Unkeyed element of an explicit list.
    pub fn element(value: impl Into<AttributeValue>) -> Self {
        Self {
            key: None,
            value: value.into(),
            permissions: None,
        }
    }

    /// Keyed list group; the members must form a valid sibling list.
    pub fn group(key: impl Into<String>, members: Vec<Attribute>) -> Result<Self> {
        Self::new(Some(key.into()), AttributeValue::List(members), None)
    }

    /// Keyed explicit list built from plain values.
    pub fn explicit_list<V: Into<AttributeValue>>(
        key: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::keyed(
            key,
            AttributeValue::List(values.into_iter().map(Attribute::element).collect()),
        )
    }

    /// Keyed map group; members are re-keyed by their map key.
    pub fn map(key: impl Into<String>, members: BTreeMap<String, Attribute>) -> Result<Self> {
        let members = members
            .into_iter()
            .map(|(k, mut a)| {
                a.key = Some(k.clone());
                (k, a)
            })
            .collect();
        Self::new(Some(key.into()), AttributeValue::Map(members), None)
    }

    pub fn with_permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = Some(permissions);
        self
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn kind(&self) -> AttributeKind {
        self.value.kind()
    }

    pub fn value(&self) -> &AttributeValue {
        &self.value
    }

    pub fn permissions(&self) -> Option<&Permissions> {
        self.permissions.as_ref()
    }

    pub fn set_permissions(&mut self, permissions: Option<Permissions>) {
        self.permissions = permissions;
    }

    /// Sets permissions only when none are present.
    pub fn set_default_permissions(&mut self, permissions: &Permissions) {
        if self.permissions.is_none() {
            self.permissions = Some(permissions.clone());
        }
    }

    /// Members of a list or map group, in order.
    pub fn members(&self) -> Option<Vec<&Attribute>> {
        match &self.value {
            AttributeValue::List(items) => Some(items.iter().collect()),
            AttributeValue::Map(map) => Some(map.values().collect()),
            _ => None,
        }
    }

    /// Mutable access to the members of a list or map group.
    pub fn members_mut(&mut self) -> Option<Vec<&mut Attribute>> {
        match &mut self.value {
            AttributeValue::List(items) => Some(items.iter_mut().collect()),
            AttributeValue::Map(map) => Some(map.values_mut().collect()),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Attribute> {
        self.value.member(key)
    }

    /// Dot-separated lookup through nested groups, e.g. `"bounds.lower"`.
    pub fn get_path(&self, path: &str) -> Option<&Attribute> {
        path.split('.')
            .try_fold(self, |current, segment| current.get(segment))
    }

    pub fn is_explicit_list(&self) -> bool {
        matches!(&self.value, AttributeValue::List(items) if is_explicit_list(items))
    }

    /// Copy with every member the requester may not read removed.
    ///
    /// Returns `None` when the attribute itself is unreadable.
    pub fn readable_by(&self, requester: Option<&Principals>) -> Option<Attribute> {
        if !Permissions::is_allowed(self.permissions(), Some(Action::Read), requester) {
            return None;
        }
        let value = match &self.value {
            AttributeValue::List(items) => AttributeValue::List(
                items
                    .iter()
                    .filter_map(|a| a.readable_by(requester))
                    .collect(),
            ),
            AttributeValue::Map(map) => AttributeValue::Map(
                map.iter()
                    .filter_map(|(k, a)| a.readable_by(requester).map(|a| (k.clone(), a)))
                    .collect(),
            ),
            AttributeValue::Node(node) => AttributeValue::Node(Box::new(node.readable_by(requester)?)),
            scalar => scalar.clone(),
        };
        Some(Attribute {
            key: self.key.clone(),
            value,
            permissions: self.permissions.clone(),
        })
    }

    pub fn describe(&self) -> String {
        match &self.key {
            Some(key) => format!("{} attribute '{}'", self.kind(), key),
            None => format!("{} element {}", self.kind(), self.value),
        }
    }

    /// Same key and permissions around a different value.
    pub(crate) fn with_value(&self, value: AttributeValue) -> Attribute {
        Attribute {
            key: self.key.clone(),
            value,
            permissions: self.permissions.clone(),
        }
    }

    pub(crate) fn value_mut(&mut self) -> &mut AttributeValue {
        &mut self.value
    }

    /// Recursively checks group invariants below this attribute.
    pub(crate) fn validate(&self, path: &str) -> Result<()> {
        match &self.value {
            AttributeValue::List(items) => {
                check_list(items, path)?;
                for item in items {
                    item.validate(&member_path(path, item))?;
                }
                Ok(())
            }
            AttributeValue::Map(map) => {
                for (key, item) in map {
                    if item.key() != Some(key.as_str()) {
                        return Err(MetaError::structural(
                            path,
                            format!("dict member '{}' carries mismatched key {:?}", key, item.key()),
                        ));
                    }
                    item.validate(&member_path(path, item))?;
                }
                Ok(())
            }
            AttributeValue::Node(node) => node.validate(),
            _ => Ok(()),
        }
    }
}

/// A list is explicit when it is non-empty and no element carries a key.
pub fn is_explicit_list(items: &[Attribute]) -> bool {
    !items.is_empty() && items.iter().all(|a| a.key.is_none())
}

/// Validates a sibling list: fully keyed with unique keys, or fully unkeyed.
pub fn check_list(items: &[Attribute], path: &str) -> Result<ListShape> {
    if items.is_empty() {
        return Ok(ListShape::Empty);
    }
    let unkeyed = items.iter().filter(|a| a.key.is_none()).count();
    if unkeyed == items.len() {
        return Ok(ListShape::Explicit);
    }
    if unkeyed > 0 {
        return Err(MetaError::structural(
            path,
            format!(
                "list mixes {} keyed and {} unkeyed elements",
                items.len() - unkeyed,
                unkeyed
            ),
        ));
    }
    let mut seen = std::collections::BTreeSet::new();
    for item in items {
        if let Some(key) = item.key() {
            if !seen.insert(key) {
                return Err(MetaError::structural(
                    path,
                    format!("duplicate attribute key '{}'", key),
                ));
            }
        }
    }
    Ok(ListShape::Keyed)
}

fn member_path(path: &str, item: &Attribute) -> String {
    match item.key() {
        Some(key) => format!("{}.{}", path, key),
        None => format!("{}[]", path),
    }
}
