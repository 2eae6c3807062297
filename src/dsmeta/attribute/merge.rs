//! Attribute merge.
//!
//! Keyed attributes are matched by key, unkeyed explicit-list elements by value,
//! with repeated values paired one-to-one.
//! Scalars only merge when equal unless `overwrite` is set, groups merge their
//! members with the sibling-list algorithm, node values recurse into node merge.

use super::{check_list, Attribute, AttributeValue, ListShape};
use crate::error::{MetaError, Result};
use crate::merge::{merge_lists, MergeOptions, Mergeable};
use crate::permissions::{Action, Permissions};
use std::collections::BTreeMap;

impl Mergeable for Attribute {
    fn same_identity(&self, other: &Self) -> Result<bool> {
        match (self.key(), other.key()) {
            (Some(a), Some(b)) if a == b => {
                if self.kind() != other.kind() {
                    return Err(MetaError::Merge(format!(
                        "attribute '{}' is {} on one side and {} on the other",
                        a,
                        self.kind(),
                        other.kind()
                    )));
                }
                Ok(true)
            }
            (None, None) => Ok(self.value == other.value),
            _ => Ok(false),
        }
    }

    fn merge(&self, other: &Self, options: &MergeOptions) -> Result<Self> {
        if !self.same_identity(other)? {
            return Err(MetaError::Merge(format!(
                "cannot merge {} with {}",
                Attribute::describe(self),
                Attribute::describe(other)
            )));
        }

        let value = merge_values(self, other, options)?;

        let permissions = Permissions::merge(
            self.permissions(),
            other.permissions(),
            options.overwrite,
        );
        if permissions.as_ref() != self.permissions() {
            options.require(self.permissions(), Action::WritePermissions, || {
                Attribute::describe(self)
            })?;
        }

        Ok(Attribute {
            key: self.key.clone(),
            value,
            permissions,
        })
    }

    fn describe(&self) -> String {
        Attribute::describe(self)
    }

    fn interchangeable(&self) -> bool {
        self.key.is_none()
    }
}

fn merge_values(left: &Attribute, right: &Attribute, options: &MergeOptions) -> Result<AttributeValue> {
    match (&left.value, &right.value) {
        (AttributeValue::List(a), AttributeValue::List(b)) => {
            let path = Attribute::describe(left);
            let (shape_a, shape_b) = (check_list(a, &path)?, check_list(b, &path)?);
            if shape_a != ListShape::Empty && shape_b != ListShape::Empty && shape_a != shape_b {
                return Err(MetaError::Merge(format!(
                    "{} mixes an explicit list with a keyed group",
                    path
                )));
            }
            let merged = merge_lists(a, b, options)?;
            if merged.len() > a.len() {
                options.require(left.permissions(), Action::WriteValue, || path.clone())?;
            }
            Ok(AttributeValue::List(merged))
        }
        (AttributeValue::Map(a), AttributeValue::Map(b)) => {
            let mut merged: BTreeMap<String, Attribute> = BTreeMap::new();
            for (key, item) in a {
                let item = match b.get(key) {
                    Some(other) => item.merge(other, options)?,
                    None => item.clone(),
                };
                merged.insert(key.clone(), item);
            }
            let mut added = false;
            for (key, item) in b {
                if !merged.contains_key(key) {
                    added = true;
                    merged.insert(key.clone(), item.clone());
                }
            }
            if added {
                options.require(left.permissions(), Action::WriteValue, || {
                    Attribute::describe(left)
                })?;
            }
            Ok(AttributeValue::Map(merged))
        }
        (AttributeValue::Node(a), AttributeValue::Node(b)) => {
            Ok(AttributeValue::Node(Box::new(a.merge(b, options)?)))
        }
        (a, b) if a == b => Ok(a.clone()),
        (_, b) if options.overwrite => {
            options.require(left.permissions(), Action::WriteValue, || {
                Attribute::describe(left)
            })?;
            Ok(b.clone())
        }
        (a, b) => Err(MetaError::Merge(format!(
            "conflicting values for {}: {} vs {}",
            Attribute::describe(left),
            a,
            b
        ))),
    }
}
