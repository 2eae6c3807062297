//! Sibling-list matching merge shared by attributes and nodes.
//!
//! Both attribute lists and child-node lists are merged the same way: every
//! element on the left is paired with at most one element on the right that has
//! the same identity, pairs are merged, and unmatched elements from both sides are
//! carried over (left side first, then the right side, each in original order).
//! An element whose identity matches more than one counterpart is a merge error.

use crate::error::{MetaError, Result};
use crate::permissions::{Action, Permissions, Principals};

/// Knobs for a merge.
///
/// `overwrite` lets the right operand win on conflicting values. `requester`, when
/// set, gates every change against the left operand's write permissions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOptions {
    pub overwrite: bool,
    pub requester: Option<Principals>,
}

impl MergeOptions {
    pub fn new(overwrite: bool) -> Self {
        Self {
            overwrite,
            requester: None,
        }
    }

    pub fn with_requester(mut self, requester: Principals) -> Self {
        self.requester = Some(requester);
        self
    }

    /// Fails with a permission error unless the requester may perform `action`.
    pub fn require(
        &self,
        permissions: Option<&Permissions>,
        action: Action,
        target: impl FnOnce() -> String,
    ) -> Result<()> {
        if Permissions::is_allowed(permissions, Some(action), self.requester.as_ref()) {
            Ok(())
        } else {
            Err(MetaError::permission(action, target()))
        }
    }
}

pub trait Mergeable: Clone + PartialEq {
    /// Whether `self` and `other` denote the same sibling and must be merged.
    ///
    /// Returns an error when the two share an identity but can never be combined,
    /// e.g. an attribute key bound to two different kinds.
    fn same_identity(&self, other: &Self) -> Result<bool>;

    fn merge(&self, other: &Self, options: &MergeOptions) -> Result<Self>;

    /// Short label used in error messages.
    fn describe(&self) -> String;

    fn merge_check(&self, other: &Self, options: &MergeOptions) -> Result<()> {
        self.merge(other, options).map(|_| ())
    }

    /// Whether siblings sharing this element's identity are indistinguishable,
    /// e.g. equal explicit-list values. Such elements pair one-to-one in list
    /// order instead of counting as an ambiguous match.
    fn interchangeable(&self) -> bool {
        false
    }
}

pub fn merge_lists<T: Mergeable>(left: &[T], right: &[T], options: &MergeOptions) -> Result<Vec<T>> {
    let mut taken_by: Vec<Option<usize>> = vec![None; right.len()];
    let mut merged = Vec::with_capacity(left.len() + right.len());

    for (i, elem) in left.iter().enumerate() {
        let mut found = None;
        for (j, candidate) in right.iter().enumerate() {
            if elem.interchangeable() {
                if taken_by[j].is_none() && elem.same_identity(candidate)? {
                    found = Some(j);
                    break;
                }
                continue;
            }
            if !elem.same_identity(candidate)? {
                continue;
            }
            if found.is_some() {
                return Err(MetaError::Merge(format!(
                    "{} matches more than one other element",
                    elem.describe()
                )));
            }
            if taken_by[j].is_some() {
                return Err(MetaError::Merge(format!(
                    "{} matches more than one other element",
                    candidate.describe()
                )));
            }
            found = Some(j);
        }
        match found {
            Some(j) => {
                taken_by[j] = Some(i);
                merged.push(elem.merge(&right[j], options)?);
            }
            None => merged.push(elem.clone()),
        }
    }

    merged.extend(
        right
            .iter()
            .zip(taken_by)
            .filter(|(_, taken)| taken.is_none())
            .map(|(elem, _)| elem.clone()),
    );
    Ok(merged)
}

/// First pair of siblings that share an identity, if any.
pub fn find_duplicate<T: Mergeable>(items: &[T]) -> Result<Option<(usize, usize)>> {
    for (i, a) in items.iter().enumerate() {
        for (j, b) in items.iter().enumerate().skip(i + 1) {
            if a.same_identity(b)? {
                return Ok(Some((i, j)));
            }
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: &'static str,
        value: i32,
    }

    impl Mergeable for Item {
        fn same_identity(&self, other: &Self) -> Result<bool> {
            Ok(self.id == other.id)
        }

        fn merge(&self, other: &Self, options: &MergeOptions) -> Result<Self> {
            if self.value != other.value && !options.overwrite {
                return Err(MetaError::Merge(format!("{} conflicts", self.id)));
            }
            Ok(if options.overwrite { other.clone() } else { self.clone() })
        }

        fn describe(&self) -> String {
            format!("item '{}'", self.id)
        }
    }

    fn item(id: &'static str, value: i32) -> Item {
        Item { id, value }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Element(i32);

    impl Mergeable for Element {
        fn same_identity(&self, other: &Self) -> Result<bool> {
            Ok(self == other)
        }

        fn merge(&self, _other: &Self, _options: &MergeOptions) -> Result<Self> {
            Ok(self.clone())
        }

        fn describe(&self) -> String {
            format!("element {}", self.0)
        }

        fn interchangeable(&self) -> bool {
            true
        }
    }

    #[test]
    fn left_order_then_unmatched_right() {
        let left = vec![item("a", 1), item("b", 2)];
        let right = vec![item("c", 3), item("a", 1)];

        let merged = merge_lists(&left, &right, &MergeOptions::default()).unwrap();
        assert_eq!(merged, vec![item("a", 1), item("b", 2), item("c", 3)]);
    }

    #[test]
    fn conflicts_surface_from_pair_merge() {
        let left = vec![item("a", 1)];
        let right = vec![item("a", 2)];

        assert!(merge_lists(&left, &right, &MergeOptions::default()).is_err());
        let merged = merge_lists(&left, &right, &MergeOptions::new(true)).unwrap();
        assert_eq!(merged, vec![item("a", 2)]);
    }

    #[test]
    fn ambiguous_match_is_rejected() {
        let left = vec![item("a", 1)];
        let right = vec![item("a", 1), item("a", 1)];

        let err = merge_lists(&left, &right, &MergeOptions::default()).unwrap_err();
        assert!(err.to_string().contains("more than one"));
    }

    #[test]
    fn repeated_values_pair_one_to_one() {
        let list = vec![Element(0), Element(0), Element(1)];
        let merged = merge_lists(&list, &list, &MergeOptions::default()).unwrap();
        assert_eq!(merged, list);

        let merged = merge_lists(&[Element(0)], &list, &MergeOptions::default()).unwrap();
        assert_eq!(merged, vec![Element(0), Element(0), Element(1)]);
    }

    #[test]
    fn finds_duplicates() {
        assert_eq!(find_duplicate(&[item("a", 1), item("b", 1)]).unwrap(), None);
        assert_eq!(
            find_duplicate(&[item("a", 1), item("b", 1), item("a", 2)]).unwrap(),
            Some((0, 2))
        );
    }

    #[test]
    fn require_checks_requester() {
        let owner = uuid::Uuid::from_u128(1);
        let perms = Permissions::new().with(Action::WriteValue, Some([owner].into()));
        let stranger = MergeOptions::default().with_requester([uuid::Uuid::from_u128(2)].into());
        let anyone = MergeOptions::default();

        assert!(anyone
            .require(Some(&perms), Action::WriteValue, || "x".into())
            .is_ok());
        assert!(matches!(
            stranger.require(Some(&perms), Action::WriteValue, || "x".into()),
            Err(MetaError::Permission { .. })
        ));
    }
}
