//! Per-action allow-lists of principals.
//!
//! A [`Permissions`] value maps each [`Action`] to an optional set of principal
//! UUIDs. A `None` allow-set means the action is unrestricted. An action that is
//! not in the map at all is also treated as unrestricted by [`Permissions::is_allowed`].
//!
//! Permissions are attached to nodes and attributes. `Option<&Permissions>` is used
//! throughout the crate: a missing permissions value means "inherit/unrestricted".

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use uuid::Uuid;

pub type PrincipalId = Uuid;
pub type Principals = BTreeSet<PrincipalId>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Read,
    WriteValue,
    WriteAttributes,
    WriteChildNodes,
    WritePermissions,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::Read,
        Action::WriteValue,
        Action::WriteAttributes,
        Action::WriteChildNodes,
        Action::WritePermissions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::WriteValue => "write_value",
            Action::WriteAttributes => "write_attributes",
            Action::WriteChildNodes => "write_child_nodes",
            Action::WritePermissions => "write_permissions",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permissions {
    entries: BTreeMap<Action, Option<Principals>>,
}

impl Permissions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Permissions::set`].
    pub fn with(mut self, action: Action, allowed: Option<Principals>) -> Self {
        self.set(action, allowed);
        self
    }

    pub fn set(&mut self, action: Action, allowed: Option<Principals>) {
        self.entries.insert(action, allowed);
    }

    pub fn remove(&mut self, action: Action) -> Option<Option<Principals>> {
        self.entries.remove(&action)
    }

    /// `None` when the action is absent, `Some(None)` when present and unrestricted.
    pub fn get(&self, action: Action) -> Option<&Option<Principals>> {
        self.entries.get(&action)
    }

    pub fn contains(&self, action: Action) -> bool {
        self.entries.contains_key(&action)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Action, &Option<Principals>)> {
        self.entries.iter()
    }

    /// Merges two optional permission values.
    ///
    /// Per action: take `b` when `overwrite` is set or `a` leaves it unrestricted,
    /// take `a` when `b` leaves it unrestricted, otherwise intersect.
    pub fn merge(a: Option<&Self>, b: Option<&Self>, overwrite: bool) -> Option<Self> {
        match (a, b) {
            (None, None) => None,
            (None, Some(b)) => Some(b.clone()),
            (Some(a), None) => Some(a.clone()),
            (Some(a), Some(b)) => Some(a.merge_with(b, overwrite, false)),
        }
    }

    /// Like [`Permissions::merge`] but widens instead of narrowing: restricted sets are united.
    pub fn merge_sum(a: Option<&Self>, b: Option<&Self>) -> Option<Self> {
        match (a, b) {
            (None, None) => None,
            (None, Some(b)) => Some(b.clone()),
            (Some(a), None) => Some(a.clone()),
            (Some(a), Some(b)) => Some(a.merge_with(b, false, true)),
        }
    }

    fn merge_with(&self, other: &Self, overwrite: bool, sum: bool) -> Self {
        let mut entries = BTreeMap::new();
        for (action, allowed) in &self.entries {
            let merged = match other.entries.get(action) {
                Some(other_allowed) => merge_allowed(allowed, other_allowed, overwrite, sum),
                None => allowed.clone(),
            };
            entries.insert(*action, merged);
        }
        for (action, allowed) in &other.entries {
            entries
                .entry(*action)
                .or_insert_with(|| allowed.clone());
        }
        Self { entries }
    }

    /// Checks whether any of the requesting principals may perform `action`.
    ///
    /// Unrestricted when the permissions, the action or the requester set is `None`,
    /// and when the action is absent or carries a `None` allow-set.
    pub fn is_allowed(
        permissions: Option<&Self>,
        action: Option<Action>,
        requester: Option<&Principals>,
    ) -> bool {
        let (Some(permissions), Some(action), Some(requester)) = (permissions, action, requester)
        else {
            return true;
        };
        match permissions.entries.get(&action) {
            None | Some(None) => true,
            Some(Some(allowed)) => !allowed.is_disjoint(requester),
        }
    }

    /// Whether `a` grants no more than `b`.
    ///
    /// `b = None` imposes no bound. Otherwise every action in `a` must be present in
    /// `b`, and where `b` restricts the action `a` must restrict it to a subset.
    pub fn is_subset(a: Option<&Self>, b: Option<&Self>) -> bool {
        let Some(b) = b else {
            return true;
        };
        let Some(a) = a else {
            return false;
        };
        a.entries.iter().all(|(action, allowed)| {
            match (b.entries.get(action), allowed) {
                (None, _) => false,
                (Some(None), _) => true,
                (Some(Some(_)), None) => false,
                (Some(Some(bound)), Some(allowed)) => allowed.is_subset(bound),
            }
        })
    }
}

fn merge_allowed(
    a: &Option<Principals>,
    b: &Option<Principals>,
    overwrite: bool,
    sum: bool,
) -> Option<Principals> {
    match (a, b) {
        (None, None) => None,
        _ if overwrite => b.clone(),
        (None, Some(_)) => b.clone(),
        (Some(_), None) => a.clone(),
        (Some(a), Some(b)) if sum => Some(a.union(b).copied().collect()),
        (Some(a), Some(b)) => Some(a.intersection(b).copied().collect()),
    }
}
