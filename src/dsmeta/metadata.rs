//! # Metadata
//!
//! [`Metadata`] owns the named roots of a metadata document. Each root pairs a
//! node tree with the document format it was read in and, optionally, the
//! [`Specification`] it is checked against.
//!
//! ```yaml
//! dataset:
//!   format: full
//!   specification: dataset_standard_1
//!   node: {type_name: dataset, ...}
//! other:
//!   format: simple
//!   node: {...}
//! ```
//!
//! Roots with a specification are defaulted and verified whenever a
//! `Metadata` is built, so every value of this type holds verified trees.
//! Roots without one are stored as read.
//!
//! All operations are functional: `merge_with`, `filter` and `view` return a
//! new `Metadata`.

use crate::document::{self, Format, TextFormat};
use crate::error::{MetaError, Result};
use crate::filter::{Filter, View};
use crate::merge::{MergeOptions, Mergeable};
use crate::node::Node;
use crate::permissions::Principals;
use crate::specification::{RoleUuids, Specification};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RootName {
    Dataset,
    Other,
}

impl RootName {
    pub const ALL: [RootName; 2] = [RootName::Dataset, RootName::Other];

    pub fn as_str(&self) -> &'static str {
        match self {
            RootName::Dataset => "dataset",
            RootName::Other => "other",
        }
    }
}

impl fmt::Display for RootName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RootName {
    type Err = MetaError;

    fn from_str(s: &str) -> Result<Self> {
        RootName::ALL
            .into_iter()
            .find(|root| root.as_str() == s)
            .ok_or_else(|| {
                MetaError::structural(s, "unknown root key (expected 'dataset' or 'other')")
            })
    }
}

/// Per-root specifications; `None` marks a root as unverified.
pub type Specifications = BTreeMap<RootName, Option<Specification>>;

#[derive(Debug, Clone, PartialEq)]
pub struct Root {
    pub format: Format,
    pub node: Node,
    pub specification: Option<Specification>,
}

impl Root {
    pub fn new(node: Node, specification: Option<Specification>) -> Self {
        Self {
            format: Format::Full,
            node,
            specification,
        }
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// Defaults and verifies the node when a specification is present.
    fn checked(self) -> Result<Self> {
        let Some(specification) = &self.specification else {
            debug!(format = %self.format, "storing root unverified");
            return Ok(self);
        };
        let node = specification.check_apply_verify(&self.node)?;
        Ok(Self { node, ..self })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    roots: BTreeMap<RootName, Root>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds metadata from roots, defaulting and verifying each.
    pub fn from_roots(roots: BTreeMap<RootName, Root>) -> Result<Self> {
        let roots = roots
            .into_iter()
            .map(|(name, root)| {
                debug!(root = %name, "checking root");
                root.checked().map(|root| (name, root))
            })
            .collect::<Result<_>>()?;
        Ok(Self { roots })
    }

    /// Adds or replaces a root.
    pub fn with_root(mut self, name: RootName, root: Root) -> Result<Self> {
        self.roots.insert(name, root.checked()?);
        Ok(self)
    }

    /// Parses a document map.
    ///
    /// `default_specification` applies to a `dataset` root that names none.
    /// `role_uuids` are attached to every specification.
    pub fn from_document(
        document: &Value,
        role_uuids: Option<&RoleUuids>,
        default_specification: Option<&Specification>,
    ) -> Result<Self> {
        let map = document
            .as_object()
            .ok_or_else(|| MetaError::structural("document", "expected a mapping of roots"))?;
        let mut roots = BTreeMap::new();
        for (key, raw) in map {
            let name: RootName = key.parse()?;
            let root = parse_root(raw, name, role_uuids, default_specification)?;
            roots.insert(name, root);
        }
        Self::from_roots(roots)
    }

    pub fn from_text(
        text: &str,
        text_format: TextFormat,
        role_uuids: Option<&RoleUuids>,
        default_specification: Option<&Specification>,
    ) -> Result<Self> {
        let document = text_format.parse(text)?;
        Self::from_document(&document, role_uuids, default_specification)
    }

    pub fn from_yaml(
        text: &str,
        role_uuids: Option<&RoleUuids>,
        default_specification: Option<&Specification>,
    ) -> Result<Self> {
        Self::from_text(text, TextFormat::Yaml, role_uuids, default_specification)
    }

    pub fn from_json(
        text: &str,
        role_uuids: Option<&RoleUuids>,
        default_specification: Option<&Specification>,
    ) -> Result<Self> {
        Self::from_text(text, TextFormat::Json, role_uuids, default_specification)
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn roots(&self) -> impl Iterator<Item = (&RootName, &Root)> {
        self.roots.iter()
    }

    pub fn root(&self, name: RootName) -> Option<&Root> {
        self.roots.get(&name)
    }

    pub fn node(&self, name: RootName) -> Option<&Node> {
        self.root(name).map(|root| &root.node)
    }

    pub fn specification(&self, name: RootName) -> Option<&Specification> {
        self.root(name).and_then(|root| root.specification.as_ref())
    }

    pub fn remove_root(&mut self, name: RootName) -> Option<Root> {
        self.roots.remove(&name)
    }

    pub fn specifications(&self) -> Specifications {
        self.roots
            .iter()
            .map(|(name, root)| (*name, root.specification.clone()))
            .collect()
    }

    /// `overrides` win per root; an explicit `None` removes a specification.
    pub fn merge_specifications(base: &Specifications, overrides: Option<&Specifications>) -> Specifications {
        let mut merged = base.clone();
        if let Some(overrides) = overrides {
            for (name, specification) in overrides {
                merged.insert(*name, specification.clone());
            }
        }
        merged
    }

    /// Re-runs defaults and verification, optionally under other specifications.
    pub fn check_apply_verify(&self, overrides: Option<&Specifications>) -> Result<Self> {
        let specifications = Self::merge_specifications(&self.specifications(), overrides);
        let roots = self
            .roots
            .iter()
            .map(|(name, root)| {
                let specification = specifications.get(name).cloned().flatten();
                (*name, Root { specification, ..root.clone() })
            })
            .collect();
        Self::from_roots(roots)
    }

    /// Root-wise merge. Roots present on one side only are copied.
    ///
    /// Each merged root keeps this side's specification (the other's when
    /// this side has none), subject to `overrides`, and is re-defaulted and
    /// re-verified.
    pub fn merge_with(
        &self,
        other: &Metadata,
        options: &MergeOptions,
        overrides: Option<&Specifications>,
    ) -> Result<Self> {
        let mut specifications = other.specifications();
        for (name, specification) in self.specifications() {
            if specification.is_some() || !specifications.contains_key(&name) {
                specifications.insert(name, specification);
            }
        }
        let specifications = Self::merge_specifications(&specifications, overrides);

        let mut roots = BTreeMap::new();
        for name in RootName::ALL {
            let merged = match (self.roots.get(&name), other.roots.get(&name)) {
                (Some(a), Some(b)) => {
                    debug!(root = %name, overwrite = options.overwrite, "merging roots");
                    Root {
                        format: a.format,
                        node: a.node.merge(&b.node, options)?,
                        specification: None,
                    }
                }
                (Some(only), None) | (None, Some(only)) => only.clone(),
                (None, None) => continue,
            };
            let specification = specifications.get(&name).cloned().flatten();
            roots.insert(name, Root { specification, ..merged });
        }
        Self::from_roots(roots)
    }

    /// Applies per-root filters. Roots without a filter are copied, roots
    /// whose node is filtered away are removed. Results are verified again
    /// but not re-defaulted, which would undo the filtering.
    pub fn filter(
        &self,
        filters: &BTreeMap<RootName, Filter>,
        overrides: Option<&Specifications>,
    ) -> Result<Self> {
        let specifications = Self::merge_specifications(&self.specifications(), overrides);
        let mut roots = BTreeMap::new();
        for (name, root) in &self.roots {
            let node = match filters.get(name) {
                Some(filter) => match filter.apply(&root.node) {
                    Some(node) => node,
                    None => {
                        debug!(root = %name, "root filtered away");
                        continue;
                    }
                },
                None => root.node.clone(),
            };
            let specification = specifications.get(name).cloned().flatten();
            if let Some(specification) = &specification {
                specification.verify(&node)?;
            }
            roots.insert(
                *name,
                Root {
                    format: root.format,
                    node,
                    specification,
                },
            );
        }
        Ok(Self { roots })
    }

    /// Projects the `dataset` root through a named view.
    pub fn view(&self, view: View) -> Result<Self> {
        debug!(view = %view, "applying view");
        let filters = BTreeMap::from([(RootName::Dataset, view.filter())]);
        self.filter(&filters, None)
    }

    /// Document map as seen by `requester`; unreadable roots are omitted.
    pub fn to_document(
        &self,
        requester: Option<&Principals>,
        format_override: Option<Format>,
    ) -> Result<Value> {
        let mut document = Map::new();
        for (name, root) in &self.roots {
            let Some(node) = root.node.readable_by(requester) else {
                continue;
            };
            let format = format_override.unwrap_or(root.format);
            let mut map = Map::new();
            map.insert("format".into(), Value::from(format.as_str()));
            map.insert("node".into(), document::node_to_value(&node, format)?);
            if let Some(specification) = &root.specification {
                map.insert("specification".into(), Value::from(specification.to_string()));
            }
            document.insert(name.as_str().into(), Value::Object(map));
        }
        Ok(Value::Object(document))
    }

    pub fn to_text(
        &self,
        text_format: TextFormat,
        requester: Option<&Principals>,
        format_override: Option<Format>,
    ) -> Result<String> {
        text_format.render(&self.to_document(requester, format_override)?)
    }

    pub fn to_yaml(&self, requester: Option<&Principals>, format_override: Option<Format>) -> Result<String> {
        self.to_text(TextFormat::Yaml, requester, format_override)
    }

    pub fn to_json(&self, requester: Option<&Principals>, format_override: Option<Format>) -> Result<String> {
        self.to_text(TextFormat::Json, requester, format_override)
    }
}

fn parse_root(
    raw: &Value,
    name: RootName,
    role_uuids: Option<&RoleUuids>,
    default_specification: Option<&Specification>,
) -> Result<Root> {
    let map = raw
        .as_object()
        .ok_or_else(|| MetaError::structural(name.as_str(), "expected a root mapping"))?;
    if let Some(unknown) = map
        .keys()
        .find(|k| !matches!(k.as_str(), "format" | "node" | "specification"))
    {
        return Err(MetaError::structural(
            name.as_str(),
            format!("unexpected field '{}'", unknown),
        ));
    }
    let format = match map.get("format") {
        None | Some(Value::Null) => Format::Full,
        Some(Value::String(format)) => format.parse()?,
        Some(_) => return Err(MetaError::structural(name.as_str(), "format must be a string")),
    };
    let node = map
        .get("node")
        .ok_or_else(|| MetaError::structural(name.as_str(), "missing node"))?;
    let node = document::node_from_value(node, format)?;
    let specification = match map.get("specification") {
        None | Some(Value::Null) => match name {
            RootName::Dataset => default_specification.cloned(),
            RootName::Other => None,
        },
        Some(Value::String(id)) => Some(id.parse::<Specification>()?),
        Some(_) => {
            return Err(MetaError::structural(
                name.as_str(),
                "specification must be a string",
            ))
        }
    };
    let specification = specification.map(|s| s.with_roles(role_uuids.cloned()));
    Ok(Root::new(node, specification).with_format(format))
}
