//! # Specifications
//!
//! A [`Specification`] names the rule set a root node is checked against and
//! carries the role principals its permission templates are built from.
//!
//! Identifiers have the form `<node_type>_<kind>_<version>`:
//!
//! ```text
//! dataset_standard_1
//! ───┬─── ───┬──── ┬
//!    │       │     └─ version (only 1 is supported)
//!    │       └─────── rule set kind
//!    └─────────────── root node type
//! ```
//!
//! Two passes use the rule tables in [`rules`]:
//!
//! - [`Specification::apply_defaults`] fills default members into groups the
//!   node already declares and assigns missing permissions from the floors.
//!   Existing values always win.
//! - [`Specification::verify`] checks node types per depth, attribute keys,
//!   kinds, required keys, connector sub-schemas and permission floors.
//!
//! Both return errors instead of partially processed trees.

mod defaults;
pub mod roles;
pub mod rules;
mod verify;

pub use roles::{select, PermissionTemplate, Role, RoleUuids};

use crate::error::{MetaError, Result};
use crate::node::{Node, NodeType};
use crate::permissions::Permissions;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

pub const CURRENT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecificationKind {
    Standard,
}

impl SpecificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpecificationKind::Standard => "standard",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Specification {
    node_type: NodeType,
    kind: SpecificationKind,
    version: u32,
    role_uuids: Option<RoleUuids>,
}

impl Specification {
    /// The standard rule set at the current version for a root of `node_type`.
    pub fn standard(node_type: NodeType) -> Self {
        Self {
            node_type,
            kind: SpecificationKind::Standard,
            version: CURRENT_VERSION,
            role_uuids: None,
        }
    }

    pub fn parse(id: &str) -> Result<Self> {
        let parts: Vec<&str> = id.split('_').collect();
        let [node_type, kind, version] = parts.as_slice() else {
            return Err(MetaError::specification(
                id,
                "expected an identifier of the form <node_type>_<kind>_<version>",
            ));
        };
        let node_type = node_type
            .parse::<NodeType>()
            .map_err(|e| MetaError::specification(id, e))?;
        let kind = match *kind {
            "standard" => SpecificationKind::Standard,
            other => {
                return Err(MetaError::specification(
                    id,
                    format!("unknown specification kind '{}'", other),
                ))
            }
        };
        let version = version
            .parse::<u32>()
            .map_err(|_| MetaError::specification(id, format!("invalid version '{}'", version)))?;
        Ok(Self {
            node_type,
            kind,
            version,
            role_uuids: None,
        })
    }

    pub fn with_roles(mut self, role_uuids: Option<RoleUuids>) -> Self {
        self.role_uuids = role_uuids;
        self
    }

    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    pub fn kind(&self) -> SpecificationKind {
        self.kind
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn role_uuids(&self) -> Option<&RoleUuids> {
        self.role_uuids.as_ref()
    }

    pub fn check_version(&self) -> Result<()> {
        if self.version == CURRENT_VERSION {
            Ok(())
        } else {
            Err(MetaError::specification(
                self.to_string(),
                format!(
                    "version {} is not supported (expected {})",
                    self.version, CURRENT_VERSION
                ),
            ))
        }
    }

    /// Permissions for a template under this specification's roles.
    pub fn template(&self, template: PermissionTemplate) -> Permissions {
        template.build(self.role_uuids())
    }

    /// Copy of `node` with defaults filled in; existing values always win.
    pub fn apply_defaults(&self, node: &Node) -> Result<Node> {
        self.check_version()?;
        debug!(specification = %self, root = %node.label(), "applying defaults");
        let mut defaulted = node.clone();
        defaults::default_node(&mut defaulted, self.role_uuids());
        Ok(defaulted)
    }

    pub fn verify(&self, node: &Node) -> Result<()> {
        self.check_version()?;
        debug!(specification = %self, root = %node.label(), "verifying");
        verify::verify_node(node, self.node_type, None, self.role_uuids())
    }

    /// Defaults then verification, the pipeline every loaded root goes through.
    pub fn check_apply_verify(&self, node: &Node) -> Result<Node> {
        let defaulted = self.apply_defaults(node)?;
        self.verify(&defaulted)?;
        Ok(defaulted)
    }
}

impl fmt::Display for Specification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.node_type, self.kind.as_str(), self.version)
    }
}

impl FromStr for Specification {
    type Err = MetaError;

    fn from_str(s: &str) -> Result<Self> {
        Specification::parse(s)
    }
}
