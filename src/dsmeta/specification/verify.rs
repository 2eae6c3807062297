//! Verification against the rule tables.
//!
//! All-or-nothing: the first violation is returned as a specification error
//! naming the path, e.g. `dataset(d)/database(db)/table(t).data.rows`.

use super::roles::{PermissionTemplate, RoleUuids};
use super::rules::{self, connector_rules, KeyRule, Members, TYPE_NAME};
use crate::attribute::{Attribute, AttributeKind};
use crate::error::{MetaError, Result};
use crate::node::{Node, NodeType};
use crate::permissions::Permissions;
use std::collections::BTreeSet;
use tracing::trace;

pub(super) fn verify_node(
    node: &Node,
    expected: NodeType,
    parent_path: Option<&str>,
    roles: Option<&RoleUuids>,
) -> Result<()> {
    let path = match parent_path {
        Some(parent) => format!("{}/{}", parent, node.label()),
        None => node.label(),
    };
    trace!(node = %path, "verifying");

    if node.node_type() != expected {
        return Err(MetaError::specification(
            &path,
            format!("expected a {} node, found {}", expected, node.node_type()),
        ));
    }
    check_permissions(node.permissions(), PermissionTemplate::SharedNode, roles, &path)?;

    let table = rules::node_rules(node, &path)?;
    let attributes: Vec<&Attribute> = node.attributes().iter().collect();
    verify_attributes(&attributes, table, &path, roles)?;

    let children = node.children();
    let Some(child_type) = expected.child_type() else {
        if children.is_empty() {
            return Ok(());
        }
        return Err(MetaError::specification(
            &path,
            format!("{} nodes cannot have child nodes", expected),
        ));
    };
    let mut names = BTreeSet::new();
    for child in children {
        if !names.insert(child.name()) {
            return Err(MetaError::specification(
                &path,
                format!("duplicate child name {}", child.label()),
            ));
        }
        verify_node(child, child_type, Some(&path), roles)?;
    }
    Ok(())
}

fn verify_attributes(
    attributes: &[&Attribute],
    table: &[KeyRule],
    path: &str,
    roles: Option<&RoleUuids>,
) -> Result<()> {
    for attribute in attributes {
        let Some(key) = attribute.key() else {
            return Err(MetaError::specification(path, "unkeyed attribute in a keyed group"));
        };
        let Some(rule) = rules::find(table, key) else {
            return Err(MetaError::specification(
                path,
                format!("attribute '{}' is not allowed here", key),
            ));
        };
        verify_attribute(attribute, rule, &format!("{}.{}", path, key), roles)?;
    }
    for rule in table.iter().filter(|rule| rule.required) {
        if !attributes.iter().any(|a| a.key() == Some(rule.key)) {
            return Err(MetaError::specification(
                path,
                format!("required attribute '{}' is missing", rule.key),
            ));
        }
    }
    Ok(())
}

fn verify_attribute(
    attribute: &Attribute,
    rule: &KeyRule,
    path: &str,
    roles: Option<&RoleUuids>,
) -> Result<()> {
    let kind = attribute.kind();
    if !rule.allows(kind) {
        return Err(MetaError::specification(
            path,
            format!("expected {}, found {}", kind_names(rule.kinds), kind),
        ));
    }
    check_permissions(attribute.permissions(), rule.floor, roles, path)?;

    let members = match attribute.members() {
        Some(members) => members,
        None => return Ok(()),
    };
    match rule.members {
        Members::Keys(table) => {
            let members = keyed_members(attribute, members, path)?;
            verify_attributes(&members, table, path, roles)
        }
        Members::Connector => {
            let type_name = attribute
                .get(TYPE_NAME)
                .and_then(|t| t.value().as_str())
                .ok_or_else(|| MetaError::specification(path, "connector has no type_name"))?;
            let table = connector_rules(type_name).ok_or_else(|| {
                MetaError::specification(path, format!("unknown connector type '{}'", type_name))
            })?;
            let members = keyed_members(attribute, members, path)?;
            verify_attributes(&members, table, path, roles)
        }
        Members::AnyKey(member_rule) => {
            let members = keyed_members(attribute, members, path)?;
            for member in members {
                let key = member.key().unwrap_or_default();
                verify_attribute(member, member_rule, &format!("{}.{}", path, key), roles)?;
            }
            Ok(())
        }
        Members::Elements(kinds) => {
            if kind == AttributeKind::Map || members.iter().any(|m| m.key().is_some()) {
                return Err(MetaError::specification(path, "expected an explicit list"));
            }
            for element in members {
                if !kinds.contains(&element.kind()) {
                    return Err(MetaError::specification(
                        format!("{}[]", path),
                        format!("expected {}, found {}", kind_names(kinds), element.kind()),
                    ));
                }
                check_permissions(element.permissions(), rule.floor, roles, path)?;
            }
            Ok(())
        }
        Members::None => Err(MetaError::specification(
            path,
            format!("{} does not take members", rule.key),
        )),
    }
}

fn keyed_members<'a>(
    attribute: &Attribute,
    members: Vec<&'a Attribute>,
    path: &str,
) -> Result<Vec<&'a Attribute>> {
    if attribute.is_explicit_list() {
        return Err(MetaError::specification(
            path,
            "expected a keyed group, found an explicit list",
        ));
    }
    Ok(members)
}

/// Present permissions must not grant more than the floor; absent ones inherit.
fn check_permissions(
    permissions: Option<&Permissions>,
    floor: PermissionTemplate,
    roles: Option<&RoleUuids>,
    path: &str,
) -> Result<()> {
    let Some(permissions) = permissions else {
        return Ok(());
    };
    let bound = floor.build(roles);
    if Permissions::is_subset(Some(permissions), Some(&bound)) {
        Ok(())
    } else {
        Err(MetaError::specification(
            path,
            format!("permissions are wider than the {:?} floor", floor),
        ))
    }
}

fn kind_names(kinds: &[AttributeKind]) -> String {
    kinds
        .iter()
        .map(AttributeKind::as_str)
        .collect::<Vec<_>>()
        .join(" or ")
}
