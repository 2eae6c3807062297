//! Default application.
//!
//! Defaults are additive: a group the node already declares gains the members
//! its rule table gives a default for, unless a member with that key exists.
//! Missing permissions are then filled from the permission floors. Keys unknown
//! to the rule tables pass through untouched.
//!
//! Strings under a key whose rule only takes datetimes are parsed into
//! datetimes, so loosely typed documents pick up the declared kind.

use super::roles::{PermissionTemplate, RoleUuids};
use super::rules::{self, connector_rules, find, KeyRule, Members, TYPE_NAME};
use crate::attribute::{parse_datetime, Attribute, AttributeKind, AttributeValue};
use crate::node::Node;
use tracing::{trace, warn};

pub(super) fn default_node(node: &mut Node, roles: Option<&RoleUuids>) {
    trace!(node = %node.label(), "applying defaults");
    let table = match rules::node_rules(node, &node.label()) {
        Ok(table) => Some(table),
        Err(e) => {
            warn!(error = %e, "no defaults for node");
            None
        }
    };

    if let Some(table) = table {
        for attribute in node.attributes_mut() {
            if let Some(rule) = attribute.key().and_then(|key| find(table, key)) {
                default_attribute(attribute, rule, roles);
            }
        }
    }
    if node.permissions().is_none() {
        node.set_permissions(Some(PermissionTemplate::SharedNode.build(roles)));
    }
    for child in node.children_mut() {
        default_node(child, roles);
    }
}

fn default_attribute(attribute: &mut Attribute, rule: &KeyRule, roles: Option<&RoleUuids>) {
    if expects_datetime(rule.kinds) {
        coerce_datetime(attribute.value_mut());
    }
    match rule.members {
        Members::Keys(members) => default_group(attribute, members, roles),
        Members::Connector => {
            let type_name = attribute
                .get(TYPE_NAME)
                .and_then(|t| t.value().as_str())
                .map(str::to_string);
            match type_name.as_deref().map(|t| (t, connector_rules(t))) {
                Some((_, Some(members))) => default_group(attribute, members, roles),
                Some((t, None)) => warn!(connector = t, "no defaults for connector type"),
                None => {}
            }
        }
        Members::Elements(kinds) => {
            if let AttributeValue::List(items) = attribute.value_mut() {
                let floor = rule.floor.build(roles);
                for item in items.iter_mut().filter(|item| item.key().is_none()) {
                    if expects_datetime(kinds) {
                        coerce_datetime(item.value_mut());
                    }
                    item.set_default_permissions(&floor);
                }
            }
        }
        Members::AnyKey(member_rule) => {
            if let Some(members) = attribute.members_mut() {
                for member in members {
                    default_attribute(member, member_rule, roles);
                }
            }
        }
        Members::None => {}
    }
    attribute.set_default_permissions(&rule.floor.build(roles));
}

fn default_group(attribute: &mut Attribute, members: &'static [KeyRule], roles: Option<&RoleUuids>) {
    match attribute.value_mut() {
        AttributeValue::List(items) => {
            if items.iter().any(|item| item.key().is_none()) {
                return;
            }
            for rule in members {
                if let Some(value) = rule.default {
                    if !items.iter().any(|item| item.key() == Some(rule.key)) {
                        items.push(Attribute::keyed(rule.key, value.to_value()));
                    }
                }
            }
        }
        AttributeValue::Map(map) => {
            for rule in members {
                if let Some(value) = rule.default {
                    map.entry(rule.key.to_string())
                        .or_insert_with(|| Attribute::keyed(rule.key, value.to_value()));
                }
            }
        }
        _ => return,
    }
    if let Some(items) = attribute.members_mut() {
        for member in items {
            if let Some(rule) = member.key().and_then(|key| find(members, key)) {
                default_attribute(member, rule, roles);
            }
        }
    }
}

fn expects_datetime(kinds: &[AttributeKind]) -> bool {
    kinds.contains(&AttributeKind::DateTime) && !kinds.contains(&AttributeKind::String)
}

fn coerce_datetime(value: &mut AttributeValue) {
    let parsed = value.as_str().and_then(parse_datetime);
    if let Some(dt) = parsed {
        trace!(value = %dt, "reading string as datetime");
        *value = AttributeValue::DateTime(dt);
    }
}
