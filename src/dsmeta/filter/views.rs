//! Named audience views.
//!
//! | View | Audience | Keeps |
//! |------|----------|-------|
//! | `ml` | model training | names, descriptions, types, feature/target flags, privacy level |
//! | `sql` | SQL privacy engine | names, types, bounds, private-SQL settings |
//! | `regular` | general consumers | everything except connector credentials and ports |

use super::{keys, Filter, Retain, RetainKeys};
use crate::node::NodeType;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    MachineLearning,
    SmartNoise,
    Regular,
}

impl View {
    pub const ALL: [View; 3] = [View::MachineLearning, View::SmartNoise, View::Regular];

    pub fn as_str(&self) -> &'static str {
        match self {
            View::MachineLearning => "ml",
            View::SmartNoise => "sql",
            View::Regular => "regular",
        }
    }

    pub fn filter(&self) -> Filter {
        let tables = match self {
            View::MachineLearning => machine_learning(),
            View::SmartNoise => smart_noise(),
            View::Regular => regular(),
        };
        tables
            .into_iter()
            .fold(Filter::new(), |filter, (node_type, table)| {
                filter.retain_attributes(Some(node_type), Some(table))
            })
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for View {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ml" | "machine_learning" => Ok(View::MachineLearning),
            "sql" | "smart_noise" => Ok(View::SmartNoise),
            "regular" => Ok(View::Regular),
            other => Err(format!(
                "unknown view '{}' (expected ml, sql or regular)",
                other
            )),
        }
    }
}

fn table(groups: &[(&str, Retain)]) -> RetainKeys {
    groups
        .iter()
        .map(|(key, retain)| (key.to_string(), retain.clone()))
        .collect()
}

fn members(names: &[&str]) -> Retain {
    Retain::Members(keys(names.iter().copied()))
}

fn machine_learning() -> Vec<(NodeType, RetainKeys)> {
    vec![
        (
            NodeType::Dataset,
            table(&[
                ("data", members(&["description", "name", "tags"])),
                ("differential_privacy", members(&["privacy_level"])),
            ]),
        ),
        (
            NodeType::Database,
            table(&[
                ("connector", Retain::Any),
                ("data", members(&["description", "name"])),
                ("differential_privacy", members(&["privacy_level"])),
            ]),
        ),
        (
            NodeType::Schema,
            table(&[
                ("data", members(&["description", "name"])),
                ("differential_privacy", members(&["privacy_level"])),
            ]),
        ),
        (
            NodeType::Table,
            table(&[
                ("data", members(&["description", "name"])),
                (
                    "differential_privacy",
                    members(&["budget_delta", "budget_epsilon", "privacy_level"]),
                ),
            ]),
        ),
        (
            NodeType::Column,
            table(&[
                ("data", members(&["data_type_name", "description", "name"])),
                ("machine_learning", members(&["is_feature", "is_target"])),
            ]),
        ),
    ]
}

fn smart_noise() -> Vec<(NodeType, RetainKeys)> {
    vec![
        (
            NodeType::Dataset,
            table(&[
                ("data", members(&["name"])),
                ("differential_privacy", members(&["privacy_level"])),
            ]),
        ),
        (
            NodeType::Database,
            table(&[
                ("connector", Retain::Any),
                ("data", members(&["name"])),
                ("differential_privacy", members(&["privacy_level"])),
            ]),
        ),
        (
            NodeType::Schema,
            table(&[
                ("data", members(&["name"])),
                ("differential_privacy", members(&["privacy_level"])),
            ]),
        ),
        (
            NodeType::Table,
            table(&[
                ("data", members(&["name", "rows"])),
                ("differential_privacy", members(&["privacy_level"])),
                (
                    "private_sql",
                    members(&[
                        "censor_dims",
                        "clamp_columns",
                        "clamp_counts",
                        "max_ids",
                        "row_privacy",
                        "sample_max_ids",
                        "use_dpsu",
                    ]),
                ),
            ]),
        ),
        (
            NodeType::Column,
            table(&[
                ("data", members(&["data_type_name", "name"])),
                ("private_sql", members(&["private_id"])),
                (
                    "private_sql_and_synthesis",
                    members(&["bounded", "cardinality", "lower", "upper"]),
                ),
            ]),
        ),
    ]
}

/// Connector members without credentials or ports; required keys stay so the
/// result still verifies.
const PUBLIC_CONNECTOR: &[&str] = &[
    "decimal",
    "header_columns",
    "header_row",
    "host",
    "index_col",
    "na_values",
    "sep",
    "skipinitialspace",
    "type_name",
    "uri",
    "use_original_header",
];

fn regular() -> Vec<(NodeType, RetainKeys)> {
    let data = members(&["description", "metadata_is_public", "name"]);
    vec![
        (
            NodeType::Dataset,
            table(&[
                ("data", members(&["description", "metadata_is_public", "name", "tags"])),
                ("differential_privacy", members(&["privacy_level"])),
            ]),
        ),
        (
            NodeType::Database,
            table(&[
                ("connector", members(PUBLIC_CONNECTOR)),
                ("data", data.clone()),
                ("differential_privacy", members(&["privacy_level"])),
            ]),
        ),
        (
            NodeType::Schema,
            table(&[
                ("data", data.clone()),
                ("differential_privacy", members(&["privacy_level"])),
            ]),
        ),
        (
            NodeType::Table,
            table(&[
                ("connector", members(PUBLIC_CONNECTOR)),
                ("data", members(&["description", "metadata_is_public", "name", "rows"])),
                (
                    "differential_privacy",
                    members(&["budget_delta", "budget_epsilon", "privacy_column", "privacy_level"]),
                ),
                (
                    "private_sql",
                    members(&[
                        "censor_dims",
                        "clamp_columns",
                        "clamp_counts",
                        "max_ids",
                        "row_privacy",
                        "sample_max_ids",
                        "tau",
                        "use_dpsu",
                    ]),
                ),
                ("private_synthesis", members(&["synth_allowed"])),
            ]),
        ),
        (
            NodeType::Column,
            table(&[
                (
                    "data",
                    members(&[
                        "data_type_name",
                        "description",
                        "discrete",
                        "metadata_is_public",
                        "name",
                        "selectable",
                    ]),
                ),
                ("machine_learning", members(&["is_feature", "is_target"])),
                (
                    "private_sql",
                    members(&[
                        "allowed_values",
                        "auto_bounds_prob",
                        "auto_lower",
                        "auto_upper",
                        "mask",
                        "private_id",
                        "use_auto_bounds",
                    ]),
                ),
                (
                    "private_sql_and_synthesis",
                    members(&["bounded", "cardinality", "lower", "upper"]),
                ),
                (
                    "private_synthesis",
                    members(&["discrete", "min_step", "synthesizable"]),
                ),
            ]),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::Attribute;
    use crate::node::Node;

    fn group(key: &str, members: Vec<Attribute>) -> Attribute {
        Attribute::group(key, members).unwrap()
    }

    fn table_node() -> Node {
        let column = Node::new(
            NodeType::Column,
            vec![
                group(
                    "data",
                    vec![
                        Attribute::keyed("name", "age"),
                        Attribute::keyed("data_type_name", "int"),
                        Attribute::keyed("metadata_is_public", false),
                    ],
                ),
                group("machine_learning", vec![Attribute::keyed("is_target", true)]),
                group(
                    "private_sql_and_synthesis",
                    vec![
                        Attribute::keyed("lower", 0),
                        Attribute::keyed("upper", 120),
                    ],
                ),
            ],
            vec![],
            None,
        )
        .unwrap();
        Node::new(
            NodeType::Table,
            vec![
                group(
                    "connector",
                    vec![
                        Attribute::keyed("type_name", "postgresql"),
                        Attribute::keyed("host", "db"),
                        Attribute::keyed("username", "admin"),
                        Attribute::keyed("password", "secret"),
                    ],
                ),
                group(
                    "data",
                    vec![Attribute::keyed("name", "people"), Attribute::keyed("rows", 10)],
                ),
            ],
            vec![column],
            None,
        )
        .unwrap()
    }

    #[test]
    fn view_names_parse() {
        for view in View::ALL {
            assert_eq!(view.as_str().parse::<View>().unwrap(), view);
        }
        assert!("sales".parse::<View>().is_err());
    }

    #[test]
    fn ml_view_keeps_feature_flags_and_drops_bounds() {
        let filtered = View::MachineLearning.filter().apply(&table_node()).unwrap();
        assert!(filtered.attribute_path("data.rows").is_none());
        assert!(filtered.attribute("connector").is_none());

        let age = filtered.child(NodeType::Column, "age").unwrap();
        assert!(age.attribute_path("machine_learning.is_target").is_some());
        assert!(age.attribute("private_sql_and_synthesis").is_none());
        assert!(age.attribute_path("data.metadata_is_public").is_none());
    }

    #[test]
    fn sql_view_keeps_bounds_and_drops_feature_flags() {
        let filtered = View::SmartNoise.filter().apply(&table_node()).unwrap();
        assert!(filtered.attribute("connector").is_none());
        assert_eq!(
            filtered.attribute_path("data.rows").and_then(|a| a.value().as_int()),
            Some(10)
        );

        let age = filtered.child(NodeType::Column, "age").unwrap();
        assert!(age.attribute("machine_learning").is_none());
        assert_eq!(
            age.attribute_path("private_sql_and_synthesis.upper")
                .and_then(|a| a.value().as_int()),
            Some(120)
        );
    }

    #[test]
    fn regular_view_drops_credentials() {
        let filtered = View::Regular.filter().apply(&table_node()).unwrap();
        assert!(filtered.attribute_path("connector.type_name").is_some());
        assert!(filtered.attribute_path("connector.password").is_none());
        assert!(filtered.attribute_path("connector.username").is_none());
        assert!(filtered.attribute_path("connector.host").is_some());

        let age = filtered.child(NodeType::Column, "age").unwrap();
        assert!(age.attribute_path("machine_learning.is_target").is_some());
        assert!(age.attribute_path("private_sql_and_synthesis.lower").is_some());
    }
}
