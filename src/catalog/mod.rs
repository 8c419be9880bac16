//! Immutable catalog of named tweaks.
//!
//! Each tweak is a stable id plus an ordered list of desired mutations
//! (and optionally service run-state changes and a power plan). The
//! catalog is pure data: it is validated once at construction and never
//! changes at runtime.

mod builtin;

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::control::ServiceRunState;
use crate::error::{AggregateError, Result, TweakError};
use crate::store::{ConfigStore, ConfigValue, Coordinate};

/// Subsystem a tweak belongs to. Each category owns its own snapshot slot.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Gaming,
    Network,
    Privacy,
    Power,
}

impl Category {
    /// All categories, in display order.
    pub const ALL: [Self; 4] = [Self::Gaming, Self::Network, Self::Privacy, Self::Power];

    /// Snapshot slot name for this category.
    #[must_use]
    pub const fn slot(&self) -> &'static str {
        match self {
            Self::Gaming => "gaming",
            Self::Network => "network",
            Self::Privacy => "privacy",
            Self::Power => "power",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slot())
    }
}

impl FromStr for Category {
    type Err = TweakError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "gaming" => Ok(Self::Gaming),
            "network" => Ok(Self::Network),
            "privacy" => Ok(Self::Privacy),
            "power" => Ok(Self::Power),
            other => Err(TweakError::Other(format!("unknown category: {other}"))),
        }
    }
}

/// One desired store mutation.
#[derive(Debug, Clone)]
pub struct Mutation {
    /// Target path, or the parent path when `fan_out` is set.
    pub path: String,
    /// Value name.
    pub name: String,
    /// Desired value.
    pub value: ConfigValue,
    /// Expand to every child of `path` at apply time.
    pub fan_out: bool,
}

impl Mutation {
    pub fn set(path: impl Into<String>, name: impl Into<String>, value: ConfigValue) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            value,
            fan_out: false,
        }
    }

    /// A mutation applied under every child of `parent` (e.g. one setting
    /// per network adapter).
    pub fn for_each_child(
        parent: impl Into<String>,
        name: impl Into<String>,
        value: ConfigValue,
    ) -> Self {
        Self {
            path: parent.into(),
            name: name.into(),
            value,
            fan_out: true,
        }
    }
}

/// A desired service run-state change.
#[derive(Debug, Clone)]
pub struct ServiceChange {
    pub service: String,
    pub desired: ServiceRunState,
}

/// A mutation resolved to a concrete coordinate.
#[derive(Debug, Clone)]
pub struct ResolvedMutation {
    pub coordinate: Coordinate,
    pub value: ConfigValue,
}

/// A named, catalog-defined set of configuration mutations.
#[derive(Debug, Clone)]
pub struct TweakDefinition {
    /// Globally unique, stable identifier.
    pub id: String,
    pub display_name: String,
    pub description: String,
    pub category: Category,
    /// Ordered list of desired mutations.
    pub mutations: Vec<Mutation>,
    /// Service run-state changes issued after the store mutations.
    pub service_changes: Vec<ServiceChange>,
    /// Power scheme to activate, if any.
    pub power_plan: Option<String>,
}

impl TweakDefinition {
    /// Expand this tweak's mutations to concrete coordinates.
    ///
    /// Fan-out mutations enumerate the children of their parent path; an
    /// enumeration failure fails that mutation only and is recorded in
    /// `failures`, leaving the rest of the tweak intact.
    pub fn resolve_mutations(
        &self,
        store: &dyn ConfigStore,
        failures: &mut AggregateError,
    ) -> Vec<ResolvedMutation> {
        let mut resolved = Vec::new();
        for mutation in &self.mutations {
            if mutation.fan_out {
                match store.enumerate_children(&mutation.path) {
                    Ok(children) => {
                        for child in children {
                            resolved.push(ResolvedMutation {
                                coordinate: Coordinate::new(
                                    format!("{}\\{child}", mutation.path),
                                    mutation.name.clone(),
                                ),
                                value: mutation.value.clone(),
                            });
                        }
                    }
                    Err(e) => {
                        warn!(path = %mutation.path, error = %e, "Fan-out enumeration failed");
                        failures.push(format!("{}\\*\\{}", mutation.path, mutation.name), e);
                    }
                }
            } else {
                resolved.push(ResolvedMutation {
                    coordinate: Coordinate::new(mutation.path.clone(), mutation.name.clone()),
                    value: mutation.value.clone(),
                });
            }
        }
        resolved
    }
}

/// Immutable, in-memory registry of tweaks keyed by id.
pub struct TweakCatalog {
    tweaks: BTreeMap<String, TweakDefinition>,
}

impl TweakCatalog {
    /// Build a catalog, rejecting duplicate ids.
    pub fn new(definitions: Vec<TweakDefinition>) -> Result<Self> {
        let mut tweaks = BTreeMap::new();
        for def in definitions {
            if tweaks.contains_key(&def.id) {
                return Err(TweakError::DuplicateTweak { id: def.id });
            }
            tweaks.insert(def.id.clone(), def);
        }
        Ok(Self { tweaks })
    }

    /// The built-in catalog.
    ///
    /// # Panics
    ///
    /// Panics if the built-in data contains duplicate ids; that is a bug
    /// caught by tests, never a runtime condition.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(builtin::definitions()).expect("builtin catalog has duplicate ids")
    }

    /// Look up a tweak by id.
    pub fn get(&self, id: &str) -> Result<&TweakDefinition> {
        self.tweaks
            .get(id)
            .ok_or_else(|| TweakError::UnknownTweak { id: id.to_string() })
    }

    /// Iterate all tweaks in id order.
    pub fn iter(&self) -> impl Iterator<Item = &TweakDefinition> {
        self.tweaks.values()
    }

    /// Tweaks belonging to one category, in id order.
    #[must_use]
    pub fn by_category(&self, category: Category) -> Vec<&TweakDefinition> {
        self.tweaks
            .values()
            .filter(|t| t.category == category)
            .collect()
    }

    /// Number of tweaks in the catalog.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tweaks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tweaks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::mock::MockStore;

    fn minimal(id: &str) -> TweakDefinition {
        TweakDefinition {
            id: id.to_string(),
            display_name: id.to_string(),
            description: String::new(),
            category: Category::Gaming,
            mutations: vec![Mutation::set("HKLM\\A", "x", ConfigValue::Int32(1))],
            service_changes: Vec::new(),
            power_plan: None,
        }
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let result = TweakCatalog::new(vec![minimal("a"), minimal("a")]);
        assert!(matches!(result, Err(TweakError::DuplicateTweak { .. })));
    }

    #[test]
    fn test_unknown_id() {
        let catalog = TweakCatalog::new(vec![minimal("a")]).unwrap();
        assert!(matches!(
            catalog.get("nope"),
            Err(TweakError::UnknownTweak { .. })
        ));
    }

    #[test]
    fn test_builtin_catalog_is_valid() {
        let catalog = TweakCatalog::builtin();
        assert!(!catalog.is_empty());

        // Every category has at least one tweak.
        for category in Category::ALL {
            assert!(
                !catalog.by_category(category).is_empty(),
                "category {category} has no tweaks"
            );
        }
    }

    #[test]
    fn test_resolve_plain_mutation() {
        let store = MockStore::new();
        let def = minimal("a");
        let mut failures = AggregateError::new();

        let resolved = def.resolve_mutations(&store, &mut failures);
        assert!(failures.is_empty());
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].coordinate.key(), "HKLM\\A\\x");
    }

    #[test]
    fn test_resolve_fan_out() {
        let store = MockStore::new();
        store.seed("HKLM\\Adapters\\eth0", "Existing", ConfigValue::Int32(0));
        store.seed("HKLM\\Adapters\\wlan0", "Existing", ConfigValue::Int32(0));

        let def = TweakDefinition {
            mutations: vec![Mutation::for_each_child(
                "HKLM\\Adapters",
                "Latency",
                ConfigValue::Int32(1),
            )],
            ..minimal("fan")
        };
        let mut failures = AggregateError::new();
        let resolved = def.resolve_mutations(&store, &mut failures);

        assert!(failures.is_empty());
        let keys: Vec<String> = resolved.iter().map(|m| m.coordinate.key()).collect();
        assert_eq!(
            keys,
            vec![
                "HKLM\\Adapters\\eth0\\Latency".to_string(),
                "HKLM\\Adapters\\wlan0\\Latency".to_string(),
            ]
        );
    }

    #[test]
    fn test_resolve_fan_out_enumeration_failure_is_isolated() {
        let store = MockStore::new();
        store.deny_prefix("HKLM\\Adapters");

        let def = TweakDefinition {
            mutations: vec![
                Mutation::for_each_child("HKLM\\Adapters", "Latency", ConfigValue::Int32(1)),
                Mutation::set("HKLM\\Other", "x", ConfigValue::Int32(1)),
            ],
            ..minimal("fan")
        };
        let mut failures = AggregateError::new();
        let resolved = def.resolve_mutations(&store, &mut failures);

        // The plain mutation still resolves; the fan-out failure is recorded.
        assert_eq!(resolved.len(), 1);
        assert_eq!(failures.len(), 1);
    }

    #[test]
    fn test_category_parse() {
        assert_eq!("gaming".parse::<Category>().unwrap(), Category::Gaming);
        assert_eq!("PRIVACY".parse::<Category>().unwrap(), Category::Privacy);
        assert!("bogus".parse::<Category>().is_err());
    }
}
