use crate::schema::EnumSpec;
use convert_case::{Case, Casing};
use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

/// One enumeration type: its options in declaration order and both lookup
/// directions between labels and ordinals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumEntry {
    pub name: String,
    /// `(ordinal, label)` pairs, ordinals counting from 0.
    pub options: Vec<(i64, String)>,
    pub const_names: Vec<String>,
    label_to_ordinal: IndexMap<String, i64>,
    ordinal_to_label: IndexMap<i64, String>,
}

impl EnumEntry {
    pub fn new(name: impl Into<String>, labels: &[String], const_names: Vec<String>) -> Self {
        let options: Vec<(i64, String)> = labels
            .iter()
            .enumerate()
            .map(|(ordinal, label)| (ordinal as i64, label.clone()))
            .collect();
        let label_to_ordinal = options
            .iter()
            .map(|(ordinal, label)| (label.clone(), *ordinal))
            .collect();
        let ordinal_to_label = options
            .iter()
            .map(|(ordinal, label)| (*ordinal, label.clone()))
            .collect();
        Self {
            name: name.into(),
            options,
            const_names,
            label_to_ordinal,
            ordinal_to_label,
        }
    }

    pub fn ordinal_of(&self, label: &str) -> Option<i64> {
        self.label_to_ordinal.get(label).copied()
    }

    pub fn label_of(&self, ordinal: i64) -> Option<&str> {
        self.ordinal_to_label.get(&ordinal).map(String::as_str)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.options.iter().map(|(_, label)| label.as_str())
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    fn same_options(&self, labels: &[String], const_names: &[String]) -> bool {
        self.labels().eq(labels.iter().map(String::as_str)) && self.const_names == const_names
    }
}

/// Outcome of registering a field's enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    New(String),
    /// An identical entry already existed and is reused.
    Shared(String),
    /// The requested name was taken by a different entry or type.
    Renamed { requested: String, assigned: String },
}

impl Registration {
    pub fn name(&self) -> &str {
        match self {
            Registration::New(name)
            | Registration::Shared(name)
            | Registration::Renamed { assigned: name, .. } => name,
        }
    }
}

/// Every enumeration of a session, in first-declaration order.
///
/// Type names and option constant names share one namespace with the entity
/// names reserved up front; clashes are resolved with numeric suffixes
/// starting at 2.
#[derive(Debug, Clone, Default)]
pub struct EnumTable {
    entries: IndexMap<String, EnumEntry>,
    owners: FxHashMap<(String, String), String>,
    taken: FxHashSet<String>,
    renamed_consts: Vec<(String, String)>,
}

impl EnumTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a package-level name (an entity type) as unavailable.
    pub fn reserve_name(&mut self, name: &str) {
        self.taken.insert(name.to_string());
    }

    /// Registers the enumeration of `entity.field`. Registering the same
    /// field again returns the entry it already owns.
    pub fn register(&mut self, entity: &str, field: &str, spec: &EnumSpec) -> Registration {
        let owner = (entity.to_string(), field.to_string());
        if let Some(name) = self.owners.get(&owner) {
            return Registration::Shared(name.clone());
        }

        let const_names = spec.const_names.clone().unwrap_or_else(|| {
            spec.labels
                .iter()
                .map(|label| label.to_case(Case::UpperCamel))
                .collect()
        });

        let requested = spec.type_name.clone();
        let mut candidate = requested.clone();
        let mut suffix = 2;
        let registration = loop {
            if let Some(existing) = self.entries.get(&candidate) {
                if existing.same_options(&spec.labels, &const_names) {
                    break Registration::Shared(candidate);
                }
            } else if !self.taken.contains(&candidate) {
                break if candidate == requested {
                    Registration::New(candidate)
                } else {
                    Registration::Renamed {
                        requested: requested.clone(),
                        assigned: candidate,
                    }
                };
            }
            candidate = format!("{}{}", requested, suffix);
            suffix += 1;
        };

        if !matches!(registration, Registration::Shared(_)) {
            let name = registration.name().to_string();
            if let Registration::Renamed { assigned, .. } = &registration {
                tracing::warn!(
                    "enumeration `{}` of {}.{} clashes with an existing name, renamed to `{}`",
                    requested,
                    entity,
                    field,
                    assigned
                );
            }
            self.taken.insert(name.clone());
            let const_names = self.unique_const_names(const_names);
            self.entries
                .insert(name.clone(), EnumEntry::new(name, &spec.labels, const_names));
        }

        self.owners.insert(owner, registration.name().to_string());
        registration
    }

    fn unique_const_names(&mut self, names: Vec<String>) -> Vec<String> {
        names
            .into_iter()
            .map(|name| {
                let mut candidate = name.clone();
                let mut suffix = 2;
                while self.taken.contains(&candidate) {
                    candidate = format!("{}{}", name, suffix);
                    suffix += 1;
                }
                if candidate != name {
                    tracing::warn!(
                        "enumeration constant `{}` is already declared, renamed to `{}`",
                        name,
                        candidate
                    );
                    self.renamed_consts.push((name, candidate.clone()));
                }
                self.taken.insert(candidate.clone());
                candidate
            })
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&EnumEntry> {
        self.entries.get(name)
    }

    pub fn entry_for(&self, entity: &str, field: &str) -> Option<&EnumEntry> {
        self.owners
            .get(&(entity.to_string(), field.to_string()))
            .and_then(|name| self.entries.get(name))
    }

    pub fn entries(&self) -> impl Iterator<Item = &EnumEntry> {
        self.entries.values()
    }

    /// `(declared, assigned)` pairs of option constants that were renamed.
    pub fn renamed_consts(&self) -> &[(String, String)] {
        &self.renamed_consts
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn spec(name: &str, labels: &[&str]) -> EnumSpec {
        EnumSpec {
            type_name: name.to_string(),
            labels: labels.iter().map(|l| l.to_string()).collect(),
            const_names: None,
        }
    }

    #[test]
    fn test_identical_options_share_entry() {
        let mut table = EnumTable::new();
        let first = table.register("Order", "status", &spec("Status", &["new", "paid"]));
        let second = table.register("Invoice", "status", &spec("Status", &["new", "paid"]));
        assert_eq!(first, Registration::New("Status".into()));
        assert_eq!(second, Registration::Shared("Status".into()));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_different_options_are_renamed() {
        let mut table = EnumTable::new();
        table.register("Order", "status", &spec("Status", &["new", "paid"]));
        let renamed = table.register("Ticket", "status", &spec("Status", &["open", "closed"]));
        assert_eq!(
            renamed,
            Registration::Renamed {
                requested: "Status".into(),
                assigned: "Status2".into()
            }
        );
        let third = table.register("Issue", "state", &spec("Status", &["open", "closed"]));
        assert_eq!(third, Registration::Shared("Status2".into()));
        assert_eq!(table.entry_for("Issue", "state").unwrap().name, "Status2");
    }

    #[test]
    fn test_entity_names_are_reserved() {
        let mut table = EnumTable::new();
        table.reserve_name("Status");
        let registration = table.register("Order", "status", &spec("Status", &["new"]));
        assert_eq!(registration.name(), "Status2");
    }

    #[test]
    fn test_reregistering_a_field_is_idempotent() {
        let mut table = EnumTable::new();
        let first = table.register("Order", "status", &spec("Status", &["new"]));
        let again = table.register("Order", "status", &spec("Status", &["new"]));
        assert_eq!(first.name(), again.name());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_const_names_are_unique() {
        let mut table = EnumTable::new();
        table.register("Order", "status", &spec("Status", &["new", "paid"]));
        table.register("Ticket", "state", &spec("State", &["new", "closed"]));
        let state = table.get("State").unwrap();
        assert_eq!(state.const_names, vec!["New2", "Closed"]);
        assert_eq!(
            table.renamed_consts(),
            &[("New".to_string(), "New2".to_string())]
        );
    }

    proptest! {
        #[test]
        fn prop_label_ordinal_bijection(labels in prop::collection::btree_set("[a-z]{1,8}", 1..12)) {
            let labels: Vec<String> = labels.into_iter().collect();
            let entry = EnumEntry::new("Kind", &labels, labels.clone());
            for (ordinal, label) in &entry.options {
                prop_assert_eq!(entry.ordinal_of(label), Some(*ordinal));
                prop_assert_eq!(entry.label_of(*ordinal), Some(label.as_str()));
            }
            for label in &labels {
                let ordinal = entry.ordinal_of(label).unwrap();
                prop_assert_eq!(entry.label_of(ordinal), Some(label.as_str()));
            }
            prop_assert_eq!(entry.label_of(labels.len() as i64), None);
        }
    }
}
