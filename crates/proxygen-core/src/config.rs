//! Generator configuration.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Representation type → record store getter used by primitive accessors.
    pub primitive_getters: IndexMap<String, String>,
    /// Names reserved by the record store on top of the built-in set.
    pub reserved_names: Vec<String>,
    pub primary_key_field: String,
    pub unresolved_relations_fatal: bool,
    pub enum_helper_prefix: String,
    pub receiver_name: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        let primitive_getters = [
            ("bool", "GetBool"),
            ("int", "GetInt"),
            ("float64", "GetFloat"),
            ("string", "GetString"),
            ("types.DateTime", "GetDateTime"),
            ("[]string", "GetStringSlice"),
        ]
        .into_iter()
        .map(|(ty, getter)| (ty.to_string(), getter.to_string()))
        .collect();

        Self {
            primitive_getters,
            reserved_names: Vec::new(),
            primary_key_field: "Id".to_string(),
            unresolved_relations_fatal: false,
            enum_helper_prefix: "zz".to_string(),
            receiver_name: "p".to_string(),
        }
    }
}

impl GeneratorConfig {
    pub fn from_yaml_str(source: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(source)
    }

    pub fn from_json_str(source: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(source)
    }

    /// Getter for a primitive representation type, `None` when the record
    /// store has no native getter for it.
    pub fn getter_for(&self, representation: &str) -> Option<&str> {
        self.primitive_getters
            .get(representation)
            .map(String::as_str)
    }

    pub fn name_map(&self, enum_name: &str) -> String {
        format!("{}{}SelectNameMap", self.enum_helper_prefix, enum_name)
    }

    pub fn iota_map(&self, enum_name: &str) -> String {
        format!("{}{}SelectIotaMap", self.enum_helper_prefix, enum_name)
    }

    pub fn slice_helper(&self, enum_name: &str) -> String {
        format!("{}{}SliceOf", self.enum_helper_prefix, enum_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_getters() {
        let config = GeneratorConfig::default();
        assert_eq!(config.getter_for("string"), Some("GetString"));
        assert_eq!(config.getter_for("[]string"), Some("GetStringSlice"));
        assert_eq!(config.getter_for("[]int"), None);
        assert_eq!(config.primary_key_field, "Id");
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = GeneratorConfig::from_yaml_str(
            "reserved_names: [Archive]\nunresolved_relations_fatal: true\n",
        )
        .unwrap();
        assert_eq!(config.reserved_names, vec!["Archive"]);
        assert!(config.unresolved_relations_fatal);
        assert_eq!(config.receiver_name, "p");
        assert_eq!(config.getter_for("bool"), Some("GetBool"));
    }

    #[test]
    fn test_helper_names() {
        let config = GeneratorConfig::default();
        assert_eq!(config.name_map("Status"), "zzStatusSelectNameMap");
        assert_eq!(config.iota_map("Status"), "zzStatusSelectIotaMap");
        assert_eq!(config.slice_helper("Status"), "zzStatusSliceOf");
    }
}
