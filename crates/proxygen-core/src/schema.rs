//! Declarative schema input: entities and their fields.

use crate::ast::Span;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub entities: Vec<Entity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    /// Name of the backing store collection; no collection-name getter is
    /// generated without one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_name: Option<String>,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backing_key: Option<String>,
    #[serde(rename = "type")]
    pub type_expr: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enumeration: Option<EnumSpec>,
    /// Managed by the record store itself.
    #[serde(default)]
    pub excluded: bool,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumSpec {
    pub type_name: String,
    pub labels: Vec<String>,
    /// Identifiers of the option constants, one per label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub const_names: Option<Vec<String>>,
}

impl Schema {
    pub fn new(entities: Vec<Entity>) -> Self {
        Self { entities }
    }

    pub fn from_json_str(source: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(source)
    }

    pub fn from_yaml_str(source: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(source)
    }

    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|entity| entity.name == name)
    }

    pub fn has_entity(&self, name: &str) -> bool {
        self.entity(name).is_some()
    }
}

impl Entity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            collection_name: None,
            fields: Vec::new(),
            span: Span::dummy(),
        }
    }

    pub fn with_collection(mut self, collection_name: impl Into<String>) -> Self {
        self.collection_name = Some(collection_name.into());
        self
    }

    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }
}

impl Field {
    pub fn new(name: impl Into<String>, type_expr: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            backing_key: None,
            type_expr: type_expr.into(),
            enumeration: None,
            excluded: false,
            span: Span::dummy(),
        }
    }

    /// An enumeration field whose representation is `int` (or `[]int` when
    /// `multi`).
    pub fn enumerated(
        name: impl Into<String>,
        type_name: impl Into<String>,
        labels: &[&str],
        multi: bool,
    ) -> Self {
        let mut field = Self::new(name, if multi { "[]int" } else { "int" });
        field.enumeration = Some(EnumSpec {
            type_name: type_name.into(),
            labels: labels.iter().map(|label| label.to_string()).collect(),
            const_names: None,
        });
        field
    }

    pub fn with_backing_key(mut self, key: impl Into<String>) -> Self {
        self.backing_key = Some(key.into());
        self
    }

    pub fn excluded(mut self) -> Self {
        self.excluded = true;
        self
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Key under which the record store keeps the value.
    pub fn key(&self) -> &str {
        self.backing_key.as_deref().unwrap_or(&self.name)
    }

    /// Renamed fields keep an accessor alias even when excluded.
    pub fn is_renamed(&self) -> bool {
        self.backing_key
            .as_deref()
            .is_some_and(|key| key != self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_from_json() {
        let schema = Schema::from_json_str(
            r#"{
                "entities": [
                    {
                        "name": "Order",
                        "collection_name": "orders",
                        "fields": [
                            { "name": "total", "type": "float64" },
                            { "name": "created", "type": "types.DateTime", "excluded": true },
                            {
                                "name": "status",
                                "type": "int",
                                "enumeration": { "type_name": "Status", "labels": ["new", "paid"] }
                            }
                        ]
                    }
                ]
            }"#,
        )
        .unwrap();

        let order = schema.entity("Order").unwrap();
        assert_eq!(order.collection_name.as_deref(), Some("orders"));
        assert_eq!(order.fields.len(), 3);
        assert!(order.field("created").unwrap().excluded);
        let status = order.field("status").unwrap();
        assert_eq!(status.enumeration.as_ref().unwrap().labels, vec!["new", "paid"]);
    }

    #[test]
    fn test_schema_from_yaml() {
        let schema = Schema::from_yaml_str(
            r#"
entities:
  - name: Customer
    fields:
      - name: mail
        type: string
        backing_key: email
        excluded: true
"#,
        )
        .unwrap();

        let mail = schema.entity("Customer").unwrap().field("mail").unwrap();
        assert_eq!(mail.key(), "email");
        assert!(mail.is_renamed());
        assert!(mail.excluded);
    }

    #[test]
    fn test_backing_key_defaults_to_name() {
        let field = Field::new("total", "float64");
        assert_eq!(field.key(), "total");
        assert!(!field.is_renamed());
        assert!(!field.clone().with_backing_key("total").is_renamed());
    }
}
