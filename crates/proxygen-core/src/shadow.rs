//! Checks that nothing generated for an entity hides a record store member
//! or another generated member.

use crate::ast::{FuncDecl, Span};
use crate::classifier::{AccessPolicy, EntityFields};
use crate::config::GeneratorConfig;
use crate::errors::{NameCollision, NameCollisionError, NameOrigin};
use indexmap::IndexMap;
use rustc_hash::FxHashSet;

/// Name of the generated collection-name getter.
pub const COLLECTION_GETTER: &str = "CollectionName";

/// Methods and fields every wrapper inherits from the embedded record proxy.
pub const RECORD_STORE_MEMBERS: &[&str] = &[
    // Record
    "Id", "Collection", "Original", "Fresh", "Clone", "Expand", "SetExpand", "MergeExpand",
    "FieldsData", "CustomData", "WithCustomData", "IgnoreEmailVisibility",
    "IgnoreUnchangedFields",
    // Field access
    "Get", "GetRaw", "Set", "SetRaw", "SetIfFieldExists", "GetBool", "GetString", "GetInt",
    "GetFloat", "GetDateTime", "GetGeoPoint", "GetStringSlice", "GetUnsavedFiles",
    "ExpandedOne", "ExpandedAll", "FindFileFieldByFile",
    // Serialization
    "Load", "Hide", "Unhide", "PublicExport", "MarshalJSON", "UnmarshalJSON",
    "ReplaceModifiers",
    // Auth records
    "Email", "SetEmail", "Verified", "SetVerified", "EmailVisibility", "SetEmailVisibility",
    "ValidatePassword", "SetPassword", "SetRandomPassword", "TokenKey", "SetTokenKey",
    "RefreshTokenKey", "NewStaticAuthToken", "NewAuthToken", "NewVerificationToken",
    "NewPasswordResetToken", "NewEmailChangeToken", "NewFileToken",
    // Model and proxy plumbing
    "TableName", "PostScan", "PK", "LastSavedPK", "IsNew", "MarkAsNew", "MarkAsNotNew",
    "Record", "SetProxyRecord", "ProxyRecord",
];

/// Every name one entity's wrapper will declare, with where it comes from.
#[derive(Debug, Clone)]
pub struct EntityNamespace {
    pub entity: String,
    pub members: Vec<(String, NameOrigin, Span)>,
}

impl EntityNamespace {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            members: Vec::new(),
        }
    }

    pub fn add(&mut self, name: impl Into<String>, origin: NameOrigin, span: Span) -> &mut Self {
        self.members.push((name.into(), origin, span));
        self
    }

    /// Accessors and mutators of proxied fields, the collection getter when
    /// the entity names its collection, and the user methods on the wrapper.
    pub fn for_entity(fields: &EntityFields<'_>, methods: &[&FuncDecl<'_>]) -> Self {
        let entity = fields.entity;
        let mut namespace = Self::new(entity.name.clone());
        for info in fields.fields.values() {
            if info.policy != AccessPolicy::Proxied {
                continue;
            }
            let field = info.field.name.clone();
            namespace.add(
                info.accessor.clone(),
                NameOrigin::Accessor {
                    field: field.clone(),
                },
                info.field.span,
            );
            namespace.add(info.mutator.clone(), NameOrigin::Mutator { field }, info.field.span);
        }
        if entity.collection_name.is_some() {
            namespace.add(COLLECTION_GETTER, NameOrigin::CollectionGetter, entity.span);
        }
        for method in methods {
            if method.receiver_entity() == Some(entity.name.as_str()) {
                namespace.add(method.name, NameOrigin::UserMethod, method.span);
            }
        }
        namespace
    }
}

pub struct ShadowChecker {
    reserved: FxHashSet<String>,
}

impl ShadowChecker {
    pub fn new(config: &GeneratorConfig) -> Self {
        let reserved = RECORD_STORE_MEMBERS
            .iter()
            .map(|name| name.to_string())
            .chain(config.reserved_names.iter().cloned())
            .collect();
        Self { reserved }
    }

    pub fn is_reserved(&self, name: &str) -> bool {
        self.reserved.contains(name)
    }

    /// Collisions inside one entity, in declaration order.
    pub fn check_entity(&self, namespace: &EntityNamespace) -> Vec<NameCollision> {
        let mut collisions = Vec::new();
        if self.is_reserved(&namespace.entity) {
            collisions.push(NameCollision::Reserved {
                entity: namespace.entity.clone(),
                name: namespace.entity.clone(),
                origin: NameOrigin::WrapperType,
                span: namespace
                    .members
                    .first()
                    .map(|(_, _, span)| *span)
                    .unwrap_or_default(),
            });
        }

        let mut seen: IndexMap<&str, &NameOrigin> = IndexMap::new();
        for (name, origin, span) in &namespace.members {
            if self.is_reserved(name) {
                collisions.push(NameCollision::Reserved {
                    entity: namespace.entity.clone(),
                    name: name.clone(),
                    origin: origin.clone(),
                    span: *span,
                });
            }
            match seen.get(name.as_str()) {
                Some(first) => collisions.push(NameCollision::Duplicate {
                    entity: namespace.entity.clone(),
                    name: name.clone(),
                    first: (*first).clone(),
                    second: origin.clone(),
                    span: *span,
                }),
                None => {
                    seen.insert(name, origin);
                }
            }
        }
        collisions
    }

    /// Checks every entity and fails with all collisions at once.
    pub fn check(&self, namespaces: &[EntityNamespace]) -> Result<(), NameCollisionError> {
        let collisions: Vec<_> = namespaces
            .iter()
            .flat_map(|namespace| self.check_entity(namespace))
            .collect();
        if collisions.is_empty() {
            return Ok(());
        }
        tracing::warn!(count = collisions.len(), "generated names collide");
        Err(NameCollisionError { collisions })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accessor(field: &str) -> NameOrigin {
        NameOrigin::Accessor {
            field: field.into(),
        }
    }

    #[test]
    fn test_clean_namespace_passes() {
        let checker = ShadowChecker::new(&GeneratorConfig::default());
        let mut namespace = EntityNamespace::new("Order");
        namespace
            .add("Total", accessor("total"), Span::dummy())
            .add("SetTotal", NameOrigin::Mutator { field: "total".into() }, Span::dummy());
        assert!(checker.check(&[namespace]).is_ok());
    }

    #[test]
    fn test_reserved_and_duplicate_names_are_all_reported() {
        let checker = ShadowChecker::new(&GeneratorConfig::default());
        let mut namespace = EntityNamespace::new("Order");
        namespace
            .add("Expand", accessor("expand"), Span::new(3, 1))
            .add("Total", accessor("total"), Span::new(4, 1))
            .add("Total", NameOrigin::UserMethod, Span::new(10, 1));

        let error = checker.check(&[namespace]).unwrap_err();
        assert_eq!(error.collisions.len(), 2);
        assert!(matches!(
            &error.collisions[0],
            NameCollision::Reserved { name, .. } if name == "Expand"
        ));
        assert!(matches!(
            &error.collisions[1],
            NameCollision::Duplicate { second: NameOrigin::UserMethod, span, .. } if *span == Span::new(10, 1)
        ));
    }

    #[test]
    fn test_configured_reserved_names() {
        let config = GeneratorConfig {
            reserved_names: vec!["Touch".into()],
            ..GeneratorConfig::default()
        };
        let checker = ShadowChecker::new(&config);
        assert!(checker.is_reserved("Touch"));
        assert!(checker.is_reserved("GetString"));
        assert!(!checker.is_reserved("Total"));
    }

    #[test]
    fn test_wrapper_type_name_is_checked() {
        let checker = ShadowChecker::new(&GeneratorConfig::default());
        let collisions = checker.check_entity(&EntityNamespace::new("Record"));
        assert!(matches!(
            &collisions[..],
            [NameCollision::Reserved { origin: NameOrigin::WrapperType, .. }]
        ));
    }
}
