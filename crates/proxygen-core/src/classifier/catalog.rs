use super::enum_table::EnumTable;
use super::{classify, Classification, Multiplicity};
use crate::ast::TypeExpr;
use crate::config::GeneratorConfig;
use crate::errors::ClassificationError;
use crate::naming;
use crate::schema::{Entity, Field, Schema};
use bumpalo::Bump;
use indexmap::IndexMap;
use rustc_hash::FxHashSet;

/// How method bodies may touch a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessPolicy {
    /// Reads and writes go through the generated accessor and mutator.
    Proxied,
    /// Managed by the record store (or the primary key); left as written.
    Direct,
    /// Classification failed, so there is nothing to call.
    Unavailable,
}

#[derive(Debug, Clone)]
pub struct FieldInfo<'a> {
    pub entity: &'a Entity,
    pub field: &'a Field,
    /// `None` when the declared type does not parse.
    pub declared_type: Option<&'a TypeExpr<'a>>,
    pub classification: Option<Classification>,
    pub policy: AccessPolicy,
    pub accessor: String,
    pub mutator: String,
}

impl<'a> FieldInfo<'a> {
    pub fn name(&self) -> &'a str {
        &self.field.name
    }

    pub fn key(&self) -> &'a str {
        self.field.key()
    }

    pub fn enum_name(&self) -> Option<&str> {
        self.classification.as_ref().and_then(Classification::enum_name)
    }

    pub fn is_multi(&self) -> bool {
        self.classification
            .as_ref()
            .is_some_and(|class| class.multiplicity() == Multiplicity::Multi)
    }
}

#[derive(Debug, Clone)]
pub struct EntityFields<'a> {
    pub entity: &'a Entity,
    pub fields: IndexMap<&'a str, FieldInfo<'a>>,
}

/// Classified fields of every entity, in schema order.
#[derive(Debug, Clone, Default)]
pub struct FieldCatalog<'a> {
    entities: IndexMap<&'a str, EntityFields<'a>>,
}

impl<'a> FieldCatalog<'a> {
    /// Classifies the whole schema. Every error is collected; fields that
    /// fail are kept with `AccessPolicy::Unavailable`.
    pub fn build(
        schema: &'a Schema,
        config: &GeneratorConfig,
        arena: &'a Bump,
        enums: &mut EnumTable,
    ) -> (Self, Vec<ClassificationError>) {
        let mut errors = Vec::new();
        let mut entities = IndexMap::new();

        for entity in &schema.entities {
            enums.reserve_name(&entity.name);
        }

        let mut seen = FxHashSet::default();
        for entity in &schema.entities {
            if !seen.insert(entity.name.as_str()) {
                errors.push(ClassificationError::DuplicateEntity {
                    entity: entity.name.clone(),
                    span: entity.span,
                });
                continue;
            }

            let mut fields = IndexMap::new();
            for field in &entity.fields {
                if fields.contains_key(field.name.as_str()) {
                    errors.push(ClassificationError::DuplicateField {
                        entity: entity.name.clone(),
                        field: field.name.clone(),
                        span: field.span,
                    });
                    continue;
                }

                let info = Self::classify_field(entity, field, schema, config, arena, enums)
                    .unwrap_or_else(|(info, err)| {
                        tracing::warn!("skipping accessors of {}.{}: {}", entity.name, field.name, err);
                        errors.push(err);
                        info
                    });
                tracing::debug!(
                    entity = %entity.name,
                    field = %field.name,
                    policy = ?info.policy,
                    classification = ?info.classification,
                    "classified field"
                );
                fields.insert(field.name.as_str(), info);
            }

            entities.insert(entity.name.as_str(), EntityFields { entity, fields });
        }

        (Self { entities }, errors)
    }

    #[allow(clippy::result_large_err)]
    fn classify_field(
        entity: &'a Entity,
        field: &'a Field,
        schema: &'a Schema,
        config: &GeneratorConfig,
        arena: &'a Bump,
        enums: &mut EnumTable,
    ) -> Result<FieldInfo<'a>, (FieldInfo<'a>, ClassificationError)> {
        let mut info = FieldInfo {
            entity,
            field,
            declared_type: TypeExpr::parse(&field.type_expr, arena).ok(),
            classification: None,
            policy: AccessPolicy::Direct,
            accessor: naming::accessor_name(&field.name),
            mutator: naming::mutator_name(&field.name),
        };

        let exempt = field.name == config.primary_key_field || (field.excluded && !field.is_renamed());
        if exempt {
            return Ok(info);
        }

        match (classify(entity, field, schema, config), &field.enumeration) {
            (Ok(Classification::Enumeration { multiplicity, .. }), Some(spec)) => {
                let registration = enums.register(&entity.name, &field.name, spec);
                info.classification = Some(Classification::Enumeration {
                    multiplicity,
                    enum_name: registration.name().to_string(),
                });
                info.policy = AccessPolicy::Proxied;
                Ok(info)
            }
            (Ok(classification), _) => {
                info.classification = Some(classification);
                info.policy = AccessPolicy::Proxied;
                Ok(info)
            }
            (Err(err), _) => {
                info.policy = AccessPolicy::Unavailable;
                Err((info, err))
            }
        }
    }

    pub fn entity(&self, name: &str) -> Option<&EntityFields<'a>> {
        self.entities.get(name)
    }

    pub fn contains_entity(&self, name: &str) -> bool {
        self.entities.contains_key(name)
    }

    pub fn field(&self, entity: &str, field: &str) -> Option<&FieldInfo<'a>> {
        self.entities
            .get(entity)
            .and_then(|fields| fields.fields.get(field))
    }

    pub fn entities(&self) -> impl Iterator<Item = &EntityFields<'a>> {
        self.entities.values()
    }

    /// Entities directly reachable from `entity` through relation fields.
    pub fn relation_targets<'c>(&'c self, entity: &str) -> impl Iterator<Item = &'c str> + 'c {
        self.entities
            .get(entity)
            .into_iter()
            .flat_map(|fields| fields.fields.values())
            .filter_map(|info| info.classification.as_ref()?.relation_target())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema::new(vec![
            Entity::new("Order")
                .with_field(Field::new("Id", "string"))
                .with_field(Field::new("created", "types.DateTime").excluded())
                .with_field(Field::new("mail", "string").with_backing_key("email").excluded())
                .with_field(Field::new("vendor", "*Vendor"))
                .with_field(Field::new("customer", "*Customer"))
                .with_field(Field::enumerated("status", "Status", &["new", "paid"], false)),
            Entity::new("Customer").with_field(Field::new("name", "string")),
        ])
    }

    #[test]
    fn test_policies() {
        let schema = schema();
        let arena = Bump::new();
        let mut enums = EnumTable::new();
        let (catalog, errors) =
            FieldCatalog::build(&schema, &GeneratorConfig::default(), &arena, &mut enums);

        let policy = |field: &str| catalog.field("Order", field).unwrap().policy;
        assert_eq!(policy("Id"), AccessPolicy::Direct);
        assert_eq!(policy("created"), AccessPolicy::Direct);
        assert_eq!(policy("mail"), AccessPolicy::Proxied);
        assert_eq!(policy("vendor"), AccessPolicy::Unavailable);
        assert_eq!(policy("customer"), AccessPolicy::Proxied);

        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], ClassificationError::UnresolvedRelation { .. }));
        assert_eq!(catalog.relation_targets("Order").collect::<Vec<_>>(), vec!["Customer"]);
    }

    #[test]
    fn test_accessor_names() {
        let schema = Schema::new(vec![Entity::new("Order")
            .with_field(Field::new("intField2", "int"))
            .with_field(Field::new("shipping_address", "string"))]);
        let arena = Bump::new();
        let mut enums = EnumTable::new();
        let (catalog, _) =
            FieldCatalog::build(&schema, &GeneratorConfig::default(), &arena, &mut enums);

        let info = catalog.field("Order", "intField2").unwrap();
        assert_eq!(info.accessor, "IntField2");
        assert_eq!(info.mutator, "SetIntField2");
        let info = catalog.field("Order", "shipping_address").unwrap();
        assert_eq!(info.accessor, "ShippingAddress");
    }

    #[test]
    fn test_duplicates_are_reported() {
        let schema = Schema::new(vec![
            Entity::new("Order")
                .with_field(Field::new("total", "int"))
                .with_field(Field::new("total", "string")),
            Entity::new("Order"),
        ]);
        let arena = Bump::new();
        let mut enums = EnumTable::new();
        let (catalog, errors) =
            FieldCatalog::build(&schema, &GeneratorConfig::default(), &arena, &mut enums);

        assert_eq!(errors.len(), 2);
        assert!(matches!(errors[0], ClassificationError::DuplicateField { .. }));
        assert!(matches!(errors[1], ClassificationError::DuplicateEntity { .. }));
        assert_eq!(
            catalog.field("Order", "total").unwrap().declared_type,
            Some(&TypeExpr::Named("int"))
        );
    }
}
