//! Accessor/mutator synthesis from classified fields.

pub mod enums;
mod templates;

pub use enums::enum_declarations;

use crate::ast::{AstBuilder, Declaration, FuncDecl, StructField, TypeDecl, TypeDeclKind};
use crate::classifier::{AccessPolicy, Classification, EnumEntry, FieldInfo, Multiplicity};
use crate::config::GeneratorConfig;
use crate::naming;
use crate::schema::Entity;
use bumpalo::Bump;
use templates::{FieldTemplate, TEMPLATE_LOCALS};

/// Embedded in every wrapper type; provides the record store methods.
pub const BASE_PROXY_TYPE: &str = "core.BaseRecordProxy";

#[derive(Debug, Clone, Copy)]
pub struct AccessorPair<'a> {
    pub accessor: &'a FuncDecl<'a>,
    pub mutator: &'a FuncDecl<'a>,
}

pub struct Synthesizer<'s, 'a> {
    builder: AstBuilder<'a>,
    config: &'s GeneratorConfig,
}

impl<'s, 'a> Synthesizer<'s, 'a> {
    pub fn new(arena: &'a Bump, config: &'s GeneratorConfig) -> Self {
        Self {
            builder: AstBuilder::new(arena),
            config,
        }
    }

    /// Getter and setter of one field. Only proxied fields get a pair.
    pub fn synthesize(&self, info: &FieldInfo<'a>) -> Option<AccessorPair<'a>> {
        if info.policy != AccessPolicy::Proxied {
            return None;
        }
        let classification = info.classification.as_ref()?;
        let receiver = self.config.receiver_name.as_str();
        let param = naming::unique_name(&naming::local_name(info.name()), |name| {
            TEMPLATE_LOCALS.contains(&name) || name == receiver
        });
        let t = FieldTemplate {
            b: self.builder.at(info.field.span),
            receiver,
            entity: &info.entity.name,
            key: info.key(),
            accessor: &info.accessor,
            mutator: &info.mutator,
            param: &param,
        };

        let pair = match classification {
            Classification::Primitive { getter, .. } => {
                let ty = info.declared_type?;
                AccessorPair {
                    accessor: templates::primitive_get(&t, getter, ty),
                    mutator: templates::primitive_set(&t, ty),
                }
            }
            Classification::Relation {
                multiplicity: Multiplicity::Single,
                target,
            } => AccessorPair {
                accessor: templates::single_relation_get(&t, target),
                mutator: templates::single_relation_set(&t, target),
            },
            Classification::Relation {
                multiplicity: Multiplicity::Multi,
                target,
            } => AccessorPair {
                accessor: templates::multi_relation_get(&t, target),
                mutator: templates::multi_relation_set(&t, target),
            },
            Classification::Enumeration {
                multiplicity: Multiplicity::Single,
                enum_name,
            } => AccessorPair {
                accessor: templates::single_enum_get(&t, enum_name, &self.config.name_map(enum_name)),
                mutator: templates::single_enum_set(&t, enum_name, &self.config.iota_map(enum_name)),
            },
            Classification::Enumeration {
                multiplicity: Multiplicity::Multi,
                enum_name,
            } => AccessorPair {
                accessor: templates::multi_enum_get(&t, enum_name, &self.config.name_map(enum_name)),
                mutator: templates::multi_enum_set(&t, enum_name, &self.config.iota_map(enum_name)),
            },
        };
        Some(pair)
    }

    /// `type Order struct { core.BaseRecordProxy }`
    pub fn wrapper_type(&self, entity: &Entity) -> Declaration<'a> {
        let b = self.builder.at(entity.span);
        let embedded = StructField {
            name: None,
            ty: b.named(BASE_PROXY_TYPE),
        };
        Declaration::Type(b.arena().alloc(TypeDecl {
            doc: None,
            name: b.str(&entity.name),
            kind: TypeDeclKind::Struct(b.arena().alloc_slice_copy(&[embedded])),
            span: entity.span,
        }))
    }

    pub fn collection_getter(&self, entity: &Entity) -> Option<&'a FuncDecl<'a>> {
        let collection = entity.collection_name.as_deref()?;
        Some(templates::collection_name_get(
            self.builder.at(entity.span),
            &self.config.receiver_name,
            &entity.name,
            collection,
        ))
    }

    pub fn enum_declarations(&self, entry: &EnumEntry) -> Vec<Declaration<'a>> {
        enum_declarations(self.builder, entry, self.config)
    }
}
