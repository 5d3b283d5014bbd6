//! Field classification: decides what code a schema field needs.

pub mod catalog;
pub mod enum_table;

pub use catalog::{AccessPolicy, EntityFields, FieldCatalog, FieldInfo};
pub use enum_table::{EnumEntry, EnumTable, Registration};

use crate::ast::TypeExpr;
use crate::config::GeneratorConfig;
use crate::errors::ClassificationError;
use crate::schema::{Entity, Field, Schema};
use bumpalo::Bump;
use rustc_hash::FxHashSet;
use serde::Serialize;
use std::fmt;

const BUILTIN_TYPES: &[&str] = &[
    "bool", "string", "int", "int8", "int16", "int32", "int64", "uint", "uint8", "uint16",
    "uint32", "uint64", "uintptr", "byte", "rune", "float32", "float64", "complex64",
    "complex128", "any", "error",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Multiplicity {
    Single,
    Multi,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Classification {
    /// Read and written through one of the record store's native getters.
    Primitive {
        representation: String,
        getter: String,
    },
    Relation {
        multiplicity: Multiplicity,
        target: String,
    },
    Enumeration {
        multiplicity: Multiplicity,
        enum_name: String,
    },
}

impl Classification {
    pub fn multiplicity(&self) -> Multiplicity {
        match self {
            Classification::Primitive { .. } => Multiplicity::Single,
            Classification::Relation { multiplicity, .. }
            | Classification::Enumeration { multiplicity, .. } => *multiplicity,
        }
    }

    pub fn enum_name(&self) -> Option<&str> {
        match self {
            Classification::Enumeration { enum_name, .. } => Some(enum_name),
            _ => None,
        }
    }

    pub fn relation_target(&self) -> Option<&str> {
        match self {
            Classification::Relation { target, .. } => Some(target),
            _ => None,
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Primitive { representation, .. } => {
                write!(f, "primitive {}", representation)
            }
            Classification::Relation {
                multiplicity,
                target,
            } => write!(f, "{:?} relation to {}", multiplicity, target),
            Classification::Enumeration {
                multiplicity,
                enum_name,
            } => write!(f, "{:?} enumeration {}", multiplicity, enum_name),
        }
    }
}

/// Classifies one field against the whole schema.
///
/// Pure: the same inputs always produce the same `Classification`. For
/// enumerations the result names the requested type; the session swaps in
/// the name the enumeration table finally assigns.
pub fn classify(
    entity: &Entity,
    field: &Field,
    schema: &Schema,
    config: &GeneratorConfig,
) -> Result<Classification, ClassificationError> {
    let arena = Bump::new();
    let ty = TypeExpr::parse(&field.type_expr, &arena).map_err(|err| {
        ClassificationError::InvalidType {
            entity: entity.name.clone(),
            field: field.name.clone(),
            type_expr: field.type_expr.clone(),
            message: err.to_string(),
            span: field.span,
        }
    })?;

    if let Some(spec) = &field.enumeration {
        let multiplicity = match ty {
            TypeExpr::Named("int") => Multiplicity::Single,
            TypeExpr::Slice(TypeExpr::Named("int")) => Multiplicity::Multi,
            _ => {
                return Err(ClassificationError::InvalidEnumRepresentation {
                    entity: entity.name.clone(),
                    field: field.name.clone(),
                    enum_name: spec.type_name.clone(),
                    found: ty.to_string(),
                    span: field.span,
                })
            }
        };
        if spec.labels.is_empty() {
            return Err(ClassificationError::EmptyEnumeration {
                entity: entity.name.clone(),
                field: field.name.clone(),
                enum_name: spec.type_name.clone(),
                span: field.span,
            });
        }
        let mut seen = FxHashSet::default();
        if let Some(label) = spec.labels.iter().find(|label| !seen.insert(label.as_str())) {
            return Err(ClassificationError::DuplicateLabel {
                entity: entity.name.clone(),
                field: field.name.clone(),
                enum_name: spec.type_name.clone(),
                label: label.clone(),
                span: field.span,
            });
        }
        if let Some(const_names) = &spec.const_names {
            if const_names.len() != spec.labels.len() {
                return Err(ClassificationError::InvalidType {
                    entity: entity.name.clone(),
                    field: field.name.clone(),
                    type_expr: field.type_expr.clone(),
                    message: format!(
                        "enumeration `{}` has {} options but {} constant names",
                        spec.type_name,
                        spec.labels.len(),
                        const_names.len()
                    ),
                    span: field.span,
                });
            }
        }
        return Ok(Classification::Enumeration {
            multiplicity,
            enum_name: spec.type_name.clone(),
        });
    }

    let representation = ty.to_string();
    if let Some(getter) = config.getter_for(&representation) {
        return Ok(Classification::Primitive {
            representation,
            getter: getter.to_string(),
        });
    }

    let (multiplicity, target) = match *ty {
        TypeExpr::Named(name) | TypeExpr::Pointer(&TypeExpr::Named(name)) => {
            (Multiplicity::Single, name)
        }
        TypeExpr::Slice(&TypeExpr::Named(name))
        | TypeExpr::Slice(&TypeExpr::Pointer(&TypeExpr::Named(name))) => {
            (Multiplicity::Multi, name)
        }
        _ => {
            return Err(unsupported(entity, field, &representation));
        }
    };

    if schema.has_entity(target) {
        Ok(Classification::Relation {
            multiplicity,
            target: target.to_string(),
        })
    } else if BUILTIN_TYPES.contains(&target) || target.contains('.') {
        Err(unsupported(entity, field, &representation))
    } else {
        Err(ClassificationError::UnresolvedRelation {
            entity: entity.name.clone(),
            field: field.name.clone(),
            target: target.to_string(),
            span: field.span,
        })
    }
}

fn unsupported(entity: &Entity, field: &Field, representation: &str) -> ClassificationError {
    ClassificationError::InvalidType {
        entity: entity.name.clone(),
        field: field.name.clone(),
        type_expr: field.type_expr.clone(),
        message: format!("the record store has no getter for `{}`", representation),
        span: field.span,
    }
}
