//! Error taxonomy of a generation run.
//!
//! Classification and rewrite errors are collected and reported together;
//! a name collision stops the run on the spot.

use crate::ast::Span;
use crate::diagnostics::Diagnostic;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassificationError {
    #[error("{entity}.{field}: relation target `{target}` is not an entity of the schema")]
    UnresolvedRelation {
        entity: String,
        field: String,
        target: String,
        span: Span,
    },

    #[error(
        "{entity}.{field}: enumeration `{enum_name}` needs an `int` or `[]int` representation, found `{found}`"
    )]
    InvalidEnumRepresentation {
        entity: String,
        field: String,
        enum_name: String,
        found: String,
        span: Span,
    },

    #[error("{entity}.{field}: {message}")]
    InvalidType {
        entity: String,
        field: String,
        type_expr: String,
        message: String,
        span: Span,
    },

    #[error("entity `{entity}` is declared more than once")]
    DuplicateEntity { entity: String, span: Span },

    #[error("{entity}.{field}: field is declared more than once")]
    DuplicateField {
        entity: String,
        field: String,
        span: Span,
    },

    #[error("{entity}.{field}: enumeration `{enum_name}` declares no options")]
    EmptyEnumeration {
        entity: String,
        field: String,
        enum_name: String,
        span: Span,
    },

    #[error("{entity}.{field}: enumeration `{enum_name}` declares option `{label}` twice")]
    DuplicateLabel {
        entity: String,
        field: String,
        enum_name: String,
        label: String,
        span: Span,
    },
}

impl ClassificationError {
    pub fn span(&self) -> Span {
        match self {
            ClassificationError::UnresolvedRelation { span, .. }
            | ClassificationError::InvalidEnumRepresentation { span, .. }
            | ClassificationError::InvalidType { span, .. }
            | ClassificationError::DuplicateEntity { span, .. }
            | ClassificationError::DuplicateField { span, .. }
            | ClassificationError::EmptyEnumeration { span, .. }
            | ClassificationError::DuplicateLabel { span, .. } => *span,
        }
    }

    /// `Entity.field`, or just the entity for entity-level errors.
    pub fn context(&self) -> String {
        match self {
            ClassificationError::DuplicateEntity { entity, .. } => entity.clone(),
            ClassificationError::UnresolvedRelation { entity, field, .. }
            | ClassificationError::InvalidEnumRepresentation { entity, field, .. }
            | ClassificationError::InvalidType { entity, field, .. }
            | ClassificationError::DuplicateField { entity, field, .. }
            | ClassificationError::EmptyEnumeration { entity, field, .. }
            | ClassificationError::DuplicateLabel { entity, field, .. } => {
                format!("{}.{}", entity, field)
            }
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(self.span(), self.to_string()).with_context(self.context())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RewriteError {
    #[error("{method}: cannot relocate field write at {span}: {reason}")]
    Relocation {
        method: String,
        reason: String,
        span: Span,
    },

    #[error("{method}: cannot assign {found} to {entity}.{field} of type {expected} at {span}")]
    TypeMismatch {
        method: String,
        entity: String,
        field: String,
        expected: String,
        found: String,
        span: Span,
    },

    #[error("{method}: {entity}.{field} has no generated accessor (used at {span})")]
    MissingAccessor {
        method: String,
        entity: String,
        field: String,
        span: Span,
    },

    #[error("{method}: receiver type `{receiver}` is not an entity of the schema")]
    UnknownReceiver {
        method: String,
        receiver: String,
        span: Span,
    },
}

impl RewriteError {
    pub fn span(&self) -> Span {
        match self {
            RewriteError::Relocation { span, .. }
            | RewriteError::TypeMismatch { span, .. }
            | RewriteError::MissingAccessor { span, .. }
            | RewriteError::UnknownReceiver { span, .. } => *span,
        }
    }

    pub fn method(&self) -> &str {
        match self {
            RewriteError::Relocation { method, .. }
            | RewriteError::TypeMismatch { method, .. }
            | RewriteError::MissingAccessor { method, .. }
            | RewriteError::UnknownReceiver { method, .. } => method,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(self.span(), self.to_string()).with_context(self.method().to_string())
    }
}

/// Where a name in an entity's generated namespace comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NameOrigin {
    Accessor { field: String },
    Mutator { field: String },
    UserMethod,
    CollectionGetter,
    WrapperType,
}

impl fmt::Display for NameOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameOrigin::Accessor { field } => write!(f, "accessor of `{}`", field),
            NameOrigin::Mutator { field } => write!(f, "mutator of `{}`", field),
            NameOrigin::UserMethod => write!(f, "user method"),
            NameOrigin::CollectionGetter => write!(f, "collection-name getter"),
            NameOrigin::WrapperType => write!(f, "wrapper type"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameCollision {
    /// The name belongs to the record store.
    Reserved {
        entity: String,
        name: String,
        origin: NameOrigin,
        span: Span,
    },
    /// Two members of the same entity share a name.
    Duplicate {
        entity: String,
        name: String,
        first: NameOrigin,
        second: NameOrigin,
        span: Span,
    },
}

impl NameCollision {
    pub fn name(&self) -> &str {
        match self {
            NameCollision::Reserved { name, .. } | NameCollision::Duplicate { name, .. } => name,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            NameCollision::Reserved { span, .. } | NameCollision::Duplicate { span, .. } => *span,
        }
    }
}

impl fmt::Display for NameCollision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameCollision::Reserved {
                entity,
                name,
                origin,
                ..
            } => write!(
                f,
                "{}.{} ({}) shadows a record store member",
                entity, name, origin
            ),
            NameCollision::Duplicate {
                entity,
                name,
                first,
                second,
                ..
            } => write!(
                f,
                "{}.{} is declared by both the {} and the {}",
                entity, name, first, second
            ),
        }
    }
}

/// All collisions of one run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct NameCollisionError {
    pub collisions: Vec<NameCollision>,
}

impl fmt::Display for NameCollisionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "generated names collide: ")?;
        for (i, collision) in self.collisions.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", collision)?;
        }
        Ok(())
    }
}

impl NameCollisionError {
    pub fn to_diagnostics(&self) -> Vec<Diagnostic> {
        self.collisions
            .iter()
            .map(|collision| {
                Diagnostic::error(collision.span(), collision.to_string())
                    .with_context(collision.name().to_string())
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    #[error(
        "generation failed with {} classification error(s) and {} rewrite error(s)",
        .classification.len(),
        .rewrite.len()
    )]
    Failed {
        classification: Vec<ClassificationError>,
        rewrite: Vec<RewriteError>,
    },

    #[error(transparent)]
    NameCollision(#[from] NameCollisionError),
}

impl GenerateError {
    pub fn rewrite_errors(&self) -> &[RewriteError] {
        match self {
            GenerateError::Failed { rewrite, .. } => rewrite,
            GenerateError::NameCollision(_) => &[],
        }
    }

    pub fn classification_errors(&self) -> &[ClassificationError] {
        match self {
            GenerateError::Failed { classification, .. } => classification,
            GenerateError::NameCollision(_) => &[],
        }
    }
}
