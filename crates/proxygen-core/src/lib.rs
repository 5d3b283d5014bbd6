//! Record proxy generation: classifies schema fields, synthesizes their
//! accessors and mutators, and rewrites user methods that touch fields as
//! plain data members into calls of those accessors.

pub mod ast;
pub mod classifier;
pub mod config;
pub mod diagnostics;
pub mod errors;
pub mod naming;
pub mod rewriter;
pub mod schema;
pub mod session;
pub mod shadow;
pub mod synthesizer;

pub use classifier::{
    classify, AccessPolicy, Classification, EnumEntry, EnumTable, FieldCatalog, FieldInfo,
    Multiplicity,
};
pub use config::GeneratorConfig;
pub use diagnostics::{CollectingDiagnosticHandler, Diagnostic, DiagnosticHandler, DiagnosticLevel};
pub use errors::{
    ClassificationError, GenerateError, NameCollision, NameCollisionError, NameOrigin,
    RewriteError,
};
pub use rewriter::{rewrite_method, MethodTable, RewriteScope, SchemaTypeOracle, TypeOracle};
pub use schema::{Entity, EnumSpec, Field, Schema};
pub use session::{CompilationSession, GeneratedOutput};
pub use shadow::ShadowChecker;
pub use synthesizer::{AccessorPair, Synthesizer};
