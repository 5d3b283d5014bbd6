//! One generation run: classification, synthesis, rewriting, name checks
//! and ordered output.

use crate::ast::{Declaration, FuncDecl};
use crate::classifier::{EnumEntry, EnumTable, FieldCatalog};
use crate::config::GeneratorConfig;
use crate::diagnostics::{
    CollectingDiagnosticHandler, Diagnostic, DiagnosticHandler, DiagnosticLevel,
};
use crate::errors::{ClassificationError, GenerateError, RewriteError};
use crate::rewriter::{self, MethodTable};
use crate::schema::Schema;
use crate::shadow::{EntityNamespace, ShadowChecker};
use crate::synthesizer::{AccessorPair, Synthesizer};
use bumpalo::Bump;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;

/// Everything generated for one schema, in output order.
#[derive(Debug, Clone)]
pub struct GeneratedOutput<'a> {
    pub declarations: Vec<Declaration<'a>>,
    pub enums: Vec<EnumEntry>,
    pub diagnostics: Vec<Diagnostic>,
}

impl<'a> GeneratedOutput<'a> {
    pub fn functions(&self) -> impl Iterator<Item = &'a FuncDecl<'a>> + '_ {
        self.declarations.iter().filter_map(Declaration::as_func)
    }

    /// The method `name` declared on `entity`.
    pub fn method(&self, entity: &str, name: &str) -> Option<&'a FuncDecl<'a>> {
        self.functions()
            .find(|func| func.name == name && func.receiver_entity() == Some(entity))
    }
}

/// Owns the state of a run. All tables are explicit values here; nothing
/// is shared between sessions.
pub struct CompilationSession<'a> {
    arena: &'a Bump,
    schema: &'a Schema,
    config: GeneratorConfig,
    handler: Arc<dyn DiagnosticHandler>,
    catalog: FieldCatalog<'a>,
    enums: EnumTable,
    classification_errors: Vec<ClassificationError>,
    classified: bool,
}

impl<'a> CompilationSession<'a> {
    pub fn new(schema: &'a Schema, config: GeneratorConfig, arena: &'a Bump) -> Self {
        Self {
            arena,
            schema,
            config,
            handler: Arc::new(CollectingDiagnosticHandler::new()),
            catalog: FieldCatalog::default(),
            enums: EnumTable::new(),
            classification_errors: Vec::new(),
            classified: false,
        }
    }

    pub fn with_handler(mut self, handler: Arc<dyn DiagnosticHandler>) -> Self {
        self.handler = handler;
        self
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn handler(&self) -> &Arc<dyn DiagnosticHandler> {
        &self.handler
    }

    /// Classifies the whole schema from scratch. Running it again gives the
    /// same catalog and enumeration table.
    pub fn classify_all(&mut self) -> &[ClassificationError] {
        self.enums = EnumTable::new();
        let (catalog, errors) =
            FieldCatalog::build(self.schema, &self.config, self.arena, &mut self.enums);
        self.catalog = catalog;
        self.classification_errors = errors;
        self.classified = true;
        &self.classification_errors
    }

    /// The catalog, classifying first if that has not happened yet.
    pub fn classified(&mut self) -> &FieldCatalog<'a> {
        if !self.classified {
            self.classify_all();
        }
        &self.catalog
    }

    pub fn catalog(&self) -> &FieldCatalog<'a> {
        &self.catalog
    }

    pub fn enums(&self) -> &EnumTable {
        &self.enums
    }

    pub fn classification_errors(&self) -> &[ClassificationError] {
        &self.classification_errors
    }

    /// Accessor/mutator pairs of `entity`, in field order.
    pub fn synthesize_entity(&self, entity: &str) -> Vec<AccessorPair<'a>> {
        let synthesizer = Synthesizer::new(self.arena, &self.config);
        self.catalog
            .entity(entity)
            .into_iter()
            .flat_map(|fields| fields.fields.values())
            .filter_map(|info| synthesizer.synthesize(info))
            .collect()
    }

    pub fn rewrite_method(
        &self,
        method: &'a FuncDecl<'a>,
        methods: &MethodTable<'a>,
    ) -> Result<&'a FuncDecl<'a>, RewriteError> {
        rewriter::rewrite_method(method, &self.catalog, methods, &self.config, self.arena)
    }

    /// Runs the whole pipeline over `methods`, the user methods of every
    /// entity wrapper in source order.
    pub fn generate(
        &mut self,
        methods: &[&'a FuncDecl<'a>],
    ) -> Result<GeneratedOutput<'a>, GenerateError> {
        self.classify_all();
        let fatal = self.config.unresolved_relations_fatal;
        for error in &self.classification_errors {
            let mut diagnostic = error.to_diagnostic();
            if !fatal {
                diagnostic.level = DiagnosticLevel::Warning;
            }
            self.handler.report(diagnostic);
        }

        let table = MethodTable::from_methods(methods);
        let mut rewritten: FxHashMap<&'a str, Vec<&'a FuncDecl<'a>>> = FxHashMap::default();
        let mut rewrite_errors = Vec::new();
        for &method in methods {
            match self.rewrite_method(method, &table) {
                Ok(func) => {
                    if let Some(entity) = method.receiver_entity() {
                        rewritten.entry(entity).or_default().push(func);
                    }
                }
                Err(error) => {
                    self.handler.report(error.to_diagnostic());
                    rewrite_errors.push(error);
                }
            }
        }

        if !rewrite_errors.is_empty() || (fatal && !self.classification_errors.is_empty()) {
            tracing::info!(
                classification_errors = self.classification_errors.len(),
                rewrite_errors = rewrite_errors.len(),
                "generation failed"
            );
            return Err(GenerateError::Failed {
                classification: if fatal {
                    self.classification_errors.clone()
                } else {
                    Vec::new()
                },
                rewrite: rewrite_errors,
            });
        }

        let namespaces: Vec<_> = self
            .catalog
            .entities()
            .map(|fields| EntityNamespace::for_entity(fields, methods))
            .collect();
        if let Err(error) = ShadowChecker::new(&self.config).check(&namespaces) {
            for diagnostic in error.to_diagnostics() {
                self.handler.report(diagnostic);
            }
            return Err(error.into());
        }

        let declarations = self.assemble(&rewritten);
        tracing::info!(
            entities = self.catalog.entities().count(),
            methods = methods.len(),
            enums = self.enums.len(),
            declarations = declarations.len(),
            "generation finished"
        );
        Ok(GeneratedOutput {
            declarations,
            enums: self.enums.entries().cloned().collect(),
            diagnostics: self.handler.get_diagnostics(),
        })
    }

    /// Per entity in schema order: new enumerations, the wrapper type, user
    /// methods, the collection-name getter, then accessor/mutator pairs.
    fn assemble(&self, rewritten: &FxHashMap<&'a str, Vec<&'a FuncDecl<'a>>>) -> Vec<Declaration<'a>> {
        let synthesizer = Synthesizer::new(self.arena, &self.config);
        let mut emitted_enums = FxHashSet::default();
        let mut declarations = Vec::new();

        for fields in self.catalog.entities() {
            let entity = fields.entity;
            for info in fields.fields.values() {
                let Some(entry) = info.enum_name().and_then(|name| self.enums.get(name)) else {
                    continue;
                };
                if emitted_enums.insert(entry.name.clone()) {
                    declarations.extend(synthesizer.enum_declarations(entry));
                }
            }

            declarations.push(synthesizer.wrapper_type(entity));
            if let Some(methods) = rewritten.get(entity.name.as_str()) {
                declarations.extend(methods.iter().copied().map(Declaration::Func));
            }
            match synthesizer.collection_getter(entity) {
                Some(getter) => declarations.push(Declaration::Func(getter)),
                None => self.handler.info(
                    entity.span,
                    &format!("{} has no collection name, skipping CollectionName()", entity.name),
                ),
            }
            for pair in self.synthesize_entity(&entity.name) {
                declarations.push(Declaration::Func(pair.accessor));
                declarations.push(Declaration::Func(pair.mutator));
            }
        }
        declarations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Entity, Field};

    fn schema() -> Schema {
        Schema::new(vec![
            Entity::new("Order")
                .with_collection("orders")
                .with_field(Field::new("total", "float64"))
                .with_field(Field::enumerated("status", "Status", &["new", "paid"], false)),
            Entity::new("Note").with_field(Field::new("text", "string")),
        ])
    }

    #[test]
    fn test_generate_without_methods_orders_declarations() {
        let arena = Bump::new();
        let schema = schema();
        let mut session = CompilationSession::new(&schema, GeneratorConfig::default(), &arena);
        let output = session.generate(&[]).unwrap();

        let names: Vec<_> = output.declarations.iter().map(|d| d.name()).collect();
        assert_eq!(
            names,
            vec![
                "Status",
                "Status",
                "zzStatusSelectNameMap",
                "zzStatusSelectIotaMap",
                "zzStatusSliceOf",
                "Order",
                "CollectionName",
                "Total",
                "SetTotal",
                "Status",
                "SetStatus",
                "Note",
                "Text",
                "SetText",
            ]
        );
        assert_eq!(output.enums.len(), 1);
        assert!(output
            .diagnostics
            .iter()
            .any(|d| d.message.contains("Note has no collection name")));
    }

    #[test]
    fn test_classify_all_is_idempotent() {
        let arena = Bump::new();
        let schema = schema();
        let mut session = CompilationSession::new(&schema, GeneratorConfig::default(), &arena);
        session.classify_all();
        let first: Vec<_> = session.enums().entries().cloned().collect();
        session.classify_all();
        let second: Vec<_> = session.enums().entries().cloned().collect();
        assert_eq!(first, second);
        assert_eq!(session.classified().entities().count(), 2);
    }
}
