//! Test helpers for proxygen
//!
//! Parses method sources, runs them through the generator and renders or
//! executes the results, so tests can state inputs and expectations as text.

pub mod executor;
pub mod fixtures;
pub mod lexer;
pub mod parser;
pub mod render;

pub use executor::{ExecError, Executor, FakeRecord, Value};
pub use parser::{parse_method, parse_methods, ParseError};
pub use render::{
    render_body, render_declaration, render_declarations, render_expression, render_func,
    render_statement,
};

use bumpalo::Bump;
use proxygen_core::{CompilationSession, GeneratorConfig, MethodTable, RewriteError, Schema};

/// Rewrite every method in `source` with the default configuration
///
/// # Returns
/// The rewritten methods rendered back to source text, or an error message
pub fn rewrite_source(schema: &Schema, source: &str) -> Result<String, String> {
    rewrite_source_with(schema, GeneratorConfig::default(), source)
}

/// Rewrite every method in `source` with `config`
pub fn rewrite_source_with(
    schema: &Schema,
    config: GeneratorConfig,
    source: &str,
) -> Result<String, String> {
    let arena = Bump::new();
    let methods = parse_methods(source, &arena).map_err(|e| format!("Parsing failed: {e}"))?;
    let mut session = CompilationSession::new(schema, config, &arena);
    session.classify_all();
    let table = MethodTable::from_methods(&methods);

    let mut rendered = Vec::with_capacity(methods.len());
    for &method in &methods {
        let rewritten = session
            .rewrite_method(method, &table)
            .map_err(|e| format!("Rewrite failed: {e}"))?;
        rendered.push(render_func(rewritten));
    }
    Ok(rendered.join("\n"))
}

/// Rewrite the single method in `source` and render only its body, one
/// statement per line without indentation
pub fn rewrite_body(schema: &Schema, source: &str) -> Result<String, String> {
    let arena = Bump::new();
    let method = parse_method(source, &arena).map_err(|e| format!("Parsing failed: {e}"))?;
    let mut session = CompilationSession::new(schema, GeneratorConfig::default(), &arena);
    session.classify_all();
    let table = MethodTable::from_methods(&[method]);
    let rewritten = session
        .rewrite_method(method, &table)
        .map_err(|e| format!("Rewrite failed: {e}"))?;
    Ok(render_body(&rewritten.body))
}

/// Rewrite the single method in `source`, expecting it to be rejected
///
/// # Returns
/// The rewrite error, or a message when parsing failed or the rewrite
/// succeeded
pub fn rewrite_error(schema: &Schema, source: &str) -> Result<RewriteError, String> {
    let arena = Bump::new();
    let method = parse_method(source, &arena).map_err(|e| format!("Parsing failed: {e}"))?;
    let mut session = CompilationSession::new(schema, GeneratorConfig::default(), &arena);
    session.classify_all();
    let table = MethodTable::from_methods(&[method]);
    match session.rewrite_method(method, &table) {
        Ok(rewritten) => Err(format!(
            "expected a rewrite error, got:\n{}",
            render_func(rewritten)
        )),
        Err(error) => Ok(error),
    }
}

/// Run the whole generator over the methods in `source`
///
/// # Returns
/// Every generated declaration rendered in output order, or an error message
pub fn generate_source(schema: &Schema, source: &str) -> Result<String, String> {
    let arena = Bump::new();
    let methods = parse_methods(source, &arena).map_err(|e| format!("Parsing failed: {e}"))?;
    let mut session = CompilationSession::new(schema, GeneratorConfig::default(), &arena);
    let output = session
        .generate(&methods)
        .map_err(|e| format!("Generation failed: {e}"))?;
    Ok(render_declarations(&output.declarations))
}
