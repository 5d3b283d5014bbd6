//! Method rewriter: turns field reads and writes in user methods into
//! accessor and mutator calls.
//!
//! A method is desugared first (compound assignments, `++`/`--`), then walked
//! once. The walk returns new nodes for everything it changes and reuses
//! the rest; the type of every rewritten expression is tracked so chained
//! selectors resolve against the result of an inner accessor call.

mod assign;
pub mod compound;
pub mod oracle;
mod placement;
pub mod scope;
mod temps;

pub use compound::CompoundAssignmentDesugaring;
pub use oracle::{MethodTable, SchemaTypeOracle, TypeOracle};
pub use scope::RewriteScope;

use crate::ast::types::INT;
use crate::ast::{
    AstBuilder, Block, CallExpression, CompositeElement, Expression, ExpressionKind,
    ForStatement, FuncDecl, IfStatement, RangeStatement, Span, StaticType, Statement, SwitchCase,
    SwitchStatement, TypeExpr, VarStatement,
};
use crate::classifier::{AccessPolicy, FieldCatalog, FieldInfo};
use crate::config::GeneratorConfig;
use crate::errors::RewriteError;
use bumpalo::Bump;
use placement::{Relocated, Slot};
use temps::TempNames;

/// Rewrites one method with the schema-backed type oracle.
pub fn rewrite_method<'a>(
    method: &'a FuncDecl<'a>,
    catalog: &FieldCatalog<'a>,
    methods: &MethodTable<'a>,
    config: &GeneratorConfig,
    arena: &'a Bump,
) -> Result<&'a FuncDecl<'a>, RewriteError> {
    let mut desugared = *method;
    let desugaring = CompoundAssignmentDesugaring::new(arena);
    desugaring.desugar_block(&mut desugared.body);

    let mut oracle = SchemaTypeOracle::for_method(&desugared, catalog, methods, arena);
    let mut scope = receiver_scope(method, catalog)?;
    for ty in oracle.bound_types() {
        if let Some(entity) = ty.named_target() {
            scope.include(entity);
        }
    }

    rewrite_desugared(&desugared, scope, &mut oracle, config, arena)
}

/// Rewrites one method against any type oracle.
pub fn rewrite_method_with<'a, O>(
    method: &'a FuncDecl<'a>,
    catalog: &FieldCatalog<'a>,
    oracle: &mut O,
    config: &GeneratorConfig,
    arena: &'a Bump,
) -> Result<&'a FuncDecl<'a>, RewriteError>
where
    O: TypeOracle<'a> + ?Sized,
{
    let mut desugared = *method;
    CompoundAssignmentDesugaring::new(arena).desugar_block(&mut desugared.body);
    let scope = receiver_scope(method, catalog)?;
    rewrite_desugared(&desugared, scope, oracle, config, arena)
}

fn receiver_scope<'c, 'a>(
    method: &FuncDecl<'a>,
    catalog: &'c FieldCatalog<'a>,
) -> Result<RewriteScope<'c, 'a>, RewriteError> {
    let receiver = method.receiver_entity().unwrap_or("");
    RewriteScope::new(catalog, receiver).ok_or_else(|| RewriteError::UnknownReceiver {
        method: method.name.to_string(),
        receiver: method
            .receiver
            .map(|r| r.ty.to_string())
            .unwrap_or_default(),
        span: method.span,
    })
}

fn rewrite_desugared<'a, O>(
    method: &FuncDecl<'a>,
    scope: RewriteScope<'_, 'a>,
    oracle: &mut O,
    config: &GeneratorConfig,
    arena: &'a Bump,
) -> Result<&'a FuncDecl<'a>, RewriteError>
where
    O: TypeOracle<'a> + ?Sized,
{
    let mut rewriter = MethodRewriter {
        b: AstBuilder::new(arena),
        oracle,
        scope,
        config,
        temps: TempNames::for_method(method),
        method: method.name,
        rewrites: 0,
    };
    let body = rewriter.rewrite_block(&method.body)?;
    tracing::debug!(
        method = method.name,
        rewrites = rewriter.rewrites,
        "rewrote method body"
    );
    Ok(arena.alloc(FuncDecl { body, ..*method }))
}

/// A rewritten expression with its static type.
#[derive(Debug, Clone, Copy)]
struct Typed<'a> {
    expr: Expression<'a>,
    ty: Option<StaticType<'a>>,
    changed: bool,
}

impl<'a> Typed<'a> {
    fn same(expr: Expression<'a>, ty: Option<StaticType<'a>>) -> Self {
        Self {
            expr,
            ty,
            changed: false,
        }
    }

    fn new(expr: Expression<'a>, ty: Option<StaticType<'a>>) -> Self {
        Self {
            expr,
            ty,
            changed: true,
        }
    }
}

/// What a selector denotes once its base type is known.
enum Member<'r, 'a> {
    Proxied(&'r FieldInfo<'a>),
    Direct(&'r FieldInfo<'a>),
    Other,
}

/// Assignment target after resolution.
#[derive(Clone, Copy)]
enum Target<'r, 'a> {
    Blank,
    Plain(Expression<'a>),
    Field {
        receiver: Expression<'a>,
        info: &'r FieldInfo<'a>,
    },
}

struct MethodRewriter<'r, 'a, O: ?Sized> {
    b: AstBuilder<'a>,
    oracle: &'r mut O,
    scope: RewriteScope<'r, 'a>,
    config: &'r GeneratorConfig,
    temps: TempNames,
    method: &'a str,
    rewrites: usize,
}

impl<'r, 'a, O> MethodRewriter<'r, 'a, O>
where
    O: TypeOracle<'a> + ?Sized,
{
    fn arena(&self) -> &'a Bump {
        self.b.arena()
    }

    /// Runs `f` inside a fresh block scope of the oracle.
    fn scoped<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, RewriteError>,
    ) -> Result<T, RewriteError> {
        self.oracle.enter_scope();
        let result = f(self);
        self.oracle.exit_scope();
        result
    }

    // Expressions

    fn resolve(
        &self,
        base: &Typed<'a>,
        member: &str,
        span: Span,
    ) -> Result<Member<'r, 'a>, RewriteError> {
        let Some(ty) = base.ty.and_then(|ty| ty.known()) else {
            return Ok(Member::Other);
        };
        let Some(entity) = ty.named_target() else {
            return Ok(Member::Other);
        };
        if !self.oracle.is_field_selector(ty, member) {
            return Ok(Member::Other);
        }
        let Some(info) = self.scope.field(entity, member) else {
            return Ok(Member::Other);
        };
        match info.policy {
            AccessPolicy::Proxied => Ok(Member::Proxied(info)),
            AccessPolicy::Direct => Ok(Member::Direct(info)),
            AccessPolicy::Unavailable => Err(RewriteError::MissingAccessor {
                method: self.method.to_string(),
                entity: info.entity.name.clone(),
                field: info.field.name.clone(),
                span,
            }),
        }
    }

    /// Rewrites an expression evaluated for its value.
    fn value(&mut self, expr: &Expression<'a>) -> Result<Typed<'a>, RewriteError> {
        let b = self.b.at(expr.span);
        let typed = match expr.kind {
            ExpressionKind::Identifier(_) | ExpressionKind::Literal(_) | ExpressionKind::Type(_) => {
                Typed::same(*expr, self.oracle.type_of(expr))
            }
            ExpressionKind::Selector(base, member) => {
                let base_t = self.value(base)?;
                match self.resolve(&base_t, member, expr.span)? {
                    Member::Proxied(info) => {
                        self.rewrites += 1;
                        Typed::new(
                            b.method_call(base_t.expr, &info.accessor, &[]),
                            info.declared_type.map(StaticType::Known),
                        )
                    }
                    member_kind => {
                        let ty = match member_kind {
                            Member::Direct(info) => info.declared_type.map(StaticType::Known),
                            _ => self.oracle.type_of(expr),
                        };
                        if base_t.changed {
                            Typed::new(b.selector(base_t.expr, member), ty)
                        } else {
                            Typed::same(*expr, ty)
                        }
                    }
                }
            }
            ExpressionKind::Call(call) => {
                let callee = self.value(&call.callee)?;
                let args = self.values(call.args)?;
                let ty = self.oracle.type_of(expr);
                if callee.changed || args.iter().any(|arg| arg.changed) {
                    let new_call = self.arena().alloc(CallExpression {
                        callee: callee.expr,
                        type_args: call.type_args,
                        args: self.alloc_exprs(&args),
                    });
                    Typed::new(Expression::new(ExpressionKind::Call(new_call), expr.span), ty)
                } else {
                    Typed::same(*expr, ty)
                }
            }
            ExpressionKind::Index(base, index) => {
                let base_t = self.value(base)?;
                let index_t = self.value(index)?;
                let ty = match base_t.ty.and_then(|ty| ty.known()).and_then(|ty| ty.element()) {
                    Some(elem) => Some(StaticType::Known(elem)),
                    None => self.oracle.type_of(expr),
                };
                if base_t.changed || index_t.changed {
                    Typed::new(b.index(base_t.expr, index_t.expr), ty)
                } else {
                    Typed::same(*expr, ty)
                }
            }
            ExpressionKind::Binary(op, left, right) => {
                let left_t = self.value(left)?;
                let right_t = self.value(right)?;
                let ty = self.oracle.type_of(expr);
                if left_t.changed || right_t.changed {
                    Typed::new(b.binary(op, left_t.expr, right_t.expr), ty)
                } else {
                    Typed::same(*expr, ty)
                }
            }
            ExpressionKind::Unary(op, operand) => {
                let operand_t = self.value(operand)?;
                let ty = self.oracle.type_of(expr);
                if operand_t.changed {
                    Typed::new(b.unary(op, operand_t.expr), ty)
                } else {
                    Typed::same(*expr, ty)
                }
            }
            ExpressionKind::Paren(inner) => {
                let inner_t = self.value(inner)?;
                if inner_t.changed {
                    Typed::new(b.paren(inner_t.expr), inner_t.ty)
                } else {
                    Typed::same(*expr, inner_t.ty)
                }
            }
            ExpressionKind::Composite(ty, elements) => {
                let mut new_elements = Vec::with_capacity(elements.len());
                let mut changed = false;
                for element in elements {
                    let key = match &element.key {
                        Some(key) => {
                            let key_t = self.value(key)?;
                            changed |= key_t.changed;
                            Some(key_t.expr)
                        }
                        None => None,
                    };
                    let value_t = self.value(&element.value)?;
                    changed |= value_t.changed;
                    new_elements.push(CompositeElement {
                        key,
                        value: value_t.expr,
                    });
                }
                let static_ty = Some(StaticType::Known(ty));
                if changed {
                    let elements = self.arena().alloc_slice_copy(&new_elements);
                    Typed::new(
                        Expression::new(ExpressionKind::Composite(ty, elements), expr.span),
                        static_ty,
                    )
                } else {
                    Typed::same(*expr, static_ty)
                }
            }
        };
        Ok(typed)
    }

    fn values(&mut self, exprs: &[Expression<'a>]) -> Result<Vec<Typed<'a>>, RewriteError> {
        exprs.iter().map(|expr| self.value(expr)).collect()
    }

    fn alloc_exprs(&self, typed: &[Typed<'a>]) -> &'a [Expression<'a>] {
        let exprs: Vec<_> = typed.iter().map(|t| t.expr).collect();
        self.arena().alloc_slice_copy(&exprs)
    }

    /// Resolves an assignment target. Selectors that name a proxied field
    /// become field targets; everything inside a target that is only read
    /// (selector bases, index operands) is rewritten as a value.
    fn target(&mut self, expr: &Expression<'a>) -> Result<Target<'r, 'a>, RewriteError> {
        if expr.is_blank() {
            return Ok(Target::Blank);
        }
        let b = self.b.at(expr.span);
        let target = match expr.kind {
            ExpressionKind::Selector(base, member) => {
                let base_t = self.value(base)?;
                match self.resolve(&base_t, member, expr.span)? {
                    Member::Proxied(info) => Target::Field {
                        receiver: base_t.expr,
                        info,
                    },
                    _ if base_t.changed => Target::Plain(b.selector(base_t.expr, member)),
                    _ => Target::Plain(*expr),
                }
            }
            ExpressionKind::Paren(inner) => return self.target(inner),
            ExpressionKind::Identifier(_) => Target::Plain(*expr),
            _ => Target::Plain(self.value(expr)?.expr),
        };
        Ok(target)
    }

    // Statements

    fn rewrite_block(&mut self, block: &Block<'a>) -> Result<Block<'a>, RewriteError> {
        let statements = self.scoped(|this| this.rewrite_statements(block.statements))?;
        if statements.as_slice() == block.statements {
            return Ok(*block);
        }
        Ok(Block {
            statements: self.arena().alloc_slice_copy(&statements),
            span: block.span,
        })
    }

    fn rewrite_statements(
        &mut self,
        statements: &[Statement<'a>],
    ) -> Result<Vec<Statement<'a>>, RewriteError> {
        let mut out = Vec::with_capacity(statements.len());
        for stmt in statements {
            out.extend(self.rewrite_statement(stmt)?);
            self.oracle.declare(stmt);
        }
        Ok(out)
    }

    /// A statement in a statement list may expand into several.
    fn rewrite_statement(&mut self, stmt: &Statement<'a>) -> Result<Vec<Statement<'a>>, RewriteError> {
        let rewritten = match *stmt {
            Statement::Empty(_) | Statement::Break(_) | Statement::Continue(_) => vec![*stmt],
            Statement::Expression(expr) => vec![Statement::Expression(self.value(&expr)?.expr)],
            Statement::Assign(assign) => self.plan_assignment(assign)?.into_statements(),
            Statement::IncDec(inc_dec) if !inc_dec.target.is_call_free() => {
                self.plan_inc_dec(inc_dec)?.into_statements()
            }
            Statement::IncDec(inc_dec) => {
                let desugared =
                    CompoundAssignmentDesugaring::new(self.arena()).desugar_inc_dec(inc_dec);
                return self.rewrite_statement(&desugared);
            }
            Statement::Var(var) => {
                let values = self.values(var.values)?;
                if values.iter().any(|v| v.changed) {
                    let new_var = self.arena().alloc(VarStatement {
                        values: self.alloc_exprs(&values),
                        ..*var
                    });
                    vec![Statement::Var(new_var)]
                } else {
                    vec![*stmt]
                }
            }
            Statement::Block(block) => vec![Statement::Block(self.rewrite_block(&block)?)],
            Statement::If(if_stmt) => {
                let (mut before, new_if) = self.rewrite_if(if_stmt, false)?;
                before.push(new_if);
                before
            }
            Statement::For(for_stmt) => {
                let (mut before, new_for) = self.rewrite_for(for_stmt)?;
                before.push(new_for);
                before
            }
            Statement::Range(range) => vec![self.rewrite_range(range)?],
            Statement::Switch(switch) => {
                let (mut before, new_switch) = self.rewrite_switch(switch)?;
                before.push(new_switch);
                before
            }
            Statement::Return(values, span) => {
                let values = self.values(values)?;
                if values.iter().any(|v| v.changed) {
                    vec![Statement::Return(self.alloc_exprs(&values), span)]
                } else {
                    vec![*stmt]
                }
            }
        };
        Ok(rewritten)
    }

    /// Rewrites the statement in an initializer or post slot. Anything that
    /// is not a single simple statement moves out of the slot.
    fn rewrite_slot(&mut self, stmt: &Statement<'a>, slot: Slot) -> Result<Relocated<'a>, RewriteError> {
        let (plan, span) = match *stmt {
            Statement::Assign(assign) => (self.plan_assignment(assign)?, assign.span),
            Statement::IncDec(inc_dec) if !inc_dec.target.is_call_free() => {
                (self.plan_inc_dec(inc_dec)?, inc_dec.span)
            }
            Statement::IncDec(inc_dec) => {
                let desugared =
                    CompoundAssignmentDesugaring::new(self.arena()).desugar_inc_dec(inc_dec);
                return self.rewrite_slot(&desugared, slot);
            }
            Statement::Expression(expr) => {
                return Ok(Relocated {
                    slot: Some(Statement::Expression(self.value(&expr)?.expr)),
                    ..Relocated::default()
                })
            }
            _ => {
                return Ok(Relocated {
                    slot: Some(*stmt),
                    ..Relocated::default()
                })
            }
        };

        if !plan.writes_fields() {
            return Ok(Relocated {
                slot: plan.plain,
                ..Relocated::default()
            });
        }

        let relocation_error = |reason: &str| RewriteError::Relocation {
            method: self.method.to_string(),
            reason: format!("{} in an {}", reason, slot.describe()),
            span,
        };
        let empty = Statement::Empty(span);
        match slot {
            Slot::IfInit { else_if: true } => Err(relocation_error(
                "field writes cannot be moved out of the branch they initialize",
            )),
            Slot::ForPost if plan.plain_reads_temps => {
                let mut after = Vec::new();
                after.extend(plan.bindings);
                after.extend(plan.plain);
                after.extend(plan.mutators);
                Ok(Relocated {
                    slot: Some(empty),
                    before: Vec::new(),
                    after,
                })
            }
            Slot::ForPost => {
                let mut after = Vec::new();
                after.extend(plan.bindings);
                after.extend(plan.mutators);
                Ok(Relocated {
                    slot: Some(plan.plain.unwrap_or(empty)),
                    before: Vec::new(),
                    after,
                })
            }
            Slot::IfInit { else_if: false } | Slot::ForInit | Slot::SwitchInit => {
                let mut before = Vec::new();
                before.extend(plan.bindings);
                before.extend(plan.mutators);
                Ok(Relocated {
                    slot: Some(plan.plain.unwrap_or(empty)),
                    before,
                    after: Vec::new(),
                })
            }
        }
    }

    fn rewrite_if(
        &mut self,
        if_stmt: &'a IfStatement<'a>,
        else_if: bool,
    ) -> Result<(Vec<Statement<'a>>, Statement<'a>), RewriteError> {
        self.scoped(|this| this.rewrite_if_scoped(if_stmt, else_if))
    }

    fn rewrite_if_scoped(
        &mut self,
        if_stmt: &'a IfStatement<'a>,
        else_if: bool,
    ) -> Result<(Vec<Statement<'a>>, Statement<'a>), RewriteError> {
        let mut before = Vec::new();
        let init = match &if_stmt.init {
            Some(init) => {
                let relocated = self.rewrite_slot(init, Slot::IfInit { else_if })?;
                self.oracle.declare(init);
                before = relocated.before;
                relocated.slot
            }
            None => None,
        };
        let condition = self.value(&if_stmt.condition)?.expr;
        let then_block = self.rewrite_block(&if_stmt.then_block)?;
        let else_branch = match if_stmt.else_branch {
            Some(Statement::If(nested)) => {
                let (_, rewritten) = self.rewrite_if(nested, true)?;
                Some(rewritten)
            }
            Some(Statement::Block(block)) => Some(Statement::Block(self.rewrite_block(&block)?)),
            other => other,
        };

        let new_if = IfStatement {
            init,
            condition,
            then_block,
            else_branch,
            span: if_stmt.span,
        };
        if new_if == *if_stmt {
            return Ok((before, Statement::If(if_stmt)));
        }
        Ok((before, Statement::If(self.arena().alloc(new_if))))
    }

    fn rewrite_for(
        &mut self,
        for_stmt: &'a ForStatement<'a>,
    ) -> Result<(Vec<Statement<'a>>, Statement<'a>), RewriteError> {
        self.scoped(|this| this.rewrite_for_scoped(for_stmt))
    }

    fn rewrite_for_scoped(
        &mut self,
        for_stmt: &'a ForStatement<'a>,
    ) -> Result<(Vec<Statement<'a>>, Statement<'a>), RewriteError> {
        let mut before = Vec::new();
        let init = match &for_stmt.init {
            Some(init) => {
                let relocated = self.rewrite_slot(init, Slot::ForInit)?;
                self.oracle.declare(init);
                before = relocated.before;
                relocated.slot
            }
            None => None,
        };
        let condition = match &for_stmt.condition {
            Some(condition) => Some(self.value(condition)?.expr),
            None => None,
        };
        let mut after = Vec::new();
        let post = match &for_stmt.post {
            Some(post) => {
                let relocated = self.rewrite_slot(post, Slot::ForPost)?;
                after = relocated.after;
                relocated.slot
            }
            None => None,
        };
        if !after.is_empty() && placement::continues_enclosing_loop(for_stmt.body.statements) {
            return Err(RewriteError::Relocation {
                method: self.method.to_string(),
                reason: "the loop body continues past the relocated post statement".to_string(),
                span: for_stmt.post.map_or(for_stmt.span, |post| post.span()),
            });
        }

        let mut body = self.rewrite_block(&for_stmt.body)?;
        if !after.is_empty() {
            let mut statements = body.statements.to_vec();
            statements.extend(after);
            body.statements = self.arena().alloc_slice_copy(&statements);
        }

        let new_for = ForStatement {
            init,
            condition,
            post,
            body,
            span: for_stmt.span,
        };
        if new_for == *for_stmt {
            return Ok((before, Statement::For(for_stmt)));
        }
        Ok((before, Statement::For(self.arena().alloc(new_for))))
    }

    /// The range expression is evaluated outside the loop scope, where the
    /// key and value variables are not yet declared.
    fn rewrite_range(&mut self, range: &'a RangeStatement<'a>) -> Result<Statement<'a>, RewriteError> {
        let iterable = self.value(&range.iterable)?;
        self.scoped(|this| {
            this.oracle.declare(&Statement::Range(range));
            this.rewrite_range_scoped(range, iterable)
        })
    }

    fn rewrite_range_scoped(
        &mut self,
        range: &'a RangeStatement<'a>,
        iterable: Typed<'a>,
    ) -> Result<Statement<'a>, RewriteError> {
        if range.define {
            let body = self.rewrite_block(&range.body)?;
            if !iterable.changed && body == range.body {
                return Ok(Statement::Range(range));
            }
            return Ok(Statement::Range(self.arena().alloc(RangeStatement {
                iterable: iterable.expr,
                body,
                ..*range
            })));
        }

        let key = range.key.map(|key| self.target(&key)).transpose()?;
        let value = range.value.map(|value| self.target(&value)).transpose()?;
        let has_field = [&key, &value]
            .into_iter()
            .flatten()
            .any(|target| matches!(target, Target::Field { .. }));

        if !has_field {
            let plain = |target: Option<Target<'r, 'a>>, original: Option<Expression<'a>>| {
                match target {
                    Some(Target::Plain(expr)) => Some(expr),
                    _ => original,
                }
            };
            let key = plain(key, range.key);
            let value = plain(value, range.value);
            let body = self.rewrite_block(&range.body)?;
            let new_range = RangeStatement {
                key,
                value,
                iterable: iterable.expr,
                body,
                ..*range
            };
            if new_range == *range {
                return Ok(Statement::Range(range));
            }
            return Ok(Statement::Range(self.arena().alloc(new_range)));
        }

        let (key_ty, value_ty) = self.range_element_types(&iterable);
        let b = self.b.at(range.span);
        let mut prelude = Vec::new();
        let mut bind = |this: &mut Self,
                        target: Option<Target<'r, 'a>>,
                        ty: Option<StaticType<'a>>|
         -> Result<Option<Expression<'a>>, RewriteError> {
            let binding = match target {
                None => None,
                Some(Target::Blank) => Some(b.ident("_")),
                Some(Target::Plain(expr)) => {
                    let temp = this.temps.fresh(assign::name_hint(&expr));
                    prelude.push(b.assign(&[expr], &[b.ident(&temp)]));
                    Some(b.ident(&temp))
                }
                Some(Target::Field { receiver, info }) => {
                    let temp = this.temps.fresh(info.name());
                    let source = Typed::new(b.ident(&temp), ty);
                    this.check_assignable(info, &source, range.span)?;
                    prelude.push(this.mutator_call(b, receiver, info, source));
                    Some(b.ident(&temp))
                }
            };
            Ok(binding)
        };
        let new_key = bind(self, key, key_ty)?;
        let new_value = bind(self, value, value_ty)?;

        let body = self.rewrite_block(&range.body)?;
        prelude.extend_from_slice(body.statements);
        Ok(Statement::Range(self.arena().alloc(RangeStatement {
            key: new_key,
            value: new_value,
            define: true,
            iterable: iterable.expr,
            body: Block {
                statements: self.arena().alloc_slice_copy(&prelude),
                span: body.span,
            },
            span: range.span,
        })))
    }

    fn range_element_types(
        &self,
        iterable: &Typed<'a>,
    ) -> (Option<StaticType<'a>>, Option<StaticType<'a>>) {
        match iterable.ty.and_then(|ty| ty.known()) {
            Some(&TypeExpr::Slice(elem)) => {
                (Some(StaticType::Known(&INT)), Some(StaticType::Known(elem)))
            }
            Some(&TypeExpr::Map(key, value)) => {
                (Some(StaticType::Known(key)), Some(StaticType::Known(value)))
            }
            _ => (None, None),
        }
    }

    fn rewrite_switch(
        &mut self,
        switch: &'a SwitchStatement<'a>,
    ) -> Result<(Vec<Statement<'a>>, Statement<'a>), RewriteError> {
        self.scoped(|this| this.rewrite_switch_scoped(switch))
    }

    fn rewrite_switch_scoped(
        &mut self,
        switch: &'a SwitchStatement<'a>,
    ) -> Result<(Vec<Statement<'a>>, Statement<'a>), RewriteError> {
        let mut before = Vec::new();
        let init = match &switch.init {
            Some(init) => {
                let relocated = self.rewrite_slot(init, Slot::SwitchInit)?;
                self.oracle.declare(init);
                before = relocated.before;
                relocated.slot
            }
            None => None,
        };
        let tag = match &switch.tag {
            Some(tag) => Some(self.value(tag)?.expr),
            None => None,
        };
        let mut cases = Vec::with_capacity(switch.cases.len());
        for case in switch.cases {
            let values = self.values(case.values)?;
            let body = self.scoped(|this| this.rewrite_statements(case.body))?;
            cases.push(SwitchCase {
                values: self.alloc_exprs(&values),
                body: self.arena().alloc_slice_copy(&body),
                span: case.span,
            });
        }

        let new_switch = SwitchStatement {
            init,
            tag,
            cases: self.arena().alloc_slice_copy(&cases),
            span: switch.span,
        };
        if new_switch == *switch {
            return Ok((before, Statement::Switch(switch)));
        }
        Ok((before, Statement::Switch(self.arena().alloc(new_switch))))
    }
}
