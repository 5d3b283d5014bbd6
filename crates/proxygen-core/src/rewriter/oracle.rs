//! Static type queries the rewriter needs, behind a narrow trait.

use crate::ast::types::{BOOL, INT};
use crate::ast::{
    AssignOp, BinaryOp, Block, Expression, ExpressionKind, FuncDecl, Literal, StaticType,
    Statement, TypeExpr, UnaryOp,
};
use crate::classifier::FieldCatalog;
use bumpalo::Bump;
use rustc_hash::FxHashMap;

const CONVERSION_TYPES: &[&str] = &[
    "bool", "string", "int", "int8", "int16", "int32", "int64", "uint", "uint8", "uint16",
    "uint32", "uint64", "byte", "rune", "float32", "float64",
];

pub trait TypeOracle<'a> {
    /// Static type of `expr`, `None` when it cannot be determined.
    fn type_of(&self, expr: &Expression<'a>) -> Option<StaticType<'a>>;

    /// Whether `member` on a value of type `base` denotes a schema field.
    fn is_field_selector(&self, base: &TypeExpr<'a>, member: &str) -> bool;

    /// Opens a block scope. Names declared until the matching `exit_scope`
    /// shadow outer ones.
    fn enter_scope(&mut self) {}

    fn exit_scope(&mut self) {}

    /// Records the names `stmt` declares in the innermost scope. Nested
    /// blocks of `stmt` are not entered.
    fn declare(&mut self, _stmt: &Statement<'a>) {}
}

/// Methods declared by users on entity wrappers, for call result types.
#[derive(Debug, Clone, Default)]
pub struct MethodTable<'a> {
    methods: FxHashMap<(&'a str, &'a str), &'a FuncDecl<'a>>,
}

impl<'a> MethodTable<'a> {
    pub fn from_methods(methods: &[&'a FuncDecl<'a>]) -> Self {
        let methods = methods
            .iter()
            .filter_map(|method| Some(((method.receiver_entity()?, method.name), *method)))
            .collect();
        Self { methods }
    }

    pub fn get(&self, entity: &str, name: &str) -> Option<&'a FuncDecl<'a>> {
        self.methods.get(&(entity, name)).copied()
    }

    /// The result type of a single-result method.
    pub fn result_type(&self, entity: &str, name: &str) -> Option<&'a TypeExpr<'a>> {
        match self.get(entity, name)?.results {
            [result] => Some(result),
            _ => None,
        }
    }
}

/// Names visible in one block. `None` marks a local of unknown type, which
/// still hides an outer binding of the same name.
type BlockScope<'a> = FxHashMap<&'a str, Option<&'a TypeExpr<'a>>>;

/// Answers type queries for one method from its receiver, parameters and
/// local bindings, the schema, and the user methods of every entity.
///
/// Locals are block scoped. The rewriter opens and closes scopes as it
/// walks the body and declares each statement after rewriting it, so an
/// identifier resolves to its innermost visible declaration.
pub struct SchemaTypeOracle<'c, 'a> {
    catalog: &'c FieldCatalog<'a>,
    methods: &'c MethodTable<'a>,
    scopes: Vec<BlockScope<'a>>,
    bound: Vec<&'a TypeExpr<'a>>,
    arena: &'a Bump,
}

impl<'c, 'a> SchemaTypeOracle<'c, 'a> {
    pub fn for_method(
        method: &FuncDecl<'a>,
        catalog: &'c FieldCatalog<'a>,
        methods: &'c MethodTable<'a>,
        arena: &'a Bump,
    ) -> Self {
        let mut oracle = Self {
            catalog,
            methods,
            scopes: vec![BlockScope::default()],
            bound: Vec::new(),
            arena,
        };
        if let Some(receiver) = method.receiver {
            oracle.bind(receiver.name, Some(receiver.ty));
        }
        for param in method.params {
            oracle.bind(param.name, Some(param.ty));
        }
        oracle.survey_block(&method.body);
        oracle
    }

    /// Types of every named binding anywhere in the method, receiver and
    /// parameters included.
    pub fn bound_types(&self) -> impl Iterator<Item = &'a TypeExpr<'a>> + '_ {
        self.bound.iter().copied()
    }

    fn bind(&mut self, name: &'a str, ty: Option<&'a TypeExpr<'a>>) {
        if name == "_" {
            return;
        }
        if let Some(ty) = ty {
            self.bound.push(ty);
        }
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name, ty);
        }
    }

    fn lookup(&self, name: &str) -> Option<&'a TypeExpr<'a>> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .copied()
            .flatten()
    }

    /// Walks the whole body once so `bound_types` covers nested blocks.
    /// Leaves only the method scope open.
    fn survey_block(&mut self, block: &Block<'a>) {
        self.enter_scope();
        for stmt in block.statements {
            self.survey_statement(stmt);
        }
        self.exit_scope();
    }

    fn survey_header(&mut self, init: &Option<Statement<'a>>) {
        if let Some(init) = init {
            self.declare(init);
        }
    }

    fn survey_statement(&mut self, stmt: &Statement<'a>) {
        match stmt {
            Statement::Block(block) => self.survey_block(block),
            Statement::If(if_stmt) => {
                self.enter_scope();
                self.survey_header(&if_stmt.init);
                self.survey_block(&if_stmt.then_block);
                if let Some(else_branch) = &if_stmt.else_branch {
                    self.survey_statement(else_branch);
                }
                self.exit_scope();
            }
            Statement::For(for_stmt) => {
                self.enter_scope();
                self.survey_header(&for_stmt.init);
                self.survey_block(&for_stmt.body);
                self.exit_scope();
            }
            Statement::Range(range) => {
                self.enter_scope();
                self.declare(stmt);
                self.survey_block(&range.body);
                self.exit_scope();
            }
            Statement::Switch(switch) => {
                self.enter_scope();
                self.survey_header(&switch.init);
                for case in switch.cases {
                    self.enter_scope();
                    for stmt in case.body {
                        self.survey_statement(stmt);
                    }
                    self.exit_scope();
                }
                self.exit_scope();
            }
            _ => self.declare(stmt),
        }
    }

    /// Types bound by `targets := values`, one per target.
    fn define_types(
        &self,
        targets: usize,
        values: &[Expression<'a>],
    ) -> Vec<Option<&'a TypeExpr<'a>>> {
        if values.len() == targets {
            return values.iter().map(|v| self.defaulted_type(v)).collect();
        }
        if let [value] = values {
            match value.kind {
                // v, ok := m[k]
                ExpressionKind::Index(..) if targets == 2 => {
                    return vec![self.defaulted_type(value), Some(&BOOL)];
                }
                ExpressionKind::Call(call) => {
                    if let Some(func) = self.called_method(&call.callee) {
                        if func.results.len() == targets {
                            return func.results.iter().map(Some).collect();
                        }
                    }
                }
                _ => {}
            }
        }
        vec![None; targets]
    }

    fn defaulted_type(&self, expr: &Expression<'a>) -> Option<&'a TypeExpr<'a>> {
        self.type_of(expr)?.defaulted()
    }

    /// Key and value types of `for k, v := range iterable`.
    pub fn range_types(
        &self,
        iterable: &Expression<'a>,
    ) -> (Option<&'a TypeExpr<'a>>, Option<&'a TypeExpr<'a>>) {
        match self.type_of(iterable).and_then(|ty| ty.known()) {
            Some(&TypeExpr::Slice(elem)) => (Some(&INT), Some(elem)),
            Some(&TypeExpr::Map(key, value)) => (Some(key), Some(value)),
            Some(TypeExpr::Named("string")) => (
                Some(&INT),
                Some(self.arena.alloc(TypeExpr::Named("rune"))),
            ),
            Some(ty) if ty.is_integer() => (Some(ty), None),
            _ => (None, None),
        }
    }

    fn entity_of(&self, expr: &Expression<'a>) -> Option<&'a str> {
        let ty = self.type_of(expr)?.known()?;
        let entity = ty.named_target()?;
        self.catalog.contains_entity(entity).then_some(entity)
    }

    fn called_method(&self, callee: &Expression<'a>) -> Option<&'a FuncDecl<'a>> {
        let (base, member) = callee.as_selector()?;
        self.methods.get(self.entity_of(base)?, member)
    }

    fn call_type(&self, expr: &Expression<'a>) -> Option<StaticType<'a>> {
        let ExpressionKind::Call(call) = expr.kind else {
            return None;
        };
        match call.callee.kind {
            ExpressionKind::Selector(base, member) => {
                let entity = self.entity_of(base)?;
                if let Some(result) = self.methods.result_type(entity, member) {
                    return Some(StaticType::Known(result));
                }
                // Calls to generated accessors.
                let fields = self.catalog.entity(entity)?;
                fields
                    .fields
                    .values()
                    .find(|info| info.accessor == member)
                    .and_then(|info| info.declared_type)
                    .map(StaticType::Known)
            }
            ExpressionKind::Identifier("len") | ExpressionKind::Identifier("cap") => {
                Some(StaticType::Known(&INT))
            }
            ExpressionKind::Identifier("append") => self.type_of(call.args.first()?),
            ExpressionKind::Identifier("make") | ExpressionKind::Identifier("new") => {
                match call.args.first()?.kind {
                    ExpressionKind::Type(ty) => Some(StaticType::Known(ty)),
                    _ => None,
                }
            }
            ExpressionKind::Identifier(name) if CONVERSION_TYPES.contains(&name) => {
                Some(StaticType::Known(self.arena.alloc(TypeExpr::Named(name))))
            }
            ExpressionKind::Paren(inner) => match inner.kind {
                ExpressionKind::Type(ty) => Some(StaticType::Known(ty)),
                _ => None,
            },
            _ => None,
        }
    }

    fn binary_type(
        &self,
        op: BinaryOp,
        left: &Expression<'a>,
        right: &Expression<'a>,
    ) -> Option<StaticType<'a>> {
        let left_ty = self.type_of(left);
        let right_ty = self.type_of(right);
        if op.is_comparison() {
            return Some(StaticType::UntypedBool);
        }
        if op.is_logical() {
            return match (left_ty, right_ty) {
                (Some(StaticType::Known(_)), _) | (_, Some(StaticType::Known(_))) => {
                    Some(StaticType::Known(&BOOL))
                }
                _ => Some(StaticType::UntypedBool),
            };
        }
        if op.is_shift() {
            return left_ty;
        }
        match (left_ty, right_ty) {
            (Some(known @ StaticType::Known(_)), _) | (_, Some(known @ StaticType::Known(_))) => {
                Some(known)
            }
            (Some(left), Some(right)) => Some(untyped_rank(left, right)),
            _ => None,
        }
    }
}

/// Kind of an untyped constant expression mixing two untyped operands.
fn untyped_rank<'a>(left: StaticType<'a>, right: StaticType<'a>) -> StaticType<'a> {
    match (left, right) {
        (StaticType::UntypedFloat, _) | (_, StaticType::UntypedFloat) => StaticType::UntypedFloat,
        (StaticType::UntypedString, _) | (_, StaticType::UntypedString) => {
            StaticType::UntypedString
        }
        (left, _) => left,
    }
}

impl<'c, 'a> TypeOracle<'a> for SchemaTypeOracle<'c, 'a> {
    fn type_of(&self, expr: &Expression<'a>) -> Option<StaticType<'a>> {
        match expr.kind {
            ExpressionKind::Identifier(name) => self.lookup(name).map(StaticType::Known),
            ExpressionKind::Literal(literal) => Some(match literal {
                Literal::Int(_) => StaticType::UntypedInt,
                Literal::Float(_) => StaticType::UntypedFloat,
                Literal::String(_) => StaticType::UntypedString,
                Literal::Bool(_) => StaticType::UntypedBool,
                Literal::Nil => StaticType::UntypedNil,
            }),
            ExpressionKind::Selector(base, member) => {
                let entity = self.entity_of(base)?;
                self.catalog
                    .field(entity, member)?
                    .declared_type
                    .map(StaticType::Known)
            }
            ExpressionKind::Call(_) => self.call_type(expr),
            ExpressionKind::Index(base, _) => match self.type_of(base)?.known()? {
                &TypeExpr::Slice(elem) => Some(StaticType::Known(elem)),
                &TypeExpr::Map(_, value) => Some(StaticType::Known(value)),
                TypeExpr::Named("string") => {
                    Some(StaticType::Known(self.arena.alloc(TypeExpr::Named("byte"))))
                }
                _ => None,
            },
            ExpressionKind::Binary(op, left, right) => self.binary_type(op, left, right),
            ExpressionKind::Unary(op, operand) => {
                let operand_ty = self.type_of(operand);
                match op {
                    UnaryOp::AddressOf => {
                        let ty = operand_ty?.known()?;
                        Some(StaticType::Known(self.arena.alloc(TypeExpr::Pointer(ty))))
                    }
                    UnaryOp::Deref => match operand_ty?.known()? {
                        &TypeExpr::Pointer(inner) => Some(StaticType::Known(inner)),
                        _ => None,
                    },
                    UnaryOp::Not => match operand_ty {
                        Some(StaticType::Known(_)) => Some(StaticType::Known(&BOOL)),
                        _ => Some(StaticType::UntypedBool),
                    },
                    UnaryOp::Negate | UnaryOp::Plus | UnaryOp::BitwiseNot => operand_ty,
                }
            }
            ExpressionKind::Paren(inner) => self.type_of(inner),
            ExpressionKind::Composite(ty, _) => Some(StaticType::Known(ty)),
            ExpressionKind::Type(_) => None,
        }
    }

    fn is_field_selector(&self, base: &TypeExpr<'a>, member: &str) -> bool {
        base.named_target()
            .is_some_and(|entity| self.catalog.field(entity, member).is_some())
    }

    fn enter_scope(&mut self) {
        self.scopes.push(BlockScope::default());
    }

    fn exit_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    fn declare(&mut self, stmt: &Statement<'a>) {
        match stmt {
            Statement::Var(var) => {
                for (i, name) in var.names.iter().enumerate() {
                    let ty = var
                        .ty
                        .or_else(|| var.values.get(i).and_then(|v| self.defaulted_type(v)));
                    self.bind(*name, ty);
                }
            }
            Statement::Assign(assign) if assign.op == AssignOp::Define => {
                let types = self.define_types(assign.targets.len(), assign.values);
                for (target, ty) in assign.targets.iter().zip(types) {
                    if let Some(name) = target.as_identifier() {
                        self.bind(name, ty);
                    }
                }
            }
            Statement::Range(range) if range.define => {
                let (key_ty, value_ty) = self.range_types(&range.iterable);
                if let Some(name) = range.key.and_then(|k| k.as_identifier()) {
                    self.bind(name, key_ty);
                }
                if let Some(name) = range.value.and_then(|v| v.as_identifier()) {
                    self.bind(name, value_ty);
                }
            }
            _ => {}
        }
    }
}
