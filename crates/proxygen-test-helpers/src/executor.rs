//! Tree-walking interpreter for generated declarations
//!
//! Runs rewritten methods and synthesized accessors against an in-memory
//! record store, and runs the untouched originals against plain objects, so
//! tests can check that a rewrite keeps the observable behavior of a method.

use indexmap::IndexMap;
use proxygen_core::ast::{
    AssignOp, BinaryOp, Block, CallExpression, Declaration, Expression, ExpressionKind, FuncDecl,
    Literal, Statement, TypeDeclKind, TypeExpr, UnaryOp,
};
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

const MAX_CALL_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecError {
    #[error("panic: {0}")]
    Panic(String),
    #[error("undefined: {0}")]
    Undefined(String),
    #[error("{ty} has no field or method {name}")]
    NoMember { ty: String, name: String },
    #[error("invalid memory address or nil pointer dereference")]
    NilDereference,
    #[error("index out of range [{index}] with length {len}")]
    IndexOutOfRange { index: i64, len: usize },
    #[error("type error: {0}")]
    Type(String),
    #[error("unsupported: {0}")]
    Unsupported(String),
    #[error("call depth exceeded")]
    StackOverflow,
}

pub type ExecResult<T> = Result<T, ExecError>;

/// A record in the fake store: scalar data by key, and expanded relations.
#[derive(Debug, Clone, Default)]
pub struct FakeRecord {
    pub id: String,
    pub collection: String,
    pub data: IndexMap<String, Value>,
    pub expand: IndexMap<String, Value>,
}

impl FakeRecord {
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            collection: collection.into(),
            ..Self::default()
        }
    }

    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn with_expand(mut self, key: impl Into<String>, value: Value) -> Self {
        self.expand.insert(key.into(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn into_value(self) -> Value {
        Value::Record(Rc::new(RefCell::new(self)))
    }
}

/// A struct behind a pointer. Wrapper types keep their record in `Record`.
#[derive(Debug, Clone, Default)]
pub struct Object {
    pub ty: String,
    pub fields: IndexMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MapKey {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl MapKey {
    fn from_value(value: &Value) -> ExecResult<Self> {
        match value {
            Value::Bool(b) => Ok(MapKey::Bool(*b)),
            Value::Int(i) => Ok(MapKey::Int(*i)),
            Value::Str(s) => Ok(MapKey::Str(s.clone())),
            other => Err(ExecError::Type(format!("invalid map key {}", other))),
        }
    }

    fn into_value(self) -> Value {
        match self {
            MapKey::Bool(b) => Value::Bool(b),
            MapKey::Int(i) => Value::Int(i),
            MapKey::Str(s) => Value::Str(s),
        }
    }
}

pub type MapRef = Rc<RefCell<IndexMap<MapKey, Value>>>;

#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Slice(Vec<Value>),
    Map(MapRef),
    Record(Rc<RefCell<FakeRecord>>),
    Object(Rc<RefCell<Object>>),
}

impl Value {
    pub fn slice(values: impl IntoIterator<Item = Value>) -> Self {
        Value::Slice(values.into_iter().collect())
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_slice(&self) -> Option<&[Value]> {
        match self {
            Value::Slice(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Field of a pointed-to object.
    pub fn field(&self, name: &str) -> Option<Value> {
        match self {
            Value::Object(object) => object.borrow().fields.get(name).cloned(),
            _ => None,
        }
    }

    /// The record itself, or the record a wrapper object embeds.
    pub fn record(&self) -> Option<Rc<RefCell<FakeRecord>>> {
        match self {
            Value::Record(record) => Some(record.clone()),
            Value::Object(object) => match object.borrow().fields.get("Record") {
                Some(Value::Record(record)) => Some(record.clone()),
                _ => None,
            },
            _ => None,
        }
    }

    /// Same pointer, for records and objects.
    pub fn same_ref(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Record(a), Value::Record(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Map(a), Value::Map(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    fn type_name(&self) -> String {
        match self {
            Value::Nil => "nil".into(),
            Value::Bool(_) => "bool".into(),
            Value::Int(_) => "int".into(),
            Value::Float(_) => "float64".into(),
            Value::Str(_) => "string".into(),
            Value::Slice(_) => "slice".into(),
            Value::Map(_) => "map".into(),
            Value::Record(_) => "*core.Record".into(),
            Value::Object(object) => format!("*{}", object.borrow().ty),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(_) | Value::Int(_), Value::Float(_) | Value::Int(_)) => {
                self.as_float() == other.as_float()
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Slice(a), Value::Slice(b)) => a == b,
            (Value::Slice(items), Value::Nil) | (Value::Nil, Value::Slice(items)) => {
                items.is_empty()
            }
            _ => self.same_ref(other),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Slice(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Map(map) => write!(f, "map[{} entries]", map.borrow().len()),
            Value::Record(record) => write!(f, "&Record{{{}}}", record.borrow().id),
            Value::Object(object) => write!(f, "&{}{{...}}", object.borrow().ty),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

/// An assignable location whose operands are already evaluated.
enum Place<'a> {
    Blank,
    Variable(&'a str),
    Field(Rc<RefCell<Object>>, &'a str),
    Element(Box<Place<'a>>, Value),
    /// A non-addressable container such as a call result.
    Value(Value),
}

enum Flow {
    Normal,
    Break,
    Continue,
    Return(Vec<Value>),
}

type Scope = FxHashMap<String, Value>;

pub struct Executor<'a> {
    methods: FxHashMap<&'a str, FxHashMap<&'a str, &'a FuncDecl<'a>>>,
    functions: FxHashMap<&'a str, &'a FuncDecl<'a>>,
    types: FxHashMap<&'a str, TypeDeclKind<'a>>,
    globals: Scope,
    scopes: Vec<Scope>,
    depth: usize,
}

impl<'a> Executor<'a> {
    /// Loads declarations: functions and methods, types, `iota` constants,
    /// then package variables in order.
    pub fn new(declarations: &[Declaration<'a>]) -> ExecResult<Self> {
        let mut executor = Self {
            methods: FxHashMap::default(),
            functions: FxHashMap::default(),
            types: FxHashMap::default(),
            globals: Scope::default(),
            scopes: Vec::new(),
            depth: 0,
        };
        for declaration in declarations {
            match declaration {
                Declaration::Func(func) => executor.add_function(func),
                Declaration::Type(ty) => {
                    executor.types.insert(ty.name, ty.kind);
                }
                Declaration::Const(group) => {
                    for (ordinal, name) in group.names.iter().enumerate() {
                        executor
                            .globals
                            .insert(name.to_string(), Value::Int(ordinal as i64));
                    }
                }
                Declaration::Var(_) => {}
            }
        }
        for declaration in declarations {
            if let Declaration::Var(var) = declaration {
                executor.scopes.push(Scope::default());
                let value = executor.eval(&var.value);
                executor.scopes.clear();
                executor.globals.insert(var.name.to_string(), value?);
            }
        }
        Ok(executor)
    }

    /// Adds or replaces a function or method.
    pub fn add_function(&mut self, func: &'a FuncDecl<'a>) {
        match func.receiver_entity() {
            Some(entity) => {
                self.methods
                    .entry(entity)
                    .or_default()
                    .insert(func.name, func);
            }
            None => {
                self.functions.insert(func.name, func);
            }
        }
    }

    pub fn has_method(&self, ty: &str, name: &str) -> bool {
        self.method(ty, name).is_some()
    }

    fn method(&self, ty: &str, name: &str) -> Option<&'a FuncDecl<'a>> {
        self.methods.get(ty).and_then(|methods| methods.get(name)).copied()
    }

    pub fn global(&self, name: &str) -> Option<&Value> {
        self.globals.get(name)
    }

    /// A plain struct pointer, as the original methods expect.
    pub fn new_object(&self, ty: &str, fields: Vec<(&str, Value)>) -> Value {
        Value::Object(Rc::new(RefCell::new(Object {
            ty: ty.to_string(),
            fields: fields
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        })))
    }

    /// A wrapper pointer embedding `record`.
    pub fn new_proxy(&self, entity: &str, record: FakeRecord) -> Value {
        self.new_object(entity, vec![("Record", record.into_value())])
    }

    pub fn call_method(
        &mut self,
        receiver: &Value,
        name: &str,
        args: Vec<Value>,
    ) -> ExecResult<Vec<Value>> {
        self.dispatch_method(receiver.clone(), name, args)
    }

    pub fn call_function(&mut self, name: &str, args: Vec<Value>) -> ExecResult<Vec<Value>> {
        let func = self
            .functions
            .get(name)
            .copied()
            .ok_or_else(|| ExecError::Undefined(name.to_string()))?;
        self.invoke(func, None, args)
    }

    fn invoke(
        &mut self,
        func: &'a FuncDecl<'a>,
        receiver: Option<Value>,
        args: Vec<Value>,
    ) -> ExecResult<Vec<Value>> {
        if args.len() != func.params.len() {
            return Err(ExecError::Type(format!(
                "{} takes {} arguments, got {}",
                func.name,
                func.params.len(),
                args.len()
            )));
        }
        if self.depth >= MAX_CALL_DEPTH {
            return Err(ExecError::StackOverflow);
        }

        let mut frame = Scope::default();
        if let (Some(param), Some(value)) = (func.receiver, receiver) {
            frame.insert(param.name.to_string(), value);
        }
        for (param, value) in func.params.iter().zip(args) {
            frame.insert(param.name.to_string(), value);
        }

        let saved = std::mem::replace(&mut self.scopes, vec![frame]);
        self.depth += 1;
        let flow = self.exec_statements(func.body.statements);
        self.depth -= 1;
        self.scopes = saved;

        match flow? {
            Flow::Return(values) => Ok(values),
            _ => Ok(Vec::new()),
        }
    }

    // Scopes

    fn lookup(&self, name: &str) -> Option<&Value> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .or_else(|| self.globals.get(name))
    }

    fn lookup_mut(&mut self, name: &str) -> Option<&mut Value> {
        let Executor {
            scopes, globals, ..
        } = self;
        match scopes.iter_mut().rev().find(|scope| scope.contains_key(name)) {
            Some(scope) => scope.get_mut(name),
            None => globals.get_mut(name),
        }
    }

    fn define(&mut self, name: &str, value: Value) {
        if name == "_" {
            return;
        }
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), value);
        }
    }

    fn scoped<T>(&mut self, f: impl FnOnce(&mut Self) -> ExecResult<T>) -> ExecResult<T> {
        self.scopes.push(Scope::default());
        let result = f(self);
        self.scopes.pop();
        result
    }

    // Statements

    fn exec_block(&mut self, block: &Block<'a>) -> ExecResult<Flow> {
        self.scoped(|ex| ex.exec_statements(block.statements))
    }

    fn exec_statements(&mut self, statements: &[Statement<'a>]) -> ExecResult<Flow> {
        for statement in statements {
            match self.exec(statement)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec(&mut self, statement: &Statement<'a>) -> ExecResult<Flow> {
        match statement {
            Statement::Empty(_) => {}
            Statement::Expression(expr) => {
                self.eval_multi(expr)?;
            }
            Statement::Assign(assign) => {
                if let AssignOp::Compound(op) = assign.op {
                    let [target] = assign.targets else {
                        return Err(ExecError::Unsupported("multi-target op=".into()));
                    };
                    let [value] = assign.values else {
                        return Err(ExecError::Unsupported("multi-value op=".into()));
                    };
                    let place = self.resolve_place(target)?;
                    let current = self.read_place(&place)?;
                    let value = self.eval(value)?;
                    let result = binary(op, current, value)?;
                    self.store(&place, result)?;
                    return Ok(Flow::Normal);
                }

                if assign.op == AssignOp::Define {
                    let values = self.eval_values(assign.values, assign.targets.len())?;
                    for (target, value) in assign.targets.iter().zip(values) {
                        let Some(name) = target.as_identifier() else {
                            return Err(ExecError::Type("non-name on left side of :=".into()));
                        };
                        self.define(name, value);
                    }
                    return Ok(Flow::Normal);
                }

                // Target operands are evaluated before the right-hand side.
                let places = assign
                    .targets
                    .iter()
                    .map(|target| self.resolve_place(target))
                    .collect::<ExecResult<Vec<_>>>()?;
                let values = self.eval_values(assign.values, assign.targets.len())?;
                for (place, value) in places.iter().zip(values) {
                    self.store(place, value)?;
                }
            }
            Statement::IncDec(inc_dec) => {
                let place = self.resolve_place(&inc_dec.target)?;
                let current = self.read_place(&place)?;
                let op = if inc_dec.increment {
                    BinaryOp::Add
                } else {
                    BinaryOp::Subtract
                };
                let result = binary(op, current, Value::Int(1))?;
                self.store(&place, result)?;
            }
            Statement::Var(var) => {
                let values = if var.values.is_empty() {
                    let zero = var.ty.map(|ty| self.zero_value(ty)).unwrap_or(Value::Nil);
                    vec![zero; var.names.len()]
                } else {
                    self.eval_values(var.values, var.names.len())?
                };
                for (name, value) in var.names.iter().zip(values) {
                    self.define(name, value);
                }
            }
            Statement::Block(block) => return self.exec_block(block),
            Statement::If(if_stmt) => {
                return self.scoped(|ex| {
                    if let Some(init) = &if_stmt.init {
                        ex.exec(init)?;
                    }
                    if ex.truthy(&if_stmt.condition)? {
                        ex.exec_block(&if_stmt.then_block)
                    } else if let Some(else_branch) = &if_stmt.else_branch {
                        ex.exec(else_branch)
                    } else {
                        Ok(Flow::Normal)
                    }
                })
            }
            Statement::For(for_stmt) => {
                return self.scoped(|ex| {
                    if let Some(init) = &for_stmt.init {
                        ex.exec(init)?;
                    }
                    loop {
                        if let Some(condition) = &for_stmt.condition {
                            if !ex.truthy(condition)? {
                                break;
                            }
                        }
                        match ex.exec_block(&for_stmt.body)? {
                            Flow::Break => break,
                            Flow::Return(values) => return Ok(Flow::Return(values)),
                            Flow::Normal | Flow::Continue => {}
                        }
                        if let Some(post) = &for_stmt.post {
                            ex.exec(post)?;
                        }
                    }
                    Ok(Flow::Normal)
                })
            }
            Statement::Range(range) => {
                let iterable = self.eval(&range.iterable)?;
                let pairs: Vec<(Value, Value)> = match iterable {
                    Value::Slice(items) => items
                        .into_iter()
                        .enumerate()
                        .map(|(i, item)| (Value::Int(i as i64), item))
                        .collect(),
                    Value::Map(map) => map
                        .borrow()
                        .iter()
                        .map(|(key, value)| (key.clone().into_value(), value.clone()))
                        .collect(),
                    Value::Int(n) => (0..n).map(|i| (Value::Int(i), Value::Nil)).collect(),
                    Value::Nil => Vec::new(),
                    other => {
                        return Err(ExecError::Type(format!("cannot range over {}", other)))
                    }
                };
                for (key, value) in pairs {
                    let flow = self.scoped(|ex| {
                        for (binding, bound) in [(range.key, key), (range.value, value)] {
                            let Some(binding) = binding else { continue };
                            match (range.define, binding.as_identifier()) {
                                (true, Some(name)) => ex.define(name, bound),
                                _ => ex.assign_to(&binding, bound)?,
                            }
                        }
                        ex.exec_block(&range.body)
                    })?;
                    match flow {
                        Flow::Break => break,
                        Flow::Return(values) => return Ok(Flow::Return(values)),
                        Flow::Normal | Flow::Continue => {}
                    }
                }
            }
            Statement::Switch(switch) => {
                return self.scoped(|ex| {
                    if let Some(init) = &switch.init {
                        ex.exec(init)?;
                    }
                    let tag = match &switch.tag {
                        Some(tag) => ex.eval(tag)?,
                        None => Value::Bool(true),
                    };
                    let mut chosen = None;
                    'cases: for case in switch.cases {
                        for value in case.values {
                            if ex.eval(value)? == tag {
                                chosen = Some(case);
                                break 'cases;
                            }
                        }
                    }
                    let chosen =
                        chosen.or_else(|| switch.cases.iter().find(|case| case.values.is_empty()));
                    let Some(case) = chosen else {
                        return Ok(Flow::Normal);
                    };
                    match ex.scoped(|ex| ex.exec_statements(case.body))? {
                        Flow::Break => Ok(Flow::Normal),
                        flow => Ok(flow),
                    }
                })
            }
            Statement::Return(values, _) => {
                let values = match values {
                    [single] => self.eval_multi(single)?,
                    many => many
                        .iter()
                        .map(|value| self.eval(value))
                        .collect::<ExecResult<Vec<_>>>()?,
                };
                return Ok(Flow::Return(values));
            }
            Statement::Break(_) => return Ok(Flow::Break),
            Statement::Continue(_) => return Ok(Flow::Continue),
        }
        Ok(Flow::Normal)
    }

    /// Right-hand values for `wanted` targets: either one per target, or a
    /// single multi-valued call or comma-ok index.
    fn eval_values(
        &mut self,
        values: &[Expression<'a>],
        wanted: usize,
    ) -> ExecResult<Vec<Value>> {
        if let [single] = values {
            if wanted > 1 {
                let results = self.eval_multi(single)?;
                if results.len() != wanted {
                    return Err(ExecError::Type(format!(
                        "assignment mismatch: {} variables but {} values",
                        wanted,
                        results.len()
                    )));
                }
                return Ok(results);
            }
        }
        values.iter().map(|value| self.eval(value)).collect()
    }

    fn assign_to(&mut self, target: &Expression<'a>, value: Value) -> ExecResult<()> {
        let place = self.resolve_place(target)?;
        self.store(&place, value)
    }

    /// Evaluates the operands of an addressable expression, leaving the
    /// location itself to be written later.
    fn resolve_place(&mut self, expr: &Expression<'a>) -> ExecResult<Place<'a>> {
        match expr.kind {
            ExpressionKind::Identifier("_") => Ok(Place::Blank),
            ExpressionKind::Identifier(name) => Ok(Place::Variable(name)),
            ExpressionKind::Paren(inner) => self.resolve_place(inner),
            ExpressionKind::Selector(base, member) => match self.eval(base)? {
                Value::Object(object) => Ok(Place::Field(object, member)),
                Value::Nil => Err(ExecError::NilDereference),
                other => Err(ExecError::NoMember {
                    ty: other.type_name(),
                    name: member.to_string(),
                }),
            },
            ExpressionKind::Index(base, index) => {
                let container = match base.kind {
                    ExpressionKind::Identifier(_)
                    | ExpressionKind::Paren(_)
                    | ExpressionKind::Selector(..)
                    | ExpressionKind::Index(..) => self.resolve_place(base)?,
                    _ => Place::Value(self.eval(base)?),
                };
                let index = self.eval(index)?;
                Ok(Place::Element(Box::new(container), index))
            }
            _ => Err(ExecError::Unsupported(format!(
                "assignment to {:?}",
                expr.kind
            ))),
        }
    }

    fn store(&mut self, place: &Place<'a>, value: Value) -> ExecResult<()> {
        let mut value = Some(value);
        self.write_place(place, &mut |slot: &mut Value| {
            if let Some(value) = value.take() {
                *slot = value;
            }
            Ok(())
        })
    }

    fn read_place(&mut self, place: &Place<'a>) -> ExecResult<Value> {
        let mut current = Value::Nil;
        self.write_place(place, &mut |slot: &mut Value| {
            current = slot.clone();
            Ok(())
        })?;
        Ok(current)
    }

    /// Runs `f` on the storage behind a resolved place.
    fn write_place(
        &mut self,
        place: &Place<'a>,
        f: &mut dyn FnMut(&mut Value) -> ExecResult<()>,
    ) -> ExecResult<()> {
        match place {
            Place::Blank => f(&mut Value::Nil),
            Place::Variable(name) => match self.lookup_mut(name) {
                Some(slot) => f(slot),
                None => Err(ExecError::Undefined(name.to_string())),
            },
            Place::Field(object, member) => {
                let mut object = object.borrow_mut();
                let slot = object.fields.entry(member.to_string()).or_insert(Value::Nil);
                f(slot)
            }
            Place::Value(value) => f(&mut value.clone()),
            Place::Element(container, index) => {
                self.write_place(container, &mut |holder: &mut Value| match holder {
                    Value::Slice(items) => {
                        let i = index
                            .as_int()
                            .ok_or_else(|| ExecError::Type("non-integer index".into()))?;
                        let len = items.len();
                        let slot = usize::try_from(i)
                            .ok()
                            .and_then(|i| items.get_mut(i))
                            .ok_or(ExecError::IndexOutOfRange { index: i, len })?;
                        f(slot)
                    }
                    Value::Map(map) => {
                        let key = MapKey::from_value(index)?;
                        let mut current = map.borrow().get(&key).cloned().unwrap_or(Value::Nil);
                        f(&mut current)?;
                        map.borrow_mut().insert(key, current);
                        Ok(())
                    }
                    Value::Nil => Err(ExecError::Panic("assignment to entry in nil map".into())),
                    other => Err(ExecError::Type(format!("cannot index {}", other))),
                })
            }
        }
    }

    // Expressions

    fn truthy(&mut self, expr: &Expression<'a>) -> ExecResult<bool> {
        self.eval(expr)?
            .as_bool()
            .ok_or_else(|| ExecError::Type("non-boolean condition".into()))
    }

    /// Evaluates an expression that may produce several values.
    fn eval_multi(&mut self, expr: &Expression<'a>) -> ExecResult<Vec<Value>> {
        match expr.kind {
            ExpressionKind::Call(call) => self.eval_call(call),
            ExpressionKind::Index(base, index) => {
                let container = self.eval(base)?;
                let index = self.eval(index)?;
                match container {
                    Value::Map(map) => {
                        let found = map.borrow().get(&MapKey::from_value(&index)?).cloned();
                        Ok(vec![
                            found.clone().unwrap_or(Value::Nil),
                            Value::Bool(found.is_some()),
                        ])
                    }
                    other => Ok(vec![index_value(other, index)?]),
                }
            }
            _ => Ok(vec![self.eval(expr)?]),
        }
    }

    fn eval(&mut self, expr: &Expression<'a>) -> ExecResult<Value> {
        match expr.kind {
            ExpressionKind::Identifier(name) => self
                .lookup(name)
                .cloned()
                .ok_or_else(|| ExecError::Undefined(name.to_string())),
            ExpressionKind::Literal(literal) => Ok(match literal {
                Literal::Int(i) => Value::Int(i),
                Literal::Float(x) => Value::Float(x),
                Literal::String(s) => Value::Str(s.to_string()),
                Literal::Bool(b) => Value::Bool(b),
                Literal::Nil => Value::Nil,
            }),
            ExpressionKind::Selector(base, member) => {
                let base = self.eval(base)?;
                self.select(base, member)
            }
            ExpressionKind::Call(call) => {
                let mut results = self.eval_call(call)?;
                match results.len() {
                    1 => Ok(results.remove(0)),
                    n => Err(ExecError::Type(format!(
                        "call used as a value returns {} values",
                        n
                    ))),
                }
            }
            ExpressionKind::Index(base, index) => {
                let base = self.eval(base)?;
                let index = self.eval(index)?;
                index_value(base, index)
            }
            ExpressionKind::Binary(BinaryOp::And, left, right) => {
                Ok(Value::Bool(self.truthy(left)? && self.truthy(right)?))
            }
            ExpressionKind::Binary(BinaryOp::Or, left, right) => {
                Ok(Value::Bool(self.truthy(left)? || self.truthy(right)?))
            }
            ExpressionKind::Binary(op, left, right) => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                binary(op, left, right)
            }
            ExpressionKind::Unary(op, operand) => {
                let value = self.eval(operand)?;
                match (op, value) {
                    (UnaryOp::Plus | UnaryOp::AddressOf | UnaryOp::Deref, value) => Ok(value),
                    (UnaryOp::Negate, Value::Int(i)) => Ok(Value::Int(-i)),
                    (UnaryOp::Negate, Value::Float(x)) => Ok(Value::Float(-x)),
                    (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
                    (UnaryOp::BitwiseNot, Value::Int(i)) => Ok(Value::Int(!i)),
                    (op, value) => Err(ExecError::Type(format!(
                        "invalid operation {}{}",
                        op.as_str(),
                        value
                    ))),
                }
            }
            ExpressionKind::Paren(inner) => self.eval(inner),
            ExpressionKind::Composite(ty, elements) => match ty {
                TypeExpr::Slice(_) => {
                    let values = elements
                        .iter()
                        .map(|element| self.eval(&element.value))
                        .collect::<ExecResult<Vec<_>>>()?;
                    Ok(Value::Slice(values))
                }
                TypeExpr::Map(..) => {
                    let mut map = IndexMap::new();
                    for element in elements.iter() {
                        let key = element
                            .key
                            .as_ref()
                            .ok_or_else(|| ExecError::Type("map literal without key".into()))?;
                        let key = MapKey::from_value(&self.eval(key)?)?;
                        map.insert(key, self.eval(&element.value)?);
                    }
                    Ok(Value::Map(Rc::new(RefCell::new(map))))
                }
                _ => {
                    let name = ty.named_target().unwrap_or_default();
                    let mut fields = IndexMap::new();
                    if self.is_wrapper(name) {
                        fields.insert("Record".to_string(), Value::Nil);
                    }
                    for element in elements.iter() {
                        let Some(key) = element.key.and_then(|key| key.as_identifier()) else {
                            return Err(ExecError::Unsupported("positional struct literal".into()));
                        };
                        fields.insert(key.to_string(), self.eval(&element.value)?);
                    }
                    Ok(Value::Object(Rc::new(RefCell::new(Object {
                        ty: name.to_string(),
                        fields,
                    }))))
                }
            },
            ExpressionKind::Type(ty) => Err(ExecError::Type(format!("{} is not an expression", ty))),
        }
    }

    fn is_wrapper(&self, ty: &str) -> bool {
        matches!(
            self.types.get(ty),
            Some(TypeDeclKind::Struct(fields)) if fields.iter().any(|field| field.name.is_none())
        )
    }

    fn select(&self, base: Value, member: &str) -> ExecResult<Value> {
        match &base {
            Value::Object(object) => {
                if let Some(value) = object.borrow().fields.get(member) {
                    return Ok(value.clone());
                }
                match base.record() {
                    Some(record) => record_property(&record.borrow(), member),
                    None => Err(ExecError::NoMember {
                        ty: base.type_name(),
                        name: member.to_string(),
                    }),
                }
            }
            Value::Record(record) => record_property(&record.borrow(), member),
            Value::Nil => Err(ExecError::NilDereference),
            other => Err(ExecError::NoMember {
                ty: other.type_name(),
                name: member.to_string(),
            }),
        }
    }

    fn eval_args(&mut self, args: &[Expression<'a>]) -> ExecResult<Vec<Value>> {
        args.iter().map(|arg| self.eval(arg)).collect()
    }

    fn eval_call(&mut self, call: &CallExpression<'a>) -> ExecResult<Vec<Value>> {
        match call.callee.kind {
            ExpressionKind::Selector(base, method) => {
                let receiver = self.eval(base)?;
                let args = self.eval_args(call.args)?;
                self.dispatch_method(receiver, method, args)
            }
            ExpressionKind::Identifier(name) => {
                if let Some(result) = self.builtin(name, call.args)? {
                    return Ok(result);
                }
                if let Some(TypeDeclKind::Underlying(underlying)) = self.types.get(name).copied() {
                    let [arg] = call.args else {
                        return Err(ExecError::Type(format!("conversion to {} takes one value", name)));
                    };
                    let value = self.eval(arg)?;
                    return Ok(vec![convert(&underlying.to_string(), value)?]);
                }
                let func = self
                    .functions
                    .get(name)
                    .copied()
                    .ok_or_else(|| ExecError::Undefined(name.to_string()))?;
                let args = self.eval_args(call.args)?;
                self.invoke(func, None, args)
            }
            _ => Err(ExecError::Unsupported("indirect call".into())),
        }
    }

    fn dispatch_method(
        &mut self,
        receiver: Value,
        name: &str,
        args: Vec<Value>,
    ) -> ExecResult<Vec<Value>> {
        match &receiver {
            Value::Object(object) => {
                let ty = object.borrow().ty.clone();
                if let Some(func) = self.method(&ty, name) {
                    return self.invoke(func, Some(receiver), args);
                }
                match receiver.record() {
                    Some(record) => record_method(&record, name, args),
                    None => Err(ExecError::NoMember {
                        ty: format!("*{}", ty),
                        name: name.to_string(),
                    }),
                }
            }
            Value::Record(record) => record_method(record, name, args),
            Value::Nil => Err(ExecError::NilDereference),
            other => Err(ExecError::NoMember {
                ty: other.type_name(),
                name: name.to_string(),
            }),
        }
    }

    /// Built-in functions and basic conversions; `None` when `name` is none
    /// of them or is shadowed by a local.
    fn builtin(&mut self, name: &str, args: &[Expression<'a>]) -> ExecResult<Option<Vec<Value>>> {
        if self.lookup(name).is_some() || self.functions.contains_key(name) {
            return Ok(None);
        }
        let result = match (name, args) {
            ("len", [arg]) => match self.eval(arg)? {
                Value::Slice(items) => Value::Int(items.len() as i64),
                Value::Str(s) => Value::Int(s.len() as i64),
                Value::Map(map) => Value::Int(map.borrow().len() as i64),
                Value::Nil => Value::Int(0),
                other => return Err(ExecError::Type(format!("invalid argument {} for len", other))),
            },
            ("make", [ty, sizes @ ..]) => {
                let ExpressionKind::Type(ty) = ty.kind else {
                    return Err(ExecError::Type("make needs a type".into()));
                };
                match ty {
                    TypeExpr::Slice(element) => {
                        let len = match sizes.first() {
                            Some(size) => self.eval(size)?.as_int().unwrap_or(0),
                            None => 0,
                        };
                        let zero = self.zero_value(element);
                        Value::Slice(vec![zero; usize::try_from(len).unwrap_or(0)])
                    }
                    TypeExpr::Map(..) => Value::Map(Rc::new(RefCell::new(IndexMap::new()))),
                    other => return Err(ExecError::Type(format!("cannot make {}", other))),
                }
            }
            ("append", [base, rest @ ..]) => {
                let mut items = match self.eval(base)? {
                    Value::Slice(items) => items,
                    Value::Nil => Vec::new(),
                    other => {
                        return Err(ExecError::Type(format!("first argument to append is {}", other)))
                    }
                };
                for arg in rest {
                    items.push(self.eval(arg)?);
                }
                Value::Slice(items)
            }
            ("panic", [arg]) => {
                let message = match self.eval(arg)? {
                    Value::Str(s) => s,
                    other => other.to_string(),
                };
                return Err(ExecError::Panic(message));
            }
            (
                "int" | "int8" | "int16" | "int32" | "int64" | "float32" | "float64" | "string"
                | "bool",
                [arg],
            ) => {
                let value = self.eval(arg)?;
                convert(name, value)?
            }
            _ => return Ok(None),
        };
        Ok(Some(vec![result]))
    }

    fn zero_value(&self, ty: &TypeExpr<'_>) -> Value {
        match ty {
            TypeExpr::Named("string") => Value::Str(String::new()),
            TypeExpr::Named("bool") => Value::Bool(false),
            TypeExpr::Named("float32" | "float64") => Value::Float(0.0),
            TypeExpr::Named(_) if ty.is_integer() => Value::Int(0),
            TypeExpr::Named(name) => match self.types.get(name) {
                Some(TypeDeclKind::Underlying(underlying)) => self.zero_value(underlying),
                _ => Value::Nil,
            },
            TypeExpr::Slice(_) => Value::Slice(Vec::new()),
            _ => Value::Nil,
        }
    }
}

fn index_value(container: Value, index: Value) -> ExecResult<Value> {
    match container {
        Value::Slice(items) => {
            let i = index
                .as_int()
                .ok_or_else(|| ExecError::Type("non-integer index".into()))?;
            usize::try_from(i)
                .ok()
                .and_then(|i| items.get(i).cloned())
                .ok_or(ExecError::IndexOutOfRange {
                    index: i,
                    len: items.len(),
                })
        }
        Value::Map(map) => Ok(map
            .borrow()
            .get(&MapKey::from_value(&index)?)
            .cloned()
            .unwrap_or(Value::Nil)),
        Value::Nil => Ok(Value::Nil),
        other => Err(ExecError::Type(format!("cannot index {}", other))),
    }
}

fn convert(ty: &str, value: Value) -> ExecResult<Value> {
    let converted = match (ty, value) {
        ("float32" | "float64", Value::Int(i)) => Value::Float(i as f64),
        ("float32" | "float64", value @ Value::Float(_)) => value,
        ("string", value @ Value::Str(_)) => value,
        ("bool", value @ Value::Bool(_)) => value,
        (_, Value::Float(x)) => Value::Int(x as i64),
        (_, value @ Value::Int(_)) => value,
        (ty, value) => {
            return Err(ExecError::Type(format!("cannot convert {} to {}", value, ty)))
        }
    };
    Ok(converted)
}

fn binary(op: BinaryOp, left: Value, right: Value) -> ExecResult<Value> {
    use BinaryOp::*;
    if matches!(op, Equal | NotEqual) {
        let equal = left == right;
        return Ok(Value::Bool(if op == Equal { equal } else { !equal }));
    }
    let result = match (left, right) {
        (Value::Int(a), Value::Int(b)) => match op {
            Add => Value::Int(a.wrapping_add(b)),
            Subtract => Value::Int(a.wrapping_sub(b)),
            Multiply => Value::Int(a.wrapping_mul(b)),
            Divide | Modulo if b == 0 => {
                return Err(ExecError::Panic("integer divide by zero".into()))
            }
            Divide => Value::Int(a / b),
            Modulo => Value::Int(a % b),
            BitwiseAnd => Value::Int(a & b),
            BitwiseOr => Value::Int(a | b),
            BitwiseXor => Value::Int(a ^ b),
            BitClear => Value::Int(a & !b),
            ShiftLeft => Value::Int(a.wrapping_shl(b as u32)),
            ShiftRight => Value::Int(a.wrapping_shr(b as u32)),
            LessThan => Value::Bool(a < b),
            LessThanOrEqual => Value::Bool(a <= b),
            GreaterThan => Value::Bool(a > b),
            GreaterThanOrEqual => Value::Bool(a >= b),
            _ => return Err(ExecError::Type(format!("invalid operator {} on int", op))),
        },
        (left @ (Value::Int(_) | Value::Float(_)), right @ (Value::Int(_) | Value::Float(_))) => {
            let (a, b) = (
                left.as_float().unwrap_or_default(),
                right.as_float().unwrap_or_default(),
            );
            match op {
                Add => Value::Float(a + b),
                Subtract => Value::Float(a - b),
                Multiply => Value::Float(a * b),
                Divide => Value::Float(a / b),
                LessThan => Value::Bool(a < b),
                LessThanOrEqual => Value::Bool(a <= b),
                GreaterThan => Value::Bool(a > b),
                GreaterThanOrEqual => Value::Bool(a >= b),
                _ => return Err(ExecError::Type(format!("invalid operator {} on float", op))),
            }
        }
        (Value::Str(a), Value::Str(b)) => match op {
            Add => Value::Str(a + &b),
            LessThan => Value::Bool(a < b),
            LessThanOrEqual => Value::Bool(a <= b),
            GreaterThan => Value::Bool(a > b),
            GreaterThanOrEqual => Value::Bool(a >= b),
            _ => return Err(ExecError::Type(format!("invalid operator {} on string", op))),
        },
        (left, right) => {
            return Err(ExecError::Type(format!(
                "invalid operation {} {} {}",
                left, op, right
            )))
        }
    };
    Ok(result)
}

fn record_property(record: &FakeRecord, member: &str) -> ExecResult<Value> {
    match member {
        "Id" => Ok(Value::Str(record.id.clone())),
        _ => Err(ExecError::NoMember {
            ty: "*core.Record".into(),
            name: member.to_string(),
        }),
    }
}

fn string_arg(args: &[Value], position: usize) -> ExecResult<String> {
    args.get(position)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ExecError::Type(format!("argument {} must be a string", position)))
}

/// The record store surface the synthesized accessors call.
fn record_method(
    record: &Rc<RefCell<FakeRecord>>,
    name: &str,
    mut args: Vec<Value>,
) -> ExecResult<Vec<Value>> {
    let value = match name {
        "Set" | "SetRaw" => {
            let key = string_arg(&args, 0)?;
            let value = args.pop().unwrap_or(Value::Nil);
            record.borrow_mut().data.insert(key, value);
            return Ok(Vec::new());
        }
        "SetExpand" => {
            let expand = match args.pop() {
                Some(Value::Map(map)) => map
                    .borrow()
                    .iter()
                    .filter_map(|(key, value)| match key {
                        MapKey::Str(key) => Some((key.clone(), value.clone())),
                        _ => None,
                    })
                    .collect(),
                _ => IndexMap::new(),
            };
            record.borrow_mut().expand = expand;
            return Ok(Vec::new());
        }
        "Expand" => {
            let copy = record
                .borrow()
                .expand
                .iter()
                .map(|(key, value)| (MapKey::Str(key.clone()), value.clone()))
                .collect();
            Value::Map(Rc::new(RefCell::new(copy)))
        }
        _ => {
            let key = string_arg(&args, 0)?;
            let record = record.borrow();
            let stored = record.data.get(&key).cloned().unwrap_or(Value::Nil);
            match name {
                "Get" | "GetRaw" | "GetDateTime" => stored,
                "GetString" => match stored {
                    Value::Str(s) => Value::Str(s),
                    Value::Nil => Value::Str(String::new()),
                    other => Value::Str(other.to_string()),
                },
                "GetInt" => match stored {
                    Value::Int(i) => Value::Int(i),
                    Value::Float(x) => Value::Int(x as i64),
                    Value::Str(s) => Value::Int(s.parse().unwrap_or(0)),
                    _ => Value::Int(0),
                },
                "GetFloat" => Value::Float(match stored {
                    Value::Str(s) => s.parse().unwrap_or(0.0),
                    other => other.as_float().unwrap_or(0.0),
                }),
                "GetBool" => Value::Bool(stored.as_bool().unwrap_or(false)),
                "GetStringSlice" => match stored {
                    Value::Slice(items) => Value::Slice(items),
                    Value::Str(s) if !s.is_empty() => Value::Slice(vec![Value::Str(s)]),
                    _ => Value::Slice(Vec::new()),
                },
                "ExpandedOne" => match record.expand.get(&key) {
                    Some(value @ Value::Record(_)) => value.clone(),
                    Some(Value::Slice(items)) => items.first().cloned().unwrap_or(Value::Nil),
                    _ => Value::Nil,
                },
                "ExpandedAll" => match record.expand.get(&key) {
                    Some(value @ Value::Record(_)) => Value::Slice(vec![value.clone()]),
                    Some(Value::Slice(items)) => Value::Slice(items.clone()),
                    _ => Value::Slice(Vec::new()),
                },
                _ => {
                    return Err(ExecError::NoMember {
                        ty: "*core.Record".into(),
                        name: name.to_string(),
                    })
                }
            }
        }
    };
    Ok(vec![value])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_methods;
    use bumpalo::Bump;
    use indoc::indoc;

    fn executor<'a>(source: &str, arena: &'a Bump) -> Executor<'a> {
        let funcs = parse_methods(source, arena).unwrap();
        let declarations: Vec<_> = funcs.into_iter().map(Declaration::Func).collect();
        Executor::new(&declarations).unwrap()
    }

    #[test]
    fn test_loops_and_switch() {
        let arena = Bump::new();
        let mut ex = executor(
            indoc! {r#"
                func Sum(n int) int {
                    total := 0
                    for i := 0; i < n; i++ {
                        if i == 2 {
                            continue
                        }
                        switch i {
                        case 4:
                            break
                        default:
                            total += i
                        }
                    }
                    return total
                }
            "#},
            &arena,
        );
        let result = ex.call_function("Sum", vec![Value::Int(5)]).unwrap();
        assert_eq!(result, vec![Value::Int(4)]);
    }

    #[test]
    fn test_methods_on_plain_objects() {
        let arena = Bump::new();
        let mut ex = executor(
            indoc! {r#"
                func (o *Order) Bump(by float64) {
                    o.total = o.total + by
                    o.tags = append(o.tags, "bumped")
                }
            "#},
            &arena,
        );
        let order = ex.new_object(
            "Order",
            vec![("total", Value::Float(1.5)), ("tags", Value::Slice(Vec::new()))],
        );
        ex.call_method(&order, "Bump", vec![Value::Float(2.0)]).unwrap();
        assert_eq!(order.field("total"), Some(Value::Float(3.5)));
        assert_eq!(order.field("tags"), Some(Value::Slice(vec![Value::from("bumped")])));
    }

    #[test]
    fn test_record_store_calls_through_embedded_record() {
        let arena = Bump::new();
        let mut ex = executor(
            indoc! {r#"
                func (p *Order) Total() float64 {
                    return p.GetFloat("total")
                }
                func (p *Order) SetTotal(total float64) {
                    p.Set("total", total)
                }
            "#},
            &arena,
        );
        let order = ex.new_proxy("Order", FakeRecord::new("orders", "o1").with_value("total", 2.0));
        assert_eq!(ex.call_method(&order, "Total", vec![]).unwrap(), vec![Value::Float(2.0)]);
        ex.call_method(&order, "SetTotal", vec![Value::Float(4.0)]).unwrap();
        let record = order.record().unwrap();
        assert_eq!(record.borrow().get("total"), Some(&Value::Float(4.0)));
    }

    #[test]
    fn test_comma_ok_and_panic() {
        let arena = Bump::new();
        let mut ex = executor(
            indoc! {r#"
                func Lookup(key string) int {
                    m := map[string]int{"a": 1}
                    v, ok := m[key]
                    if !ok {
                        panic("missing")
                    }
                    return v
                }
            "#},
            &arena,
        );
        assert_eq!(ex.call_function("Lookup", vec!["a".into()]).unwrap(), vec![Value::Int(1)]);
        assert_eq!(
            ex.call_function("Lookup", vec!["b".into()]),
            Err(ExecError::Panic("missing".into()))
        );
    }

    #[test]
    fn test_target_operands_run_before_values_and_once() {
        let arena = Bump::new();
        let mut ex = executor(
            indoc! {r#"
                func (c *Log) Note(d int) int {
                    c.trail = c.trail*10 + d
                    return d - 1
                }
                func (c *Log) Run() int {
                    xs := []int{0, 0, 0}
                    xs[c.Note(1)], c.last = c.Note(3), 7
                    xs[c.Note(2)] += 5
                    return xs[0]*100 + xs[1]*10 + xs[2]
                }
            "#},
            &arena,
        );
        let log = ex.new_object("Log", vec![("trail", Value::Int(0))]);
        assert_eq!(ex.call_method(&log, "Run", vec![]).unwrap(), vec![Value::Int(250)]);
        assert_eq!(log.field("trail"), Some(Value::Int(132)));
        assert_eq!(log.field("last"), Some(Value::Int(7)));
    }
}
