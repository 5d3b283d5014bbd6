//! Accessor and mutator bodies, one builder per classification shape.

use crate::ast::{
    AstBuilder, BinaryOp, Expression, FuncDecl, Param, Statement, TypeExpr, UnaryOp,
};

const UNKNOWN_OPTION: &str = "Unknown select value";

/// Identifiers the bodies below declare; a mutator parameter must not use one.
pub(crate) const TEMPLATE_LOCALS: &[&str] = &[
    "proxy", "rel", "rels", "proxies", "i", "records", "ids", "r", "e", "option", "options",
    "ok", "is", "o", "label", "labels", "core",
];

/// Everything a template needs to know about the field it is instantiated for.
pub(crate) struct FieldTemplate<'t, 'a> {
    pub b: AstBuilder<'a>,
    pub receiver: &'t str,
    pub entity: &'t str,
    pub key: &'t str,
    pub accessor: &'t str,
    pub mutator: &'t str,
    pub param: &'t str,
}

impl<'t, 'a> FieldTemplate<'t, 'a> {
    fn receiver_param(&self) -> Param<'a> {
        let b = self.b;
        b.param(self.receiver, b.pointer(b.named(self.entity)))
    }

    fn recv(&self) -> Expression<'a> {
        self.b.ident(self.receiver)
    }

    fn key_lit(&self) -> Expression<'a> {
        self.b.string(self.key)
    }

    fn getter(&self, result: &'a TypeExpr<'a>, body: &[Statement<'a>]) -> &'a FuncDecl<'a> {
        self.b.func(
            Some(self.receiver_param()),
            self.accessor,
            &[],
            &[],
            &[*result],
            body,
        )
    }

    fn setter(&self, param_ty: &'a TypeExpr<'a>, body: &[Statement<'a>]) -> &'a FuncDecl<'a> {
        let param = self.b.param(self.param, param_ty);
        self.b.func(
            Some(self.receiver_param()),
            self.mutator,
            &[],
            &[param],
            &[],
            body,
        )
    }

    /// `x, ok := table[key]; if !ok { panic(...) }`
    fn checked_lookup(
        &self,
        binding: &str,
        table: &str,
        key: Expression<'a>,
    ) -> [Statement<'a>; 2] {
        let b = self.b;
        [
            b.define(
                &[b.ident(binding), b.ident("ok")],
                &[b.index(b.ident(table), key)],
            ),
            b.if_stmt(
                None,
                b.unary(UnaryOp::Not, b.ident("ok")),
                &[b.expr_stmt(b.call_fn("panic", &[b.string(UNKNOWN_OPTION)]))],
            ),
        ]
    }
}

// Primitive

pub(crate) fn primitive_get<'a>(
    t: &FieldTemplate<'_, 'a>,
    getter: &str,
    ty: &'a TypeExpr<'a>,
) -> &'a FuncDecl<'a> {
    let b = t.b;
    let read = b.method_call(t.recv(), getter, &[t.key_lit()]);
    t.getter(ty, &[b.ret(&[read])])
}

pub(crate) fn primitive_set<'a>(t: &FieldTemplate<'_, 'a>, ty: &'a TypeExpr<'a>) -> &'a FuncDecl<'a> {
    let b = t.b;
    let write = b.method_call(t.recv(), "Set", &[t.key_lit(), b.ident(t.param)]);
    t.setter(ty, &[b.expr_stmt(write)])
}

// Relations

pub(crate) fn single_relation_get<'a>(t: &FieldTemplate<'_, 'a>, target: &str) -> &'a FuncDecl<'a> {
    let b = t.b;
    let proxy_ty = b.pointer(b.named(target));
    let body = [
        b.var("proxy", proxy_ty),
        b.if_stmt(
            Some(b.define(
                &[b.ident("rel")],
                &[b.method_call(t.recv(), "ExpandedOne", &[t.key_lit()])],
            )),
            b.binary(BinaryOp::NotEqual, b.ident("rel"), b.nil()),
            &[
                b.assign(
                    &[b.ident("proxy")],
                    &[b.unary(UnaryOp::AddressOf, b.composite(b.named(target), &[]))],
                ),
                b.assign(&[b.selector(b.ident("proxy"), "Record")], &[b.ident("rel")]),
            ],
        ),
        b.ret(&[b.ident("proxy")]),
    ];
    t.getter(proxy_ty, &body)
}

pub(crate) fn single_relation_set<'a>(t: &FieldTemplate<'_, 'a>, target: &str) -> &'a FuncDecl<'a> {
    let b = t.b;
    let value = b.ident(t.param);
    let body = [
        b.expr_stmt(b.method_call(
            b.selector(t.recv(), "Record"),
            "Set",
            &[t.key_lit(), b.selector(value, "Id")],
        )),
        b.define(&[b.ident("e")], &[b.method_call(t.recv(), "Expand", &[])]),
        b.assign(
            &[b.index(b.ident("e"), t.key_lit())],
            &[b.selector(value, "Record")],
        ),
        b.expr_stmt(b.method_call(t.recv(), "SetExpand", &[b.ident("e")])),
    ];
    t.setter(b.pointer(b.named(target)), &body)
}

pub(crate) fn multi_relation_get<'a>(t: &FieldTemplate<'_, 'a>, target: &str) -> &'a FuncDecl<'a> {
    let b = t.b;
    let slice_ty = b.slice_of(b.pointer(b.named(target)));
    let element = b.index(b.ident("proxies"), b.ident("i"));
    let body = [
        b.define(
            &[b.ident("rels")],
            &[b.method_call(t.recv(), "ExpandedAll", &[t.key_lit()])],
        ),
        b.define(
            &[b.ident("proxies")],
            &[b.call_fn(
                "make",
                &[b.type_operand(slice_ty), b.call_fn("len", &[b.ident("rels")])],
            )],
        ),
        b.range(
            Some(b.ident("i")),
            None,
            b.ident("rels"),
            &[
                b.assign(
                    &[element],
                    &[b.unary(UnaryOp::AddressOf, b.composite(b.named(target), &[]))],
                ),
                b.assign(
                    &[b.selector(element, "Record")],
                    &[b.index(b.ident("rels"), b.ident("i"))],
                ),
            ],
        ),
        b.ret(&[b.ident("proxies")]),
    ];
    t.getter(slice_ty, &body)
}

pub(crate) fn multi_relation_set<'a>(t: &FieldTemplate<'_, 'a>, target: &str) -> &'a FuncDecl<'a> {
    let b = t.b;
    let value = b.ident(t.param);
    let length = b.call_fn("len", &[value]);
    let records_ty = b.slice_of(b.pointer(b.named("core.Record")));
    let body = [
        b.define(
            &[b.ident("records")],
            &[b.call_fn("make", &[b.type_operand(records_ty), length])],
        ),
        b.define(
            &[b.ident("ids")],
            &[b.call_fn("make", &[b.type_operand(b.slice_of(b.named("string"))), length])],
        ),
        b.range(
            Some(b.ident("i")),
            Some(b.ident("r")),
            value,
            &[
                b.assign(
                    &[b.index(b.ident("records"), b.ident("i"))],
                    &[b.selector(b.ident("r"), "Record")],
                ),
                b.assign(
                    &[b.index(b.ident("ids"), b.ident("i"))],
                    &[b.selector(b.ident("r"), "Id")],
                ),
            ],
        ),
        b.expr_stmt(b.method_call(
            b.selector(t.recv(), "Record"),
            "Set",
            &[t.key_lit(), b.ident("ids")],
        )),
        b.define(&[b.ident("e")], &[b.method_call(t.recv(), "Expand", &[])]),
        b.assign(&[b.index(b.ident("e"), t.key_lit())], &[b.ident("records")]),
        b.expr_stmt(b.method_call(t.recv(), "SetExpand", &[b.ident("e")])),
    ];
    t.setter(b.slice_of(b.pointer(b.named(target))), &body)
}

// Enumerations

pub(crate) fn single_enum_get<'a>(
    t: &FieldTemplate<'_, 'a>,
    enum_name: &str,
    name_map: &str,
) -> &'a FuncDecl<'a> {
    let b = t.b;
    let [lookup, check] = t.checked_lookup("i", name_map, b.ident("option"));
    let body = [
        b.define(
            &[b.ident("option")],
            &[b.method_call(t.recv(), "GetString", &[t.key_lit()])],
        ),
        lookup,
        check,
        b.ret(&[b.ident("i")]),
    ];
    t.getter(b.named(enum_name), &body)
}

pub(crate) fn multi_enum_get<'a>(
    t: &FieldTemplate<'_, 'a>,
    enum_name: &str,
    name_map: &str,
) -> &'a FuncDecl<'a> {
    let b = t.b;
    let slice_ty = b.slice_of(b.named(enum_name));
    let [lookup, check] = t.checked_lookup("i", name_map, b.ident("o"));
    let body = [
        b.define(
            &[b.ident("options")],
            &[b.method_call(t.recv(), "GetStringSlice", &[t.key_lit()])],
        ),
        b.define(
            &[b.ident("is")],
            &[b.call_fn(
                "make",
                &[
                    b.type_operand(slice_ty),
                    b.int(0),
                    b.call_fn("len", &[b.ident("options")]),
                ],
            )],
        ),
        b.range(
            Some(b.ident("_")),
            Some(b.ident("o")),
            b.ident("options"),
            &[
                lookup,
                check,
                b.assign(
                    &[b.ident("is")],
                    &[b.call_fn("append", &[b.ident("is"), b.ident("i")])],
                ),
            ],
        ),
        b.ret(&[b.ident("is")]),
    ];
    t.getter(slice_ty, &body)
}

pub(crate) fn single_enum_set<'a>(
    t: &FieldTemplate<'_, 'a>,
    enum_name: &str,
    iota_map: &str,
) -> &'a FuncDecl<'a> {
    let b = t.b;
    let [lookup, check] = t.checked_lookup("label", iota_map, b.ident(t.param));
    let body = [
        lookup,
        check,
        b.expr_stmt(b.method_call(t.recv(), "Set", &[t.key_lit(), b.ident("label")])),
    ];
    t.setter(b.named(enum_name), &body)
}

pub(crate) fn multi_enum_set<'a>(
    t: &FieldTemplate<'_, 'a>,
    enum_name: &str,
    iota_map: &str,
) -> &'a FuncDecl<'a> {
    let b = t.b;
    let value = b.ident(t.param);
    let [lookup, check] = t.checked_lookup("label", iota_map, b.ident("i"));
    let body = [
        b.define(
            &[b.ident("labels")],
            &[b.call_fn(
                "make",
                &[
                    b.type_operand(b.slice_of(b.named("string"))),
                    b.int(0),
                    b.call_fn("len", &[value]),
                ],
            )],
        ),
        b.range(
            Some(b.ident("_")),
            Some(b.ident("i")),
            value,
            &[
                lookup,
                check,
                b.assign(
                    &[b.ident("labels")],
                    &[b.call_fn("append", &[b.ident("labels"), b.ident("label")])],
                ),
            ],
        ),
        b.expr_stmt(b.method_call(t.recv(), "Set", &[t.key_lit(), b.ident("labels")])),
    ];
    t.setter(b.slice_of(b.named(enum_name)), &body)
}

pub(crate) fn collection_name_get<'a>(
    b: AstBuilder<'a>,
    receiver: &str,
    entity: &str,
    collection: &str,
) -> &'a FuncDecl<'a> {
    b.func(
        Some(b.param(receiver, b.pointer(b.named(entity)))),
        "CollectionName",
        &[],
        &[],
        &[*b.named("string")],
        &[b.ret(&[b.string(collection)])],
    )
}
