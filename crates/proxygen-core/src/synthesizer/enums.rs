use crate::ast::{
    AstBuilder, ConstDecl, Declaration, FuncDecl, TypeDecl, TypeDeclKind, TypeExpr, VarDecl,
};
use crate::classifier::EnumEntry;
use crate::config::GeneratorConfig;

/// Type, option constants, both lookup tables and the slice conversion
/// helper of one enumeration, in that order.
pub fn enum_declarations<'a>(
    b: AstBuilder<'a>,
    entry: &EnumEntry,
    config: &GeneratorConfig,
) -> Vec<Declaration<'a>> {
    let arena = b.arena();
    let enum_ty = b.named(&entry.name);
    let string_ty = b.named("string");

    let type_decl = Declaration::Type(arena.alloc(TypeDecl {
        doc: None,
        name: b.str(&entry.name),
        kind: TypeDeclKind::Underlying(b.named("int")),
        span: b.span(),
    }));

    let names: Vec<&'a str> = entry.const_names.iter().map(|name| b.str(name)).collect();
    let consts = Declaration::Const(arena.alloc(ConstDecl {
        ty: b.str(&entry.name),
        names: arena.alloc_slice_copy(&names),
        span: b.span(),
    }));

    let name_entries: Vec<_> = entry
        .labels()
        .zip(&entry.const_names)
        .map(|(label, constant)| (b.string(label), b.ident(constant)))
        .collect();
    let name_map = Declaration::Var(arena.alloc(VarDecl {
        name: b.str(&config.name_map(&entry.name)),
        value: b.keyed_composite(b.map_of(string_ty, enum_ty), &name_entries),
        span: b.span(),
    }));

    let iota_entries: Vec<_> = entry
        .labels()
        .zip(&entry.const_names)
        .map(|(label, constant)| (b.ident(constant), b.string(label)))
        .collect();
    let iota_map = Declaration::Var(arena.alloc(VarDecl {
        name: b.str(&config.iota_map(&entry.name)),
        value: b.keyed_composite(b.map_of(enum_ty, string_ty), &iota_entries),
        span: b.span(),
    }));

    vec![
        type_decl,
        consts,
        name_map,
        iota_map,
        Declaration::Func(slice_helper(b, entry, config)),
    ]
}

/// `func zzStatusSliceOf[T ~int](values []T) []Status`, converting one
/// element at a time.
fn slice_helper<'a>(
    b: AstBuilder<'a>,
    entry: &EnumEntry,
    config: &GeneratorConfig,
) -> &'a FuncDecl<'a> {
    let arena = b.arena();
    let enum_slice = b.slice_of(b.named(&entry.name));
    let constraint = arena.alloc(TypeExpr::Approx(b.named("int")));
    let body = [
        b.define(
            &[b.ident("converted")],
            &[b.call_fn(
                "make",
                &[
                    b.type_operand(enum_slice),
                    b.int(0),
                    b.call_fn("len", &[b.ident("values")]),
                ],
            )],
        ),
        b.range(
            Some(b.ident("_")),
            Some(b.ident("v")),
            b.ident("values"),
            &[b.assign(
                &[b.ident("converted")],
                &[b.call_fn(
                    "append",
                    &[
                        b.ident("converted"),
                        b.call_fn(&entry.name, &[b.ident("v")]),
                    ],
                )],
            )],
        ),
        b.ret(&[b.ident("converted")]),
    ];
    b.func(
        None,
        &config.slice_helper(&entry.name),
        &[b.type_param("T", constraint)],
        &[b.param("values", b.slice_of(b.named("T")))],
        &[*enum_slice],
        &body,
    )
}
