use bumpalo::Bump;
use std::fmt;
use thiserror::Error;

pub static INT: TypeExpr<'static> = TypeExpr::Named("int");
pub static FLOAT64: TypeExpr<'static> = TypeExpr::Named("float64");
pub static STRING: TypeExpr<'static> = TypeExpr::Named("string");
pub static BOOL: TypeExpr<'static> = TypeExpr::Named("bool");

const INTEGER_TYPES: &[&str] = &[
    "int", "int8", "int16", "int32", "int64", "uint", "uint8", "uint16", "uint32", "uint64",
    "uintptr", "byte", "rune",
];
const FLOAT_TYPES: &[&str] = &["float32", "float64"];
const NILABLE_NAMED: &[&str] = &["any", "error"];

/// A type expression as written in source or in a schema field declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeExpr<'a> {
    /// `int`, `Customer`, `types.DateTime`
    Named(&'a str),
    Pointer(&'a TypeExpr<'a>),
    Slice(&'a TypeExpr<'a>),
    Map(&'a TypeExpr<'a>, &'a TypeExpr<'a>),
    /// `~int`, only valid as a type parameter constraint
    Approx(&'a TypeExpr<'a>),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid type expression `{input}`: {reason}")]
pub struct TypeParseError {
    pub input: String,
    pub reason: &'static str,
}

impl<'a> TypeExpr<'a> {
    /// Parses a complete type expression such as `[]*Customer` or
    /// `map[string]int`. Trailing input is an error.
    pub fn parse(source: &str, arena: &'a Bump) -> Result<&'a TypeExpr<'a>, TypeParseError> {
        let trimmed = source.trim();
        let fail = |reason| TypeParseError {
            input: source.to_string(),
            reason,
        };
        let (ty, rest) = Self::parse_prefix(trimmed, arena).map_err(fail)?;
        if !rest.trim().is_empty() {
            return Err(fail("unexpected trailing input"));
        }
        Ok(ty)
    }

    fn parse_prefix<'s>(
        input: &'s str,
        arena: &'a Bump,
    ) -> Result<(&'a TypeExpr<'a>, &'s str), &'static str> {
        let input = input.trim_start();
        if let Some(rest) = input.strip_prefix('*') {
            let (inner, rest) = Self::parse_prefix(rest, arena)?;
            return Ok((arena.alloc(TypeExpr::Pointer(inner)), rest));
        }
        if let Some(rest) = input.strip_prefix('~') {
            let (inner, rest) = Self::parse_prefix(rest, arena)?;
            return Ok((arena.alloc(TypeExpr::Approx(inner)), rest));
        }
        if let Some(rest) = input.strip_prefix("[]") {
            let (inner, rest) = Self::parse_prefix(rest, arena)?;
            return Ok((arena.alloc(TypeExpr::Slice(inner)), rest));
        }
        if let Some(rest) = input.strip_prefix("map[") {
            let (key, rest) = Self::parse_prefix(rest, arena)?;
            let rest = rest
                .trim_start()
                .strip_prefix(']')
                .ok_or("expected `]` after map key type")?;
            let (value, rest) = Self::parse_prefix(rest, arena)?;
            return Ok((arena.alloc(TypeExpr::Map(key, value)), rest));
        }

        let end = input
            .char_indices()
            .find(|(_, c)| !(c.is_alphanumeric() || *c == '_' || *c == '.'))
            .map(|(i, _)| i)
            .unwrap_or(input.len());
        let name = &input[..end];
        if name.is_empty() {
            return Err("expected a type name");
        }
        if name.starts_with('.') || name.ends_with('.') || name.contains("..") {
            return Err("malformed qualified type name");
        }
        if name.starts_with(|c: char| c.is_ascii_digit()) {
            return Err("type names cannot start with a digit");
        }
        Ok((
            arena.alloc(TypeExpr::Named(arena.alloc_str(name))),
            &input[end..],
        ))
    }

    /// The entity a value of this type refers to: `E` and `*E` both name `E`.
    pub fn named_target(&self) -> Option<&'a str> {
        match *self {
            TypeExpr::Named(name) => Some(name),
            TypeExpr::Pointer(&TypeExpr::Named(name)) => Some(name),
            _ => None,
        }
    }

    /// Element type of a slice, value type of a map.
    pub fn element(&self) -> Option<&'a TypeExpr<'a>> {
        match *self {
            TypeExpr::Slice(elem) => Some(elem),
            TypeExpr::Map(_, value) => Some(value),
            _ => None,
        }
    }

    pub fn is_slice(&self) -> bool {
        matches!(self, TypeExpr::Slice(_))
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, TypeExpr::Named(name) if INTEGER_TYPES.contains(name))
    }

    fn is_float(&self) -> bool {
        matches!(self, TypeExpr::Named(name) if FLOAT_TYPES.contains(name))
    }

    /// Named types that are not predeclared: a constant of any basic kind
    /// may have one of these as its underlying type.
    fn is_user_named(&self) -> bool {
        match self {
            TypeExpr::Named(name) => {
                !INTEGER_TYPES.contains(name)
                    && !FLOAT_TYPES.contains(name)
                    && !NILABLE_NAMED.contains(name)
                    && *name != "string"
                    && *name != "bool"
            }
            _ => false,
        }
    }

    fn is_nilable(&self) -> bool {
        match self {
            TypeExpr::Pointer(_) | TypeExpr::Slice(_) | TypeExpr::Map(..) => true,
            TypeExpr::Named(name) => NILABLE_NAMED.contains(name),
            TypeExpr::Approx(_) => false,
        }
    }
}

impl fmt::Display for TypeExpr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Named(name) => write!(f, "{}", name),
            TypeExpr::Pointer(inner) => write!(f, "*{}", inner),
            TypeExpr::Slice(inner) => write!(f, "[]{}", inner),
            TypeExpr::Map(key, value) => write!(f, "map[{}]{}", key, value),
            TypeExpr::Approx(inner) => write!(f, "~{}", inner),
        }
    }
}

/// Static type of an expression as far as the rewriter can tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaticType<'a> {
    Known(&'a TypeExpr<'a>),
    UntypedInt,
    UntypedFloat,
    UntypedString,
    UntypedBool,
    UntypedNil,
}

impl<'a> StaticType<'a> {
    pub fn known(&self) -> Option<&'a TypeExpr<'a>> {
        match *self {
            StaticType::Known(ty) => Some(ty),
            _ => None,
        }
    }

    pub fn is_untyped(&self) -> bool {
        !matches!(self, StaticType::Known(_))
    }

    /// The type a variable initialized from this value gets. `nil` has none.
    pub fn defaulted(&self) -> Option<&'a TypeExpr<'a>> {
        match *self {
            StaticType::Known(ty) => Some(ty),
            StaticType::UntypedInt => Some(&INT),
            StaticType::UntypedFloat => Some(&FLOAT64),
            StaticType::UntypedString => Some(&STRING),
            StaticType::UntypedBool => Some(&BOOL),
            StaticType::UntypedNil => None,
        }
    }

    /// Assignability of a value of this type to a variable of type `target`.
    pub fn assignable_to(&self, target: &TypeExpr<'a>) -> bool {
        match *self {
            StaticType::Known(ty) => {
                *ty == *target || matches!(target, TypeExpr::Named("any"))
            }
            StaticType::UntypedInt => {
                target.is_integer() || target.is_float() || target.is_user_named()
            }
            StaticType::UntypedFloat => target.is_float() || target.is_user_named(),
            StaticType::UntypedString => {
                matches!(target, TypeExpr::Named("string")) || target.is_user_named()
            }
            StaticType::UntypedBool => {
                matches!(target, TypeExpr::Named("bool")) || target.is_user_named()
            }
            StaticType::UntypedNil => target.is_nilable(),
        }
    }
}

impl fmt::Display for StaticType<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaticType::Known(ty) => write!(f, "{}", ty),
            StaticType::UntypedInt => write!(f, "untyped int"),
            StaticType::UntypedFloat => write!(f, "untyped float"),
            StaticType::UntypedString => write!(f, "untyped string"),
            StaticType::UntypedBool => write!(f, "untyped bool"),
            StaticType::UntypedNil => write!(f, "untyped nil"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_types() {
        let arena = Bump::new();
        let ty = TypeExpr::parse("[]*Customer", &arena).unwrap();
        assert_eq!(
            *ty,
            TypeExpr::Slice(&TypeExpr::Pointer(&TypeExpr::Named("Customer")))
        );
        assert_eq!(ty.to_string(), "[]*Customer");

        let map = TypeExpr::parse(" map[string][]int ", &arena).unwrap();
        assert_eq!(map.to_string(), "map[string][]int");
        assert_eq!(map.element().map(|e| e.to_string()), Some("[]int".into()));
    }

    #[test]
    fn test_parse_qualified_name() {
        let arena = Bump::new();
        let ty = TypeExpr::parse("types.DateTime", &arena).unwrap();
        assert_eq!(*ty, TypeExpr::Named("types.DateTime"));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let arena = Bump::new();
        assert!(TypeExpr::parse("", &arena).is_err());
        assert!(TypeExpr::parse("[]", &arena).is_err());
        assert!(TypeExpr::parse("map[string", &arena).is_err());
        assert!(TypeExpr::parse("int int", &arena).is_err());
        assert!(TypeExpr::parse("1abc", &arena).is_err());
    }

    #[test]
    fn test_named_target() {
        let arena = Bump::new();
        let single = TypeExpr::parse("*Customer", &arena).unwrap();
        assert_eq!(single.named_target(), Some("Customer"));
        let multi = TypeExpr::parse("[]*Customer", &arena).unwrap();
        assert_eq!(multi.named_target(), None);
    }

    #[test]
    fn test_untyped_constant_assignability() {
        let string_ty = TypeExpr::Named("string");
        let int_ty = TypeExpr::Named("int");
        let slice_ty = TypeExpr::Slice(&INT);

        assert!(StaticType::UntypedInt.assignable_to(&int_ty));
        assert!(StaticType::UntypedInt.assignable_to(&FLOAT64));
        assert!(!StaticType::UntypedInt.assignable_to(&string_ty));
        assert!(StaticType::UntypedString.assignable_to(&string_ty));
        assert!(!StaticType::UntypedString.assignable_to(&int_ty));
        assert!(StaticType::UntypedNil.assignable_to(&slice_ty));
        assert!(!StaticType::UntypedNil.assignable_to(&int_ty));
        assert!(StaticType::Known(&STRING).assignable_to(&string_ty));
        assert!(!StaticType::Known(&STRING).assignable_to(&int_ty));
    }
}
