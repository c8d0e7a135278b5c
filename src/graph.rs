//! Capability interface over an already-parsed type graph, and the type
//! classifier built on top of it.
//!
//! The enumerator only ever talks to a schema through [`TypeGraph`] and
//! [`KeyAnnotations`]; [`crate::ir::Schema`] is the in-memory implementation.
use std::fmt::Debug;
use crate::error::Location;

/// Structural kind of a type after unaliasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Primitive,
    Structure,
    Union,
    Array,
    Invalid,
}

impl Kind {
    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Primitive => "PrimitiveType",
            Kind::Structure => "StructureType",
            Kind::Union => "UnionType",
            Kind::Array => "ArrayType",
            Kind::Invalid => "InvalidType",
        }
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified type together with what the enumerator needs to walk it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape<T, F> {
    Primitive,
    /// Fields in declaration order.
    Structure(Vec<F>),
    Union,
    /// One extent per declared dimension; `element` is not unaliased.
    Array { dims: Vec<u64>, element: T },
    Invalid,
}

impl<T, F> Shape<T, F> {
    pub fn kind(&self) -> Kind {
        match self {
            Shape::Primitive => Kind::Primitive,
            Shape::Structure(_) => Kind::Structure,
            Shape::Union => Kind::Union,
            Shape::Array { .. } => Kind::Array,
            Shape::Invalid => Kind::Invalid,
        }
    }
}

pub trait TypeGraph {
    type Type: Copy + Eq + Debug;
    type Field: Copy + Eq + Debug;

    /// Follow alias declarations down to the concrete type.
    fn unaliased(&self, ty: Self::Type) -> Self::Type;

    /// Shape of `ty` itself. Callers unalias first; an alias is `Invalid` here.
    fn shape(&self, ty: Self::Type) -> Shape<Self::Type, Self::Field>;

    fn field_name(&self, field: Self::Field) -> &str;
    fn field_type(&self, field: Self::Field) -> Self::Type;

    fn type_location(&self, ty: Self::Type) -> Option<Location>;
    fn field_location(&self, field: Self::Field) -> Option<Location>;
}

/// Key annotation lookups.
pub trait KeyAnnotations: TypeGraph {
    fn is_field_marked_key(&self, field: Self::Field) -> bool;
    /// Whether the union's discriminator is marked as key.
    fn is_union_marked_key(&self, union: Self::Type) -> bool;
}

/// Classify `ty` after resolving aliases. `None` is `Invalid`.
pub fn classify<G: TypeGraph + ?Sized>(graph: &G, ty: Option<G::Type>) -> Kind {
    match ty {
        None => Kind::Invalid,
        Some(ty) => graph.shape(graph.unaliased(ty)).kind(),
    }
}

/// A key member whose type, following key members and array elements,
/// contains the type it was reached from. Enumerating through it never ends.
pub fn recursive_key_field<G: KeyAnnotations + ?Sized>(graph: &G, root: G::Type) -> Option<G::Field> {
    let mut open = Vec::new();
    let mut clean = Vec::new();
    find_key_cycle(graph, graph.unaliased(root), None, &mut open, &mut clean)
}

fn find_key_cycle<G: KeyAnnotations + ?Sized>(
    graph: &G,
    ty: G::Type,
    via: Option<G::Field>,
    open: &mut Vec<G::Type>,
    clean: &mut Vec<G::Type>,
) -> Option<G::Field> {
    if clean.contains(&ty) {
        return None;
    }
    open.push(ty);
    let found = match graph.shape(ty) {
        Shape::Structure(fields) => fields
            .into_iter()
            .filter(|field| graph.is_field_marked_key(*field))
            .find_map(|field| {
                let member = graph.unaliased(graph.field_type(field));
                if open.contains(&member) {
                    Some(field)
                } else {
                    find_key_cycle(graph, member, Some(field), open, clean)
                }
            }),
        Shape::Array { element, .. } => {
            let element = graph.unaliased(element);
            if open.contains(&element) {
                via
            } else {
                find_key_cycle(graph, element, via, open, clean)
            }
        }
        _ => None,
    };
    open.pop();
    if found.is_none() {
        clean.push(ty);
    }
    found
}
