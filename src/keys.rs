//! Key path enumeration.
//!
//! For a structure or union, walk every member marked as key (recursively,
//! through nested structures, fixed-size arrays and keyed unions) and yield
//! the terminal key locations depth-first in declaration order. Each yielded
//! leaf comes with an accessor path such as `id`, `inner.x`, `points[1].y` or
//! `selector._d()`.
//!
//! Misconfigured keys (a key member with nothing keyable inside it, a
//! multidimensional key array, a keyed union whose discriminator is not a
//! key) are reported as [`ConfigurationError`]s and end the enumeration.
pub mod cursor;
mod path;

use once_cell::unsync::OnceCell;

pub use cursor::{Cursor, KeyLeaf};
pub use path::DISCRIMINATOR_ACCESS;

use crate::error::{ConfigurationError, RECURSIVE_KEY};
use crate::graph::{classify, recursive_key_field, KeyAnnotations, Kind};

/// The key leaves of one root type.
pub struct SampleKeys<'g, G: KeyAnnotations + ?Sized> {
    graph: &'g G,
    root: G::Type,
    root_kind: Kind,
    count: OnceCell<Result<usize, ConfigurationError>>,
}

/// A fully resolved key leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEntry<T, F> {
    pub leaf: KeyLeaf<T, F>,
    pub path: String,
    /// Type of the key value (member type, element type, or the union itself).
    pub ty: T,
}

impl<'g, G: KeyAnnotations + ?Sized> SampleKeys<'g, G> {
    /// `root` must resolve to a structure or a union, and no key member
    /// reachable from it may contain its own type.
    pub fn new(graph: &'g G, root: G::Type) -> Result<Self, ConfigurationError> {
        let unaliased = graph.unaliased(root);
        let root_kind = classify(graph, Some(unaliased));
        if !matches!(root_kind, Kind::Structure | Kind::Union) {
            return Err(ConfigurationError::at(
                graph.type_location(root),
                format!("sample keys need a structure or union root, found {root_kind}"),
            ));
        }
        if let Some(field) = recursive_key_field(graph, unaliased) {
            return Err(ConfigurationError::at(graph.field_location(field), RECURSIVE_KEY));
        }
        Ok(Self { graph, root: unaliased, root_kind, count: OnceCell::new() })
    }

    pub fn root(&self) -> G::Type {
        self.root
    }

    pub fn root_type(&self) -> Kind {
        self.root_kind
    }

    /// A fresh enumeration from the root.
    pub fn begin(&self) -> KeyIter<'g, G> {
        KeyIter { graph: self.graph, cursor: Cursor::at_root(self.root, self.root_kind) }
    }

    pub fn end(&self) -> Cursor<G::Type, G::Field> {
        Cursor::end()
    }

    /// Number of key leaves. The first call drains an enumeration; the
    /// outcome (including a configuration error) is cached.
    pub fn count(&self) -> Result<usize, ConfigurationError> {
        self.count
            .get_or_init(|| self.begin().try_fold(0, |n, leaf| leaf.map(|_| n + 1)))
            .clone()
    }

    /// Drain an enumeration, resolving the path and value type of every leaf.
    pub fn entries(&self) -> Result<Vec<KeyEntry<G::Type, G::Field>>, ConfigurationError> {
        let mut out = Vec::new();
        let mut iter = self.begin();
        while let Some(leaf) = iter.next() {
            let leaf = leaf?;
            out.push(KeyEntry { leaf, path: iter.path()?, ty: leaf.ty(self.graph) });
        }
        Ok(out)
    }
}

/// Lazy, forward-only enumeration of key leaves. Fused after the first error.
pub struct KeyIter<'g, G: KeyAnnotations + ?Sized> {
    graph: &'g G,
    cursor: Cursor<G::Type, G::Field>,
}

impl<'g, G: KeyAnnotations + ?Sized> KeyIter<'g, G> {
    /// Accessor path of the leaf last returned by `next`.
    pub fn path(&self) -> Result<String, ConfigurationError> {
        self.cursor.path(self.graph)
    }

    pub fn cursor(&self) -> &Cursor<G::Type, G::Field> {
        &self.cursor
    }

    pub fn is_end(&self) -> bool {
        self.cursor.is_end()
    }

    pub fn leaf_kind(&self) -> Kind {
        self.cursor.leaf_kind()
    }

    pub fn leaf_parent_kind(&self) -> Kind {
        self.cursor.leaf_parent_kind()
    }

    pub fn depth(&self) -> usize {
        self.cursor.depth()
    }

    /// Value type of the leaf last returned by `next`.
    pub fn leaf_type(&self) -> Option<G::Type> {
        self.cursor.current().map(|leaf| leaf.ty(self.graph))
    }
}

impl<'g, G: KeyAnnotations + ?Sized> Iterator for KeyIter<'g, G> {
    type Item = Result<KeyLeaf<G::Type, G::Field>, ConfigurationError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor.is_end() {
            return None;
        }
        match self.cursor.advance(self.graph) {
            Ok(()) if self.cursor.is_end() => None,
            Ok(()) => self.cursor.current().map(Ok),
            Err(error) => {
                self.cursor = Cursor::end();
                Some(Err(error))
            }
        }
    }
}

impl<'g, G: KeyAnnotations + ?Sized> PartialEq for KeyIter<'g, G> {
    fn eq(&self, other: &Self) -> bool {
        self.cursor == other.cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{
        Location, ARRAY_WITHOUT_KEYS, FIELD_WITHOUT_KEYS, MULTIDIMENSIONAL_ARRAY,
        RECURSIVE_KEY, UNKEYED_DISCRIMINATOR,
    };
    use crate::ir::{FieldId, Primitive, Schema, TypeId};

    fn paths(schema: &Schema, root: TypeId) -> Result<Vec<String>, ConfigurationError> {
        let keys = SampleKeys::new(schema, root)?;
        Ok(keys.entries()?.into_iter().map(|e| e.path).collect())
    }

    #[test]
    fn flat_structure_yields_key_members_in_order() {
        let mut schema = Schema::new();
        let long = schema.primitive(Primitive::Long);
        let string = schema.string(None);
        let s = schema.structure("Flat");
        let a = schema.key_field(s, "a", long);
        schema.field(s, "b", string);
        let c = schema.key_field(s, "c", long);

        let keys = SampleKeys::new(&schema, s).unwrap();
        let leaves: Vec<_> = keys.begin().collect::<Result<_, _>>().unwrap();
        assert_eq!(leaves, vec![KeyLeaf::Field(a), KeyLeaf::Field(c)]);
        assert_eq!(paths(&schema, s).unwrap(), vec!["a", "c"]);
        assert_eq!(keys.count(), Ok(2));
        assert_eq!(keys.root(), s);
        assert_eq!(keys.root_type(), Kind::Structure);
    }

    #[test]
    fn nested_structures_join_with_dots() {
        let mut schema = Schema::new();
        let long = schema.primitive(Primitive::Long);
        let t = schema.structure("T");
        schema.key_field(t, "x", long);
        schema.key_field(t, "y", long);
        let s = schema.structure("S");
        schema.field(s, "skipped", long);
        schema.key_field(s, "inner", t);
        assert_eq!(paths(&schema, s).unwrap(), vec!["inner.x", "inner.y"]);
    }

    #[test]
    fn structure_without_keys_is_empty_not_an_error() {
        let mut schema = Schema::new();
        let long = schema.primitive(Primitive::Long);
        let s = schema.structure("Plain");
        schema.field(s, "a", long);
        let keys = SampleKeys::new(&schema, s).unwrap();
        assert_eq!(keys.count(), Ok(0));
        let mut iter = keys.begin();
        assert!(iter.next().is_none());
        assert!(iter.is_end());
    }

    #[test]
    fn key_array_yields_one_leaf_per_element() {
        let mut schema = Schema::new();
        let long = schema.primitive(Primitive::Long);
        let arr = schema.array(long, [3]);
        let s = schema.structure("WithArray");
        schema.key_field(s, "values", arr);

        let keys = SampleKeys::new(&schema, s).unwrap();
        let entries = keys.entries().unwrap();
        let got: Vec<_> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(got, vec!["values[0]", "values[1]", "values[2]"]);
        assert!(entries.iter().all(|e| e.leaf == KeyLeaf::Type(long) && e.ty == long));
        assert_eq!(keys.count(), Ok(3));
    }

    #[test]
    fn arrays_of_structures_repeat_the_element_keys() {
        let mut schema = Schema::new();
        let long = schema.primitive(Primitive::Long);
        let point = schema.structure("Point");
        schema.key_field(point, "x", long);
        schema.field(point, "label", long);
        schema.key_field(point, "y", long);
        let pts = schema.array(point, [2]);
        let s = schema.structure("Shape");
        schema.key_field(s, "pts", pts);
        assert_eq!(
            paths(&schema, s).unwrap(),
            vec!["pts[0].x", "pts[0].y", "pts[1].x", "pts[1].y"]
        );
    }

    #[test]
    fn arrays_of_arrays_index_each_level() {
        let mut schema = Schema::new();
        let long = schema.primitive(Primitive::Long);
        let row = schema.array(long, [2]);
        let matrix = schema.array(row, [2]);
        let s = schema.structure("Matrix");
        schema.key_field(s, "m", matrix);

        let keys = SampleKeys::new(&schema, s).unwrap();
        let entries = keys.entries().unwrap();
        let got: Vec<_> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(got, vec!["m[0][0]", "m[0][1]", "m[1][0]", "m[1][1]"]);
        assert!(entries.iter().all(|e| e.ty == long));
    }

    #[test]
    fn self_containing_key_members_are_rejected_up_front() {
        let mut schema = Schema::new();
        let long = schema.primitive(Primitive::Long);
        let node = schema.structure("Node");
        schema.key_field(node, "id", long);
        let next = schema.key_field(node, "next", node);
        schema.locate_field(next, Location::new("list.idl", 7));

        let err = SampleKeys::new(&schema, node).err().unwrap();
        assert_eq!(err.to_string(), format!("Error on line 7 in list.idl: {RECURSIVE_KEY}"));

        // reached through a nested key member
        let holder = schema.structure("Holder");
        schema.key_field(holder, "head", node);
        assert_eq!(paths(&schema, holder).unwrap_err().message, RECURSIVE_KEY);
    }

    #[test]
    fn key_arrays_of_the_enclosing_type_are_rejected() {
        let mut schema = Schema::new();
        let long = schema.primitive(Primitive::Long);
        let tree = schema.structure("Tree");
        schema.key_field(tree, "id", long);
        let alias = schema.alias("TreeAlias", tree);
        let children = schema.array(alias, [2]);
        let field = schema.key_field(tree, "children", children);
        assert_eq!(recursive_key_field(&schema, tree), Some(field));
        assert_eq!(paths(&schema, tree).unwrap_err().message, RECURSIVE_KEY);

        // the same member without the key flag is simply skipped
        let leafy = schema.structure("Leafy");
        schema.key_field(leafy, "id", long);
        let kids = schema.array(leafy, [2]);
        schema.field(leafy, "children", kids);
        assert_eq!(paths(&schema, leafy).unwrap(), vec!["id"]);
    }

    #[test]
    fn multidimensional_key_array_fails_before_any_leaf() {
        let mut schema = Schema::new();
        let long = schema.primitive(Primitive::Long);
        let grid = schema.array(long, [2, 2]);
        let s = schema.structure("Grid");
        schema.key_field(s, "cells", grid);

        let keys = SampleKeys::new(&schema, s).unwrap();
        let mut iter = keys.begin();
        let err = iter.next().unwrap().unwrap_err();
        assert_eq!(err.message, MULTIDIMENSIONAL_ARRAY);
        assert!(iter.next().is_none());
    }

    #[test]
    fn key_array_of_keyless_elements_is_rejected() {
        let mut schema = Schema::new();
        let long = schema.primitive(Primitive::Long);
        let plain = schema.structure("Plain");
        schema.field(plain, "a", long);
        let arr = schema.array(plain, [4]);
        schema.locate(arr, Location::new("shapes.idl", 9));
        let s = schema.structure("Holder");
        schema.key_field(s, "items", arr);

        let err = paths(&schema, s).unwrap_err();
        assert_eq!(err.message, ARRAY_WITHOUT_KEYS);
        assert_eq!(err.to_string(), format!("Error on line 9 in shapes.idl: {ARRAY_WITHOUT_KEYS}"));
    }

    #[test]
    fn keyed_union_yields_its_discriminator() {
        let mut schema = Schema::new();
        let long = schema.primitive(Primitive::Long);
        let u = schema.keyed_union("Choice", long);
        schema.branch(u, "a", long);

        let keys = SampleKeys::new(&schema, u).unwrap();
        let entries = keys.entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].leaf, KeyLeaf::Type(u));
        assert_eq!(entries[0].path, DISCRIMINATOR_ACCESS);

        let s = schema.structure("Holder");
        schema.key_field(s, "choice", u);
        assert_eq!(paths(&schema, s).unwrap(), vec!["choice._d()"]);
    }

    #[test]
    fn key_union_without_keyed_discriminator_is_rejected() {
        let mut schema = Schema::new();
        let long = schema.primitive(Primitive::Long);
        let u = schema.union("Choice", long);
        schema.locate(u, Location::new("choice.idl", 4));
        let s = schema.structure("Holder");
        schema.key_field(s, "choice", u);

        let err = paths(&schema, s).unwrap_err();
        assert_eq!(err.message, UNKEYED_DISCRIMINATOR);
        assert_eq!(err.location, Some(Location::new("choice.idl", 4)));

        // not marked as key: never visited
        let t = schema.structure("Quiet");
        schema.field(t, "choice", u);
        assert_eq!(paths(&schema, t).unwrap(), Vec::<String>::new());
    }

    #[test]
    fn key_member_with_nothing_inside_is_rejected() {
        let mut schema = Schema::new();
        let long = schema.primitive(Primitive::Long);
        let empty = schema.structure("Empty");
        schema.field(empty, "a", long);
        let seq = schema.sequence(long, None);
        let s = schema.structure("Holder");
        let inner = schema.key_field(s, "inner", empty);
        schema.locate_field(inner, Location::new("holder.idl", 3));
        let t = schema.structure("SeqHolder");
        schema.key_field(t, "items", seq);

        let err = paths(&schema, s).unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("Error on line 3 in holder.idl: {FIELD_WITHOUT_KEYS}")
        );
        let err = paths(&schema, t).unwrap_err();
        assert_eq!(err.to_string(), FIELD_WITHOUT_KEYS);
    }

    #[test]
    fn aliases_enums_and_strings_are_transparent() {
        let mut schema = Schema::new();
        let long = schema.primitive(Primitive::Long);
        let id = schema.alias("Id", long);
        let color = schema.enumeration("Color", ["RED", "BLUE"]);
        let name = schema.string(Some(8));
        let t = schema.structure("Inner");
        schema.key_field(t, "id", id);
        let inner_alias = schema.alias("InnerAlias", t);
        let s = schema.structure("Outer");
        schema.key_field(s, "color", color);
        schema.key_field(s, "name", name);
        schema.key_field(s, "inner", inner_alias);
        let root = schema.alias("OuterAlias", s);

        assert_eq!(paths(&schema, root).unwrap(), vec!["color", "name", "inner.id"]);
        let keys = SampleKeys::new(&schema, root).unwrap();
        assert_eq!(keys.root(), s);
        let types: Vec<_> = keys.entries().unwrap().into_iter().map(|e| e.ty).collect();
        assert_eq!(types, vec![color, name, id]);
    }

    #[test]
    fn count_is_cached_including_errors() {
        let mut schema = Schema::new();
        let long = schema.primitive(Primitive::Long);
        let grid = schema.array(long, [2, 3]);
        let s = schema.structure("Grid");
        schema.key_field(s, "cells", grid);
        let keys = SampleKeys::new(&schema, s).unwrap();
        let first = keys.count();
        assert!(first.is_err());
        assert_eq!(keys.count(), first);

        let t = schema.structure("T");
        schema.key_field(t, "a", long);
        let keys = SampleKeys::new(&schema, t).unwrap();
        assert_eq!(keys.count(), Ok(1));
        assert_eq!(keys.count(), Ok(1));
    }

    #[test]
    fn exhausted_enumerations_share_one_terminal_value() {
        let mut schema = Schema::new();
        let long = schema.primitive(Primitive::Long);
        let a = schema.structure("A");
        schema.key_field(a, "x", long);
        let b = schema.keyed_union("B", long);

        let keys_a = SampleKeys::new(&schema, a).unwrap();
        let keys_b = SampleKeys::new(&schema, b).unwrap();
        let mut iter_a = keys_a.begin();
        let mut iter_b = keys_b.begin();
        assert!(iter_a != iter_b);
        while iter_a.next().is_some() {}
        while iter_b.next().is_some() {}
        assert!(iter_a == iter_b);
        assert_eq!(*iter_a.cursor(), keys_a.end());
        assert_eq!(keys_a.end(), keys_b.end());
    }

    #[test]
    fn equal_positions_compare_equal() {
        let mut schema = Schema::new();
        let long = schema.primitive(Primitive::Long);
        let s = schema.structure("S");
        schema.key_field(s, "a", long);
        schema.key_field(s, "b", long);
        let keys = SampleKeys::new(&schema, s).unwrap();

        let mut one = keys.begin();
        let mut two = keys.begin();
        one.next();
        assert!(one != two);
        two.next();
        assert!(one == two);
        let snapshot = one.cursor().clone();
        one.next();
        assert_ne!(*one.cursor(), snapshot);
    }

    #[test]
    fn leaf_introspection_follows_the_innermost_level() {
        let mut schema = Schema::new();
        let long = schema.primitive(Primitive::Long);
        let arr = schema.array(long, [1]);
        let u = schema.keyed_union("U", long);
        let t = schema.structure("T");
        let x: FieldId = schema.key_field(t, "x", long);
        let s = schema.structure("S");
        schema.key_field(s, "t", t);
        schema.key_field(s, "arr", arr);
        schema.key_field(s, "u", u);

        let keys = SampleKeys::new(&schema, s).unwrap();
        let mut iter = keys.begin();

        assert_eq!(iter.next(), Some(Ok(KeyLeaf::Field(x))));
        assert_eq!((iter.leaf_kind(), iter.leaf_parent_kind(), iter.depth()), (Kind::Primitive, Kind::Structure, 2));
        assert_eq!(iter.leaf_type(), Some(long));

        assert_eq!(iter.next(), Some(Ok(KeyLeaf::Type(long))));
        assert_eq!((iter.leaf_kind(), iter.leaf_parent_kind(), iter.depth()), (Kind::Primitive, Kind::Array, 2));
        assert_eq!(iter.path().unwrap(), "arr[0]");

        assert_eq!(iter.next(), Some(Ok(KeyLeaf::Type(u))));
        assert_eq!((iter.leaf_kind(), iter.leaf_parent_kind(), iter.depth()), (Kind::Union, Kind::Structure, 1));
        assert_eq!(iter.leaf_type(), Some(u));

        assert_eq!(iter.next(), None);
    }

    #[test]
    fn unstarted_positions_have_no_path() {
        let mut schema = Schema::new();
        let long = schema.primitive(Primitive::Long);
        let s = schema.structure("S");
        schema.key_field(s, "a", long);
        let keys = SampleKeys::new(&schema, s).unwrap();
        let err = keys.begin().path().unwrap_err();
        assert!(err.message.starts_with("cannot render path"));

        let mut done = keys.begin();
        while done.next().is_some() {}
        assert!(done.path().is_err());
    }

    #[test]
    fn only_structures_and_unions_can_be_roots() {
        let mut schema = Schema::new();
        let long = schema.primitive(Primitive::Long);
        let arr = schema.array(long, [2]);
        assert!(SampleKeys::new(&schema, long).is_err());
        assert!(SampleKeys::new(&schema, arr).is_err());
    }

    #[test]
    fn enumeration_restarts_from_a_fresh_begin() {
        let mut schema = Schema::new();
        let long = schema.primitive(Primitive::Long);
        let s = schema.structure("S");
        schema.key_field(s, "a", long);
        let keys = SampleKeys::new(&schema, s).unwrap();
        let first: Vec<_> = keys.begin().collect();
        let second: Vec<_> = keys.begin().collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
    }
}
