//! One level of an in-progress key enumeration.
//!
//! A cursor is rooted at a type (or, for primitive members, at the member
//! itself) and owns at most one child cursor for the nesting level below it.
//! Advancing asks the child first; once the child runs dry the cursor moves
//! its own position forward and opens the next child. An exhausted cursor
//! collapses to [`Cursor::end`].
use crate::error::{
    ConfigurationError, ARRAY_WITHOUT_KEYS, FIELD_WITHOUT_KEYS, MULTIDIMENSIONAL_ARRAY,
    UNKEYED_DISCRIMINATOR,
};
use crate::graph::{KeyAnnotations, Kind, Shape, TypeGraph};

/// What a cursor yields: a structure member, or a type standing on its own
/// (an array element type, or a union standing in for its discriminator).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyLeaf<T, F> {
    Field(F),
    Type(T),
}

impl<T: Copy, F: Copy> KeyLeaf<T, F> {
    /// Type of the key value at this leaf.
    pub fn ty<G>(self, graph: &G) -> T
    where
        G: TypeGraph<Type = T, Field = F> + ?Sized,
    {
        match self {
            KeyLeaf::Field(field) => graph.field_type(field),
            KeyLeaf::Type(ty) => ty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor<T, F> {
    pub(super) root: Option<KeyLeaf<T, F>>,
    pub(super) kind: Kind,
    pub(super) parent_kind: Kind,
    /// Field index, element index, or 0/1 for single-shot kinds.
    pub(super) pos: usize,
    pub(super) current: Option<KeyLeaf<T, F>>,
    pub(super) level: usize,
    pub(super) child: Option<Box<Cursor<T, F>>>,
}

impl<T, F> Cursor<T, F> {
    /// The terminal position shared by every exhausted enumeration.
    pub fn end() -> Self {
        Self {
            root: None,
            kind: Kind::Invalid,
            parent_kind: Kind::Invalid,
            pos: 0,
            current: None,
            level: 0,
            child: None,
        }
    }
}

impl<T: Copy + Eq, F: Copy + Eq> Cursor<T, F> {
    /// An unstarted top-level cursor.
    pub(crate) fn at_root(root: T, kind: Kind) -> Self {
        Self { root: Some(KeyLeaf::Type(root)), kind, ..Self::end() }
    }

    /// Child cursor for a key member of the structure `parent` is walking.
    /// Primitive members are rooted at the member so that it is what gets yielded.
    fn for_field<G>(graph: &G, field: F, parent: &Self) -> Result<Self, ConfigurationError>
    where
        G: KeyAnnotations<Type = T, Field = F> + ?Sized,
    {
        let ty = graph.unaliased(graph.field_type(field));
        let kind = graph.shape(ty).kind();
        let root = match kind {
            Kind::Primitive => KeyLeaf::Field(field),
            _ => KeyLeaf::Type(ty),
        };
        Self::opened(graph, root, kind, parent)
    }

    /// Child cursor for one element of the array `parent` is walking.
    fn for_element<G>(graph: &G, element: T, parent: &Self) -> Result<Self, ConfigurationError>
    where
        G: KeyAnnotations<Type = T, Field = F> + ?Sized,
    {
        let ty = graph.unaliased(element);
        let kind = graph.shape(ty).kind();
        Self::opened(graph, KeyLeaf::Type(ty), kind, parent)
    }

    fn opened<G>(graph: &G, root: KeyLeaf<T, F>, kind: Kind, parent: &Self) -> Result<Self, ConfigurationError>
    where
        G: KeyAnnotations<Type = T, Field = F> + ?Sized,
    {
        let mut cursor = Self {
            root: Some(root),
            kind,
            parent_kind: parent.kind,
            level: parent.level + 1,
            ..Self::end()
        };
        cursor.advance(graph)?;
        Ok(cursor)
    }

    pub fn is_end(&self) -> bool {
        *self == Self::end()
    }

    /// Leaf yielded by the last successful advance.
    pub fn current(&self) -> Option<KeyLeaf<T, F>> {
        self.current
    }

    /// Kind of the innermost active level.
    pub fn leaf_kind(&self) -> Kind {
        self.child.as_ref().map_or(self.kind, |child| child.leaf_kind())
    }

    /// Kind of the level enclosing the innermost active level.
    pub fn leaf_parent_kind(&self) -> Kind {
        self.child.as_ref().map_or(self.parent_kind, |child| child.leaf_parent_kind())
    }

    /// Nesting level of the innermost active level; the root is 0.
    pub fn depth(&self) -> usize {
        self.child.as_ref().map_or(self.level, |child| child.depth())
    }

    pub(super) fn root_type<G>(&self, graph: &G) -> Option<T>
    where
        G: TypeGraph<Type = T, Field = F> + ?Sized,
    {
        match self.root? {
            KeyLeaf::Type(ty) => Some(ty),
            KeyLeaf::Field(field) => Some(graph.unaliased(graph.field_type(field))),
        }
    }

    /// Move to the next key leaf, or to [`Cursor::end`] when there is none.
    pub(crate) fn advance<G>(&mut self, graph: &G) -> Result<(), ConfigurationError>
    where
        G: KeyAnnotations<Type = T, Field = F> + ?Sized,
    {
        let Some(root) = self.root else {
            return Ok(());
        };

        if let Some(child) = self.child.as_deref_mut() {
            child.advance(graph)?;
            if child.is_end() {
                self.child = None;
                self.pos += 1;
            } else {
                self.current = child.current;
                return Ok(());
            }
        }

        let found = match (self.kind, self.root_type(graph)) {
            (Kind::Structure, Some(ty)) => self.next_key_field(graph, ty)?,
            (Kind::Array, Some(ty)) => self.next_element(graph, ty)?,
            (Kind::Union, Some(ty)) => self.take_discriminator(graph, ty)?,
            (Kind::Primitive, _) => {
                // single shot
                let first = self.pos == 0;
                if first {
                    self.pos = 1;
                    self.current = Some(root);
                }
                first
            }
            _ => false,
        };
        if !found {
            *self = Self::end();
        }
        Ok(())
    }

    fn next_key_field<G>(&mut self, graph: &G, ty: T) -> Result<bool, ConfigurationError>
    where
        G: KeyAnnotations<Type = T, Field = F> + ?Sized,
    {
        let Shape::Structure(fields) = graph.shape(ty) else {
            return Ok(false);
        };
        while let Some(&field) = fields.get(self.pos) {
            if graph.is_field_marked_key(field) {
                let child = Self::for_field(graph, field, self)?;
                if child.is_end() {
                    return Err(ConfigurationError::at(graph.field_location(field), FIELD_WITHOUT_KEYS));
                }
                self.current = child.current;
                self.child = Some(Box::new(child));
                return Ok(true);
            }
            self.pos += 1;
        }
        Ok(false)
    }

    fn next_element<G>(&mut self, graph: &G, ty: T) -> Result<bool, ConfigurationError>
    where
        G: KeyAnnotations<Type = T, Field = F> + ?Sized,
    {
        let Shape::Array { dims, element } = graph.shape(ty) else {
            return Ok(false);
        };
        let extent = match dims.as_slice() {
            [] => 0,
            [extent] => *extent,
            _ => return Err(ConfigurationError::at(graph.type_location(ty), MULTIDIMENSIONAL_ARRAY)),
        };
        if (self.pos as u64) >= extent {
            return Ok(false);
        }
        let child = Self::for_element(graph, element, self)?;
        if child.is_end() {
            return Err(ConfigurationError::at(graph.type_location(ty), ARRAY_WITHOUT_KEYS));
        }
        self.current = child.current;
        self.child = Some(Box::new(child));
        Ok(true)
    }

    fn take_discriminator<G>(&mut self, graph: &G, ty: T) -> Result<bool, ConfigurationError>
    where
        G: KeyAnnotations<Type = T, Field = F> + ?Sized,
    {
        if self.pos != 0 {
            return Ok(false);
        }
        self.pos = 1;
        if !graph.is_union_marked_key(ty) {
            return Err(ConfigurationError::at(graph.type_location(ty), UNKEYED_DISCRIMINATOR));
        }
        self.current = Some(KeyLeaf::Type(ty));
        Ok(true)
    }
}
