// In-memory type graph. Types live in an arena and refer to each other by `TypeId`.

use indexmap::IndexMap;
use crate::error::Location;
use crate::graph::{KeyAnnotations, Shape, TypeGraph};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(usize);

/// A structure member: the owning structure plus the declaration index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId {
    pub owner: TypeId,
    pub index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Boolean,
    Octet,
    Char,
    WChar,
    Short,
    UShort,
    Long,
    ULong,
    LongLong,
    ULongLong,
    Float,
    Double,
    LongDouble,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
}

impl Primitive {
    pub const ALL: [Primitive; 21] = [
        Primitive::Boolean, Primitive::Octet, Primitive::Char, Primitive::WChar,
        Primitive::Short, Primitive::UShort, Primitive::Long, Primitive::ULong,
        Primitive::LongLong, Primitive::ULongLong, Primitive::Float, Primitive::Double,
        Primitive::LongDouble, Primitive::Int8, Primitive::UInt8, Primitive::Int16,
        Primitive::UInt16, Primitive::Int32, Primitive::UInt32, Primitive::Int64,
        Primitive::UInt64,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Primitive::Boolean => "boolean",
            Primitive::Octet => "octet",
            Primitive::Char => "char",
            Primitive::WChar => "wchar",
            Primitive::Short => "short",
            Primitive::UShort => "unsigned short",
            Primitive::Long => "long",
            Primitive::ULong => "unsigned long",
            Primitive::LongLong => "long long",
            Primitive::ULongLong => "unsigned long long",
            Primitive::Float => "float",
            Primitive::Double => "double",
            Primitive::LongDouble => "long double",
            Primitive::Int8 => "int8",
            Primitive::UInt8 => "uint8",
            Primitive::Int16 => "int16",
            Primitive::UInt16 => "uint16",
            Primitive::Int32 => "int32",
            Primitive::UInt32 => "uint32",
            Primitive::Int64 => "int64",
            Primitive::UInt64 => "uint64",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }
}

#[derive(Debug, Clone)]
pub enum TypeDecl {
    Primitive(Primitive),
    /// `string` / `wstring`, optionally bounded.
    String { wide: bool, bound: Option<u32> },
    Enum { variants: Vec<String> },
    Alias(TypeId),
    Struct { fields: Vec<Field> },
    Union {
        discriminator: TypeId,
        /// The discriminator carries a key annotation.
        keyed: bool,
        branches: Vec<Branch>,
    },
    Array { element: TypeId, dims: Vec<u64> },
    Sequence { element: TypeId, bound: Option<u64> },
    /// Declared by name, definition still pending.
    Forward,
}

#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub ty: TypeId,
    pub key: bool,
    pub location: Option<Location>,
}

#[derive(Debug, Clone)]
pub struct Branch {
    pub name: String,
    pub ty: TypeId,
}

#[derive(Debug, Clone)]
pub struct TypeNode {
    /// `None` for anonymous types (inline arrays, bounded strings, ...).
    pub name: Option<String>,
    pub decl: TypeDecl,
    pub location: Option<Location>,
}

#[derive(Debug, Clone, Default)]
pub struct Schema {
    nodes: Vec<TypeNode>,
    names: IndexMap<String, TypeId>,
}

// ————————————————————————————————————————————————————————————————————————————
// BUILDING
// ————————————————————————————————————————————————————————————————————————————

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, name: Option<String>, decl: TypeDecl) -> TypeId {
        let id = TypeId(self.nodes.len());
        if let Some(name) = name.as_ref() {
            self.names.entry(name.clone()).or_insert(id);
        }
        self.nodes.push(TypeNode { name, decl, location: None });
        id
    }

    /// Built-in scalar; interned under its IDL name.
    pub fn primitive(&mut self, p: Primitive) -> TypeId {
        match self.names.get(p.name()) {
            Some(id) => *id,
            None => self.insert(Some(p.name().to_string()), TypeDecl::Primitive(p)),
        }
    }

    pub fn string(&mut self, bound: Option<u32>) -> TypeId {
        self.insert(None, TypeDecl::String { wide: false, bound })
    }

    pub fn wstring(&mut self, bound: Option<u32>) -> TypeId {
        self.insert(None, TypeDecl::String { wide: true, bound })
    }

    pub fn enumeration<I, S>(&mut self, name: &str, variants: I) -> TypeId
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let variants = variants.into_iter().map(Into::into).collect();
        self.insert(Some(name.to_string()), TypeDecl::Enum { variants })
    }

    pub fn alias(&mut self, name: &str, target: TypeId) -> TypeId {
        self.insert(Some(name.to_string()), TypeDecl::Alias(target))
    }

    /// An empty structure; add members with [`Schema::field`] / [`Schema::key_field`].
    pub fn structure(&mut self, name: &str) -> TypeId {
        self.insert(Some(name.to_string()), TypeDecl::Struct { fields: Vec::new() })
    }

    /// A member not marked as key.
    ///
    /// # Panics
    ///
    /// If `owner` is not a structure.
    pub fn field(&mut self, owner: TypeId, name: &str, ty: TypeId) -> FieldId {
        self.push_field(owner, name, ty, false)
    }

    /// A member marked as key.
    ///
    /// # Panics
    ///
    /// If `owner` is not a structure.
    pub fn key_field(&mut self, owner: TypeId, name: &str, ty: TypeId) -> FieldId {
        self.push_field(owner, name, ty, true)
    }

    fn push_field(&mut self, owner: TypeId, name: &str, ty: TypeId, key: bool) -> FieldId {
        match &mut self.nodes[owner.0].decl {
            TypeDecl::Struct { fields } => {
                fields.push(Field { name: name.to_string(), ty, key, location: None });
                FieldId { owner, index: fields.len() - 1 }
            }
            other => panic!("cannot add field `{name}` to non-structure {other:?}"),
        }
    }

    /// A union whose discriminator is not marked as key.
    pub fn union(&mut self, name: &str, discriminator: TypeId) -> TypeId {
        self.insert(Some(name.to_string()), TypeDecl::Union {
            discriminator,
            keyed: false,
            branches: Vec::new(),
        })
    }

    /// A union whose discriminator is marked as key.
    pub fn keyed_union(&mut self, name: &str, discriminator: TypeId) -> TypeId {
        self.insert(Some(name.to_string()), TypeDecl::Union {
            discriminator,
            keyed: true,
            branches: Vec::new(),
        })
    }

    /// # Panics
    ///
    /// If `owner` is not a union.
    pub fn branch(&mut self, owner: TypeId, name: &str, ty: TypeId) {
        match &mut self.nodes[owner.0].decl {
            TypeDecl::Union { branches, .. } => {
                branches.push(Branch { name: name.to_string(), ty });
            }
            other => panic!("cannot add branch `{name}` to non-union {other:?}"),
        }
    }

    /// Anonymous fixed-size array, one extent per dimension.
    pub fn array(&mut self, element: TypeId, dims: impl IntoIterator<Item = u64>) -> TypeId {
        let dims = dims.into_iter().collect();
        self.insert(None, TypeDecl::Array { element, dims })
    }

    pub fn sequence(&mut self, element: TypeId, bound: Option<u64>) -> TypeId {
        self.insert(None, TypeDecl::Sequence { element, bound })
    }

    /// Reserve a name so it can be referenced before it is defined.
    pub fn declare(&mut self, name: &str) -> TypeId {
        self.insert(Some(name.to_string()), TypeDecl::Forward)
    }

    /// An unnamed type, e.g. an array declared inline on a member.
    pub fn anonymous(&mut self, decl: TypeDecl) -> TypeId {
        self.insert(None, decl)
    }

    pub fn define(&mut self, id: TypeId, decl: TypeDecl) {
        self.nodes[id.0].decl = decl;
    }

    pub fn locate(&mut self, id: TypeId, location: Location) {
        self.nodes[id.0].location = Some(location);
    }

    pub fn locate_field(&mut self, field: FieldId, location: Location) {
        if let Some(f) = self.fields_mut(field.owner).get_mut(field.index) {
            f.location = Some(location);
        }
    }

    fn fields_mut(&mut self, owner: TypeId) -> &mut [Field] {
        match &mut self.nodes[owner.0].decl {
            TypeDecl::Struct { fields } => fields.as_mut_slice(),
            _ => &mut [],
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// QUERIES
// ————————————————————————————————————————————————————————————————————————————

impl Schema {
    pub fn lookup(&self, name: &str) -> Option<TypeId> {
        self.names.get(name).copied()
    }

    pub fn node(&self, id: TypeId) -> &TypeNode {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Display name; anonymous types get a structural rendering.
    pub fn type_name(&self, id: TypeId) -> String {
        let node = self.node(id);
        if let Some(name) = &node.name {
            return name.clone();
        }
        match &node.decl {
            TypeDecl::String { wide, bound } => {
                let base = if *wide { "wstring" } else { "string" };
                match bound {
                    Some(n) => format!("{base}<{n}>"),
                    None => base.to_string(),
                }
            }
            TypeDecl::Array { element, dims } => {
                let dims: String = dims.iter().map(|d| format!("[{d}]")).collect();
                format!("{}{dims}", self.type_name(*element))
            }
            TypeDecl::Sequence { element, bound } => match bound {
                Some(n) => format!("sequence<{}, {n}>", self.type_name(*element)),
                None => format!("sequence<{}>", self.type_name(*element)),
            },
            _ => format!("<anonymous #{}>", id.0),
        }
    }

    /// # Panics
    ///
    /// If `field` was not handed out by [`Schema::field`] / [`Schema::key_field`]
    /// on this schema.
    pub fn field_decl(&self, field: FieldId) -> &Field {
        match &self.node(field.owner).decl {
            TypeDecl::Struct { fields } => &fields[field.index],
            other => panic!("{field:?} does not belong to a structure: {other:?}"),
        }
    }

    /// Named structures and unions, in declaration order.
    pub fn aggregates(&self) -> Vec<TypeId> {
        self.names
            .values()
            .copied()
            .filter(|id| matches!(self.node(*id).decl, TypeDecl::Struct { .. } | TypeDecl::Union { .. }))
            .collect()
    }

    /// First alias on a cycle reachable from `id`, if any.
    pub fn alias_cycle(&self, id: TypeId) -> Option<TypeId> {
        let mut current = id;
        for _ in 0..=self.nodes.len() {
            match self.node(current).decl {
                TypeDecl::Alias(target) => current = target,
                _ => return None,
            }
        }
        Some(current)
    }
}

impl TypeGraph for Schema {
    type Type = TypeId;
    type Field = FieldId;

    fn unaliased(&self, ty: TypeId) -> TypeId {
        let mut current = ty;
        // bounded so that a cyclic alias chain ends on an alias (→ Invalid)
        for _ in 0..=self.nodes.len() {
            match self.node(current).decl {
                TypeDecl::Alias(target) => current = target,
                _ => break,
            }
        }
        current
    }

    fn shape(&self, ty: TypeId) -> Shape<TypeId, FieldId> {
        match &self.node(ty).decl {
            TypeDecl::Primitive(_) | TypeDecl::String { .. } | TypeDecl::Enum { .. } => Shape::Primitive,
            TypeDecl::Struct { fields } => Shape::Structure(
                (0..fields.len()).map(|index| FieldId { owner: ty, index }).collect(),
            ),
            TypeDecl::Union { .. } => Shape::Union,
            TypeDecl::Array { element, dims } => Shape::Array { dims: dims.clone(), element: *element },
            TypeDecl::Sequence { .. } | TypeDecl::Alias(_) | TypeDecl::Forward => Shape::Invalid,
        }
    }

    fn field_name(&self, field: FieldId) -> &str {
        &self.field_decl(field).name
    }

    fn field_type(&self, field: FieldId) -> TypeId {
        self.field_decl(field).ty
    }

    fn type_location(&self, ty: TypeId) -> Option<Location> {
        self.node(ty).location.clone()
    }

    fn field_location(&self, field: FieldId) -> Option<Location> {
        self.field_decl(field).location.clone()
    }
}

impl KeyAnnotations for Schema {
    fn is_field_marked_key(&self, field: FieldId) -> bool {
        self.field_decl(field).key
    }

    fn is_union_marked_key(&self, union: TypeId) -> bool {
        matches!(self.node(union).decl, TypeDecl::Union { keyed: true, .. })
    }
}
