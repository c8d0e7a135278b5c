//! Load a JSON-encoded type graph into a [`Schema`].
//!
//! The document is what a schema front end hands over after parsing and
//! annotation resolution:
//!
//! ```json
//! {
//!   "file": "shapes.idl",
//!   "types": {
//!     "Point": { "kind": "struct", "line": 3, "fields": [
//!       { "name": "id", "type": "long", "key": true },
//!       { "name": "coords", "type": { "kind": "array", "element": "double", "dims": [3] } }
//!     ]},
//!     "Shape": { "kind": "union", "discriminator": "long", "key": true }
//!   },
//!   "roots": ["Point"]
//! }
//! ```
//!
//! Type references are either a name (declared in `types`, or a built-in such
//! as `long`, `unsigned short`, `string`) or an inline declaration.
use std::path::Path;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Location, SchemaError};
use crate::graph::{recursive_key_field, TypeGraph};
use crate::ir::{Branch, Field, Primitive, Schema, TypeDecl, TypeId};
use crate::path_de::{from_str_with_path, from_value_with_path};

static SCOPED_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(::[A-Za-z_][A-Za-z0-9_]*)*$").unwrap()
});
static MEMBER_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

// ————————————————————————————————————————————————————————————————————————————
// DOCUMENT FORMAT
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDocument {
    #[serde(default)]
    file: Option<String>,
    types: IndexMap<String, RawDecl>,
    #[serde(default)]
    roots: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RawDecl {
    #[serde(flatten)]
    body: RawBody,
    #[serde(default)]
    line: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum RawBody {
    Struct {
        fields: Vec<RawField>,
    },
    Union {
        discriminator: RawTypeRef,
        #[serde(default)]
        key: bool,
        #[serde(default)]
        branches: Vec<RawBranch>,
    },
    Enum {
        variants: Vec<String>,
    },
    Alias {
        target: RawTypeRef,
    },
    Array {
        element: RawTypeRef,
        dims: Vec<u64>,
    },
    Sequence {
        element: RawTypeRef,
        #[serde(default)]
        bound: Option<u64>,
    },
    String {
        #[serde(default)]
        wide: bool,
        #[serde(default)]
        bound: Option<u32>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTypeRef {
    Name(String),
    Inline(Box<RawDecl>),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawField {
    name: String,
    #[serde(rename = "type")]
    ty: RawTypeRef,
    #[serde(default)]
    key: bool,
    #[serde(default)]
    line: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBranch {
    name: String,
    #[serde(rename = "type")]
    ty: RawTypeRef,
}

// ————————————————————————————————————————————————————————————————————————————
// LOADED DOCUMENTS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone)]
pub struct Document {
    /// Where the document was read from, or the label given to `load_str`.
    pub source: String,
    pub schema: Schema,
    /// Requested roots, or every structure and keyed union when none are listed.
    pub roots: Vec<TypeId>,
}

pub fn load_file(path: &Path, json_pointer: Option<&str>) -> Result<Document, SchemaError> {
    let source = path.to_string_lossy().to_string();
    let text = std::fs::read_to_string(path).map_err(|source_err| SchemaError::Io {
        path: source.clone(),
        source: source_err,
    })?;
    load_str(&text, &source, json_pointer)
}

/// Parse `text`; with a JSON pointer, only the selected node is the document.
pub fn load_str(text: &str, source: &str, json_pointer: Option<&str>) -> Result<Document, SchemaError> {
    let raw: RawDocument = match json_pointer {
        None => from_str_with_path(text)?,
        Some(pointer) => {
            let value: Value = serde_json::from_str(text).map_err(|err| SchemaError::Json {
                path: ".".to_string(),
                message: err.to_string(),
            })?;
            let selected = value
                .pointer(pointer)
                .cloned()
                .ok_or_else(|| SchemaError::PointerMiss(pointer.to_string()))?;
            from_value_with_path(selected)?
        }
    };
    build(raw, source)
}

// ————————————————————————————————————————————————————————————————————————————
// LOWERING
// ————————————————————————————————————————————————————————————————————————————

struct Builder {
    schema: Schema,
    file: String,
}

fn build(raw: RawDocument, source: &str) -> Result<Document, SchemaError> {
    let file = raw.file.clone().unwrap_or_else(|| source.to_string());
    let mut b = Builder { schema: Schema::new(), file };

    // 1) reserve every name so declarations can refer to each other in any order
    let mut declared = Vec::with_capacity(raw.types.len());
    for (name, decl) in raw.types {
        if !SCOPED_NAME.is_match(&name) {
            return Err(SchemaError::BadIdentifier(name));
        }
        if is_builtin(&name) || b.schema.lookup(&name).is_some() {
            return Err(SchemaError::DuplicateType(name));
        }
        let id = b.schema.declare(&name);
        declared.push((id, name, decl));
    }

    // 2) define them
    for (id, name, decl) in declared.iter() {
        let lowered = b.lower_body(&decl.body, name)?;
        b.schema.define(*id, lowered);
        if let Some(location) = b.location(decl.line) {
            b.schema.locate(*id, location);
        }
    }

    // 3) aliases must bottom out
    for (id, name, _) in declared.iter() {
        if b.schema.alias_cycle(*id).is_some() {
            return Err(SchemaError::AliasCycle(name.clone()));
        }
    }

    // 4) no key member may contain the type it is nested in
    for (id, _, _) in declared.iter() {
        if let Some(field) = recursive_key_field(&b.schema, *id) {
            return Err(SchemaError::RecursiveKey {
                ty: b.schema.type_name(field.owner),
                field: b.schema.field_name(field).to_string(),
            });
        }
    }

    let roots = match raw.roots {
        Some(names) => names
            .into_iter()
            .map(|name| {
                b.schema.lookup(&name).ok_or_else(|| SchemaError::UnknownType {
                    name,
                    context: "roots".to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?,
        None => default_roots(&b.schema),
    };
    tracing::debug!(source, types = b.schema.len(), roots = roots.len(), "loaded type graph");

    Ok(Document { source: source.to_string(), schema: b.schema, roots })
}

/// Structures, and unions whose discriminator is a key; an unkeyed union is
/// never a key carrier on its own.
fn default_roots(schema: &Schema) -> Vec<TypeId> {
    schema
        .aggregates()
        .into_iter()
        .filter(|id| match schema.node(*id).decl {
            TypeDecl::Union { keyed, .. } => keyed,
            _ => true,
        })
        .collect()
}

fn is_builtin(name: &str) -> bool {
    Primitive::from_name(name).is_some() || matches!(name, "string" | "wstring")
}

impl Builder {
    fn location(&self, line: Option<u32>) -> Option<Location> {
        line.map(|line| Location::new(self.file.clone(), line))
    }

    fn resolve(&mut self, ty: &RawTypeRef, context: &str) -> Result<TypeId, SchemaError> {
        match ty {
            RawTypeRef::Name(name) => self.resolve_name(name, context),
            RawTypeRef::Inline(decl) => {
                let lowered = self.lower_body(&decl.body, context)?;
                let id = self.schema.anonymous(lowered);
                if let Some(location) = self.location(decl.line) {
                    self.schema.locate(id, location);
                }
                Ok(id)
            }
        }
    }

    fn resolve_name(&mut self, name: &str, context: &str) -> Result<TypeId, SchemaError> {
        if let Some(id) = self.schema.lookup(name) {
            return Ok(id);
        }
        if let Some(p) = Primitive::from_name(name) {
            return Ok(self.schema.primitive(p));
        }
        match name {
            "string" => Ok(self.schema.string(None)),
            "wstring" => Ok(self.schema.wstring(None)),
            _ => Err(SchemaError::UnknownType { name: name.to_string(), context: context.to_string() }),
        }
    }

    fn lower_body(&mut self, body: &RawBody, context: &str) -> Result<TypeDecl, SchemaError> {
        let decl = match body {
            RawBody::Struct { fields } => {
                let mut out = Vec::with_capacity(fields.len());
                for f in fields {
                    if !MEMBER_NAME.is_match(&f.name) {
                        return Err(SchemaError::BadIdentifier(f.name.clone()));
                    }
                    let member = format!("{context}.{}", f.name);
                    let ty = self.resolve(&f.ty, &member)?;
                    out.push(Field { name: f.name.clone(), ty, key: f.key, location: self.location(f.line) });
                }
                TypeDecl::Struct { fields: out }
            }
            RawBody::Union { discriminator, key, branches } => {
                let discriminator = self.resolve(discriminator, context)?;
                let mut out = Vec::with_capacity(branches.len());
                for branch in branches {
                    if !MEMBER_NAME.is_match(&branch.name) {
                        return Err(SchemaError::BadIdentifier(branch.name.clone()));
                    }
                    let member = format!("{context}.{}", branch.name);
                    out.push(Branch { name: branch.name.clone(), ty: self.resolve(&branch.ty, &member)? });
                }
                TypeDecl::Union { discriminator, keyed: *key, branches: out }
            }
            RawBody::Enum { variants } => TypeDecl::Enum { variants: variants.clone() },
            RawBody::Alias { target } => TypeDecl::Alias(self.resolve(target, context)?),
            RawBody::Array { element, dims } => {
                if dims.is_empty() {
                    return Err(SchemaError::EmptyDimensions(context.to_string()));
                }
                TypeDecl::Array { element: self.resolve(element, context)?, dims: dims.clone() }
            }
            RawBody::Sequence { element, bound } => {
                TypeDecl::Sequence { element: self.resolve(element, context)?, bound: *bound }
            }
            RawBody::String { wide, bound } => TypeDecl::String { wide: *wide, bound: *bound },
        };
        Ok(decl)
    }
}
