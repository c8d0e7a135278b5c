//! Key path enumeration for IDL structures and unions.
//!
//! Given an already-parsed type graph, [`SampleKeys`] walks the members
//! marked as key and yields every terminal key location together with its
//! accessor path. The walk is written against the [`TypeGraph`] and
//! [`KeyAnnotations`] capabilities; [`Schema`] is the in-memory graph that
//! ships with the crate, and [`load`] reads one from JSON.
pub mod error;
pub mod graph;
pub mod ir;
pub mod keys;
pub mod load;
pub mod path_de;
pub mod report;

pub use error::{ConfigurationError, Location, SchemaError};
pub use graph::{classify, KeyAnnotations, Kind, Shape, TypeGraph};
pub use ir::{FieldId, Primitive, Schema, TypeDecl, TypeId};
pub use keys::{Cursor, KeyEntry, KeyIter, KeyLeaf, SampleKeys};
