//! # Field-Model Builder
//!
//! Resolves request and response schemas into ordered field lists and a
//! registry of nested composite types.
//!
//! Shapes are classified in a fixed priority order (see [`classify`]):
//! primitive, map, array, ambiguous object, object. Well-formed objects get
//! one [`Field`] per property; properties that are ambiguous objects (or
//! arrays of them) are skipped and reported. Fields are ordered required
//! first, then alphabetically, and struct fields that hold an array or a
//! nested object carry the optional wrapper ([`TypeRef::Wrapped`]).

mod builder;
mod naming;
mod shape;
mod types;

pub use builder::{ModelBody, ModelBuilder, SkipReason, SkippedProperty};
pub use naming::{
    field_name, last_literal_segment, normalize_key, to_camel_case, to_snake_case, unique_name,
};
pub use shape::{classify, Shape};
pub use types::{sort_fields, CompositeType, Field, PrimitiveKind, TypeRef, TypeRegistry};
