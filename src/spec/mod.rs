//! # Schema Provider
//!
//! Everything the engine knows about the OpenAPI document goes through the
//! [`SchemaProvider`] trait: operation lookups by verb and path, `$ref`
//! resolution, component enumeration and status-code checks.
//!
//! [`OpenApiProvider`] is the implementation used by the CLI. It parses the
//! document with `oas3`, keeps component schemas as JSON values and expands
//! them into [`Schema`] trees on demand, so two queries for the same
//! operation always produce the same answer.

mod load;
mod provider;
mod schema;

pub use load::*;
pub use provider::*;
pub use schema::*;
