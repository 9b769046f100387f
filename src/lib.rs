//! # clientgen
//!
//! **clientgen** derives the model of a REST resource client from two inputs:
//! annotations on Rust type declarations and an
//! [OpenAPI 3.1.0](https://spec.openapis.org/oas/v3.1.0) document. The output is
//! a fully resolved, de-duplicated description of request/response types and
//! CRUD/extra-method operations that a template emitter turns into source code.
//!
//! ## Architecture
//!
//! The crate is a small compiler. Leaves first:
//!
//! - **[`spec`]** - Schema provider: OpenAPI loading and `$ref`/`allOf`/`oneOf` resolution
//! - **[`markers`]** - Annotation grammar and the marker definition registry
//! - **[`source`]** - Source fact extraction from annotated Rust files (`syn`)
//! - **[`resource`]** - Resource descriptor assembly and wiring recovery
//! - **[`model`]** - Shape classification and the field-model builder
//! - **[`validator`]** - Validation gate: which operations a resource keeps
//! - **[`alias`]** - Alias optimizer for direct component references
//! - **[`generator`]** - One generation run, producing a [`GenerationModel`]
//! - **[`linter`]** - Annotation diagnostics
//! - **[`config`]** / **[`logging`]** / **[`cli`]** - Driver plumbing
//!
//! ### Generation Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant CLI as CLI<br/>(clientgen)
//!     participant Src as source::RustSourceExtractor
//!     participant Res as resource::collect
//!     participant Gate as validator::ValidationGate
//!     participant Model as model::ModelBuilder
//!     participant Emit as Emitter (external)
//!
//!     CLI->>Src: annotations + wiring facts
//!     Src-->>Res: AnnotationFact / WiringFact
//!     Res->>Res: assemble, recover, merge, legacy
//!     Res-->>CLI: ResourceDescriptor per resource
//!     CLI->>Gate: check_resource (name order)
//!     Gate-->>CLI: surviving operations + issues
//!     CLI->>Model: build response/request/search/extra models
//!     Model-->>CLI: field models, nested types, aliases
//!     CLI->>Emit: GenerationModel as JSON
//! ```
//!
//! ## Annotations
//!
//! ```rust,ignore
//! /// +clientgen:ops:CRUDL=/widgets
//! /// +clientgen:extraMethod:POST=/widgets/{id}/restart
//! /// +clientgen:asyncExtraMethod:POST[wait(10m)]=/widgets/{id}/rebuild
//! pub struct Widget;
//! ```
//!
//! ## Error Tiers
//!
//! - **Fatal** ([`FatalError`]) - an annotation names an operation the document
//!   lacks; the run aborts
//! - **Recoverable** ([`ValidationIssue`]) - the operation is dropped and the
//!   reason recorded
//! - **Informational** - `tracing::warn!` only
//!
//! ## Programmatic Usage
//!
//! ```rust,ignore
//! use clientgen::config::Policy;
//! use clientgen::generator::run_generation;
//! use clientgen::markers::MarkerRegistry;
//! use clientgen::source::RustSourceExtractor;
//! use clientgen::spec::load_provider;
//!
//! let provider = load_provider("openapi.yaml".as_ref())?;
//! let registry = MarkerRegistry::with_defaults("clientgen")?;
//! let extractor = RustSourceExtractor::new(vec!["src/models".into()], vec![]);
//! let run = run_generation(&extractor, &provider, &registry, "clientgen", &Policy::default())?;
//! println!("{}", run.model.to_json_pretty()?);
//! ```

pub mod alias;
pub mod cli;
pub mod config;
pub mod error;
pub mod generator;
pub mod linter;
pub mod logging;
pub mod markers;
pub mod model;
pub mod resource;
pub mod source;
pub mod spec;
pub mod validator;

pub use error::{BuildError, FatalError, MarkerError, ProviderError, RegistryError};
pub use generator::{generate_model, run_generation, GenerationModel};
pub use spec::{load_provider, OpenApiProvider, SchemaProvider};
pub use validator::{IssueReason, ValidationIssue};
