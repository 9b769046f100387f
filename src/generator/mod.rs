//! # Generator Module
//!
//! Drives one generation run and assembles the model handed to the emitter.
//!
//! ```text
//! source facts → descriptors → validation gate → field models → GenerationModel (JSON)
//! ```
//!
//! 1. **Descriptors** - [`collect`](crate::resource::collect) folds annotations
//!    and wiring into one descriptor per resource
//! 2. **Validation** - [`ValidationGate`](crate::validator::ValidationGate)
//!    drops operations the document cannot back, recording an issue for each
//! 3. **Field models** - [`ModelBuilder`](crate::model::ModelBuilder) resolves
//!    request and response schemas into typed fields and nested types
//! 4. **Output** - [`GenerationModel`] lists resources in name order with
//!    their surviving operations, extra methods, types and issues
//!
//! ## Naming
//!
//! | Model | Name |
//! |-------|------|
//! | Response | `{Resource}` |
//! | Request body | `{Resource}Request` |
//! | List filters | `{Resource}SearchParams` (only with both List and Read) |
//! | Extra method | `{Resource}{Verb}{Segment}Request` / `...Response` |
//!
//! Names are unique across a run; a clash gets a `_N` suffix.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use clientgen::generator::run_generation;
//!
//! let run = run_generation(&extractor, &provider, &registry, "clientgen", &policy)?;
//! println!("{}", run.model.to_json_pretty()?);
//! ```

mod model;
mod pipeline;

pub use model::{
    ExtraMethodModel, GeneratedType, GenerationModel, ModelKind, OperationModel, ResourceModel,
};
pub use pipeline::{generate_model, run_generation, GenerationRun, Generator};
