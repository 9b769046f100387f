//! # CLI Module
//!
//! Command-line driver for the generation pipeline.
//!
//! ## Commands
//!
//! ### `generate`
//!
//! Build the generation model and write it as JSON:
//!
//! ```bash
//! clientgen generate --spec openapi.yaml --resources src/models --wiring src/client.rs \
//!     --output target/clientgen/model.json
//! ```
//!
//! Options:
//! - `--spec <FILE>` - OpenAPI document (or `spec` in `clientgen.toml`)
//! - `--resources <PATH>...` - Annotated resource declarations
//! - `--wiring <FILE>...` - Hand-written client wiring
//! - `--output <FILE>` - Output file (default: stdout)
//! - `--config <FILE>` - Configuration file (default: `clientgen.toml` next to the spec)
//! - `--fail-on-issues` - Exit non-zero if any operation was excluded
//!
//! ### `lint`
//!
//! Check annotations without reading the OpenAPI document:
//!
//! ```bash
//! clientgen lint --resources src/models --fail-on-error
//! ```
//!
//! ### `inspect`
//!
//! Print the assembled resource descriptors:
//!
//! ```bash
//! clientgen inspect --resources src/models --wiring src/client.rs
//! ```
//!
//! Policy flags (`--operation-set`, `--array-of-primitives`, `--no-alias`)
//! are accepted by every command and override the configuration file.

mod commands;


pub use commands::{resolve_settings, run, run_cli, Cli, Commands, PolicyArgs, RunSettings, SourceArgs};
