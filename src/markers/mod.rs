//! # Markers
//!
//! The annotation front end. [`MarkerRegistry`] declares which markers exist,
//! what they attach to and what payload shape they take; [`ParsedMarker`]
//! splits one annotation into namespace, feature, arguments, option and
//! payload following
//!
//! ```text
//! +<namespace>:<feature>[:<verb-or-verbs>][[<option>(<value>)]]=<payload>
//! ```
//!
//! For example `+clientgen:asyncExtraMethod:POST[wait(10m)]=/widgets/{id}/rebuild`.

mod grammar;
mod registry;

pub use grammar::*;
pub use registry::*;

/// Namespace used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "clientgen";
