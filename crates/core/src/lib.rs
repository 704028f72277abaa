//! Domain model for the hosting control plane
//!
//! This crate has no workflow logic of its own. It specifies:
//! - [`domain`]: the resource kinds the orchestrator manages, and the
//!   uniform lifecycle status every one of them shares
//! - [`error`]: the error taxonomy workflows classify failures into
//! - [`ula`]: pure functions for tenant address/proxy derivation
//! - [`activities`]: the typed RPC surface between workflows and their three
//!   external collaborators (core store, node agents, third-party services)
//!
//! Nothing here talks to a database or a node agent. The traits in
//! [`activities`] describe what a collaborator must expose; the worker crate
//! both calls them (from workflow code, via `ActivitySpec` markers) and
//! implements them (via adapters backed by a real client).

pub mod activities;
pub mod domain;
pub mod error;
pub mod ula;

pub use domain::{Resource, ResourceStatus};
pub use error::{CoreError, ErrorKind};
