//! Transix - Transient Resource Reconciliation Engine
//!
//! Tracks named transient resources that appear on and disappear from an
//! external system, matches them against user-supplied regex patterns, and
//! drives each matched resource through a staged pipeline that resolves its
//! type, constructs a live proxy, and tears the proxy down again when the
//! resource vanishes or its pattern is withdrawn.

pub mod config;
pub mod error;
pub mod matching;
pub mod mock;
pub mod reconciler;
pub mod scheduler;
pub mod stages;
pub mod store;

pub use error::{Result, TransixError};
pub use reconciler::{DiffTuple, TransientInterface};
pub use stages::Hooks;
