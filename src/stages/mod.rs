//! The seven pipeline stages of one reconciliation cycle
//!
//! Each stage declares a `(input, output)` component contract: the entities
//! it reads and the components it adds. An empty input marks a source stage
//! (it creates entities), an empty output a sink stage (it destroys them).
//! Stages are plain values composed by the reconciler in a fixed order; they
//! communicate only through components on the entities, never directly.
//!
//! Per-entity callback failures are contained within the stage that produced
//! them: logged, entity left in its prior state for retry, siblings
//! unaffected.

mod add_filter;
mod appeared_detector;
mod gone_detector;
mod interface_adder;
mod interface_remover;
mod remove_filter;
mod type_resolver;

pub use add_filter::AddFilter;
pub use appeared_detector::AppearedDetector;
pub use gone_detector::GoneDetector;
pub use interface_adder::InterfaceAdder;
pub use interface_remover::InterfaceRemover;
pub use remove_filter::RemoveFilter;
pub use type_resolver::TypeResolver;

use crate::matching::PatternSet;
use crate::store::{Cleaner, ComponentSet, EntityStore, Maker, Name};
use std::collections::HashSet;
use std::sync::Arc;

/// The collaborator callbacks supplied by the surrounding system per
/// tracked resource kind
///
/// All callbacks are synchronous from the reconciler's point of view;
/// failures are reported as `anyhow::Error` and contained by the stage
/// that invoked them.
pub struct Hooks<T, H> {
    /// Returns all currently-present external resource names.
    pub discover: Arc<dyn Fn() -> HashSet<Name> + Send + Sync>,
    /// Resolves a resource's type descriptor; `Ok(None)` means not (yet)
    /// determinable.
    pub resolve: Arc<dyn Fn(&str) -> anyhow::Result<Option<T>> + Send + Sync>,
    /// Constructs a local proxy for a resolved resource.
    pub make: Maker<T, H>,
    /// Tears down a local proxy.
    pub clean: Cleaner<H>,
}

impl<T, H> Hooks<T, H> {
    pub fn new(
        discover: impl Fn() -> HashSet<Name> + Send + Sync + 'static,
        resolve: impl Fn(&str) -> anyhow::Result<Option<T>> + Send + Sync + 'static,
        make: impl Fn(&str, &T) -> anyhow::Result<H> + Send + Sync + 'static,
        clean: impl Fn(H) -> anyhow::Result<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            discover: Arc::new(discover),
            resolve: Arc::new(resolve),
            make: Arc::new(make),
            clean: Arc::new(clean),
        }
    }
}

impl<T, H> Clone for Hooks<T, H> {
    fn clone(&self) -> Self {
        Self {
            discover: Arc::clone(&self.discover),
            resolve: Arc::clone(&self.resolve),
            make: Arc::clone(&self.make),
            clean: Arc::clone(&self.clean),
        }
    }
}

/// Declared component contract of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageSpec {
    /// Components an entity must carry for the stage to consider it
    pub input: ComponentSet,
    /// Components the stage adds to the entities it acts on
    pub output: ComponentSet,
}

impl StageSpec {
    /// Source stages create entities instead of reading existing ones.
    pub fn is_source(&self) -> bool {
        self.input.is_empty()
    }

    /// Sink stages destroy entities instead of adding components.
    pub fn is_sink(&self) -> bool {
        self.output.is_empty()
    }
}

/// Per-cycle inputs shared by all stages
///
/// The discovery result is snapshotted once at cycle start so both
/// detectors see the same external state.
pub struct StageContext<'a, T, H> {
    /// Kind label for entities created this cycle ("service", "topic", ...)
    pub desc: &'a str,
    /// External resource names present at cycle start
    pub discovered: &'a HashSet<Name>,
    /// Currently-desired exposure patterns
    pub patterns: &'a PatternSet,
    /// Collaborator callbacks
    pub hooks: &'a Hooks<T, H>,
}

/// One reconciliation pipeline stage.
pub trait Stage<T, H>: Send + Sync {
    fn name(&self) -> &'static str;

    /// Declared `(input, output)` component contract.
    fn spec(&self) -> StageSpec;

    /// Run the stage against the store for one cycle.
    fn run(&self, store: &mut EntityStore<T, H>, ctx: &StageContext<'_, T, H>);
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;

    /// Hooks over string types: every name resolves to "mock_type", every
    /// build yields "proxy:<name>", cleanup always succeeds.
    pub fn hooks() -> Hooks<String, String> {
        Hooks::new(
            HashSet::new,
            |_name| Ok(Some("mock_type".to_string())),
            |name, _ty| Ok(format!("proxy:{name}")),
            |_proxy| Ok(()),
        )
    }

    /// Hooks whose resolver never finds a type.
    pub fn unresolvable_hooks() -> Hooks<String, String> {
        Hooks::new(
            HashSet::new,
            |_name| Ok(None),
            |name, _ty| Ok(format!("proxy:{name}")),
            |_proxy| Ok(()),
        )
    }
}
