//! Reconciler: one interface per tracked resource kind
//!
//! A [`TransientInterface`] owns the entity store, the pattern registry and
//! the seven pipeline stages for one resource kind, and runs them in a
//! fixed order against a single discovery snapshot per cycle. The whole
//! pass holds the store's write guard, so concurrent readers (`snapshot`)
//! never observe a partially-reconciled state. There is exactly one
//! reconciliation owner per interface; a cycle runs to completion.

use crate::matching::PatternSet;
use crate::stages::{
    AddFilter, AppearedDetector, GoneDetector, Hooks, InterfaceAdder, InterfaceRemover,
    RemoveFilter, Stage, StageContext, TypeResolver,
};
use crate::store::{EntitySnapshot, EntityStore, Name};
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

/// Names whose live-proxy status changed during one reconciliation cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffTuple {
    /// Resources newly exposed this cycle
    pub added: HashSet<Name>,
    /// Resources withdrawn this cycle
    pub removed: HashSet<Name>,
}

impl DiffTuple {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    /// Union with another diff (kinds use disjoint name spaces).
    pub fn merge(&mut self, other: DiffTuple) {
        self.added.extend(other.added);
        self.removed.extend(other.removed);
    }
}

/// Reconciliation engine for one kind of transient resource.
pub struct TransientInterface<T, H> {
    /// Kind label used for entity `desc` and log lines
    desc: String,
    hooks: Hooks<T, H>,
    store: RwLock<EntityStore<T, H>>,
    patterns: RwLock<PatternSet>,
    /// Fixed stage order: appeared, add-filter, resolve, add, gone,
    /// remove-filter, remove
    stages: Vec<Box<dyn Stage<T, H>>>,
}

impl<T, H> TransientInterface<T, H> {
    pub fn new(desc: impl Into<String>, hooks: Hooks<T, H>) -> Self {
        Self {
            desc: desc.into(),
            hooks,
            store: RwLock::new(EntityStore::new()),
            patterns: RwLock::new(PatternSet::default()),
            stages: vec![
                Box::new(AppearedDetector),
                Box::new(AddFilter),
                Box::new(TypeResolver),
                Box::new(InterfaceAdder),
                Box::new(GoneDetector),
                Box::new(RemoveFilter),
                Box::new(InterfaceRemover),
            ],
        }
    }

    /// Kind label of this interface.
    pub fn desc(&self) -> &str {
        &self.desc
    }

    /// Currently-desired exposure patterns, in registry order.
    pub fn patterns(&self) -> Vec<String> {
        self.patterns
            .read()
            .unwrap()
            .raw_patterns()
            .map(|p| p.to_string())
            .collect()
    }

    /// Run one full reconciliation pass without changing the pattern set.
    ///
    /// Discovery is snapshotted once at cycle start. The diff compares the
    /// set of live names (proxy built) before and after the pass; with
    /// unchanged discovery output and patterns a second pass yields an
    /// empty diff.
    pub fn reconcile(&self) -> DiffTuple {
        let discovered = (self.hooks.discover)();
        self.run_cycle(discovered)
    }

    /// Run one pass from an externally-supplied presence diff instead of
    /// polling the discovery hook.
    ///
    /// For callers whose backend pushes appear/disappear notifications: the
    /// effective discovery snapshot is the tracked set plus `appeared` minus
    /// `gone`.
    pub fn reconcile_with_diff(&self, appeared: HashSet<Name>, gone: HashSet<Name>) -> DiffTuple {
        let mut discovered = self.store.read().unwrap().names();
        discovered.extend(appeared);
        for name in &gone {
            discovered.remove(name);
        }
        self.run_cycle(discovered)
    }

    fn run_cycle(&self, discovered: HashSet<Name>) -> DiffTuple {
        let patterns = self.patterns.read().unwrap().clone();

        let mut store = self.store.write().unwrap();
        let before = store.live_names();

        let ctx = StageContext {
            desc: &self.desc,
            discovered: &discovered,
            patterns: &patterns,
            hooks: &self.hooks,
        };
        for stage in &self.stages {
            tracing::trace!("Running {} stage for {}", stage.name(), self.desc);
            stage.run(&mut store, &ctx);
        }

        let after = store.live_names();
        DiffTuple {
            added: after.difference(&before).cloned().collect(),
            removed: before.difference(&after).cloned().collect(),
        }
    }

    /// Replace the desired-pattern set and reconcile immediately.
    ///
    /// An empty list is valid and means "expose nothing"; resources whose
    /// matching pattern is withdrawn are removed even while still present
    /// externally.
    pub fn expose<I, S>(&self, patterns: I) -> DiffTuple
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let next = PatternSet::compile(patterns);
        {
            let mut current = self.patterns.write().unwrap();
            for p in next.raw_patterns() {
                if !current.contains(p) {
                    tracing::info!("Exposing {} pattern: {}", self.desc, p);
                }
            }
            for p in current.raw_patterns() {
                if !next.contains(p) {
                    tracing::info!("Withholding {} pattern: {}", self.desc, p);
                }
            }
            *current = next;
        }
        self.reconcile()
    }
}

impl<T: Clone, H> TransientInterface<T, H> {
    /// Read-only view of the current tracked set, keyed by name.
    ///
    /// Takes the store's read guard; safe to call from other threads while
    /// a cycle is pending.
    pub fn snapshot(&self) -> HashMap<Name, EntitySnapshot<T>> {
        self.store
            .read()
            .unwrap()
            .iter()
            .map(|e| (e.name.clone(), e.snapshot()))
            .collect()
    }
}
