// Decides which tracked entities are no longer wanted: the union of gone
// entities and entities no-longer-matching any pattern, deduplicated by
// name. Liveness in the external system wins over pattern intent, and
// pattern withdrawal alone forces removal even while the resource is still
// present.
//
// Candidates with a live proxy receive the cleaner for the remover to act
// on. A gone candidate that never built a proxy has nothing to tear down
// and is dropped from tracking on the spot. A still-present unmatched
// candidate stays tracked but loses any assigned maker, so the adder stops
// building something no longer wanted.

use crate::stages::{Stage, StageContext, StageSpec};
use crate::store::{Changed, Component, ComponentSet, EntityStore, Name};
use std::sync::Arc;

pub struct RemoveFilter;

impl<T, H> Stage<T, H> for RemoveFilter {
    fn name(&self) -> &'static str {
        "remove_filter"
    }

    /// Declared marker interest. `Changed` is listed as input because the
    /// gone marker feeds the candidate set and is consumed here, but the
    /// query in [`Self::run`] does not require it: pattern withdrawal alone
    /// also produces candidates.
    fn spec(&self) -> StageSpec {
        StageSpec {
            input: ComponentSet::of(&[Component::Name, Component::Changed, Component::Desc]),
            output: ComponentSet::of(&[Component::Cleaner]),
        }
    }

    fn run(&self, store: &mut EntityStore<T, H>, ctx: &StageContext<'_, T, H>) {
        // gone ∪ unmatched, one candidate entry per name
        let candidates: Vec<Name> = store
            .filter_by_components(
                ComponentSet::of(&[Component::Name, Component::Desc]),
                ComponentSet::EMPTY,
            )
            .into_iter()
            .filter(|e| {
                e.changed == Changed::Gone || ctx.patterns.match_first(&e.name).is_none()
            })
            .map(|e| e.storage_key())
            .collect();

        for key in candidates {
            let gone = store
                .get(&key)
                .is_some_and(|e| e.changed == Changed::Gone);
            let live = store.get(&key).is_some_and(|e| e.proxy.is_some());

            if live {
                if let Some(e) = store.get_mut(&key) {
                    tracing::debug!("Unwanted {} {}", e.desc, e.name);
                    e.cleaner = Some(Arc::clone(&ctx.hooks.clean));
                    e.changed = Changed::Unknown;
                }
            } else if gone {
                // never interfaced; drop the tracking entry outright
                if let Some(e) = store.delete(&key) {
                    tracing::debug!("Dropping never-built {} {}", e.desc, e.name);
                }
            } else if let Some(e) = store.get_mut(&key) {
                // still present, just not wanted: tracked but inert
                e.maker = None;
                e.changed = Changed::Unknown;
            }
        }
    }
}
