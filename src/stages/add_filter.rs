// Decides which tracked entities are wanted: entities matching a current
// pattern receive the proxy constructor. The appeared marker is consumed on
// every entity this stage touches.
//
// Matching is monotone over the tracked set, not just over freshly appeared
// entities: a pattern added after a resource appeared still binds a maker to
// it within one cycle.

use crate::stages::{Stage, StageContext, StageSpec};
use crate::store::{Changed, Component, ComponentSet, EntityStore};
use std::sync::Arc;

pub struct AddFilter;

impl<T, H> Stage<T, H> for AddFilter {
    fn name(&self) -> &'static str {
        "add_filter"
    }

    /// Declared marker interest. `Changed` is listed as input because this
    /// stage consumes the appeared marker, but the query in [`Self::run`]
    /// does not require it: maker-less entities are matched regardless, so
    /// a pattern added after a resource appeared still binds.
    fn spec(&self) -> StageSpec {
        StageSpec {
            input: ComponentSet::of(&[Component::Name, Component::Changed, Component::Desc]),
            output: ComponentSet::of(&[Component::Maker]),
        }
    }

    fn run(&self, store: &mut EntityStore<T, H>, ctx: &StageContext<'_, T, H>) {
        let unbound = store.keys_by_components(
            ComponentSet::of(&[Component::Name, Component::Desc]),
            ComponentSet::of(&[Component::Maker]),
        );

        for key in unbound {
            if let Some(e) = store.get_mut(&key) {
                if ctx.patterns.match_first(&e.name).is_none() {
                    continue;
                }
                tracing::debug!("Wanted {} {}", e.desc, e.name);
                e.maker = Some(Arc::clone(&ctx.hooks.make));
                e.changed = Changed::Unknown;
            }
        }
    }
}
