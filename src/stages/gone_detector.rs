// Marks tracked entities whose name is absent from the latest discovery.

use crate::stages::{Stage, StageContext, StageSpec};
use crate::store::{Changed, Component, ComponentSet, EntityStore};

pub struct GoneDetector;

impl<T, H> Stage<T, H> for GoneDetector {
    fn name(&self) -> &'static str {
        "gone_detector"
    }

    fn spec(&self) -> StageSpec {
        StageSpec {
            input: ComponentSet::of(&[Component::Name]),
            output: ComponentSet::of(&[Component::Changed]),
        }
    }

    fn run(&self, store: &mut EntityStore<T, H>, ctx: &StageContext<'_, T, H>) {
        let known = store.keys_by_components(
            ComponentSet::of(&[Component::Name]),
            ComponentSet::EMPTY,
        );

        for key in known {
            if ctx.discovered.contains(&key) {
                continue;
            }
            if let Some(e) = store.get_mut(&key) {
                tracing::debug!("Detected {} {} gone", e.desc, e.name);
                e.changed = Changed::Gone;
            }
        }
    }
}
