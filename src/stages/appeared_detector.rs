// Entity source: creates a tracking entity for every newly discovered name.

use crate::stages::{Stage, StageContext, StageSpec};
use crate::store::{Changed, Component, ComponentSet, Entity, EntityStore};

pub struct AppearedDetector;

impl<T, H> Stage<T, H> for AppearedDetector {
    fn name(&self) -> &'static str {
        "appeared_detector"
    }

    fn spec(&self) -> StageSpec {
        StageSpec {
            input: ComponentSet::EMPTY,
            output: ComponentSet::of(&[Component::Changed]),
        }
    }

    fn run(&self, store: &mut EntityStore<T, H>, ctx: &StageContext<'_, T, H>) {
        for name in ctx.discovered {
            if store.contains(name) {
                continue;
            }
            tracing::debug!("Detected {} {} appearing", ctx.desc, name);
            if let Err(err) =
                store.create(Entity::new(name.clone(), ctx.desc).with_changed(Changed::Appeared))
            {
                // contains() was checked above; a collision here means a
                // concurrent mutation slipped past the cycle write guard
                tracing::warn!("Skipping appeared {}: {}", name, err);
            }
        }
    }
}
