// Entity sink: tears down the proxy of every unwanted live entity and
// destroys the entity unconditionally, even when the cleaner fails, so
// tracking entries never leak.

use crate::error::TransixError;
use crate::stages::{Stage, StageContext, StageSpec};
use crate::store::{Component, ComponentSet, EntityStore};

pub struct InterfaceRemover;

impl<T, H> Stage<T, H> for InterfaceRemover {
    fn name(&self) -> &'static str {
        "interface_remover"
    }

    fn spec(&self) -> StageSpec {
        StageSpec {
            input: ComponentSet::of(&[
                Component::Name,
                Component::Type,
                Component::Desc,
                Component::Cleaner,
                Component::Proxy,
            ]),
            output: ComponentSet::EMPTY,
        }
    }

    fn run(&self, store: &mut EntityStore<T, H>, _ctx: &StageContext<'_, T, H>) {
        let removable = store.keys_by_components(
            ComponentSet::of(&[
                Component::Name,
                Component::Type,
                Component::Desc,
                Component::Cleaner,
                Component::Proxy,
            ]),
            ComponentSet::EMPTY,
        );

        for key in removable {
            if let Some(mut e) = store.delete(&key) {
                tracing::info!("Removing {} {}", e.desc, e.name);
                if let (Some(cleaner), Some(proxy)) = (e.cleaner.take(), e.proxy.take()) {
                    if let Err(source) = cleaner(proxy) {
                        // best-effort teardown; the entity is gone either way
                        let err = TransixError::Cleanup {
                            desc: e.desc.clone(),
                            name: e.name.clone(),
                            source,
                        };
                        tracing::warn!("{}", err);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::PatternSet;
    use crate::stages::{testutil, Hooks};
    use crate::store::Entity;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn removable_entity(name: &str, hooks: &Hooks<String, String>) -> Entity<String, String> {
        let mut e = Entity::new(name, "service");
        e.ty = Some("mock_type".to_string());
        e.cleaner = Some(hooks.clean.clone());
        e.proxy = Some(format!("proxy:{name}"));
        e
    }

    fn run_stage(store: &mut EntityStore<String, String>, hooks: &Hooks<String, String>) {
        let discovered = HashSet::new();
        let patterns = PatternSet::default();
        let ctx = StageContext {
            desc: "service",
            discovered: &discovered,
            patterns: &patterns,
            hooks,
        };
        InterfaceRemover.run(store, &ctx);
    }

    #[test]
    fn test_cleans_and_destroys() {
        let cleaned = Arc::new(AtomicUsize::new(0));
        let counter = cleaned.clone();
        let hooks = Hooks::new(
            HashSet::new,
            |_name: &str| Ok(Some("mock_type".to_string())),
            |name: &str, _ty: &String| Ok(format!("proxy:{name}")),
            move |_proxy: String| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
        );

        let mut store = EntityStore::new();
        store.create(removable_entity("/svc", &hooks)).unwrap();

        run_stage(&mut store, &hooks);

        assert!(store.is_empty());
        assert_eq!(cleaned.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_destroyed_even_when_cleaner_fails() {
        let hooks = Hooks::new(
            HashSet::new,
            |_name: &str| Ok(Some("mock_type".to_string())),
            |name: &str, _ty: &String| Ok(format!("proxy:{name}")),
            |_proxy: String| anyhow::bail!("teardown exploded"),
        );

        let mut store = EntityStore::new();
        store.create(removable_entity("/svc", &hooks)).unwrap();

        run_stage(&mut store, &hooks);

        // no leaked tracking entry
        assert!(store.is_empty());
    }

    #[test]
    fn test_entities_without_cleaner_kept() {
        let hooks = testutil::hooks();
        let mut store = EntityStore::new();
        let mut e = Entity::new("/keep", "service");
        e.ty = Some("mock_type".to_string());
        e.proxy = Some("proxy:/keep".to_string());
        store.create(e).unwrap();

        run_stage(&mut store, &hooks);

        assert!(store.get("/keep").is_some());
    }
}
