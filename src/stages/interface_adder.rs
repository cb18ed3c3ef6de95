// Builds the local proxy for every wanted, resolved entity. A failed build
// leaves the entity proxyless for retry next cycle; siblings in the same
// stage are unaffected.

use crate::error::TransixError;
use crate::stages::{Stage, StageContext, StageSpec};
use crate::store::{Component, ComponentSet, EntityStore};

pub struct InterfaceAdder;

impl<T, H> Stage<T, H> for InterfaceAdder {
    fn name(&self) -> &'static str {
        "interface_adder"
    }

    fn spec(&self) -> StageSpec {
        StageSpec {
            input: ComponentSet::of(&[
                Component::Name,
                Component::Type,
                Component::Desc,
                Component::Maker,
            ]),
            output: ComponentSet::of(&[Component::Proxy]),
        }
    }

    fn run(&self, store: &mut EntityStore<T, H>, ctx: &StageContext<'_, T, H>) {
        let buildable = store.keys_by_components(
            ComponentSet::of(&[
                Component::Name,
                Component::Type,
                Component::Desc,
                Component::Maker,
            ]),
            ComponentSet::of(&[Component::Proxy]),
        );

        for key in buildable {
            let built = match store.get(&key) {
                Some(e) => match (e.maker.as_ref(), e.ty.as_ref()) {
                    (Some(maker), Some(ty)) => maker(&e.name, ty).map_err(|source| {
                        TransixError::Construction {
                            desc: e.desc.clone(),
                            name: e.name.clone(),
                            source,
                        }
                    }),
                    _ => continue,
                },
                None => continue,
            };

            match built {
                Ok(proxy) => {
                    if let Some(e) = store.get_mut(&key) {
                        e.proxy = Some(proxy);
                        tracing::info!("Interfacing with {} {}", e.desc, e.name);
                    }
                }
                Err(err) => {
                    tracing::warn!("{}", err);
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

    fn resolved_entity(name: &str, hooks: &Hooks<String, String>) -> Entity<String, String> {
        let mut e = Entity::new(name, "service");
        e.ty = Some("mock_type".to_string());
        e.maker = Some(hooks.make.clone());
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
        InterfaceAdder.run(store, &ctx);
    }

    #[test]
    fn test_builds_proxy_for_wanted_resolved_entity() {
        let hooks = testutil::hooks();
        let mut store = EntityStore::new();
        store.create(resolved_entity("/svc", &hooks)).unwrap();

        run_stage(&mut store, &hooks);

        assert_eq!(
            store.get("/svc").unwrap().proxy.as_deref(),
            Some("proxy:/svc")
        );
    }

    #[test]
    fn test_unresolved_entity_not_built() {
        let hooks = testutil::hooks();
        let mut store = EntityStore::new();
        let mut e = Entity::new("/untyped", "service");
        e.maker = Some(hooks.make.clone());
        store.create(e).unwrap();

        run_stage(&mut store, &hooks);

        assert!(store.get("/untyped").unwrap().proxy.is_none());
    }

    #[test]
    fn test_build_failure_isolated_and_retried() {
        let hooks = Hooks::new(
            HashSet::new,
            |_name: &str| Ok(Some("mock_type".to_string())),
            |name: &str, _ty: &String| {
                if name == "/flaky" {
                    anyhow::bail!("backend refused")
                }
                Ok(format!("proxy:{name}"))
            },
            |_proxy: String| Ok(()),
        );

        let mut store = EntityStore::new();
        store.create(resolved_entity("/flaky", &hooks)).unwrap();
        store.create(resolved_entity("/solid", &hooks)).unwrap();

        run_stage(&mut store, &hooks);

        // the failed build keeps its maker and stays proxyless for retry
        let flaky = store.get("/flaky").unwrap();
        assert!(flaky.proxy.is_none());
        assert!(flaky.maker.is_some());
        assert!(store.get("/solid").unwrap().proxy.is_some());
    }
}
