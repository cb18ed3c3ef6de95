// Resolves type descriptors for entities that do not have one yet. A failed
// or inconclusive lookup leaves the entity untyped for retry next cycle and
// never aborts the remaining entities.

use crate::error::TransixError;
use crate::stages::{Stage, StageContext, StageSpec};
use crate::store::{Component, ComponentSet, EntityStore};

pub struct TypeResolver;

impl<T, H> Stage<T, H> for TypeResolver {
    fn name(&self) -> &'static str {
        "type_resolver"
    }

    fn spec(&self) -> StageSpec {
        StageSpec {
            input: ComponentSet::of(&[Component::Name]),
            output: ComponentSet::of(&[Component::Type]),
        }
    }

    fn run(&self, store: &mut EntityStore<T, H>, ctx: &StageContext<'_, T, H>) {
        let unresolved = store.keys_by_components(
            ComponentSet::of(&[Component::Name]),
            ComponentSet::of(&[Component::Type]),
        );

        for key in unresolved {
            let desc = match store.get(&key) {
                Some(e) => e.desc.clone(),
                None => continue,
            };
            match (ctx.hooks.resolve)(&key) {
                Ok(Some(ty)) => {
                    if let Some(e) = store.get_mut(&key) {
                        e.ty = Some(ty);
                    }
                }
                Ok(None) => {
                    tracing::debug!("Type of {} {} not known yet", desc, key);
                }
                Err(source) => {
                    let err = TransixError::Resolution {
                        desc,
                        name: key.clone(),
                        source,
                    };
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

    fn run_with_hooks(store: &mut EntityStore<String, String>, hooks: &Hooks<String, String>) {
        let discovered = HashSet::new();
        let patterns = PatternSet::default();
        let ctx = StageContext {
            desc: "service",
            discovered: &discovered,
            patterns: &patterns,
            hooks,
        };
        TypeResolver.run(store, &ctx);
    }

    #[test]
    fn test_resolves_untyped_entities() {
        let mut store = EntityStore::new();
        store.create(Entity::new("/svc", "service")).unwrap();

        run_with_hooks(&mut store, &testutil::hooks());

        assert_eq!(
            store.get("/svc").unwrap().ty.as_deref(),
            Some("mock_type")
        );
    }

    #[test]
    fn test_already_typed_entities_skipped() {
        let mut store = EntityStore::new();
        let mut e = Entity::new("/svc", "service");
        e.ty = Some("original_type".to_string());
        store.create(e).unwrap();

        run_with_hooks(&mut store, &testutil::hooks());

        assert_eq!(
            store.get("/svc").unwrap().ty.as_deref(),
            Some("original_type")
        );
    }

    #[test]
    fn test_unresolvable_entity_left_untyped() {
        let mut store = EntityStore::new();
        store.create(Entity::new("/svc", "service")).unwrap();

        run_with_hooks(&mut store, &testutil::unresolvable_hooks());

        assert!(store.get("/svc").unwrap().ty.is_none());
    }

    #[test]
    fn test_resolver_error_isolated_per_entity() {
        let mut store = EntityStore::new();
        store.create(Entity::new("/bad", "service")).unwrap();
        store.create(Entity::new("/good", "service")).unwrap();

        let hooks = Hooks::new(
            HashSet::new,
            |name: &str| {
                if name == "/bad" {
                    anyhow::bail!("lookup blew up")
                }
                Ok(Some("mock_type".to_string()))
            },
            |name: &str, _ty: &String| Ok(format!("proxy:{name}")),
            |_proxy: String| Ok(()),
        );
        run_with_hooks(&mut store, &hooks);

        assert!(store.get("/bad").unwrap().ty.is_none());
        assert!(store.get("/good").unwrap().ty.is_some());
    }
}
