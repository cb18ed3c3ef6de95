//! In-process mock of the external domain
//!
//! Stands in for the middleware the engine reconciles against: a shared
//! registry of currently-present transients per kind, mutable from test
//! code (appear/vanish), with per-name construction faults to exercise the
//! engine's failure isolation. [`MockInterface`] wires one
//! [`TransientInterface`] per kind to a single hub, mirroring how a real
//! backend exposes services, topics and params side by side.

use crate::config::Config;
use crate::reconciler::{DiffTuple, TransientInterface};
use crate::stages::Hooks;
use crate::store::Name;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

/// The three transient kinds the mock domain serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Service,
    Topic,
    Param,
}

impl Kind {
    pub fn desc(self) -> &'static str {
        match self {
            Kind::Service => "service",
            Kind::Topic => "topic",
            Kind::Param => "param",
        }
    }
}

#[derive(Default)]
struct HubState {
    services: HashMap<Name, String>,
    topics: HashMap<Name, String>,
    params: HashMap<Name, String>,
    /// Names whose proxy construction fails while present here
    faulty: HashSet<Name>,
    /// Names whose proxies have been torn down, in teardown order
    cleaned: Vec<Name>,
}

impl HubState {
    fn kind(&self, kind: Kind) -> &HashMap<Name, String> {
        match kind {
            Kind::Service => &self.services,
            Kind::Topic => &self.topics,
            Kind::Param => &self.params,
        }
    }

    fn kind_mut(&mut self, kind: Kind) -> &mut HashMap<Name, String> {
        match kind {
            Kind::Service => &mut self.services,
            Kind::Topic => &mut self.topics,
            Kind::Param => &mut self.params,
        }
    }
}

/// Shared mock external system; clones observe the same state.
#[derive(Clone, Default)]
pub struct MockHub {
    state: Arc<RwLock<HubState>>,
}

impl MockHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transient appears on the external system.
    pub fn appear(&self, kind: Kind, name: impl Into<Name>, ty: impl Into<String>) {
        let name = name.into();
        tracing::debug!("Mock {} {} appears", kind.desc(), name);
        self.state
            .write()
            .unwrap()
            .kind_mut(kind)
            .insert(name, ty.into());
    }

    /// A transient disappears from the external system.
    pub fn vanish(&self, kind: Kind, name: &str) {
        tracing::debug!("Mock {} {} disappears", kind.desc(), name);
        self.state.write().unwrap().kind_mut(kind).remove(name);
    }

    /// Currently-present names of one kind.
    pub fn present(&self, kind: Kind) -> HashSet<Name> {
        self.state.read().unwrap().kind(kind).keys().cloned().collect()
    }

    /// Type of a present transient, if any.
    pub fn type_of(&self, kind: Kind, name: &str) -> Option<String> {
        self.state.read().unwrap().kind(kind).get(name).cloned()
    }

    /// While set, proxy construction for `name` fails.
    pub fn set_faulty(&self, name: impl Into<Name>, faulty: bool) {
        let mut state = self.state.write().unwrap();
        let name = name.into();
        if faulty {
            state.faulty.insert(name);
        } else {
            state.faulty.remove(&name);
        }
    }

    fn is_faulty(&self, name: &str) -> bool {
        self.state.read().unwrap().faulty.contains(name)
    }

    /// Names whose proxies were torn down, in teardown order.
    pub fn cleaned(&self) -> Vec<Name> {
        self.state.read().unwrap().cleaned.clone()
    }

    fn record_cleaned(&self, name: Name) {
        self.state.write().unwrap().cleaned.push(name);
    }
}

/// Constructed local proxy for a mock transient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockProxy {
    pub name: Name,
    pub ty: String,
}

fn interface_for(hub: &MockHub, kind: Kind) -> TransientInterface<String, MockProxy> {
    let discover_hub = hub.clone();
    let resolve_hub = hub.clone();
    let make_hub = hub.clone();
    let clean_hub = hub.clone();

    TransientInterface::new(
        kind.desc(),
        Hooks::new(
            move || discover_hub.present(kind),
            move |name| Ok(resolve_hub.type_of(kind, name)),
            move |name, ty: &String| {
                if make_hub.is_faulty(name) {
                    anyhow::bail!("mock {} {} refuses to build", kind.desc(), name);
                }
                Ok(MockProxy {
                    name: name.to_string(),
                    ty: ty.clone(),
                })
            },
            move |proxy: MockProxy| {
                clean_hub.record_cleaned(proxy.name);
                Ok(())
            },
        ),
    )
}

/// One reconciliation interface per kind, all over the same hub.
pub struct MockInterface {
    hub: MockHub,
    services: Arc<TransientInterface<String, MockProxy>>,
    topics: Arc<TransientInterface<String, MockProxy>>,
    params: Arc<TransientInterface<String, MockProxy>>,
}

impl MockInterface {
    pub fn new(hub: MockHub) -> Self {
        Self {
            services: Arc::new(interface_for(&hub, Kind::Service)),
            topics: Arc::new(interface_for(&hub, Kind::Topic)),
            params: Arc::new(interface_for(&hub, Kind::Param)),
            hub,
        }
    }

    pub fn hub(&self) -> &MockHub {
        &self.hub
    }

    pub fn services(&self) -> Arc<TransientInterface<String, MockProxy>> {
        self.services.clone()
    }

    pub fn topics(&self) -> Arc<TransientInterface<String, MockProxy>> {
        self.topics.clone()
    }

    pub fn params(&self) -> Arc<TransientInterface<String, MockProxy>> {
        self.params.clone()
    }

    pub fn expose_services<I, S>(&self, patterns: I) -> DiffTuple
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.services.expose(patterns)
    }

    pub fn expose_topics<I, S>(&self, patterns: I) -> DiffTuple
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.topics.expose(patterns)
    }

    pub fn expose_params<I, S>(&self, patterns: I) -> DiffTuple
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.params.expose(patterns)
    }

    /// Apply the per-kind pattern lists from a configuration file.
    pub fn expose_from_config(&self, config: &Config) -> DiffTuple {
        let mut diff = self.expose_services(config.expose.services.iter().cloned());
        diff.merge(self.expose_topics(config.expose.topics.iter().cloned()));
        diff.merge(self.expose_params(config.expose.params.iter().cloned()));
        diff
    }

    /// Reconcile every kind once; kinds use disjoint name spaces, so the
    /// merged diff loses nothing.
    pub fn update(&self) -> DiffTuple {
        let mut diff = self.services.reconcile();
        diff.merge(self.topics.reconcile());
        diff.merge(self.params.reconcile());
        diff
    }
}
