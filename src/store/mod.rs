//! Keyed container of tracked entities
//!
//! An entity is one tracked external resource. Instead of the schema-less
//! component dict this design descends from, components are typed optional
//! fields: presence/absence of a component is what drives which pipeline
//! stage may act on the entity, so `filter_by_components` derives a
//! presence set from the fields and filters on it. This is the only
//! querying primitive the stages use, and the only mutable shared state in
//! the engine.

use crate::error::{Result, TransixError};
use ahash::{HashMap, HashMapExt};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// External resource identifier, unique within one store.
pub type Name = String;

/// Constructs a local proxy for a resolved resource.
pub type Maker<T, H> = Arc<dyn Fn(&str, &T) -> anyhow::Result<H> + Send + Sync>;

/// Tears down a local proxy.
pub type Cleaner<H> = Arc<dyn Fn(H) -> anyhow::Result<()> + Send + Sync>;

/// Transient change marker, consumed within the cycle that produced it
///
/// `Unknown` means "no marker present": component-presence filtering treats
/// it as absence, so consuming the marker is a plain reset to `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Changed {
    #[default]
    Unknown,
    Appeared,
    Gone,
}

/// The component slots an entity can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Name,
    Desc,
    Changed,
    Type,
    Maker,
    Cleaner,
    Proxy,
}

impl Component {
    fn bit(self) -> u8 {
        match self {
            Component::Name => 1 << 0,
            Component::Desc => 1 << 1,
            Component::Changed => 1 << 2,
            Component::Type => 1 << 3,
            Component::Maker => 1 << 4,
            Component::Cleaner => 1 << 5,
            Component::Proxy => 1 << 6,
        }
    }
}

/// Set of component slots, used for stage contracts and store queries.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct ComponentSet(u8);

impl ComponentSet {
    pub const EMPTY: ComponentSet = ComponentSet(0);

    pub fn of(components: &[Component]) -> Self {
        let mut bits = 0;
        for c in components {
            bits |= c.bit();
        }
        Self(bits)
    }

    pub fn insert(&mut self, c: Component) {
        self.0 |= c.bit();
    }

    pub fn contains(&self, c: Component) -> bool {
        self.0 & c.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Whether every component in `other` is present in `self`.
    pub fn is_superset_of(&self, other: ComponentSet) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_disjoint_from(&self, other: ComponentSet) -> bool {
        self.0 & other.0 == 0
    }
}

impl fmt::Debug for ComponentSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let all = [
            Component::Name,
            Component::Desc,
            Component::Changed,
            Component::Type,
            Component::Maker,
            Component::Cleaner,
            Component::Proxy,
        ];
        f.debug_set()
            .entries(all.iter().filter(|c| self.contains(**c)))
            .finish()
    }
}

/// One tracked external resource
///
/// `T` is the opaque resource type descriptor (resolved externally), `H`
/// the opaque local proxy handle. A live entity is one whose `proxy` is
/// present.
pub struct Entity<T, H> {
    /// External resource identifier; empty for content-keyed entities
    pub name: Name,
    /// Human-readable kind label ("service", "topic", "param", ...)
    pub desc: String,
    /// Transient marker set by the detectors, consumed by the filters
    pub changed: Changed,
    /// Resolved type descriptor, absent until resolution succeeds
    pub ty: Option<T>,
    /// Proxy constructor, assigned once the entity is confirmed wanted
    pub maker: Option<Maker<T, H>>,
    /// Proxy destructor, assigned once the entity is confirmed unwanted
    pub cleaner: Option<Cleaner<H>>,
    /// The constructed local proxy; presence means the resource is live
    pub proxy: Option<H>,
}

impl<T, H> Entity<T, H> {
    pub fn new(name: impl Into<Name>, desc: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            desc: desc.into(),
            changed: Changed::Unknown,
            ty: None,
            maker: None,
            cleaner: None,
            proxy: None,
        }
    }

    pub fn with_changed(mut self, changed: Changed) -> Self {
        self.changed = changed;
        self
    }

    /// Presence set derived from the fields.
    pub fn components(&self) -> ComponentSet {
        let mut set = ComponentSet::EMPTY;
        if !self.name.is_empty() {
            set.insert(Component::Name);
        }
        if !self.desc.is_empty() {
            set.insert(Component::Desc);
        }
        if self.changed != Changed::Unknown {
            set.insert(Component::Changed);
        }
        if self.ty.is_some() {
            set.insert(Component::Type);
        }
        if self.maker.is_some() {
            set.insert(Component::Maker);
        }
        if self.cleaner.is_some() {
            set.insert(Component::Cleaner);
        }
        if self.proxy.is_some() {
            set.insert(Component::Proxy);
        }
        set
    }

    /// Whether a live proxy has been built for this resource.
    pub fn is_live(&self) -> bool {
        self.proxy.is_some()
    }

    /// Storage key: the name when the entity has one, otherwise a
    /// deterministic content hash (index-less store support).
    pub fn storage_key(&self) -> Name {
        if !self.name.is_empty() {
            return self.name.clone();
        }
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.desc.as_bytes());
        hasher.update(&[self.components().0]);
        hasher.finalize().to_hex().to_string()
    }
}

impl<T: Clone, H> Entity<T, H> {
    /// Read-only view of this entity for external serving layers.
    pub fn snapshot(&self) -> EntitySnapshot<T> {
        EntitySnapshot {
            name: self.name.clone(),
            desc: self.desc.clone(),
            ty: self.ty.clone(),
            live: self.is_live(),
        }
    }
}

impl<T: fmt::Debug, H> fmt::Debug for Entity<T, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("name", &self.name)
            .field("desc", &self.desc)
            .field("changed", &self.changed)
            .field("ty", &self.ty)
            .field("components", &self.components())
            .finish()
    }
}

/// Read-only projection of a tracked entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySnapshot<T> {
    pub name: Name,
    pub desc: String,
    pub ty: Option<T>,
    pub live: bool,
}

/// Keyed collection of entities; at most one entity per resource name
///
/// The store exclusively owns its entities. Stages only see references for
/// the duration of one cycle.
pub struct EntityStore<T, H> {
    entities: HashMap<Name, Entity<T, H>>,
}

impl<T, H> Default for EntityStore<T, H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, H> EntityStore<T, H> {
    pub fn new() -> Self {
        Self {
            entities: HashMap::new(),
        }
    }

    /// Insert a new entity; fails if its key is already tracked.
    pub fn create(&mut self, entity: Entity<T, H>) -> Result<&Entity<T, H>> {
        let key = entity.storage_key();
        if self.entities.contains_key(&key) {
            return Err(TransixError::DuplicateEntity { key });
        }
        Ok(self.entities.entry(key).or_insert(entity))
    }

    pub fn get(&self, key: &str) -> Option<&Entity<T, H>> {
        self.entities.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Entity<T, H>> {
        self.entities.get_mut(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entities.contains_key(key)
    }

    pub fn delete(&mut self, key: &str) -> Option<Entity<T, H>> {
        self.entities.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity<T, H>> {
        self.entities.values()
    }

    /// Entities whose component set is a superset of `include` and disjoint
    /// from `exclude`. The sole querying primitive used by every stage.
    pub fn filter_by_components(
        &self,
        include: ComponentSet,
        exclude: ComponentSet,
    ) -> Vec<&Entity<T, H>> {
        self.entities
            .values()
            .filter(|e| {
                let comps = e.components();
                comps.is_superset_of(include) && comps.is_disjoint_from(exclude)
            })
            .collect()
    }

    /// Storage keys of the matching entities, for loops that need `get_mut`.
    pub fn keys_by_components(&self, include: ComponentSet, exclude: ComponentSet) -> Vec<Name> {
        self.filter_by_components(include, exclude)
            .into_iter()
            .map(|e| e.storage_key())
            .collect()
    }

    /// O(1)-lookup index by name for external callers needing a snapshot.
    pub fn index_by_name(&self) -> HashMap<&str, &Entity<T, H>> {
        self.entities
            .values()
            .filter(|e| !e.name.is_empty())
            .map(|e| (e.name.as_str(), e))
            .collect()
    }

    /// Names of all tracked entities.
    pub fn names(&self) -> HashSet<Name> {
        self.entities
            .values()
            .filter(|e| !e.name.is_empty())
            .map(|e| e.name.clone())
            .collect()
    }

    /// Names of entities with a live proxy; the reconciler diffs this set.
    pub fn live_names(&self) -> HashSet<Name> {
        self.entities
            .values()
            .filter(|e| e.is_live())
            .map(|e| e.name.clone())
            .collect()
    }
}
