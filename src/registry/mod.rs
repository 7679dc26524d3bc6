mod proxy;

pub use proxy::{FieldMap, FieldProxy, ValueProxy};

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::broadcast;

use crate::error::{RegistryError, Result};
use crate::models::Fields;
use crate::tree::PathTree;

/// Buffered events per subscriber; a subscriber that lags further than this
/// misses the overflowed events rather than blocking the registry.
const EVENT_CAPACITY: usize = 256;

/// Discrete events published as registry operations complete.
///
/// Emission is a queue push into a broadcast channel, never an inline
/// callback, so a subscriber can safely re-enter the registry when it gets
/// around to draining its queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RegistryEvent {
    /// A model was bound at `path`.
    ModelBound { path: String },
    /// The model at `path` was unbound.
    ModelUnbound { path: String },
    /// Binding materialized a previously-absent terminal node at `path`.
    PathCreated { path: String },
    /// Pruning removed the subtree rooted at `path`; this is the highest
    /// path actually deleted.
    PathPruned { path: String },
}

/// Nested mapping of path segments, key presence only.
///
/// Serializes as plain nested JSON objects: binding `/x/y` and `/x/z`
/// yields `{"x": {"y": {}, "z": {}}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyTree(pub BTreeMap<String, KeyTree>);

/// Builds the proxy stored for one model field; registered per field kind,
/// with [`ValueProxy`] as the fallback for unregistered kinds.
pub type ProxyFactory =
    Arc<dyn Fn(&Arc<dyn Fields>, &str) -> Arc<dyn FieldProxy> + Send + Sync>;

/// Binds externally-owned models to tree paths and mirrors their fields as
/// addressable proxies.
///
/// The registry is synchronous and single-writer: every operation runs to
/// completion with no internal locking. Wrap it in a [`RegistryHandle`]
/// when multiple execution contexts need access.
pub struct Registry {
    tree: PathTree,
    factories: HashMap<String, ProxyFactory>,
    events: broadcast::Sender<RegistryEvent>,
}

impl Registry {
    pub fn new() -> Self {
        Self::with_separator('/')
    }

    pub fn with_separator(separator: char) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            tree: PathTree::new(separator),
            factories: HashMap::new(),
            events,
        }
    }

    pub fn separator(&self) -> char {
        self.tree.separator()
    }

    /// Subscribe to the event feed. Each subscriber gets every event
    /// emitted after this call, in emission order.
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.events.subscribe()
    }

    /// Override the proxy constructed for fields of `kind`.
    pub fn register_proxy(&mut self, kind: &str, factory: ProxyFactory) {
        self.factories.insert(kind.to_string(), factory);
    }

    // ============================================================
    // Binding
    // ============================================================

    /// Bind `model` at `path`, materializing missing ancestors and
    /// mirroring every model field as a proxy on the terminal node.
    ///
    /// The stored reference is non-owning; the caller remains responsible
    /// for the model's lifetime. Fails with [`RegistryError::AlreadyBound`]
    /// if the path's edge already carries a model reference, live or not.
    pub fn bind(&mut self, path: &str, model: &Arc<dyn Fields>) -> Result<()> {
        let (id, created) = self.tree.ensure(path)?;
        if self.tree.incoming(id).is_bound() {
            return Err(RegistryError::AlreadyBound(path.to_string()));
        }

        let mut proxies = FieldMap::new();
        for field in model.field_names() {
            let proxy = match model.kind(&field).and_then(|k| self.factories.get(&k)) {
                Some(factory) => factory(model, &field),
                None => Arc::new(ValueProxy::new(model, &field)),
            };
            proxies.insert(field, proxy);
        }
        *self.tree.fields_mut(id) = proxies;
        self.tree.incoming_mut(id).bind(Arc::downgrade(model));

        if created {
            self.emit(RegistryEvent::PathCreated {
                path: path.to_string(),
            });
        }
        self.emit(RegistryEvent::ModelBound {
            path: path.to_string(),
        });
        Ok(())
    }

    /// Clear the binding at `path` and prune ancestors that no longer
    /// serve a purpose.
    ///
    /// Unbinding an existing-but-unbound path is not an error; the clear
    /// and prune are structural no-ops.
    pub fn unbind(&mut self, path: &str) -> Result<()> {
        let id = self.tree.lookup(path)?;
        self.tree.fields_mut(id).clear();
        self.tree.incoming_mut(id).clear();
        self.emit(RegistryEvent::ModelUnbound {
            path: path.to_string(),
        });

        if let Some(removed) = self.prune(path)? {
            self.emit(RegistryEvent::PathPruned { path: removed });
        }
        Ok(())
    }

    /// Remove the now-unbound branch at `path`.
    ///
    /// Aborts if any descendant edge still carries a model: the branch
    /// stays because deeper registrations depend on these ancestors.
    /// Otherwise deletes the subtree, then walks upward removing one node
    /// at a time until it meets a bound edge or a node that still has
    /// other children. Returns the highest path actually deleted.
    fn prune(&mut self, path: &str) -> Result<Option<String>> {
        for descendant in self.tree.depth_first(Some(path))? {
            if self.tree.edge(&descendant)?.is_bound() {
                return Ok(None);
            }
        }

        let separator = self.tree.separator();
        for child in self.tree.children(Some(path))? {
            self.tree.remove(&format!("{path}{separator}{child}"))?;
        }

        let mut removed = None;
        let mut current = Some(path.to_string());
        while let Some(p) = current {
            let id = self.tree.lookup(&p)?;
            if self.tree.incoming(id).is_bound() || !self.tree.children(Some(&p))?.is_empty() {
                break;
            }
            current = self.tree.parent(&p)?;
            self.tree.remove(&p)?;
            removed = Some(p);
        }
        Ok(removed)
    }

    // ============================================================
    // Queries
    // ============================================================

    /// The field proxies at `path`, as a defensive copy: the returned map
    /// reads and writes through the live proxies, but mutating the map
    /// itself never touches the node.
    pub fn node(&self, path: &str) -> Result<FieldMap> {
        let id = self.tree.lookup(path)?;
        Ok(self.tree.fields(id).clone())
    }

    /// The resolved field values at `path`. Fields whose model has been
    /// released resolve to `null`.
    pub fn values(&self, path: &str) -> Result<Map<String, Value>> {
        let id = self.tree.lookup(path)?;
        let mut values = Map::new();
        for (name, field) in self.tree.fields(id) {
            values.insert(name.clone(), field.value().unwrap_or(Value::Null));
        }
        Ok(values)
    }

    /// Immediate child segments of `path` (the root when absent).
    pub fn children(&self, path: Option<&str>) -> Result<Vec<String>> {
        self.tree.children(path)
    }

    /// Every path currently in the tree.
    pub fn nodes(&self) -> Vec<String> {
        self.tree.nodes()
    }

    pub fn parent(&self, path: &str) -> Result<Option<String>> {
        self.tree.parent(path)
    }

    /// The nested key hierarchy of every descendant of `path` (the whole
    /// tree when absent). Paths sharing a prefix share a subtree of keys.
    pub fn tree(&self, path: Option<&str>) -> Result<KeyTree> {
        let separator = self.tree.separator();
        let prefix_len = path.map_or(0, str::len);
        let mut root = KeyTree::default();
        for descendant in self.tree.depth_first(path)? {
            let mut cursor = &mut root;
            for segment in descendant[prefix_len..].split(separator).skip(1) {
                cursor = cursor.0.entry(segment.to_string()).or_default();
            }
        }
        Ok(root)
    }

    fn emit(&self, event: RegistryEvent) {
        // Send only fails when nobody is subscribed.
        let _ = self.events.send(event);
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// Clonable, explicitly-constructed handle sharing one [`Registry`] across
/// execution contexts. Mutating calls serialize through the inner lock;
/// there is no implicit global instance anywhere.
#[derive(Clone)]
pub struct RegistryHandle {
    inner: Arc<Mutex<Registry>>,
}

impl RegistryHandle {
    pub fn new(registry: Registry) -> Self {
        Self {
            inner: Arc::new(Mutex::new(registry)),
        }
    }

    pub fn separator(&self) -> char {
        self.lock().separator()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.lock().subscribe()
    }

    pub fn register_proxy(&self, kind: &str, factory: ProxyFactory) {
        self.lock().register_proxy(kind, factory)
    }

    pub fn bind(&self, path: &str, model: &Arc<dyn Fields>) -> Result<()> {
        self.lock().bind(path, model)
    }

    pub fn unbind(&self, path: &str) -> Result<()> {
        self.lock().unbind(path)
    }

    pub fn node(&self, path: &str) -> Result<FieldMap> {
        self.lock().node(path)
    }

    pub fn values(&self, path: &str) -> Result<Map<String, Value>> {
        self.lock().values(path)
    }

    pub fn children(&self, path: Option<&str>) -> Result<Vec<String>> {
        self.lock().children(path)
    }

    pub fn nodes(&self) -> Vec<String> {
        self.lock().nodes()
    }

    pub fn parent(&self, path: &str) -> Result<Option<String>> {
        self.lock().parent(path)
    }

    pub fn tree(&self, path: Option<&str>) -> Result<KeyTree> {
        self.lock().tree(path)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Registry> {
        self.inner.lock().expect("registry lock poisoned")
    }
}
