use std::collections::HashMap;
use std::sync::{Arc, Weak};

use serde_json::Value;

use crate::models::Fields;

/// The field map stored at every tree node.
///
/// Proxies are shared (`Arc`) so a lookup can hand callers a defensive copy
/// of the map: the copies read and write through the same proxies, but
/// inserting into or removing from the copy never touches the node.
pub type FieldMap = HashMap<String, Arc<dyn FieldProxy>>;

/// Indirection to one field of one model, through a non-owning reference.
///
/// A proxy outlives the liveness of its model: once every owner has dropped
/// the model, reads return `None` and writes are silently discarded. Stale
/// entries are the designed behavior, not an error.
pub trait FieldProxy: Send + Sync {
    /// The field name this proxy mediates.
    fn field(&self) -> &str;

    /// The field's current value, or `None` once the model is gone.
    fn value(&self) -> Option<Value>;

    /// Write through to the model; a no-op once the model is gone.
    fn set_value(&self, value: Value);
}

/// The default [`FieldProxy`]: plain pass-through get/set.
pub struct ValueProxy {
    model: Weak<dyn Fields>,
    field: String,
}

impl ValueProxy {
    pub fn new(model: &Arc<dyn Fields>, field: &str) -> Self {
        Self {
            model: Arc::downgrade(model),
            field: field.to_string(),
        }
    }
}

impl FieldProxy for ValueProxy {
    fn field(&self) -> &str {
        &self.field
    }

    fn value(&self) -> Option<Value> {
        self.model.upgrade().and_then(|m| m.get(&self.field))
    }

    fn set_value(&self, value: Value) {
        if let Some(model) = self.model.upgrade() {
            model.set(&self.field, value);
        }
    }
}
