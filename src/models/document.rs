use std::sync::Mutex;

use serde_json::{Map, Value};

/// Capability interface every registrable model exposes.
///
/// Implementations must be safe to share across threads; the registry keeps
/// only `Weak` handles to them, so every trait method takes `&self` and
/// mutation goes through interior mutability.
pub trait Fields: Send + Sync {
    /// The names of the model's fields, in no particular order.
    fn field_names(&self) -> Vec<String>;

    /// Current value of one field, or `None` for an unknown name.
    fn get(&self, field: &str) -> Option<Value>;

    /// Overwrite one field. Unknown names are ignored; the field set is
    /// fixed when the model is constructed.
    fn set(&self, field: &str, value: Value);

    /// A kind tag for the field, used to pick a proxy factory override.
    /// Defaults to the JSON type name of the field's current value.
    fn kind(&self, field: &str) -> Option<String> {
        self.get(field).map(|v| json_kind(&v).to_string())
    }
}

/// The JSON type name of a value.
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A model backed by a JSON object.
///
/// Field names and their initial values come from the object the document
/// is constructed with; writes replace values but never add or remove
/// fields.
pub struct Document {
    data: Mutex<Map<String, Value>>,
}

impl Document {
    pub fn new(data: Map<String, Value>) -> Self {
        Self {
            data: Mutex::new(data),
        }
    }

    /// Build a document from any JSON value, rejecting non-objects.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self::new(map)),
            _ => None,
        }
    }
}

impl Fields for Document {
    fn field_names(&self) -> Vec<String> {
        let data = self.data.lock().expect("document lock poisoned");
        data.keys().cloned().collect()
    }

    fn get(&self, field: &str) -> Option<Value> {
        let data = self.data.lock().expect("document lock poisoned");
        data.get(field).cloned()
    }

    fn set(&self, field: &str, value: Value) {
        let mut data = self.data.lock().expect("document lock poisoned");
        if let Some(slot) = data.get_mut(field) {
            *slot = value;
        }
    }
}
