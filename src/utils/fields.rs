use serde_json::{Map, Value};

/// Loose truthiness for optional arguments: empty strings, zero, `false`,
/// empty collections and JSON null all count as "not supplied".
pub trait Truthy {
    fn is_truthy(&self) -> bool;
}

impl Truthy for str {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl Truthy for String {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl Truthy for i64 {
    fn is_truthy(&self) -> bool {
        *self != 0
    }
}

impl Truthy for f64 {
    fn is_truthy(&self) -> bool {
        *self != 0.0
    }
}

impl Truthy for bool {
    fn is_truthy(&self) -> bool {
        *self
    }
}

impl<T> Truthy for Vec<T> {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl Truthy for Value {
    fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(flag) => *flag,
            Value::Number(n) => n.as_f64().map(|v| v != 0.0).unwrap_or(true),
            Value::String(s) => !s.is_empty(),
            Value::Array(items) => !items.is_empty(),
            Value::Object(map) => !map.is_empty(),
        }
    }
}

impl<T: Truthy + ?Sized> Truthy for &T {
    fn is_truthy(&self) -> bool {
        (**self).is_truthy()
    }
}

impl<T: Truthy> Truthy for Option<T> {
    fn is_truthy(&self) -> bool {
        self.as_ref().map(Truthy::is_truthy).unwrap_or(false)
    }
}

/// `Some(value)` only when the value is set and truthy.
pub fn truthy<T: Truthy>(value: &Option<T>) -> Option<&T> {
    value.as_ref().filter(|v| v.is_truthy())
}

/// Ordered JSON object builder for outbound request bodies.
#[derive(Debug, Default, Clone)]
pub struct Fields(Map<String, Value>);

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn put_truthy<T>(self, key: &str, value: &Option<T>) -> Self
    where
        T: Truthy + Clone + Into<Value>,
    {
        match truthy(value) {
            Some(v) => self.put(key, v.clone()),
            None => self,
        }
    }

    /// Includes the field whenever the caller supplied it, even if falsy.
    pub fn put_present<T>(self, key: &str, value: &Option<T>) -> Self
    where
        T: Clone + Into<Value>,
    {
        match value {
            Some(v) => self.put(key, v.clone()),
            None => self,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}
