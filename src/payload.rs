use std::{collections::BTreeMap, fmt, sync::Arc};

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{Error, Result};

/// Key under which a payload stores its single value when a behavior only needs one.
pub const DEFAULT_PAYLOAD: &str = "default";

/// Raw key/value set used to build or override payloads.
pub type PayloadValues = BTreeMap<String, Value>;

/// Immutable key/value data carried by an [`Event`](crate::Event).
///
/// A payload is never mutated after construction. [`Payload::apply`] returns
/// a new payload and leaves the original untouched, so one payload can be
/// shared by every subscriber receiving the same event.
///
/// ```
/// use cellnet::{Payload, DEFAULT_PAYLOAD};
/// use serde_json::json;
///
/// let original = Payload::new(json!(4711));
/// let derived = original.apply([(DEFAULT_PAYLOAD.to_string(), json!(1234))]);
///
/// assert_eq!(original.default_value(), Some(&json!(4711)));
/// assert_eq!(derived.default_value(), Some(&json!(1234)));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payload {
    values: Arc<PayloadValues>,
}

impl Payload {
    /// Creates a payload holding `value` under [`DEFAULT_PAYLOAD`].
    pub fn new<V: Into<Value>>(value: V) -> Self {
        let mut values = PayloadValues::new();
        values.insert(DEFAULT_PAYLOAD.to_string(), value.into());
        Self::from(values)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Serializes `value` and stores it under [`DEFAULT_PAYLOAD`].
    pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        let value = serde_json::to_value(value).map_err(Error::Encoding)?;
        Ok(Self::new(value))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.get(DEFAULT_PAYLOAD)
    }

    /// Deserializes the value stored under `key`.
    pub fn decode<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self
            .get(key)
            .ok_or_else(|| Error::MissingValue(key.to_string()))?;
        T::deserialize(value).map_err(|source| Error::Decoding {
            key: key.to_string(),
            source,
        })
    }

    /// Returns a new payload: this one overlaid with `overrides`.
    pub fn apply<I, K>(&self, overrides: I) -> Payload
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let mut values = PayloadValues::clone(&self.values);
        values.extend(overrides.into_iter().map(|(k, v)| (k.into(), v)));
        Self::from(values)
    }

    /// Keys in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<PayloadValues> for Payload {
    fn from(values: PayloadValues) -> Self {
        Self {
            values: Arc::new(values),
        }
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

impl From<()> for Payload {
    fn from(_: ()) -> Self {
        Self::empty()
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<")?;
        for (i, (key, value)) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{key:?}: {value}")?;
        }
        write!(f, ">")
    }
}
