use std::{borrow::Borrow, hash::Hash, ops::Deref, sync::Arc};

/// Process-unique identifier of a cell within an [`Environment`](crate::Environment).
///
/// Ids are cheap to clone and compare by their textual value, so an id
/// built from a `&str` matches the one the cell was started with.
///
/// ```
/// use cellnet::CellId;
///
/// let id = CellId::from("collector");
/// assert_eq!(id, CellId::from(String::from("collector")));
/// assert_eq!(id.as_str(), "collector");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct CellId(Arc<str>);

impl CellId {
    /// Creates an id from a random UUID v4.
    pub fn random() -> Self {
        Self(Arc::from(uuid::Uuid::new_v4().to_string()))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CellId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Hash for CellId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl Deref for CellId {
    type Target = str;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Borrow<str> for CellId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CellId {
    fn from(id: &str) -> Self {
        Self(Arc::from(id))
    }
}

impl From<String> for CellId {
    fn from(id: String) -> Self {
        Self(Arc::from(id))
    }
}

impl From<&CellId> for CellId {
    fn from(id: &CellId) -> Self {
        id.clone()
    }
}

impl PartialEq<str> for CellId {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for CellId {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}
