//! The record type shared by the catalog, the HTTP surface and the poller.
//!
//! `Beer` is what `GET /beers` emits, what `POST /beers` accepts, and what
//! every [`DataSource`](super::DataSource) decodes.  It is a plain value: once
//! built it is never mutated, only cloned into snapshots.

use serde::{Deserialize, Serialize};

/// A single catalog entry.
///
/// ## Ordering
///
/// `Beer` derives [`Ord`] so ordering is a full structural comparison in field
/// order: `id`, then `name`, then `brewery`.  A missing `id` sorts before any
/// present one.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Beer {
    /// Caller-supplied identifier.  No generation happens anywhere; `null` or
    /// a missing field both decode to `None`.
    #[serde(default)]
    pub id: Option<i64>,

    /// Display name, e.g. "Luzerner Bier".
    pub name: String,

    /// Origin label, the brewery that makes it.
    pub brewery: String,
}

impl Beer {
    /// Shorthand constructor used when seeding the catalog.
    pub fn new(id: Option<i64>, name: impl Into<String>, brewery: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            brewery: brewery.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cmp::Ordering;

    #[test]
    fn decodes_null_and_missing_id() {
        let with_null: Beer =
            serde_json::from_str(r#"{"id":null,"name":"Urbräu","brewery":"Tavolago AG"}"#).unwrap();
        let without: Beer = serde_json::from_str(r#"{"name":"Urbräu","brewery":"Tavolago AG"}"#).unwrap();

        assert_eq!(with_null.id, None);
        assert_eq!(with_null, without);
    }

    #[test]
    fn encodes_all_three_fields() {
        let beer = Beer::new(Some(1), "Luzerner Bier", "Brauerei Luzern AG");
        let json = serde_json::to_value(&beer).unwrap();

        assert_eq!(
            json,
            serde_json::json!({"id": 1, "name": "Luzerner Bier", "brewery": "Brauerei Luzern AG"})
        );
    }

    #[test]
    fn rejects_missing_name() {
        let result = serde_json::from_str::<Beer>(r#"{"id":1,"brewery":"Tavolago AG"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn ordering_is_structural() {
        let a = Beer::new(Some(1), "B", "X");
        let b = Beer::new(Some(1), "B", "Y");
        let c = Beer::new(Some(2), "A", "A");
        let anonymous = Beer::new(None, "Z", "Z");

        assert_eq!(a.cmp(&b), Ordering::Less, "brewery breaks ties");
        assert_eq!(b.cmp(&c), Ordering::Less, "id compares first");
        assert_eq!(anonymous.cmp(&a), Ordering::Less, "missing id sorts first");
        assert_eq!(a.cmp(&a.clone()), Ordering::Equal);
    }
}
