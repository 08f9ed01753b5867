//! Establishment directory.
//!
//! Establishments are owned by an external directory. The scheduling engine
//! only looks them up to decorate occurrences for display and never treats a
//! missing entry as an error.

use std::collections::HashMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Display summary of an establishment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Establishment {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
}

impl Establishment {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            sector: None,
        }
    }

    pub fn with_sector(mut self, sector: impl Into<String>) -> Self {
        self.sector = Some(sector.into());
        self
    }
}

/// Lookup of establishments by id.
pub trait EstablishmentDirectory: Send + Sync {
    fn lookup(&self, id: &str) -> Option<Establishment>;
}

/// Directory backed by a fixed list, usually taken from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    entries: HashMap<String, Establishment>,
}

impl StaticDirectory {
    pub fn new(establishments: impl IntoIterator<Item = Establishment>) -> Self {
        Self {
            entries: establishments
                .into_iter()
                .map(|e| (e.id.clone(), e))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl EstablishmentDirectory for StaticDirectory {
    fn lookup(&self, id: &str) -> Option<Establishment> {
        self.entries.get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_lookup() {
        let directory = StaticDirectory::new([
            Establishment::new("est-1", "Centre social Est").with_sector("Est"),
            Establishment::new("est-2", "Bibliothèque"),
        ]);
        assert_eq!(directory.len(), 2);
        assert_eq!(directory.lookup("est-1").unwrap().sector.as_deref(), Some("Est"));
        assert!(directory.lookup("est-3").is_none());
    }
}
