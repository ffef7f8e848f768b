//! Resource keys.
//!
//! Latency is aggregated per resource: a database, or a collection within a
//! database. Keys are parsed once from a namespace string so the registry
//! never re-splits delimited strings on the hot path.

use std::fmt;

/// Collection name used by command pseudo-namespaces (`db.$cmd`).
const COMMAND_COLLECTION: &str = "$cmd";

/// Resource an operation targeted.
///
/// Database names never contain a `.`: constructors split at the first one
/// and move the rest into the collection. Two keys are therefore equal
/// exactly when their namespaces are.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey {
    database: String,
    collection: Option<String>,
}

impl ResourceKey {
    /// Key for a whole database. A dotted name is read as `db.collection`.
    pub fn database(name: impl Into<String>) -> Self {
        let name = name.into();
        match name.split_once('.') {
            Some((database, collection)) => Self {
                database: database.to_owned(),
                collection: Some(collection.to_owned()),
            },
            None => Self {
                database: name,
                collection: None,
            },
        }
    }

    /// Key for a collection within a database.
    pub fn collection(database: impl Into<String>, collection: impl Into<String>) -> Self {
        let database = database.into();
        let collection = collection.into();
        match database.split_once('.') {
            Some((database, rest)) => Self {
                database: database.to_owned(),
                collection: Some(format!("{rest}.{collection}")),
            },
            None => Self {
                database,
                collection: Some(collection),
            },
        }
    }

    /// Parse a `db.collection` namespace, filtering out targets that are
    /// never recorded.
    ///
    /// Returns `None` for empty or unknown (`?`-prefixed) namespaces and for
    /// command pseudo-namespaces. The namespace is split at the first `.`;
    /// the collection keeps any further dots.
    pub fn from_namespace(ns: &str) -> Option<Self> {
        if ns.is_empty() || ns.starts_with('?') {
            return None;
        }

        match ns.split_once('.') {
            None => Some(Self::database(ns)),
            Some(("", _)) => None,
            Some((_, coll)) if coll == COMMAND_COLLECTION => None,
            Some((_, coll)) if coll.starts_with("$cmd.") => None,
            Some((db, "")) => Some(Self::database(db)),
            Some((db, coll)) => Some(Self::collection(db, coll)),
        }
    }

    /// Database name.
    pub fn database_name(&self) -> &str {
        &self.database
    }

    /// Collection name, if the key targets a collection.
    pub fn collection_name(&self) -> Option<&str> {
        self.collection.as_deref()
    }

    /// Full namespace: `db` or `db.collection`.
    pub fn namespace(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.collection {
            Some(collection) => write!(f, "{}.{}", self.database, collection),
            None => f.write_str(&self.database),
        }
    }
}

/// How resource keys are arranged inside a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyShape {
    /// One histogram per full namespace string.
    Flat,
    /// Database -> collection -> histogram. Supports both the per-database
    /// compact view and the per-collection verbose view.
    #[default]
    Hierarchical,
}
