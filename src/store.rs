//! Object store seam.
//!
//! The engine never touches durable storage itself. It reads previously
//! stored objects through [`ObjectStore`] during delta resolution and the
//! builder walk, and hands finished pack buffers back through
//! `persist_pack`. The store is read-only during a parse and append-only
//! during a build; writes happen only after a successful build.
//!
//! [`MemoryStore`] is a HashMap-backed implementation for tests and
//! embedders that manage persistence elsewhere.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io;

use crate::entry::ObjectKind;
use crate::object_id::{oid_for_object, OidBytes};

/// Errors surfaced by object store implementations.
#[derive(Debug)]
#[non_exhaustive]
pub enum StoreError {
    /// I/O error from the backing storage.
    Io(io::Error),
    /// Backend-specific failure.
    Backend { detail: String },
}

impl StoreError {
    /// Creates a backend error with a human-readable detail string.
    pub fn backend(detail: impl Into<String>) -> Self {
        Self::Backend {
            detail: detail.into(),
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "store I/O error: {err}"),
            Self::Backend { detail } => write!(f, "store backend error: {detail}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Backend { .. } => None,
        }
    }
}

impl From<io::Error> for StoreError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

/// Durable object lookup and pack persistence.
///
/// `retrieve` returns `Ok(None)` for absent objects; the resolver maps that
/// to its own missing-base error. The `kind_hint` is advisory (callers pass
/// the kind they expect when they know it); implementations may ignore it.
pub trait ObjectStore {
    /// Returns true if the object already lives in a stored pack.
    fn contains_packed(&self, oid: &OidBytes) -> Result<bool, StoreError>;

    /// Returns a materialized object's kind and payload bytes.
    fn retrieve(
        &mut self,
        oid: &OidBytes,
        kind_hint: Option<ObjectKind>,
    ) -> Result<Option<(ObjectKind, Vec<u8>)>, StoreError>;

    /// Stores a completed pack buffer.
    fn persist_pack(&mut self, bytes: &[u8]) -> Result<(), StoreError>;
}

/// In-memory object store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: HashMap<OidBytes, (ObjectKind, Vec<u8>)>,
    packed: HashSet<OidBytes>,
    packs: Vec<Vec<u8>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a materialized object and returns its framed id.
    pub fn insert(&mut self, kind: ObjectKind, bytes: Vec<u8>) -> OidBytes {
        let oid = oid_for_object(kind, &bytes);
        self.objects.insert(oid, (kind, bytes));
        oid
    }

    /// Marks an object as already present in a stored pack.
    pub fn mark_packed(&mut self, oid: OidBytes) {
        self.packed.insert(oid);
    }

    /// Returns true if the store holds the object.
    #[must_use]
    pub fn contains(&self, oid: &OidBytes) -> bool {
        self.objects.contains_key(oid)
    }

    /// Returns the pack buffers persisted so far, in persistence order.
    #[must_use]
    pub fn packs(&self) -> &[Vec<u8>] {
        &self.packs
    }

    /// Returns the number of stored objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Returns true if no objects are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl ObjectStore for MemoryStore {
    fn contains_packed(&self, oid: &OidBytes) -> Result<bool, StoreError> {
        Ok(self.packed.contains(oid))
    }

    fn retrieve(
        &mut self,
        oid: &OidBytes,
        _kind_hint: Option<ObjectKind>,
    ) -> Result<Option<(ObjectKind, Vec<u8>)>, StoreError> {
        Ok(self.objects.get(oid).map(|(kind, bytes)| (*kind, bytes.clone())))
    }

    fn persist_pack(&mut self, bytes: &[u8]) -> Result<(), StoreError> {
        self.packs.push(bytes.to_vec());
        Ok(())
    }
}
