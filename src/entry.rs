//! In-memory pack entry model.
//!
//! A `PackEntry` is the parser's unit: header offset, declared size, CRC32
//! over the on-wire range, and the inflated payload. Deltified entries carry
//! a `BaseRef` until resolution rewrites them in place with their
//! materialized kind, payload, and object id.

use crate::object_id::OidBytes;

/// Materialized object kind with its wire discriminant.
///
/// Wire values 6 (offset delta) and 7 (reference delta) are transient pack
/// encodings, represented by [`BaseRef`] on the entry instead; they never
/// appear here. Wire values 0 and 5 are reserved and rejected by the parser.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Commit = 1,
    Tree = 2,
    Blob = 3,
    Tag = 4,
}

impl ObjectKind {
    /// Maps a 3-bit wire kind to a materialized kind.
    ///
    /// Returns `None` for the delta kinds (6, 7) and the reserved values.
    #[must_use]
    pub const fn from_wire(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Commit),
            2 => Some(Self::Tree),
            3 => Some(Self::Blob),
            4 => Some(Self::Tag),
            _ => None,
        }
    }

    /// Returns the 3-bit wire discriminant.
    #[inline]
    #[must_use]
    pub const fn wire_value(self) -> u8 {
        self as u8
    }

    /// Returns the lowercase kind name used in the object hash frame.
    #[must_use]
    pub const fn frame_name(self) -> &'static [u8] {
        match self {
            Self::Commit => b"commit",
            Self::Tree => b"tree",
            Self::Blob => b"blob",
            Self::Tag => b"tag",
        }
    }

    /// Returns the kind name as UTF-8.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Commit => "commit",
            Self::Tree => "tree",
            Self::Blob => "blob",
            Self::Tag => "tag",
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Delta base reference recorded by the parser.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BaseRef {
    /// Base is the entry whose header starts at this absolute pack offset.
    /// Always strictly less than the referencing entry's offset.
    Offset(u64),
    /// Base is identified by object id; it may live in this pack or in the
    /// external object store.
    Ref(OidBytes),
}

/// A single pack entry.
///
/// Created by the parser with `payload` populated eagerly. Deltified entries
/// start with `kind == None`, `oid == None`, and `payload` holding delta
/// instructions; resolution rewrites all three and clears `base`.
///
/// # Invariants
/// - `kind.is_some() == oid.is_some()` at every observable point.
/// - `base.is_some()` implies `oid.is_none()` (deltified, unresolved).
/// - `crc32` covers the on-wire bytes `[header_start, payload_end)` and is
///   computed unconditionally.
#[derive(Clone, Debug)]
pub struct PackEntry {
    /// Byte position of the entry's first header byte within the pack.
    pub offset: u64,
    /// Inflated payload length declared by the entry header. For deltified
    /// entries this is the delta instruction length, not the result length.
    pub size: u64,
    /// CRC32 (IEEE) over the entry's on-wire bytes.
    pub crc32: u32,
    /// Materialized kind; `None` until a deltified entry is resolved.
    pub kind: Option<ObjectKind>,
    /// Pending delta base; `None` for materialized entries.
    pub base: Option<BaseRef>,
    /// Inflated bytes. `None` only after [`PackEntry::release_payload`].
    pub payload: Option<Vec<u8>>,
    /// Framed content hash; set once the entry is materialized.
    pub oid: Option<OidBytes>,
}

impl PackEntry {
    /// Returns true if the entry still awaits delta resolution.
    #[inline]
    #[must_use]
    pub fn is_delta(&self) -> bool {
        self.base.is_some()
    }

    /// Returns true if the entry carries a materialized kind and id.
    #[inline]
    #[must_use]
    pub fn is_materialized(&self) -> bool {
        self.oid.is_some()
    }

    /// Drops the payload to relieve memory pressure, returning it.
    ///
    /// Callers may only release after the entry is materialized; the id
    /// stays available for lookups. Releasing before delta resolution
    /// completes would discard bytes other entries still need.
    ///
    /// # Panics
    ///
    /// Panics if the entry is not materialized.
    pub fn release_payload(&mut self) -> Option<Vec<u8>> {
        assert!(
            self.oid.is_some(),
            "payload released before materialization"
        );
        self.payload.take()
    }
}
