//! Git packfile parsing, delta resolution, and pack assembly.
//!
//! The engine turns a version-2 pack buffer into fully materialized,
//! SHA-1-identified objects, and conversely assembles a new pack from a set
//! of commit roots. Durable storage is a collaborator, not a concern: the
//! [`store::ObjectStore`] seam supplies delta bases the pack itself lacks
//! and receives finished pack buffers.
//!
//! Pipeline overview (parse side):
//! 1. `parse` validates the header, enumerates entries, inflates payloads,
//!    computes per-entry CRC32, and verifies the trailing SHA-1.
//! 2. `resolve` expands offset- and reference-deltas in place, consulting
//!    the object store for external bases.
//! 3. Every entry now carries a materialized kind, payload, and object id.
//!
//! Pipeline overview (build side):
//! 1. `build` walks root commits through trees to blobs, deduplicating by
//!    id and skipping objects already packed in the store.
//! 2. Objects are emitted as full entries (no deltas) and framed with the
//!    pack header and trailing SHA-1.
//!
//! # Invariants
//! - All operations are synchronous and single-threaded per pack; the
//!   store and codec boundaries are the only external calls.
//! - Any failure aborts the current operation; partial results are never
//!   observable.
//! - Entry payloads are bounded by explicit [`limits::PackLimits`] caps.

pub mod build;
pub mod commit;
pub mod delta;
pub mod entry;
pub mod errors;
pub mod limits;
pub mod object_id;
pub mod parse;
pub mod resolve;
pub mod store;
pub mod tree;
pub mod zlib;

pub use build::{BuildStats, BuiltPack, PackBuilder};
pub use commit::{parse_commit, CommitParseError, ParsedCommit};
pub use delta::{apply_delta, delta_sizes, DeltaError};
pub use entry::{BaseRef, ObjectKind, PackEntry};
pub use errors::PackError;
pub use limits::PackLimits;
pub use object_id::{oid_for_object, OidBytes, OID_LEN};
pub use parse::{parse_pack, ParsedPack, PACK_MAGIC, PACK_VERSION};
pub use resolve::{resolve_pack, ResolveStats};
pub use store::{MemoryStore, ObjectStore, StoreError};
pub use tree::{encode_tree_entry, TreeEntry, TreeEntryIter, TreeEntryKind, TreeParseError};
pub use zlib::ZlibError;

/// Parses a pack buffer and resolves every delta against `store`.
///
/// Convenience composition of [`parse_pack`] and [`resolve_pack`]; on
/// success every returned entry is materialized.
pub fn read_pack<S: ObjectStore + ?Sized>(
    bytes: &[u8],
    store: &mut S,
    limits: &PackLimits,
) -> Result<(ParsedPack, ResolveStats), PackError> {
    let mut pack = parse_pack(bytes, limits)?;
    let stats = resolve_pack(&mut pack, store, limits)?;
    Ok((pack, stats))
}
