//! Version-2 pack assembly from commit roots.
//!
//! Walks each root commit through its tree to every reachable blob,
//! deduplicates by object id, skips anything the store already holds in a
//! prior pack, and emits the survivors as full (non-delta) entries: header
//! varint, then a self-contained zlib stream. The 12-byte pack header is
//! prepended and the trailing SHA-1 appended last.
//!
//! Trees are emitted post-order — after the blobs and subtrees they
//! reference — so a streaming reader never sees a forward reference, though
//! the format itself does not require this. Commits are emitted in caller
//! order, each before its tree.
//!
//! A builder is single-shot: `build` consumes it.

use std::collections::HashSet;

use sha1::{Digest, Sha1};
use tracing::debug;

use crate::commit::{parse_commit, CommitParseError};
use crate::entry::ObjectKind;
use crate::errors::PackError;
use crate::object_id::OidBytes;
use crate::parse::{PACK_MAGIC, PACK_VERSION};
use crate::store::ObjectStore;
use crate::tree::{TreeEntryIter, TreeEntryKind, TreeParseError};
use crate::zlib;

/// Counters from one pack build.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuildStats {
    /// Commit objects emitted.
    pub commits: u32,
    /// Tree objects emitted.
    pub trees: u32,
    /// Blob objects emitted.
    pub blobs: u32,
    /// Objects skipped because a stored pack already holds them.
    pub already_packed: u32,
    /// Total bytes of the finished pack, header and checksum included.
    pub total_bytes: u64,
}

/// A finished pack buffer with its build counters.
#[derive(Debug)]
pub struct BuiltPack {
    /// The complete pack: header, entries, trailing SHA-1.
    pub bytes: Vec<u8>,
    /// Build counters.
    pub stats: BuildStats,
}

/// Single-shot builder for a version-2 pack.
#[derive(Debug)]
pub struct PackBuilder {
    roots: Vec<OidBytes>,
}

impl PackBuilder {
    /// Creates a builder over the given root commits.
    ///
    /// Roots are walked in the order given; duplicates are emitted once.
    #[must_use]
    pub fn new(roots: Vec<OidBytes>) -> Self {
        Self { roots }
    }

    /// Builds the pack, consuming the builder.
    ///
    /// The store is only read; nothing is persisted.
    ///
    /// # Errors
    /// Fails if a reachable object is missing from the store, a commit or
    /// tree payload is malformed, or the store itself errors.
    pub fn build<S: ObjectStore + ?Sized>(self, store: &mut S) -> Result<BuiltPack, PackError> {
        let mut writer = PackWriter {
            body: Vec::new(),
            count: 0,
            stats: BuildStats::default(),
            visited: HashSet::new(),
        };

        for root in &self.roots {
            writer.add_commit(store, *root)?;
        }

        let (bytes, stats) = writer.finish();
        debug!(
            commits = stats.commits,
            trees = stats.trees,
            blobs = stats.blobs,
            bytes = stats.total_bytes,
            "pack built"
        );
        Ok(BuiltPack { bytes, stats })
    }

    /// Builds the pack and hands the bytes to the store.
    ///
    /// Persistence happens only after the build fully succeeds.
    pub fn build_and_persist<S: ObjectStore + ?Sized>(
        self,
        store: &mut S,
    ) -> Result<BuiltPack, PackError> {
        let built = self.build(store)?;
        store.persist_pack(&built.bytes)?;
        Ok(built)
    }
}

/// Accumulates emitted entries ahead of final framing.
struct PackWriter {
    body: Vec<u8>,
    count: u32,
    stats: BuildStats,
    visited: HashSet<OidBytes>,
}

impl PackWriter {
    fn add_commit<S: ObjectStore + ?Sized>(
        &mut self,
        store: &mut S,
        oid: OidBytes,
    ) -> Result<(), PackError> {
        if !self.visited.insert(oid) {
            return Ok(());
        }
        if store.contains_packed(&oid)? {
            self.stats.already_packed += 1;
            return Ok(());
        }

        let (kind, bytes) = store
            .retrieve(&oid, Some(ObjectKind::Commit))?
            .ok_or(PackError::MissingBase { oid })?;
        if kind != ObjectKind::Commit {
            return Err(CommitParseError::corrupt("root object is not a commit").into());
        }
        let commit = parse_commit(&bytes)?;

        self.emit(ObjectKind::Commit, &bytes)?;
        self.stats.commits += 1;

        self.add_tree(store, commit.tree)
    }

    fn add_tree<S: ObjectStore + ?Sized>(
        &mut self,
        store: &mut S,
        oid: OidBytes,
    ) -> Result<(), PackError> {
        if !self.visited.insert(oid) {
            return Ok(());
        }
        if store.contains_packed(&oid)? {
            // A packed tree's whole subtree is assumed reachable remotely.
            self.stats.already_packed += 1;
            return Ok(());
        }

        let (kind, bytes) = store
            .retrieve(&oid, Some(ObjectKind::Tree))?
            .ok_or(PackError::MissingBase { oid })?;
        if kind != ObjectKind::Tree {
            return Err(TreeParseError::corrupt("tree entry references a non-tree").into());
        }

        for entry in TreeEntryIter::new(&bytes) {
            let entry = entry?;
            match entry.kind {
                TreeEntryKind::Tree => self.add_tree(store, entry.oid)?,
                TreeEntryKind::Blob | TreeEntryKind::ExecutableBlob | TreeEntryKind::Symlink => {
                    self.add_blob(store, entry.oid)?;
                }
                // Submodule commits live in another repository.
                TreeEntryKind::Gitlink => {}
                TreeEntryKind::Unknown => {
                    return Err(TreeParseError::corrupt("unknown tree entry mode").into());
                }
            }
        }

        self.emit(ObjectKind::Tree, &bytes)?;
        self.stats.trees += 1;
        Ok(())
    }

    fn add_blob<S: ObjectStore + ?Sized>(
        &mut self,
        store: &mut S,
        oid: OidBytes,
    ) -> Result<(), PackError> {
        if !self.visited.insert(oid) {
            return Ok(());
        }
        if store.contains_packed(&oid)? {
            self.stats.already_packed += 1;
            return Ok(());
        }

        let (kind, bytes) = store
            .retrieve(&oid, Some(ObjectKind::Blob))?
            .ok_or(PackError::MissingBase { oid })?;
        if kind != ObjectKind::Blob {
            return Err(TreeParseError::corrupt("tree entry references a non-blob").into());
        }

        self.emit(ObjectKind::Blob, &bytes)?;
        self.stats.blobs += 1;
        Ok(())
    }

    /// Appends one full entry: header varint plus deflated payload.
    fn emit(&mut self, kind: ObjectKind, bytes: &[u8]) -> Result<(), PackError> {
        self.push_entry_header(kind, bytes.len() as u64);
        let deflated = zlib::deflate(bytes)?;
        self.body.extend_from_slice(&deflated);
        self.count += 1;
        Ok(())
    }

    /// Encodes the entry header: 3-bit kind, 4 size bits in the first byte,
    /// 7 per continuation byte.
    fn push_entry_header(&mut self, kind: ObjectKind, mut size: u64) {
        let mut byte = (kind.wire_value() << 4) | (size & 0x0f) as u8;
        size >>= 4;
        while size > 0 {
            self.body.push(byte | 0x80);
            byte = (size & 0x7f) as u8;
            size >>= 7;
        }
        self.body.push(byte);
    }

    /// Frames the accumulated body with the pack header and trailing SHA-1.
    fn finish(mut self) -> (Vec<u8>, BuildStats) {
        let mut out = Vec::with_capacity(12 + self.body.len() + 20);
        out.extend_from_slice(&PACK_MAGIC);
        out.extend_from_slice(&PACK_VERSION.to_be_bytes());
        out.extend_from_slice(&self.count.to_be_bytes());
        out.extend_from_slice(&self.body);
        let digest: [u8; 20] = Sha1::digest(&out).into();
        out.extend_from_slice(&digest);

        self.stats.total_bytes = out.len() as u64;
        (out, self.stats)
    }
}
