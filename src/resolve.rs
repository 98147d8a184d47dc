//! Delta resolution over a parsed pack.
//!
//! Expands every deltified entry in place: the entry's kind becomes its
//! base's materialized kind, its payload becomes the delta result, and its
//! id is computed from the framed result. Offset-delta bases are earlier
//! entries in the same pack; reference-delta bases are looked up among
//! materialized entries first, then in the object store.
//!
//! Chains are walked with an explicit stack rather than recursion so
//! adversarial inputs cannot exhaust call depth; a configured depth cap
//! bounds them outright. Resolved entries retain their materialized bytes,
//! so every entry in a chain is expanded exactly once regardless of how
//! many dependents share it.
//!
//! Reference deltas may point forward: a base that is itself an unresolved
//! delta only becomes addressable by id once it materializes. The resolver
//! therefore runs passes until a fixpoint; a pass that resolves nothing
//! while entries remain means the leftover base ids can never appear, and
//! the first stalled entry's base is reported as missing.
//!
//! Each chain walk carries a visited set of the entries it has stepped
//! through; a reference edge that closes back onto the walk is a delta
//! cycle. Offset edges point strictly backward and cannot close a loop on
//! their own.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::delta::apply_delta;
use crate::entry::{BaseRef, ObjectKind, PackEntry};
use crate::errors::PackError;
use crate::limits::PackLimits;
use crate::object_id::{oid_for_object, OidBytes};
use crate::parse::ParsedPack;
use crate::store::ObjectStore;

/// Counters from one resolve pass over a pack.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResolveStats {
    /// Deltified entries expanded.
    pub resolved_deltas: u32,
    /// Object store lookups for external bases.
    pub store_lookups: u32,
    /// Fixpoint passes over the pending list.
    pub passes: u32,
    /// Longest delta chain expanded, in delta edges.
    pub max_chain_depth: u32,
}

/// The base a chain walk bottomed out on.
enum ChainBase {
    /// A materialized entry in this pack.
    Entry(usize),
    /// An object served by the external store.
    External(ObjectKind, Vec<u8>),
}

/// Outcome of one chain resolution attempt.
enum Attempt {
    Resolved,
    /// Blocked on a base id that is not yet materialized anywhere.
    Blocked(OidBytes),
}

/// Resolves every deltified entry of `pack` in place.
///
/// After a successful return every entry is materialized: `kind`, `payload`,
/// and `oid` are set and `base` is cleared. Entry order is unchanged. On
/// error the pack must be discarded; entries may be partially rewritten.
///
/// # Errors
/// - [`PackError::MissingBase`] if a reference delta's base exists neither
///   in the pack nor in the store.
/// - [`PackError::CyclicDelta`] if a chain walk loops back onto itself.
/// - [`PackError::DeltaDepthExceeded`] if a chain exceeds the depth cap.
/// - Delta and store errors propagate unchanged.
pub fn resolve_pack<S: ObjectStore + ?Sized>(
    pack: &mut ParsedPack,
    store: &mut S,
    limits: &PackLimits,
) -> Result<ResolveStats, PackError> {
    let entries = &mut pack.entries;

    let mut offset_index: HashMap<u64, usize> = HashMap::with_capacity(entries.len());
    let mut oid_index: HashMap<OidBytes, usize> = HashMap::with_capacity(entries.len());
    let mut pending: Vec<usize> = Vec::new();

    for (idx, entry) in entries.iter().enumerate() {
        offset_index.insert(entry.offset, idx);
        match entry.oid {
            Some(oid) => {
                oid_index.insert(oid, idx);
            }
            None => pending.push(idx),
        }
    }

    let mut stats = ResolveStats::default();
    // Store misses are permanent: the store is read-only during a resolve.
    let mut known_missing: HashSet<OidBytes> = HashSet::new();
    // Cumulative delta edges below each materialized entry.
    let mut depths: Vec<u32> = vec![0; entries.len()];

    while !pending.is_empty() {
        stats.passes += 1;
        let mut blocked: Vec<(usize, OidBytes)> = Vec::new();

        for &idx in &pending {
            if entries[idx].base.is_none() {
                // Materialized as part of an earlier chain in this pass.
                continue;
            }
            match resolve_chain(
                entries,
                idx,
                store,
                &offset_index,
                &mut oid_index,
                &mut known_missing,
                &mut depths,
                limits,
                &mut stats,
            )? {
                Attempt::Resolved => {}
                Attempt::Blocked(oid) => blocked.push((idx, oid)),
            }
        }

        if blocked.is_empty() {
            break;
        }
        if blocked.len() == pending.len() {
            // No entry made progress, so no blocked base id can ever
            // materialize. Report the first stalled entry's base.
            let oid = blocked[0].1;
            return Err(PackError::MissingBase { oid });
        }
        pending = blocked.into_iter().map(|(idx, _)| idx).collect();
    }

    debug!(
        resolved = stats.resolved_deltas,
        passes = stats.passes,
        max_depth = stats.max_chain_depth,
        "deltas resolved"
    );
    Ok(stats)
}

/// Walks the delta chain below `start` and materializes it bottom-up.
#[allow(clippy::too_many_arguments)]
fn resolve_chain<S: ObjectStore + ?Sized>(
    entries: &mut [PackEntry],
    start: usize,
    store: &mut S,
    offset_index: &HashMap<u64, usize>,
    oid_index: &mut HashMap<OidBytes, usize>,
    known_missing: &mut HashSet<OidBytes>,
    depths: &mut [u32],
    limits: &PackLimits,
    stats: &mut ResolveStats,
) -> Result<Attempt, PackError> {
    let mut chain: Vec<usize> = Vec::new();
    let mut cursor = start;

    let bottom = loop {
        let Some(base_ref) = entries[cursor].base else {
            break ChainBase::Entry(cursor);
        };
        if chain.len() as u32 >= limits.max_delta_depth {
            return Err(PackError::DeltaDepthExceeded {
                max_depth: limits.max_delta_depth,
            });
        }
        chain.push(cursor);

        match base_ref {
            BaseRef::Offset(base_offset) => {
                let offset = entries[cursor].offset;
                cursor = *offset_index.get(&base_offset).ok_or(
                    PackError::DanglingOffsetDelta {
                        offset,
                        distance: offset - base_offset,
                    },
                )?;
            }
            BaseRef::Ref(oid) => {
                if let Some(&base_idx) = oid_index.get(&oid) {
                    // Visited-set check: an edge landing back on this walk
                    // closes a reference loop.
                    if chain.contains(&base_idx) {
                        return Err(PackError::CyclicDelta { oid });
                    }
                    cursor = base_idx;
                } else if known_missing.contains(&oid) {
                    return Ok(Attempt::Blocked(oid));
                } else {
                    stats.store_lookups += 1;
                    match store.retrieve(&oid, None)? {
                        Some((kind, bytes)) => break ChainBase::External(kind, bytes),
                        None => {
                            known_missing.insert(oid);
                            return Ok(Attempt::Blocked(oid));
                        }
                    }
                }
            }
        }
    };

    // Chain depth accumulates across passes: an entry resolved against an
    // already-expanded delta inherits that delta's depth.
    let mut depth = match &bottom {
        ChainBase::Entry(base_idx) => depths[*base_idx],
        ChainBase::External(..) => 0,
    };

    let mut base = bottom;
    for &idx in chain.iter().rev() {
        depth += 1;
        if depth > limits.max_delta_depth {
            return Err(PackError::DeltaDepthExceeded {
                max_depth: limits.max_delta_depth,
            });
        }
        let delta = entries[idx]
            .payload
            .take()
            .expect("delta payload present until resolution");

        let (kind, result) = {
            let (base_kind, base_bytes): (ObjectKind, &[u8]) = match &base {
                ChainBase::Entry(base_idx) => {
                    let base_entry = &entries[*base_idx];
                    (
                        base_entry.kind.expect("materialized base has kind"),
                        base_entry
                            .payload
                            .as_deref()
                            .expect("materialized base retains payload"),
                    )
                }
                ChainBase::External(kind, bytes) => (*kind, bytes.as_slice()),
            };

            let mut result = Vec::new();
            apply_delta(base_bytes, &delta, &mut result, limits.max_object_bytes)?;
            (base_kind, result)
        };

        let oid = oid_for_object(kind, &result);
        let entry = &mut entries[idx];
        entry.kind = Some(kind);
        entry.payload = Some(result);
        entry.oid = Some(oid);
        entry.base = None;
        oid_index.insert(oid, idx);
        depths[idx] = depth;
        stats.resolved_deltas += 1;
        stats.max_chain_depth = stats.max_chain_depth.max(depth);

        base = ChainBase::Entry(idx);
    }

    Ok(Attempt::Resolved)
}
