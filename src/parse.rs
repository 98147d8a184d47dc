//! Version-2 pack stream parsing.
//!
//! Parses a complete in-memory pack buffer into an ordered entry list:
//! header validation, per-entry kind/size varint decode, delta base
//! references, exact payload inflation, per-entry CRC32, and trailing
//! SHA-1 verification.
//!
//! # Scope
//! - Enumerates entries in on-wire order; deltified entries keep their
//!   delta instructions as payload until [`crate::resolve`] expands them.
//! - Verifies the trailing checksum after the last entry; entries are only
//!   returned once the whole pack checks out, so a corrupt pack never
//!   yields partial results.
//! - Does not resolve deltas and does not consult the object store.
//!
//! # Invariants
//! - Entry payloads never exceed the configured size caps.
//! - Offset-delta bases always point at a previously seen entry header.
//! - After the last entry, exactly the 20 checksum bytes remain.

use std::collections::HashSet;

use sha1::{Digest, Sha1};
use tracing::debug;

use crate::entry::{BaseRef, ObjectKind, PackEntry};
use crate::errors::PackError;
use crate::limits::PackLimits;
use crate::object_id::{oid_for_object, OidBytes, OID_LEN};
use crate::zlib::{self, ZlibError};

/// Pack magic bytes.
pub const PACK_MAGIC: [u8; 4] = *b"PACK";
/// The only supported pack version.
pub const PACK_VERSION: u32 = 2;
/// Header size: magic(4) + version(4) + object count(4).
const PACK_HEADER_LEN: usize = 12;
/// Wire kind values for the two delta encodings.
const KIND_OFS_DELTA: u8 = 6;
const KIND_REF_DELTA: u8 = 7;
/// Slack added to the declared size when slicing compressed input for the
/// codec. The codec's consumed-byte report is authoritative; this only
/// bounds how much of the buffer it may look at.
const INFLATE_SLACK: usize = 1000;
/// Cap on offset-delta distance varint bytes (ceil(64 / 7)).
const MAX_OFS_BYTES: usize = 10;

/// A fully parsed pack: entries in on-wire order plus the verified trailing
/// checksum.
///
/// Deltified entries still carry their `base` reference; run
/// [`crate::resolve::resolve_pack`] to materialize them.
#[derive(Debug)]
pub struct ParsedPack {
    /// Entries in on-wire order.
    pub entries: Vec<PackEntry>,
    /// The verified trailing SHA-1 over the pack body.
    pub checksum: OidBytes,
}

impl ParsedPack {
    /// Returns the ids of all materialized entries.
    pub fn oids(&self) -> impl Iterator<Item = OidBytes> + '_ {
        self.entries.iter().filter_map(|entry| entry.oid)
    }
}

/// Parses a version-2 pack buffer.
///
/// The buffer must be the complete pack including the trailing checksum.
/// Entries are returned in on-wire order; deltified entries are left
/// unresolved.
///
/// # Errors
/// Any malformation aborts the parse: bad magic or version, reserved kind
/// values, truncated or oversized payloads, dangling offset-delta bases,
/// stray bytes before the trailer, or a checksum mismatch.
pub fn parse_pack(bytes: &[u8], limits: &PackLimits) -> Result<ParsedPack, PackError> {
    if bytes.len() < 4 || bytes[0..4] != PACK_MAGIC {
        return Err(PackError::MalformedHeader);
    }
    if bytes.len() < PACK_HEADER_LEN + OID_LEN {
        return Err(PackError::Truncated);
    }

    let version = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    if version != PACK_VERSION {
        return Err(PackError::UnsupportedVersion { got: version });
    }
    let count = u32::from_be_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);

    let data_end = bytes.len() - OID_LEN;

    debug!(objects = count, len = bytes.len(), "parsing pack");

    let mut reader = EntryReader {
        bytes,
        pos: PACK_HEADER_LEN,
        data_end,
    };
    let mut seen_offsets: HashSet<u64> = HashSet::with_capacity(count as usize);
    let mut entries: Vec<PackEntry> = Vec::with_capacity(count as usize);

    for _ in 0..count {
        let entry_start = reader.pos;
        let offset = entry_start as u64;
        let (kind_bits, size) = reader.entry_header(limits)?;

        let (kind, base) = match kind_bits {
            KIND_OFS_DELTA => {
                if size > limits.max_delta_bytes as u64 {
                    return Err(PackError::DeltaTooLarge {
                        size,
                        max: limits.max_delta_bytes,
                    });
                }
                let distance = reader.ofs_distance(entry_start, limits)?;
                if distance == 0 || distance > offset {
                    return Err(PackError::DanglingOffsetDelta { offset, distance });
                }
                let base_offset = offset - distance;
                if !seen_offsets.contains(&base_offset) {
                    return Err(PackError::DanglingOffsetDelta { offset, distance });
                }
                (None, Some(BaseRef::Offset(base_offset)))
            }
            KIND_REF_DELTA => {
                if size > limits.max_delta_bytes as u64 {
                    return Err(PackError::DeltaTooLarge {
                        size,
                        max: limits.max_delta_bytes,
                    });
                }
                let raw = reader.take(OID_LEN)?;
                (None, Some(BaseRef::Ref(OidBytes::from_slice(raw))))
            }
            value => match ObjectKind::from_wire(value) {
                Some(kind) => {
                    if size > limits.max_object_bytes as u64 {
                        return Err(PackError::ObjectTooLarge {
                            size,
                            max: limits.max_object_bytes,
                        });
                    }
                    (Some(kind), None)
                }
                None => return Err(PackError::InvalidKind { kind: value }),
            },
        };

        let payload = reader.inflate_payload(size)?;
        let crc32 = {
            let mut hasher = crc32fast::Hasher::new();
            hasher.update(&bytes[entry_start..reader.pos]);
            hasher.finalize()
        };
        let oid = kind.map(|kind| oid_for_object(kind, &payload));

        seen_offsets.insert(offset);
        entries.push(PackEntry {
            offset,
            size,
            crc32,
            kind,
            base,
            payload: Some(payload),
            oid,
        });
    }

    if reader.pos != data_end {
        return Err(PackError::TrailingBytes {
            count: data_end - reader.pos,
        });
    }

    let recorded = OidBytes::from_slice(&bytes[data_end..]);
    let computed = OidBytes::new(Sha1::digest(&bytes[..data_end]).into());
    if recorded != computed {
        return Err(PackError::ChecksumMismatch { recorded, computed });
    }

    debug!(entries = entries.len(), checksum = %computed, "pack parsed");

    Ok(ParsedPack {
        entries,
        checksum: computed,
    })
}

/// Cursor over the pack's entry region (header excluded, trailer excluded).
struct EntryReader<'a> {
    bytes: &'a [u8],
    pos: usize,
    data_end: usize,
}

impl<'a> EntryReader<'a> {
    #[inline]
    fn byte(&mut self) -> Result<u8, PackError> {
        if self.pos >= self.data_end {
            return Err(PackError::Truncated);
        }
        let byte = self.bytes[self.pos];
        self.pos += 1;
        Ok(byte)
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], PackError> {
        let end = self.pos.checked_add(len).ok_or(PackError::Truncated)?;
        if end > self.data_end {
            return Err(PackError::Truncated);
        }
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// Decodes an entry header: 3-bit kind plus a size varint whose first
    /// byte contributes 4 bits and later bytes 7 each.
    fn entry_header(&mut self, limits: &PackLimits) -> Result<(u8, u64), PackError> {
        let header_start = self.pos;
        let first = self.byte()?;
        let kind_bits = (first >> 4) & 0x07;
        let mut size = u64::from(first & 0x0f);
        let mut shift: u32 = 4;

        let mut byte = first;
        while byte & 0x80 != 0 {
            if self.pos - header_start >= limits.max_header_bytes {
                return Err(PackError::HeaderTooLong {
                    max: limits.max_header_bytes,
                });
            }
            byte = self.byte()?;
            size |= u64::from(byte & 0x7f) << shift;
            shift += 7;
            if shift > 63 {
                return Err(PackError::HeaderTooLong {
                    max: limits.max_header_bytes,
                });
            }
        }

        Ok((kind_bits, size))
    }

    /// Decodes the offset-delta distance varint (MSB-first, with the +1
    /// bias on continuation bytes).
    fn ofs_distance(
        &mut self,
        header_start: usize,
        limits: &PackLimits,
    ) -> Result<u64, PackError> {
        let mut byte = self.byte()?;
        let mut distance = u64::from(byte & 0x7f);
        let mut read = 1usize;

        while byte & 0x80 != 0 {
            if read >= MAX_OFS_BYTES || self.pos - header_start >= limits.max_header_bytes {
                return Err(PackError::HeaderTooLong {
                    max: limits.max_header_bytes,
                });
            }
            byte = self.byte()?;
            read += 1;
            distance = distance
                .checked_add(1)
                .and_then(|value| value.checked_shl(7))
                .ok_or(PackError::HeaderTooLong {
                    max: limits.max_header_bytes,
                })?
                | u64::from(byte & 0x7f);
        }

        Ok(distance)
    }

    /// Inflates exactly `size` payload bytes, advancing the cursor by the
    /// codec-reported consumed count.
    fn inflate_payload(&mut self, size: u64) -> Result<Vec<u8>, PackError> {
        let size = size as usize;
        let hint_end = self
            .pos
            .saturating_add(size)
            .saturating_add(INFLATE_SLACK)
            .min(self.data_end);

        let mut payload = Vec::with_capacity(size);
        let consumed = zlib::inflate_exact(&self.bytes[self.pos..hint_end], &mut payload, size)
            .map_err(|err| match err {
                ZlibError::TruncatedInput => PackError::Truncated,
                other => PackError::Codec(other),
            })?;
        self.pos += consumed;
        Ok(payload)
    }
}
