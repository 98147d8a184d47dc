//! Engine-level error taxonomy.
//!
//! Stage errors stay in their modules (`ZlibError`, `DeltaError`,
//! `StoreError`, commit/tree parse errors) so diagnostics remain precise;
//! `PackError` is the terminal type every public operation surfaces. All
//! failures abort the current parse, resolve, or build — partial results are
//! never observable.

use std::fmt;

use crate::commit::CommitParseError;
use crate::delta::DeltaError;
use crate::object_id::OidBytes;
use crate::store::StoreError;
use crate::tree::TreeParseError;
use crate::zlib::ZlibError;

/// Terminal error for pack parsing, delta resolution, and pack building.
#[derive(Debug)]
#[non_exhaustive]
pub enum PackError {
    /// The buffer does not start with the `PACK` magic.
    MalformedHeader,
    /// The version field is not 2.
    UnsupportedVersion { got: u32 },
    /// The buffer ends before the declared content does.
    Truncated,
    /// Bytes remain between the last entry and the trailing checksum.
    TrailingBytes { count: usize },
    /// The 3-bit kind field holds a reserved value (0 or 5).
    InvalidKind { kind: u8 },
    /// An entry header exceeded the configured byte cap or 64 size bits.
    HeaderTooLong { max: usize },
    /// A materialized object's declared size exceeds the configured cap.
    ObjectTooLarge { size: u64, max: usize },
    /// A delta instruction stream's declared size exceeds the configured cap.
    DeltaTooLarge { size: u64, max: usize },
    /// An offset delta's distance points at no previously seen entry.
    DanglingOffsetDelta { offset: u64, distance: u64 },
    /// A reference delta's base is absent from the pack and the store.
    MissingBase { oid: OidBytes },
    /// A reference-delta chain walk looped back onto itself.
    CyclicDelta { oid: OidBytes },
    /// A delta chain exceeded the configured depth cap.
    DeltaDepthExceeded { max_depth: u32 },
    /// The trailing SHA-1 does not match the pack body.
    ChecksumMismatch {
        recorded: OidBytes,
        computed: OidBytes,
    },
    /// Delta application failed.
    Delta(DeltaError),
    /// Zlib inflate or deflate failed.
    Codec(ZlibError),
    /// The object store reported a failure.
    Store(StoreError),
    /// A commit object fed to the builder walk is malformed.
    Commit(CommitParseError),
    /// A tree object fed to the builder walk is malformed.
    Tree(TreeParseError),
}

impl fmt::Display for PackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedHeader => write!(f, "missing PACK magic"),
            Self::UnsupportedVersion { got } => {
                write!(f, "unsupported pack version {got}")
            }
            Self::Truncated => write!(f, "truncated pack data"),
            Self::TrailingBytes { count } => {
                write!(f, "{count} stray bytes before pack checksum")
            }
            Self::InvalidKind { kind } => write!(f, "invalid object kind {kind}"),
            Self::HeaderTooLong { max } => {
                write!(f, "entry header exceeds {max} bytes")
            }
            Self::ObjectTooLarge { size, max } => {
                write!(f, "object size {size} exceeds cap {max}")
            }
            Self::DeltaTooLarge { size, max } => {
                write!(f, "delta payload size {size} exceeds cap {max}")
            }
            Self::DanglingOffsetDelta { offset, distance } => write!(
                f,
                "offset delta at byte {offset} has no base {distance} bytes back"
            ),
            Self::MissingBase { oid } => {
                write!(f, "object {oid} not found in pack or store")
            }
            Self::CyclicDelta { oid } => {
                write!(f, "reference delta cycle involving base {oid}")
            }
            Self::DeltaDepthExceeded { max_depth } => {
                write!(f, "delta chain exceeds depth {max_depth}")
            }
            Self::ChecksumMismatch { recorded, computed } => write!(
                f,
                "pack checksum mismatch: recorded {recorded}, computed {computed}"
            ),
            Self::Delta(err) => write!(f, "{err}"),
            Self::Codec(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Commit(err) => write!(f, "{err}"),
            Self::Tree(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for PackError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Delta(err) => Some(err),
            Self::Codec(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::Commit(err) => Some(err),
            Self::Tree(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DeltaError> for PackError {
    fn from(err: DeltaError) -> Self {
        Self::Delta(err)
    }
}

impl From<ZlibError> for PackError {
    fn from(err: ZlibError) -> Self {
        Self::Codec(err)
    }
}

impl From<StoreError> for PackError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

impl From<CommitParseError> for PackError {
    fn from(err: CommitParseError) -> Self {
        Self::Commit(err)
    }
}

impl From<TreeParseError> for PackError {
    fn from(err: TreeParseError) -> Self {
        Self::Tree(err)
    }
}
