//! Decode limits for pack parsing and delta resolution.
//!
//! All limits are hard caps; exceeding one aborts the current parse or
//! resolve with a precise error rather than allocating unbounded output on
//! corrupt input.

/// Limits for pack decoding.
///
/// `max_delta_bytes` caps the inflated delta instruction stream, not the
/// final object; `max_object_bytes` caps materialized payloads, including
/// delta results.
#[derive(Clone, Copy, Debug)]
pub struct PackLimits {
    /// Maximum bytes for a single entry header (size varint plus any
    /// offset-delta distance varint).
    pub max_header_bytes: usize,
    /// Maximum inflated size for any materialized object.
    pub max_object_bytes: usize,
    /// Maximum inflated size for a delta instruction stream.
    pub max_delta_bytes: usize,
    /// Maximum delta chain length, counted in delta edges.
    pub max_delta_depth: u32,
}

impl PackLimits {
    /// Creates a limits struct with explicit caps.
    #[must_use]
    pub const fn new(
        max_header_bytes: usize,
        max_object_bytes: usize,
        max_delta_bytes: usize,
        max_delta_depth: u32,
    ) -> Self {
        Self {
            max_header_bytes,
            max_object_bytes,
            max_delta_bytes,
            max_delta_depth,
        }
    }
}

impl Default for PackLimits {
    fn default() -> Self {
        Self {
            max_header_bytes: 64,
            max_object_bytes: 256 * 1024 * 1024,
            max_delta_bytes: 64 * 1024 * 1024,
            // Chains of thousands of deltas are legal; the cap only bounds
            // adversarial input.
            max_delta_depth: 4096,
        }
    }
}
