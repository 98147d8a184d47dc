#![no_main]

use libfuzzer_sys::fuzz_target;
use packfile_rs::{apply_delta, parse_pack, zlib, PackLimits};

const MAX_INPUT: usize = 64 * 1024;
const MAX_OUT: usize = 64 * 1024;

fn read_varint(data: &[u8], pos: &mut usize) -> Option<u64> {
    let mut shift: u32 = 0;
    let mut value: u64 = 0;
    for _ in 0..10 {
        let b = *data.get(*pos)?;
        *pos += 1;
        value |= ((b & 0x7f) as u64) << shift;
        if b & 0x80 == 0 {
            return Some(value);
        }
        shift = shift.saturating_add(7);
        if shift > 63 {
            return None;
        }
    }
    None
}

// The parser, the inflate helpers, and the delta decoder must return
// precise errors on arbitrary bytes, never panic.
fuzz_target!(|data: &[u8]| {
    if data.len() < 4 || data.len() > MAX_INPUT {
        return;
    }

    let limits = PackLimits {
        max_object_bytes: MAX_OUT,
        max_delta_bytes: MAX_OUT,
        ..PackLimits::default()
    };
    let _ = parse_pack(data, &limits);

    let mut inflate_out = Vec::with_capacity(256);
    let _ = zlib::inflate_limited(data, &mut inflate_out, MAX_OUT);

    let split = (data[1] as usize) % (data.len() - 1) + 1;
    let (base, delta) = data.split_at(split);
    let mut pos = 0usize;
    let Some(base_len) = read_varint(delta, &mut pos) else {
        return;
    };
    if read_varint(delta, &mut pos).is_none() {
        return;
    }
    if base_len as usize > base.len() {
        return;
    }
    let base = &base[..base_len as usize];
    let mut delta_out = Vec::new();
    let _ = apply_delta(base, delta, &mut delta_out, MAX_OUT);
});
