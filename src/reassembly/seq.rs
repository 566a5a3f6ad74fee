//! Serial number arithmetic for 32-bit TCP sequence numbers.

/// Whether `a` precedes `b` in sequence space.
pub(crate) const fn seq_lt(a: u32, b: u32) -> bool {
    #[expect(
        clippy::cast_possible_wrap,
        reason = "Serial comparison relies on the signed reinterpretation."
    )]
    let delta = a.wrapping_sub(b) as i32;
    delta < 0
}

/// Whether `a` precedes or equals `b` in sequence space.
pub(crate) const fn seq_le(a: u32, b: u32) -> bool { a == b || seq_lt(a, b) }

/// Advance `seq` by `len` bytes.
pub(crate) fn seq_add(seq: u32, len: usize) -> u32 {
    #[expect(
        clippy::cast_possible_truncation,
        reason = "Sequence numbers wrap modulo 2^32."
    )]
    let len = len as u32;
    seq.wrapping_add(len)
}

/// Distance from `from` forward to `to`.
pub(crate) fn seq_distance(from: u32, to: u32) -> usize {
    usize::try_from(to.wrapping_sub(from)).unwrap_or(usize::MAX)
}
