//! Software data protection command sequences
//!
//! 28C-series EEPROMs lock and unlock writes through fixed byte writes to two
//! control offsets. The sequences are replayed verbatim, in order.

/// First control offset of the unlock protocol
pub const SDP_ADDR_1: usize = 0x5555;
/// Second control offset of the unlock protocol
pub const SDP_ADDR_2: usize = 0x2AAA;

/// Writes that enable software data protection
pub const ENABLE_SEQUENCE: [(usize, u8); 3] = [
    (SDP_ADDR_1, 0xAA),
    (SDP_ADDR_2, 0x55),
    (SDP_ADDR_1, 0xA0),
];

/// Writes that disable software data protection
pub const DISABLE_SEQUENCE: [(usize, u8); 6] = [
    (SDP_ADDR_1, 0xAA),
    (SDP_ADDR_2, 0x55),
    (SDP_ADDR_1, 0x80),
    (SDP_ADDR_1, 0xAA),
    (SDP_ADDR_2, 0x55),
    (SDP_ADDR_1, 0x20),
];

/// Sequence for the requested protection state
pub fn sequence(enable: bool) -> &'static [(usize, u8)] {
    if enable {
        &ENABLE_SEQUENCE
    } else {
        &DISABLE_SEQUENCE
    }
}
