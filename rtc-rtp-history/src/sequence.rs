//! 16-bit RTP sequence number arithmetic.

/// Half of the u16 sequence space, used for wraparound detection.
const UINT16_SIZE_HALF: u16 = 1 << 15;

/// Returns true if `sequence_number` is newer than `prev_sequence_number`,
/// taking wraparound into account.
///
/// When the two are exactly half the sequence space apart, the numerically
/// larger one is considered newer so the relation stays antisymmetric.
pub fn is_newer_sequence_number(sequence_number: u16, prev_sequence_number: u16) -> bool {
    let diff = sequence_number.wrapping_sub(prev_sequence_number);
    if diff == UINT16_SIZE_HALF {
        return sequence_number > prev_sequence_number;
    }
    diff != 0 && diff < UINT16_SIZE_HALF
}

/// Returns the newer of two sequence numbers.
pub fn latest_sequence_number(a: u16, b: u16) -> u16 {
    if is_newer_sequence_number(a, b) { a } else { b }
}

/// Signed distance from `base` to `sequence_number`, unwrapped to the
/// closest interpretation.
///
/// ```
/// use rtc_rtp_history::sequence::sequence_number_diff;
///
/// assert_eq!(sequence_number_diff(1, 65534), 3);
/// assert_eq!(sequence_number_diff(65534, 1), -3);
/// ```
pub fn sequence_number_diff(sequence_number: u16, base: u16) -> i32 {
    let forward = sequence_number.wrapping_sub(base) as i32;
    if is_newer_sequence_number(sequence_number, base) || forward == 0 {
        forward
    } else {
        forward - (1 << 16)
    }
}
