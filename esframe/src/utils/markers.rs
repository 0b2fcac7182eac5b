//! Synchronization marker search over a byte window.
//!
//! Both searches are pure functions of the window contents. Deciding what to
//! do when a marker is missing (rewind and refill) belongs to the extractors.

/// Three-byte Annex-B start code prefix.
pub const START_CODE_3: [u8; 3] = [0x00, 0x00, 0x01];

/// Four-byte Annex-B start code prefix.
pub const START_CODE_4: [u8; 4] = [0x00, 0x00, 0x00, 0x01];

/// The 12-bit ADTS syncword, `0xFFF`.
pub const ADTS_SYNCWORD: u16 = 0xFFF;

/// Returns the length of the start code beginning at `window[0]`, if any.
///
/// The four-byte form takes precedence so `00 00 00 01` is never reported as
/// a zero byte followed by a three-byte code.
#[inline(always)]
pub fn start_code_at(window: &[u8]) -> Option<usize> {
    if window.starts_with(&START_CODE_4) {
        Some(4)
    } else if window.starts_with(&START_CODE_3) {
        Some(3)
    } else {
        None
    }
}

/// Finds the first Annex-B start code in `window`.
///
/// Returns the offset of the first prefix byte and the prefix length (3 or 4).
///
/// ```rust
/// use esframe::utils::markers::find_first_start_code;
///
/// assert_eq!(find_first_start_code(&[0x12, 0x00, 0x00, 0x01, 0x67]), Some((1, 3)));
/// assert_eq!(find_first_start_code(&[0x00, 0x00, 0x00, 0x01, 0x67]), Some((0, 4)));
/// assert_eq!(find_first_start_code(&[0x00, 0x00, 0x02]), None);
/// ```
pub fn find_first_start_code(window: &[u8]) -> Option<(usize, usize)> {
    let last = window.len().checked_sub(START_CODE_3.len())?;

    (0..=last).find_map(|offset| start_code_at(&window[offset..]).map(|len| (offset, len)))
}

/// Finds the first byte-aligned ADTS syncword in `buffer`.
///
/// Only offsets `0..buffer.len() - 1` are candidates: a `0xFF` in the final
/// byte is never matched, since its second byte has not been read yet.
///
/// ```rust
/// use esframe::utils::markers::find_sync;
///
/// assert_eq!(find_sync(&[0x00, 0xFF, 0xF1, 0x50]), Some(1));
/// assert_eq!(find_sync(&[0x00, 0xFF, 0xE1]), None);
/// assert_eq!(find_sync(&[0x00, 0x00, 0xFF]), None);
/// ```
pub fn find_sync(buffer: &[u8]) -> Option<usize> {
    buffer
        .windows(2)
        .position(|pair| is_syncword(pair[0], pair[1]))
}

#[inline(always)]
pub fn is_syncword(first: u8, second: u8) -> bool {
    (u16::from_be_bytes([first, second]) >> 4) == ADTS_SYNCWORD
}

#[test]
fn start_code_precedence() {
    assert_eq!(start_code_at(&[0, 0, 0, 1]), Some(4));
    assert_eq!(start_code_at(&[0, 0, 1, 0]), Some(3));
    assert_eq!(start_code_at(&[0, 0, 0, 0, 1]), None);
    assert_eq!(start_code_at(&[0, 0]), None);

    // trailing zero bytes before a four-byte code are skipped, not reported
    assert_eq!(find_first_start_code(&[0, 0, 0, 0, 1, 0x65]), Some((1, 4)));
    assert_eq!(find_first_start_code(&[0x65, 0x88, 0, 0, 1]), Some((2, 3)));
    assert_eq!(find_first_start_code(&[0, 1]), None);
    assert_eq!(find_first_start_code(&[]), None);
}

#[test]
fn sync_search_ignores_last_byte() {
    assert_eq!(find_sync(&[0xFF, 0xF0]), Some(0));
    assert_eq!(find_sync(&[0xFF, 0xFF, 0xF9]), Some(0));
    assert_eq!(find_sync(&[0x0F, 0xFF, 0x7F, 0xFF]), None);
    assert_eq!(find_sync(&[0xFF]), None);
    assert_eq!(find_sync(&[]), None);
}
