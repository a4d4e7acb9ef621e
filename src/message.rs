//! Text message pipeline
//!
//! Turns the payload of a cwdaemon text frame into the byte string written to
//! the keyer buffer: control whitespace trimmed, letters upper-cased,
//! cwdaemon prosign shorthands merged, and `+`/`-` speed steps rewritten as
//! buffered speed changes.

use tracing::debug;

use crate::session::SessionState;
use crate::winkeyer::opcode::{BUFFERED_SPEED_CHANGE, CANCEL_BUFFERED_SPEED_CHANGE, MERGE_LETTERS};

/// cwdaemon prosign shorthand and the two letters merged for it.
pub const PROSIGNS: [(u8, [u8; 2]); 7] = [
    (b'*', *b"AR"),
    (b'=', *b"BT"),
    (b'<', *b"SK"),
    (b'(', *b"KN"),
    (b'!', *b"SN"),
    (b'&', *b"AS"),
    (b'>', *b"BK"),
];

/// Size of one `+`/`-` step in wpm.
pub const SPEED_STEP: u8 = 2;
pub const MIN_BUFFERED_SPEED: u8 = 5;
pub const MAX_BUFFERED_SPEED: u8 = 99;

/// Whitespace other than the plain space, which is keyed as a word gap.
fn is_control_whitespace(byte: u8) -> bool {
    matches!(byte, b'\t' | b'\n' | b'\r' | 0x0B | 0x0C)
}

/// Strip trailing tabs, newlines and friends, keeping trailing spaces.
pub fn strip_trailing_whitespace(text: &[u8]) -> &[u8] {
    let end = text
        .iter()
        .rposition(|&b| !is_control_whitespace(b))
        .map_or(0, |i| i + 1);
    &text[..end]
}

/// Replace each prosign shorthand with MERGE_LETTERS and its two letters.
pub fn expand_prosigns(text: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for &byte in text {
        match PROSIGNS.iter().find(|(shorthand, _)| *shorthand == byte) {
            Some((_, letters)) => {
                out.push(MERGE_LETTERS);
                out.extend_from_slice(letters);
            }
            None => out.push(byte),
        }
    }
    out
}

/// Rewrite `+`/`-` as buffered speed changes relative to `speed`.
///
/// Each step moves the working speed by [`SPEED_STEP`] within
/// [`MIN_BUFFERED_SPEED`]..=[`MAX_BUFFERED_SPEED`] and emits
/// BUFFERED_SPEED_CHANGE plus the new speed. A trailing
/// CANCEL_BUFFERED_SPEED_CHANGE restores the base speed after the message.
///
/// With `speed == 0` (never set by a client) the steps are dropped and no
/// control bytes are emitted.
pub fn expand_speed_deltas(text: &[u8], speed: u8) -> Vec<u8> {
    if !text.iter().any(|&b| b == b'+' || b == b'-') {
        return text.to_vec();
    }

    let mut out = Vec::with_capacity(text.len() + 4);
    let mut working = speed;
    for &byte in text {
        match byte {
            b'+' | b'-' if working == 0 => {}
            b'+' => {
                working = working.saturating_add(SPEED_STEP).min(MAX_BUFFERED_SPEED);
                out.extend_from_slice(&[BUFFERED_SPEED_CHANGE, working]);
            }
            b'-' => {
                working = working
                    .saturating_sub(SPEED_STEP)
                    .max(MIN_BUFFERED_SPEED);
                out.extend_from_slice(&[BUFFERED_SPEED_CHANGE, working]);
            }
            other => out.push(other),
        }
    }

    if working != 0 {
        out.push(CANCEL_BUFFERED_SPEED_CHANGE);
        debug!("cwdaemon +/- speed controls expanded/translated");
    } else {
        debug!("speed not set, yet, so cwdaemon +/- speed controls ignored");
    }
    out
}

/// Run a NUL-truncated text payload through the whole pipeline.
///
/// The session is only read; buffered speed changes never touch
/// `SessionState::speed`.
pub fn prepare_message(payload: &[u8], session: &SessionState) -> Vec<u8> {
    debug!("message: {:?}", String::from_utf8_lossy(payload));

    let trimmed = strip_trailing_whitespace(payload);
    if trimmed.len() != payload.len() {
        debug!("message trailing whitespace (not including ' ') removed");
    }

    // Upper-case before any raw parameter bytes are embedded.
    let upper = trimmed.to_ascii_uppercase();

    let expanded = expand_prosigns(&upper);
    if expanded != upper {
        debug!("prosigns expanded");
    }

    expand_speed_deltas(&expanded, session.speed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn session_at(speed: u8) -> SessionState {
        let mut session = SessionState::new();
        session.set_speed(speed);
        session
    }

    #[test]
    fn test_strip_keeps_spaces() {
        assert_eq!(strip_trailing_whitespace(b"CQ \r\n"), b"CQ ");
        assert_eq!(strip_trailing_whitespace(b"CQ\t \n"), b"CQ\t ");
        assert_eq!(strip_trailing_whitespace(b"\n\n"), b"");
        assert_eq!(strip_trailing_whitespace(b"TEST  "), b"TEST  ");
    }

    #[test]
    fn test_expand_prosigns() {
        assert_eq!(expand_prosigns(b"CQ * DE"), b"CQ \x1bAR DE".to_vec());
        assert_eq!(
            expand_prosigns(b"=<(!&>"),
            b"\x1bBT\x1bSK\x1bKN\x1bSN\x1bAS\x1bBK".to_vec()
        );
        assert_eq!(expand_prosigns(b"PLAIN TEXT"), b"PLAIN TEXT".to_vec());
    }

    #[test]
    fn test_speed_delta_with_known_speed() {
        let out = expand_speed_deltas(b"TEST+DE", 20);
        assert_eq!(out, b"TEST\x1c\x16DE\x1e".to_vec());
    }

    #[test]
    fn test_speed_delta_steps_accumulate() {
        let out = expand_speed_deltas(b"A++B-C", 20);
        assert_eq!(out, b"A\x1c\x16\x1c\x18B\x1c\x16C\x1e".to_vec());
    }

    #[test]
    fn test_speed_delta_clamps() {
        assert_eq!(expand_speed_deltas(b"+", 98), vec![0x1c, 99, 0x1e]);
        assert_eq!(expand_speed_deltas(b"-", 6), vec![0x1c, 5, 0x1e]);
        assert_eq!(expand_speed_deltas(b"-", 5), vec![0x1c, 5, 0x1e]);
    }

    #[test]
    fn test_speed_delta_ignored_without_speed() {
        let out = expand_speed_deltas(b"TEST+DE", 0);
        assert_eq!(out, b"TESTDE".to_vec());
        assert!(!out.contains(&BUFFERED_SPEED_CHANGE));
        assert!(!out.contains(&CANCEL_BUFFERED_SPEED_CHANGE));
    }

    #[test]
    fn test_no_deltas_passes_through() {
        assert_eq!(expand_speed_deltas(b"CQ CQ", 25), b"CQ CQ".to_vec());
    }

    #[test]
    fn test_prepare_message_full_pipeline() {
        let session = session_at(20);
        let out = prepare_message(b"cq * de+k1el\r\n", &session);
        assert_eq!(out, b"CQ \x1bAR DE\x1c\x16K1EL\x1e".to_vec());
        assert_eq!(session.speed(), 20);
    }

    #[test]
    fn test_prepare_message_high_speed_byte_not_uppercased() {
        // 95 + 2 = 97, which is ASCII 'a'
        let out = prepare_message(b"x+", &session_at(95));
        assert_eq!(out, vec![b'X', 0x1c, 97, 0x1e]);
    }

    proptest! {
        #[test]
        fn prop_buffered_speeds_stay_in_range(
            text in proptest::collection::vec(prop_oneof![Just(b'+'), Just(b'-'), Just(b'E')], 0..40),
            speed in MIN_BUFFERED_SPEED..=MAX_BUFFERED_SPEED,
        ) {
            let out = expand_speed_deltas(&text, speed);
            let mut iter = out.iter();
            while let Some(&byte) = iter.next() {
                if byte == BUFFERED_SPEED_CHANGE {
                    let value = *iter.next().unwrap();
                    prop_assert!((MIN_BUFFERED_SPEED..=MAX_BUFFERED_SPEED).contains(&value));
                }
            }
        }

        #[test]
        fn prop_text_without_markers_is_unchanged(text in "[A-Z0-9 ?/.,]{0,40}", speed in 0u8..=99) {
            prop_assert_eq!(expand_speed_deltas(text.as_bytes(), speed), text.as_bytes().to_vec());
        }
    }
}
