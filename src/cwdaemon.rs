//! cwdaemon wire protocol
//!
//! One UDP datagram carries one frame. A frame that starts with ESC (0x1B) is
//! an escape command: the next byte selects the command and the rest is its
//! argument. Anything else is text to be keyed.

use std::fmt;

/// Escape byte that introduces a command frame.
pub const ESCAPE: u8 = 0x1B;

/// Default cwdaemon UDP port.
pub const DEFAULT_PORT: u16 = 6789;

/// A classified frame, borrowing from the received datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame<'a> {
    /// `ESC code argument...`
    Escape { code: u8, argument: &'a [u8] },
    /// ESC with no command byte after it.
    BareEscape,
    /// Plain keying text.
    Text(&'a [u8]),
    /// Nothing left after NUL truncation.
    Empty,
}

/// Cut a datagram at its first NUL byte. Some clients send trailing garbage.
///
/// Returns the kept bytes and whether anything was cut.
pub fn truncate_at_nul(datagram: &[u8]) -> (&[u8], bool) {
    match datagram.iter().position(|&b| b == 0) {
        Some(index) => (&datagram[..index], true),
        None => (datagram, false),
    }
}

/// Classify an already NUL-truncated frame.
pub fn classify(frame: &[u8]) -> Frame<'_> {
    match frame {
        [] => Frame::Empty,
        [ESCAPE] => Frame::BareEscape,
        [ESCAPE, code, argument @ ..] => Frame::Escape {
            code: *code,
            argument,
        },
        text => Frame::Text(text),
    }
}

/// Parse a decimal escape-command argument. Surrounding whitespace is allowed.
pub fn parse_int(argument: &[u8]) -> Option<i64> {
    std::str::from_utf8(argument).ok()?.trim().parse().ok()
}

/// Every escape command cwdaemon defines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EscapeCommand {
    Reset,
    Unassigned,
    Speed,
    Tone,
    Abort,
    Exit,
    WordMode,
    Weighting,
    KeyingDevice,
    Obsolete,
    Ptt,
    SsbWay,
    Tune,
    Delay,
    BandSwitch,
    SoundSystem,
    Volume,
    EchoWhenDone,
}

/// Command code lookup, in protocol order.
const COMMAND_TABLE: [(u8, EscapeCommand); 18] = [
    (b'0', EscapeCommand::Reset),
    (b'1', EscapeCommand::Unassigned),
    (b'2', EscapeCommand::Speed),
    (b'3', EscapeCommand::Tone),
    (b'4', EscapeCommand::Abort),
    (b'5', EscapeCommand::Exit),
    (b'6', EscapeCommand::WordMode),
    (b'7', EscapeCommand::Weighting),
    (b'8', EscapeCommand::KeyingDevice),
    (b'9', EscapeCommand::Obsolete),
    (b'a', EscapeCommand::Ptt),
    (b'b', EscapeCommand::SsbWay),
    (b'c', EscapeCommand::Tune),
    (b'd', EscapeCommand::Delay),
    (b'e', EscapeCommand::BandSwitch),
    (b'f', EscapeCommand::SoundSystem),
    (b'g', EscapeCommand::Volume),
    (b'h', EscapeCommand::EchoWhenDone),
];

impl EscapeCommand {
    pub fn from_code(code: u8) -> Option<Self> {
        COMMAND_TABLE
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, command)| *command)
    }

    pub fn code(self) -> u8 {
        COMMAND_TABLE
            .iter()
            .find(|(_, command)| *command == self)
            .map(|(c, _)| *c)
            .unwrap_or(b'?')
    }

    /// All commands, in protocol order.
    pub fn all() -> impl Iterator<Item = EscapeCommand> {
        COMMAND_TABLE.iter().map(|(_, command)| *command)
    }

    /// Whether the gateway maps this command onto the keyer.
    pub fn is_implemented(self) -> bool {
        matches!(
            self,
            EscapeCommand::Speed
                | EscapeCommand::Tone
                | EscapeCommand::Abort
                | EscapeCommand::Weighting
                | EscapeCommand::Ptt
                | EscapeCommand::Tune
                | EscapeCommand::Delay
        )
    }

    pub fn description(self) -> &'static str {
        match self {
            EscapeCommand::Reset => "set defaults",
            EscapeCommand::Unassigned => "unassigned command",
            EscapeCommand::Speed => "set speed",
            EscapeCommand::Tone => "set tone",
            EscapeCommand::Abort => "abort message",
            EscapeCommand::Exit => "exit daemon",
            EscapeCommand::WordMode => "set uninterruptible word mode",
            EscapeCommand::Weighting => "set weighting",
            EscapeCommand::KeyingDevice => "set device for keying",
            EscapeCommand::Obsolete => "obsolete command",
            EscapeCommand::Ptt => "ptt keying off or on",
            EscapeCommand::SsbWay => "ssb signal from microphone or soundcard",
            EscapeCommand::Tune => "tune",
            EscapeCommand::Delay => "set ptt delay",
            EscapeCommand::BandSwitch => "bandindex",
            EscapeCommand::SoundSystem => "set sound device",
            EscapeCommand::Volume => "set soundcard volume",
            EscapeCommand::EchoWhenDone => "echo when done",
        }
    }
}

impl fmt::Display for EscapeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ESC {} ({})", self.code() as char, self.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_at_nul() {
        assert_eq!(truncate_at_nul(b"CQ\0junk"), (&b"CQ"[..], true));
        assert_eq!(truncate_at_nul(b"CQ"), (&b"CQ"[..], false));
        assert_eq!(truncate_at_nul(b"\0"), (&b""[..], true));
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            classify(b"\x1b225"),
            Frame::Escape {
                code: b'2',
                argument: b"25"
            }
        );
        assert_eq!(
            classify(b"\x1b4"),
            Frame::Escape {
                code: b'4',
                argument: b""
            }
        );
        assert_eq!(classify(b"\x1b"), Frame::BareEscape);
        assert_eq!(classify(b"CQ TEST"), Frame::Text(b"CQ TEST"));
        assert_eq!(classify(b""), Frame::Empty);
    }

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int(b"25"), Some(25));
        assert_eq!(parse_int(b" -12\n"), Some(-12));
        assert_eq!(parse_int(b""), None);
        assert_eq!(parse_int(b"fast"), None);
        assert_eq!(parse_int(&[0xFF, 0x31]), None);
    }

    #[test]
    fn test_command_table_round_trip() {
        for command in EscapeCommand::all() {
            assert_eq!(EscapeCommand::from_code(command.code()), Some(command));
        }
        assert_eq!(EscapeCommand::from_code(b'z'), None);
        assert_eq!(EscapeCommand::from_code(b'A'), None);
    }

    #[test]
    fn test_implemented_set() {
        let implemented: String = EscapeCommand::all()
            .filter(|c| c.is_implemented())
            .map(|c| c.code() as char)
            .collect();
        assert_eq!(implemented, "2347acd");

        let unimplemented: String = EscapeCommand::all()
            .filter(|c| !c.is_implemented())
            .map(|c| c.code() as char)
            .collect();
        assert_eq!(unimplemented, "015689befgh");
    }

    #[test]
    fn test_display() {
        assert_eq!(EscapeCommand::Tune.to_string(), "ESC c (tune)");
    }
}
