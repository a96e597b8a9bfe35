//! Coordinator protocol vocabulary.
//!
//! Plain-text, newline-terminated, case-sensitive messages:
//!
//! | Direction | Text |
//! |-----------|------|
//! | controller → coordinator | `deliver a new sticker` |
//! | controller → coordinator | `wait until next sticker` |
//! | coordinator → controller | `pickup reached` |
//! | coordinator → controller | `drop reached` |
//! | coordinator → controller | `one sticker finished` |
//!
//! Inbound verbs are recognised by substring containment, so surrounding
//! text in a payload does not prevent a match.

use std::fmt;

/// Command received from the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Gantry is at the pickup position: energize the pump.
    PickupReached,
    /// Gantry is at the drop position: stop and vent.
    DropReached,
    /// Delivery cycle complete.
    StickerFinished,
}

impl Command {
    /// Every recognised inbound command.
    pub const ALL: [Command; 3] = [
        Command::PickupReached,
        Command::DropReached,
        Command::StickerFinished,
    ];

    /// Substring that identifies the command on the wire.
    pub const fn verb(self) -> &'static str {
        match self {
            Command::PickupReached => "pickup reached",
            Command::DropReached => "drop reached",
            Command::StickerFinished => "one sticker finished",
        }
    }

    /// Find every recognised verb in `text`, in order of appearance.
    ///
    /// Unrecognised text is skipped. A payload carrying several commands
    /// (coalesced reads) yields all of them.
    pub fn scan(text: &str) -> Vec<Command> {
        let mut found: Vec<(usize, Command)> = Command::ALL
            .iter()
            .flat_map(|&cmd| text.match_indices(cmd.verb()).map(move |(pos, _)| (pos, cmd)))
            .collect();
        found.sort_by_key(|&(pos, _)| pos);
        found.into_iter().map(|(_, cmd)| cmd).collect()
    }

    /// Whether `text` contains any recognised verb.
    pub fn contains_any(text: &str) -> bool {
        Command::ALL.iter().any(|cmd| text.contains(cmd.verb()))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

/// Message sent to the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outbound {
    /// Operator requested a delivery.
    DeliverNewSticker,
    /// Idle heartbeat while waiting for the operator.
    WaitUntilNextSticker,
}

impl Outbound {
    /// Message text without the line terminator.
    pub const fn text(self) -> &'static str {
        match self {
            Outbound::DeliverNewSticker => "deliver a new sticker",
            Outbound::WaitUntilNextSticker => "wait until next sticker",
        }
    }

    /// Bytes written to the socket, terminator included.
    pub const fn wire(self) -> &'static [u8] {
        match self {
            Outbound::DeliverNewSticker => b"deliver a new sticker\n",
            Outbound::WaitUntilNextSticker => b"wait until next sticker\n",
        }
    }

    /// Exact-match parse of one trimmed line (coordinator side).
    pub fn parse(line: &str) -> Option<Outbound> {
        match line.trim() {
            "deliver a new sticker" => Some(Outbound::DeliverNewSticker),
            "wait until next sticker" => Some(Outbound::WaitUntilNextSticker),
            _ => None,
        }
    }
}

impl fmt::Display for Outbound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_matches_substrings() {
        assert_eq!(
            Command::scan("status: pickup reached at station 2"),
            vec![Command::PickupReached]
        );
        assert_eq!(Command::scan("drop reached"), vec![Command::DropReached]);
    }

    #[test]
    fn scan_keeps_wire_order() {
        let cmds = Command::scan("drop reached\npickup reached\none sticker finished\n");
        assert_eq!(
            cmds,
            vec![
                Command::DropReached,
                Command::PickupReached,
                Command::StickerFinished
            ]
        );
    }

    #[test]
    fn scan_is_case_sensitive() {
        assert!(Command::scan("PICKUP REACHED\n").is_empty());
        assert!(Command::scan("Drop Reached").is_empty());
    }

    #[test]
    fn scan_ignores_unknown_text() {
        assert!(Command::scan("hello\nping\n").is_empty());
        assert!(!Command::contains_any("pickup reache"));
    }

    #[test]
    fn outbound_wire_is_text_plus_newline() {
        for msg in [Outbound::DeliverNewSticker, Outbound::WaitUntilNextSticker] {
            let mut expected = msg.text().as_bytes().to_vec();
            expected.push(b'\n');
            assert_eq!(msg.wire(), expected.as_slice());
        }
    }

    #[test]
    fn outbound_parse_trims_line() {
        assert_eq!(
            Outbound::parse("deliver a new sticker\r"),
            Some(Outbound::DeliverNewSticker)
        );
        assert_eq!(Outbound::parse(" wait until next sticker "), Some(Outbound::WaitUntilNextSticker));
        assert_eq!(Outbound::parse("deliver a new sticker please"), None);
    }
}
