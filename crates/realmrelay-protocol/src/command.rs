//! Game-side commands the relay issues as its own player.
//!
//! Everything the relay says in-game goes out as a `/me` line. The
//! formatting codes (`§e`, `§r`, ...) are the game's inline color
//! escapes and are passed through as-is.

use std::fmt;

use crate::Device;

/// A command line to run in the game session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameCommand {
    /// Announces a join to everyone in the realm.
    JoinAnnouncement { name: String, device: Device },

    /// Announces a leave to everyone in the realm.
    LeaveAnnouncement { name: String },

    /// A chat-gateway message relayed into the game.
    RelayedChat { author_tag: String, text: String },

    /// Operator-supplied text, sent verbatim.
    Say { text: String },
}

impl GameCommand {
    /// Renders the command as a single well-formed line.
    ///
    /// User-controlled parts go through [`sanitize_line`]; nothing else is
    /// escaped.
    pub fn render(&self) -> String {
        match self {
            Self::JoinAnnouncement { name, device } => format!(
                "/me §e{}§r joined on §a{}§r",
                sanitize_line(name),
                device
            ),
            Self::LeaveAnnouncement { name } => {
                format!("/me §e{}§r left the realm", sanitize_line(name))
            }
            Self::RelayedChat { author_tag, text } => format!(
                "/me §7<{}> §8§l>>§r {}",
                sanitize_line(author_tag),
                sanitize_line(text)
            ),
            Self::Say { text } => format!("/me {}", sanitize_line(text)),
        }
    }
}

impl fmt::Display for GameCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Collapses `text` onto one line.
///
/// Line breaks, tabs and other control characters would split or corrupt
/// the command, so each run of them becomes a single space. All other
/// content passes through verbatim.
pub fn sanitize_line(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_break = false;
    for ch in text.chars() {
        if ch.is_control() {
            if !in_break {
                out.push(' ');
                in_break = true;
            }
        } else {
            out.push(ch);
            in_break = false;
        }
    }
    out.trim().to_string()
}
