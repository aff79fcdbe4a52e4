use std::fmt;

use thiserror::Error;

const DM_PREFIX: &str = "dm:";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChannelError {
    #[error("invalid DM channel format")]
    MalformedDm,
}

/// An addressable fanout group: either a named room or a direct-message
/// channel between exactly two users.
///
/// The wire form of a DM is `dm:<a>:<b>`; [`Channel::dm`] produces the
/// canonical (lexicographically sorted) form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Channel {
    Plain(String),
    Dm(String, String),
}

impl Channel {
    /// Canonical DM channel for a pair of users, stable under argument swap.
    pub fn dm(a: &str, b: &str) -> Channel {
        if a <= b {
            Channel::Dm(a.to_string(), b.to_string())
        } else {
            Channel::Dm(b.to_string(), a.to_string())
        }
    }

    /// Parse a wire channel id. Anything carrying the `dm:` prefix must
    /// split on `:` into exactly three non-empty parts.
    pub fn parse(id: &str) -> Result<Channel, ChannelError> {
        if !id.starts_with(DM_PREFIX) {
            return Ok(Channel::Plain(id.to_string()));
        }
        let parts: Vec<&str> = id.split(':').collect();
        if parts.len() != 3 || parts[1].is_empty() || parts[2].is_empty() {
            return Err(ChannelError::MalformedDm);
        }
        Ok(Channel::Dm(parts[1].to_string(), parts[2].to_string()))
    }

    pub fn is_dm(&self) -> bool {
        matches!(self, Channel::Dm(_, _))
    }

    /// Whether `user_id` may join this channel. Plain channels admit
    /// anyone; a DM admits only its two participants.
    pub fn authorize(&self, user_id: &str) -> bool {
        match self {
            Channel::Plain(_) => true,
            Channel::Dm(a, b) => user_id == a || user_id == b,
        }
    }

    /// The DM participant that is not `sender`, if any.
    pub fn dm_peer(&self, sender: &str) -> Option<&str> {
        match self {
            Channel::Plain(_) => None,
            Channel::Dm(a, b) if sender == a => Some(b),
            Channel::Dm(a, b) if sender == b => Some(a),
            Channel::Dm(_, _) => None,
        }
    }

    /// Both DM participants, in stored order.
    pub fn dm_participants(&self) -> Option<(&str, &str)> {
        match self {
            Channel::Plain(_) => None,
            Channel::Dm(a, b) => Some((a, b)),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Plain(name) => f.write_str(name),
            Channel::Dm(a, b) => write!(f, "{DM_PREFIX}{a}:{b}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_channels_parse_verbatim() {
        assert_eq!(
            Channel::parse("general"),
            Ok(Channel::Plain("general".to_string()))
        );
    }

    #[test]
    fn dm_requires_exactly_three_parts() {
        assert_eq!(Channel::parse("dm:alice"), Err(ChannelError::MalformedDm));
        assert_eq!(
            Channel::parse("dm:alice:bob:carol"),
            Err(ChannelError::MalformedDm)
        );
        assert_eq!(Channel::parse("dm::bob"), Err(ChannelError::MalformedDm));
        assert_eq!(Channel::parse("dm:alice:"), Err(ChannelError::MalformedDm));
    }

    #[test]
    fn canonical_dm_is_stable_under_swap() {
        assert_eq!(Channel::dm("alice", "bob"), Channel::dm("bob", "alice"));
        assert_eq!(Channel::dm("alice", "bob").to_string(), "dm:alice:bob");
    }

    #[test]
    fn parse_display_round_trip() {
        for id in ["general", "dm:alice:bob"] {
            assert_eq!(Channel::parse(id).expect("parse").to_string(), id);
        }
    }

    #[test]
    fn dm_admits_only_participants() {
        let dm = Channel::parse("dm:alice:bob").expect("parse");
        assert!(dm.authorize("alice"));
        assert!(dm.authorize("bob"));
        assert!(!dm.authorize("mallory"));
        assert!(Channel::parse("general").expect("parse").authorize("anyone"));
    }

    #[test]
    fn dm_peer_is_the_other_participant() {
        let dm = Channel::dm("alice", "bob");
        assert_eq!(dm.dm_peer("alice"), Some("bob"));
        assert_eq!(dm.dm_peer("bob"), Some("alice"));
        assert_eq!(dm.dm_peer("mallory"), None);
        assert_eq!(Channel::Plain("general".into()).dm_peer("alice"), None);
    }
}
