//! Domain events produced by command handlers.
//!
//! Events are immutable values: a timestamp, a weak (identifier-based)
//! target reference, a rendered message, and a kind-specific payload.
//! Entity mutation happens in the handler before the event is built.

use chrono::{DateTime, Utc};

use crate::entity::EntityId;

/// One event, as delivered to observers or stored in a backlog.
#[derive(Debug, Clone)]
pub struct Event {
    /// Production time.
    pub timestamp: DateTime<Utc>,
    /// The entity this event belongs to.
    pub target: EntityId,
    /// Human-readable rendering, ready for display.
    pub message: String,
    /// Structured payload.
    pub kind: EventKind,
}

impl Event {
    /// Build an event stamped with the current time.
    pub fn new(target: EntityId, message: impl Into<String>, kind: EventKind) -> Event {
        Event {
            timestamp: Utc::now(),
            target,
            message: message.into(),
            kind,
        }
    }
}

/// Kind-specific event payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EventKind {
    /// PRIVMSG to a channel.
    ChannelMessage {
        /// Sending nick (raw string when the user is not otherwise known).
        nick: String,
        /// Message body, formatting stripped.
        text: String,
        /// Whether the local nick appears as a standalone token.
        mention: bool,
    },
    /// CTCP ACTION to a channel.
    ChannelAction {
        /// Sending nick.
        nick: String,
        /// Action body.
        text: String,
        /// Mention flag, computed once.
        mention: bool,
    },
    /// NOTICE to a channel.
    ChannelNotice {
        /// Sending nick.
        nick: String,
        /// Notice body.
        text: String,
    },
    /// PRIVMSG addressed to the local nick.
    QueryMessage {
        /// The conversation partner.
        nick: String,
        /// Message body.
        text: String,
    },
    /// CTCP ACTION addressed to the local nick.
    QueryAction {
        /// The conversation partner.
        nick: String,
        /// Action body.
        text: String,
    },
    /// A private message arrived from a previously unseen nick; emitted
    /// before the message event so observers can discover the conversation.
    NewConversation {
        /// The new conversation partner.
        nick: String,
    },
    /// Channel topic changed; `previous` is the pre-transition value.
    TopicChanged {
        /// Nick that set the topic.
        setter: String,
        /// Topic before the change, if one was known.
        previous: Option<String>,
        /// The new topic.
        topic: String,
    },
    /// We were invited to a channel.
    Invited {
        /// Inviting nick.
        inviter: String,
        /// Channel name.
        channel: String,
    },
    /// A user joined a channel (possibly us).
    Joined {
        /// Joining nick.
        nick: String,
    },
    /// A user left a channel.
    Parted {
        /// Parting nick.
        nick: String,
        /// Part reason, if given.
        reason: Option<String>,
    },
    /// A user was kicked from a channel.
    Kicked {
        /// Kicked nick.
        nick: String,
        /// Kicking nick.
        by: String,
        /// Kick reason, if given.
        reason: Option<String>,
    },
    /// A user quit the network; emitted per channel they shared with us
    /// and to any open query conversation.
    Quit {
        /// Quitting nick.
        nick: String,
        /// Quit reason, if given.
        reason: Option<String>,
    },
    /// A user changed nick; emitted per affected entity.
    NickChanged {
        /// Previous nick.
        old: String,
        /// New nick.
        new: String,
    },
    /// NOTICE outside any channel or query (server notices, pre-auth `*`).
    ServerNotice {
        /// Sender, when known.
        sender: Option<String>,
        /// Notice body.
        text: String,
    },
    /// Registration completed; the session is usable.
    Connected,
    /// The connection ended. Force event.
    Disconnected {
        /// What the transport or server reported.
        reason: String,
    },
    /// A nick candidate was rejected during registration. Force event.
    NickInUse {
        /// The rejected nick.
        nick: String,
        /// The candidate being tried next, if any remain.
        next: Option<String>,
    },
    /// The consumer should switch focus to the server view. Force event.
    ServerSwitch,
}

impl EventKind {
    /// Force events are always posted to the server-wide observer set,
    /// regardless of any entity's liveness: a consumer must learn about
    /// connection-level failures even while not observing anything.
    pub fn is_force(&self) -> bool {
        matches!(
            self,
            EventKind::Disconnected { .. } | EventKind::NickInUse { .. } | EventKind::ServerSwitch
        )
    }
}
