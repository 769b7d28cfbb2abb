//! Addressable event targets.
//!
//! Entities reference each other by casemapped identifier, resolved through
//! the session's registries; events carry an [`EntityId`], never a mutable
//! reference back into session state.

use std::collections::HashSet;

use crate::casemap::Casemapping;

/// Stable identifier of an event target.
///
/// Channel and query identifiers are stored casemapped so that lookups
/// survive case differences on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityId {
    /// The connection itself: registration progress, notices, force events.
    Server,
    /// A channel, by casemapped name.
    Channel(String),
    /// A private (query) conversation, by casemapped nick.
    Query(String),
}

impl EntityId {
    /// Channel id from a wire-form name.
    pub fn channel(name: &str, casemapping: Casemapping) -> EntityId {
        EntityId::Channel(casemapping.fold(name))
    }

    /// Query id from a wire-form nick.
    pub fn query(nick: &str, casemapping: Casemapping) -> EntityId {
        EntityId::Query(casemapping.fold(nick))
    }
}

/// Whether a recipient token names a channel.
pub fn is_channel_name(name: &str) -> bool {
    name.starts_with(['#', '&', '+', '!'])
}

/// A joined channel.
#[derive(Debug, Clone)]
pub struct Channel {
    /// Name as the server spells it.
    pub name: String,
    /// Current topic, if known.
    pub topic: Option<String>,
    /// Member nicks, casemapped.
    pub members: HashSet<String>,
}

impl Channel {
    /// Fresh record for a just-referenced channel.
    pub fn new(name: &str) -> Channel {
        Channel {
            name: name.to_string(),
            topic: None,
            members: HashSet::new(),
        }
    }
}

/// A private conversation partner.
#[derive(Debug, Clone)]
pub struct Query {
    /// Nick as the server spells it.
    pub nick: String,
}

impl Query {
    /// Fresh record for a just-referenced nick.
    pub fn new(nick: &str) -> Query {
        Query {
            nick: nick.to_string(),
        }
    }
}
