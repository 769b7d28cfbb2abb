//! Per-connection mutable state.
//!
//! The session is owned and mutated exclusively by the protocol task. It is
//! created at connect start, destroyed on disconnect, and recreated on
//! reconnect, never carried across connection attempts.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::casemap::Casemapping;
use crate::config::ConnectionConfig;
use crate::entity::{Channel, EntityId, Query};

/// Shared handler context: current nick, casemapping, ignore list, and the
/// registries resolving entity identifiers to records.
pub struct Session {
    /// The configuration this connection was started with.
    pub config: Arc<ConnectionConfig>,
    /// Server-declared casemapping; ascii until ISUPPORT says otherwise.
    pub casemapping: Casemapping,
    /// Our current nick.
    pub nick: String,
    /// Casemapped nicks whose messages are dropped.
    ignored: HashSet<String>,
    channels: HashMap<String, Channel>,
    queries: HashMap<String, Query>,
}

impl Session {
    /// Fresh session for one connection attempt.
    pub fn new(config: Arc<ConnectionConfig>) -> Session {
        let casemapping = Casemapping::default();
        let nick = config.nicks.first().cloned().unwrap_or_default();
        let ignored = config
            .ignore_list
            .iter()
            .map(|n| casemapping.fold(n))
            .collect();
        Session {
            config,
            casemapping,
            nick,
            ignored,
            channels: HashMap::new(),
            queries: HashMap::new(),
        }
    }

    /// Switch casemapping (from ISUPPORT) and re-fold existing keys.
    pub fn set_casemapping(&mut self, casemapping: Casemapping) {
        if casemapping == self.casemapping {
            return;
        }
        self.casemapping = casemapping;
        self.ignored = self.ignored.iter().map(|n| casemapping.fold(n)).collect();
        self.channels = self
            .channels
            .drain()
            .map(|(_, c)| (casemapping.fold(&c.name), c))
            .collect();
        self.queries = self
            .queries
            .drain()
            .map(|(_, q)| (casemapping.fold(&q.nick), q))
            .collect();
    }

    /// Whether a nick is ours under the session casemapping.
    pub fn is_self(&self, nick: &str) -> bool {
        self.casemapping.eq(nick, &self.nick)
    }

    /// Whether messages from a nick are to be discarded.
    pub fn is_ignored(&self, nick: &str) -> bool {
        self.ignored.contains(&self.casemapping.fold(nick))
    }

    // === Channels ===

    /// Look up a channel by wire-form name.
    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.get(&self.casemapping.fold(name))
    }

    /// Mutable channel lookup.
    pub fn channel_mut(&mut self, name: &str) -> Option<&mut Channel> {
        self.channels.get_mut(&self.casemapping.fold(name))
    }

    /// Resolve a channel, creating a transient record on first reference.
    pub fn channel_or_create(&mut self, name: &str) -> &mut Channel {
        self.channels
            .entry(self.casemapping.fold(name))
            .or_insert_with(|| Channel::new(name))
    }

    /// Remove a channel record (self part/kick, close).
    pub fn remove_channel(&mut self, name: &str) -> Option<Channel> {
        self.channels.remove(&self.casemapping.fold(name))
    }

    /// Channels whose member set contains `nick`.
    pub fn channels_with(&self, nick: &str) -> Vec<String> {
        let folded = self.casemapping.fold(nick);
        self.channels
            .values()
            .filter(|c| c.members.contains(&folded))
            .map(|c| c.name.clone())
            .collect()
    }

    /// All known channels.
    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.channels.values()
    }

    // === Queries ===

    /// Look up a private conversation by nick.
    pub fn query(&self, nick: &str) -> Option<&Query> {
        self.queries.get(&self.casemapping.fold(nick))
    }

    /// Resolve a query conversation; the flag reports whether it was
    /// created by this call (first message from an unseen nick).
    pub fn query_or_create(&mut self, nick: &str) -> (&mut Query, bool) {
        let key = self.casemapping.fold(nick);
        let created = !self.queries.contains_key(&key);
        let query = self.queries.entry(key).or_insert_with(|| Query::new(nick));
        (query, created)
    }

    /// Remove a query record.
    pub fn remove_query(&mut self, nick: &str) -> Option<Query> {
        self.queries.remove(&self.casemapping.fold(nick))
    }

    /// Rename a query conversation after a NICK change.
    pub fn rename_query(&mut self, old: &str, new: &str) -> bool {
        if let Some(mut query) = self.queries.remove(&self.casemapping.fold(old)) {
            query.nick = new.to_string();
            self.queries.insert(self.casemapping.fold(new), query);
            true
        } else {
            false
        }
    }

    /// Entity id for a channel under the session casemapping.
    pub fn channel_id(&self, name: &str) -> EntityId {
        EntityId::channel(name, self.casemapping)
    }

    /// Entity id for a query under the session casemapping.
    pub fn query_id(&self, nick: &str) -> EntityId {
        EntityId::query(nick, self.casemapping)
    }
}
