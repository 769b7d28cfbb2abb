//! Built-in command handlers.
//!
//! [`default_registry`] wires up the full post-registration command set;
//! embedders can extend the returned registry with their own handlers
//! before handing it to the connection.

use crate::dispatch::Registry;

pub mod channel;
pub mod connection;
pub mod messaging;

/// The registry the connection uses unless told otherwise.
pub fn default_registry() -> Registry {
    let mut registry = Registry::new();

    registry.register("PRIVMSG", Box::new(messaging::Privmsg));
    registry.register("NOTICE", Box::new(messaging::Notice));

    registry.register("JOIN", Box::new(channel::Join));
    registry.register("PART", Box::new(channel::Part));
    registry.register("KICK", Box::new(channel::Kick));
    registry.register("QUIT", Box::new(channel::Quit));
    registry.register("NICK", Box::new(channel::Nick));
    registry.register("TOPIC", Box::new(channel::Topic));
    registry.register("INVITE", Box::new(channel::Invite));
    registry.register("332", Box::new(channel::TopicReply));
    registry.register("353", Box::new(channel::NamesReply));

    registry.register("PING", Box::new(connection::Ping));
    registry.register("005", Box::new(connection::Isupport));

    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_covers_core_commands() {
        let registry = default_registry();
        for command in ["PRIVMSG", "NOTICE", "JOIN", "PART", "QUIT", "PING", "005"] {
            assert!(registry.recognizes(command), "{command}");
        }
        assert!(!registry.recognizes("CAP"));
    }
}
