//! Post-registration command dispatch.
//!
//! Each protocol command is handled by one [`Handler`] looked up in a
//! [`Registry`] keyed by command token. Handlers run on the protocol task
//! with exclusive access to the session through [`Context`]; state mutation
//! happens inside the handler, event emission goes through the bus.

use std::collections::HashMap;

use tracing::trace;

use crate::bus::EventBus;
use crate::event::Event;
use crate::line::LineRef;
use crate::sender::Sender;
use crate::session::Session;

/// Everything a handler may touch while processing one line.
pub struct Context<'a> {
    /// Per-connection mutable state.
    pub session: &'a mut Session,
    /// Event sink.
    pub bus: &'a EventBus,
    /// Outbound line writer.
    pub sender: &'a Sender,
}

impl Context<'_> {
    /// Emit an event to the bus.
    pub fn emit(&self, event: Event) {
        self.bus.emit(event);
    }
}

/// One command's processing logic.
pub trait Handler: Send + Sync {
    /// Process a line whose command matched this handler's registration.
    fn handle(&self, ctx: &mut Context<'_>, line: &LineRef<'_>);
}

/// Command-to-handler table.
///
/// Keys are uppercase command tokens or 3-digit numerics; lookup
/// uppercases the wire command so `privmsg` and `PRIVMSG` hit the same
/// handler.
#[derive(Default)]
pub struct Registry {
    handlers: HashMap<&'static str, Box<dyn Handler>>,
}

impl Registry {
    /// Empty registry.
    pub fn new() -> Registry {
        Registry::default()
    }

    /// Register a handler for a command token.
    pub fn register(&mut self, command: &'static str, handler: Box<dyn Handler>) {
        self.handlers.insert(command, handler);
    }

    /// Whether a command has a registered handler.
    pub fn recognizes(&self, command: &str) -> bool {
        self.handlers.contains_key(command.to_ascii_uppercase().as_str())
    }

    /// Route one line to its handler; unrecognized commands are dropped.
    pub fn dispatch(&self, ctx: &mut Context<'_>, line: &LineRef<'_>) {
        match self.handlers.get(line.command.to_ascii_uppercase().as_str()) {
            Some(handler) => handler.handle(ctx, line),
            None => trace!(command = line.command, "no handler, line dropped"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectionConfig;
    use crate::entity::EntityId;
    use crate::event::EventKind;
    use std::sync::Arc;

    struct Echo;

    impl Handler for Echo {
        fn handle(&self, ctx: &mut Context<'_>, line: &LineRef<'_>) {
            ctx.emit(Event::new(
                EntityId::Server,
                line.arg(0).unwrap_or(""),
                EventKind::Connected,
            ));
        }
    }

    fn context_parts() -> (Session, EventBus, Sender) {
        let session = Session::new(Arc::new(ConnectionConfig::default()));
        let (sender, _rx) = Sender::new();
        // The receiver half is dropped; sends are silently discarded.
        (session, EventBus::new(), sender)
    }

    #[test]
    fn test_dispatch_case_insensitive() {
        let mut registry = Registry::new();
        registry.register("PING", Box::new(Echo));

        let (mut session, bus, sender) = context_parts();
        let mut server_rx = bus.attach(&EntityId::Server);
        let mut ctx = Context {
            session: &mut session,
            bus: &bus,
            sender: &sender,
        };

        let line = LineRef::parse("ping :token").unwrap();
        registry.dispatch(&mut ctx, &line);
        assert_eq!(server_rx.try_recv().unwrap().message, "token");
    }

    #[test]
    fn test_unknown_command_dropped() {
        let registry = Registry::new();
        let (mut session, bus, sender) = context_parts();
        let mut server_rx = bus.attach(&EntityId::Server);
        let mut ctx = Context {
            session: &mut session,
            bus: &bus,
            sender: &sender,
        };

        let line = LineRef::parse(":server BATCH +x").unwrap();
        registry.dispatch(&mut ctx, &line);
        assert!(server_rx.try_recv().is_err());
        assert!(!registry.recognizes("BATCH"));
    }
}
