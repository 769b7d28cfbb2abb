//! # slirc-client
//!
//! A client-side engine for the IRC protocol. The crate turns a line-oriented
//! server stream into typed domain events and routes them to interested
//! consumers, while owning the connection lifecycle that makes later lines
//! interpretable: capability negotiation, SASL authentication, registration,
//! nick casemapping, channel membership, and ignore lists.
//!
//! ## Architecture
//!
//! - [`line`] tokenizes one raw protocol line into `(prefix, command, params)`.
//! - [`handshake`] owns the CAP/SASL/registration state machine and talks to
//!   the server through the [`Sender`] abstraction.
//! - [`dispatch`] routes post-registration lines by command keyword to
//!   handlers, which mutate the [`Session`] and emit [`Event`]s.
//! - [`bus`] decides whether an event is delivered live to an attached
//!   observer or absorbed into a per-entity backlog for later replay.
//!
//! The protocol task is the only mutator of session state; consumers receive
//! immutable events through one ordered channel per observer.
//!
//! ## Quick Start
//!
//! ```no_run
//! use slirc_client::{Connection, ConnectionConfig, EntityId};
//!
//! # async fn demo() -> std::io::Result<()> {
//! let config = ConnectionConfig {
//!     nicks: vec!["ferris".into(), "ferris_".into()],
//!     username: "ferris".into(),
//!     realname: "Rust Crab".into(),
//!     ..ConnectionConfig::default()
//! };
//!
//! let connection = Connection::spawn("irc.example.net:6667", config).await?;
//! let mut server_events = connection.bus().attach(&EntityId::Server);
//!
//! while let Some(event) = server_events.recv().await {
//!     println!("{}", event.message);
//! }
//! # Ok(())
//! # }
//! ```

#![deny(clippy::all)]

pub mod bus;
pub mod caps;
pub mod casemap;
pub mod client;
pub mod codec;
pub mod colors;
pub mod config;
pub mod ctcp;
pub mod dispatch;
pub mod entity;
pub mod error;
pub mod event;
pub mod handlers;
pub mod handshake;
pub mod input;
pub mod line;
pub mod mention;
pub mod prefix;
pub mod sasl;
pub mod sender;
pub mod session;

pub use self::bus::EventBus;
pub use self::caps::Capability;
pub use self::casemap::Casemapping;
pub use self::client::Connection;
pub use self::codec::{LineCodec, MAX_LINE_LEN};
pub use self::colors::FormattedStringExt;
pub use self::config::{ConnectionConfig, SaslCredentials};
pub use self::ctcp::Ctcp;
pub use self::dispatch::{Context, Handler, Registry};
pub use self::entity::EntityId;
pub use self::error::{EngineError, LineParseError, NegotiationFailure, ProtocolViolation};
pub use self::event::{Event, EventKind};
pub use self::handshake::{Progress, Registration, RegistrationPhase};
pub use self::input::{handle_input, InputError, InputTarget};
pub use self::line::LineRef;
pub use self::mention::is_mentioned;
pub use self::prefix::Source;
pub use self::sender::Sender;
pub use self::session::Session;
