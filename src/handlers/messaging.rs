//! PRIVMSG and NOTICE handling, including CTCP sub-dispatch.
//!
//! Every inbound message passes the ignore filter, then splits three ways:
//! channel traffic, private (query) traffic, or server notices. CTCP-framed
//! payloads are unwrapped first; ACTION re-enters the message path as an
//! action, VERSION is answered directly, anything else is dropped.

use tracing::{debug, trace, warn};

use crate::colors::FormattedStringExt;
use crate::ctcp::{self, Ctcp};
use crate::dispatch::{Context, Handler};
use crate::entity::{is_channel_name, EntityId};
use crate::error::ProtocolViolation;
use crate::event::{Event, EventKind};
use crate::line::LineRef;
use crate::mention::is_mentioned;

/// PRIVMSG: channel and private messages plus CTCP requests.
pub struct Privmsg;

impl Handler for Privmsg {
    fn handle(&self, ctx: &mut Context<'_>, line: &LineRef<'_>) {
        let Some(source) = line.source() else {
            trace!("PRIVMSG without a source, dropped");
            return;
        };
        if let Err(err) = ProtocolViolation::check(line.command, 2, line.params.len()) {
            warn!(error = %err, "malformed line dropped");
            return;
        }
        let nick = source.nick.to_string();
        let (Some(target), Some(text)) = (line.arg(0), line.arg(1)) else {
            return;
        };
        if ctx.session.is_ignored(&nick) {
            trace!(nick = %nick, "message from ignored nick dropped");
            return;
        }
        // A server-originated PRIVMSG must not open a query conversation.
        if source.is_server() {
            let text = text.strip_formatting();
            ctx.emit(Event::new(
                EntityId::Server,
                text.to_string(),
                EventKind::ServerNotice {
                    sender: Some(nick),
                    text: text.to_string(),
                },
            ));
            return;
        }

        match ctcp::parse(text) {
            Some(Ctcp::Action(action)) => {
                deliver(ctx, &nick, target, action, true);
            }
            Some(Ctcp::Version) => {
                let reply = ctx.session.config.version_reply.clone();
                ctx.sender.send_version_reply(&nick, &reply);
            }
            Some(Ctcp::Other(payload)) => {
                debug!(nick = %nick, payload = payload, "unhandled CTCP request");
            }
            None => deliver(ctx, &nick, target, text, false),
        }
    }
}

/// Route a message or action to its channel or query conversation.
fn deliver(ctx: &mut Context<'_>, nick: &str, target: &str, text: &str, action: bool) {
    let text = text.strip_formatting();

    if is_channel_name(target) {
        ctx.session.channel_or_create(target);
        let mention = is_mentioned(&text, &ctx.session.nick, ctx.session.casemapping);
        let kind = if action {
            EventKind::ChannelAction {
                nick: nick.to_string(),
                text: text.to_string(),
                mention,
            }
        } else {
            EventKind::ChannelMessage {
                nick: nick.to_string(),
                text: text.to_string(),
                mention,
            }
        };
        ctx.emit(Event::new(
            ctx.session.channel_id(target),
            render(nick, &text, action),
            kind,
        ));
        return;
    }

    // Addressed to us: a query conversation, created on first contact.
    let (_, created) = ctx.session.query_or_create(nick);
    if created {
        // Announced server-wide so a consumer can discover the
        // conversation and attach before reading its backlog.
        ctx.emit(Event::new(
            EntityId::Server,
            format!("new conversation with {}", nick),
            EventKind::NewConversation {
                nick: nick.to_string(),
            },
        ));
    }
    let kind = if action {
        EventKind::QueryAction {
            nick: nick.to_string(),
            text: text.to_string(),
        }
    } else {
        EventKind::QueryMessage {
            nick: nick.to_string(),
            text: text.to_string(),
        }
    };
    ctx.emit(Event::new(
        ctx.session.query_id(nick),
        render(nick, &text, action),
        kind,
    ));
}

fn render(nick: &str, text: &str, action: bool) -> String {
    if action {
        format!("* {} {}", nick, text)
    } else {
        format!("<{}> {}", nick, text)
    }
}

/// NOTICE: channel notices and server notices.
///
/// Notices addressed to us never open a query conversation; anything not
/// aimed at a channel lands on the server entity.
pub struct Notice;

impl Handler for Notice {
    fn handle(&self, ctx: &mut Context<'_>, line: &LineRef<'_>) {
        if let Err(err) = ProtocolViolation::check(line.command, 2, line.params.len()) {
            warn!(error = %err, "malformed line dropped");
            return;
        }
        let (Some(target), Some(text)) = (line.arg(0), line.arg(1)) else {
            return;
        };
        let nick = line.source().map(|s| s.nick.to_string());
        if let Some(nick) = &nick {
            if ctx.session.is_ignored(nick) {
                return;
            }
        }
        if ctcp::is_ctcp(text) {
            // CTCP replies carried in NOTICE are not surfaced.
            trace!("CTCP notice dropped");
            return;
        }
        let text = text.strip_formatting();

        if is_channel_name(target) {
            ctx.session.channel_or_create(target);
            let nick = nick.unwrap_or_default();
            ctx.emit(Event::new(
                ctx.session.channel_id(target),
                format!("-{}- {}", nick, text),
                EventKind::ChannelNotice {
                    nick,
                    text: text.to_string(),
                },
            ));
        } else {
            ctx.emit(Event::new(
                EntityId::Server,
                text.to_string(),
                EventKind::ServerNotice {
                    sender: nick,
                    text: text.to_string(),
                },
            ));
        }
    }
}
