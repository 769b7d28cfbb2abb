//! Channel membership and lifecycle commands.
//!
//! JOIN/PART/KICK keep the member registries current; QUIT and NICK fan
//! out to every entity the affected nick shares with us. Topic events are
//! rendered against the previous topic before the record is mutated.

use tracing::{trace, warn};

use crate::dispatch::{Context, Handler};
use crate::entity::EntityId;
use crate::error::ProtocolViolation;
use crate::event::{Event, EventKind};
use crate::line::LineRef;

/// JOIN: a user (possibly us) entered a channel.
pub struct Join;

impl Handler for Join {
    fn handle(&self, ctx: &mut Context<'_>, line: &LineRef<'_>) {
        let Some(source) = line.source() else { return };
        let Some(channel) = line.arg(0) else { return };
        let nick = source.nick.to_string();

        let folded = ctx.session.casemapping.fold(&nick);
        ctx.session.channel_or_create(channel).members.insert(folded);

        ctx.emit(Event::new(
            ctx.session.channel_id(channel),
            format!("{} joined {}", nick, channel),
            EventKind::Joined { nick },
        ));
    }
}

/// PART: a user left a channel; when it is us, the record is dropped.
pub struct Part;

impl Handler for Part {
    fn handle(&self, ctx: &mut Context<'_>, line: &LineRef<'_>) {
        let Some(source) = line.source() else { return };
        let Some(channel) = line.arg(0) else { return };
        let nick = source.nick.to_string();
        let reason = line.arg(1).map(str::to_string);

        let message = match &reason {
            Some(reason) => format!("{} left {} ({})", nick, channel, reason),
            None => format!("{} left {}", nick, channel),
        };
        let id = ctx.session.channel_id(channel);
        let ours = ctx.session.is_self(&nick);

        if ours {
            ctx.emit(Event::new(id.clone(), message, EventKind::Parted { nick, reason }));
            ctx.session.remove_channel(channel);
            ctx.bus.forget(&id);
        } else {
            let folded = ctx.session.casemapping.fold(&nick);
            if let Some(record) = ctx.session.channel_mut(channel) {
                record.members.remove(&folded);
            }
            ctx.emit(Event::new(id, message, EventKind::Parted { nick, reason }));
        }
    }
}

/// KICK: forced removal; self-kick closes the channel like a self-part.
pub struct Kick;

impl Handler for Kick {
    fn handle(&self, ctx: &mut Context<'_>, line: &LineRef<'_>) {
        let Some(source) = line.source() else { return };
        if let Err(err) = ProtocolViolation::check(line.command, 2, line.params.len()) {
            warn!(error = %err, "malformed line dropped");
            return;
        }
        let (Some(channel), Some(victim)) = (line.arg(0), line.arg(1)) else {
            return;
        };
        let by = source.nick.to_string();
        let victim = victim.to_string();
        let reason = line.arg(2).map(str::to_string);

        let message = match &reason {
            Some(reason) => format!("{} kicked {} from {} ({})", by, victim, channel, reason),
            None => format!("{} kicked {} from {}", by, victim, channel),
        };
        let id = ctx.session.channel_id(channel);
        let kind = EventKind::Kicked {
            nick: victim.clone(),
            by,
            reason,
        };

        if ctx.session.is_self(&victim) {
            ctx.emit(Event::new(id.clone(), message, kind));
            ctx.session.remove_channel(channel);
            ctx.bus.forget(&id);
            // The conversation the consumer was looking at is gone.
            ctx.emit(Event::new(
                EntityId::Server,
                format!("kicked from {}", channel),
                EventKind::ServerSwitch,
            ));
        } else {
            let folded = ctx.session.casemapping.fold(&victim);
            if let Some(record) = ctx.session.channel_mut(channel) {
                record.members.remove(&folded);
            }
            ctx.emit(Event::new(id, message, kind));
        }
    }
}

/// QUIT: fan out to every channel the nick shared with us, and to any
/// open query conversation with them.
pub struct Quit;

impl Handler for Quit {
    fn handle(&self, ctx: &mut Context<'_>, line: &LineRef<'_>) {
        let Some(source) = line.source() else { return };
        let nick = source.nick.to_string();
        let reason = line.arg(0).map(str::to_string);

        let message = match &reason {
            Some(reason) => format!("{} quit ({})", nick, reason),
            None => format!("{} quit", nick),
        };

        let folded = ctx.session.casemapping.fold(&nick);
        for channel in ctx.session.channels_with(&nick) {
            if let Some(record) = ctx.session.channel_mut(&channel) {
                record.members.remove(&folded);
            }
            ctx.emit(Event::new(
                ctx.session.channel_id(&channel),
                message.clone(),
                EventKind::Quit {
                    nick: nick.clone(),
                    reason: reason.clone(),
                },
            ));
        }

        if ctx.session.query(&nick).is_some() {
            ctx.emit(Event::new(
                ctx.session.query_id(&nick),
                message,
                EventKind::Quit { nick, reason },
            ));
        }
    }
}

/// NICK: rename in every shared channel and any open query conversation.
pub struct Nick;

impl Handler for Nick {
    fn handle(&self, ctx: &mut Context<'_>, line: &LineRef<'_>) {
        let Some(source) = line.source() else { return };
        let Some(new) = line.arg(0) else { return };
        let old = source.nick.to_string();
        let new = new.to_string();

        if ctx.session.is_self(&old) {
            ctx.session.nick = new.clone();
        }

        let message = format!("{} is now known as {}", old, new);
        let old_folded = ctx.session.casemapping.fold(&old);
        let new_folded = ctx.session.casemapping.fold(&new);

        for channel in ctx.session.channels_with(&old) {
            if let Some(record) = ctx.session.channel_mut(&channel) {
                record.members.remove(&old_folded);
                record.members.insert(new_folded.clone());
            }
            ctx.emit(Event::new(
                ctx.session.channel_id(&channel),
                message.clone(),
                EventKind::NickChanged {
                    old: old.clone(),
                    new: new.clone(),
                },
            ));
        }

        if ctx.session.rename_query(&old, &new) {
            ctx.emit(Event::new(
                ctx.session.query_id(&new),
                message,
                EventKind::NickChanged { old, new },
            ));
        }
    }
}

/// TOPIC: render against the previous topic, then mutate the record.
pub struct Topic;

impl Handler for Topic {
    fn handle(&self, ctx: &mut Context<'_>, line: &LineRef<'_>) {
        let Some(source) = line.source() else { return };
        let (Some(channel), Some(topic)) = (line.arg(0), line.arg(1)) else {
            return;
        };
        let setter = source.nick.to_string();
        emit_topic(ctx, channel, &setter, topic);
    }
}

/// 332 RPL_TOPIC: the stored topic sent on join or explicit query.
pub struct TopicReply;

impl Handler for TopicReply {
    fn handle(&self, ctx: &mut Context<'_>, line: &LineRef<'_>) {
        let (Some(channel), Some(topic)) = (line.arg(1), line.arg(2)) else {
            return;
        };
        let setter = line.source().map(|s| s.nick.to_string()).unwrap_or_default();
        emit_topic(ctx, channel, &setter, topic);
    }
}

fn emit_topic(ctx: &mut Context<'_>, channel: &str, setter: &str, topic: &str) {
    let record = ctx.session.channel_or_create(channel);
    // Previous topic is read before the record changes; the rendering
    // reflects the transition, not the end state.
    let previous = record.topic.clone();
    record.topic = Some(topic.to_string());

    let message = match &previous {
        Some(old) => format!("{} changed the topic from \"{}\" to \"{}\"", setter, old, topic),
        None => format!("{} set the topic to \"{}\"", setter, topic),
    };
    ctx.emit(Event::new(
        ctx.session.channel_id(channel),
        message,
        EventKind::TopicChanged {
            setter: setter.to_string(),
            previous,
            topic: topic.to_string(),
        },
    ));
}

/// 353 RPL_NAMREPLY: seed the member registry; no event.
pub struct NamesReply;

impl Handler for NamesReply {
    fn handle(&self, ctx: &mut Context<'_>, line: &LineRef<'_>) {
        let (Some(channel), Some(names)) = (line.arg(2), line.arg(3)) else {
            return;
        };
        let names: Vec<String> = names
            .split_whitespace()
            .map(|n| n.trim_start_matches(['@', '+', '%', '&', '~', '!']))
            .map(|n| ctx.session.casemapping.fold(n))
            .collect();
        let record = ctx.session.channel_or_create(channel);
        for nick in names {
            record.members.insert(nick);
        }
        trace!(channel = channel, "names reply merged");
    }
}

/// INVITE: announced server-wide; we have no entity for the channel yet.
pub struct Invite;

impl Handler for Invite {
    fn handle(&self, ctx: &mut Context<'_>, line: &LineRef<'_>) {
        let Some(source) = line.source() else { return };
        let Some(channel) = line.arg(1) else { return };
        let inviter = source.nick.to_string();

        ctx.emit(Event::new(
            EntityId::Server,
            format!("{} invited you to {}", inviter, channel),
            EventKind::Invited {
                inviter,
                channel: channel.to_string(),
            },
        ));
    }
}
