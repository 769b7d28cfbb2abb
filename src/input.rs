//! User input parsing.
//!
//! Turns one typed line into protocol traffic through the [`Sender`].
//! Plain text becomes a PRIVMSG to the conversation it was typed in;
//! `/`-prefixed lines are slash commands. Parsing is context-sensitive:
//! commands like `/kick` only make sense typed in a channel.

use thiserror::Error;

use crate::entity::is_channel_name;
use crate::sender::Sender;

/// Where the line was typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputTarget<'a> {
    /// The server view; only slash commands are meaningful here.
    Server,
    /// A channel conversation.
    Channel(&'a str),
    /// A private conversation.
    Query(&'a str),
}

impl<'a> InputTarget<'a> {
    /// The PRIVMSG recipient for plain text, if there is one.
    fn recipient(&self) -> Option<&'a str> {
        match self {
            InputTarget::Server => None,
            InputTarget::Channel(name) => Some(name),
            InputTarget::Query(nick) => Some(nick),
        }
    }
}

/// Why a typed line could not be turned into protocol traffic.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    /// Slash command not recognized.
    #[error("unknown command: /{0}")]
    UnknownCommand(String),
    /// The command needs an argument that was not supplied.
    #[error("/{command} requires {argument}")]
    MissingArgument {
        /// The command name, without the slash.
        command: &'static str,
        /// Description of the missing argument.
        argument: &'static str,
    },
    /// The command or message needs a conversation and was typed in the
    /// server view.
    #[error("not in a conversation")]
    NotInConversation,
    /// The command only works inside a channel.
    #[error("not in a channel")]
    NotInChannel,
}

/// Parse one typed line and queue the resulting protocol traffic.
pub fn handle_input(
    input: &str,
    target: InputTarget<'_>,
    sender: &Sender,
) -> Result<(), InputError> {
    let Some(rest) = input.strip_prefix('/') else {
        return send_message(input, target, sender);
    };
    // "//text" sends a literal line starting with a slash.
    if rest.starts_with('/') {
        return send_message(rest, target, sender);
    }

    let (command, args) = match rest.split_once(' ') {
        Some((command, args)) => (command, args.trim()),
        None => (rest, ""),
    };

    match command.to_ascii_lowercase().as_str() {
        "me" => {
            let recipient = target.recipient().ok_or(InputError::NotInConversation)?;
            sender.send_action(recipient, args);
            Ok(())
        }
        "msg" => {
            let (nick, text) = args
                .split_once(' ')
                .ok_or(InputError::MissingArgument {
                    command: "msg",
                    argument: "a nick and a message",
                })?;
            sender.send_privmsg(nick, text);
            Ok(())
        }
        "notice" => {
            let (recipient, text) = args
                .split_once(' ')
                .ok_or(InputError::MissingArgument {
                    command: "notice",
                    argument: "a target and a message",
                })?;
            sender.send_notice(recipient, text);
            Ok(())
        }
        "join" | "j" => {
            if args.is_empty() {
                return Err(InputError::MissingArgument {
                    command: "join",
                    argument: "a channel name",
                });
            }
            sender.send_join(args.split(' ').next().unwrap_or(args));
            Ok(())
        }
        "part" | "leave" => {
            let (channel, reason) = match args.split_once(' ') {
                Some((channel, reason)) if is_channel_name(channel) => {
                    (Some(channel), Some(reason))
                }
                _ if !args.is_empty() && is_channel_name(args) => (Some(args), None),
                _ if args.is_empty() => (None, None),
                // Bare words are a part reason for the current channel.
                _ => (None, Some(args)),
            };
            let channel = match (channel, target) {
                (Some(channel), _) => channel,
                (None, InputTarget::Channel(name)) => name,
                (None, _) => return Err(InputError::NotInChannel),
            };
            sender.send_part(channel, reason);
            Ok(())
        }
        "topic" => {
            let InputTarget::Channel(channel) = target else {
                return Err(InputError::NotInChannel);
            };
            // An argument-less TOPIC would set the empty string and wipe
            // the channel topic.
            if args.is_empty() {
                return Err(InputError::MissingArgument {
                    command: "topic",
                    argument: "the new topic",
                });
            }
            sender.send_topic(channel, args);
            Ok(())
        }
        "kick" => {
            let InputTarget::Channel(channel) = target else {
                return Err(InputError::NotInChannel);
            };
            let (nick, reason) = match args.split_once(' ') {
                Some((nick, reason)) => (nick, Some(reason)),
                None => (args, None),
            };
            if nick.is_empty() {
                return Err(InputError::MissingArgument {
                    command: "kick",
                    argument: "a nick",
                });
            }
            sender.send_kick(channel, nick, reason);
            Ok(())
        }
        "mode" => {
            let (recipient, modes) = args
                .split_once(' ')
                .ok_or(InputError::MissingArgument {
                    command: "mode",
                    argument: "a target and a mode string",
                })?;
            sender.send_mode(recipient, modes);
            Ok(())
        }
        "nick" => {
            if args.is_empty() {
                return Err(InputError::MissingArgument {
                    command: "nick",
                    argument: "a new nick",
                });
            }
            sender.send_nick(args);
            Ok(())
        }
        "whois" => {
            if args.is_empty() {
                return Err(InputError::MissingArgument {
                    command: "whois",
                    argument: "a nick",
                });
            }
            sender.send_whois(args);
            Ok(())
        }
        "quit" => {
            sender.send_quit(if args.is_empty() { None } else { Some(args) });
            Ok(())
        }
        "raw" | "quote" => {
            if args.is_empty() {
                return Err(InputError::MissingArgument {
                    command: "raw",
                    argument: "a protocol line",
                });
            }
            sender.raw(args);
            Ok(())
        }
        other => Err(InputError::UnknownCommand(other.to_string())),
    }
}

fn send_message(
    text: &str,
    target: InputTarget<'_>,
    sender: &Sender,
) -> Result<(), InputError> {
    let recipient = target.recipient().ok_or(InputError::NotInConversation)?;
    sender.send_privmsg(recipient, text);
    Ok(())
}
