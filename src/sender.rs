//! Outbound line sender.
//!
//! One method per protocol verb; each call serializes to exactly one line.
//! Lines are queued on an unbounded channel and written by the protocol
//! task, so the handshake machine and handlers stay synchronous.

use tokio::sync::mpsc;
use tracing::trace;

use crate::caps::Capability;
use crate::ctcp::CTCP_DELIMITER;

/// Prefix a trailing parameter with `:` when the wire format requires it.
fn trailing(param: &str) -> String {
    if param.is_empty() || param.contains(' ') || param.starts_with(':') {
        format!(":{}", param)
    } else {
        param.to_string()
    }
}

/// Handle for writing protocol lines, cloneable across tasks.
#[derive(Clone, Debug)]
pub struct Sender {
    tx: mpsc::UnboundedSender<String>,
}

impl Sender {
    /// Create a sender and the queue the protocol task drains from.
    pub fn new() -> (Sender, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Sender { tx }, rx)
    }

    /// Queue one raw line (no terminator; the codec appends CRLF).
    pub fn raw(&self, line: impl Into<String>) {
        let line = line.into();
        trace!(line = %line, "queueing outbound line");
        // A closed queue means the connection is already torn down; the
        // line would go nowhere either way.
        let _ = self.tx.send(line);
    }

    // === Registration ===

    /// `PASS <password>`
    pub fn send_pass(&self, password: &str) {
        self.raw(format!("PASS {}", trailing(password)));
    }

    /// `NICK <nick>`
    pub fn send_nick(&self, nick: &str) {
        self.raw(format!("NICK {}", nick));
    }

    /// `USER <username> 0 * :<realname>`
    pub fn send_user(&self, username: &str, realname: &str) {
        self.raw(format!("USER {} 0 * :{}", username, realname));
    }

    /// `CAP LS 302`
    pub fn send_cap_ls(&self) {
        self.raw("CAP LS 302");
    }

    /// `CAP REQ :<caps>`
    pub fn send_cap_req(&self, caps: &[Capability]) {
        let list = caps
            .iter()
            .map(|c| c.as_ref())
            .collect::<Vec<_>>()
            .join(" ");
        self.raw(format!("CAP REQ :{}", list));
    }

    /// `CAP END`
    pub fn send_cap_end(&self) {
        self.raw("CAP END");
    }

    /// `AUTHENTICATE <mechanism-or-payload>`
    pub fn send_authenticate(&self, payload: &str) {
        self.raw(format!("AUTHENTICATE {}", payload));
    }

    /// `NICKSERV IDENTIFY <password>`
    pub fn send_nickserv_identify(&self, password: &str) {
        self.raw(format!("NICKSERV IDENTIFY {}", password));
    }

    // === Domain verbs ===

    /// `JOIN <channel>`
    pub fn send_join(&self, channel: &str) {
        self.raw(format!("JOIN {}", channel));
    }

    /// `PART <channel> [:reason]`
    pub fn send_part(&self, channel: &str, reason: Option<&str>) {
        match reason {
            Some(reason) => self.raw(format!("PART {} {}", channel, trailing(reason))),
            None => self.raw(format!("PART {}", channel)),
        }
    }

    /// `PRIVMSG <target> :<text>`
    pub fn send_privmsg(&self, target: &str, text: &str) {
        self.raw(format!("PRIVMSG {} {}", target, trailing(text)));
    }

    /// `NOTICE <target> :<text>`
    pub fn send_notice(&self, target: &str, text: &str) {
        self.raw(format!("NOTICE {} {}", target, trailing(text)));
    }

    /// `PRIVMSG <target> :\x01ACTION <text>\x01`
    pub fn send_action(&self, target: &str, text: &str) {
        self.raw(format!(
            "PRIVMSG {} :{}ACTION {}{}",
            target, CTCP_DELIMITER, text, CTCP_DELIMITER
        ));
    }

    /// CTCP VERSION reply: `NOTICE <nick> :\x01VERSION <version>\x01`
    pub fn send_version_reply(&self, nick: &str, version: &str) {
        self.raw(format!(
            "NOTICE {} :{}VERSION {}{}",
            nick, CTCP_DELIMITER, version, CTCP_DELIMITER
        ));
    }

    /// `TOPIC <channel> :<topic>`
    pub fn send_topic(&self, channel: &str, topic: &str) {
        self.raw(format!("TOPIC {} {}", channel, trailing(topic)));
    }

    /// `KICK <channel> <nick> [:reason]`
    pub fn send_kick(&self, channel: &str, nick: &str, reason: Option<&str>) {
        match reason {
            Some(reason) => self.raw(format!("KICK {} {} {}", channel, nick, trailing(reason))),
            None => self.raw(format!("KICK {} {}", channel, nick)),
        }
    }

    /// `MODE <target> <modes>`
    pub fn send_mode(&self, target: &str, modes: &str) {
        self.raw(format!("MODE {} {}", target, modes));
    }

    /// `PONG :<token>`
    pub fn send_pong(&self, token: &str) {
        self.raw(format!("PONG {}", trailing(token)));
    }

    /// `QUIT [:reason]`
    pub fn send_quit(&self, reason: Option<&str>) {
        match reason {
            Some(reason) => self.raw(format!("QUIT {}", trailing(reason))),
            None => self.raw("QUIT"),
        }
    }

    /// `WHOIS <nick>`
    pub fn send_whois(&self, nick: &str) {
        self.raw(format!("WHOIS {}", nick));
    }
}
