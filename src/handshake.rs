//! Registration and capability-negotiation state machine.
//!
//! Owns the connection's handshake lifecycle: CAP LS/REQ/ACK/NAK, SASL
//! PLAIN, and the deferred PASS/NICK/USER registration. The machine does no
//! I/O of its own; it writes through the [`Sender`] and consumes already
//! tokenized lines, so the whole handshake is unit-testable without a
//! socket.
//!
//! Registration lines are gated behind capability/SASL completion: sending
//! USER too early would let some servers complete registration before SASL
//! finishes.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::caps::{parse_cap_list, Capability};
use crate::config::ConnectionConfig;
use crate::error::{EngineError, NegotiationFailure};
use crate::line::LineRef;
use crate::sasl;
use crate::sender::Sender;

/// Where the handshake currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationPhase {
    /// Nothing sent yet.
    Init,
    /// CAP LS sent, awaiting the server's advertisement.
    CapLsSent,
    /// CAP REQ sent, awaiting ACK/NAK.
    CapNegotiating,
    /// AUTHENTICATE PLAIN sent, awaiting the `+` continuation.
    SaslPending,
    /// Credential payload sent, awaiting the result numeric.
    SaslAuthenticating,
    /// CAP END going out; transient on the way to `Registering`.
    CapEnding,
    /// PASS/NICK/USER sent, awaiting the welcome numeric.
    Registering,
    /// 001 received; the session is live.
    Registered,
    /// Fatal negotiation or nick failure; the connection is being torn down.
    Aborted,
}

/// What a consumed line meant, reported to the protocol task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    /// Handshake continues; nothing for the caller to do.
    Pending,
    /// A nick candidate was rejected and the next one has been sent.
    NickRetry {
        /// The nick the server refused.
        taken: String,
        /// The candidate now being tried.
        next: String,
    },
    /// The welcome numeric arrived; registration is complete.
    Registered,
}

/// The handshake state machine, one per connection attempt.
pub struct Registration {
    config: Arc<ConnectionConfig>,
    phase: RegistrationPhase,
    /// What the server advertised in CAP LS.
    advertised: HashSet<Capability>,
    /// REQ sent, answer outstanding.
    pending: HashSet<Capability>,
    /// ACKed; never populated without a prior REQ.
    negotiated: HashSet<Capability>,
    nick_index: usize,
}

impl Registration {
    /// Create the machine for a fresh connection.
    pub fn new(config: Arc<ConnectionConfig>) -> Registration {
        Registration {
            config,
            phase: RegistrationPhase::Init,
            advertised: HashSet::new(),
            pending: HashSet::new(),
            negotiated: HashSet::new(),
            nick_index: 0,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> RegistrationPhase {
        self.phase
    }

    /// Whether 001 has been processed.
    pub fn is_registered(&self) -> bool {
        self.phase == RegistrationPhase::Registered
    }

    /// Capabilities the server has acknowledged.
    pub fn negotiated(&self) -> &HashSet<Capability> {
        &self.negotiated
    }

    /// The nick candidate currently in play.
    pub fn current_nick(&self) -> &str {
        self.config
            .nicks
            .get(self.nick_index)
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Kick off the handshake: CAP LS goes out before any other line,
    /// holding an IRCv3 server in negotiation mode.
    pub fn start(&mut self, sender: &Sender) {
        sender.send_cap_ls();
        self.phase = RegistrationPhase::CapLsSent;
    }

    /// Whether a command is a negotiation reply this machine consumes
    /// while registration is incomplete.
    pub fn wants(&self, command: &str) -> bool {
        if self.is_registered() {
            return false;
        }
        command.eq_ignore_ascii_case("CAP")
            || command.eq_ignore_ascii_case("AUTHENTICATE")
            || matches!(
                command,
                "001" | "432" | "433" | "900" | "902" | "903" | "904" | "905" | "906" | "907"
            )
    }

    /// Consume one negotiation reply.
    ///
    /// Fatal outcomes (mandatory capability or SASL rejected, nick list
    /// exhausted) come back as errors; the caller tears the session down
    /// and reports the failure exactly once.
    pub fn feed(&mut self, line: &LineRef<'_>, sender: &Sender) -> Result<Progress, EngineError> {
        if line.command.eq_ignore_ascii_case("CAP") {
            return self.on_cap(line, sender);
        }
        if line.command.eq_ignore_ascii_case("AUTHENTICATE") {
            return self.on_authenticate(line, sender);
        }
        match line.command {
            "001" => {
                self.phase = RegistrationPhase::Registered;
                self.post_register(sender);
                Ok(Progress::Registered)
            }
            "432" | "433" => self.on_nick_rejected(line, sender),
            "900" => Ok(Progress::Pending),
            "903" => {
                debug!("SASL authentication succeeded");
                self.finish_negotiation(sender);
                Ok(Progress::Pending)
            }
            "902" | "904" | "905" | "906" | "907" => self.on_sasl_failed(line, sender),
            _ => Ok(Progress::Pending),
        }
    }

    // `CAP * <sub> [...]`: the target parameter precedes the subcommand.
    fn on_cap(&mut self, line: &LineRef<'_>, sender: &Sender) -> Result<Progress, EngineError> {
        let subcmd = line.arg(1).unwrap_or("");
        match subcmd.to_ascii_uppercase().as_str() {
            "LS" => self.on_cap_ls(line, sender),
            "ACK" => self.on_cap_ack(line.arg(2).unwrap_or(""), sender),
            "NAK" => self.on_cap_nak(line.arg(2).unwrap_or(""), sender),
            other => {
                debug!(subcommand = other, "ignoring CAP subcommand");
                Ok(Progress::Pending)
            }
        }
    }

    fn on_cap_ls(&mut self, line: &LineRef<'_>, sender: &Sender) -> Result<Progress, EngineError> {
        // `CAP * LS * :caps` marks a continued multiline advertisement.
        let (more, caps) = if line.arg(2) == Some("*") {
            (true, line.arg(3).unwrap_or(""))
        } else {
            (false, line.arg(2).unwrap_or(""))
        };
        self.advertised.extend(parse_cap_list(caps));
        if more {
            return Ok(Progress::Pending);
        }

        let to_request: Vec<Capability> = self
            .config
            .request_caps()
            .into_iter()
            .filter(|c| self.advertised.contains(c))
            .collect();

        if to_request.is_empty() {
            // Nothing to negotiate: straight to CAP END and registration.
            self.finish_negotiation(sender);
        } else {
            self.pending.extend(to_request.iter().cloned());
            sender.send_cap_req(&to_request);
            self.phase = RegistrationPhase::CapNegotiating;
        }
        Ok(Progress::Pending)
    }

    fn on_cap_ack(&mut self, caps: &str, sender: &Sender) -> Result<Progress, EngineError> {
        let mut sasl_acked = false;
        for cap in parse_cap_list(caps) {
            // Only a capability we asked for can become negotiated.
            if self.pending.remove(&cap) {
                sasl_acked |= cap == Capability::Sasl;
                self.negotiated.insert(cap);
            } else {
                warn!(capability = %cap, "CAP ACK for capability we never requested");
            }
        }

        if sasl_acked && self.config.sasl.is_some() {
            sender.send_authenticate("PLAIN");
            self.phase = RegistrationPhase::SaslPending;
        } else if self.pending.is_empty() && !self.sasl_in_flight() {
            self.finish_negotiation(sender);
        }
        Ok(Progress::Pending)
    }

    fn on_cap_nak(&mut self, caps: &str, sender: &Sender) -> Result<Progress, EngineError> {
        for cap in parse_cap_list(caps) {
            self.pending.remove(&cap);
            if self.config.is_mandatory(&cap) {
                self.phase = RegistrationPhase::Aborted;
                return Err(NegotiationFailure::CapabilityRejected(cap.to_string()).into());
            }
            debug!(capability = %cap, "capability refused, continuing without it");
        }
        if self.pending.is_empty() && !self.sasl_in_flight() {
            self.finish_negotiation(sender);
        }
        Ok(Progress::Pending)
    }

    fn on_authenticate(
        &mut self,
        line: &LineRef<'_>,
        sender: &Sender,
    ) -> Result<Progress, EngineError> {
        if self.phase != RegistrationPhase::SaslPending || line.arg(0) != Some("+") {
            return Ok(Progress::Pending);
        }
        if let Some(creds) = &self.config.sasl {
            let payload = sasl::encode_plain(&creds.account, &creds.password);
            for chunk in sasl::chunk_response(&payload) {
                sender.send_authenticate(chunk);
            }
            self.phase = RegistrationPhase::SaslAuthenticating;
        }
        Ok(Progress::Pending)
    }

    fn on_sasl_failed(
        &mut self,
        line: &LineRef<'_>,
        sender: &Sender,
    ) -> Result<Progress, EngineError> {
        let reason = line
            .params
            .last()
            .copied()
            .unwrap_or("authentication failed")
            .to_string();
        if self.config.sasl.as_ref().is_some_and(|c| c.mandatory) {
            self.phase = RegistrationPhase::Aborted;
            return Err(NegotiationFailure::SaslRejected(reason).into());
        }
        warn!(reason = %reason, "SASL failed, registering unauthenticated");
        self.finish_negotiation(sender);
        Ok(Progress::Pending)
    }

    fn on_nick_rejected(
        &mut self,
        line: &LineRef<'_>,
        sender: &Sender,
    ) -> Result<Progress, EngineError> {
        let taken = line
            .arg(1)
            .filter(|n| *n != "*")
            .unwrap_or(self.current_nick())
            .to_string();
        self.nick_index += 1;
        match self.config.nicks.get(self.nick_index) {
            Some(next) => {
                sender.send_nick(next);
                Ok(Progress::NickRetry {
                    taken,
                    next: next.clone(),
                })
            }
            None => {
                self.phase = RegistrationPhase::Aborted;
                Err(EngineError::NickExhausted {
                    attempted: self.config.nicks.len(),
                })
            }
        }
    }

    fn sasl_in_flight(&self) -> bool {
        matches!(
            self.phase,
            RegistrationPhase::SaslPending | RegistrationPhase::SaslAuthenticating
        )
    }

    /// End negotiation and emit the registration lines in RFC order:
    /// PASS (when configured), then NICK, then USER.
    fn finish_negotiation(&mut self, sender: &Sender) {
        self.phase = RegistrationPhase::CapEnding;
        sender.send_cap_end();

        self.phase = RegistrationPhase::Registering;
        if let Some(pass) = &self.config.server_password {
            sender.send_pass(pass);
        }
        sender.send_nick(self.current_nick());
        sender.send_user(&self.config.username, &self.config.realname);
    }

    /// Post-registration hook: identify with NickServ when configured.
    fn post_register(&self, sender: &Sender) {
        if let Some(pass) = &self.config.nickserv_password {
            sender.send_nickserv_identify(pass);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SaslCredentials;
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
    use tokio::sync::mpsc;

    fn config() -> ConnectionConfig {
        ConnectionConfig {
            nicks: vec!["testbot".into(), "testbot_".into()],
            username: "bot".into(),
            realname: "Test Bot".into(),
            ..ConnectionConfig::default()
        }
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<String>) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(line) = rx.try_recv() {
            lines.push(line);
        }
        lines
    }

    fn feed(
        machine: &mut Registration,
        sender: &Sender,
        raw: &str,
    ) -> Result<Progress, EngineError> {
        let line = LineRef::parse(raw).unwrap();
        machine.feed(&line, sender)
    }

    #[test]
    fn test_start_sends_cap_ls_first() {
        let (sender, mut rx) = Sender::new();
        let mut machine = Registration::new(Arc::new(config()));
        machine.start(&sender);

        assert_eq!(machine.phase(), RegistrationPhase::CapLsSent);
        assert_eq!(drain(&mut rx), vec!["CAP LS 302"]);
    }

    #[test]
    fn test_ls_ack_negotiates_multi_prefix() {
        let (sender, mut rx) = Sender::new();
        let mut machine = Registration::new(Arc::new(config()));
        machine.start(&sender);
        drain(&mut rx);

        feed(&mut machine, &sender, ":server CAP * LS :multi-prefix sasl").unwrap();
        assert_eq!(machine.phase(), RegistrationPhase::CapNegotiating);
        // Exactly one REQ, for the intersection only.
        assert_eq!(drain(&mut rx), vec!["CAP REQ :multi-prefix"]);

        feed(&mut machine, &sender, ":server CAP * ACK :multi-prefix").unwrap();
        assert!(machine.negotiated().contains(&Capability::MultiPrefix));
        assert_eq!(machine.phase(), RegistrationPhase::Registering);
        assert_eq!(
            drain(&mut rx),
            vec!["CAP END", "NICK testbot", "USER bot 0 * :Test Bot"]
        );
    }

    #[test]
    fn test_empty_ls_fast_path() {
        let (sender, mut rx) = Sender::new();
        let mut machine = Registration::new(Arc::new(config()));
        machine.start(&sender);
        drain(&mut rx);

        feed(&mut machine, &sender, ":server CAP * LS :").unwrap();
        let lines = drain(&mut rx);
        // No registration line before CAP END.
        assert_eq!(lines[0], "CAP END");
        assert_eq!(lines[1], "NICK testbot");
        assert_eq!(machine.phase(), RegistrationPhase::Registering);
    }

    #[test]
    fn test_multiline_ls_accumulates() {
        let (sender, mut rx) = Sender::new();
        let mut machine = Registration::new(Arc::new(config()));
        machine.start(&sender);
        drain(&mut rx);

        feed(&mut machine, &sender, ":server CAP * LS * :sasl").unwrap();
        assert!(drain(&mut rx).is_empty());
        feed(&mut machine, &sender, ":server CAP * LS :multi-prefix").unwrap();
        assert_eq!(drain(&mut rx), vec!["CAP REQ :multi-prefix"]);
    }

    #[test]
    fn test_pass_precedes_nick_and_user() {
        let (sender, mut rx) = Sender::new();
        let mut cfg = config();
        cfg.server_password = Some("hunter2".into());
        let mut machine = Registration::new(Arc::new(cfg));
        machine.start(&sender);
        drain(&mut rx);

        feed(&mut machine, &sender, ":server CAP * LS :").unwrap();
        assert_eq!(
            drain(&mut rx),
            vec![
                "CAP END",
                "PASS hunter2",
                "NICK testbot",
                "USER bot 0 * :Test Bot"
            ]
        );
    }

    #[test]
    fn test_sasl_exchange() {
        let (sender, mut rx) = Sender::new();
        let mut cfg = config();
        cfg.sasl = Some(SaslCredentials {
            account: "account".into(),
            password: "password".into(),
            mandatory: false,
        });
        let mut machine = Registration::new(Arc::new(cfg));
        machine.start(&sender);
        drain(&mut rx);

        feed(&mut machine, &sender, ":server CAP * LS :sasl").unwrap();
        assert_eq!(drain(&mut rx), vec!["CAP REQ :sasl"]);

        feed(&mut machine, &sender, ":server CAP * ACK :sasl").unwrap();
        assert_eq!(machine.phase(), RegistrationPhase::SaslPending);
        assert_eq!(drain(&mut rx), vec!["AUTHENTICATE PLAIN"]);

        feed(&mut machine, &sender, "AUTHENTICATE +").unwrap();
        assert_eq!(machine.phase(), RegistrationPhase::SaslAuthenticating);
        let lines = drain(&mut rx);
        assert_eq!(lines.len(), 1);
        let payload = lines[0].strip_prefix("AUTHENTICATE ").unwrap();
        assert_eq!(
            BASE64.decode(payload).unwrap(),
            b"\0account\0password".to_vec()
        );

        feed(&mut machine, &sender, ":server 903 testbot :SASL successful").unwrap();
        assert_eq!(machine.phase(), RegistrationPhase::Registering);
        assert_eq!(drain(&mut rx)[0], "CAP END");
    }

    #[test]
    fn test_sasl_failure_best_effort_continues() {
        let (sender, mut rx) = Sender::new();
        let mut cfg = config();
        cfg.sasl = Some(SaslCredentials {
            account: "account".into(),
            password: "wrong".into(),
            mandatory: false,
        });
        let mut machine = Registration::new(Arc::new(cfg));
        machine.start(&sender);
        drain(&mut rx);
        feed(&mut machine, &sender, ":server CAP * LS :sasl").unwrap();
        feed(&mut machine, &sender, ":server CAP * ACK :sasl").unwrap();
        drain(&mut rx);

        feed(&mut machine, &sender, ":server 904 testbot :SASL failed").unwrap();
        assert_eq!(machine.phase(), RegistrationPhase::Registering);
        assert_eq!(drain(&mut rx)[0], "CAP END");
    }

    #[test]
    fn test_sasl_failure_mandatory_aborts() {
        let (sender, mut rx) = Sender::new();
        let mut cfg = config();
        cfg.sasl = Some(SaslCredentials {
            account: "account".into(),
            password: "wrong".into(),
            mandatory: true,
        });
        let mut machine = Registration::new(Arc::new(cfg));
        machine.start(&sender);
        feed(&mut machine, &sender, ":server CAP * LS :sasl").unwrap();
        feed(&mut machine, &sender, ":server CAP * ACK :sasl").unwrap();
        drain(&mut rx);

        let err = feed(&mut machine, &sender, ":server 904 testbot :SASL failed").unwrap_err();
        assert!(matches!(
            err,
            EngineError::Negotiation(NegotiationFailure::SaslRejected(_))
        ));
        assert_eq!(machine.phase(), RegistrationPhase::Aborted);
    }

    #[test]
    fn test_nak_mandatory_cap_aborts() {
        let (sender, mut rx) = Sender::new();
        let mut cfg = config();
        cfg.mandatory_caps.insert(Capability::MultiPrefix);
        let mut machine = Registration::new(Arc::new(cfg));
        machine.start(&sender);
        feed(&mut machine, &sender, ":server CAP * LS :multi-prefix").unwrap();
        drain(&mut rx);

        let err = feed(&mut machine, &sender, ":server CAP * NAK :multi-prefix").unwrap_err();
        assert!(matches!(
            err,
            EngineError::Negotiation(NegotiationFailure::CapabilityRejected(_))
        ));
    }

    #[test]
    fn test_nak_best_effort_proceeds() {
        let (sender, mut rx) = Sender::new();
        let mut machine = Registration::new(Arc::new(config()));
        machine.start(&sender);
        feed(&mut machine, &sender, ":server CAP * LS :multi-prefix").unwrap();
        drain(&mut rx);

        feed(&mut machine, &sender, ":server CAP * NAK :multi-prefix").unwrap();
        assert!(!machine.negotiated().contains(&Capability::MultiPrefix));
        assert_eq!(machine.phase(), RegistrationPhase::Registering);
    }

    #[test]
    fn test_unsolicited_ack_not_negotiated() {
        let (sender, mut rx) = Sender::new();
        let mut machine = Registration::new(Arc::new(config()));
        machine.start(&sender);
        feed(&mut machine, &sender, ":server CAP * LS :multi-prefix").unwrap();
        drain(&mut rx);

        // server-time was never requested; an ACK for it must not count.
        feed(&mut machine, &sender, ":server CAP * ACK :server-time").unwrap();
        assert!(!machine.negotiated().contains(&Capability::ServerTime));
    }

    #[test]
    fn test_nick_retry_and_exhaustion() {
        let (sender, mut rx) = Sender::new();
        let mut machine = Registration::new(Arc::new(config()));
        machine.start(&sender);
        feed(&mut machine, &sender, ":server CAP * LS :").unwrap();
        drain(&mut rx);

        let progress = feed(
            &mut machine,
            &sender,
            ":server 433 * testbot :Nickname is already in use",
        )
        .unwrap();
        assert_eq!(
            progress,
            Progress::NickRetry {
                taken: "testbot".into(),
                next: "testbot_".into()
            }
        );
        assert_eq!(drain(&mut rx), vec!["NICK testbot_"]);

        let err = feed(
            &mut machine,
            &sender,
            ":server 433 * testbot_ :Nickname is already in use",
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::NickExhausted { attempted: 2 }));
        assert_eq!(machine.phase(), RegistrationPhase::Aborted);
    }

    #[test]
    fn test_welcome_completes_and_identifies() {
        let (sender, mut rx) = Sender::new();
        let mut cfg = config();
        cfg.nickserv_password = Some("nspass".into());
        let mut machine = Registration::new(Arc::new(cfg));
        machine.start(&sender);
        feed(&mut machine, &sender, ":server CAP * LS :").unwrap();
        drain(&mut rx);

        let progress = feed(&mut machine, &sender, ":server 001 testbot :Welcome").unwrap();
        assert_eq!(progress, Progress::Registered);
        assert!(machine.is_registered());
        assert_eq!(drain(&mut rx), vec!["NICKSERV IDENTIFY nspass"]);
        assert!(!machine.wants("001"));
    }

    #[test]
    fn test_wants_routing() {
        let machine = Registration::new(Arc::new(config()));
        assert!(machine.wants("CAP"));
        assert!(machine.wants("cap"));
        assert!(machine.wants("AUTHENTICATE"));
        assert!(machine.wants("433"));
        assert!(machine.wants("903"));
        assert!(!machine.wants("PRIVMSG"));
        assert!(!machine.wants("332"));
    }
}
