//! Connection configuration.
//!
//! Read-only to the engine; the protocol task and the handshake machine
//! consult it but never mutate it.

use std::collections::HashSet;

use crate::caps::Capability;

/// SASL account credentials.
#[derive(Clone, Debug)]
pub struct SaslCredentials {
    /// Account name (authcid), often the primary nick.
    pub account: String,
    /// Account password.
    pub password: String,
    /// Abort the connection when authentication fails, instead of
    /// registering unauthenticated.
    pub mandatory: bool,
}

/// Everything a single connection attempt needs to know up front.
#[derive(Clone, Debug)]
pub struct ConnectionConfig {
    /// Ordered nick candidates; later entries are fallbacks for 433.
    pub nicks: Vec<String>,
    /// Username (ident) sent with USER.
    pub username: String,
    /// Real name / GECOS sent with USER.
    pub realname: String,
    /// Server password, sent as PASS before NICK when present.
    pub server_password: Option<String>,
    /// Capabilities to request when the server advertises them.
    pub desired_caps: Vec<Capability>,
    /// Capabilities whose rejection aborts the connection.
    pub mandatory_caps: HashSet<Capability>,
    /// SASL credentials; presence implies requesting the `sasl` capability.
    pub sasl: Option<SaslCredentials>,
    /// NickServ password for the post-registration IDENTIFY.
    pub nickserv_password: Option<String>,
    /// Nicks whose messages are silently discarded.
    pub ignore_list: Vec<String>,
    /// Reply string for CTCP VERSION requests.
    pub version_reply: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        ConnectionConfig {
            nicks: Vec::new(),
            username: String::new(),
            realname: String::new(),
            server_password: None,
            desired_caps: vec![Capability::MultiPrefix],
            mandatory_caps: HashSet::new(),
            sasl: None,
            nickserv_password: None,
            ignore_list: Vec::new(),
            version_reply: concat!("slirc-client ", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ConnectionConfig {
    /// The capability request set: desired caps plus `sasl` when
    /// credentials are configured.
    pub fn request_caps(&self) -> Vec<Capability> {
        let mut caps = self.desired_caps.clone();
        if self.sasl.is_some() && !caps.contains(&Capability::Sasl) {
            caps.push(Capability::Sasl);
        }
        caps
    }

    /// Whether a capability may not be refused by the server.
    pub fn is_mandatory(&self, cap: &Capability) -> bool {
        if self.mandatory_caps.contains(cap) {
            return true;
        }
        matches!(cap, Capability::Sasl)
            && self.sasl.as_ref().is_some_and(|creds| creds.mandatory)
    }
}
