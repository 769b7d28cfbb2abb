//! Connection-maintenance commands.

use tracing::debug;

use crate::casemap::Casemapping;
use crate::dispatch::{Context, Handler};
use crate::line::LineRef;

/// PING: answered immediately so the server keeps the link alive.
pub struct Ping;

impl Handler for Ping {
    fn handle(&self, ctx: &mut Context<'_>, line: &LineRef<'_>) {
        let token = line.params.last().copied().unwrap_or("");
        ctx.sender.send_pong(token);
    }
}

/// 005 RPL_ISUPPORT: only `CASEMAPPING` is consumed; a change re-folds
/// every registry key in the session.
pub struct Isupport;

impl Handler for Isupport {
    fn handle(&self, ctx: &mut Context<'_>, line: &LineRef<'_>) {
        for param in &line.params {
            let Some(value) = param.strip_prefix("CASEMAPPING=") else {
                continue;
            };
            match Casemapping::parse(value) {
                Some(mapping) => {
                    debug!(casemapping = value, "server declared casemapping");
                    ctx.session.set_casemapping(mapping);
                }
                None => debug!(casemapping = value, "unknown casemapping, keeping current"),
            }
        }
    }
}
