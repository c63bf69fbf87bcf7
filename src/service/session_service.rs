//! SessionStart hook: reports recorded savings to the agent.

use std::io::{self, Read, Write};

use anyhow::Result;
use tracing::{debug, info};

use super::tracker::{resolve_session_id, SavingsTracker, RETENTION_DAYS};
use crate::config::Config;
use crate::domain::{HookInput, SessionMessage};

/// Service for SessionStart hook events.
pub struct SessionService {
    config: Config,
}

impl SessionService {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Read the event from stdin and print `{"systemMessage": ...}`.
    pub fn run(&self) -> Result<()> {
        let mut input = String::new();
        io::stdin().read_to_string(&mut input)?;

        let message = self.process(&input)?;
        let output_json = serde_json::to_string(&message)?;
        info!("Output: {}", output_json);
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{}", output_json)?;
        stdout.flush()?;
        Ok(())
    }

    /// Prune old records and summarize the event's session.
    pub fn process(&self, raw: &str) -> Result<SessionMessage> {
        // The payload only carries the session id, so a bad one is not fatal
        let session_id = serde_json::from_str::<HookInput>(raw)
            .map_err(|e| debug!("Ignoring unparsable session input: {}", e))
            .ok()
            .and_then(|input| input.session_id);
        let tracker = SavingsTracker::new(
            &self.config.savings_path,
            resolve_session_id(session_id.as_deref()),
        );

        if self.config.track_savings {
            tracker.prune(RETENTION_DAYS)?;
        }

        Ok(SessionMessage {
            system_message: tracker.stats()?.system_message(),
        })
    }
}
