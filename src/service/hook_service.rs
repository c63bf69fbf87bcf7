//! PreToolUse hook: rewrites compressible Bash commands to run through `wrap`.

use std::io::{self, Read, Write};
use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;
use tracing::{debug, info};

use crate::domain::parser::{program_name, ShellParser};
use crate::domain::{HookInput, HookOutput, Registry};

/// Programs that are interactive, remote or privileged.
const EXCLUDED_PROGRAMS: &[&str] = &[
    "vi", "vim", "nvim", "nano", "emacs", "code", "ssh", "scp", "rsync", "sudo", "doas", "env",
];

static SELF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"token.saver").expect("valid self pattern"));

/// Service for processing hook events.
pub struct HookService {
    registry: Registry,
    executable: String,
}

impl HookService {
    /// Create a HookService that rewrites commands to `<executable> wrap -- ...`.
    pub fn new(registry: Registry, executable: String) -> Self {
        Self {
            registry,
            executable,
        }
    }

    /// Read one hook event from stdin and answer on stdout.
    ///
    /// Prints nothing when the command is left alone. Malformed input is
    /// treated the same way so the agent is never blocked.
    pub fn run(&self) -> Result<()> {
        let mut input = String::new();
        io::stdin().read_to_string(&mut input)?;
        debug!("Received input: {}", input);

        if let Some(output) = self.process(&input) {
            let output_json = serde_json::to_string(&output)?;
            info!("Output: {}", output_json);
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{}", output_json)?;
            stdout.flush()?;
        }

        Ok(())
    }

    /// Decide the response for a raw hook payload.
    pub fn process(&self, raw: &str) -> Option<HookOutput> {
        let input: HookInput = match serde_json::from_str(raw) {
            Ok(input) => input,
            Err(e) => {
                debug!("Ignoring unparsable hook input: {}", e);
                return None;
            }
        };

        debug!(tool = %input.tool_name, "Hook event");

        if input
            .hook_event_name
            .as_deref()
            .is_some_and(|event| event != "PreToolUse")
        {
            return None;
        }

        let command = input.bash_command()?.trim();
        if !self.should_wrap(command) {
            debug!(command, "Command left unchanged");
            return None;
        }

        let session = input
            .session_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .map(|id| format!(" --session {}", shell_quote(id)))
            .unwrap_or_default();
        let rewritten = format!(
            "{} wrap{} -- {}",
            shell_quote(&self.executable),
            session,
            shell_quote(command)
        );
        info!(command, rewritten = %rewritten, "Rewriting command");
        Some(HookOutput::rewrite(rewritten))
    }

    fn should_wrap(&self, command: &str) -> bool {
        if command.is_empty() || SELF_RE.is_match(command) {
            return false;
        }
        if program_name(command).is_some_and(|name| EXCLUDED_PROGRAMS.contains(&name.as_str())) {
            return false;
        }
        if !ShellParser::new().is_simple_command(command) {
            return false;
        }
        self.registry.is_compressible(command)
    }
}

/// Quote `value` as a single POSIX shell word.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
