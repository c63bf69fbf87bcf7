//! Savings tracker: one JSON line per compression applied by `wrap`.

use std::collections::{HashMap, HashSet};
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::debug;

use crate::domain::RoutingResult;

/// Environment variable carrying the session id when `--session` is absent.
pub const SESSION_ENV: &str = "TOKEN_SAVER_SESSION";

/// Records older than this are dropped by [`SavingsTracker::prune`].
pub const RETENTION_DAYS: i64 = 90;

const MAX_COMMAND_CHARS: usize = 500;

const SECONDS_PER_DAY: i64 = 86_400;

/// Top processors listed in the stats report.
const TOP_PROCESSORS: usize = 5;

/// One compression event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavingRecord {
    /// Unix timestamp in seconds
    pub timestamp: i64,
    pub session_id: String,
    pub command: String,
    pub processor: String,
    pub original_size: usize,
    pub compressed_size: usize,
}

/// Aggregated sizes over a set of records.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Totals {
    pub commands: usize,
    pub original: usize,
    pub compressed: usize,
}

impl Totals {
    fn add(&mut self, record: &SavingRecord) {
        self.commands += 1;
        self.original += record.original_size;
        self.compressed += record.compressed_size;
    }

    pub fn saved(&self) -> usize {
        self.original.saturating_sub(self.compressed)
    }

    /// Saved bytes as a percentage, one decimal.
    pub fn ratio(&self) -> f64 {
        if self.original == 0 {
            return 0.0;
        }
        (self.saved() as f64 / self.original as f64 * 1000.0).round() / 10.0
    }

    fn to_json(self) -> serde_json::Value {
        serde_json::json!({
            "commands": self.commands,
            "original": self.original,
            "compressed": self.compressed,
            "saved": self.saved(),
            "ratio": self.ratio(),
        })
    }
}

/// Savings attributed to one processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessorTotals {
    pub processor: String,
    pub count: usize,
    pub saved: usize,
}

/// Session and lifetime summary.
#[derive(Debug, Clone, PartialEq)]
pub struct Stats {
    pub session: Totals,
    pub lifetime: Totals,
    pub sessions: usize,
    pub top_processors: Vec<ProcessorTotals>,
}

impl Stats {
    fn from_records(records: &[SavingRecord], session_id: &str) -> Self {
        let mut session = Totals::default();
        let mut lifetime = Totals::default();
        let mut sessions = HashSet::new();
        let mut by_processor: HashMap<&str, ProcessorTotals> = HashMap::new();

        for record in records {
            lifetime.add(record);
            sessions.insert(record.session_id.as_str());
            if record.session_id == session_id {
                session.add(record);
            }
            let entry = by_processor
                .entry(record.processor.as_str())
                .or_insert_with(|| ProcessorTotals {
                    processor: record.processor.clone(),
                    count: 0,
                    saved: 0,
                });
            entry.count += 1;
            entry.saved += record.original_size.saturating_sub(record.compressed_size);
        }

        let mut top_processors: Vec<ProcessorTotals> = by_processor.into_values().collect();
        top_processors.sort_by(|a, b| {
            b.saved
                .cmp(&a.saved)
                .then_with(|| a.processor.cmp(&b.processor))
        });
        top_processors.truncate(TOP_PROCESSORS);

        Self {
            session,
            lifetime,
            sessions: sessions.len(),
            top_processors,
        }
    }

    /// One-line summary for the SessionStart hook.
    pub fn system_message(&self) -> String {
        let mut parts = vec!["[token-saver]".to_string()];
        if self.lifetime.commands > 0 {
            parts.push(format!(
                "Lifetime: {} cmds, {} saved ({}%)",
                self.lifetime.commands,
                format_bytes(self.lifetime.saved()),
                self.lifetime.ratio()
            ));
        }
        if self.session.commands > 0 {
            parts.push(format!(
                "Session: {} cmds, {} saved ({}%)",
                self.session.commands,
                format_bytes(self.session.saved()),
                self.session.ratio()
            ));
        }
        if self.lifetime.commands == 0 {
            parts.push("Ready. No compressions recorded yet.".to_string());
        }
        parts.join(" | ")
    }

    pub fn to_json(&self) -> serde_json::Value {
        let mut lifetime = self.lifetime.to_json();
        lifetime["sessions"] = self.sessions.into();
        serde_json::json!({
            "session": self.session.to_json(),
            "lifetime": lifetime,
            "top_processors": self.top_processors,
        })
    }

    /// Multi-line report for `token-saver stats`.
    pub fn render(&self) -> String {
        let mut out = vec![
            "Token-Saver Statistics".to_string(),
            "=".repeat(40),
            String::new(),
            "Session".to_string(),
            "-".repeat(40),
        ];
        if self.session.commands == 0 {
            out.push("  No compressions in this session.".to_string());
        } else {
            out.extend(Self::render_totals(&self.session));
        }

        out.extend([String::new(), "Lifetime".to_string(), "-".repeat(40)]);
        if self.lifetime.commands == 0 {
            out.push("  No compressions recorded yet.".to_string());
        } else {
            out.push(format!("  Sessions:             {}", self.sessions));
            out.extend(Self::render_totals(&self.lifetime));
        }

        if !self.top_processors.is_empty() {
            out.extend([String::new(), "Top Processors".to_string(), "-".repeat(40)]);
            for entry in &self.top_processors {
                out.push(format!(
                    "  {:<20} {:>4} cmds, {} saved",
                    entry.processor,
                    entry.count,
                    format_bytes(entry.saved)
                ));
            }
        }
        out.join("\n")
    }

    fn render_totals(totals: &Totals) -> Vec<String> {
        vec![
            format!("  Commands compressed:  {}", totals.commands),
            format!("  Original size:        {}", format_bytes(totals.original)),
            format!("  Compressed size:      {}", format_bytes(totals.compressed)),
            format!(
                "  Saved:                {} ({}%)",
                format_bytes(totals.saved()),
                totals.ratio()
            ),
        ]
    }
}

/// Append-only savings log for one session.
pub struct SavingsTracker {
    path: PathBuf,
    session_id: String,
}

impl SavingsTracker {
    pub fn new(path: impl Into<PathBuf>, session_id: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            session_id: session_id.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record a compression of `original_size` bytes.
    pub fn record(&self, command: &str, original_size: usize, result: &RoutingResult) -> Result<()> {
        self.append(&SavingRecord {
            timestamp: OffsetDateTime::now_utc().unix_timestamp(),
            session_id: self.session_id.clone(),
            command: command.chars().take(MAX_COMMAND_CHARS).collect(),
            processor: result.handled_by.clone(),
            original_size,
            compressed_size: result.compressed_output.len(),
        })
    }

    pub fn append(&self, record: &SavingRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create savings directory: {}", parent.display())
            })?;
        }

        let line = serde_json::to_string(record)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open savings file: {}", self.path.display()))?;
        writeln!(file, "{}", line)?;
        Ok(())
    }

    /// All readable records; a missing file has none and corrupt lines are skipped.
    pub fn records(&self) -> Result<Vec<SavingRecord>> {
        let file = match fs::File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to open savings file: {}", self.path.display())
                })
            }
        };

        let mut records = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(record) => records.push(record),
                Err(e) => debug!("Skipping corrupt savings record: {}", e),
            }
        }
        Ok(records)
    }

    /// Drop records older than `retention_days`. Returns how many were removed.
    pub fn prune(&self, retention_days: i64) -> Result<usize> {
        let records = self.records()?;
        let cutoff = OffsetDateTime::now_utc().unix_timestamp() - retention_days * SECONDS_PER_DAY;
        let (kept, removed): (Vec<_>, Vec<_>) = records
            .into_iter()
            .partition(|record| record.timestamp >= cutoff);
        if removed.is_empty() {
            return Ok(0);
        }

        let mut content = String::new();
        for record in &kept {
            content.push_str(&serde_json::to_string(record)?);
            content.push('\n');
        }
        fs::write(&self.path, content)
            .with_context(|| format!("Failed to rewrite savings file: {}", self.path.display()))?;
        debug!(removed = removed.len(), "Pruned savings records");
        Ok(removed.len())
    }

    pub fn stats(&self) -> Result<Stats> {
        Ok(Stats::from_records(&self.records()?, &self.session_id))
    }
}

/// Session id from `--session`, then the environment, then a fresh one.
pub fn resolve_session_id(explicit: Option<&str>) -> String {
    explicit
        .map(str::to_string)
        .or_else(|| std::env::var(SESSION_ENV).ok())
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string()[..12].to_string())
}

/// Human-readable byte size.
pub fn format_bytes(n: usize) -> String {
    if n < 1024 {
        format!("{} B", n)
    } else if n < 1024 * 1024 {
        format!("{:.1} KB", n as f64 / 1024.0)
    } else {
        format!("{:.1} MB", n as f64 / (1024.0 * 1024.0))
    }
}
