//! Network output processor: curl, wget.

use std::sync::LazyLock;

use regex::Regex;

use super::Processor;

const HOOK_PATTERNS: &[&str] = &[r"^(curl|wget)\b"];

static COMMAND_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(HOOK_PATTERNS[0]).expect("valid network pattern"));

static VERBOSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s-[a-zA-Z]*v|--verbose").expect("valid verbose pattern"));

static TLS_NOISE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\*\s*(SSL|TLS|ALPN|CAfile|CApath|Certificate|issuer|subject|subjectAlt|Server certificate|Connected|Trying|Connection(ed| #\d)| *expire| *start|TCP_NODELAY|Mark bundle|upload completely|Using Stream|old SSL|Closing|successfully set certificate)\b",
    )
    .expect("valid TLS noise pattern")
});

static METHOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(GET|POST|PUT|DELETE|PATCH|HEAD|OPTIONS)\s+").expect("valid method pattern")
});

static PROGRESS_HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%\s+Total\s+%\s+Received").expect("valid progress header"));

static PROGRESS_COLUMNS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Dload\s+Upload").expect("valid progress columns"));

static PROGRESS_ROW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+\s+\d+").expect("valid progress row"));

static CLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"--:--:--|(\d+:){2}\d+").expect("valid clock pattern"));

static INFO_ERROR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(error|fail|could not|refused)").expect("valid curl error pattern")
});

static WGET_PROGRESS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+%\s*\[=*>?\s*\]").expect("valid wget bar pattern"));

static WGET_DOTS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+K\s+.*\.\.\.").expect("valid wget dots pattern"));

static WGET_KEEP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)saved|error|failed|refused|not found").expect("valid wget keep pattern")
});

static STATUS_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{3}\s").expect("valid status code pattern"));

/// Response headers worth keeping in verbose curl output.
const IMPORTANT_HEADERS: &[&str] = &[
    "content-type",
    "location",
    "www-authenticate",
    "set-cookie",
    "x-ratelimit",
    "retry-after",
    "authorization",
    "content-length",
    "transfer-encoding",
    "access-control-allow-origin",
    "x-request-id",
];

/// Processor for HTTP client output.
#[derive(Debug, Default)]
pub struct NetworkProcessor;

impl NetworkProcessor {
    /// Create a new NetworkProcessor.
    pub fn new() -> Self {
        Self
    }

    fn is_progress_row(stripped: &str) -> bool {
        PROGRESS_ROW_RE.is_match(stripped) && CLOCK_RE.is_match(stripped)
    }

    /// Verbose curl: drop TLS/connection chatter and boilerplate headers.
    fn process_verbose_curl(output: &str) -> String {
        let mut result = Vec::new();

        for line in output.lines() {
            let stripped = line.trim();

            if TLS_NOISE_RE.is_match(stripped) {
                continue;
            }

            // Request headers: keep only the method line
            if let Some(header) = stripped.strip_prefix("> ") {
                if METHOD_RE.is_match(header.trim()) {
                    result.push(stripped);
                }
                continue;
            }

            // Response headers: status line and important headers
            if let Some(header) = stripped.strip_prefix("< ") {
                let header = header.trim();
                if header.starts_with("HTTP/") {
                    result.push(stripped);
                    continue;
                }
                let key = header
                    .split_once(':')
                    .map(|(key, _)| key.to_ascii_lowercase())
                    .unwrap_or_default();
                if !key.is_empty() && IMPORTANT_HEADERS.iter().any(|h| key.starts_with(h)) {
                    result.push(stripped);
                }
                continue;
            }

            if PROGRESS_HEADER_RE.is_match(stripped)
                || PROGRESS_COLUMNS_RE.is_match(stripped)
                || Self::is_progress_row(stripped)
            {
                continue;
            }

            // Info lines: keep only failures
            if stripped.starts_with("* ") && !INFO_ERROR_RE.is_match(stripped) {
                continue;
            }

            result.push(line);
        }

        result.join("\n")
    }

    /// Non-verbose curl: strip the progress meter only.
    fn strip_curl_progress(output: &str) -> String {
        let mut result = Vec::new();
        let mut in_progress_table = false;

        for line in output.lines() {
            let stripped = line.trim();
            if PROGRESS_HEADER_RE.is_match(stripped) {
                in_progress_table = true;
                continue;
            }
            if in_progress_table && PROGRESS_COLUMNS_RE.is_match(stripped) {
                continue;
            }
            if Self::is_progress_row(stripped) {
                in_progress_table = false;
                continue;
            }
            in_progress_table = false;
            result.push(line);
        }

        result.join("\n")
    }

    fn process_wget(output: &str) -> String {
        let mut result = Vec::new();

        for line in output.lines() {
            let stripped = line.trim();

            if stripped.starts_with("Resolving ") || stripped.starts_with("Connecting to ") {
                continue;
            }
            if WGET_PROGRESS_RE.is_match(stripped) || WGET_DOTS_RE.is_match(stripped) {
                continue;
            }

            let keep_trimmed = stripped.starts_with("Length:")
                || stripped.starts_with("Saving to:")
                || stripped.starts_with("HTTP request sent")
                || stripped.starts_with("Location:")
                || WGET_KEEP_RE.is_match(stripped)
                || STATUS_CODE_RE.is_match(stripped);
            if keep_trimmed {
                result.push(stripped);
            } else {
                result.push(line);
            }
        }

        result.join("\n")
    }

    /// Keep the original when the transform removed everything.
    fn non_empty(original: &str, processed: String) -> String {
        if processed.trim().is_empty() {
            original.to_string()
        } else {
            processed
        }
    }
}

impl Processor for NetworkProcessor {
    fn name(&self) -> &str {
        "network"
    }

    fn priority(&self) -> u32 {
        30
    }

    fn hook_patterns(&self) -> &[&'static str] {
        HOOK_PATTERNS
    }

    fn can_handle(&self, command: &str) -> bool {
        COMMAND_RE.is_match(command.trim())
    }

    fn process(&self, command: &str, output: &str) -> String {
        if output.trim().is_empty() {
            return output.to_string();
        }

        let command = command.trim();
        let processed = if command.starts_with("curl") {
            if VERBOSE_RE.is_match(command) {
                Self::process_verbose_curl(output)
            } else {
                Self::strip_curl_progress(output)
            }
        } else if command.starts_with("wget") {
            Self::process_wget(output)
        } else {
            return output.to_string();
        };

        Self::non_empty(output, processed)
    }
}
