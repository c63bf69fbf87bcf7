//! Search output processor: grep, rg, ag.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use super::diagnostics::is_diagnostic;
use super::Processor;

const HOOK_PATTERNS: &[&str] = &[r"^(grep|egrep|fgrep|rg|ag)\b"];

static COMMAND_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(HOOK_PATTERNS[0]).expect("valid search pattern"));

static MATCH_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?):(\d+:)?(.*)$").expect("valid match line pattern"));

static SUMMARY_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d+ matches across \d+ files:$").expect("valid summary header pattern")
});

static BINARY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Binary file .* matches").expect("valid binary pattern"));

/// Outputs with fewer lines are left unchanged.
const MIN_LINES: usize = 20;

/// Matches shown per file before eliding the rest.
const MAX_PER_FILE: usize = 3;

/// Files shown before eliding the rest.
const MAX_FILES: usize = 20;

/// Plain match lists longer than this are truncated.
const MAX_PLAIN: usize = 30;

/// Plain matches kept when truncating.
const SHOWN_PLAIN: usize = 25;

/// Matches grouped by file, in first-seen order.
#[derive(Default)]
struct Grouped<'a> {
    files: Vec<(&'a str, Vec<&'a str>)>,
    index: HashMap<&'a str, usize>,
    plain: Vec<&'a str>,
}

impl<'a> Grouped<'a> {
    fn parse(output: &'a str) -> Self {
        let mut grouped = Grouped::default();

        for line in output.lines() {
            let stripped = line.trim();
            if stripped.is_empty() || BINARY_RE.is_match(stripped) {
                continue;
            }

            let path = MATCH_LINE_RE
                .captures(stripped)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str())
                .filter(|path| path.contains('/') || path.contains('.'));

            match path {
                Some(path) => grouped.push_match(path, stripped),
                None => grouped.plain.push(stripped),
            }
        }

        grouped
    }

    fn push_match(&mut self, path: &'a str, line: &'a str) {
        match self.index.get(path) {
            Some(&i) => self.files[i].1.push(line),
            None => {
                self.index.insert(path, self.files.len());
                self.files.push((path, vec![line]));
            }
        }
    }

    fn total_matches(&self) -> usize {
        self.files.iter().map(|(_, m)| m.len()).sum()
    }
}

/// Processor for recursive search output.
#[derive(Debug, Default)]
pub struct SearchProcessor;

impl SearchProcessor {
    /// Create a new SearchProcessor.
    pub fn new() -> Self {
        Self
    }

    fn summarize_plain(output: &str, plain: &[&str]) -> String {
        if plain.len() <= MAX_PLAIN {
            return output.to_string();
        }
        Self::truncate_plain(plain, "matches").join("\n")
    }

    /// First plain lines, an elision marker, then diagnostics of the rest.
    fn truncate_plain(plain: &[&str], noun: &str) -> Vec<String> {
        if plain.len() <= MAX_PLAIN {
            return plain.iter().map(|line| line.to_string()).collect();
        }
        let mut result: Vec<String> = plain
            .iter()
            .take(SHOWN_PLAIN)
            .map(|line| line.to_string())
            .collect();
        result.push(format!("... ({} more {})", plain.len() - SHOWN_PLAIN, noun));
        result.extend(
            plain
                .iter()
                .skip(SHOWN_PLAIN)
                .filter(|line| is_diagnostic(line))
                .map(|line| line.to_string()),
        );
        result
    }

    fn summarize_files(grouped: Grouped<'_>) -> String {
        let total_files = grouped.files.len();
        let mut result = vec![format!(
            "{} matches across {} files:",
            grouped.total_matches(),
            total_files
        )];

        let mut files = grouped.files;
        // Stable: files with equal counts keep first-seen order
        files.sort_by(|a, b| b.1.len().cmp(&a.1.len()));

        for (path, matches) in files.iter().take(MAX_FILES) {
            if matches.len() <= MAX_PER_FILE {
                result.extend(matches.iter().map(|m| m.to_string()));
                continue;
            }
            result.push(format!("{}: ({} matches)", path, matches.len()));
            for &m in matches.iter().take(MAX_PER_FILE) {
                let display = m
                    .strip_prefix(*path)
                    .and_then(|rest| rest.strip_prefix(':'))
                    .unwrap_or(m);
                result.push(format!("  {}", display));
            }
            result.push(format!("  ... ({} more)", matches.len() - MAX_PER_FILE));
        }

        if total_files > MAX_FILES {
            result.push(format!("... ({} more files)", total_files - MAX_FILES));
        }

        // Lines without a path (context, diagnostics) are kept as they came
        result.extend(Self::truncate_plain(&grouped.plain, "lines"));

        result.join("\n")
    }
}

impl Processor for SearchProcessor {
    fn name(&self) -> &str {
        "search"
    }

    fn priority(&self) -> u32 {
        35
    }

    fn hook_patterns(&self) -> &[&'static str] {
        HOOK_PATTERNS
    }

    fn can_handle(&self, command: &str) -> bool {
        COMMAND_RE.is_match(command.trim())
    }

    fn process(&self, _command: &str, output: &str) -> String {
        if output.trim().is_empty() || output.lines().count() < MIN_LINES {
            return output.to_string();
        }

        // Already grouped by an earlier pass
        if output
            .lines()
            .next()
            .is_some_and(|first| SUMMARY_HEADER_RE.is_match(first.trim()))
        {
            return output.to_string();
        }

        let grouped = Grouped::parse(output);
        if grouped.files.is_empty() && grouped.plain.is_empty() {
            return output.to_string();
        }
        if grouped.files.is_empty() {
            return Self::summarize_plain(output, &grouped.plain);
        }
        Self::summarize_files(grouped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_can_handle() {
        let p = SearchProcessor::new();
        assert!(p.can_handle("grep -rn TODO src/"));
        assert!(p.can_handle("rg --files"));
        assert!(p.can_handle("ag pattern"));
        assert!(!p.can_handle("git grep foo"));
        assert!(!p.can_handle("ragel file.rl"));
    }

    #[test]
    fn test_grouped_by_file() {
        let mut lines = Vec::new();
        for i in 0..10 {
            lines.push(format!("src/main.rs:{}:let x{} = todo!();", i + 1, i));
        }
        for i in 0..5 {
            lines.push(format!("src/lib.rs:{}:// TODO {}", i + 1, i));
        }
        for i in 0..6 {
            lines.push(format!("tests/t{}.rs:1:TODO", i));
        }
        lines.push("grep: missing/: No such file or directory".to_string());
        let output = lines.join("\n");

        let result = SearchProcessor::new().process("grep -rn TODO .", &output);
        let result_lines: Vec<&str> = result.lines().collect();
        assert_eq!(result_lines[0], "21 matches across 8 files:");
        assert_eq!(result_lines[1], "src/main.rs: (10 matches)");
        assert_eq!(result_lines[2], "  1:let x0 = todo!();");
        assert_eq!(result_lines[5], "  ... (7 more)");
        assert_eq!(result_lines[6], "src/lib.rs: (5 matches)");
        assert!(result.contains("tests/t5.rs:1:TODO"));
        assert!(result.ends_with("grep: missing/: No such file or directory"));
    }

    #[test]
    fn test_plain_matches_truncated() {
        let lines: Vec<String> = (0..40).map(|i| format!("match number {}", i)).collect();
        let output = lines.join("\n");
        let result = SearchProcessor::new().process("grep match", &output);
        assert!(result.starts_with("match number 0\n"));
        assert!(result.ends_with("... (15 more matches)"));
    }

    fn rg_output(files: usize, per_file: usize) -> String {
        let mut lines = Vec::new();
        for f in 0..files {
            for m in 0..per_file {
                lines.push(format!("src/mod{}.rs:{}:// TODO item {}", f, m + 1, m));
            }
        }
        lines.join("\n")
    }

    #[test]
    fn test_second_pass_keeps_summary() {
        let p = SearchProcessor::new();
        let output = rg_output(25, 5);

        let once = p.process("rg -n TODO", &output);
        assert!(once.starts_with("125 matches across 25 files:\n"));
        assert!(once.ends_with("... (5 more files)"));

        let twice = p.process("rg -n TODO", &once);
        assert_eq!(twice, once);
    }

    #[test]
    fn test_context_lines_kept_with_grouped_files() {
        let mut lines = vec!["Searching the workspace".to_string()];
        lines.extend(rg_output(4, 6).lines().map(str::to_string));
        lines.push("grep: build/: Permission denied".to_string());
        let output = lines.join("\n");

        let result = SearchProcessor::new().process("grep -rn TODO .", &output);
        assert!(result.starts_with("24 matches across 4 files:"));
        assert!(result.contains("\nSearching the workspace\n"));
        assert!(result.ends_with("grep: build/: Permission denied"));
    }

    #[test]
    fn test_short_output_unchanged() {
        let output = "src/a.rs:1:foo\nsrc/b.rs:2:foo";
        assert_eq!(SearchProcessor::new().process("rg foo", output), output);
        assert_eq!(SearchProcessor::new().process("rg foo", ""), "");
    }
}
