//! Generic fallback processor.
//!
//! Applies only size-based heuristics: ANSI stripping, progress-bar removal,
//! blank/repeated/similar line collapsing and, for long output, a head + tail
//! excerpt that keeps every elided error line.

use std::sync::LazyLock;

use regex::Regex;

use super::diagnostics::has_error_indicator;
use super::{Processor, FALLBACK_PRIORITY};

static ANSI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b\[[0-9;?]*[a-zA-Z]|\x1b\][^\x07]*\x07").expect("valid ANSI pattern")
});

static NUMERIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(\.\d+)?").expect("valid numeric pattern"));

static PROGRESS_BAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[━█▓░▒■□●○#=>\-]{5,}").expect("valid progress pattern"));

static PERCENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(\.\d+)?%").expect("valid percent pattern"));

static RATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d+(\.\d+)?\s*(KB|MB|GB|B|kB|MiB|GiB|k|M|G)/s").expect("valid rate pattern")
});

static ETA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(ETA|eta)\s+\d+").expect("valid eta pattern"));

static CLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"--:--:--|(\d+:){2}\d+").expect("valid clock pattern"));

const SPINNER_FRAMES: &[&str] = &[
    "⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷",
];

/// Minimum run length before similar lines are collapsed.
const MIN_SIMILAR_RUN: usize = 5;

/// Fallback processor that applies universal compression heuristics.
#[derive(Debug, Clone)]
pub struct GenericProcessor {
    threshold: usize,
    keep_head: usize,
    keep_tail: usize,
}

impl GenericProcessor {
    /// Create a new GenericProcessor.
    ///
    /// Output with at most `threshold` lines is returned unchanged.
    pub fn new(threshold: usize, keep_head: usize, keep_tail: usize) -> Self {
        Self {
            threshold,
            keep_head,
            keep_tail,
        }
    }

    /// Light pass for specialized output: ANSI escapes, blank runs and
    /// trailing whitespace only.
    pub fn clean(text: &str) -> String {
        let lines: Vec<String> = text.lines().map(Self::strip_ansi).collect();
        Self::collapse_blank_lines(lines)
            .iter()
            .map(|line| line.trim_end())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn strip_ansi(line: &str) -> String {
        ANSI_RE.replace_all(line, "").into_owned()
    }

    /// Remove lines that are purely progress bars or spinners.
    fn strip_progress_bars(lines: Vec<String>) -> Vec<String> {
        lines
            .into_iter()
            .filter(|line| {
                let stripped = line.trim();
                if stripped.is_empty() || has_error_indicator(stripped) {
                    return true;
                }
                if SPINNER_FRAMES.contains(&stripped) {
                    return false;
                }
                match PROGRESS_BAR_RE.find(stripped) {
                    Some(bar) => bar.as_str().chars().count() * 2 <= stripped.chars().count(),
                    None => true,
                }
            })
            .collect()
    }

    /// Merge consecutive blank lines into one.
    fn collapse_blank_lines(lines: Vec<String>) -> Vec<String> {
        let mut result = Vec::with_capacity(lines.len());
        let mut prev_blank = false;
        for line in lines {
            let is_blank = line.trim().is_empty();
            if is_blank && prev_blank {
                continue;
            }
            prev_blank = is_blank;
            result.push(line);
        }
        result
    }

    /// Collapse consecutive identical lines into `line (xN)`.
    fn collapse_repeated_lines(lines: Vec<String>) -> Vec<String> {
        let mut result: Vec<String> = Vec::with_capacity(lines.len());
        let mut iter = lines.into_iter();
        let Some(mut current) = iter.next() else {
            return result;
        };
        let mut count = 1;

        for line in iter {
            if line == current && !current.trim().is_empty() {
                count += 1;
            } else {
                result.push(Self::with_count(current, count));
                current = line;
                count = 1;
            }
        }
        result.push(Self::with_count(current, count));
        result
    }

    fn with_count(line: String, count: usize) -> String {
        if count > 1 {
            format!("{} (x{})", line, count)
        } else {
            line
        }
    }

    /// Collapse runs of numeric-heavy lines that differ only in numbers.
    fn collapse_similar_lines(lines: Vec<String>) -> Vec<String> {
        let mut result = Vec::with_capacity(lines.len());
        let mut group: Vec<String> = Vec::new();
        let mut group_key = String::new();

        for line in lines {
            let key = Self::normalize_numbers(&line);
            let groupable = Self::is_groupable(&line);
            if groupable && !group.is_empty() && key == group_key {
                group.push(line);
                continue;
            }
            Self::flush_similar(&mut result, std::mem::take(&mut group));
            if groupable {
                group_key = key;
                group.push(line);
            } else {
                result.push(line);
            }
        }
        Self::flush_similar(&mut result, group);
        result
    }

    fn is_groupable(line: &str) -> bool {
        let stripped = line.trim();
        stripped.chars().count() > 10
            && !has_error_indicator(stripped)
            && Self::is_numeric_heavy(stripped)
    }

    fn normalize_numbers(line: &str) -> String {
        NUMERIC_RE.replace_all(line.trim(), "N").into_owned()
    }

    /// Check if a line is progress/status output where numbers are noise.
    fn is_numeric_heavy(stripped: &str) -> bool {
        let total = stripped.chars().count();
        if total == 0 {
            return false;
        }
        let digits = stripped.chars().filter(|c| c.is_ascii_digit()).count();
        if digits * 4 >= total {
            return true;
        }
        if PERCENT_RE.is_match(stripped) || RATE_RE.is_match(stripped) || ETA_RE.is_match(stripped)
        {
            return true;
        }
        if digits >= 5 && CLOCK_RE.is_match(stripped) {
            return true;
        }
        let non_ws = stripped.chars().filter(|c| !c.is_whitespace()).count();
        non_ws > 0 && digits * 5 >= non_ws * 2
    }

    fn flush_similar(result: &mut Vec<String>, group: Vec<String>) {
        let count = group.len();
        if count >= MIN_SIMILAR_RUN {
            let mut group = group;
            let last = group.pop();
            let first = group.swap_remove(0);
            result.push(first);
            result.push(format!("  ... ({} similar lines)", count - 2));
            result.extend(last);
        } else {
            result.extend(group);
        }
    }

    /// Keep head and tail, plus every error line of the elided middle.
    fn truncate_middle(&self, lines: Vec<String>) -> Vec<String> {
        let total = lines.len();
        if self.keep_head + self.keep_tail >= total {
            return lines;
        }

        let tail_start = total - self.keep_tail;
        let mut result = Vec::with_capacity(self.keep_head + self.keep_tail + 1);
        let mut kept_errors = Vec::new();
        let mut removed = 0;

        for (index, line) in lines.into_iter().enumerate() {
            if index < self.keep_head || index >= tail_start {
                result.push(line);
            } else if has_error_indicator(&line) {
                kept_errors.push(line);
            } else {
                removed += 1;
            }
        }

        let mut middle = Vec::with_capacity(kept_errors.len() + 1);
        if removed > 0 {
            middle.push(format!("... ({} lines truncated, {} total) ...", removed, total));
        }
        middle.extend(kept_errors);
        result.splice(self.keep_head..self.keep_head, middle);
        result
    }
}

impl Processor for GenericProcessor {
    fn name(&self) -> &str {
        "generic"
    }

    fn priority(&self) -> u32 {
        FALLBACK_PRIORITY
    }

    fn hook_patterns(&self) -> &[&'static str] {
        &[]
    }

    fn can_handle(&self, _command: &str) -> bool {
        true
    }

    fn process(&self, _command: &str, output: &str) -> String {
        if output.trim().is_empty() || output.lines().count() <= self.threshold {
            return output.to_string();
        }

        let lines: Vec<String> = output.lines().map(Self::strip_ansi).collect();
        let lines = Self::strip_progress_bars(lines);
        let lines = Self::collapse_blank_lines(lines);
        let lines = Self::collapse_repeated_lines(lines);
        let lines = Self::collapse_similar_lines(lines);
        let mut lines: Vec<String> = lines
            .into_iter()
            .map(|line| line.trim_end().to_string())
            .collect();

        if lines.len() > self.threshold {
            lines = self.truncate_middle(lines);
        }

        lines.join("\n")
    }

    fn is_fallback(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn processor() -> GenericProcessor {
        GenericProcessor::new(100, 40, 40)
    }

    fn numbered(count: usize) -> Vec<String> {
        (1..=count)
            .map(|i| format!("processing item {} of the batch", i))
            .collect()
    }

    #[test]
    fn test_short_output_unchanged() {
        let output = "line one\n\x1b[31mred\x1b[0m\n\n\n";
        assert_eq!(processor().process("ls", output), output);
    }

    #[test]
    fn test_blank_output_unchanged() {
        let p = processor();
        assert_eq!(p.process("ls", ""), "");
        assert_eq!(p.process("ls", "   \n\t\n"), "   \n\t\n");
        let blank = "\n".repeat(500);
        assert_eq!(p.process("ls", &blank), blank);
    }

    #[test]
    fn test_keeps_error_and_summary_lines() {
        let mut lines = numbered(498);
        lines.insert(250, "ERROR: disk full".to_string());
        lines.push("Done: 497 items".to_string());
        assert_eq!(lines.len(), 500);
        let output = lines.join("\n");

        let result = processor().process("ls -la", &output);
        assert!(result.lines().any(|l| l == "ERROR: disk full"));
        assert!(result.lines().any(|l| l == "Done: 497 items"));
        assert!(result.contains("lines truncated, 500 total"));
        assert!(result.len() < output.len());
    }

    #[test]
    fn test_reprocessing_keeps_markers() {
        let mut lines = numbered(300);
        lines.insert(100, "fatal: could not read object".to_string());
        lines.insert(200, "Traceback (most recent call last):".to_string());
        lines.push("42 passed, 1 failed".to_string());
        let output = lines.join("\n");

        let p = GenericProcessor::new(50, 20, 20);
        let once = p.process("make", &output);
        let twice = p.process("make", &once);
        for marker in [
            "fatal: could not read object",
            "Traceback (most recent call last):",
            "42 passed, 1 failed",
        ] {
            assert!(once.contains(marker), "first pass lost {}", marker);
            assert!(twice.contains(marker), "second pass lost {}", marker);
        }
    }

    #[test]
    fn test_strips_ansi_and_progress_bars() {
        let mut lines = vec!["\x1b[32mStarting\x1b[0m".to_string()];
        lines.push("██████████████████████".to_string());
        lines.push("⠋".to_string());
        lines.extend((0..150).map(|i| format!("entry-{}", i)));
        let result = processor().process("build", &lines.join("\n"));
        assert!(result.starts_with("Starting"));
        assert!(!result.contains('█'));
        assert!(!result.contains('⠋'));
    }

    #[test]
    fn test_collapses_repeated_lines() {
        let mut lines = vec!["warming up".to_string(); 150];
        lines.push("ready".to_string());
        let result = processor().process("server", &lines.join("\n"));
        assert_eq!(result, "warming up (x150)\nready");
    }

    #[test]
    fn test_collapses_similar_progress_lines() {
        let mut lines: Vec<String> = (0..=120)
            .map(|i| format!("Downloading: {}% complete", i))
            .collect();
        lines.push("Download finished".to_string());
        let result = processor().process("fetch", &lines.join("\n"));
        assert_eq!(
            result,
            "Downloading: 0% complete\n  ... (119 similar lines)\nDownloading: 120% complete\nDownload finished"
        );
    }

    #[test]
    fn test_error_lines_not_grouped_as_similar() {
        let mut lines: Vec<String> = (0..120)
            .map(|i| format!("error at 10{}% offset", i))
            .collect();
        lines.push("end".to_string());
        let output = lines.join("\n");
        let result = processor().process("scan", &output);
        for line in &lines {
            assert!(result.contains(line.as_str()));
        }
    }

    #[test]
    fn test_clean() {
        let text = "\x1b[1mPlan:\x1b[0m 1 to add   \n\n\n\nApply complete!\t";
        assert_eq!(
            GenericProcessor::clean(text),
            "Plan: 1 to add\n\nApply complete!"
        );
        assert_eq!(GenericProcessor::clean("plain"), "plain");
    }

    #[test]
    fn test_non_ascii_output() {
        let lines: Vec<String> = (0..200)
            .map(|i| format!("日本語の出力行です 番号 {}", i))
            .collect();
        let output = lines.join("\n");
        let result = processor().process("cat", &output);
        assert!(result.starts_with("日本語の出力行です 番号 0\n"));
        assert!(result.ends_with("日本語の出力行です 番号 199"));
        assert!(result.contains("(120 lines truncated, 200 total)"));
    }

    #[test]
    fn test_degenerate_sizes() {
        let p = GenericProcessor::new(1, 5, 5);
        let output = "a\nb\nc";
        assert_eq!(p.process("x", output), output);
        assert_eq!(p.process("x", "z"), "z");
    }
}
