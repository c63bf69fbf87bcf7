//! Detection of lines that must survive compression.

use std::sync::LazyLock;

use regex::Regex;

static ERROR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(errors?|fatal|panic(ked)?|fail(ed|ure)?|exception|traceback|denied|no such file)\b",
    )
    .expect("valid error pattern")
});

static WARNING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bwarn(ing)?s?\b").expect("valid warning pattern"));

/// Check if a line carries an error indicator.
pub fn has_error_indicator(line: &str) -> bool {
    ERROR_RE.is_match(line)
}

/// Check if a line is an error or a warning.
pub fn is_diagnostic(line: &str) -> bool {
    has_error_indicator(line) || WARNING_RE.is_match(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_indicators() {
        assert!(has_error_indicator("ERROR: disk full"));
        assert!(has_error_indicator("error[E0382]: borrow of moved value"));
        assert!(has_error_indicator("thread 'main' panicked at src/main.rs:2:5"));
        assert!(has_error_indicator("3 tests FAILED"));
        assert!(has_error_indicator("Traceback (most recent call last):"));
        assert!(has_error_indicator("grep: missing.txt: No such file or directory"));
        assert!(!has_error_indicator("terror of the deep"));
        assert!(!has_error_indicator("Done: 497 items"));
    }

    #[test]
    fn test_warnings_are_diagnostics() {
        assert!(is_diagnostic("WARNING: pip is out of date"));
        assert!(is_diagnostic("npm WARN deprecated left-pad"));
        assert!(!is_diagnostic("forewarned"));
    }
}
