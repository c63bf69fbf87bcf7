//! Package listing processor: pip list/freeze, npm/yarn/pnpm ls, conda, gem, brew.

use std::sync::LazyLock;

use regex::Regex;

use super::diagnostics::is_diagnostic;
use super::Processor;

const HOOK_PATTERNS: &[&str] = &[
    r"^(pip3?\s+(list|freeze)|npm\s+(ls|list)|yarn\s+list|pnpm\s+(ls|list)|conda\s+list|gem\s+list|brew\s+list)\b",
];

static COMMAND_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(HOOK_PATTERNS[0]).expect("valid package list pattern"));

static TREE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(npm|yarn|pnpm)\s+(ls|list)\b").expect("valid tree command pattern")
});

static PIP_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(-+\s+-+|Package\s+Version)").expect("valid pip header pattern")
});

static TREE_TOP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([├└]──|[+`]-)\s+").expect("valid tree top pattern"));

static TREE_NESTED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([│ ]*[├└]|[| ]*[+`])").expect("valid tree nested pattern"));

static TREE_ISSUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(UNMET|invalid|missing|extraneous|ERR!|WARN)").expect("valid issue pattern")
});

static TREE_SUMMARY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+ total dependencies:$").expect("valid tree summary pattern"));

/// Lists at or below this many entries are left unchanged.
const MAX_UNCHANGED: usize = 20;

/// Entries shown before eliding the rest.
const SHOWN_ENTRIES: usize = 15;

/// Top-level tree entries shown before eliding the rest.
const SHOWN_TOP_LEVEL: usize = 20;

/// Processor for package manager listings.
#[derive(Debug, Default)]
pub struct PackageListProcessor;

impl PackageListProcessor {
    /// Create a new PackageListProcessor.
    pub fn new() -> Self {
        Self
    }

    /// Count + first entries of a flat one-package-per-line list.
    fn summarize(output: &str, label: &str, skip: impl Fn(&str) -> bool) -> String {
        let mut entries = Vec::new();
        let mut diagnostics = Vec::new();

        for line in output.lines() {
            let stripped = line.trim();
            if stripped.is_empty() || skip(stripped) {
                continue;
            }
            if is_diagnostic(stripped) {
                diagnostics.push(stripped);
            } else {
                entries.push(stripped);
            }
        }

        if entries.len() <= MAX_UNCHANGED {
            return output.to_string();
        }

        let mut result = vec![format!("{} {}:", entries.len(), label)];
        result.extend(
            entries
                .iter()
                .take(SHOWN_ENTRIES)
                .map(|entry| format!("  {}", entry)),
        );
        result.push(format!("  ... ({} more)", entries.len() - SHOWN_ENTRIES));
        result.extend(diagnostics.into_iter().map(str::to_string));
        result.join("\n")
    }

    /// Collapse a dependency tree: total count, issues, top-level entries.
    ///
    /// The root line stays first and lines after the tree (audit summaries)
    /// are printed last, verbatim.
    fn summarize_tree(output: &str) -> String {
        let lines: Vec<&str> = output.lines().collect();
        if lines.len() <= MAX_UNCHANGED {
            return output.to_string();
        }
        if lines
            .first()
            .is_some_and(|first| TREE_SUMMARY_RE.is_match(first.trim()))
        {
            return output.to_string();
        }

        let mut root: Option<&str> = None;
        let mut top_level: Vec<&str> = Vec::new();
        let mut issues: Vec<&str> = Vec::new();
        let mut trailer: Vec<&str> = Vec::new();
        let mut total_deps = 0;
        let mut seen_tree = false;

        for line in &lines {
            let stripped = line.trim();
            if stripped.is_empty() {
                continue;
            }

            if TREE_ISSUE_RE.is_match(stripped) || is_diagnostic(stripped) {
                issues.push(stripped);
                continue;
            }

            if TREE_TOP_RE.is_match(line) {
                top_level.push(stripped);
                total_deps += 1;
                seen_tree = true;
                continue;
            }

            if TREE_NESTED_RE.is_match(line) {
                total_deps += 1;
                seen_tree = true;
                continue;
            }

            if seen_tree {
                trailer.push(*line);
            } else if root.is_none() {
                root = Some(stripped);
            }
        }

        let mut result = vec![format!("{} total dependencies:", total_deps)];
        result.extend(root.map(str::to_string));
        if !issues.is_empty() {
            result.push(format!("Issues ({}):", issues.len()));
            result.extend(issues.iter().map(|issue| format!("  {}", issue)));
        }
        result.push(format!("Top-level ({}):", top_level.len()));
        result.extend(
            top_level
                .iter()
                .take(SHOWN_TOP_LEVEL)
                .map(|pkg| format!("  {}", pkg)),
        );
        if top_level.len() > SHOWN_TOP_LEVEL {
            result.push(format!(
                "  ... ({} more)",
                top_level.len() - SHOWN_TOP_LEVEL
            ));
        }
        result.extend(trailer.into_iter().map(str::to_string));
        result.join("\n")
    }
}

impl Processor for PackageListProcessor {
    fn name(&self) -> &str {
        "package_list"
    }

    fn priority(&self) -> u32 {
        15 // Override: listings must not be claimed by build processors
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
        if TREE_RE.is_match(command) {
            return Self::summarize_tree(output);
        }

        let tool = command.split_whitespace().next().unwrap_or_default();
        match tool {
            "pip" | "pip3" if command.contains("freeze") => {
                Self::summarize(output, "packages", |_| false)
            }
            "pip" | "pip3" => Self::summarize(output, "packages installed", |line| {
                PIP_HEADER_RE.is_match(line)
            }),
            "conda" => Self::summarize(output, "packages installed", |line| line.starts_with('#')),
            "gem" => Self::summarize(output, "gems", |_| false),
            "brew" => Self::summarize(output, "formulae", |_| false),
            _ => output.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pip_list(count: usize) -> String {
        let mut lines = vec![
            "Package    Version".to_string(),
            "---------- -------".to_string(),
        ];
        lines.extend((0..count).map(|i| format!("package{:<4} 1.{}.0", i, i)));
        lines.join("\n")
    }

    #[test]
    fn test_can_handle() {
        let p = PackageListProcessor::new();
        assert!(p.can_handle("pip list"));
        assert!(p.can_handle("pip3 freeze"));
        assert!(p.can_handle("npm ls --depth=2"));
        assert!(p.can_handle("pnpm list"));
        assert!(p.can_handle("  brew list"));
        assert!(!p.can_handle("pip install requests"));
        assert!(!p.can_handle("npm install"));
        assert!(!p.can_handle("echo pip list"));
    }

    #[test]
    fn test_pip_list_summarized() {
        let output = pip_list(40);
        let result = PackageListProcessor::new().process("pip list", &output);
        assert!(result.starts_with("40 packages installed:"));
        assert!(result.contains("  package0"));
        assert!(result.contains("  ... (25 more)"));
        assert!(!result.contains("package39"));
    }

    #[test]
    fn test_short_list_unchanged() {
        let output = pip_list(10);
        assert_eq!(
            PackageListProcessor::new().process("pip list", &output),
            output
        );
    }

    #[test]
    fn test_pip_warning_kept() {
        let mut output = pip_list(30);
        output.push_str("\nWARNING: You are using pip version 21.0; however, version 24.0 is available.");
        let result = PackageListProcessor::new().process("pip list", &output);
        assert!(result.contains("30 packages installed:"));
        assert!(result.ends_with(
            "WARNING: You are using pip version 21.0; however, version 24.0 is available."
        ));
    }

    #[test]
    fn test_npm_tree_summarized() {
        let mut lines = vec!["my-app@1.0.0 /home/dev/my-app".to_string()];
        for i in 0..10 {
            lines.push(format!("├── dep{}@1.0.{}", i, i));
            for j in 0..3 {
                lines.push(format!("│ ├── sub{}-{}@2.0.0", i, j));
            }
        }
        lines.push("└── UNMET PEER DEPENDENCY react@18".to_string());
        let output = lines.join("\n");

        let result = PackageListProcessor::new().process("npm ls", &output);
        assert!(result.starts_with("40 total dependencies:\nmy-app@1.0.0 /home/dev/my-app\n"));
        assert!(result.contains("Issues (1):"));
        assert!(result.contains("  └── UNMET PEER DEPENDENCY react@18"));
        assert!(result.contains("Top-level (10):"));
        assert!(!result.contains("sub0-0"));
    }

    fn npm_tree(deps: usize) -> String {
        let mut lines = vec!["my-app@1.0.0 /home/dev/my-app".to_string()];
        for i in 0..deps {
            let branch = if i + 1 == deps { "└──" } else { "├──" };
            lines.push(format!("{} dep{}@1.0.{}", branch, i, i));
        }
        lines.push(String::new());
        lines.push("found 0 vulnerabilities".to_string());
        lines.join("\n")
    }

    #[test]
    fn test_npm_tree_root_first_trailer_last() {
        let result = PackageListProcessor::new().process("npm ls", &npm_tree(26));
        let lines: Vec<&str> = result.lines().collect();

        assert_eq!(lines[0], "26 total dependencies:");
        assert_eq!(lines[1], "my-app@1.0.0 /home/dev/my-app");
        assert_eq!(lines[2], "Top-level (26):");
        assert_eq!(lines[3], "  ├── dep0@1.0.0");
        assert!(lines.contains(&"  ... (6 more)"));
        assert_eq!(lines.last(), Some(&"found 0 vulnerabilities"));
    }

    #[test]
    fn test_second_pass_keeps_markers() {
        let p = PackageListProcessor::new();

        let tree = npm_tree(40);
        let once = p.process("npm ls", &tree);
        let twice = p.process("npm ls", &once);
        assert_eq!(twice, once);
        assert!(twice.contains("my-app@1.0.0"));
        assert!(twice.contains("found 0 vulnerabilities"));

        let mut listing = pip_list(60);
        listing.push_str("\nWARNING: pip is out of date");
        let once = p.process("pip list", &listing);
        let twice = p.process("pip list", &once);
        for marker in ["60 packages installed:", "... (45 more)", "WARNING: pip is out of date"] {
            assert!(once.contains(marker), "first pass lost {}", marker);
            assert!(twice.contains(marker), "second pass lost {}", marker);
        }
    }

    #[test]
    fn test_empty_output_unchanged() {
        let p = PackageListProcessor::new();
        assert_eq!(p.process("pip list", ""), "");
        assert_eq!(p.process("npm ls", "  \n"), "  \n");
    }
}
