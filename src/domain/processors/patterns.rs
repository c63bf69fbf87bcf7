//! Hook pattern collection.
//!
//! The pre-tool hook uses the combined pattern set as a cheap pre-filter:
//! commands matching no pattern are never rewritten to go through the engine.

use regex::RegexSet;

use super::Processor;
use crate::domain::SaverError;

/// Union of every non-fallback processor's hook patterns, in registry order.
///
/// Only textually identical patterns are collapsed.
pub fn collect_patterns(processors: &[Box<dyn Processor>]) -> Vec<String> {
    let mut patterns: Vec<String> = Vec::new();
    for processor in processors.iter().filter(|p| !p.is_fallback()) {
        for pattern in processor.hook_patterns() {
            if !patterns.iter().any(|p| p == pattern) {
                patterns.push((*pattern).to_string());
            }
        }
    }
    patterns
}

/// Compiled, read-only set of hook patterns.
#[derive(Debug, Clone)]
pub struct PatternSet {
    patterns: Vec<String>,
    compiled: RegexSet,
}

impl PatternSet {
    /// Collect and compile the patterns of an ordered processor sequence.
    ///
    /// # Errors
    ///
    /// Returns error if any pattern is not a valid regex.
    pub fn collect(processors: &[Box<dyn Processor>]) -> Result<Self, SaverError> {
        let patterns = collect_patterns(processors);
        let compiled = RegexSet::new(&patterns)?;
        Ok(Self { patterns, compiled })
    }

    /// Pattern sources in registry order.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Check if any pattern matches the (trimmed) command.
    pub fn is_compressible(&self, command: &str) -> bool {
        let command = command.trim();
        if command.is_empty() {
            return false;
        }
        self.compiled.is_match(command)
    }
}
