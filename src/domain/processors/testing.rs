//! Stub processors shared by unit tests.

use super::{Processor, FALLBACK_PRIORITY};

/// Configurable domain processor.
pub struct Stub {
    name: &'static str,
    priority: u32,
    patterns: Vec<&'static str>,
    accepts: fn(&str) -> bool,
    transform: fn(&str, &str) -> String,
}

impl Stub {
    /// Processor accepting every command and returning output unchanged.
    pub fn new(name: &'static str, priority: u32, pattern: &'static str) -> Self {
        Self {
            name,
            priority,
            patterns: vec![pattern],
            accepts: |_| true,
            transform: |_, output| output.to_string(),
        }
    }

    pub fn boxed(name: &'static str, priority: u32, pattern: &'static str) -> Box<dyn Processor> {
        Box::new(Self::new(name, priority, pattern))
    }

    pub fn accepting(mut self, accepts: fn(&str) -> bool) -> Self {
        self.accepts = accepts;
        self
    }

    pub fn transforming(mut self, transform: fn(&str, &str) -> String) -> Self {
        self.transform = transform;
        self
    }
}

impl Processor for Stub {
    fn name(&self) -> &str {
        self.name
    }

    fn priority(&self) -> u32 {
        self.priority
    }

    fn hook_patterns(&self) -> &[&'static str] {
        &self.patterns
    }

    fn can_handle(&self, command: &str) -> bool {
        (self.accepts)(command)
    }

    fn process(&self, command: &str, output: &str) -> String {
        (self.transform)(command, output)
    }
}

/// Fallback that returns output unchanged.
pub struct StubFallback {
    name: &'static str,
    priority: u32,
}

impl StubFallback {
    pub fn named(name: &'static str) -> Self {
        Self {
            name,
            priority: FALLBACK_PRIORITY,
        }
    }

    pub fn boxed() -> Box<dyn Processor> {
        Box::new(Self::named("generic"))
    }

    pub fn boxed_with_priority(priority: u32) -> Box<dyn Processor> {
        Box::new(Self {
            name: "generic",
            priority,
        })
    }
}

impl Processor for StubFallback {
    fn name(&self) -> &str {
        self.name
    }

    fn priority(&self) -> u32 {
        self.priority
    }

    fn hook_patterns(&self) -> &[&'static str] {
        &[]
    }

    fn can_handle(&self, _command: &str) -> bool {
        true
    }

    fn process(&self, _command: &str, output: &str) -> String {
        output.to_string()
    }

    fn is_fallback(&self) -> bool {
        true
    }
}
