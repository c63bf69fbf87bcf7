//! Processor trait definition.

/// Trait for command output processors.
///
/// Implementations must be stateless: every method takes `&self` and the
/// result depends only on the arguments.
pub trait Processor: Send + Sync {
    /// Unique, stable identifier used in routing results and logs.
    fn name(&self) -> &str;

    /// Get the priority of this processor (lower = earlier).
    fn priority(&self) -> u32;

    /// Start-anchored regex sources used by the pre-tool hook.
    ///
    /// Every command accepted by `can_handle` must match one of these.
    fn hook_patterns(&self) -> &[&'static str];

    /// Check if this processor is designed to compress the command's output.
    fn can_handle(&self, command: &str) -> bool;

    /// Compress the output. Returns the output unchanged when no safe
    /// transform applies.
    fn process(&self, command: &str, output: &str) -> String;

    /// Whether this is the terminal fallback processor.
    fn is_fallback(&self) -> bool {
        false
    }
}
