//! Compression engine: routes captured output to the first accepting processor.

use std::cell::Cell;
use std::panic::{self, catch_unwind, AssertUnwindSafe};
use std::sync::Once;

use tracing::{debug, warn};

use super::processors::{GenericProcessor, Processor, Registry};
use super::types::RoutingResult;

thread_local! {
    static IN_PROCESSOR: Cell<bool> = const { Cell::new(false) };
}

/// Route panics raised inside processor calls to the log instead of stderr.
///
/// Panics anywhere else still reach the previous hook.
pub fn install_panic_hook() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if in_processor() {
                warn!(location = ?info.location(), "Processor panicked: {}", info);
            } else {
                previous(info);
            }
        }));
    });
}

/// Whether the current thread is inside a processor call.
pub fn in_processor() -> bool {
    IN_PROCESSOR.with(Cell::get)
}

/// Run `f` with the processor flag set, catching its panic.
fn guarded<T>(f: impl FnOnce() -> T) -> std::thread::Result<T> {
    IN_PROCESSOR.with(|flag| flag.set(true));
    let result = catch_unwind(AssertUnwindSafe(f));
    IN_PROCESSOR.with(|flag| flag.set(false));
    result
}

/// Routes `(command, output)` pairs through a registry snapshot.
pub struct Engine {
    registry: Registry,
}

impl Engine {
    /// Create an engine over `registry`.
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    /// The registry routing reads from; refreshing it affects later calls.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Compress `output` with the highest-priority processor accepting `command`.
    ///
    /// A processor that panics in `can_handle` or `process` is skipped and
    /// routing continues with the next candidate. The result is `"none"` only
    /// when every candidate faulted. Blank output is returned as is.
    pub fn compress(&self, command: &str, output: &str) -> RoutingResult {
        let blank = output.trim().is_empty();

        // Held for the whole call so a concurrent refresh cannot mix sets
        let snapshot = self.registry.snapshot();

        for processor in snapshot.processors() {
            if Self::accepts(processor.as_ref(), command) != Some(true) {
                continue;
            }

            if blank {
                return RoutingResult::handled(processor.name(), output, output.to_string());
            }

            let Some(mut compressed) = Self::run(processor.as_ref(), command, output) else {
                continue;
            };
            if !processor.is_fallback() {
                compressed = GenericProcessor::clean(&compressed);
            }

            if compressed.trim().is_empty() {
                debug!(
                    processor = processor.name(),
                    "Processor emptied non-blank output, keeping original"
                );
                return RoutingResult::handled(processor.name(), output, output.to_string());
            }

            let result = RoutingResult::handled(processor.name(), output, compressed);
            debug!(
                processor = processor.name(),
                command,
                original_len = output.len(),
                compressed_len = result.compressed_output.len(),
                "Output routed"
            );
            return result;
        }

        warn!(command, "No processor produced a result");
        RoutingResult::unhandled(output)
    }

    /// `None` when the predicate panicked.
    fn accepts(processor: &dyn Processor, command: &str) -> Option<bool> {
        match guarded(|| processor.can_handle(command)) {
            Ok(accepted) => Some(accepted),
            Err(panic) => {
                warn!(
                    processor = processor.name(),
                    reason = panic_message(panic.as_ref()),
                    "can_handle faulted, skipping processor"
                );
                None
            }
        }
    }

    /// `None` when the transform panicked.
    fn run(processor: &dyn Processor, command: &str, output: &str) -> Option<String> {
        match guarded(|| processor.process(command, output)) {
            Ok(compressed) => Some(compressed),
            Err(panic) => {
                warn!(
                    processor = processor.name(),
                    reason = panic_message(panic.as_ref()),
                    "process faulted, trying next processor"
                );
                None
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}
