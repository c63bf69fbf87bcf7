//! Processor registry.
//!
//! Processors are registered explicitly in [`builtin_processors`]; there is no
//! runtime scanning. A registry holds one immutable [`Snapshot`] at a time and
//! replaces it whole on [`Registry::refresh`].

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use tracing::{debug, info};

use super::{
    GenericProcessor, NetworkProcessor, PackageListProcessor, PatternSet, PriorityBand,
    Processor, SearchProcessor, TerraformProcessor, FALLBACK_PRIORITY,
};
use crate::config::Config;
use crate::domain::SaverError;

/// Builds a fresh set of processor instances.
pub type ProcessorFactory = Box<dyn Fn() -> Vec<Box<dyn Processor>> + Send + Sync>;

/// Instantiate one of every built-in processor.
pub fn builtin_processors(config: &Config) -> Vec<Box<dyn Processor>> {
    vec![
        Box::new(PackageListProcessor::new()),
        Box::new(NetworkProcessor::new()),
        Box::new(TerraformProcessor::new()),
        Box::new(SearchProcessor::new()),
        Box::new(GenericProcessor::new(
            config.generic_truncate_threshold,
            config.generic_keep_head,
            config.generic_keep_tail,
        )),
    ]
}

/// Immutable, priority-ordered processor sequence and its pattern set.
pub struct Snapshot {
    processors: Vec<Box<dyn Processor>>,
    patterns: PatternSet,
}

impl Snapshot {
    /// Validate and order a processor set.
    ///
    /// Processors are stable-sorted by priority, so equal priorities keep
    /// registration order. The fallback is moved to the tail.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an empty set, duplicate names, a
    /// missing or repeated fallback, priorities outside every band or on the
    /// reserved fallback value, and invalid hook patterns.
    pub fn build(mut processors: Vec<Box<dyn Processor>>) -> Result<Self, SaverError> {
        validate(&processors)?;

        processors.sort_by_key(|p| p.priority());
        if let Some(index) = processors.iter().position(|p| p.is_fallback()) {
            let fallback = processors.remove(index);
            processors.push(fallback);
        }

        let patterns = PatternSet::collect(&processors)?;
        Ok(Self {
            processors,
            patterns,
        })
    }

    /// Processors in routing order.
    pub fn processors(&self) -> &[Box<dyn Processor>] {
        &self.processors
    }

    /// Processor names in routing order.
    pub fn names(&self) -> Vec<&str> {
        self.processors.iter().map(|p| p.name()).collect()
    }

    /// Combined hook pattern set.
    pub fn patterns(&self) -> &PatternSet {
        &self.patterns
    }
}

fn validate(processors: &[Box<dyn Processor>]) -> Result<(), SaverError> {
    if processors.is_empty() {
        return Err(SaverError::config("processor registry is empty"));
    }

    let mut names = HashSet::new();
    let mut fallbacks = Vec::new();

    for processor in processors {
        let name = processor.name();
        let priority = processor.priority();

        if name.is_empty() {
            return Err(SaverError::config("processor name cannot be empty"));
        }
        if !names.insert(name) {
            return Err(SaverError::config(format!(
                "duplicate processor name '{}'",
                name
            )));
        }

        if processor.is_fallback() {
            fallbacks.push(name);
            if !processor.hook_patterns().is_empty() {
                return Err(SaverError::config(format!(
                    "fallback processor '{}' must not declare hook patterns",
                    name
                )));
            }
            continue;
        }

        match PriorityBand::of(priority) {
            None => {
                return Err(SaverError::config(format!(
                    "processor '{}' has priority {} outside every band",
                    name, priority
                )));
            }
            Some(PriorityBand::Fallback) => {
                return Err(SaverError::config(format!(
                    "processor '{}' uses reserved fallback priority {}",
                    name, FALLBACK_PRIORITY
                )));
            }
            Some(_) => {}
        }

        for pattern in processor.hook_patterns() {
            if !pattern.starts_with('^') {
                return Err(SaverError::config(format!(
                    "processor '{}': hook pattern '{}' must be anchored with '^'",
                    name, pattern
                )));
            }
        }
    }

    match fallbacks.len() {
        0 => Err(SaverError::config("no fallback processor registered")),
        1 => Ok(()),
        _ => Err(SaverError::config(format!(
            "multiple fallback processors registered: {}",
            fallbacks.join(", ")
        ))),
    }
}

/// Registry of processors with atomically replaceable snapshots.
pub struct Registry {
    factory: ProcessorFactory,
    snapshot: RwLock<Arc<Snapshot>>,
}

impl Registry {
    /// Build a registry of the built-in processors.
    pub fn discover(config: &Config) -> Result<Self, SaverError> {
        let config = config.clone();
        Self::from_factory(Box::new(move || builtin_processors(&config)))
    }

    /// Build a registry from any processor factory.
    pub fn from_factory(factory: ProcessorFactory) -> Result<Self, SaverError> {
        let snapshot = Snapshot::build(factory())?;
        debug!(processors = ?snapshot.names(), "Processor registry built");
        Ok(Self {
            factory,
            snapshot: RwLock::new(Arc::new(snapshot)),
        })
    }

    /// Current snapshot. Callers keep using it even if a refresh happens.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        match self.snapshot.read() {
            Ok(guard) => Arc::clone(&*guard),
            Err(poisoned) => Arc::clone(&*poisoned.into_inner()),
        }
    }

    /// Rebuild the snapshot from scratch and swap it in.
    ///
    /// On error the previous snapshot stays in place.
    pub fn refresh(&self) -> Result<(), SaverError> {
        let fresh = Arc::new(Snapshot::build((self.factory)())?);
        info!(processors = ?fresh.names(), "Processor registry refreshed");
        match self.snapshot.write() {
            Ok(mut guard) => *guard = fresh,
            Err(poisoned) => *poisoned.into_inner() = fresh,
        }
        Ok(())
    }

    /// Combined hook patterns of the current snapshot.
    pub fn collect_patterns(&self) -> Vec<String> {
        self.snapshot().patterns().patterns().to_vec()
    }

    /// Check if a command matches any hook pattern of the current snapshot.
    pub fn is_compressible(&self, command: &str) -> bool {
        self.snapshot().patterns().is_compressible(command)
    }
}
