//! Output processors and their registry.

mod diagnostics;
mod generic;
mod network;
mod package_list;
mod patterns;
mod priority;
mod processor_trait;
mod registry;
mod search;
mod terraform;

#[cfg(test)]
pub(crate) mod testing;

pub use generic::GenericProcessor;
pub use network::NetworkProcessor;
pub use package_list::PackageListProcessor;
pub use patterns::PatternSet;
pub use priority::{PriorityBand, FALLBACK_PRIORITY};
pub use processor_trait::Processor;
pub use registry::Registry;
pub use search::SearchProcessor;
pub use terraform::TerraformProcessor;
