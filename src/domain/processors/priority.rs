//! Priority bands for processors.

use std::fmt;
use std::ops::RangeInclusive;

/// Priority reserved for the generic fallback processor.
pub const FALLBACK_PRIORITY: u32 = 999;

/// Named priority ranges. Every processor priority must fall in one band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityBand {
    /// 10-19: overrides that must run before core processors
    Override,
    /// 20-29: core tools (git, test, build, lint)
    Core,
    /// 30-49: specialized tools (network, terraform, search)
    Specialized,
    /// 50-69: content-based processors (file listing, file content)
    Content,
    /// 999: generic fallback
    Fallback,
}

impl PriorityBand {
    const ALL: [PriorityBand; 5] = [
        PriorityBand::Override,
        PriorityBand::Core,
        PriorityBand::Specialized,
        PriorityBand::Content,
        PriorityBand::Fallback,
    ];

    /// Numeric range covered by this band.
    pub fn range(self) -> RangeInclusive<u32> {
        match self {
            PriorityBand::Override => 10..=19,
            PriorityBand::Core => 20..=29,
            PriorityBand::Specialized => 30..=49,
            PriorityBand::Content => 50..=69,
            PriorityBand::Fallback => FALLBACK_PRIORITY..=FALLBACK_PRIORITY,
        }
    }

    /// Band containing `priority`, if any.
    pub fn of(priority: u32) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|band| band.range().contains(&priority))
    }
}

impl fmt::Display for PriorityBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PriorityBand::Override => "override",
            PriorityBand::Core => "core",
            PriorityBand::Specialized => "specialized",
            PriorityBand::Content => "content",
            PriorityBand::Fallback => "fallback",
        };
        write!(f, "{}", name)
    }
}
