use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies one sound source registered with an [crate::Engine].
///
/// Ids are unique per process, not just per engine, so an id from one engine is never mistaken for a source of
/// another.  The niche means `Option<SourceId>` is no bigger than the id.
#[derive(Copy, Clone, Debug, Eq, Ord, PartialEq, PartialOrd, Hash, derive_more::Display)]
#[display(fmt = "#{}", _0)]
pub struct SourceId(NonZeroU64);

impl SourceId {
    pub(crate) fn new() -> SourceId {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        let got = COUNTER.fetch_add(1, Ordering::Relaxed);
        // Starting at 1 and never wrapping in practice.
        SourceId(NonZeroU64::new(got).unwrap_or(NonZeroU64::MIN))
    }
}
