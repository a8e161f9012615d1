use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::ast::{IncludeNode, SourceId, TemplateTree};

/// Locates the tree an include points at.
///
/// Implemented by collaborators that own the project model; the generator never reads
/// files itself.
pub trait IncludeResolver {
    /// Resolve `include`, written inside `from`, to its target tree.
    fn resolve(&self, from: &SourceId, include: &IncludeNode) -> Option<&TemplateTree>;
}

/// Resolver for templates without includes.
pub struct NoIncludes;

impl IncludeResolver for NoIncludes {
    fn resolve(&self, _from: &SourceId, _include: &IncludeNode) -> Option<&TemplateTree> {
        None
    }
}

/// Level-triggered cancellation signal, polled before every visited node.
pub trait Cancellation: Send + Sync {
    fn is_cancelled(&self) -> bool;
}

impl<F> Cancellation for F
where
    F: Fn() -> bool + Send + Sync,
{
    fn is_cancelled(&self) -> bool {
        self()
    }
}

/// Never signals.
pub struct NeverCancelled;

impl Cancellation for NeverCancelled {
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Shared flag a caller flips from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }
}

impl Cancellation for CancellationFlag {
    fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}
