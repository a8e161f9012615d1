use crate::ast::SourceId;

/// Raised when an include would re-enter a source that is still being expanded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleDetected {
    pub source: SourceId,
}

/// Chain of sources currently being expanded.
///
/// Owned by one generation; a source appears at most once on the stack.
#[derive(Debug, Default)]
pub struct IncludeGuard {
    stack: Vec<SourceId>,
}

impl IncludeGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(&mut self, source: &SourceId) -> Result<(), CycleDetected> {
        if self.stack.contains(source) {
            return Err(CycleDetected {
                source: source.clone(),
            });
        }
        self.stack.push(source.clone());
        Ok(())
    }

    /// Pops `source`, which must be the innermost open source.
    pub fn exit(&mut self, source: &SourceId) {
        let top = self.stack.pop();
        debug_assert_eq!(
            top.as_ref(),
            Some(source),
            "include guard exit does not match the innermost open source"
        );
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enter_exit() {
        let mut guard = IncludeGuard::new();
        let a = SourceId::new("a.tt");
        let b = SourceId::new("b.tt");

        guard.enter(&a).unwrap();
        guard.enter(&b).unwrap();
        assert_eq!(guard.depth(), 2);
        guard.exit(&b);
        guard.exit(&a);
        assert_eq!(guard.depth(), 0);
    }

    #[test]
    fn test_cycle_detected() {
        let mut guard = IncludeGuard::new();
        let a = SourceId::new("a.tt");
        let b = SourceId::new("b.tt");

        guard.enter(&a).unwrap();
        guard.enter(&b).unwrap();
        assert_eq!(guard.enter(&a), Err(CycleDetected { source: a.clone() }));
        // A failed enter leaves the stack untouched.
        assert_eq!(guard.depth(), 2);
    }

    #[test]
    fn test_reentry_after_exit_is_allowed() {
        let mut guard = IncludeGuard::new();
        let a = SourceId::new("a.tt");
        let b = SourceId::new("b.tt");

        guard.enter(&a).unwrap();
        guard.enter(&b).unwrap();
        guard.exit(&b);
        assert_eq!(guard.depth(), 1);
        assert!(guard.enter(&b).is_ok());
    }

    #[test]
    #[should_panic(expected = "include guard exit")]
    #[cfg(debug_assertions)]
    fn test_mismatched_exit_panics_in_debug() {
        let mut guard = IncludeGuard::new();
        guard.enter(&SourceId::new("a.tt")).unwrap();
        guard.exit(&SourceId::new("b.tt"));
    }
}
