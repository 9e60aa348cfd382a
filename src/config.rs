//! Context configuration

/// What to do when two descriptors map to the same bean name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DuplicatePolicy {
    /// Fail `init()` with `DuplicateDefinition`
    #[default]
    Reject,

    /// Keep the later registration, dropping the earlier one
    Replace,
}

/// What to do with a bean name whose construction failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FailurePolicy {
    /// Leave the name unconstructed; a later `get()` tries again
    #[default]
    Retry,

    /// Remember the error and return it to every later `get()`
    Poison,
}

/// Settings for a [`Context`](crate::Context)
///
/// # Example
///
/// ```rust
/// use ioc_context::{ContextConfig, DuplicatePolicy, FailurePolicy};
///
/// let config = ContextConfig::new().poison_failures();
/// assert_eq!(config.duplicate_policy, DuplicatePolicy::Reject);
/// assert_eq!(config.failure_policy, FailurePolicy::Poison);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContextConfig {
    pub duplicate_policy: DuplicatePolicy,
    pub failure_policy: FailurePolicy,
}

impl ContextConfig {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Let later registrations replace earlier ones with the same name
    pub fn replace_duplicates(self) -> Self {
        self.with_duplicate_policy(DuplicatePolicy::Replace)
    }

    /// Cache construction failures permanently
    pub fn poison_failures(self) -> Self {
        self.with_failure_policy(FailurePolicy::Poison)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ContextConfig::default();
        assert_eq!(config.duplicate_policy, DuplicatePolicy::Reject);
        assert_eq!(config.failure_policy, FailurePolicy::Retry);
    }

    #[test]
    fn test_builder_chain() {
        let config = ContextConfig::new().replace_duplicates().poison_failures();
        assert_eq!(config.duplicate_policy, DuplicatePolicy::Replace);
        assert_eq!(config.failure_policy, FailurePolicy::Poison);
    }
}
