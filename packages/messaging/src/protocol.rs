//! Protocols, sources and target identity.

use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

/// Error a target may return from a dispatched call.
pub type TargetError = Box<dyn std::error::Error + Send + Sync>;

/// Result of a single target invocation.
pub type TargetResult = Result<(), TargetError>;

/// A capability protocol: the trait targets implement to receive calls.
///
/// Protocols are marker types naming a trait object:
///
/// ```ignore
/// pub trait TitleListener: Send + Sync {
///     fn title_changed(&self, title: &str) -> TargetResult;
/// }
///
/// pub struct TitleEvents;
///
/// impl Protocol for TitleEvents {
///     type Target = dyn TitleListener;
///     const NAME: &'static str = "TitleListener";
/// }
/// ```
pub trait Protocol: 'static {
    /// The listener type, usually `dyn SomeListener`.
    type Target: ?Sized + Send + Sync + 'static;

    /// Name used in logs and errors.
    const NAME: &'static str;
}

/// Identity of an event source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(Uuid);

impl SourceId {
    /// A fresh, unique source id.
    pub fn new() -> Self {
        SourceId(Uuid::new_v4())
    }
}

impl Default for SourceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a registered target: the address of its shared allocation.
///
/// Two `Arc`s pointing at the same listener have the same id, whatever trait
/// object they were coerced to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(usize);

impl TargetId {
    pub fn of<T: ?Sized>(target: &Arc<T>) -> Self {
        TargetId(Arc::as_ptr(target) as *const () as usize)
    }

    pub fn from_raw(raw: usize) -> Self {
        TargetId(raw)
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Named: Send + Sync {
        fn name(&self) -> &str;
    }

    struct Fixed;

    impl Named for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }
    }

    #[test]
    fn target_id_ignores_pointer_metadata() {
        let concrete = Arc::new(Fixed);
        let object: Arc<dyn Named> = concrete.clone();
        assert_eq!(TargetId::of(&concrete), TargetId::of(&object));
        assert_eq!(object.name(), "fixed");
    }

    #[test]
    fn distinct_allocations_have_distinct_ids() {
        let a = Arc::new(1u8);
        let b = Arc::new(1u8);
        assert_ne!(TargetId::of(&a), TargetId::of(&b));
    }

    #[test]
    fn source_ids_are_unique() {
        assert_ne!(SourceId::new(), SourceId::new());
    }
}
