//! The registry of targets, keyed by (source, protocol).

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::{Protocol, SourceId, TargetId};

type Key = (Option<SourceId>, TypeId);

struct Registration {
    id: TargetId,
    /// Holds an `Arc<P::Target>` for the protocol in the key.
    target: Box<dyn Any + Send + Sync>,
}

/// A shared directory of message targets.
///
/// Targets register for a protocol either under a specific source or under
/// the wildcard (`None`), which receives dispatches from every source of that
/// protocol. The directory holds strong references: a registered target
/// stays alive until it is removed.
///
/// Cloning yields another handle to the same directory.
#[derive(Clone, Default)]
pub struct TargetDirectory {
    entries: Arc<RwLock<HashMap<Key, Vec<Registration>>>>,
}

impl TargetDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `target` for protocol `P` from `source` (`None` = any source).
    ///
    /// Returns `false` if the same target was already registered under this
    /// key; registration order is kept.
    pub fn register<P: Protocol>(&self, target: Arc<P::Target>, source: Option<SourceId>) -> bool {
        let id = TargetId::of(&target);
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let slot = entries.entry((source, TypeId::of::<P>())).or_default();
        if slot.iter().any(|registration| registration.id == id) {
            return false;
        }
        slot.push(Registration {
            id,
            target: Box::new(target),
        });
        tracing::debug!(protocol = P::NAME, target = %id, source = ?source, "registered target");
        true
    }

    /// Remove `target` from protocol `P` under `source`. Returns whether it was present.
    pub fn remove<P: Protocol>(&self, target: &Arc<P::Target>, source: Option<SourceId>) -> bool {
        let id = TargetId::of(target);
        let key = (source, TypeId::of::<P>());
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let Some(slot) = entries.get_mut(&key) else {
            return false;
        };
        let before = slot.len();
        slot.retain(|registration| registration.id != id);
        let removed = slot.len() != before;
        if slot.is_empty() {
            entries.remove(&key);
        }
        if removed {
            tracing::debug!(protocol = P::NAME, target = %id, source = ?source, "removed target");
        }
        removed
    }

    /// Targets registered for `P` under exactly `source`, in registration order.
    ///
    /// No wildcard expansion happens here; `targets_for::<P>(None)` returns
    /// only the wildcard registrations.
    pub fn targets_for<P: Protocol>(&self, source: Option<SourceId>) -> Vec<Arc<P::Target>> {
        self.registrations::<P>(source)
            .into_iter()
            .map(|(_, target)| target)
            .collect()
    }

    pub(crate) fn registrations<P: Protocol>(
        &self,
        source: Option<SourceId>,
    ) -> Vec<(TargetId, Arc<P::Target>)> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(&(source, TypeId::of::<P>()))
            .map(|slot| {
                slot.iter()
                    .filter_map(|registration| {
                        registration
                            .target
                            .downcast_ref::<Arc<P::Target>>()
                            .map(|target| (registration.id, Arc::clone(target)))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of registrations for `P` under exactly `source`.
    pub fn target_count<P: Protocol>(&self, source: Option<SourceId>) -> usize {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(&(source, TypeId::of::<P>()))
            .map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for TargetDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("TargetDirectory")
            .field("keys", &entries.len())
            .field(
                "registrations",
                &entries.values().map(Vec::len).sum::<usize>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct Hello(&'static str);

    impl Greeter for Hello {
        fn greet(&self) -> String {
            format!("hello {}", self.0)
        }
    }

    struct Greetings;

    impl Protocol for Greetings {
        type Target = dyn Greeter;
        const NAME: &'static str = "Greeter";
    }

    struct Farewells;

    impl Protocol for Farewells {
        type Target = dyn Greeter;
        const NAME: &'static str = "Farewell";
    }

    fn greeter(name: &'static str) -> Arc<dyn Greeter> {
        Arc::new(Hello(name))
    }

    #[test]
    fn targets_are_returned_in_registration_order() {
        let directory = TargetDirectory::new();
        let source = Some(SourceId::new());
        directory.register::<Greetings>(greeter("a"), source);
        directory.register::<Greetings>(greeter("b"), source);

        let greetings: Vec<_> = directory
            .targets_for::<Greetings>(source)
            .iter()
            .map(|target| target.greet())
            .collect();
        assert_eq!(greetings, vec!["hello a", "hello b"]);
    }

    #[test]
    fn lookup_is_exact_on_source() {
        let directory = TargetDirectory::new();
        let source = Some(SourceId::new());
        directory.register::<Greetings>(greeter("wild"), None);

        assert!(directory.targets_for::<Greetings>(source).is_empty());
        assert_eq!(directory.targets_for::<Greetings>(None).len(), 1);
    }

    #[test]
    fn protocols_sharing_a_target_type_are_separate() {
        let directory = TargetDirectory::new();
        directory.register::<Greetings>(greeter("a"), None);

        assert!(directory.targets_for::<Farewells>(None).is_empty());
        assert_eq!(directory.target_count::<Greetings>(None), 1);
    }

    #[test]
    fn duplicate_registration_is_ignored() {
        let directory = TargetDirectory::new();
        let target = greeter("a");
        assert!(directory.register::<Greetings>(target.clone(), None));
        assert!(!directory.register::<Greetings>(target.clone(), None));
        assert_eq!(directory.target_count::<Greetings>(None), 1);
    }

    #[test]
    fn remove_only_affects_the_given_key() {
        let directory = TargetDirectory::new();
        let source = Some(SourceId::new());
        let target = greeter("a");
        directory.register::<Greetings>(target.clone(), source);
        directory.register::<Greetings>(target.clone(), None);

        assert!(directory.remove::<Greetings>(&target, source));
        assert!(!directory.remove::<Greetings>(&target, source));
        assert!(directory.targets_for::<Greetings>(source).is_empty());
        assert_eq!(directory.targets_for::<Greetings>(None).len(), 1);
    }

    #[test]
    fn clones_share_state() {
        let directory = TargetDirectory::new();
        let other = directory.clone();
        directory.register::<Greetings>(greeter("a"), None);
        assert_eq!(other.target_count::<Greetings>(None), 1);
    }
}
