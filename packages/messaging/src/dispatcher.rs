//! Multicast dispatchers and their proxies.

use std::any::Any;
use std::collections::HashSet;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::pool::WorkerPool;
use crate::{
    DispatchError, DispatchObserver, DispatchTargetError, DispatcherConfig, FailureReason,
    Protocol, SourceId, TargetDirectory, TargetId, TargetResult, TracingObserver,
};

/// Whether proxy calls wait for their targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchMode {
    /// The call returns after every target has run, in registration order.
    Synchronous,
    /// The call returns immediately; each target runs on the worker pool.
    Asynchronous,
}

struct Shared {
    directory: TargetDirectory,
    source: Option<SourceId>,
    terminated: AtomicBool,
    observer: Arc<dyn DispatchObserver>,
    pool: Option<WorkerPool>,
}

/// Fans calls on a protocol out to every matching target in a directory.
///
/// A dispatcher is bound to one protocol and one source (or `None`). Calls
/// made through its [`Proxy`] reach the targets registered for that source
/// plus the wildcard targets, each exactly once.
///
/// ```ignore
/// let dispatcher = MessageDispatcher::<TitleEvents>::synchronous(&directory, Some(source));
/// let proxy = dispatcher.proxy();
/// proxy.send("title_changed", move |target| target.title_changed(&title))?;
/// ```
pub struct MessageDispatcher<P: Protocol> {
    shared: Arc<Shared>,
    _protocol: PhantomData<fn() -> P>,
}

impl<P: Protocol> MessageDispatcher<P> {
    /// Start building a dispatcher over `directory`.
    pub fn builder(directory: &TargetDirectory) -> DispatcherBuilder<P> {
        DispatcherBuilder {
            directory: directory.clone(),
            source: None,
            observer: Arc::new(TracingObserver),
            _protocol: PhantomData,
        }
    }

    /// A synchronous dispatcher with the default observer.
    pub fn synchronous(directory: &TargetDirectory, source: Option<SourceId>) -> Self {
        Self::builder(directory).source(source).synchronous()
    }

    /// An asynchronous dispatcher with the default observer.
    pub fn asynchronous(
        directory: &TargetDirectory,
        source: Option<SourceId>,
        config: &DispatcherConfig,
    ) -> Result<Self, DispatchError> {
        Self::builder(directory).source(source).asynchronous(config)
    }

    fn from_shared(shared: Shared) -> Self {
        let dispatcher = Self {
            shared: Arc::new(shared),
            _protocol: PhantomData,
        };
        tracing::debug!(
            protocol = P::NAME,
            source = ?dispatcher.shared.source,
            mode = ?dispatcher.mode(),
            "dispatcher created"
        );
        dispatcher
    }

    /// The callable side of this dispatcher.
    pub fn proxy(&self) -> Proxy<P> {
        Proxy {
            shared: Arc::clone(&self.shared),
            _protocol: PhantomData,
        }
    }

    pub fn mode(&self) -> DispatchMode {
        self.shared.mode()
    }

    pub fn source(&self) -> Option<SourceId> {
        self.shared.source
    }

    /// Stop dispatching. Later proxy calls fail with [`DispatchError::Terminated`];
    /// queued asynchronous deliveries that have not started are dropped.
    pub fn terminate(&self) {
        if self.shared.terminated.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(pool) = &self.shared.pool {
            pool.shutdown();
        }
        tracing::debug!(protocol = P::NAME, source = ?self.shared.source, "dispatcher terminated");
    }

    pub fn is_terminated(&self) -> bool {
        self.shared.terminated.load(Ordering::Acquire)
    }
}

impl<P: Protocol> std::fmt::Debug for MessageDispatcher<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageDispatcher")
            .field("protocol", &P::NAME)
            .field("source", &self.shared.source)
            .field("mode", &self.mode())
            .field("terminated", &self.is_terminated())
            .finish()
    }
}

/// Configures a [`MessageDispatcher`] before choosing its mode.
pub struct DispatcherBuilder<P: Protocol> {
    directory: TargetDirectory,
    source: Option<SourceId>,
    observer: Arc<dyn DispatchObserver>,
    _protocol: PhantomData<fn() -> P>,
}

impl<P: Protocol> DispatcherBuilder<P> {
    /// Source this dispatcher speaks for (`None` reaches only wildcard targets).
    pub fn source(mut self, source: Option<SourceId>) -> Self {
        self.source = source;
        self
    }

    /// Replace the default [`TracingObserver`].
    pub fn observer(mut self, observer: Arc<dyn DispatchObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn synchronous(self) -> MessageDispatcher<P> {
        MessageDispatcher::from_shared(self.into_shared(None))
    }

    pub fn asynchronous(self, config: &DispatcherConfig) -> Result<MessageDispatcher<P>, DispatchError> {
        let pool = WorkerPool::new(config)?;
        Ok(MessageDispatcher::from_shared(self.into_shared(Some(pool))))
    }

    fn into_shared(self, pool: Option<WorkerPool>) -> Shared {
        Shared {
            directory: self.directory,
            source: self.source,
            terminated: AtomicBool::new(false),
            observer: self.observer,
            pool,
        }
    }
}

/// The multicast proxy of a dispatcher. Cheap to clone.
///
/// Protocol traits are usually implemented for `Proxy<TheirProtocol>` so the
/// proxy can be called like any other target.
pub struct Proxy<P: Protocol> {
    shared: Arc<Shared>,
    _protocol: PhantomData<fn() -> P>,
}

impl<P: Protocol> Clone for Proxy<P> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            _protocol: PhantomData,
        }
    }
}

impl<P: Protocol> Proxy<P> {
    /// Deliver `call` to every target, labelled `method` in diagnostics.
    ///
    /// Target failures (errors or panics) are reported to the observer and
    /// never returned here. The only error is a terminated dispatcher.
    pub fn send<F>(&self, method: &'static str, call: F) -> Result<(), DispatchError>
    where
        F: Fn(&P::Target) -> TargetResult + Send + Sync + 'static,
    {
        if self.shared.terminated.load(Ordering::Acquire) {
            return Err(DispatchError::Terminated { protocol: P::NAME });
        }

        let targets = self.shared.targets::<P>();
        match &self.shared.pool {
            None => {
                for (id, target) in targets {
                    deliver::<P, F>(&*self.shared.observer, method, id, &target, &call);
                }
            }
            Some(pool) => {
                let call = Arc::new(call);
                for (id, target) in targets {
                    let call = Arc::clone(&call);
                    let observer = Arc::clone(&self.shared.observer);
                    let queued = pool.submit(move || {
                        deliver::<P, F>(&*observer, method, id, &target, &*call);
                    });
                    if !queued {
                        self.shared.observer.dispatch_dropped(P::NAME, method);
                    }
                }
            }
        }
        Ok(())
    }

    pub fn mode(&self) -> DispatchMode {
        self.shared.mode()
    }

    pub fn is_terminated(&self) -> bool {
        self.shared.terminated.load(Ordering::Acquire)
    }
}

impl<P: Protocol> std::fmt::Debug for Proxy<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Proxy")
            .field("protocol", &P::NAME)
            .field("source", &self.shared.source)
            .finish()
    }
}

impl Shared {
    fn mode(&self) -> DispatchMode {
        if self.pool.is_some() {
            DispatchMode::Asynchronous
        } else {
            DispatchMode::Synchronous
        }
    }

    /// Source targets then wildcard targets, each target once.
    fn targets<P: Protocol>(&self) -> Vec<(TargetId, Arc<P::Target>)> {
        let mut targets = match self.source {
            Some(_) => self.directory.registrations::<P>(self.source),
            None => Vec::new(),
        };
        targets.extend(self.directory.registrations::<P>(None));

        let mut seen = HashSet::with_capacity(targets.len());
        targets.retain(|(id, _)| seen.insert(*id));
        targets
    }
}

fn deliver<P, F>(
    observer: &dyn DispatchObserver,
    method: &'static str,
    id: TargetId,
    target: &P::Target,
    call: &F,
) where
    P: Protocol,
    F: Fn(&P::Target) -> TargetResult,
{
    let reason = match panic::catch_unwind(AssertUnwindSafe(|| call(target))) {
        Ok(Ok(())) => return,
        Ok(Err(error)) => FailureReason::Returned(error.to_string()),
        Err(payload) => FailureReason::Panicked(panic_message(payload.as_ref())),
    };
    observer.target_failed(&DispatchTargetError {
        protocol: P::NAME,
        method,
        target: id,
        reason,
    });
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    trait Counter: Send + Sync {
        fn bump(&self, by: u32) -> TargetResult;
    }

    #[derive(Default)]
    struct Tally(Mutex<u32>);

    impl Counter for Tally {
        fn bump(&self, by: u32) -> TargetResult {
            *self.0.lock().unwrap() += by;
            Ok(())
        }
    }

    struct Counting;

    impl Protocol for Counting {
        type Target = dyn Counter;
        const NAME: &'static str = "Counter";
    }

    #[derive(Default)]
    struct Recorded(Mutex<Vec<DispatchTargetError>>);

    impl DispatchObserver for Recorded {
        fn target_failed(&self, error: &DispatchTargetError) {
            self.0.lock().unwrap().push(error.clone());
        }
    }

    #[test]
    fn source_less_dispatcher_reaches_wildcard_targets() {
        let directory = TargetDirectory::new();
        let tally = Arc::new(Tally::default());
        directory.register::<Counting>(tally.clone(), None);

        let dispatcher = MessageDispatcher::<Counting>::synchronous(&directory, None);
        dispatcher.proxy().send("bump", |t| t.bump(2)).unwrap();

        assert_eq!(*tally.0.lock().unwrap(), 2);
    }

    #[test]
    fn targets_registered_after_proxy_creation_are_reached() {
        let directory = TargetDirectory::new();
        let dispatcher = MessageDispatcher::<Counting>::synchronous(&directory, None);
        let proxy = dispatcher.proxy();

        let tally = Arc::new(Tally::default());
        directory.register::<Counting>(tally.clone(), None);
        proxy.send("bump", |t| t.bump(1)).unwrap();

        assert_eq!(*tally.0.lock().unwrap(), 1);
    }

    #[test]
    fn panic_payloads_are_reported() {
        struct Panics;

        impl Counter for Panics {
            fn bump(&self, by: u32) -> TargetResult {
                panic!("cannot bump by {}", by)
            }
        }

        let directory = TargetDirectory::new();
        directory.register::<Counting>(Arc::new(Panics), None);
        let observer = Arc::new(Recorded::default());
        let dispatcher = MessageDispatcher::<Counting>::builder(&directory)
            .observer(observer.clone())
            .synchronous();

        dispatcher.proxy().send("bump", |t| t.bump(3)).unwrap();

        let failures = observer.0.lock().unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].method, "bump");
        assert_eq!(
            failures[0].reason,
            FailureReason::Panicked("cannot bump by 3".to_string())
        );
    }

    #[test]
    fn terminate_is_idempotent() {
        let directory = TargetDirectory::new();
        let dispatcher =
            MessageDispatcher::<Counting>::asynchronous(&directory, None, &DispatcherConfig::default())
                .unwrap();
        assert_eq!(dispatcher.mode(), DispatchMode::Asynchronous);

        dispatcher.terminate();
        dispatcher.terminate();
        assert!(dispatcher.is_terminated());
        assert!(dispatcher.proxy().is_terminated());
    }
}
