//! Observer Registry
//!
//! Ordered, identity-unique observer lists for the two channels. Delivery is
//! best-effort: an observer that fails is dropped and the rest of the list
//! still receives the event.

use cnc_bridge_shared::{ErrorEvent, MachineStatus};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{Channel, ErrorObserver, StatusObserver, SubscriptionId};

struct ObserverList<O: ?Sized> {
    channel: Channel,
    entries: RwLock<Vec<(SubscriptionId, Arc<O>)>>,
}

impl<O: ?Sized> ObserverList<O> {
    fn new(channel: Channel) -> Self {
        Self {
            channel,
            entries: RwLock::new(Vec::new()),
        }
    }

    fn subscribe(&self, observer: Arc<O>) -> SubscriptionId {
        let mut entries = self.entries.write();
        if let Some((id, _)) = entries.iter().find(|(_, o)| same_instance(o, &observer)) {
            return *id;
        }

        let id = SubscriptionId::new();
        entries.push((id, observer));
        debug!("[OBSERVER] {} subscribed to {}", id, self.channel.as_str());
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        let removed = entries.len() != before;
        if removed {
            debug!("[OBSERVER] {} unsubscribed from {}", id, self.channel.as_str());
        }
        removed
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Deliver to a snapshot of the list, in subscription order.
    /// Returns the number of successful deliveries.
    fn notify(&self, deliver: impl Fn(&O) -> anyhow::Result<()>) -> usize {
        let snapshot: Vec<_> = self.entries.read().clone();
        let mut failed = Vec::new();

        for (id, observer) in &snapshot {
            if let Err(e) = deliver(&**observer) {
                warn!(
                    "[OBSERVER] {} failed on {} and was removed: {}",
                    id,
                    self.channel.as_str(),
                    e
                );
                failed.push(*id);
            }
        }

        if !failed.is_empty() {
            self.entries.write().retain(|(id, _)| !failed.contains(id));
        }

        snapshot.len() - failed.len()
    }
}

fn same_instance<O: ?Sized>(a: &Arc<O>, b: &Arc<O>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

/// Status and error observer lists
pub struct ObserverRegistry {
    status: ObserverList<dyn StatusObserver>,
    errors: ObserverList<dyn ErrorObserver>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self {
            status: ObserverList::new(Channel::Status),
            errors: ObserverList::new(Channel::Errors),
        }
    }

    /// Register a status observer. Subscribing the same instance again returns its existing id.
    pub fn subscribe_status(&self, observer: Arc<dyn StatusObserver>) -> SubscriptionId {
        self.status.subscribe(observer)
    }

    /// Register an error observer. Subscribing the same instance again returns its existing id.
    pub fn subscribe_errors(&self, observer: Arc<dyn ErrorObserver>) -> SubscriptionId {
        self.errors.subscribe(observer)
    }

    /// Remove a subscription. Unknown ids are ignored; returns whether anything was removed.
    pub fn unsubscribe(&self, channel: Channel, id: SubscriptionId) -> bool {
        match channel {
            Channel::Status => self.status.unsubscribe(id),
            Channel::Errors => self.errors.unsubscribe(id),
        }
    }

    pub fn count(&self, channel: Channel) -> usize {
        match channel {
            Channel::Status => self.status.len(),
            Channel::Errors => self.errors.len(),
        }
    }

    pub fn notify_status(&self, status: &MachineStatus) -> usize {
        self.status.notify(|o| o.on_status(status))
    }

    pub fn notify_errors(&self, event: &ErrorEvent) -> usize {
        self.errors.notify(|o| o.on_error(event))
    }
}

impl Default for ObserverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use cnc_bridge_shared::ErrorKind;
    use parking_lot::Mutex;

    struct Recorder {
        tag: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl StatusObserver for Recorder {
        fn on_status(&self, _status: &MachineStatus) -> anyhow::Result<()> {
            self.log.lock().push(self.tag);
            Ok(())
        }
    }

    struct Broken;

    impl StatusObserver for Broken {
        fn on_status(&self, _status: &MachineStatus) -> anyhow::Result<()> {
            bail!("socket closed")
        }
    }

    #[test]
    fn test_delivery_in_subscription_order() {
        let registry = ObserverRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        for tag in ["a", "b", "c"] {
            registry.subscribe_status(Arc::new(Recorder {
                tag,
                log: log.clone(),
            }));
        }

        assert_eq!(registry.notify_status(&MachineStatus::default()), 3);
        assert_eq!(*log.lock(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_failing_observer_is_dropped() {
        let registry = ObserverRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        registry.subscribe_status(Arc::new(Recorder {
            tag: "first",
            log: log.clone(),
        }));
        registry.subscribe_status(Arc::new(Broken));
        registry.subscribe_status(Arc::new(Recorder {
            tag: "last",
            log: log.clone(),
        }));

        assert_eq!(registry.notify_status(&MachineStatus::default()), 2);
        assert_eq!(*log.lock(), vec!["first", "last"]);
        assert_eq!(registry.count(Channel::Status), 2);

        registry.notify_status(&MachineStatus::default());
        assert_eq!(log.lock().len(), 4);
    }

    #[test]
    fn test_same_instance_subscribes_once() {
        let registry = ObserverRegistry::new();
        let observer: Arc<dyn StatusObserver> = Arc::new(Broken);

        let first = registry.subscribe_status(observer.clone());
        let second = registry.subscribe_status(observer);
        assert_eq!(first, second);
        assert_eq!(registry.count(Channel::Status), 1);
    }

    #[test]
    fn test_unsubscribe_unknown_is_noop() {
        let registry = ObserverRegistry::new();
        let id = registry.subscribe_errors(Arc::new(|_: &ErrorEvent| -> anyhow::Result<()> { Ok(()) }));

        assert!(!registry.unsubscribe(Channel::Status, id));
        assert_eq!(registry.count(Channel::Errors), 1);

        assert!(registry.unsubscribe(Channel::Errors, id));
        assert!(!registry.unsubscribe(Channel::Errors, id));
        assert_eq!(registry.count(Channel::Errors), 0);
    }

    #[test]
    fn test_closure_error_observer() {
        let registry = ObserverRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        registry.subscribe_errors(Arc::new(move |event: &ErrorEvent| -> anyhow::Result<()> {
            sink.lock().push(event.id);
            Ok(())
        }));

        let event = ErrorEvent::new(4, ErrorKind::NmlText, "hello", "2024-01-01 00:00:00");
        assert_eq!(registry.notify_errors(&event), 1);
        assert_eq!(*seen.lock(), vec![4]);
    }
}
