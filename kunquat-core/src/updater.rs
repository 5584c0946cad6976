//! Synchronous signal fan-out.
//!
//! Editing code queues signals with [`Updater::signal_update`]; the event
//! loop calls [`Updater::perform_updates`] once per iteration, which hands
//! the accumulated [`SignalSet`] to every subscriber in registration order.

use kunquat_types::{Signal, SignalSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u32);

type Subscriber = Box<dyn FnMut(&SignalSet)>;

#[derive(Default)]
pub struct Updater {
    pending: SignalSet,
    subscribers: Vec<(SubscriberId, Subscriber)>,
    next_id: u32,
}

impl Updater {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signal_update(&mut self, signal: Signal) {
        self.pending.insert(signal);
    }

    pub fn signal_all(&mut self, signals: impl IntoIterator<Item = Signal>) {
        self.pending.extend(signals);
    }

    pub fn register_updater(&mut self, f: impl FnMut(&SignalSet) + 'static) -> SubscriberId {
        let id = SubscriberId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(f)));
        id
    }

    pub fn unregister_updater(&mut self, id: SubscriberId) {
        self.subscribers.retain(|(sid, _)| *sid != id);
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn pending(&self) -> &SignalSet {
        &self.pending
    }

    /// Take the queued signals without notifying anyone.
    pub fn take_pending(&mut self) -> SignalSet {
        std::mem::take(&mut self.pending)
    }

    /// Deliver queued signals. Returns the delivered set.
    pub fn perform_updates(&mut self) -> SignalSet {
        let signals = self.take_pending();
        if signals.is_empty() {
            return signals;
        }
        log::trace!(target: "updater", "delivering {} signals", signals.len());
        for (_, subscriber) in self.subscribers.iter_mut() {
            subscriber(&signals);
        }
        signals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn signals_are_batched_and_deduplicated() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut updater = Updater::new();
        let sink = seen.clone();
        updater.register_updater(move |signals| sink.borrow_mut().push(signals.clone()));

        updater.signal_update(Signal::Selection);
        updater.signal_update(Signal::Selection);
        updater.signal_update(Signal::SheetZoom);
        updater.perform_updates();

        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].len(), 2);
    }

    #[test]
    fn empty_round_notifies_nobody() {
        let count = Rc::new(RefCell::new(0));
        let mut updater = Updater::new();
        let c = count.clone();
        updater.register_updater(move |_| *c.borrow_mut() += 1);
        updater.perform_updates();
        assert_eq!(*count.borrow(), 0);
    }

    #[test]
    fn unregistered_subscriber_is_skipped() {
        let count = Rc::new(RefCell::new(0));
        let mut updater = Updater::new();
        let c = count.clone();
        let id = updater.register_updater(move |_| *c.borrow_mut() += 1);
        updater.unregister_updater(id);
        updater.signal_update(Signal::Grid);
        updater.perform_updates();
        assert_eq!(*count.borrow(), 0);
    }
}
