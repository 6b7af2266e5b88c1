use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::{Rc, Weak};

use log::{error, trace};

use super::EventHandler;

pub type Callback<T> = Rc<dyn Fn(&T)>;
pub type SubscriptionId = u64;

type Listeners<T> = RefCell<BTreeMap<SubscriptionId, Callback<T>>>;

pub struct EventEmitter<T: std::fmt::Debug> {
    channel: Channel<T>,
}

impl<T: std::fmt::Debug> Clone for EventEmitter<T> {
    fn clone(&self) -> Self {
        Self {
            channel: self.channel.clone(),
        }
    }
}

pub struct EventObserver<T: std::fmt::Debug> {
    channel: Channel<T>,
}

impl<T: std::fmt::Debug> Clone for EventObserver<T> {
    fn clone(&self) -> Self {
        Self {
            channel: self.channel.clone(),
        }
    }
}

/// Handle returned by `subscribe`. Dropping it keeps the subscription alive;
/// call `unsubscribe` to detach the listener.
pub struct Unsubscriber<T: std::fmt::Debug> {
    listeners: Weak<Listeners<T>>,
    id: SubscriptionId,
}

impl<T: std::fmt::Debug> Unsubscriber<T> {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn unsubscribe(self) -> bool {
        match self.listeners.upgrade() {
            Some(listeners) => listeners.borrow_mut().remove(&self.id).is_some(),
            None => false,
        }
    }
}

pub struct Channel<T: std::fmt::Debug> {
    listeners: Rc<Listeners<T>>,
    next_id: Rc<RefCell<SubscriptionId>>,
}

impl<T: std::fmt::Debug> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Self {
            listeners: Rc::clone(&self.listeners),
            next_id: Rc::clone(&self.next_id),
        }
    }
}

impl<T: std::fmt::Debug> Channel<T> {
    pub fn new() -> (EventEmitter<T>, EventObserver<T>) {
        let channel = Channel {
            listeners: Rc::new(RefCell::new(BTreeMap::new())),
            next_id: Rc::new(RefCell::new(0)),
        };
        (
            EventEmitter {
                channel: channel.clone(),
            },
            EventObserver { channel },
        )
    }

    pub fn subscribe<F>(&self, callback: F) -> Unsubscriber<T>
    where
        F: Fn(&T) + 'static,
    {
        let id = {
            let mut next_id = self.next_id.borrow_mut();
            let id = *next_id;
            *next_id += 1;
            id
        };
        self.listeners.borrow_mut().insert(id, Rc::new(callback));
        Unsubscriber {
            listeners: Rc::downgrade(&self.listeners),
            id,
        }
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.listeners.borrow_mut().remove(&id).is_some()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Listeners are called in subscription order. The listener list is
    /// copied first, so a listener may subscribe or unsubscribe while the
    /// event is being delivered.
    pub fn emit(&self, data: &T) {
        let listeners: Vec<Callback<T>> = self.listeners.borrow().values().cloned().collect();
        trace!(target: "events", "Emitting event to {} listeners: {:?}", listeners.len(), data);
        for listener in listeners {
            listener(data);
        }
    }

    pub fn clear(&self) {
        self.listeners.borrow_mut().clear();
    }
}

impl<T: std::fmt::Debug> EventEmitter<T> {
    pub fn emit(&self, data: T) {
        self.channel.emit(&data);
    }
}

impl<T: std::fmt::Debug> EventObserver<T> {
    pub fn subscribe<F>(&self, callback: F) -> Unsubscriber<T>
    where
        F: Fn(&T) + 'static,
    {
        self.channel.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.channel.unsubscribe(id)
    }

    pub fn listener_count(&self) -> usize {
        self.channel.listener_count()
    }
}

/// Events waiting for a busy handler. The handler keeps a clone so that,
/// when it is driven by a direct call rather than through the channel, it
/// can drain whatever arrived in the meantime.
pub struct PendingQueue<T> {
    events: Rc<RefCell<VecDeque<T>>>,
}

impl<T> Clone for PendingQueue<T> {
    fn clone(&self) -> Self {
        Self {
            events: Rc::clone(&self.events),
        }
    }
}

impl<T> Default for PendingQueue<T> {
    fn default() -> Self {
        Self {
            events: Rc::new(RefCell::new(VecDeque::new())),
        }
    }
}

impl<T> PendingQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: T) {
        self.events.borrow_mut().push_back(event);
    }

    pub fn pop(&self) -> Option<T> {
        self.events.borrow_mut().pop_front()
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }
}

/// Routes every event from `observer` into `handler`.
///
/// Events that arrive while the handler is already borrowed (for example an
/// event emitted from inside one of its own listeners) wait in `pending`.
/// The outer delivery drains them once the handler is free; a handler that
/// was borrowed by a direct method call must drain `pending` itself before
/// returning. Either way it sees events one at a time and in arrival order.
pub fn wire_handler<T, H>(
    handler: &Rc<RefCell<H>>,
    observer: &EventObserver<T>,
    pending: &PendingQueue<T>,
) -> Unsubscriber<T>
where
    T: std::fmt::Debug + Clone + 'static,
    H: EventHandler<T> + 'static,
{
    let handler = Rc::clone(handler);
    let pending = pending.clone();
    observer.subscribe(move |event: &T| {
        pending.push(event.clone());
        let Ok(mut target) = handler.try_borrow_mut() else {
            trace!(target: "events", "Handler busy, queued {:?}", event);
            return;
        };
        while let Some(event) = pending.pop() {
            target.handle_event(&event);
        }
    })
}

/// Like `wire_handler`, but for handlers that only need a shared reference
/// back to themselves and never re-enter.
pub fn wire_projection<T, H>(handler: &Rc<RefCell<H>>, observer: &EventObserver<T>) -> Unsubscriber<T>
where
    T: std::fmt::Debug + 'static,
    H: EventHandler<T> + 'static,
{
    let handler = Rc::downgrade(handler);
    observer.subscribe(move |event: &T| {
        let Some(handler) = handler.upgrade() else {
            return;
        };
        match handler.try_borrow_mut() {
            Ok(mut target) => target.handle_event(event),
            Err(_) => error!(target: "events", "Projection busy, dropped {:?}", event),
        };
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_event_subscription_and_emission() {
        let (emitter, observer) = Channel::<u32>::new();
        let counter = Rc::new(Cell::new(0));
        let counter_clone = counter.clone();

        observer.subscribe(move |_data: &u32| {
            counter_clone.set(counter_clone.get() + 1);
        });

        emitter.emit(42);
        assert_eq!(counter.get(), 1);
    }

    #[test]
    fn test_listeners_called_in_subscription_order() {
        let (emitter, observer) = Channel::<u32>::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        for tag in 0..3 {
            let seen = seen.clone();
            observer.subscribe(move |data: &u32| seen.borrow_mut().push((tag, *data)));
        }

        emitter.emit(7);
        assert_eq!(*seen.borrow(), vec![(0, 7), (1, 7), (2, 7)]);
    }

    #[test]
    fn test_unsubscribe_through_handle() {
        let (emitter, observer) = Channel::<u32>::new();
        let counter = Rc::new(Cell::new(0));
        let counter_clone = counter.clone();

        let subscription = observer.subscribe(move |_data: &u32| {
            counter_clone.set(counter_clone.get() + 1);
        });
        let id = subscription.id();

        emitter.emit(1);
        assert!(subscription.unsubscribe());
        emitter.emit(2);
        assert_eq!(counter.get(), 1);

        // Already gone
        assert!(!observer.unsubscribe(id));
    }

    #[test]
    fn test_listener_may_subscribe_during_emit() {
        let (emitter, observer) = Channel::<u32>::new();
        let observer_clone = observer.clone();
        observer.subscribe(move |_data: &u32| {
            observer_clone.subscribe(|_: &u32| {});
        });

        emitter.emit(1);
        assert_eq!(observer.listener_count(), 2);
    }

    struct Recorder {
        seen: Vec<u32>,
        emitter: EventEmitter<u32>,
    }

    impl EventHandler<u32> for Recorder {
        fn handle_event(&mut self, event: &u32) {
            self.seen.push(*event);
            if *event == 1 {
                // re-entrant emission is queued, not dropped
                self.emitter.emit(2);
                self.emitter.emit(3);
            }
        }
    }

    #[test]
    fn test_wire_handler_queues_reentrant_events() {
        let (emitter, observer) = Channel::<u32>::new();
        let recorder = Rc::new(RefCell::new(Recorder {
            seen: vec![],
            emitter: emitter.clone(),
        }));
        let pending = PendingQueue::new();
        let subscription = wire_handler(&recorder, &observer, &pending);

        emitter.emit(1);
        assert_eq!(recorder.borrow().seen, vec![1, 2, 3]);
        assert!(pending.is_empty());

        subscription.unsubscribe();
        emitter.emit(4);
        assert_eq!(recorder.borrow().seen, vec![1, 2, 3]);
    }

    #[test]
    fn test_events_for_a_borrowed_handler_wait_in_pending() {
        let (emitter, observer) = Channel::<u32>::new();
        let recorder = Rc::new(RefCell::new(Recorder {
            seen: vec![],
            emitter: emitter.clone(),
        }));
        let pending = PendingQueue::new();
        let _subscription = wire_handler(&recorder, &observer, &pending);

        {
            let mut direct = recorder.borrow_mut();
            direct.seen.push(0);
            emitter.emit(5);
            emitter.emit(6);
            assert_eq!(pending.len(), 2);
            while let Some(event) = pending.pop() {
                direct.handle_event(&event);
            }
        }
        assert_eq!(recorder.borrow().seen, vec![0, 5, 6]);
    }
}
