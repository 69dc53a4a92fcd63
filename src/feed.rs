use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::{debug, trace};

use crate::model::TransactionRecord;

pub type BatchListener = Box<dyn Fn(Vec<TransactionRecord>)>;

/// A push source delivering the full, already ordered transaction list on
/// every update.
pub trait TransactionFeed {
    fn subscribe(&self, on_batch: BatchListener) -> Subscription;
}

/// Handle to a live subscription. Releasing happens exactly once, either
/// through `dispose` or on drop.
#[must_use = "dropping a Subscription releases it immediately"]
pub struct Subscription {
    release: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(release: impl FnOnce() + 'static) -> Self {
        Self { release: Some(Box::new(release)) }
    }

    pub fn dispose(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, Rc<dyn Fn(Vec<TransactionRecord>)>)>,
}

/// Local fan-out of feed batches to any number of listeners.
#[derive(Clone, Default)]
pub struct FeedChannel {
    inner: Rc<RefCell<Listeners>>,
}

impl FeedChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listener_count(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    pub fn is_idle(&self) -> bool {
        self.listener_count() == 0
    }

    /// Delivers `batch` to every listener still registered at call time.
    pub fn publish(&self, batch: &[TransactionRecord]) {
        let ids: Vec<u64> = self.inner.borrow().entries.iter().map(|(id, _)| *id).collect();
        for id in ids {
            // A listener may release itself or others while we iterate.
            let listener = self
                .inner
                .borrow()
                .entries
                .iter()
                .find(|(i, _)| *i == id)
                .map(|(_, l)| Rc::clone(l));
            if let Some(listener) = listener {
                listener(batch.to_vec());
            }
        }
    }

    fn release(inner: &Weak<RefCell<Listeners>>, id: u64) {
        if let Some(inner) = inner.upgrade() {
            inner.borrow_mut().entries.retain(|(i, _)| *i != id);
        }
    }
}

impl TransactionFeed for FeedChannel {
    fn subscribe(&self, on_batch: BatchListener) -> Subscription {
        let id = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.entries.push((id, Rc::from(on_batch)));
            id
        };

        let weak = Rc::downgrade(&self.inner);
        Subscription::new(move || FeedChannel::release(&weak, id))
    }
}

struct SharedState<U> {
    upstream: U,
    channel: FeedChannel,
    latest: RefCell<Option<Vec<TransactionRecord>>>,
    link: RefCell<Option<Subscription>>,
}

impl<U: TransactionFeed + 'static> SharedState<U> {
    fn deliver(&self, batch: Vec<TransactionRecord>) {
        if self.latest.borrow().as_ref() == Some(&batch) {
            trace!(rows = batch.len(), "transaction batch unchanged");
            return;
        }
        *self.latest.borrow_mut() = Some(batch.clone());
        self.channel.publish(&batch);
    }

    fn open(self: &Rc<Self>) {
        if self.link.borrow().is_some() {
            return;
        }
        let weak = Rc::downgrade(self);
        let link = self.upstream.subscribe(Box::new(move |batch| {
            if let Some(state) = weak.upgrade() {
                state.deliver(batch);
            }
        }));
        *self.link.borrow_mut() = Some(link);
        debug!("transaction feed opened");
        // Upstream may deliver synchronously and every listener may leave meanwhile.
        self.close_if_idle();
    }

    fn close_if_idle(&self) {
        if !self.channel.is_idle() {
            return;
        }
        let link = self.link.borrow_mut().take();
        if link.is_some() {
            self.latest.borrow_mut().take();
            drop(link);
            debug!("transaction feed closed");
        }
    }
}

/// Shares one upstream subscription among any number of listeners.
///
/// The upstream is opened by the first listener and released with the last
/// one. Identical consecutive batches are published once, and a listener
/// joining while the feed is open first receives the latest batch.
pub struct SharedFeed<U> {
    state: Rc<SharedState<U>>,
}

impl<U> Clone for SharedFeed<U> {
    fn clone(&self) -> Self {
        Self { state: Rc::clone(&self.state) }
    }
}

impl<U: TransactionFeed + 'static> SharedFeed<U> {
    pub fn new(upstream: U) -> Self {
        Self {
            state: Rc::new(SharedState {
                upstream,
                channel: FeedChannel::new(),
                latest: RefCell::new(None),
                link: RefCell::new(None),
            }),
        }
    }

    pub fn upstream(&self) -> &U {
        &self.state.upstream
    }

    pub fn is_open(&self) -> bool {
        self.state.link.borrow().is_some()
    }

    pub fn listener_count(&self) -> usize {
        self.state.channel.listener_count()
    }

    pub fn latest(&self) -> Option<Vec<TransactionRecord>> {
        self.state.latest.borrow().clone()
    }
}

impl<U: TransactionFeed + 'static> TransactionFeed for SharedFeed<U> {
    fn subscribe(&self, on_batch: BatchListener) -> Subscription {
        let cached = self.state.latest.borrow().clone();
        if let Some(batch) = cached {
            on_batch(batch);
        }
        let inner = self.state.channel.subscribe(on_batch);
        self.state.open();

        let weak = Rc::downgrade(&self.state);
        Subscription::new(move || {
            drop(inner);
            if let Some(state) = weak.upgrade() {
                state.close_if_idle();
            }
        })
    }
}
