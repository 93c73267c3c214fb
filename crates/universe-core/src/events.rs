//! Change notifications from the universe to its observers (UI, renderers).
//!
//! Subscribing returns a [`Subscription`]; dropping it unsubscribes. Callbacks
//! run synchronously on the control thread, in subscription order.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use fnv::FnvHashMap;

use crate::audio::GraphState;
use crate::params::PhysicsParameters;
use crate::particles::ParticleId;

#[derive(Clone, Debug, PartialEq)]
pub enum UniverseEvent {
    ParametersChanged(PhysicsParameters),
    ParticleSpawned(ParticleId),
    AudioStateChanged(GraphState),
}

type Callback = Box<dyn FnMut(&UniverseEvent)>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    callbacks: FnvHashMap<u64, Callback>,
    order: Vec<u64>,
    // ids dropped while their callback was taken out for dispatch
    removed: Vec<u64>,
}

#[derive(Clone, Default)]
pub struct EventBus {
    inner: Rc<RefCell<Listeners>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, callback: impl FnMut(&UniverseEvent) + 'static) -> Subscription {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.callbacks.insert(id, Box::new(callback));
        inner.order.push(id);
        Subscription {
            id,
            bus: Rc::downgrade(&self.inner),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.borrow().order.len()
    }

    /// Deliver `event` to every current listener.
    ///
    /// Each callback is taken out of the map while it runs, so it may
    /// subscribe or drop subscriptions without re-borrowing the bus.
    pub fn emit(&self, event: &UniverseEvent) {
        let ids = self.inner.borrow().order.clone();
        for id in ids {
            let taken = self.inner.borrow_mut().callbacks.remove(&id);
            let Some(mut callback) = taken else { continue };
            callback(event);
            let mut inner = self.inner.borrow_mut();
            if let Some(pos) = inner.removed.iter().position(|&r| r == id) {
                inner.removed.swap_remove(pos);
            } else {
                inner.callbacks.insert(id, callback);
            }
        }
    }
}

/// Live registration on an [`EventBus`]. Unsubscribes on drop.
pub struct Subscription {
    id: u64,
    bus: Weak<RefCell<Listeners>>,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(bus) = self.bus.upgrade() else { return };
        let Ok(mut inner) = bus.try_borrow_mut() else {
            log::warn!("[universe] subscription {} dropped while bus borrowed", self.id);
            return;
        };
        inner.order.retain(|&id| id != self.id);
        if inner.callbacks.remove(&self.id).is_none() {
            // currently dispatching; emit discards it on return
            inner.removed.push(self.id);
        }
    }
}
