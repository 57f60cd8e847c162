//! Event bus that records everything it is told.

use std::collections::BTreeSet;

use harvest_core::components::EntityId;
use harvest_core::events::{Continuation, HarvestEvent};
use harvest_core::world::EventBus;

/// In-memory [`EventBus`] keeping the live registrations and every
/// published notification.
#[derive(Debug, Clone, Default)]
pub struct RecordingBus {
    subscriptions: BTreeSet<(EntityId, Continuation)>,
    events: Vec<HarvestEvent>,
    duplicate_subscriptions: usize,
    stray_unsubscriptions: usize,
}

impl RecordingBus {
    /// Create an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether a continuation is registered.
    #[must_use]
    pub fn is_subscribed(&self, entity: EntityId, continuation: Continuation) -> bool {
        self.subscriptions.contains(&(entity, continuation))
    }

    /// Continuations registered for an entity.
    #[must_use]
    pub fn subscriptions(&self, entity: EntityId) -> BTreeSet<Continuation> {
        self.subscriptions
            .iter()
            .filter(|(e, _)| *e == entity)
            .map(|&(_, c)| c)
            .collect()
    }

    /// Total number of live registrations.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Every notification published so far.
    #[must_use]
    pub fn events(&self) -> &[HarvestEvent] {
        &self.events
    }

    /// Drain the published notifications.
    pub fn take_events(&mut self) -> Vec<HarvestEvent> {
        std::mem::take(&mut self.events)
    }

    /// Number of published notifications accepted by `filter`.
    pub fn count(&self, filter: impl Fn(&HarvestEvent) -> bool) -> usize {
        self.events.iter().filter(|e| filter(e)).count()
    }

    /// Registrations of an already registered continuation.
    #[must_use]
    pub fn duplicate_subscriptions(&self) -> usize {
        self.duplicate_subscriptions
    }

    /// Cancellations of a continuation that was not registered.
    #[must_use]
    pub fn stray_unsubscriptions(&self) -> usize {
        self.stray_unsubscriptions
    }
}

impl EventBus for RecordingBus {
    fn subscribe(&mut self, entity: EntityId, continuation: Continuation) {
        if !self.subscriptions.insert((entity, continuation)) {
            self.duplicate_subscriptions += 1;
        }
    }

    fn unsubscribe(&mut self, entity: EntityId, continuation: Continuation) {
        if !self.subscriptions.remove(&(entity, continuation)) {
            self.stray_unsubscriptions += 1;
        }
    }

    fn publish(&mut self, event: HarvestEvent) {
        self.events.push(event);
    }
}
