//! Engine lifecycle events and the named-topic subscriber bus.

use std::collections::HashMap;

use rt_ir::InstrumentId;

/// A lifecycle signal emitted by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineEvent {
    PlayStart,
    PlayStop,
    RowChange { row: u16 },
    ProjectLoaded,
    SampleLoaded { instrument: InstrumentId },
}

/// Subscription topics, one per event kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Topic {
    PlayStart,
    PlayStop,
    RowChange,
    ProjectLoaded,
    SampleLoaded,
}

impl EngineEvent {
    pub fn topic(&self) -> Topic {
        match self {
            EngineEvent::PlayStart => Topic::PlayStart,
            EngineEvent::PlayStop => Topic::PlayStop,
            EngineEvent::RowChange { .. } => Topic::RowChange,
            EngineEvent::ProjectLoaded => Topic::ProjectLoaded,
            EngineEvent::SampleLoaded { .. } => Topic::SampleLoaded,
        }
    }
}

/// Handle returned by [`EventBus::on`], used to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubscriptionId(u64);

type Callback = Box<dyn FnMut(&EngineEvent) + Send>;

/// Fan-out bus with synchronous delivery.
///
/// Usage contract: callbacks run on the thread that pumps events and must
/// not call back into mutating engine operations.
#[derive(Default)]
pub struct EventBus {
    next_id: u64,
    subscribers: HashMap<Topic, Vec<(SubscriptionId, Callback)>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to a topic.
    pub fn on(&mut self, topic: Topic, callback: Callback) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.subscribers.entry(topic).or_default().push((id, callback));
        id
    }

    /// Remove a subscription. Returns whether it existed.
    pub fn off(&mut self, topic: Topic, id: SubscriptionId) -> bool {
        let Some(list) = self.subscribers.get_mut(&topic) else {
            return false;
        };
        let before = list.len();
        list.retain(|(sub_id, _)| *sub_id != id);
        list.len() != before
    }

    /// Deliver an event to every subscriber of its topic.
    pub fn emit(&mut self, event: &EngineEvent) {
        if let Some(list) = self.subscribers.get_mut(&event.topic()) {
            for (_, callback) in list {
                callback(event);
            }
        }
    }
}
