use ai_core::EntityId;

use crate::PerceptionEvent;

/// Destination for events produced by sensors and rules.
pub trait PerceptionEventSink<A: EntityId> {
    /// Push into the local queue of `target`. Returns `false` if `target` has no queue.
    fn push_local(&mut self, target: A, event: PerceptionEvent<A>) -> bool;

    fn push_global(&mut self, event: PerceptionEvent<A>);
}

/// Sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEventSink;

impl<A: EntityId> PerceptionEventSink<A> for NullEventSink {
    fn push_local(&mut self, _target: A, _event: PerceptionEvent<A>) -> bool {
        false
    }

    fn push_global(&mut self, _event: PerceptionEvent<A>) {}
}

/// Buffers events for delivery once the producer has released its borrows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventOutbox<A> {
    pub local: Vec<(A, PerceptionEvent<A>)>,
    pub global: Vec<PerceptionEvent<A>>,
}

impl<A: EntityId> EventOutbox<A> {
    pub fn new() -> Self {
        Self {
            local: Vec::new(),
            global: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.local.is_empty() && self.global.is_empty()
    }

    /// Forward everything to `sink` in push order, returning the number of local events it accepted.
    pub fn deliver<S>(&mut self, sink: &mut S) -> usize
    where
        S: PerceptionEventSink<A> + ?Sized,
    {
        let mut accepted = 0;
        for (target, event) in self.local.drain(..) {
            if sink.push_local(target, event) {
                accepted += 1;
            }
        }
        for event in self.global.drain(..) {
            sink.push_global(event);
        }
        accepted
    }
}

impl<A: EntityId> Default for EventOutbox<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: EntityId> PerceptionEventSink<A> for EventOutbox<A> {
    fn push_local(&mut self, target: A, event: PerceptionEvent<A>) -> bool {
        self.local.push((target, event));
        true
    }

    fn push_global(&mut self, event: PerceptionEvent<A>) {
        self.global.push(event);
    }
}
