//! Timer and task events delivered to the recorder loop

use super::machine::StartRequest;
use crate::error::Result;
use crate::output::FinalizeOutcome;
use tokio::sync::mpsc;

/// Generation of events that do not belong to a session
pub(crate) const IDLE_GENERATION: u64 = 0;

#[derive(Debug)]
pub(crate) enum SessionEvent {
    CountdownTick(u32),
    CountdownDone,
    Tick,
    Flush,
    AutoStop,
    Finalized(Result<FinalizeOutcome>),
    ScheduledStart(StartRequest),
}

/// Event tagged with the session generation that produced it
#[derive(Debug)]
pub(crate) struct Envelope {
    pub generation: u64,
    pub event: SessionEvent,
}

/// Sending half handed to timer tasks
#[derive(Debug, Clone)]
pub(crate) struct EventSender {
    generation: u64,
    tx: mpsc::UnboundedSender<Envelope>,
}

impl EventSender {
    pub fn new(generation: u64, tx: mpsc::UnboundedSender<Envelope>) -> Self {
        Self { generation, tx }
    }

    /// False once the recorder loop is gone
    pub fn send(&self, event: SessionEvent) -> bool {
        self.tx
            .send(Envelope {
                generation: self.generation,
                event,
            })
            .is_ok()
    }
}
