//! Recorder module
//!
//! Provides:
//! - the recorder state machine and its handle
//! - capture sessions (tracks, compositor, encoder, timers)
//! - the timer task scheduler
//! - session lifecycle hooks (auto-stop, audio meter, overlays)

mod chunks;
mod events;
mod hooks;
mod machine;
mod scheduler;
mod session;
mod state;

pub use chunks::ChunkSequence;
pub use hooks::{
    default_hooks, AudioMeterHook, AutoStopHook, EffectsOverlayHook, HookContext, SessionHook,
    TimerOverlayHook, AUDIO_METER_INTERVAL,
};
pub use machine::{
    Recorder, RecorderHandle, RecorderStatus, StartRequest, FLUSH_INTERVAL, TICK_INTERVAL,
};
pub use scheduler::{delay_until, Scheduler, TaskKind};
pub use session::{SessionFactory, SessionGuard};
pub use state::{format_hms, ElapsedTime, RecorderState, TimerState};
