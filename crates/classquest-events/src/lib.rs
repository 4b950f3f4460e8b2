//! In-process event bus for ClassQuest side effects.
//!
//! State changes emit [`AppEvent`]s; sound and animation effects subscribe
//! to them. Delivery is synchronous and single-threaded: a handler failure
//! is logged and never reaches the emitter.
//!
//! # Modules
//!
//! - [`event`] -- The closed set of events and their kind tags.
//! - [`bus`] -- Subscription, emission, and failure isolation.
//! - [`coalesce`] -- Priority-based coalescing of bursty sound cues.

pub mod bus;
pub mod coalesce;
pub mod event;

pub use bus::{EmitReport, EventBus, HandlerError, HandlerResult, Subscription};
pub use coalesce::{CoalescingQueue, DEFAULT_COALESCE_WINDOW, SoundCue, attach_sound_queue};
pub use event::{AppEvent, EventKind};
