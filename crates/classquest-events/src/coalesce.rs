//! Coalescing of bursty effects.
//!
//! Awarding a quest to a whole team emits a burst of `XpGranted`,
//! `LevelUp`, and `BadgeAwarded` events within a few milliseconds. Playing
//! a sound for each would be noise, so cues are collected for a short
//! window and only the most important one fires.
//!
//! The queue holds at most one pending cue. A later cue with a higher
//! priority replaces it without restarting the window; a lower or equal one
//! is dropped. Cancelling means discarding the pending cue with
//! [`CoalescingQueue::reset`] before it is polled. The queue never reads
//! the clock itself: callers pass `now`, which keeps it deterministic.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::bus::{EventBus, Subscription};
use crate::event::{AppEvent, EventKind};

/// Default coalescing window.
pub const DEFAULT_COALESCE_WINDOW: Duration = Duration::from_millis(150);

/// A sound effect triggered by a domain event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundCue {
    /// XP was granted.
    XpGrant,
    /// A student levelled up.
    LevelUp,
    /// A badge was awarded.
    BadgeAward,
}

impl SoundCue {
    /// Relative importance; higher wins within one window.
    pub const fn priority(self) -> u8 {
        match self {
            Self::XpGrant => 1,
            Self::LevelUp => 2,
            Self::BadgeAward => 3,
        }
    }

    /// The cue for an event, if the event has one.
    pub const fn for_event(event: &AppEvent) -> Option<Self> {
        match event {
            AppEvent::XpGranted { .. } => Some(Self::XpGrant),
            AppEvent::LevelUp { .. } => Some(Self::LevelUp),
            AppEvent::BadgeAwarded { .. } => Some(Self::BadgeAward),
            AppEvent::ClassMilestone { .. }
            | AppEvent::AvatarPresented { .. }
            | AppEvent::BadgeFlyIn { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    cue: SoundCue,
    due: Instant,
}

/// Single-slot, priority-based coalescing queue.
#[derive(Debug, Clone)]
pub struct CoalescingQueue {
    window: Duration,
    pending: Option<Pending>,
}

impl Default for CoalescingQueue {
    fn default() -> Self {
        Self::new(DEFAULT_COALESCE_WINDOW)
    }
}

impl CoalescingQueue {
    /// Create an empty queue with the given window.
    pub const fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    /// Queue `cue` at time `now`.
    pub fn queue(&mut self, cue: SoundCue, now: Instant) {
        match &mut self.pending {
            None => {
                let due = now.checked_add(self.window).unwrap_or(now);
                self.pending = Some(Pending { cue, due });
            }
            Some(pending) => {
                if cue.priority() > pending.cue.priority() {
                    pending.cue = cue;
                }
            }
        }
    }

    /// Take the pending cue if its window has elapsed at `now`.
    pub fn poll(&mut self, now: Instant) -> Option<SoundCue> {
        let due = self.pending.as_ref()?.due;
        if now < due {
            return None;
        }
        self.pending.take().map(|p| p.cue)
    }

    /// Discard the pending cue, returning it.
    pub fn reset(&mut self) -> Option<SoundCue> {
        self.pending.take().map(|p| p.cue)
    }

    /// Whether a cue is waiting.
    pub const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// When the pending cue becomes due.
    pub fn due_at(&self) -> Option<Instant> {
        self.pending.map(|p| p.due)
    }
}

/// Feed every cue-bearing event on `bus` into `queue`, stamped with the
/// current time.
///
/// Returns the subscriptions so the caller can detach the queue again.
pub fn attach_sound_queue(
    bus: &EventBus,
    queue: &Rc<RefCell<CoalescingQueue>>,
) -> Vec<Subscription> {
    [EventKind::XpGranted, EventKind::LevelUp, EventKind::BadgeAwarded]
        .into_iter()
        .map(|kind| {
            let queue = Rc::clone(queue);
            bus.subscribe(kind, move |event: &AppEvent| {
                if let Some(cue) = SoundCue::for_event(event) {
                    queue.borrow_mut().queue(cue, Instant::now());
                }
                Ok(())
            })
        })
        .collect()
}
