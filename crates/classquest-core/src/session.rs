//! A running classroom session.
//!
//! A [`Session`] owns the current document, the [`EventBus`] effects hang
//! off, and the [`BlobStore`] holding uploaded media. All three are
//! explicitly owned; nothing in this crate is a process-wide singleton.
//!
//! State changes come in two flavours:
//!
//! - [`Session::commit`] is an in-session transition (an award, a badge).
//!   It refreshes the class progress cache and emits the resulting domain
//!   events.
//! - [`Session::replace`], [`Session::import`], and [`Session::reset`] swap
//!   the whole document. No domain events fire and any pending sound cue is
//!   discarded.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::rc::Rc;
use std::time::Instant;

use classquest_blobs::{BlobError, BlobStore};
use classquest_events::{
    AppEvent, CoalescingQueue, EmitReport, EventBus, SoundCue, Subscription, attach_sound_queue,
};
use classquest_schema::FieldRepair;
use classquest_types::{AppState, BadgeId, ClassProgressCache, Student};

use crate::config::{ClassQuestConfig, DefaultsConfig};
use crate::document::DocumentFile;
use crate::error::DocumentError;
use crate::initial::create_initial_state;
use crate::selectors;

/// The live document with its event bus and blob store.
#[derive(Debug)]
pub struct Session {
    state: AppState,
    defaults: DefaultsConfig,
    document: DocumentFile,
    bus: EventBus,
    blobs: BlobStore,
    sounds: Rc<RefCell<CoalescingQueue>>,
    sound_subscriptions: Vec<Subscription>,
}

impl Session {
    /// Assemble a session around an already canonical document.
    pub fn new(config: &ClassQuestConfig, state: AppState, blobs: BlobStore) -> Self {
        let bus = EventBus::new();
        let sounds = Rc::new(RefCell::new(CoalescingQueue::new(
            config.effects.coalesce_window(),
        )));
        let sound_subscriptions = attach_sound_queue(&bus, &sounds);
        let mut session = Self {
            state,
            defaults: config.defaults.clone(),
            document: DocumentFile::new(config.storage.document_path.clone()),
            bus,
            blobs,
            sounds,
            sound_subscriptions,
        };
        session.refresh_class_progress();
        session
    }

    /// Open the configured document and blob directory.
    ///
    /// A missing document starts a fresh one from `config.defaults`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError`] if the document exists but cannot be read
    /// or decoded.
    pub async fn open(config: &ClassQuestConfig) -> Result<Self, DocumentError> {
        let document = DocumentFile::new(config.storage.document_path.clone());
        let state = match document.load().await? {
            Some(decoded) => decoded.state,
            None => {
                tracing::info!(
                    path = %document.path().display(),
                    "Starting a fresh document"
                );
                create_initial_state(&config.defaults)
            }
        };
        let blobs = BlobStore::open(config.storage.blob_dir.clone()).await;
        Ok(Self::new(config, state, blobs))
    }

    /// The current document.
    pub const fn state(&self) -> &AppState {
        &self.state
    }

    /// The session's event bus.
    pub const fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// The session's blob store.
    pub const fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    /// The document file the session saves to.
    pub const fn document(&self) -> &DocumentFile {
        &self.document
    }

    /// The sound cue due at `now`, if any.
    pub fn poll_sound(&self, now: Instant) -> Option<SoundCue> {
        self.sounds.borrow_mut().poll(now)
    }

    /// Stop feeding domain events into the sound queue.
    pub fn mute_sounds(&mut self) {
        for subscription in self.sound_subscriptions.drain(..) {
            subscription.unsubscribe();
        }
        self.sounds.borrow_mut().reset();
    }

    /// Apply an in-session transition and emit the domain events it
    /// implies.
    ///
    /// Events are emitted in this order: one `XpGranted` if the class total
    /// changed, a `LevelUp` per student whose level rose, a `BadgeAwarded`
    /// per newly held badge, and one `ClassMilestone` if the class earned
    /// stars.
    pub fn commit(&mut self, next: AppState) -> Vec<AppEvent> {
        let before = std::mem::replace(&mut self.state, next);
        self.refresh_class_progress();
        let events = transition_events(&before, &self.state);
        let mut report = EmitReport::default();
        for event in &events {
            let outcome = self.bus.emit(event);
            report.delivered = report.delivered.saturating_add(outcome.delivered);
            report.failed = report.failed.saturating_add(outcome.failed);
        }
        tracing::debug!(
            events = events.len(),
            delivered = report.delivered,
            failed = report.failed,
            "Committed transition"
        );
        events
    }

    /// Swap in a whole new document without emitting domain events.
    pub fn replace(&mut self, state: AppState) {
        self.state = state;
        self.refresh_class_progress();
        self.sounds.borrow_mut().reset();
    }

    /// Replace the document with imported text.
    ///
    /// The text is sanitized and migrated first. On failure the current
    /// document is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Structural`] or
    /// [`DocumentError::Migration`] if the text cannot be accepted.
    pub fn import(&mut self, text: &str) -> Result<Vec<FieldRepair>, DocumentError> {
        let decoded = DocumentFile::decode_report(text)?;
        tracing::info!(
            stored_version = decoded.stored_version,
            repairs = decoded.repairs.len(),
            students = decoded.state.students.len(),
            "Imported document"
        );
        self.replace(decoded.state);
        Ok(decoded.repairs)
    }

    /// The current document as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Encode`] if serialization fails.
    pub fn export(&self) -> Result<String, DocumentError> {
        DocumentFile::encode(&self.state)
    }

    /// Start over with a fresh document.
    ///
    /// Blobs are kept; the bus keeps its subscribers.
    pub fn reset(&mut self) {
        tracing::info!("Resetting to a fresh document");
        self.replace(create_initial_state(&self.defaults));
    }

    /// Write the current document to its file.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError`] if encoding or writing fails.
    pub async fn save(&self) -> Result<(), DocumentError> {
        self.document.save(&self.state).await
    }

    /// Blob keys the document references that the blob store does not hold.
    ///
    /// Exports carry keys but not bytes, so an imported document commonly
    /// points at media that has to be uploaded again.
    ///
    /// # Errors
    ///
    /// Returns [`BlobError`] if the store cannot be queried.
    pub async fn unlinked_asset_keys(&self) -> Result<Vec<String>, BlobError> {
        let mut missing = Vec::new();
        for key in referenced_blob_keys(&self.state) {
            if !self.blobs.contains(key).await? {
                missing.push(key.to_owned());
            }
        }
        if !missing.is_empty() {
            tracing::debug!(count = missing.len(), "Document references missing blobs");
        }
        Ok(missing)
    }

    fn refresh_class_progress(&mut self) {
        let progress = selectors::class_progress(&self.state);
        self.state.class_progress = Some(ClassProgressCache {
            total_xp: progress.total_xp,
            stars: progress.stars,
        });
    }
}

/// Every blob key the document refers to, sorted and deduplicated.
///
/// Binding values name asset-library entries and resolve to that entry's
/// key; a value with no library entry is taken as a key itself.
pub fn referenced_blob_keys(state: &AppState) -> BTreeSet<&str> {
    let settings = &state.settings;
    let library = settings.assets.library.values().map(|asset| asset.key.as_str());
    let bindings = [
        &settings.assets.bindings.audio,
        &settings.assets.bindings.lottie,
        &settings.assets.bindings.image,
    ]
    .into_iter()
    .flat_map(|map| map.values())
    .map(|id| {
        let id = id.trim();
        settings
            .assets
            .library
            .get(id)
            .map_or(id, |asset| asset.key.as_str())
    });
    let avatars = state
        .students
        .iter()
        .flat_map(|s| s.avatar_pack.stage_keys.iter().flatten().map(String::as_str));
    let student_badges = state
        .students
        .iter()
        .flat_map(|s| s.badges.iter().filter_map(|b| b.icon_key.as_deref()));
    let badge_defs = state.badge_defs.iter().filter_map(|d| d.icon_key.as_deref());

    library
        .chain(bindings)
        .chain(avatars)
        .chain(student_badges)
        .chain(badge_defs)
        .chain(settings.class_star_icon_key.as_deref())
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .collect()
}

fn transition_events(before: &AppState, after: &AppState) -> Vec<AppEvent> {
    let mut events = Vec::new();
    let old_progress = selectors::class_progress(before);
    let new_progress = selectors::class_progress(after);

    let old_sum = xp_sum(&before.students);
    let new_sum = xp_sum(&after.students);
    if old_sum != new_sum {
        events.push(AppEvent::XpGranted {
            amount: new_sum.saturating_sub(old_sum),
            new_segment_xp: new_progress.step_xp,
        });
    }

    let previous: HashMap<&str, &Student> =
        before.students.iter().map(|s| (s.id.as_str(), s)).collect();
    for student in &after.students {
        let Some(old) = previous.get(student.id.as_str()) else {
            continue;
        };
        if student.level > old.level {
            events.push(AppEvent::LevelUp {
                new_level: student.level,
                student_id: Some(student.id.as_str().to_owned()),
            });
        }
    }
    for student in &after.students {
        let held: HashSet<&BadgeId> = previous
            .get(student.id.as_str())
            .map(|old| old.badges.iter().map(|b| &b.id).collect())
            .unwrap_or_default();
        for badge in student.badges.iter().filter(|b| !held.contains(&b.id)) {
            events.push(AppEvent::BadgeAwarded {
                badge_id: badge.id.as_str().to_owned(),
                student_id: Some(student.id.as_str().to_owned()),
            });
        }
    }

    if new_progress.stars > old_progress.stars {
        events.push(AppEvent::ClassMilestone {
            stars: new_progress.stars,
        });
    }
    events
}

fn xp_sum(students: &[Student]) -> i64 {
    students.iter().fold(0_i64, |sum, s| sum.saturating_add(s.xp))
}
