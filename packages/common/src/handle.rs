//! Shared, re-entrant front for a [`RecordingSession`]
//!
//! `start` holds the session across permission prompts. Settings chosen in
//! the meantime are kept in the cached status and applied once the session
//! is free again, and a `stop` issued during the prompt is replayed as soon
//! as `start` returns.

use std::cell::{Cell, RefCell, RefMut};
use std::rc::{Rc, Weak};
use tracing::{debug, trace};

use crate::capture::MediaTrack;
use crate::config::RecorderConfig;
use crate::error::{SessionError, SessionResult};
use crate::format::{Format, Quality};
use crate::recorder::{Collaborators, RecordingSession};
use crate::session::SessionStatus;

struct Shared<T: MediaTrack> {
    session: RefCell<RecordingSession<T>>,
    status: Cell<SessionStatus>,
    stop_requested: Cell<bool>,
    last_error: RefCell<Option<String>>,
}

/// Cloneable handle to one recording session
pub struct SessionHandle<T: MediaTrack> {
    shared: Rc<Shared<T>>,
}

impl<T: MediaTrack> Clone for SessionHandle<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

/// Non-owning handle, for callbacks owned by the session's own collaborators
pub struct WeakSessionHandle<T: MediaTrack> {
    shared: Weak<Shared<T>>,
}

impl<T: MediaTrack> Clone for WeakSessionHandle<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T: MediaTrack> WeakSessionHandle<T> {
    pub fn upgrade(&self) -> Option<SessionHandle<T>> {
        self.shared.upgrade().map(|shared| SessionHandle { shared })
    }
}

impl<T: MediaTrack> SessionHandle<T> {
    pub fn new(config: RecorderConfig, collaborators: Collaborators<T>) -> Self {
        Self::new_cyclic(config, |_| collaborators)
    }

    /// Build the collaborators with a weak handle back to this session
    pub fn new_cyclic<F>(config: RecorderConfig, make: F) -> Self
    where
        F: FnOnce(WeakSessionHandle<T>) -> Collaborators<T>,
    {
        let status = SessionStatus {
            is_recording: false,
            is_paused: false,
            is_mic_enabled: config.mic_enabled,
            video_format: config.format,
            video_quality: config.quality,
        };

        let shared = Rc::new_cyclic(|weak: &Weak<Shared<T>>| {
            let collaborators = make(WeakSessionHandle {
                shared: weak.clone(),
            });
            Shared {
                session: RefCell::new(RecordingSession::new(config, collaborators)),
                status: Cell::new(status),
                stop_requested: Cell::new(false),
                last_error: RefCell::new(None),
            }
        });
        Self { shared }
    }

    pub fn downgrade(&self) -> WeakSessionHandle<T> {
        WeakSessionHandle {
            shared: Rc::downgrade(&self.shared),
        }
    }

    /// Latest status, including settings not yet applied to a busy session
    pub fn status(&self) -> SessionStatus {
        self.shared.status.get()
    }

    pub fn last_error(&self) -> Option<String> {
        self.shared.last_error.borrow().clone()
    }

    /// True while `start` is waiting on capture permission
    pub fn is_starting(&self) -> bool {
        self.shared.session.try_borrow_mut().is_err()
    }

    /// Start a session with the current settings.
    ///
    /// # Errors
    ///
    /// `Busy` if another start is still waiting on capture permission,
    /// otherwise whatever [`RecordingSession::start`] reports.
    pub async fn start(&self) -> SessionResult<()> {
        let result = {
            let mut session = self
                .shared
                .session
                .try_borrow_mut()
                .map_err(|_| SessionError::Busy)?;
            self.shared.stop_requested.set(false);
            self.apply_settings(&mut session);
            session.start().await
        };
        self.sync();
        result
    }

    /// Stop the session. During a pending start the stop is applied as soon
    /// as the start completes.
    pub fn stop(&self) {
        match self.shared.session.try_borrow_mut() {
            Ok(mut session) => session.stop(),
            Err(_) => {
                debug!("Stop requested during start, deferring");
                self.shared.stop_requested.set(true);
            }
        }
        self.sync();
    }

    /// Toggle pause. Nothing is recording yet during a pending start.
    pub fn pause(&self) {
        match self.shared.session.try_borrow_mut() {
            Ok(mut session) => session.pause(),
            Err(_) => debug!("Pause ignored during start"),
        }
        self.sync();
    }

    pub fn toggle_mic(&self) {
        self.update(|status| status.is_mic_enabled = !status.is_mic_enabled);
    }

    pub fn set_format(&self, format: Format) {
        self.update(|status| status.video_format = format);
    }

    pub fn set_quality(&self, quality: Quality) {
        self.update(|status| status.video_quality = quality);
    }

    /// Apply pending settings, deferred stops and queued encoder events.
    /// Returns whether the status changed.
    pub fn sync(&self) -> bool {
        let current = match self.shared.session.try_borrow_mut() {
            Ok(mut session) => {
                self.apply_settings(&mut session);
                if self.shared.stop_requested.take() {
                    session.stop();
                }
                session.process_events();
                *self.shared.last_error.borrow_mut() =
                    session.last_error().map(ToString::to_string);
                session.status()
            }
            Err(_) => {
                trace!("Session busy, sync deferred");
                return false;
            }
        };

        let changed = current != self.shared.status.get();
        self.shared.status.set(current);
        changed
    }

    fn update(&self, change: impl FnOnce(&mut SessionStatus)) {
        let mut status = self.shared.status.get();
        change(&mut status);
        self.shared.status.set(status);
        self.sync();
    }

    fn apply_settings(&self, session: &mut RefMut<'_, RecordingSession<T>>) {
        let wanted = self.shared.status.get();
        if session.format() != wanted.video_format {
            session.set_format(wanted.video_format);
        }
        if session.quality() != wanted.video_quality {
            session.set_quality(wanted.video_quality);
        }
        if session.is_mic_enabled() != wanted.is_mic_enabled {
            session.set_mic_enabled(wanted.is_mic_enabled);
        }
    }
}
