//! Concurrent session registry

use attention::{FrameAnalysis, SessionConfig};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use landmarks::FrameObservation;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::session::{Mode, Session, SessionId, SessionSnapshot};
use crate::summary::Summary;
use crate::SessionError;

/// What `process` does when another frame for the same session is in flight
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentionPolicy {
    /// Wait for the other frame, then apply in arrival order
    #[default]
    Queue,
    /// Fail fast with `SessionError::Busy`
    Reject,
}

/// Registry entry. The mode is immutable, so it lives outside the lock.
#[derive(Debug, Clone)]
struct SessionHandle {
    mode: Mode,
    session: Arc<Mutex<Session>>,
}

/// Registry of live sessions.
///
/// Operations on different sessions never block each other. Frames for one
/// session are applied one at a time.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<SessionId, SessionHandle>,
    contention: ContentionPolicy,
}

impl SessionStore {
    pub fn new(contention: ContentionPolicy) -> Self {
        info!(?contention, "Session store created");
        Self {
            sessions: DashMap::new(),
            contention,
        }
    }

    pub fn contention(&self) -> ContentionPolicy {
        self.contention
    }

    /// Start a session and return its identifier
    pub fn create(&self, mode: Mode, config: SessionConfig) -> Result<SessionId, SessionError> {
        config.validate()?;

        let id = SessionId::new();
        match self.sessions.entry(id) {
            Entry::Occupied(_) => Err(SessionError::IdCollision(id)),
            Entry::Vacant(slot) => {
                slot.insert(SessionHandle {
                    mode,
                    session: Arc::new(Mutex::new(Session::new(id, mode, config, Instant::now()))),
                });
                info!(session_id = %id, %mode, "Session started");
                Ok(id)
            }
        }
    }

    /// Current counters of a live session
    pub fn get(&self, id: &SessionId) -> Result<SessionSnapshot, SessionError> {
        self.inspect(id, |session| session.snapshot(Instant::now()))
    }

    /// Mode of a live session, without waiting on its lock
    pub fn mode(&self, id: &SessionId) -> Result<Mode, SessionError> {
        self.sessions
            .get(id)
            .map(|entry| entry.mode)
            .ok_or(SessionError::NotFound(*id))
    }

    /// Run `f` against a live session while holding its lock
    pub fn inspect<R>(&self, id: &SessionId, f: impl FnOnce(&Session) -> R) -> Result<R, SessionError> {
        let handle = self.handle(id)?;
        let session = self.lock(id, &handle.session)?;
        if session.is_closed() {
            return Err(SessionError::NotFound(*id));
        }
        Ok(f(&session))
    }

    /// Analyze one frame for the `feature` endpoint the client called
    pub fn process(
        &self,
        id: &SessionId,
        feature: Mode,
        observation: &FrameObservation,
    ) -> Result<FrameAnalysis, SessionError> {
        self.process_at(id, feature, observation, Instant::now())
    }

    /// `process` with an explicit clock reading
    pub fn process_at(
        &self,
        id: &SessionId,
        feature: Mode,
        observation: &FrameObservation,
        now: Instant,
    ) -> Result<FrameAnalysis, SessionError> {
        let handle = self.handle(id)?;
        let mut session = self.lock(id, &handle.session)?;
        let analysis = session.process(feature, observation, now)?;
        debug!(
            session_id = %id,
            frame = analysis.frame_index,
            face = analysis.face_detected,
            "Frame processed"
        );
        Ok(analysis)
    }

    /// Stop a session and return its summary.
    ///
    /// The session is unregistered first, then any in-flight frame is allowed
    /// to finish before the summary is taken.
    pub fn destroy(&self, id: &SessionId) -> Result<Summary, SessionError> {
        let (_, handle) = self
            .sessions
            .remove(id)
            .ok_or(SessionError::NotFound(*id))?;
        Ok(finish(id, &handle))
    }

    /// `destroy`, only if the session was started for `feature`
    pub fn stop(&self, id: &SessionId, feature: Mode) -> Result<Summary, SessionError> {
        if let Some((_, handle)) = self.sessions.remove_if(id, |_, handle| handle.mode == feature) {
            return Ok(finish(id, &handle));
        }
        match self.sessions.get(id) {
            Some(entry) => Err(SessionError::InvalidMode {
                session: entry.mode,
                requested: feature,
            }),
            None => Err(SessionError::NotFound(*id)),
        }
    }

    /// Destroy every session idle for at least `max_idle`
    pub fn reap_idle(&self, max_idle: Duration) -> Vec<(SessionId, Summary)> {
        let now = Instant::now();
        let candidates: Vec<SessionId> = self.sessions.iter().map(|entry| *entry.key()).collect();

        let mut reaped = Vec::new();
        for id in candidates {
            // a session mid-frame is not idle
            let removed = self.sessions.remove_if(&id, |_, handle| match handle.session.try_lock() {
                Ok(session) => session.idle_for(now) >= max_idle,
                Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner().idle_for(now) >= max_idle,
                Err(TryLockError::WouldBlock) => false,
            });

            if let Some((id, handle)) = removed {
                let summary = close(&handle.session, now);
                warn!(session_id = %id, frames = summary.total_frames, "Reaped idle session");
                reaped.push((id, summary));
            }
        }
        reaped
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Identifiers of live sessions
    pub fn ids(&self) -> Vec<SessionId> {
        self.sessions.iter().map(|entry| *entry.key()).collect()
    }

    fn handle(&self, id: &SessionId) -> Result<SessionHandle, SessionError> {
        // clone out so the shard lock is released before the session lock is taken
        self.sessions
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or(SessionError::NotFound(*id))
    }

    fn lock<'a>(
        &self,
        id: &SessionId,
        handle: &'a Mutex<Session>,
    ) -> Result<MutexGuard<'a, Session>, SessionError> {
        match self.contention {
            ContentionPolicy::Queue => Ok(handle.lock().unwrap_or_else(PoisonError::into_inner)),
            ContentionPolicy::Reject => match handle.try_lock() {
                Ok(guard) => Ok(guard),
                Err(TryLockError::Poisoned(poisoned)) => Ok(poisoned.into_inner()),
                Err(TryLockError::WouldBlock) => Err(SessionError::Busy(*id)),
            },
        }
    }
}

fn finish(id: &SessionId, handle: &SessionHandle) -> Summary {
    let summary = close(&handle.session, Instant::now());
    info!(
        session_id = %id,
        frames = summary.total_frames,
        warnings = summary.total_warnings_surfaced,
        "Session stopped"
    );
    summary
}

/// Wait for in-flight work, mark closed, summarize
fn close(handle: &Mutex<Session>, now: Instant) -> Summary {
    let mut session = handle.lock().unwrap_or_else(PoisonError::into_inner);
    session.close();
    Summary::from_session(&session, now)
}
