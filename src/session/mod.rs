// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Session Manager
 * One session per connected stream: outbound queue, activity tracking, idle sweep
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, error::SendTimeoutError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::errors::SessionError;
use crate::monitoring::MetricsCollector;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    Open,
    Idle,
    Closed,
}

/// Why a session was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    Disconnect,
    IdleTimeout,
    WriteFailed,
    Shutdown,
}

impl CloseReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloseReason::Disconnect => "disconnect",
            CloseReason::IdleTimeout => "idle_timeout",
            CloseReason::WriteFailed => "write_failed",
            CloseReason::Shutdown => "shutdown",
        }
    }
}

struct SessionInner {
    state: SessionState,
    last_active: Instant,
    last_active_at: DateTime<Utc>,
    /// Single writer onto the client's stream; `None` once closed
    sender: Option<mpsc::Sender<String>>,
    recent_context: Option<(String, Instant)>,
}

pub struct Session {
    id: String,
    created_at: DateTime<Utc>,
    pending: AtomicUsize,
    inner: Mutex<SessionInner>,
}

impl Session {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        self.inner.lock().state
    }

    pub fn pending_requests(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    fn touch(&self) {
        let mut inner = self.inner.lock();
        if inner.state == SessionState::Closed {
            return;
        }
        inner.last_active = Instant::now();
        inner.last_active_at = Utc::now();
        if inner.state == SessionState::Idle {
            inner.state = SessionState::Open;
        }
    }

    fn summary(&self) -> SessionSummary {
        let inner = self.inner.lock();
        SessionSummary {
            id: self.id.clone(),
            state: inner.state,
            created_at: self.created_at,
            last_active_at: inner.last_active_at,
            pending_requests: self.pending_requests(),
        }
    }
}

/// Decrements the session's pending count on drop
pub struct PendingRequest {
    session: Arc<Session>,
}

impl Drop for PendingRequest {
    fn drop(&mut self) {
        self.session.pending.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub id: String,
    pub state: SessionState,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
    pub pending_requests: usize,
}

/// Returned by [`SessionManager::create`]; the receiver feeds the client's stream
pub struct SessionHandle {
    pub id: String,
    pub receiver: mpsc::Receiver<String>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub idled: usize,
    pub closed: usize,
}

pub struct SessionManager {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    config: SessionConfig,
    metrics: Arc<MetricsCollector>,
}

impl SessionManager {
    pub fn new(config: SessionConfig, metrics: Arc<MetricsCollector>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            config,
            metrics,
        }
    }

    pub fn create(&self) -> SessionHandle {
        let id = Uuid::new_v4().to_string();
        let (sender, receiver) = mpsc::channel(self.config.queue_capacity);
        let now = Utc::now();

        let session = Arc::new(Session {
            id: id.clone(),
            created_at: now,
            pending: AtomicUsize::new(0),
            inner: Mutex::new(SessionInner {
                state: SessionState::Open,
                last_active: Instant::now(),
                last_active_at: now,
                sender: Some(sender),
                recent_context: None,
            }),
        });

        self.sessions.write().insert(id.clone(), session);
        self.metrics.record_session_opened();
        info!(session_id = %id, "Session opened");

        SessionHandle { id, receiver }
    }

    pub fn get(&self, id: &str) -> Result<Arc<Session>, SessionError> {
        self.sessions
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    /// Record activity; an `IDLE` session becomes `OPEN` again
    pub fn touch(&self, id: &str) -> Result<(), SessionError> {
        let session = self.get(id)?;
        if session.state() == SessionState::Closed {
            return Err(SessionError::Closed(id.to_string()));
        }
        session.touch();
        Ok(())
    }

    /// Count an in-flight request until the guard drops
    pub fn begin_request(&self, id: &str) -> Result<PendingRequest, SessionError> {
        let session = self.get(id)?;
        session.pending.fetch_add(1, Ordering::SeqCst);
        Ok(PendingRequest { session })
    }

    /// Queue one complete serialized envelope onto the session's stream.
    ///
    /// Envelopes are never split, so concurrent pushes cannot interleave.
    /// A client that leaves the queue full past the write deadline loses its session.
    pub async fn push(&self, id: &str, envelope: String) -> Result<(), SessionError> {
        let session = self.get(id)?;

        let sender = {
            let inner = session.inner.lock();
            if inner.state == SessionState::Closed {
                return Err(SessionError::Closed(id.to_string()));
            }
            inner
                .sender
                .clone()
                .ok_or_else(|| SessionError::Closed(id.to_string()))?
        };

        if let Err(e) = sender.send_timeout(envelope, self.config.write_timeout()).await {
            match e {
                SendTimeoutError::Timeout(_) => warn!(
                    session_id = %id,
                    deadline_secs = self.config.write_timeout_secs,
                    "Stream stalled past write deadline; closing session"
                ),
                SendTimeoutError::Closed(_) => {
                    warn!(session_id = %id, "Stream receiver gone; closing session")
                }
            }
            self.close(id, CloseReason::WriteFailed);
            return Err(SessionError::Closed(id.to_string()));
        }

        session.touch();
        Ok(())
    }

    /// Release the stream and forget the id. Returns false if already gone.
    pub fn close(&self, id: &str, reason: CloseReason) -> bool {
        let removed = self.sessions.write().remove(id);
        match removed {
            Some(session) => {
                {
                    let mut inner = session.inner.lock();
                    inner.state = SessionState::Closed;
                    inner.sender = None;
                    inner.recent_context = None;
                }
                self.metrics.record_session_closed(reason.as_str());
                info!(session_id = %id, reason = reason.as_str(), "Session closed");
                true
            }
            None => false,
        }
    }

    pub fn record_context(&self, id: &str, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        if let Ok(session) = self.get(id) {
            session.inner.lock().recent_context = Some((text.to_string(), Instant::now()));
        }
    }

    /// Latest free text seen on this session, if younger than the configured max age
    pub fn recent_context(&self, id: &str) -> Option<String> {
        let session = self.get(id).ok()?;
        let inner = session.inner.lock();
        let (text, seen_at) = inner.recent_context.as_ref()?;
        if seen_at.elapsed() > self.config.context_max_age() {
            return None;
        }
        Some(text.clone())
    }

    pub fn sweep(&self) -> SweepReport {
        self.sweep_at(Instant::now())
    }

    /// Mark sessions idle past `idle_after`; close those idle past `idle_timeout`
    /// or whose stream is gone. Sessions with requests in flight stay open.
    pub fn sweep_at(&self, now: Instant) -> SweepReport {
        let mut report = SweepReport::default();
        let mut expired = Vec::new();

        for session in self.sessions.read().values() {
            let mut inner = session.inner.lock();
            let inactive = now.saturating_duration_since(inner.last_active);
            let stream_gone = inner.sender.as_ref().map_or(true, |s| s.is_closed());

            if stream_gone {
                expired.push((session.id.clone(), CloseReason::Disconnect));
            } else if inactive >= self.config.idle_timeout() && session.pending_requests() == 0 {
                expired.push((session.id.clone(), CloseReason::IdleTimeout));
            } else if inactive >= self.config.idle_after() && inner.state == SessionState::Open {
                inner.state = SessionState::Idle;
                report.idled += 1;
                debug!(session_id = %session.id, "Session idle");
            }
        }

        for (id, reason) in expired {
            if self.close(&id, reason) {
                report.closed += 1;
            }
        }

        report
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn summaries(&self) -> Vec<SessionSummary> {
        let mut summaries: Vec<_> = self.sessions.read().values().map(|s| s.summary()).collect();
        summaries.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        summaries
    }

    pub fn close_all(&self, reason: CloseReason) {
        let ids: Vec<String> = self.sessions.read().keys().cloned().collect();
        for id in ids {
            self.close(&id, reason);
        }
    }

    /// Periodic idle sweep on a background task
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        let period = manager.config.sweep_interval();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            interval.tick().await;

            loop {
                interval.tick().await;
                let report = manager.sweep();
                if report.idled > 0 || report.closed > 0 {
                    info!(
                        idled = report.idled,
                        closed = report.closed,
                        active = manager.len(),
                        "Session sweep"
                    );
                }
            }
        })
    }

    pub fn idle_timeout(&self) -> Duration {
        self.config.idle_timeout()
    }
}
