//! Serialized narration queue over pluggable speech backends.
//!
//! Only one utterance plays at a time. Backends are tried in order for each
//! request, so a network voice can fall back to a local one; a request that
//! no backend can start is reported as finished straight away so that
//! sessions waiting on it never stall.

use std::collections::VecDeque;

use tracing::{debug, warn};

use crate::services::{Narrator, RequestId};

/// A speech engine that plays one utterance at a time.
pub trait SpeechBackend {
    /// Start speaking `text`. An error means nothing is playing.
    fn start(&mut self, text: &str, rate: f32) -> anyhow::Result<()>;
    /// Whether the utterance started last is still playing.
    fn is_speaking(&self) -> bool;
    /// Cut the current utterance short.
    fn cancel(&mut self);
}

#[derive(Debug, Clone)]
struct Job {
    id: RequestId,
    text: String,
    rate: f32,
}

pub struct NarrationQueue {
    backends: Vec<Box<dyn SpeechBackend>>,
    pending: VecDeque<Job>,
    /// Request currently playing and the backend playing it
    current: Option<(RequestId, usize)>,
    finished: Vec<RequestId>,
    next_id: RequestId,
    enabled: bool,
}

impl NarrationQueue {
    pub fn new(primary: Box<dyn SpeechBackend>) -> Self {
        Self {
            backends: vec![primary],
            pending: VecDeque::new(),
            current: None,
            finished: Vec::new(),
            next_id: 1,
            enabled: true,
        }
    }

    /// Add a backend tried when the earlier ones fail to start.
    pub fn with_fallback(mut self, backend: Box<dyn SpeechBackend>) -> Self {
        self.backends.push(backend);
        self
    }

    /// Disabled narration completes every request immediately.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_busy(&self) -> bool {
        self.current.is_some() || !self.pending.is_empty()
    }

    pub fn queued(&self) -> usize {
        self.pending.len()
    }

    /// Retire the playing utterance if it ended and start queued ones.
    pub fn pump(&mut self) {
        if let Some((id, backend)) = self.current {
            if self.backends[backend].is_speaking() {
                return;
            }
            self.current = None;
            self.finished.push(id);
        }

        while let Some(job) = self.pending.pop_front() {
            if !self.enabled {
                self.finished.push(job.id);
                continue;
            }
            match self.start_job(&job) {
                Some(backend) => {
                    self.current = Some((job.id, backend));
                    return;
                }
                None => self.finished.push(job.id),
            }
        }
    }

    fn start_job(&mut self, job: &Job) -> Option<usize> {
        for (idx, backend) in self.backends.iter_mut().enumerate() {
            match backend.start(&job.text, job.rate) {
                Ok(()) => {
                    debug!(id = job.id, text = %job.text, rate = job.rate, backend = idx, "speaking");
                    return Some(idx);
                }
                Err(e) => warn!(id = job.id, backend = idx, "speech backend failed: {e:#}"),
            }
        }
        None
    }
}

impl Narrator for NarrationQueue {
    fn speak(&mut self, text: &str, rate: f32) -> RequestId {
        let id = self.next_id;
        self.next_id += 1;
        self.pending.push_back(Job {
            id,
            text: text.to_string(),
            rate,
        });
        self.pump();
        id
    }

    fn stop(&mut self) {
        if let Some((_, backend)) = self.current.take() {
            self.backends[backend].cancel();
        }
        self.pending.clear();
        self.finished.clear();
    }

    fn take_finished(&mut self) -> Vec<RequestId> {
        self.pump();
        std::mem::take(&mut self.finished)
    }
}
