//! Tracks parse jobs from the backend's progress stream.
//!
//! The queue is an owned value: mount it on a receiver, feed it with
//! [`ParseQueue::pump`] or [`ParseQueue::next_update`], and query it.

use std::collections::HashMap;

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};

use crate::core::ParseProgress;

#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    Running,
    Completed,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParseJob {
    pub parse_id: String,
    pub progress: f32,
    pub files_amount: usize,
    pub result_file_path: Option<String>,
    pub status: JobStatus,
    seq: u64,
}

impl ParseJob {
    pub fn is_finished(&self) -> bool {
        !matches!(self.status, JobStatus::Running)
    }
}

/// What an applied progress event changed.
#[derive(Debug, Clone, PartialEq)]
pub enum QueueUpdate {
    Started(String),
    Progressed(String),
    Completed(String),
    Failed(String),
}

pub struct ParseQueue {
    jobs: HashMap<String, ParseJob>,
    capacity: usize,
    min_step: f32,
    next_seq: u64,
    receiver: Option<broadcast::Receiver<ParseProgress>>,
}

impl ParseQueue {
    pub fn new(capacity: usize, min_step: f32) -> Self {
        Self {
            jobs: HashMap::new(),
            capacity: capacity.max(1),
            min_step: min_step.max(0.0),
            next_seq: 0,
            receiver: None,
        }
    }

    /// Starts listening on `receiver`, replacing any previous subscription.
    pub fn mount(&mut self, receiver: broadcast::Receiver<ParseProgress>) {
        if self.receiver.replace(receiver).is_some() {
            tracing::debug!("Parse queue remounted; previous subscription dropped");
        }
    }

    /// Stops listening. Tracked jobs are kept.
    pub fn unmount(&mut self) {
        self.receiver = None;
    }

    pub fn is_mounted(&self) -> bool {
        self.receiver.is_some()
    }

    /// Applies one progress event. Non-terminal events that move less than
    /// the minimum step are dropped, as are events for finished jobs.
    pub fn apply(&mut self, progress: ParseProgress) -> Option<QueueUpdate> {
        let parse_id = progress.parse_id.clone();

        if let Some(job) = self.jobs.get_mut(&parse_id) {
            if job.is_finished() {
                return None;
            }
            if !progress.is_terminal() && (progress.parse_progress - job.progress).abs() < self.min_step {
                return None;
            }
            Self::update_job(job, progress);
            return Some(Self::update_for(job));
        }

        if self.jobs.len() >= self.capacity {
            self.evict_one();
        }
        let mut job = ParseJob {
            parse_id: parse_id.clone(),
            progress: 0.0,
            files_amount: 0,
            result_file_path: None,
            status: JobStatus::Running,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        Self::update_job(&mut job, progress);
        let update = match job.status {
            JobStatus::Running => QueueUpdate::Started(parse_id.clone()),
            _ => Self::update_for(&job),
        };
        self.jobs.insert(parse_id, job);
        Some(update)
    }

    fn update_job(job: &mut ParseJob, progress: ParseProgress) {
        job.progress = progress.parse_progress.clamp(0.0, 100.0);
        job.files_amount = progress.files_amount;
        if progress.result_file_path.is_some() {
            job.result_file_path = progress.result_file_path.clone();
        }
        job.status = if let Some(error) = progress.error {
            JobStatus::Failed(error)
        } else if progress.parse_progress >= 100.0 {
            JobStatus::Completed
        } else {
            JobStatus::Running
        };
    }

    fn update_for(job: &ParseJob) -> QueueUpdate {
        match job.status {
            JobStatus::Running => QueueUpdate::Progressed(job.parse_id.clone()),
            JobStatus::Completed => QueueUpdate::Completed(job.parse_id.clone()),
            JobStatus::Failed(_) => QueueUpdate::Failed(job.parse_id.clone()),
        }
    }

    /// Drops the oldest finished job, or the oldest job when none finished.
    fn evict_one(&mut self) {
        let victim = self
            .jobs
            .values()
            .filter(|j| j.is_finished())
            .min_by_key(|j| j.seq)
            .or_else(|| self.jobs.values().min_by_key(|j| j.seq))
            .map(|j| j.parse_id.clone());
        if let Some(id) = victim {
            tracing::debug!("Parse queue full; evicting job {}", id);
            self.jobs.remove(&id);
        }
    }

    /// Applies every event already waiting on the receiver without blocking.
    pub fn pump(&mut self) -> Vec<QueueUpdate> {
        let mut updates = Vec::new();
        loop {
            let next = match self.receiver.as_mut() {
                Some(rx) => rx.try_recv(),
                None => break,
            };
            match next {
                Ok(progress) => updates.extend(self.apply(progress)),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!("Parse queue lagged; {} progress events skipped", skipped);
                }
                Err(TryRecvError::Closed) => {
                    tracing::info!("Progress stream closed; unmounting parse queue");
                    self.receiver = None;
                    break;
                }
            }
        }
        updates
    }

    /// Waits for the next event that changes the queue. Returns `None` once
    /// unmounted or when the stream closes.
    pub async fn next_update(&mut self) -> Option<QueueUpdate> {
        loop {
            let next = self.receiver.as_mut()?.recv().await;
            match next {
                Ok(progress) => {
                    if let Some(update) = self.apply(progress) {
                        return Some(update);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Parse queue lagged; {} progress events skipped", skipped);
                }
                Err(RecvError::Closed) => {
                    tracing::info!("Progress stream closed; unmounting parse queue");
                    self.receiver = None;
                    return None;
                }
            }
        }
    }

    fn sorted<'a>(&'a self, filter: impl Fn(&ParseJob) -> bool) -> Vec<&'a ParseJob> {
        let mut jobs: Vec<&ParseJob> = self.jobs.values().filter(|j| filter(j)).collect();
        jobs.sort_by_key(|j| j.seq);
        jobs
    }

    /// Running jobs, oldest first.
    pub fn active_jobs(&self) -> Vec<&ParseJob> {
        self.sorted(|j| j.status == JobStatus::Running)
    }

    pub fn completed_jobs(&self) -> Vec<&ParseJob> {
        self.sorted(|j| j.status == JobStatus::Completed)
    }

    pub fn failed_jobs(&self) -> Vec<&ParseJob> {
        self.sorted(|j| matches!(j.status, JobStatus::Failed(_)))
    }

    pub fn is_any_active(&self) -> bool {
        self.jobs.values().any(|j| !j.is_finished())
    }

    pub fn get(&self, parse_id: &str) -> Option<&ParseJob> {
        self.jobs.get(parse_id)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn remove(&mut self, parse_id: &str) -> Option<ParseJob> {
        self.jobs.remove(parse_id)
    }

    /// Forgets every finished job and returns how many were removed.
    pub fn clear_completed(&mut self) -> usize {
        let before = self.jobs.len();
        self.jobs.retain(|_, j| !j.is_finished());
        before - self.jobs.len()
    }
}
