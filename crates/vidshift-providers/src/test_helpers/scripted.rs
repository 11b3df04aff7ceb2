//! Scripted provider implementations for testing

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use vidshift_core::models::{GenerationRequest, GenerationTask, ModerationJob, VideoAsset};

use crate::error::{ProviderError, ProviderResult};
use crate::generation::GenerationProvider;
use crate::moderation::ModerationProvider;

/// Replays `script` in order; once exhausted the last state repeats.
struct Script<T: Clone> {
    pending: Mutex<VecDeque<T>>,
    last: Mutex<Option<T>>,
}

impl<T: Clone> Script<T> {
    fn new(states: Vec<T>) -> Self {
        Self {
            pending: Mutex::new(states.into()),
            last: Mutex::new(None),
        }
    }

    fn next(&self) -> Option<T> {
        let mut last = self.last.lock().unwrap();
        if let Some(state) = self.pending.lock().unwrap().pop_front() {
            *last = Some(state);
        }
        last.clone()
    }
}

/// Moderation provider driven by a fixed list of job states.
pub struct ScriptedModeration {
    job_id: String,
    script: Script<ModerationJob>,
    fail_submit: bool,
    submitted: Mutex<Vec<String>>,
    fetches: AtomicUsize,
}

impl ScriptedModeration {
    pub fn new(states: Vec<ModerationJob>) -> Self {
        let job_id = states
            .first()
            .map(|job| job.job_id.clone())
            .unwrap_or_else(|| "job-1".to_string());
        Self {
            job_id,
            script: Script::new(states),
            fail_submit: false,
            submitted: Mutex::new(Vec::new()),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Every job succeeds with no labels.
    pub fn safe() -> Self {
        Self::new(vec![ModerationJob::succeeded("job-1", Vec::new())])
    }

    /// Every job succeeds with `labels`.
    pub fn flagged(labels: &[&str]) -> Self {
        Self::new(vec![ModerationJob::succeeded(
            "job-1",
            labels.iter().map(|l| l.to_string()).collect(),
        )])
    }

    pub fn always_pending(job_id: &str) -> Self {
        Self::new(vec![ModerationJob::pending(job_id)])
    }

    /// Submission itself fails.
    pub fn failing_submit() -> Self {
        Self {
            fail_submit: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn submit_count(&self) -> usize {
        self.submitted.lock().unwrap().len()
    }

    /// Storage keys of every submitted asset, in order.
    pub fn submitted_keys(&self) -> Vec<String> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModerationProvider for ScriptedModeration {
    fn name(&self) -> &str {
        "scripted_moderation"
    }

    async fn submit(&self, asset: &VideoAsset) -> ProviderResult<String> {
        self.submitted.lock().unwrap().push(asset.key.clone());
        if self.fail_submit {
            return Err(ProviderError::Request {
                service: "moderation",
                message: "submission refused".to_string(),
            });
        }
        Ok(self.job_id.clone())
    }

    async fn fetch(&self, job_id: &str) -> ProviderResult<ModerationJob> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.script
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse {
                service: "moderation",
                message: format!("no scripted state for job {}", job_id),
            })
    }
}

/// Generation provider driven by a fixed list of task states.
pub struct ScriptedGeneration {
    task_id: String,
    script: Script<GenerationTask>,
    submitted: Mutex<Vec<(String, GenerationRequest)>>,
    fetches: AtomicUsize,
}

impl ScriptedGeneration {
    pub fn new(states: Vec<GenerationTask>) -> Self {
        let task_id = states
            .first()
            .map(|task| task.task_id.clone())
            .unwrap_or_else(|| "task-1".to_string());
        Self {
            task_id,
            script: Script::new(states),
            submitted: Mutex::new(Vec::new()),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Every task succeeds with a single output.
    pub fn succeeding(output_url: &str) -> Self {
        Self::new(vec![GenerationTask::succeeded(
            "task-1",
            vec![output_url.to_string()],
        )])
    }

    pub fn always_pending(task_id: &str) -> Self {
        Self::new(vec![GenerationTask::pending(task_id)])
    }

    pub fn submit_count(&self) -> usize {
        self.submitted.lock().unwrap().len()
    }

    /// Input URLs of every submitted task, in order.
    pub fn submitted_inputs(&self) -> Vec<String> {
        self.submitted
            .lock()
            .unwrap()
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }

    pub fn submitted_requests(&self) -> Vec<GenerationRequest> {
        self.submitted
            .lock()
            .unwrap()
            .iter()
            .map(|(_, request)| request.clone())
            .collect()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationProvider for ScriptedGeneration {
    fn name(&self) -> &str {
        "scripted_generation"
    }

    async fn submit(&self, input_url: &str, request: &GenerationRequest) -> ProviderResult<String> {
        self.submitted
            .lock()
            .unwrap()
            .push((input_url.to_string(), request.clone()));
        Ok(self.task_id.clone())
    }

    async fn fetch(&self, task_id: &str) -> ProviderResult<GenerationTask> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.script
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse {
                service: "generation",
                message: format!("no scripted state for task {}", task_id),
            })
    }
}
