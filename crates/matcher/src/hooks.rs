//! Caller-facing hooks: progress reporting, cooperative cancellation, and
//! post-match collaborators.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::config::MatchConfig;
use crate::error::MatchError;
use crate::model::{MatchInput, MatchOutput};

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

pub trait Progress: Send + Sync {
    /// Integer percent, 0-100. Called only when the value increases.
    fn report(&self, percent: u8);
}

impl<F: Fn(u8) + Send + Sync> Progress for F {
    fn report(&self, percent: u8) {
        self(percent)
    }
}

pub struct NoProgress;

impl Progress for NoProgress {
    fn report(&self, _percent: u8) {}
}

/// Turns step counts into percent updates, dropping repeats.
pub(crate) struct ProgressTracker<'a> {
    sink: &'a dyn Progress,
    last: Option<u8>,
}

impl<'a> ProgressTracker<'a> {
    pub(crate) fn new(sink: &'a dyn Progress) -> Self {
        Self { sink, last: None }
    }

    pub(crate) fn update(&mut self, done: usize, total: usize) {
        if total == 0 {
            return;
        }
        let percent = (done.min(total) * 100 / total) as u8;
        if self.last.map_or(true, |last| percent > last) {
            self.last = Some(percent);
            self.sink.report(percent);
        }
    }

    pub(crate) fn finish(&mut self) {
        self.update(1, 1);
    }
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

pub trait Cancellation: Send + Sync {
    fn should_cancel(&self) -> bool;
}

impl<F: Fn() -> bool + Send + Sync> Cancellation for F {
    fn should_cancel(&self) -> bool {
        self()
    }
}

pub struct NeverCancel;

impl Cancellation for NeverCancel {
    fn should_cancel(&self) -> bool {
        false
    }
}

/// Shared cancel switch. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl Cancellation for CancelFlag {
    fn should_cancel(&self) -> bool {
        self.is_cancelled()
    }
}

/// Progress sink and cancellation token for one run.
#[derive(Clone, Copy)]
pub struct RunHooks<'a> {
    pub progress: &'a dyn Progress,
    pub cancel: &'a dyn Cancellation,
}

impl<'a> RunHooks<'a> {
    pub fn new(progress: &'a dyn Progress, cancel: &'a dyn Cancellation) -> Self {
        Self { progress, cancel }
    }
}

impl Default for RunHooks<'static> {
    fn default() -> Self {
        Self {
            progress: &NoProgress,
            cancel: &NeverCancel,
        }
    }
}

// ---------------------------------------------------------------------------
// Post-match hooks
// ---------------------------------------------------------------------------

/// What a post-match hook can see. Everything is borrowed read-only.
pub struct HookContext<'a> {
    pub config: &'a MatchConfig,
    pub input: &'a MatchInput,
    pub output: &'a MatchOutput,
}

/// Collaborator invoked after assembly, e.g. an exporter.
pub trait PostMatchHook {
    fn name(&self) -> &str;
    fn run(&self, ctx: &HookContext<'_>) -> Result<(), MatchError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HookReport {
    pub hook: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HookReport {
    pub fn failed(&self) -> bool {
        self.error.is_some()
    }

    /// The failure as an error value, if there was one.
    pub fn into_result(self) -> Result<(), MatchError> {
        match self.error {
            Some(message) => Err(MatchError::Hook {
                hook: self.hook,
                message,
            }),
            None => Ok(()),
        }
    }
}

/// Run every hook in order. A failing hook does not stop the others; each
/// failure is logged and returned in its report.
pub fn run_post_match_hooks(hooks: &[&dyn PostMatchHook], ctx: &HookContext<'_>) -> Vec<HookReport> {
    hooks
        .iter()
        .map(|hook| {
            let error = match hook.run(ctx) {
                Ok(()) => None,
                Err(e) => {
                    log::warn!("post-match hook '{}' failed: {e}", hook.name());
                    Some(e.to_string())
                }
            };
            HookReport {
                hook: hook.name().to_string(),
                error,
            }
        })
        .collect()
}
