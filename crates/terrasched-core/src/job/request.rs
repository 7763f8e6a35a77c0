//! Admission request: payload plus the per-queue gate callbacks.

use crate::resource::ResourceQueue;

/// Admission predicate, evaluated once per owning queue under the table lock.
pub type AdmitFn = Box<dyn Fn(&ResourceQueue) -> bool + Send>;
/// Reserve / unreserve callback, run once per owning queue under the table lock.
pub type QueueFn = Box<dyn Fn(&ResourceQueue) + Send>;
pub(crate) type Work = Box<dyn FnOnce() + Send>;

/// A unit of work waiting to be admitted.
///
/// The callbacks run while the scheduler holds its queue-table lock: they
/// must be short and must not call back into the scheduler.
pub struct JobRequest {
    pub(crate) label: &'static str,
    pub(crate) work: Work,
    pub(crate) can_admit: Option<AdmitFn>,
    pub(crate) on_reserve: Option<QueueFn>,
    pub(crate) on_unreserve: Option<QueueFn>,
    pub(crate) can_skip: bool,
}

impl JobRequest {
    /// New request running `work`. `label` names the job in logs and stats.
    pub fn new<F>(label: &'static str, work: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            label,
            work: Box::new(work),
            can_admit: None,
            on_reserve: None,
            on_unreserve: None,
            can_skip: false,
        }
    }

    /// Admit only if `f` returns true for every owning queue.
    pub fn admit_if<F>(mut self, f: F) -> Self
    where
        F: Fn(&ResourceQueue) -> bool + Send + 'static,
    {
        self.can_admit = Some(Box::new(f));
        self
    }

    /// Called for every owning queue once admission succeeded.
    pub fn on_reserve<F>(mut self, f: F) -> Self
    where
        F: Fn(&ResourceQueue) + Send + 'static,
    {
        self.on_reserve = Some(Box::new(f));
        self
    }

    /// Called for every owning queue when the job finishes (run, skipped or panicked).
    pub fn on_unreserve<F>(mut self, f: F) -> Self
    where
        F: Fn(&ResourceQueue) + Send + 'static,
    {
        self.on_unreserve = Some(Box::new(f));
        self
    }

    /// Allow the scheduler to drop the payload when a skip condition holds.
    pub fn skippable(mut self) -> Self {
        self.can_skip = true;
        self
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn can_skip(&self) -> bool {
        self.can_skip
    }

    pub(crate) fn admits(&self, queue: &ResourceQueue) -> bool {
        self.can_admit.as_ref().map_or(true, |f| f(queue))
    }
}

impl std::fmt::Debug for JobRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobRequest")
            .field("label", &self.label)
            .field("can_skip", &self.can_skip)
            .finish_non_exhaustive()
    }
}
