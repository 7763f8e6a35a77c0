//! Completion: retire finished jobs, advance their queues, start whatever
//! became runnable, and execute payloads with panics contained.

use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::job::{JobId, JobOutcome};
use crate::pool::PoolTask;

use super::stats::Counters;
use super::table::{Delivery, QueueTable, Runnable, Start};
use super::Inner;

impl Inner {
    /// Retire `finished` jobs and start `ready` ones until neither list has
    /// anything left. Skipped jobs retire in the same pass, so a chain of
    /// skippable jobs collapses without a round trip through the pool.
    pub(super) fn drain(
        &self,
        table: &mut QueueTable,
        mut finished: VecDeque<(JobId, JobOutcome)>,
        mut ready: VecDeque<JobId>,
    ) -> (Vec<Delivery>, Vec<Runnable>) {
        let mut deliveries = Vec::new();
        let mut runs = Vec::new();
        loop {
            while let Some(id) = ready.pop_front() {
                match table.start(id) {
                    Some(Start::Run(job)) => runs.push(job),
                    Some(Start::Skip(id)) => finished.push_back((id, JobOutcome::Skipped)),
                    None => {}
                }
            }
            let Some((id, outcome)) = finished.pop_front() else {
                break;
            };
            if let Some(retired) = table.retire(id) {
                self.counters.record_outcome(&outcome);
                Counters::bump(&self.counters.queues_removed, retired.removed_queues as u64);
                deliveries.push((retired.completion, outcome));
                ready.extend(retired.ready);
            }
        }
        (deliveries, runs)
    }

    /// Send outcomes and hand runnable jobs to the pool. Call without the
    /// table lock held.
    pub(super) fn deliver(self: &Arc<Self>, deliveries: Vec<Delivery>, runs: Vec<Runnable>) {
        for (completion, outcome) in deliveries {
            if let Some(completion) = completion {
                completion.finish(outcome);
            }
        }
        for job in runs {
            self.dispatch(job);
        }
    }

    fn dispatch(self: &Arc<Self>, job: Runnable) {
        let Runnable {
            id,
            label,
            chunks,
            work,
        } = job;
        let inner = Arc::clone(self);
        let task = PoolTask {
            job: id,
            chunks,
            run: Box::new(move || inner.execute(id, label, work)),
        };
        if self.pool.submit(task).is_err() {
            // Pool already stopped: forget the job so its handle resolves.
            tracing::warn!(job = %id, label, "pool shut down; dropping runnable job");
            self.table.lock().forget(id);
        }
    }

    fn execute(self: &Arc<Self>, id: JobId, label: &'static str, work: Box<dyn FnOnce() + Send>) {
        self.table.lock().mark_executing(id);
        let outcome = match panic::catch_unwind(AssertUnwindSafe(work)) {
            Ok(()) => JobOutcome::Completed,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(job = %id, label, %message, "job panicked; advancing its queues");
                JobOutcome::Panicked { message }
            }
        };
        self.finish(id, outcome);
    }

    /// Retire `id` with `outcome` and start whatever it unblocked.
    pub(super) fn finish(self: &Arc<Self>, id: JobId, outcome: JobOutcome) {
        let mut table = self.table.lock();
        let mut finished = VecDeque::new();
        finished.push_back((id, outcome));
        let (deliveries, runs) = self.drain(&mut table, finished, VecDeque::new());
        drop(table);
        self.deliver(deliveries, runs);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::panic_message;

    #[test]
    fn panic_message_extracts_strings() {
        let p = std::panic::catch_unwind(|| panic!("boom")).unwrap_err();
        assert_eq!(panic_message(p.as_ref()), "boom");
        let p = std::panic::catch_unwind(|| panic!("{} {}", "formatted", 1)).unwrap_err();
        assert_eq!(panic_message(p.as_ref()), "formatted 1");
        let p = std::panic::catch_unwind(|| std::panic::panic_any(7u32)).unwrap_err();
        assert_eq!(panic_message(p.as_ref()), "non-string panic payload");
    }
}
