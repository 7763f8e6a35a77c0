//! All-or-nothing admission of a job into its full set of resource queues.
//!
//! A job is either registered in every queue it asked for or in none of them.
//! It never sits half-registered waiting on a queue that refused it, which is
//! what keeps multi-chunk jobs from deadlocking against each other.

use std::collections::VecDeque;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::error::SchedulerError;
use crate::job::{JobCompletion, JobKind, JobRequest, JobState};
use crate::resource::ResourceKey;

use super::stats::Counters;
use super::table::JobEntry;
use super::{Enqueued, Inner};

impl Inner {
    /// Admit `request` against `requested` (chunk jobs) or against the master
    /// queue plus every live chunk queue (master jobs).
    pub(super) fn admit(
        self: &Arc<Self>,
        request: JobRequest,
        kind: JobKind,
        requested: Vec<ResourceKey>,
    ) -> Result<Enqueued, SchedulerError> {
        if self.shut_down.load(Ordering::Acquire) {
            return Err(SchedulerError::ShutDown);
        }

        let mut table = self.table.lock();

        let (gated, created) = match kind {
            JobKind::Master => {
                let mut keys = vec![ResourceKey::Master];
                keys.extend(table.chunk_keys());
                (keys, Vec::new())
            }
            JobKind::Chunk => {
                let created: Vec<ResourceKey> = requested
                    .iter()
                    .copied()
                    .filter(|key| table.ensure_queue(*key))
                    .collect();
                (requested, created)
            }
        };

        if !table.all_admit(&request, &gated) {
            // Queues created for this attempt must not outlive it.
            for key in &created {
                table.queues.remove(key);
            }
            drop(table);
            Counters::bump(&self.counters.refused, 1);
            tracing::debug!(label = request.label, ?kind, "admission refused");
            return Ok(Enqueued::Refused);
        }
        table.reserve_all(&request, &gated);

        // A chunk queue born while a master job is pending was not part of
        // that master job's set, so its work also waits behind the master queue.
        let mut owned = gated.clone();
        if !created.is_empty() && table.master_pending() {
            owned.push(ResourceKey::Master);
        }

        let id = table.next_job_id();
        let JobRequest {
            label,
            work,
            on_unreserve,
            can_skip,
            ..
        } = request;
        let (completion, handle) = JobCompletion::channel(id, kind, label);
        tracing::debug!(
            job = %id,
            label,
            ?kind,
            resources = owned.len(),
            barrier = owned.len() > gated.len(),
            "admitted job"
        );
        table.register(
            id,
            JobEntry {
                label,
                kind,
                state: JobState::Queued,
                owned,
                gated,
                work: Some(work),
                on_unreserve,
                can_skip,
                completion: Some(completion),
            },
        );
        Counters::bump(&self.counters.admitted, 1);

        let mut ready = VecDeque::new();
        if table.is_ready(id) {
            ready.push_back(id);
        }
        let (deliveries, runs) = self.drain(&mut table, VecDeque::new(), ready);
        drop(table);
        self.deliver(deliveries, runs);

        Ok(Enqueued::Admitted(handle))
    }
}
