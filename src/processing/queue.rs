//! Bounded queue of pending ingestion triggers

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::query::IngestEvent;
use crate::types::response::IngestReport;

/// Handle for submitting ingestion triggers and reading their reports
#[derive(Clone)]
pub struct IngestQueue {
    sender: mpsc::Sender<IngestEvent>,
    reports: Arc<DashMap<String, IngestReport>>,
}

impl IngestQueue {
    /// Create a queue with the given capacity, returning the handle and
    /// the receiver the workers drain
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<IngestEvent>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (
            Self {
                sender,
                reports: Arc::new(DashMap::new()),
            },
            receiver,
        )
    }

    /// Submit a trigger for background processing, returning a job id.
    /// A report in the `received` state is visible immediately.
    pub fn submit(&self, event: IngestEvent) -> Result<Uuid> {
        let job_id = Uuid::new_v4();
        let location = event.location.clone();

        // The received report must be in place before a worker can pick the
        // trigger up; inserting it after the send would let a fast run's
        // terminal report be overwritten with `Received`.
        let previous = self
            .reports
            .insert(location.clone(), IngestReport::new(location.clone()));

        if let Err(e) = self.sender.try_send(event) {
            match previous {
                Some(report) => {
                    self.reports.insert(location, report);
                }
                None => {
                    self.reports.remove(&location);
                }
            }
            return Err(match e {
                mpsc::error::TrySendError::Full(_) => {
                    Error::internal("ingestion queue is full, retry later")
                }
                mpsc::error::TrySendError::Closed(_) => {
                    Error::internal("ingestion workers are not running")
                }
            });
        }

        tracing::info!("Queued ingestion job {}", job_id);
        Ok(job_id)
    }

    /// Latest report for a document location
    pub fn report(&self, location: &str) -> Option<IngestReport> {
        self.reports.get(location).map(|r| r.clone())
    }

    /// Store the final report of a run
    pub(crate) fn store_report(&self, report: IngestReport) {
        self.reports.insert(report.document_id.clone(), report);
    }

    /// All known reports, one per document
    pub fn reports(&self) -> Vec<IngestReport> {
        self.reports.iter().map(|r| r.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::response::IngestState;

    #[test]
    fn submit_makes_a_received_report_visible() {
        let (queue, _receiver) = IngestQueue::new(8);
        queue.submit(IngestEvent::new("docs/a.txt")).unwrap();

        let report = queue.report("docs/a.txt").unwrap();
        assert_eq!(report.state, IngestState::Received);
        assert!(queue.report("docs/other.txt").is_none());
    }

    #[test]
    fn full_queue_rejects_submission() {
        let (queue, _receiver) = IngestQueue::new(1);
        queue.submit(IngestEvent::new("docs/a.txt")).unwrap();
        let err = queue.submit(IngestEvent::new("docs/b.txt")).unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }

    #[test]
    fn rejected_submission_leaves_no_received_report() {
        let (queue, receiver) = IngestQueue::new(1);
        drop(receiver);
        queue.submit(IngestEvent::new("docs/a.txt")).unwrap_err();
        assert!(queue.report("docs/a.txt").is_none());
    }

    /// A worker that finishes a run immediately after picking it up must
    /// not have its terminal report overwritten by the submit that queued
    /// it. Runs many rounds because the overlap window is narrow.
    #[tokio::test]
    async fn submit_never_clobbers_a_finished_report() {
        let (queue, mut receiver) = IngestQueue::new(32);
        let worker_queue = queue.clone();
        let worker = tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                let mut report = IngestReport::new(event.location);
                report.fail("unsupported file type");
                worker_queue.store_report(report);
            }
        });

        for round in 0..100 {
            let location = format!("docs/{}.zip", round);
            queue.submit(IngestEvent::new(location.clone())).unwrap();

            let mut state = IngestState::Received;
            for _ in 0..200 {
                state = queue.report(&location).unwrap().state;
                if state == IngestState::Failed {
                    break;
                }
                tokio::time::sleep(std::time::Duration::from_millis(1)).await;
            }
            assert_eq!(
                state,
                IngestState::Failed,
                "terminal report for {} was lost",
                location
            );
        }

        worker.abort();
    }
}
