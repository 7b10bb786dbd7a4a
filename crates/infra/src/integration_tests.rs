//! Integration tests for the full job pipeline.
//!
//! Tests: JobRunner → RemovalWorkflow → in-memory ports → JobStore
//!
//! Verifies:
//! - Delayed batches report progress and finish with the removed ids
//! - Cancellation stops the run between batches
//! - A failed batch is archived and does not stop the run
//! - Structural failures fail the job

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, Utc};

    use grouppurge_core::{DomainError, DomainResult, GroupId, QueueEntryId};
    use grouppurge_removal::{
        Group, MembershipRepository, QueueEntry, RemovalCandidate, RemovalConfig, RemovalHistory,
        RemovalOutcome, RemovalQueue, RemovalWorkflow, RemoveCallError, User, WorkflowError,
        populate_queue,
    };

    use crate::adapters::InMemoryBackend;
    use crate::jobs::{
        InMemoryJobStore, JobError, JobId, JobKind, JobOutcome, JobRecord, JobRunner, JobStatus,
        RunnerConfig,
    };

    const GROUP: &str = "120363000000@g.us";
    const DELAY: Duration = Duration::from_secs(10);
    const WINDOW: Duration = Duration::from_secs(30 * 24 * 60 * 60);

    type Runner = JobRunner<Arc<InMemoryJobStore>>;

    fn runner(backend: &InMemoryBackend) -> Runner {
        JobRunner::new(
            InMemoryJobStore::arc(),
            RemovalWorkflow::new(backend.ports()),
            RunnerConfig::default(),
        )
    }

    /// A group with `n` members silent for 90 days.
    fn inactive_group(backend: &InMemoryBackend, n: usize) -> (Group, Vec<User>) {
        let group = backend.add_group(GROUP, "Neighbourhood").unwrap();
        let joined = Utc::now() - ChronoDuration::days(90);
        let users = (0..n)
            .map(|i| {
                backend
                    .add_member(&group, &format!("55119000000{i:02}"), joined, None)
                    .unwrap()
            })
            .collect();
        (group, users)
    }

    fn ids(users: &[User]) -> Vec<String> {
        users.iter().map(|u| u.whatsapp_id.clone()).collect()
    }

    fn workflow_config(batch_size: usize) -> RemovalConfig {
        RemovalConfig::new(GROUP, batch_size, DELAY).with_inactivity_window(WINDOW)
    }

    /// Let spawned job tasks run up to their next timer.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    async fn wait_for_result(runner: &Runner, id: JobId) -> JobRecord {
        for _ in 0..1_000 {
            let job = runner.get_job_status(id).unwrap();
            if job.result.is_some() && job.is_terminal() {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        panic!("job {id} did not finish");
    }

    #[tokio::test(start_paused = true)]
    async fn start_then_status_is_pending_or_running() {
        let backend = InMemoryBackend::new();
        inactive_group(&backend, 1);
        let runner = runner(&backend);

        let id = runner
            .start_job(JobKind::RemovalWorkflow, workflow_config(1))
            .unwrap();
        let status = runner.get_job_status(id).unwrap().status;
        assert!(matches!(status, JobStatus::Pending | JobStatus::Running));
    }

    #[tokio::test(start_paused = true)]
    async fn dry_run_removes_in_delayed_batches() {
        let backend = InMemoryBackend::new();
        let (group, users) = inactive_group(&backend, 3);
        let runner = runner(&backend);

        let id = runner
            .start_job(JobKind::RemovalWorkflow, workflow_config(2).dry_run(true))
            .unwrap();

        settle().await;
        let job = runner.get_job_status(id).unwrap();
        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.progress.processed, 2);
        assert_eq!(job.progress.total, Some(3));
        assert_eq!(job.progress.current_batch, Some(1));

        tokio::time::sleep(DELAY).await;
        let job = runner.get_job_status(id).unwrap();
        assert_eq!(job.progress.processed, 3);
        assert_eq!(job.progress.current_batch, Some(2));

        let job = wait_for_result(&runner, id).await;
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.result, Some(JobOutcome::removed(ids(&users))));
        assert!(job.started_at.is_some());
        assert!(job.completed_at.is_some());

        assert!(backend.remover.calls().is_empty(), "dry run never calls the platform");
        let history = backend.history.list(group.id).await.unwrap();
        assert_eq!(history.len(), 3);
        assert!(history.iter().all(|h| h.outcome == RemovalOutcome::Success
            && h.reason == "dry run: batch removal succeeded"));
        assert_eq!(backend.queue.count(group.id).await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_after_first_batch_keeps_only_first_batch() {
        let backend = InMemoryBackend::new();
        let (group, users) = inactive_group(&backend, 3);
        let runner = runner(&backend);

        let id = runner
            .start_job(JobKind::RemovalWorkflow, workflow_config(2))
            .unwrap();

        settle().await;
        assert_eq!(runner.get_job_status(id).unwrap().progress.processed, 2);

        runner.cancel_job(id).unwrap();
        assert_eq!(runner.get_job_status(id).unwrap().status, JobStatus::Cancelled);

        let job = wait_for_result(&runner, id).await;
        assert_eq!(job.status, JobStatus::Cancelled);
        assert_eq!(job.result, Some(JobOutcome::removed(ids(&users[..2]))));
        assert_eq!(job.progress.processed, 2);
        assert_eq!(job.progress.message.as_deref(), Some("cancelled after 2 processed"));

        assert_eq!(backend.remover.calls().len(), 1);
        let remaining = backend.queue.list(group.id).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].whatsapp_id, users[2].whatsapp_id);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_batch_is_archived_and_run_continues() {
        let backend = InMemoryBackend::new();
        let (group, users) = inactive_group(&backend, 3);
        backend
            .remover
            .fail_call(1, RemoveCallError::Rejected("not an admin".into()));
        let runner = runner(&backend);

        let id = runner
            .start_job(JobKind::RemovalWorkflow, workflow_config(2))
            .unwrap();
        let job = wait_for_result(&runner, id).await;

        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.result, Some(JobOutcome::removed(ids(&users[2..]))));
        assert_eq!(job.progress.processed, 3);

        let history = backend.history.list(group.id).await.unwrap();
        let failures: Vec<_> = history
            .iter()
            .filter(|h| h.outcome == RemovalOutcome::Failure)
            .collect();
        assert_eq!(failures.len(), 2);
        assert!(failures.iter().all(|h| {
            h.reason == "batch removal failed: removal rejected by platform: not an admin"
        }));
        assert_eq!(backend.queue.count(group.id).await.unwrap(), 0);

        // Memberships go regardless of the batch outcome.
        assert!(backend.memberships.list_for_group(group.id).await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn queue_only_job_drains_populated_queue() {
        let backend = InMemoryBackend::new();
        let group = backend.add_group(GROUP, "Neighbourhood").unwrap();
        // Recently active members are never picked up by the sync phase.
        let users: Vec<User> = (0..3)
            .map(|i| {
                backend
                    .add_member(&group, &format!("551190000010{i}"), Utc::now(), Some(Utc::now()))
                    .unwrap()
            })
            .collect();
        let runner = runner(&backend);

        let report = populate_queue(runner.workflow().ports(), GROUP, &ids(&users))
            .await
            .unwrap();
        assert_eq!(report.inserted, 3);

        let id = runner
            .start_job(
                JobKind::RemovalQueueOnly,
                RemovalConfig::new(GROUP, 5, Duration::from_secs(1)),
            )
            .unwrap();
        let job = wait_for_result(&runner, id).await;

        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.result, Some(JobOutcome::removed(ids(&users))));
        let calls = backend.remover.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].group_whatsapp_id, GROUP);
        assert_eq!(calls[0].member_whatsapp_ids, ids(&users));
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_group_fails_the_job() {
        let backend = InMemoryBackend::new();
        let runner = runner(&backend);

        let id = runner
            .start_job(JobKind::RemovalWorkflow, workflow_config(2))
            .unwrap();
        let job = wait_for_result(&runner, id).await;

        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(
            job.result,
            Some(JobOutcome::error(format!("group not found: {GROUP}")))
        );
        assert!(job.completed_at.is_some());
    }

    /// Queue whose reads always fail.
    struct BrokenQueue;

    #[async_trait]
    impl RemovalQueue for BrokenQueue {
        async fn upsert(&self, _: RemovalCandidate) -> DomainResult<(QueueEntry, bool)> {
            Err(DomainError::storage("queue offline"))
        }

        async fn fetch_oldest(&self, _: GroupId, _: usize) -> DomainResult<Vec<QueueEntry>> {
            Err(DomainError::storage("queue offline"))
        }

        async fn delete(&self, _: QueueEntryId) -> DomainResult<bool> {
            Err(DomainError::storage("queue offline"))
        }

        async fn count(&self, _: GroupId) -> DomainResult<u64> {
            Err(DomainError::storage("queue offline"))
        }

        async fn list(&self, _: GroupId) -> DomainResult<Vec<QueueEntry>> {
            Err(DomainError::storage("queue offline"))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn storage_failure_fails_the_job() {
        let backend = InMemoryBackend::new();
        inactive_group(&backend, 2);
        let mut ports = backend.ports();
        ports.queue = Arc::new(BrokenQueue);
        let runner = JobRunner::new(
            InMemoryJobStore::arc(),
            RemovalWorkflow::new(ports),
            RunnerConfig::default(),
        );

        let id = runner
            .start_job(JobKind::RemovalQueueOnly, RemovalConfig::new(GROUP, 2, DELAY))
            .unwrap();
        let job = wait_for_result(&runner, id).await;

        assert_eq!(job.status, JobStatus::Failed);
        match job.result {
            Some(JobOutcome::Error { error }) => assert!(error.contains("queue offline")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_of_finished_or_unknown_job_is_rejected() {
        let backend = InMemoryBackend::new();
        inactive_group(&backend, 1);
        let runner = runner(&backend);

        let id = runner
            .start_job(JobKind::RemovalWorkflow, workflow_config(1))
            .unwrap();
        let job = wait_for_result(&runner, id).await;
        assert_eq!(job.status, JobStatus::Completed);

        assert_eq!(
            runner.cancel_job(id),
            Err(JobError::Conflict {
                id,
                status: JobStatus::Completed
            })
        );
        assert_eq!(runner.get_job_status(id).unwrap().status, JobStatus::Completed);

        let unknown = JobId::new();
        assert_eq!(runner.cancel_job(unknown), Err(JobError::NotFound(unknown)));
        assert!(matches!(runner.get_job_status(unknown), Err(JobError::NotFound(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn processed_never_decreases_across_polls() {
        let backend = InMemoryBackend::new();
        inactive_group(&backend, 7);
        let runner = runner(&backend);

        let id = runner
            .start_job(JobKind::RemovalWorkflow, workflow_config(2))
            .unwrap();

        let mut last = 0;
        loop {
            let job = runner.get_job_status(id).unwrap();
            assert!(job.progress.processed >= last);
            last = job.progress.processed;
            if job.is_terminal() && job.result.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(2_500)).await;
        }
        assert_eq!(last, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn jobs_on_different_groups_run_independently() {
        let backend = InMemoryBackend::new();
        let (_, first) = inactive_group(&backend, 2);
        let other = backend.add_group("120363999999@g.us", "Other").unwrap();
        let joined = Utc::now() - ChronoDuration::days(90);
        let second = backend.add_member(&other, "5511988887777", joined, None).unwrap();
        let runner = runner(&backend);

        let a = runner
            .start_job(JobKind::RemovalWorkflow, workflow_config(1))
            .unwrap();
        let b = runner
            .start_job(
                JobKind::RemovalWorkflow,
                RemovalConfig::new("120363999999@g.us", 1, DELAY).with_inactivity_window(WINDOW),
            )
            .unwrap();

        runner.cancel_job(a).unwrap();

        let a = wait_for_result(&runner, a).await;
        let b = wait_for_result(&runner, b).await;
        assert_eq!(a.status, JobStatus::Cancelled);
        assert!(a.result.unwrap().removed_ids().len() < first.len());
        assert_eq!(b.status, JobStatus::Completed);
        assert_eq!(b.result, Some(JobOutcome::removed(vec![second.whatsapp_id])));
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_requests_create_no_job() {
        let backend = InMemoryBackend::new();
        let runner = runner(&backend);

        let cases = [
            (JobKind::RemovalQueueOnly, RemovalConfig::new("  ", 2, DELAY)),
            (JobKind::RemovalQueueOnly, RemovalConfig::new(GROUP, 0, DELAY)),
            (JobKind::RemovalQueueOnly, RemovalConfig::new(GROUP, 101, DELAY)),
            (
                JobKind::RemovalQueueOnly,
                RemovalConfig::new(GROUP, 2, Duration::from_millis(999)),
            ),
            (JobKind::RemovalWorkflow, RemovalConfig::new(GROUP, 2, DELAY)),
            (
                JobKind::RemovalWorkflow,
                RemovalConfig::new(GROUP, 2, DELAY).with_inactivity_window(Duration::ZERO),
            ),
            (
                JobKind::RemovalWorkflow,
                RemovalConfig::new(GROUP, 2, DELAY)
                    .with_inactivity_window(Duration::from_millis(10_u64.pow(16))),
            ),
        ];

        for (kind, config) in cases {
            let err = runner.start_job(kind, config.clone()).unwrap_err();
            assert!(matches!(err, JobError::Validation(_)), "{config:?} -> {err:?}");
        }
        assert!(runner.list_jobs(None).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_delay_is_rejected_even_without_a_floor() {
        let backend = InMemoryBackend::new();
        let runner = JobRunner::new(
            InMemoryJobStore::arc(),
            RemovalWorkflow::new(backend.ports()),
            RunnerConfig::default().with_min_delay(Duration::ZERO),
        );

        let err = runner
            .start_job(JobKind::RemovalQueueOnly, RemovalConfig::new(GROUP, 2, Duration::ZERO))
            .unwrap_err();
        assert!(matches!(err, JobError::Validation(_)));
        assert!(runner.list_jobs(None).is_empty());

        runner
            .start_job(
                JobKind::RemovalQueueOnly,
                RemovalConfig::new(GROUP, 2, Duration::from_millis(1)),
            )
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn delete_cancels_a_running_job() {
        let backend = InMemoryBackend::new();
        inactive_group(&backend, 4);
        let runner = runner(&backend);

        let id = runner
            .start_job(JobKind::RemovalWorkflow, workflow_config(2))
            .unwrap();
        settle().await;
        let token = runner.get_job_status(id).unwrap().cancellation;

        runner.delete_job(id).unwrap();
        assert!(token.is_cancelled());
        assert!(runner.get_job_status(id).is_err());
        assert_eq!(runner.delete_job(id), Err(JobError::NotFound(id)));

        tokio::time::sleep(DELAY * 3).await;
        assert_eq!(backend.remover.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn list_jobs_filters_by_status() {
        let backend = InMemoryBackend::new();
        inactive_group(&backend, 2);
        let runner = runner(&backend);

        let done = runner
            .start_job(JobKind::RemovalWorkflow, workflow_config(2))
            .unwrap();
        wait_for_result(&runner, done).await;
        let running = runner
            .start_job(JobKind::RemovalQueueOnly, RemovalConfig::new(GROUP, 2, DELAY))
            .unwrap();

        let all: Vec<_> = runner.list_jobs(None).into_iter().map(|j| j.id).collect();
        assert_eq!(all, vec![done, running]);
        let completed = runner.list_jobs(Some(JobStatus::Completed));
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].id, done);
    }

    #[tokio::test]
    async fn sync_is_idempotent_and_skips_whitelisted() {
        let backend = InMemoryBackend::new();
        let (group, users) = inactive_group(&backend, 3);
        backend.whitelist(&users[1], &group).unwrap();
        let active = backend
            .add_member(&group, "5511977776666", Utc::now(), Some(Utc::now()))
            .unwrap();
        let workflow = RemovalWorkflow::new(backend.ports());

        let first = workflow.sync_group(&group, WINDOW).await.unwrap();
        let second = workflow.sync_group(&group, WINDOW).await.unwrap();

        let queued: Vec<_> = first.iter().map(|e| e.whatsapp_id.clone()).collect();
        assert_eq!(queued, vec![users[0].whatsapp_id.clone(), users[2].whatsapp_id.clone()]);
        assert_eq!(first, second);
        assert_eq!(backend.queue.count(group.id).await.unwrap(), 2);
        assert!(first.iter().all(|e| e.reason == "inactive"));
        assert!(first.iter().all(|e| e.whatsapp_id != active.whatsapp_id));
    }

    #[tokio::test]
    async fn sync_rejects_a_window_beyond_the_calendar() {
        let backend = InMemoryBackend::new();
        let (group, _) = inactive_group(&backend, 1);
        let workflow = RemovalWorkflow::new(backend.ports());

        let err = workflow
            .sync_group(&group, Duration::from_millis(10_u64.pow(16)))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Storage(DomainError::Validation(_))), "{err:?}");
        assert_eq!(backend.queue.count(group.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn populate_skips_whitelisted_and_reports_unknown() {
        let backend = InMemoryBackend::new();
        let (group, users) = inactive_group(&backend, 3);
        backend.whitelist(&users[0], &group).unwrap();
        backend.whitelist(&users[2], &group).unwrap();

        let mut input = ids(&users);
        input.push("5500000000000".to_string());
        let report = populate_queue(&backend.ports(), GROUP, &input).await.unwrap();

        assert_eq!(report.inserted, 1);
        assert_eq!(report.skipped_whitelisted, 2);
        assert_eq!(
            report.skipped_whitelisted_ids,
            vec![users[0].whatsapp_id.clone(), users[2].whatsapp_id.clone()]
        );
        assert_eq!(report.not_found, vec!["5500000000000".to_string()]);

        let queued = backend.queue.list(group.id).await.unwrap();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].whatsapp_id, users[1].whatsapp_id);
        assert_eq!(queued[0].reason, "manual");

        let again = populate_queue(&backend.ports(), GROUP, &input).await.unwrap();
        assert_eq!(again.inserted, 0);
        assert_eq!(again.already_queued, 1);
    }

    #[tokio::test]
    async fn populate_unknown_group_is_not_found() {
        let backend = InMemoryBackend::new();
        let err = populate_queue(&backend.ports(), "nope@g.us", &[]).await.unwrap_err();
        assert_eq!(err.to_string(), "group not found: nope@g.us");
    }
}
