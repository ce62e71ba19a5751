//! Scheduled Publisher — background sweep that publishes due content.
//!
//! Flow per sweep: find due items (earliest first) → claim each via an
//! atomic status UPDATE (one winner) → publish exactly once per claim →
//! record success or classify the failure and apply the retry policy.
//!
//! Sweeps never overlap: the loop awaits each sweep before the next tick
//! (`MissedTickBehavior::Delay`). Within a sweep, items run concurrently up
//! to a bounded worker pool; the DB claim plus the in-process guard keep a
//! content id from ever being processed twice at once.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use anyhow::Result;
use chrono::Utc;
use sqlx::PgPool;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::clients::SocialPublisher;
use crate::errors::{AppError, PublishError};
use crate::models::content::{ContentStatus, GeneratedContentRow};
use crate::publisher::guard::InFlightGuard;
use crate::publisher::retry::{dispose, Disposition};
use crate::voice::tracker::VoiceTracker;

/// Result of one claimed publish attempt.
#[derive(Debug)]
enum AttemptOutcome {
    Published,
    Failed(PublishError),
    /// Claim lost or transition not allowed; nothing was attempted.
    Skipped,
}

#[derive(Clone)]
pub struct ScheduledPublisher {
    pool: PgPool,
    publisher: Arc<dyn SocialPublisher>,
    voice: VoiceTracker,
    guard: InFlightGuard,
    workers: Arc<Semaphore>,
    max_retries: i32,
    backoff_base_secs: i64,
}

impl ScheduledPublisher {
    pub fn new(
        pool: PgPool,
        publisher: Arc<dyn SocialPublisher>,
        voice: VoiceTracker,
        concurrency: usize,
        max_retries: i32,
        backoff_base_secs: i64,
    ) -> Self {
        Self {
            pool,
            publisher,
            voice,
            guard: InFlightGuard::new(),
            workers: Arc::new(Semaphore::new(concurrency.max(1))),
            max_retries,
            backoff_base_secs,
        }
    }

    /// Recurring sweep loop. Runs until the process exits.
    pub async fn run(self, interval_secs: u64) {
        let mut ticker = tokio::time::interval(StdDuration::from_secs(interval_secs.max(1)));
        // A slow sweep delays the next tick instead of stacking sweeps.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Scheduled publisher started (interval {interval_secs}s)");
        loop {
            ticker.tick().await;
            if let Err(e) = self.sweep().await {
                error!("Publish sweep failed: {e:#}");
            }
        }
    }

    /// One pass over everything currently due, earliest-scheduled first.
    pub async fn sweep(&self) -> Result<usize> {
        let due = self.due_items().await?;
        if due.is_empty() {
            return Ok(0);
        }
        debug!("Publish sweep: {} due item(s)", due.len());

        let mut tasks = JoinSet::new();
        for item in due {
            let this = self.clone();
            let permit = self.workers.clone().acquire_owned().await?;
            tasks.spawn(async move {
                let _permit = permit;
                this.attempt(item).await
            });
        }

        let mut published = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(AttemptOutcome::Published)) => published += 1,
                Ok(Ok(_)) => {}
                Ok(Err(e)) => warn!("Publish attempt errored: {e:#}"),
                Err(e) => error!("Publish worker panicked: {e}"),
            }
        }

        if published > 0 {
            info!("Publish sweep completed: {published} item(s) published");
        }
        Ok(published)
    }

    /// Due = scheduled content past its time, plus failed content whose
    /// backoff window elapsed and retry bound is not exhausted. Terminal
    /// failures carry a NULL next_attempt_at and never match.
    async fn due_items(&self) -> Result<Vec<GeneratedContentRow>> {
        let now = Utc::now();
        Ok(sqlx::query_as(
            r#"
            SELECT * FROM generated_content
            WHERE (status = 'scheduled' AND scheduled_at <= $1)
               OR (status = 'failed'
                   AND next_attempt_at IS NOT NULL
                   AND next_attempt_at <= $1
                   AND retry_count < $2)
            ORDER BY scheduled_at ASC NULLS LAST
            "#,
        )
        .bind(now)
        .bind(self.max_retries)
        .fetch_all(&self.pool)
        .await?)
    }

    /// Runs one publish attempt for an item picked up by the sweep.
    async fn attempt(&self, item: GeneratedContentRow) -> Result<AttemptOutcome> {
        let Some(from) = ContentStatus::parse(&item.status) else {
            warn!("Content {} has unknown status '{}', skipping", item.id, item.status);
            return Ok(AttemptOutcome::Skipped);
        };

        if !self.guard.try_claim(item.id) {
            debug!("Content {} already in flight, skipping", item.id);
            return Ok(AttemptOutcome::Skipped);
        }
        let result = self.attempt_claimed(&item, from).await;
        self.guard.release(item.id);
        result
    }

    /// The caller must hold the in-flight guard for `item.id`.
    async fn attempt_claimed(
        &self,
        item: &GeneratedContentRow,
        from: ContentStatus,
    ) -> Result<AttemptOutcome> {
        if !from.can_transition(ContentStatus::Publishing) {
            warn!(
                "Illegal transition {} -> publishing for content {}, skipping",
                from.as_str(),
                item.id
            );
            return Ok(AttemptOutcome::Skipped);
        }

        // Atomic claim: only one worker can win the status flip.
        let claimed = sqlx::query(
            "UPDATE generated_content SET status = 'publishing' WHERE id = $1 AND status = $2",
        )
        .bind(item.id)
        .bind(from.as_str())
        .execute(&self.pool)
        .await?
        .rows_affected();
        if claimed == 0 {
            debug!("Lost claim for content {}", item.id);
            return Ok(AttemptOutcome::Skipped);
        }

        // Exactly one external call per claim.
        match self.publisher.publish(&item.body).await {
            Ok(receipt) => {
                self.mark_published(item.id, &receipt.external_post_id).await?;
                info!(
                    "Published content {} as external post {}",
                    item.id, receipt.external_post_id
                );

                // Side bookkeeping must not fail the publish.
                if let Err(e) = self.voice.note_post_published(item.user_id).await {
                    warn!("Voice post counter update failed for {}: {e:#}", item.user_id);
                }
                Ok(AttemptOutcome::Published)
            }
            Err(e) => {
                self.record_failure(item, &e).await?;
                Ok(AttemptOutcome::Failed(e))
            }
        }
    }

    async fn mark_published(&self, id: Uuid, external_post_id: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE generated_content
            SET status = 'published', published_at = $2, external_post_id = $3,
                failure_reason = NULL, next_attempt_at = NULL
            WHERE id = $1 AND status = 'publishing'
            "#,
        )
        .bind(id)
        .bind(Utc::now())
        .bind(external_post_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Applies the retry policy: terminal failures get a NULL
    /// next_attempt_at (never swept again); retryable ones get a backoff
    /// window and stay eligible.
    async fn record_failure(&self, item: &GeneratedContentRow, error: &PublishError) -> Result<()> {
        let retry_count = item.retry_count + 1;
        let disposition = dispose(error.kind, retry_count, self.max_retries, self.backoff_base_secs);

        let next_attempt_at = match disposition {
            Disposition::Retry { delay } => Some(Utc::now() + delay),
            Disposition::Terminal => None,
        };
        let reason = format!("{}: {}", error.kind.as_str(), error.message);

        sqlx::query(
            r#"
            UPDATE generated_content
            SET status = 'failed', retry_count = $2, failure_reason = $3, next_attempt_at = $4
            WHERE id = $1 AND status = 'publishing'
            "#,
        )
        .bind(item.id)
        .bind(retry_count)
        .bind(&reason)
        .bind(next_attempt_at)
        .execute(&self.pool)
        .await?;

        match disposition {
            Disposition::Retry { delay } => warn!(
                "Publish failed for content {} ({}), retry {} of {} in {}s",
                item.id,
                error.kind.as_str(),
                retry_count,
                self.max_retries,
                delay.num_seconds()
            ),
            Disposition::Terminal => warn!(
                "Publish terminally failed for content {} ({}): {}",
                item.id,
                error.kind.as_str(),
                error.message
            ),
        }
        Ok(())
    }

    /// Immediate publish path used by the API. Same claim discipline as the
    /// sweep; a second invocation while one is in flight is rejected.
    pub async fn publish_now(&self, id: Uuid) -> Result<GeneratedContentRow, AppError> {
        let item: Option<GeneratedContentRow> =
            sqlx::query_as("SELECT * FROM generated_content WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        let item = item.ok_or_else(|| AppError::NotFound(format!("Content {id} not found")))?;

        let from = ContentStatus::parse(&item.status)
            .ok_or_else(|| AppError::Validation(format!("Content {id} has corrupt status")))?;
        if !from.can_transition(ContentStatus::Publishing) {
            return Err(AppError::Conflict(format!(
                "Content {id} cannot be published from status '{}'",
                from.as_str()
            )));
        }

        if !self.guard.try_claim(id) {
            return Err(AppError::Conflict(format!(
                "Content {id} already has a publish attempt in flight"
            )));
        }
        let outcome = self.attempt_claimed(&item, from).await;
        self.guard.release(id);

        match outcome {
            Ok(AttemptOutcome::Published) => {
                let row: GeneratedContentRow =
                    sqlx::query_as("SELECT * FROM generated_content WHERE id = $1")
                        .bind(id)
                        .fetch_one(&self.pool)
                        .await?;
                Ok(row)
            }
            Ok(AttemptOutcome::Failed(e)) => Err(AppError::Publish(e)),
            Ok(AttemptOutcome::Skipped) => Err(AppError::Conflict(format!(
                "Content {id} was claimed by a concurrent publish attempt"
            ))),
            Err(e) => Err(AppError::Internal(e)),
        }
    }
}
