//! Aggregation service over the modification store
//!
//! Every read path goes through the TTL cache: look the typed key up,
//! recompute from the store on a miss, populate, return. A retryable store
//! error on a read gets one retry after a short backoff; nothing here ever
//! writes, so there is no write-retry question. Cache staleness inside the
//! TTL is accepted by contract.

use crate::cache::{TtlCache, TTL_HISTORICAL, TTL_RECENT_USERS, TTL_TODAY};
use crate::error::{ReportError, ReportResult};
use crate::key::CacheKey;
use chrono::{DateTime, NaiveDate, Utc};
use custos_core::{
    day_window, month_before_today, today_window, week_dates, AuthorizationStatus, TimeWindow,
};
use custos_persistence::{InitiatorCountRow, ModificationRepo, UserRepo};
use serde::Serialize;
use sqlx::SqlitePool;
use std::time::Duration;
use tracing::warn;

const RETRY_BACKOFF: Duration = Duration::from_millis(100);

/// One day of a weekly breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyTotal {
    pub date: NaiveDate,
    pub count: i64,
}

/// Per-day counts for the current week plus their sum.
#[derive(Debug, Clone, Serialize)]
pub struct WeeklySummary {
    pub days: Vec<DailyTotal>,
    pub total: i64,
}

/// Listing row for the most recently created users.
#[derive(Debug, Clone, Serialize)]
pub struct RecentUser {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// A user together with how many modifications they initiated.
#[derive(Debug, Clone, Serialize)]
pub struct InitiatorTotal {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub records: i64,
}

impl From<InitiatorCountRow> for InitiatorTotal {
    fn from(row: InitiatorCountRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            first_name: row.first_name,
            last_name: row.last_name,
            records: row.records,
        }
    }
}

/// Cached aggregation reads for dashboards.
pub struct ReportService {
    pool: SqlitePool,
    counts: TtlCache<CacheKey, i64>,
    users: TtlCache<CacheKey, Vec<RecentUser>>,
    leaders: TtlCache<CacheKey, Vec<InitiatorTotal>>,
}

impl ReportService {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            counts: TtlCache::new(),
            users: TtlCache::new(),
            leaders: TtlCache::new(),
        }
    }

    /// Drop every cached aggregate.
    pub fn invalidate(&self) {
        self.counts.clear();
        self.users.clear();
        self.leaders.clear();
    }

    // === Count reads ===

    /// Modifications with `status` initiated by `actor_id` today.
    pub async fn count_today(
        &self,
        actor_id: i64,
        status: AuthorizationStatus,
    ) -> ReportResult<i64> {
        let window = today_window(Utc::now());
        self.cached_count(CacheKey::count(status, actor_id, window), TTL_TODAY, || {
            ModificationRepo::count_in_window(&self.pool, actor_id, status, window)
        })
        .await
    }

    /// Modifications with `status` initiated by `actor_id` from the first
    /// of the month up to (excluding) today. Zero on the first of the
    /// month without touching the store.
    pub async fn count_month_before_today(
        &self,
        actor_id: i64,
        status: AuthorizationStatus,
    ) -> ReportResult<i64> {
        let window = month_before_today(Utc::now());
        if window.is_empty() {
            return Ok(0);
        }
        self.cached_count(
            CacheKey::count(status, actor_id, window),
            TTL_HISTORICAL,
            || ModificationRepo::count_in_window(&self.pool, actor_id, status, window),
        )
        .await
    }

    /// This month so far: the closed before-today bucket plus today's.
    pub async fn count_this_month(
        &self,
        actor_id: i64,
        status: AuthorizationStatus,
    ) -> ReportResult<i64> {
        let before = self.count_month_before_today(actor_id, status).await?;
        let today = self.count_today(actor_id, status).await?;
        Ok(before + today)
    }

    /// All modifications `actor_id` initiated today, any status.
    pub async fn total_today(&self, actor_id: i64) -> ReportResult<i64> {
        let window = today_window(Utc::now());
        self.cached_count(CacheKey::total(actor_id, window), TTL_TODAY, || async move {
            let mut total = 0;
            for status in [
                AuthorizationStatus::Pending,
                AuthorizationStatus::Approved,
                AuthorizationStatus::Rejected,
            ] {
                total +=
                    ModificationRepo::count_in_window(&self.pool, actor_id, status, window).await?;
            }
            Ok(total)
        })
        .await
    }

    /// Per-day totals for the current week, Monday through today. Closed
    /// days are cached long, today's bucket short.
    pub async fn weekly_summary(
        &self,
        actor_id: i64,
        status: AuthorizationStatus,
    ) -> ReportResult<WeeklySummary> {
        let now = Utc::now();
        let today = now.date_naive();
        let mut days = Vec::new();
        for date in week_dates(now) {
            let window = day_window(date);
            let ttl = if date == today { TTL_TODAY } else { TTL_HISTORICAL };
            let count = self
                .cached_count(CacheKey::count(status, actor_id, window), ttl, || {
                    ModificationRepo::count_in_window(&self.pool, actor_id, status, window)
                })
                .await?;
            days.push(DailyTotal { date, count });
        }
        let total = days.iter().map(|day| day.count).sum();
        Ok(WeeklySummary { days, total })
    }

    // === Listing reads ===

    /// Most recently created users, newest first.
    pub async fn most_recent_users(&self, limit: i64) -> ReportResult<Vec<RecentUser>> {
        let key = CacheKey::most_recent_users(limit);
        if let Some(hit) = self.users.get(&key) {
            return Ok(hit);
        }
        let rows = retry_read(|| UserRepo::most_recent(&self.pool, limit)).await?;
        let users: Vec<RecentUser> = rows
            .into_iter()
            .map(|row| RecentUser {
                id: row.id,
                username: row.username,
                first_name: row.first_name,
                last_name: row.last_name,
                active: row.active,
                created_at: row.created_at,
            })
            .collect();
        self.users.insert(key, users.clone(), TTL_RECENT_USERS);
        Ok(users)
    }

    /// Users ranked by approved modifications initiated this week.
    pub async fn top_initiators_this_week(&self, limit: i64) -> ReportResult<Vec<InitiatorTotal>> {
        let window = week_window(Utc::now());
        let status = AuthorizationStatus::Approved;
        let key = CacheKey::top_initiators(status, window, limit);
        if let Some(hit) = self.leaders.get(&key) {
            return Ok(hit);
        }
        let rows = retry_read(|| UserRepo::top_initiators(&self.pool, status, window, limit)).await?;
        let leaders: Vec<InitiatorTotal> = rows.into_iter().map(InitiatorTotal::from).collect();
        self.leaders.insert(key, leaders.clone(), TTL_TODAY);
        Ok(leaders)
    }

    /// Per-user counts over an arbitrary `[from, to)` range. Range reports
    /// are ad-hoc, so this read is never cached.
    pub async fn performance_summary(
        &self,
        status: AuthorizationStatus,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ReportResult<Vec<InitiatorTotal>> {
        let window = TimeWindow::new(day_window(from).start, day_window(to).end);
        let rows = retry_read(|| UserRepo::performance_summary(&self.pool, status, window)).await?;
        Ok(rows.into_iter().map(InitiatorTotal::from).collect())
    }

    async fn cached_count<F, Fut>(
        &self,
        key: CacheKey,
        ttl: Duration,
        compute: F,
    ) -> ReportResult<i64>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = custos_persistence::PersistenceResult<i64>>,
    {
        if let Some(hit) = self.counts.get(&key) {
            return Ok(hit);
        }
        let value = retry_read(compute).await?;
        self.counts.insert(key, value, ttl);
        Ok(value)
    }
}

/// Monday midnight through the end of today.
fn week_window(now: DateTime<Utc>) -> TimeWindow {
    let dates = week_dates(now);
    // week_dates always yields at least today
    TimeWindow::new(
        day_window(dates[0]).start,
        day_window(*dates.last().unwrap()).end,
    )
}

/// Run a store read, retrying once after a short backoff when the failure
/// is retryable (pool timeout, transient unavailability).
async fn retry_read<F, Fut, T>(compute: F) -> ReportResult<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = custos_persistence::PersistenceResult<T>>,
{
    match compute().await {
        Err(err) if err.is_retryable() => {
            warn!(error = %err, "retryable store error on report read, retrying once");
            tokio::time::sleep(RETRY_BACKOFF).await;
            compute().await.map_err(ReportError::from)
        }
        other => other.map_err(ReportError::from),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use custos_core::UserSnapshot;
    use custos_persistence::{run_migrations, NewModification};
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        run_migrations(&pool).await.unwrap();
        pool
    }

    fn snapshot(username: &str) -> UserSnapshot {
        UserSnapshot {
            username: username.to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$abc$def".to_string(),
            access_level: custos_core::AccessLevel::Staff,
            active: true,
        }
    }

    async fn seed_user(pool: &SqlitePool, username: &str) -> i64 {
        let mut conn = pool.acquire().await.unwrap();
        UserRepo::insert_from_snapshot(&mut conn, &snapshot(username), None)
            .await
            .unwrap()
    }

    async fn stage(pool: &SqlitePool, initiator_id: i64, username: &str) -> i64 {
        ModificationRepo::stage(
            pool,
            NewModification {
                user_id: None,
                snapshot: &snapshot(username),
                security_modification: true,
                initiator_id,
            },
        )
        .await
        .unwrap()
        .id
    }

    #[tokio::test]
    async fn test_count_today_counts_only_this_actor() {
        let pool = test_pool().await;
        let alice = seed_user(&pool, "alice").await;
        let bob = seed_user(&pool, "bob").await;
        stage(&pool, alice, "new-a").await;
        stage(&pool, alice, "new-b").await;
        stage(&pool, bob, "new-c").await;

        let svc = ReportService::new(pool);
        assert_eq!(
            svc.count_today(alice, AuthorizationStatus::Pending)
                .await
                .unwrap(),
            2
        );
        assert_eq!(
            svc.count_today(bob, AuthorizationStatus::Pending)
                .await
                .unwrap(),
            1
        );
        assert_eq!(
            svc.count_today(alice, AuthorizationStatus::Approved)
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_count_today_is_cached_within_ttl() {
        let pool = test_pool().await;
        let alice = seed_user(&pool, "alice").await;
        stage(&pool, alice, "new-a").await;

        let svc = ReportService::new(pool.clone());
        assert_eq!(
            svc.count_today(alice, AuthorizationStatus::Pending)
                .await
                .unwrap(),
            1
        );

        // A new row inside the TTL is invisible until invalidation.
        stage(&pool, alice, "new-b").await;
        assert_eq!(
            svc.count_today(alice, AuthorizationStatus::Pending)
                .await
                .unwrap(),
            1
        );

        svc.invalidate();
        assert_eq!(
            svc.count_today(alice, AuthorizationStatus::Pending)
                .await
                .unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn test_this_month_is_before_today_plus_today() {
        let pool = test_pool().await;
        let alice = seed_user(&pool, "alice").await;
        stage(&pool, alice, "new-a").await;

        let svc = ReportService::new(pool);
        let before = svc
            .count_month_before_today(alice, AuthorizationStatus::Pending)
            .await
            .unwrap();
        let today = svc
            .count_today(alice, AuthorizationStatus::Pending)
            .await
            .unwrap();
        let month = svc
            .count_this_month(alice, AuthorizationStatus::Pending)
            .await
            .unwrap();
        assert_eq!(month, before + today);
        assert_eq!(today, 1);
    }

    #[tokio::test]
    async fn test_total_today_sums_all_statuses() {
        let pool = test_pool().await;
        let alice = seed_user(&pool, "alice").await;
        let checker = seed_user(&pool, "checker").await;
        let kept = stage(&pool, alice, "new-a").await;
        stage(&pool, alice, "new-b").await;

        let mut conn = pool.acquire().await.unwrap();
        ModificationRepo::resolve(
            &mut conn,
            kept,
            checker,
            AuthorizationStatus::Approved,
            None,
        )
        .await
        .unwrap();
        drop(conn);

        let svc = ReportService::new(pool);
        assert_eq!(svc.total_today(alice).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_weekly_summary_spans_monday_through_today() {
        let pool = test_pool().await;
        let alice = seed_user(&pool, "alice").await;
        stage(&pool, alice, "new-a").await;

        let svc = ReportService::new(pool);
        let summary = svc
            .weekly_summary(alice, AuthorizationStatus::Pending)
            .await
            .unwrap();

        let expected_days = week_dates(Utc::now()).len();
        assert_eq!(summary.days.len(), expected_days);
        assert_eq!(summary.total, 1);
        assert_eq!(summary.days.last().unwrap().count, 1);
    }

    #[tokio::test]
    async fn test_most_recent_users_newest_first() {
        let pool = test_pool().await;
        seed_user(&pool, "first").await;
        seed_user(&pool, "second").await;
        seed_user(&pool, "third").await;

        let svc = ReportService::new(pool);
        let users = svc.most_recent_users(2).await.unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].username, "third");
        assert_eq!(users[1].username, "second");
    }

    #[tokio::test]
    async fn test_top_initiators_ranked_by_approved() {
        let pool = test_pool().await;
        let alice = seed_user(&pool, "alice").await;
        let bob = seed_user(&pool, "bob").await;
        let checker = seed_user(&pool, "checker").await;

        for name in ["new-a", "new-b"] {
            let id = stage(&pool, alice, name).await;
            let mut conn = pool.acquire().await.unwrap();
            ModificationRepo::resolve(
                &mut conn,
                id,
                checker,
                AuthorizationStatus::Approved,
                None,
            )
            .await
            .unwrap();
        }
        stage(&pool, bob, "new-c").await;

        let svc = ReportService::new(pool);
        let leaders = svc.top_initiators_this_week(2).await.unwrap();
        assert_eq!(leaders[0].username, "alice");
        assert_eq!(leaders[0].records, 2);
        assert_eq!(leaders[1].records, 0);
    }

    #[tokio::test]
    async fn test_performance_summary_includes_every_user() {
        let pool = test_pool().await;
        let alice = seed_user(&pool, "alice").await;
        seed_user(&pool, "bob").await;
        stage(&pool, alice, "new-a").await;

        let svc = ReportService::new(pool);
        let today = Utc::now().date_naive();
        let rows = svc
            .performance_summary(AuthorizationStatus::Pending, today, today)
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].username, "alice");
        assert_eq!(rows[0].records, 1);
        assert_eq!(rows[1].records, 0);
    }
}
