//! Activity recorder
//!
//! Records an activity event for every workflow transition. Recording is
//! fire-and-forget from the engine's perspective: a failed insert is logged
//! and swallowed, it never rolls back the transition that triggered it.

use crate::services::ServiceContext;
use custos_core::{Activity, ActivityKind, EntityKind};
use custos_persistence::{ActivityFilter, ActivityRepo, NewActivity, PersistenceResult};
use tracing::warn;

/// Activity recorder over the activities table
pub struct ActivityRecorder<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> ActivityRecorder<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Record one activity event, best-effort. Failures are logged at warn
    /// level and dropped.
    pub async fn record(
        &self,
        entity_kind: EntityKind,
        entity_primary_value: i64,
        activity_kind: ActivityKind,
        reference_field: &str,
        reference_value: &str,
        actor_id: i64,
    ) {
        let activity = NewActivity {
            actor_id,
            entity_kind,
            entity_primary_value,
            activity_kind,
            reference_field: reference_field.to_string(),
            reference_value: reference_value.to_string(),
        };

        if let Err(err) = ActivityRepo::insert(self.ctx.pool(), &activity).await {
            warn!(
                actor_id,
                entity = entity_kind.as_str(),
                action = activity_kind.past_tense(),
                %err,
                "failed to record activity"
            );
        }
    }

    /// Most recent activities across all actors
    pub async fn most_recent(&self, limit: i64) -> PersistenceResult<Vec<Activity>> {
        let rows = ActivityRepo::most_recent(self.ctx.pool(), limit).await?;
        rows.into_iter().map(Activity::try_from).collect()
    }

    /// Most recent activities of one actor
    pub async fn most_recent_by_actor(
        &self,
        actor_id: i64,
        limit: i64,
    ) -> PersistenceResult<Vec<Activity>> {
        let rows = ActivityRepo::most_recent_by_actor(self.ctx.pool(), actor_id, limit).await?;
        rows.into_iter().map(Activity::try_from).collect()
    }

    /// Most recent activities touching one entity
    pub async fn most_recent_for_entity(
        &self,
        entity_kind: EntityKind,
        entity_primary_value: i64,
        limit: i64,
    ) -> PersistenceResult<Vec<Activity>> {
        let rows = ActivityRepo::most_recent_for_entity(
            self.ctx.pool(),
            entity_kind,
            entity_primary_value,
            limit,
        )
        .await?;
        rows.into_iter().map(Activity::try_from).collect()
    }

    /// Filtered, paginated audit-trail listing
    pub async fn filter(&self, filter: &ActivityFilter) -> PersistenceResult<Vec<Activity>> {
        let rows = ActivityRepo::filter(self.ctx.pool(), filter).await?;
        rows.into_iter().map(Activity::try_from).collect()
    }
}
