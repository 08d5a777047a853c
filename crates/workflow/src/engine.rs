//! Authorization workflow engine
//!
//! State machine per modification:
//!
//! ```text
//! PENDING --approve--> APPROVED   (terminal)
//! PENDING --reject---> REJECTED   (terminal)
//! ```
//!
//! Proposals stage a complete replacement snapshot of the target user
//! (snapshot-then-overlay, never a diff). Resolution runs in one database
//! transaction spanning the modification update and the user write.
//! Activity recording happens after commit and never rolls a transition
//! back.

use crate::activity::ActivityRecorder;
use crate::credentials;
use crate::error::{WorkflowError, WorkflowResult};
use crate::services::ServiceContext;
use custos_core::{
    AccessLevel, ActivityKind, AuthorizationStatus, EntityKind, Modification, ProposedFields,
    User, UserSnapshot,
};
use custos_persistence::{
    ModificationRepo, NewModification, PersistenceError, UserRepo,
};
use tracing::info;

/// The maker-checker workflow over user records.
pub struct WorkflowService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> WorkflowService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    fn recorder(&self) -> ActivityRecorder<'a> {
        ActivityRecorder::new(self.ctx)
    }

    /// Propose creating a brand-new user.
    ///
    /// The username dedup check scans live users only; a colliding create
    /// proposal still in flight is caught by the approval-time re-check.
    pub async fn propose_create(
        &self,
        fields: ProposedFields,
        actor_id: i64,
    ) -> WorkflowResult<Modification> {
        let username = fields
            .username
            .clone()
            .ok_or_else(|| WorkflowError::InvalidProposal("username is required".to_string()))?;
        let password = fields
            .password
            .clone()
            .ok_or_else(|| WorkflowError::InvalidProposal("password is required".to_string()))?;

        if UserRepo::username_taken(self.ctx.pool(), &username, None).await? {
            return Err(WorkflowError::DuplicateUsername(username));
        }

        let snapshot = UserSnapshot {
            username: username.clone(),
            first_name: fields.first_name.clone().unwrap_or_default(),
            last_name: fields.last_name.clone().unwrap_or_default(),
            password_hash: credentials::hash_password(&password)?,
            access_level: fields.access_level.unwrap_or(AccessLevel::Staff),
            active: fields.active.unwrap_or(true),
        };

        let row = ModificationRepo::stage(
            self.ctx.pool(),
            NewModification {
                user_id: None,
                snapshot: &snapshot,
                security_modification: true,
                initiator_id: actor_id,
            },
        )
        .await?;

        if let Some(permissions) = &fields.permissions {
            ModificationRepo::replace_permissions(self.ctx.pool(), row.id, permissions).await?;
        }

        info!(modification_id = row.id, username = %username, actor_id, "create proposed");
        self.recorder()
            .record(
                EntityKind::UserModification,
                row.id,
                ActivityKind::Create,
                "username",
                &username,
                actor_id,
            )
            .await;

        Ok(Modification::try_from(row)?)
    }

    /// Propose updating an existing user.
    ///
    /// The staged snapshot starts as a full copy of the current user state;
    /// only the fields actually supplied overwrite it. A supplied password
    /// is rehashed and marks the modification as a security modification,
    /// otherwise the stored hash is carried forward unchanged.
    pub async fn propose_update(
        &self,
        user_id: i64,
        fields: ProposedFields,
        actor_id: i64,
    ) -> WorkflowResult<Modification> {
        let user = self.user_by_id(user_id).await?;

        if let Some(username) = &fields.username {
            if UserRepo::username_taken(self.ctx.pool(), username, Some(user_id)).await? {
                return Err(WorkflowError::DuplicateUsername(username.clone()));
            }
        }

        // Friendly pre-check; the partial unique index closes the race.
        if ModificationRepo::find_pending_for_user(self.ctx.pool(), user_id)
            .await?
            .is_some()
        {
            return Err(WorkflowError::PendingModificationExists(user_id));
        }

        let mut snapshot = Modification::snapshot_with_overlay(&user, &fields);
        let mut security_modification = false;
        if let Some(password) = &fields.password {
            snapshot.password_hash = credentials::hash_password(password)?;
            security_modification = true;
        }

        let row = ModificationRepo::stage(
            self.ctx.pool(),
            NewModification {
                user_id: Some(user_id),
                snapshot: &snapshot,
                security_modification,
                initiator_id: actor_id,
            },
        )
        .await?;

        if let Some(permissions) = &fields.permissions {
            ModificationRepo::replace_permissions(self.ctx.pool(), row.id, permissions).await?;
        }

        info!(modification_id = row.id, user_id, actor_id, "update proposed");
        self.recorder()
            .record(
                EntityKind::User,
                user.id,
                ActivityKind::Update,
                "username",
                &user.username,
                actor_id,
            )
            .await;

        Ok(Modification::try_from(row)?)
    }

    /// An actor staging a change to their own record. Goes through the same
    /// maker-checker path as any other update.
    pub async fn propose_self_update(
        &self,
        actor_id: i64,
        fields: ProposedFields,
    ) -> WorkflowResult<Modification> {
        self.propose_update(actor_id, fields, actor_id).await
    }

    /// Approve a pending modification and apply it to the live record.
    ///
    /// For create-type modifications this re-checks username uniqueness
    /// inside the transaction, inserts the new user from the snapshot and
    /// links it back. For update-type modifications it overwrites the
    /// user's mutable fields (password only on security modifications) and
    /// replaces the permission set with the staged set when one was staged.
    pub async fn approve(
        &self,
        modification_id: i64,
        verifier_id: i64,
    ) -> WorkflowResult<Modification> {
        // Fail fast on unknown ids before opening a transaction
        self.modification_by_id(modification_id).await?;
        let staged_permissions =
            ModificationRepo::permissions_of(self.ctx.pool(), modification_id).await?;

        let mut tx = self
            .ctx
            .pool()
            .begin()
            .await
            .map_err(PersistenceError::from)?;

        let resolved = ModificationRepo::resolve(
            &mut tx,
            modification_id,
            verifier_id,
            AuthorizationStatus::Approved,
            None,
        )
        .await?;
        let modification = Modification::try_from(resolved)?;

        let snapshot = UserSnapshot {
            username: modification.username.clone(),
            first_name: modification.first_name.clone(),
            last_name: modification.last_name.clone(),
            password_hash: modification.password_hash.clone(),
            access_level: modification.access_level,
            active: modification.active,
        };

        let user_id = match modification.user_id {
            Some(user_id) => {
                UserRepo::apply_snapshot(
                    &mut tx,
                    user_id,
                    &snapshot,
                    modification_id,
                    modification.security_modification,
                )
                .await?;
                if !staged_permissions.is_empty() {
                    UserRepo::replace_permissions(&mut tx, user_id, &staged_permissions).await?;
                }
                user_id
            }
            None => {
                // The proposal-time check only scanned live users; a
                // sibling create proposal may have been approved since.
                if UserRepo::username_taken_in(&mut tx, &modification.username).await? {
                    return Err(WorkflowError::DuplicateUsername(
                        modification.username.clone(),
                    ));
                }
                let new_id =
                    UserRepo::insert_from_snapshot(&mut tx, &snapshot, Some(modification_id)).await?;
                if !staged_permissions.is_empty() {
                    UserRepo::replace_permissions(&mut tx, new_id, &staged_permissions).await?;
                }
                new_id
            }
        };

        tx.commit().await.map_err(PersistenceError::from)?;

        info!(modification_id, user_id, verifier_id, "modification approved");
        self.recorder()
            .record(
                EntityKind::UserModification,
                modification_id,
                ActivityKind::Authorize,
                "username",
                &modification.username,
                verifier_id,
            )
            .await;

        Ok(self.modification_by_id(modification_id).await?)
    }

    /// Reject a pending modification, leaving the live record untouched.
    pub async fn reject(
        &self,
        modification_id: i64,
        verifier_id: i64,
        comment: Option<&str>,
    ) -> WorkflowResult<Modification> {
        self.modification_by_id(modification_id).await?;

        let mut tx = self
            .ctx
            .pool()
            .begin()
            .await
            .map_err(PersistenceError::from)?;
        let resolved = ModificationRepo::resolve(
            &mut tx,
            modification_id,
            verifier_id,
            AuthorizationStatus::Rejected,
            comment,
        )
        .await?;
        tx.commit().await.map_err(PersistenceError::from)?;

        let modification = Modification::try_from(resolved)?;

        info!(modification_id, verifier_id, "modification rejected");
        self.recorder()
            .record(
                EntityKind::UserModification,
                modification.id,
                ActivityKind::Unauthorize,
                "username",
                &modification.username,
                verifier_id,
            )
            .await;

        Ok(modification)
    }

    /// Authenticate a username/password pair against the live records.
    ///
    /// Inactive users cannot authenticate. The stored hash is checked with
    /// the argon2 verifier, never compared as a string.
    pub async fn verify_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> WorkflowResult<User> {
        let Some(row) = UserRepo::get_by_username(self.ctx.pool(), username).await? else {
            return Err(WorkflowError::InvalidCredentials);
        };
        let user = User::try_from(row)?;

        if !user.active || !credentials::verify_password(password, &user.password_hash)? {
            return Err(WorkflowError::InvalidCredentials);
        }
        Ok(user)
    }

    // === Lookups ===

    pub async fn user_by_id(&self, user_id: i64) -> WorkflowResult<User> {
        let row = UserRepo::get_by_id(self.ctx.pool(), user_id)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    WorkflowError::UserNotFound(user_id)
                } else {
                    e.into()
                }
            })?;
        Ok(User::try_from(row)?)
    }

    pub async fn modification_by_id(&self, modification_id: i64) -> WorkflowResult<Modification> {
        let row = ModificationRepo::get_by_id(self.ctx.pool(), modification_id)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    WorkflowError::ModificationNotFound(modification_id)
                } else {
                    e.into()
                }
            })?;
        Ok(Modification::try_from(row)?)
    }

    /// The unresolved modification targeting a user, if any
    pub async fn pending_modification_for(
        &self,
        user_id: i64,
    ) -> WorkflowResult<Option<Modification>> {
        let row = ModificationRepo::find_pending_for_user(self.ctx.pool(), user_id).await?;
        Ok(row.map(Modification::try_from).transpose()?)
    }

    /// All pending modifications, newest first
    pub async fn list_pending(&self) -> WorkflowResult<Vec<Modification>> {
        let rows =
            ModificationRepo::list_by_status(self.ctx.pool(), AuthorizationStatus::Pending).await?;
        Ok(rows
            .into_iter()
            .map(Modification::try_from)
            .collect::<Result<_, _>>()?)
    }

    /// Most recent modifications proposed by an actor
    pub async fn most_recent_by_initiator(
        &self,
        actor_id: i64,
        limit: i64,
    ) -> WorkflowResult<Vec<Modification>> {
        let rows =
            ModificationRepo::most_recent_by_initiator(self.ctx.pool(), actor_id, limit).await?;
        Ok(rows
            .into_iter()
            .map(Modification::try_from)
            .collect::<Result<_, _>>()?)
    }
}
