/// PostgreSQL storage backend
///
/// Production `Store` implementation. Membership writes go through a
/// transaction that bumps `teams.version` with a `WHERE version = $n` guard,
/// which is what turns a stale read into `StoreError::Conflict` instead of a
/// lost update. Tag queries lean on the GIN index over `prompts.tags` and the
/// `&&` array-intersection operator.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{Store, StoreError, TagScope};
use crate::models::{
    Membership, Plan, Prompt, PromptId, Role, Team, TeamId, User, UserId, Visibility,
};

/// Postgres-backed `Store`
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wraps an existing connection pool
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }

    /// The underlying pool, for health checks and migrations
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

type TeamRow = (
    Uuid,
    String,
    String,
    String,
    i32,
    Option<String>,
    i64,
    DateTime<Utc>,
    DateTime<Utc>,
);

type PromptRow = (
    Uuid,
    Uuid,
    Option<Uuid>,
    String,
    String,
    Vec<String>,
    String,
    DateTime<Utc>,
    DateTime<Utc>,
);

type UserRow = (
    Uuid,
    String,
    Option<String>,
    String,
    i64,
    DateTime<Utc>,
    DateTime<Utc>,
);

fn team_from_row(row: TeamRow, members: Vec<Membership>) -> Result<Team, StoreError> {
    let plan = Plan::from_str(&row.3)
        .ok_or_else(|| StoreError::Backend(format!("unknown plan '{}'", row.3)))?;

    Ok(Team {
        id: TeamId(row.0),
        name: row.1,
        description: row.2,
        plan,
        prompt_limit: row.4 as u32,
        members,
        billing_ref: row.5,
        version: row.6,
        created_at: row.7,
        updated_at: row.8,
    })
}

fn user_from_row(row: UserRow) -> Result<User, StoreError> {
    let plan = Plan::from_str(&row.3)
        .ok_or_else(|| StoreError::Backend(format!("unknown plan '{}'", row.3)))?;

    Ok(User {
        id: UserId(row.0),
        email: row.1,
        name: row.2,
        plan,
        prompt_count: row.4,
        created_at: row.5,
        updated_at: row.6,
    })
}

fn prompt_from_row(row: PromptRow) -> Result<Prompt, StoreError> {
    let visibility = Visibility::from_str(&row.6)
        .ok_or_else(|| StoreError::Backend(format!("unknown visibility '{}'", row.6)))?;

    Ok(Prompt {
        id: PromptId(row.0),
        owner_id: UserId(row.1),
        team_id: row.2.map(TeamId),
        title: row.3,
        content: row.4,
        tags: row.5,
        visibility,
        created_at: row.7,
        updated_at: row.8,
    })
}

#[async_trait]
impl Store for PgStore {
    async fn get_team(&self, team_id: TeamId) -> Result<Team, StoreError> {
        let row: Option<TeamRow> = sqlx::query_as(
            r#"
            SELECT id, name, description, plan, prompt_limit, billing_ref,
                   version, created_at, updated_at
            FROM teams
            WHERE id = $1
            "#,
        )
        .bind(team_id.0)
        .fetch_optional(&self.pool)
        .await?;

        let row = row.ok_or(StoreError::NotFound)?;

        let member_rows: Vec<(Uuid, String, DateTime<Utc>)> = sqlx::query_as(
            r#"
            SELECT user_id, role, created_at
            FROM memberships
            WHERE team_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(team_id.0)
        .fetch_all(&self.pool)
        .await?;

        let members = member_rows
            .into_iter()
            .map(|(user_id, role, created_at)| {
                let role = Role::from_str(&role)
                    .ok_or_else(|| StoreError::Backend(format!("unknown role '{}'", role)))?;
                Ok(Membership {
                    user_id: UserId(user_id),
                    role,
                    created_at,
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        team_from_row(row, members)
    }

    async fn update_team_members(
        &self,
        team_id: TeamId,
        expected_version: i64,
        members: &[Membership],
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        // Version bump doubles as the optimistic lock.
        let bumped = sqlx::query(
            r#"
            UPDATE teams
            SET version = version + 1, updated_at = NOW()
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(team_id.0)
        .bind(expected_version)
        .execute(&mut *tx)
        .await?;

        if bumped.rows_affected() == 0 {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM teams WHERE id = $1)")
                    .bind(team_id.0)
                    .fetch_one(&mut *tx)
                    .await?;

            return Err(if exists {
                StoreError::Conflict
            } else {
                StoreError::NotFound
            });
        }

        sqlx::query("DELETE FROM memberships WHERE team_id = $1")
            .bind(team_id.0)
            .execute(&mut *tx)
            .await?;

        for m in members {
            sqlx::query(
                r#"
                INSERT INTO memberships (team_id, user_id, role, created_at)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(team_id.0)
            .bind(m.user_id.0)
            .bind(m.role.as_str())
            .bind(m.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn set_team_plan(
        &self,
        team_id: TeamId,
        plan: Plan,
        prompt_limit: u32,
        billing_ref: Option<&str>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE teams
            SET plan = $2,
                prompt_limit = $3,
                billing_ref = COALESCE($4, billing_ref),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(team_id.0)
        .bind(plan.as_str())
        .bind(prompt_limit as i32)
        .bind(billing_ref)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn get_user(&self, user_id: UserId) -> Result<User, StoreError> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT id, email, name, plan, prompt_count, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(StoreError::NotFound).and_then(user_from_row)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT id, email, name, plan, prompt_count, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(user_from_row).transpose()
    }

    async fn set_user_plan(&self, user_id: UserId, plan: Plan) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET plan = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user_id.0)
        .bind(plan.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn count_prompts_owned_by(&self, user_id: UserId) -> Result<u32, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM prompts WHERE owner_id = $1")
            .bind(user_id.0)
            .fetch_one(&self.pool)
            .await?;

        Ok(count as u32)
    }

    async fn count_team_prompts(&self, team_id: TeamId) -> Result<u32, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM prompts WHERE team_id = $1")
            .bind(team_id.0)
            .fetch_one(&self.pool)
            .await?;

        Ok(count as u32)
    }

    async fn prompts_tagged(
        &self,
        scope: TagScope,
        tags: &[String],
    ) -> Result<Vec<Prompt>, StoreError> {
        let base = r#"
            SELECT id, owner_id, team_id, title, content, tags, visibility,
                   created_at, updated_at
            FROM prompts
            WHERE tags && $1
        "#;

        let rows: Vec<PromptRow> = match scope {
            TagScope::Global => {
                sqlx::query_as(&format!("{base} ORDER BY created_at ASC"))
                    .bind(tags)
                    .fetch_all(&self.pool)
                    .await?
            }
            TagScope::OwnedBy(user_id) => {
                sqlx::query_as(&format!("{base} AND owner_id = $2 ORDER BY created_at ASC"))
                    .bind(tags)
                    .bind(user_id.0)
                    .fetch_all(&self.pool)
                    .await?
            }
            TagScope::Team(team_id) => {
                sqlx::query_as(&format!("{base} AND team_id = $2 ORDER BY created_at ASC"))
                    .bind(tags)
                    .bind(team_id.0)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.into_iter().map(prompt_from_row).collect()
    }

    async fn set_prompt_tags(
        &self,
        prompt_id: PromptId,
        tags: &[String],
    ) -> Result<(), StoreError> {
        // Only the tags column: concurrent edits to other fields are preserved.
        let result = sqlx::query(
            r#"
            UPDATE prompts
            SET tags = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(prompt_id.0)
        .bind(tags)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn record_billing_event(&self, event_id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO billing_events (event_id)
            VALUES ($1)
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(event_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove_billing_event(&self, event_id: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM billing_events WHERE event_id = $1")
            .bind(event_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
