/// Label model and database operations
///
/// Labels are lightweight per-user tags with a color. Names are unique per
/// user, not globally: two users can both have a "work" label. Tasks
/// reference labels by id in their `label_ids` array; labels carry no
/// back-reference.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE labels (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     name VARCHAR(100) NOT NULL,
///     color VARCHAR(7) NOT NULL DEFAULT '#3B82F6',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     UNIQUE (user_id, name)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::ownership::OwnedResource;

/// Default label color (blue)
pub const DEFAULT_COLOR: &str = "#3B82F6";

/// Label model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Label {
    /// Unique label id
    pub id: Uuid,

    /// Owning user
    pub user_id: Uuid,

    /// Display name, unique per user
    pub name: String,

    /// Hex color string, e.g. "#3B82F6"
    pub color: String,

    /// When the label was created
    pub created_at: DateTime<Utc>,
}

impl OwnedResource for Label {
    fn owner_id(&self) -> Uuid {
        self.user_id
    }
}

/// Label together with the number of tasks carrying it
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LabelWithTaskCount {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub color: String,
    pub created_at: DateTime<Utc>,

    /// How many of the owner's tasks reference this label
    pub task_count: i64,
}

/// Input for creating a new label
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLabel {
    /// Label name
    pub name: String,

    /// Hex color (defaults to blue)
    pub color: Option<String>,
}

/// Input for updating a label
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateLabel {
    pub name: Option<String>,
    pub color: Option<String>,
}

impl Label {
    /// Creates a new label for `user_id`
    ///
    /// # Errors
    ///
    /// Returns an error if the (user, name) pair already exists (unique
    /// constraint) or the database operation fails.
    pub async fn create(
        pool: &PgPool,
        user_id: Uuid,
        data: CreateLabel,
    ) -> Result<Self, sqlx::Error> {
        let label = sqlx::query_as::<_, Label>(
            r#"
            INSERT INTO labels (user_id, name, color)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, name, color, created_at
            "#,
        )
        .bind(user_id)
        .bind(data.name)
        .bind(data.color.unwrap_or_else(|| DEFAULT_COLOR.to_string()))
        .fetch_one(pool)
        .await?;

        Ok(label)
    }

    /// Finds a label by id
    ///
    /// Not owner-scoped; see [`crate::models::task::Task::find_by_id`] for
    /// why the ownership check is separate.
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let label = sqlx::query_as::<_, Label>(
            "SELECT id, user_id, name, color, created_at FROM labels WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(label)
    }

    /// Lists a user's labels, newest first
    pub async fn list_by_owner(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let labels = sqlx::query_as::<_, Label>(
            r#"
            SELECT id, user_id, name, color, created_at
            FROM labels
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(labels)
    }

    /// Lists a user's labels with per-label task counts, newest first
    pub async fn list_with_task_count(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Vec<LabelWithTaskCount>, sqlx::Error> {
        let labels = sqlx::query_as::<_, LabelWithTaskCount>(
            r#"
            SELECT l.id, l.user_id, l.name, l.color, l.created_at,
                   (
                       SELECT COUNT(*)
                       FROM tasks t
                       WHERE t.user_id = l.user_id AND l.id = ANY(t.label_ids)
                   ) AS task_count
            FROM labels l
            WHERE l.user_id = $1
            ORDER BY l.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(labels)
    }

    /// Checks whether `name` is taken by one of the user's other labels
    ///
    /// `exclude_id` skips the label being renamed. Pre-flight check only;
    /// the unique index decides under concurrency.
    pub async fn is_name_taken(
        pool: &PgPool,
        user_id: Uuid,
        name: &str,
        exclude_id: Option<Uuid>,
    ) -> Result<bool, sqlx::Error> {
        let taken: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM labels
                WHERE user_id = $1 AND name = $2
                  AND ($3::uuid IS NULL OR id <> $3)
            )
            "#,
        )
        .bind(user_id)
        .bind(name)
        .bind(exclude_id)
        .fetch_one(pool)
        .await?;

        Ok(taken)
    }

    /// Updates a label, writing only the fields present in `data`
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateLabel,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE labels SET id = id");
        let mut bind_count = 1;

        if data.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }
        if data.color.is_some() {
            bind_count += 1;
            query.push_str(&format!(", color = ${}", bind_count));
        }

        query.push_str(" WHERE id = $1 RETURNING id, user_id, name, color, created_at");

        let mut q = sqlx::query_as::<_, Label>(&query).bind(id);

        if let Some(name) = data.name {
            q = q.bind(name);
        }
        if let Some(color) = data.color {
            q = q.bind(color);
        }

        let label = q.fetch_optional(pool).await?;

        Ok(label)
    }

    /// Deletes a label
    ///
    /// Callers pull the label from the owner's tasks first (see
    /// [`crate::models::task::Task::pull_label`]); this only removes the
    /// label row itself.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM labels WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_color() {
        assert_eq!(DEFAULT_COLOR, "#3B82F6");
    }

    #[test]
    fn test_label_owner_id_is_user_id() {
        let user_id = Uuid::new_v4();
        let label = Label {
            id: Uuid::new_v4(),
            user_id,
            name: "work".to_string(),
            color: DEFAULT_COLOR.to_string(),
            created_at: Utc::now(),
        };

        use crate::auth::ownership::OwnedResource;
        assert_eq!(label.owner_id(), user_id);
    }

    #[test]
    fn test_update_label_default_is_empty() {
        let update = UpdateLabel::default();
        assert!(update.name.is_none());
        assert!(update.color.is_none());
    }
}
