/// Task model and database operations
///
/// Tasks are the core entity: a titled TODO item owned by exactly one
/// user, carrying a status, a priority, an optional deadline, and a set of
/// label references. The owning user id is immutable for the life of the
/// row.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('pending', 'in_progress', 'completed');
/// CREATE TYPE task_priority AS ENUM ('low', 'medium', 'high');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     title VARCHAR(255) NOT NULL,
///     description TEXT,
///     priority task_priority NOT NULL DEFAULT 'medium',
///     status task_status NOT NULL DEFAULT 'pending',
///     due_date TIMESTAMPTZ,
///     label_ids UUID[] NOT NULL DEFAULT '{}',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use tasknest_shared::models::task::{CreateTask, Task};
/// # use sqlx::PgPool;
/// # use uuid::Uuid;
///
/// # async fn example(pool: PgPool, user_id: Uuid) -> Result<(), sqlx::Error> {
/// let task = Task::create(&pool, user_id, CreateTask {
///     title: "Buy milk".to_string(),
///     ..Default::default()
/// }).await?;
///
/// let mine = Task::list_by_owner(&pool, user_id, None).await?;
/// assert!(mine.iter().any(|t| t.id == task.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::ownership::OwnedResource;

/// Task completion status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not started yet (the default for new tasks)
    Pending,

    /// Being worked on
    InProgress,

    /// Done
    Completed,
}

impl TaskStatus {
    /// Gets status as string
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
        }
    }
}

/// Task priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

impl Default for TaskPriority {
    fn default() -> Self {
        TaskPriority::Medium
    }
}

/// Per-user task counts, one bucket per status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStats {
    pub total: i64,
    pub pending: i64,
    pub in_progress: i64,
    pub completed: i64,
}

/// Task model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    /// Unique task id
    pub id: Uuid,

    /// Owning user (immutable)
    pub user_id: Uuid,

    /// Short title
    pub title: String,

    /// Optional free-form description
    pub description: Option<String>,

    /// Priority, defaults to medium
    pub priority: TaskPriority,

    /// Status, defaults to pending
    pub status: TaskStatus,

    /// Optional deadline
    pub due_date: Option<DateTime<Utc>>,

    /// Labels attached to this task (ids into the labels table)
    pub label_ids: Vec<Uuid>,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When the task was last updated
    pub updated_at: DateTime<Utc>,
}

impl OwnedResource for Task {
    fn owner_id(&self) -> Uuid {
        self.user_id
    }
}

/// Input for creating a new task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTask {
    /// Task title
    pub title: String,

    /// Optional description
    pub description: Option<String>,

    /// Priority (defaults to medium)
    #[serde(default)]
    pub priority: TaskPriority,

    /// Optional deadline
    pub due_date: Option<DateTime<Utc>>,

    /// Labels to attach at creation
    #[serde(default)]
    pub label_ids: Vec<Uuid>,
}

impl Default for CreateTask {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: None,
            priority: TaskPriority::default(),
            due_date: None,
            label_ids: Vec::new(),
        }
    }
}

/// Input for updating a task
///
/// Only non-None fields are written. `description` and `due_date` use a
/// double Option so Some(None) clears the stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub label_ids: Option<Vec<Uuid>>,
}

const TASK_COLUMNS: &str = "id, user_id, title, description, priority, status, due_date, \
                            label_ids, created_at, updated_at";

impl Task {
    /// Creates a new task in pending state for `user_id`
    pub async fn create(
        pool: &PgPool,
        user_id: Uuid,
        data: CreateTask,
    ) -> Result<Self, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(&format!(
            r#"
            INSERT INTO tasks (user_id, title, description, priority, due_date, label_ids)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {TASK_COLUMNS}
            "#,
        ))
        .bind(user_id)
        .bind(data.title)
        .bind(data.description)
        .bind(data.priority)
        .bind(data.due_date)
        .bind(data.label_ids)
        .fetch_one(pool)
        .await?;

        Ok(task)
    }

    /// Finds a task by id
    ///
    /// Deliberately NOT scoped by owner: handlers need the distinction
    /// between a missing task (404) and someone else's task (403), so the
    /// ownership check happens after the lookup via
    /// [`crate::auth::ownership::require_found_and_owned`].
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Lists a user's tasks, newest first, optionally filtered by status
    pub async fn list_by_owner(
        pool: &PgPool,
        user_id: Uuid,
        status: Option<TaskStatus>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let tasks = sqlx::query_as::<_, Task>(&format!(
            r#"
            SELECT {TASK_COLUMNS}
            FROM tasks
            WHERE user_id = $1
              AND ($2::task_status IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#,
        ))
        .bind(user_id)
        .bind(status)
        .fetch_all(pool)
        .await?;

        Ok(tasks)
    }

    /// Updates a task, writing only the fields present in `data`
    ///
    /// # Returns
    ///
    /// The updated task, or None if the id does not exist
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE tasks SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.title.is_some() {
            bind_count += 1;
            query.push_str(&format!(", title = ${}", bind_count));
        }
        if data.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }
        if data.priority.is_some() {
            bind_count += 1;
            query.push_str(&format!(", priority = ${}", bind_count));
        }
        if data.status.is_some() {
            bind_count += 1;
            query.push_str(&format!(", status = ${}", bind_count));
        }
        if data.due_date.is_some() {
            bind_count += 1;
            query.push_str(&format!(", due_date = ${}", bind_count));
        }
        if data.label_ids.is_some() {
            bind_count += 1;
            query.push_str(&format!(", label_ids = ${}", bind_count));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {TASK_COLUMNS}"));

        let mut q = sqlx::query_as::<_, Task>(&query).bind(id);

        if let Some(title) = data.title {
            q = q.bind(title);
        }
        if let Some(description_opt) = data.description {
            q = q.bind(description_opt);
        }
        if let Some(priority) = data.priority {
            q = q.bind(priority);
        }
        if let Some(status) = data.status {
            q = q.bind(status);
        }
        if let Some(due_date_opt) = data.due_date {
            q = q.bind(due_date_opt);
        }
        if let Some(label_ids) = data.label_ids {
            q = q.bind(label_ids);
        }

        let task = q.fetch_optional(pool).await?;

        Ok(task)
    }

    /// Updates only the status
    pub async fn update_status(
        pool: &PgPool,
        id: Uuid,
        status: TaskStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(&format!(
            r#"
            UPDATE tasks
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {TASK_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Deletes a task
    ///
    /// # Returns
    ///
    /// True if a row was deleted
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Counts a user's tasks grouped by status
    pub async fn stats_by_owner(pool: &PgPool, user_id: Uuid) -> Result<TaskStats, sqlx::Error> {
        let rows: Vec<(TaskStatus, i64)> = sqlx::query_as(
            "SELECT status, COUNT(*) FROM tasks WHERE user_id = $1 GROUP BY status",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        let mut stats = TaskStats::default();
        for (status, count) in rows {
            stats.total += count;
            match status {
                TaskStatus::Pending => stats.pending = count,
                TaskStatus::InProgress => stats.in_progress = count,
                TaskStatus::Completed => stats.completed = count,
            }
        }

        Ok(stats)
    }

    /// Removes a label reference from every task of `user_id`
    ///
    /// Part of label deletion: the label row is removed afterwards, so a
    /// deleted label never leaves dangling ids behind.
    ///
    /// # Returns
    ///
    /// Number of tasks that carried the label
    pub async fn pull_label(
        pool: &PgPool,
        user_id: Uuid,
        label_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET label_ids = array_remove(label_ids, $2), updated_at = NOW()
            WHERE user_id = $1 AND $2 = ANY(label_ids)
            "#,
        )
        .bind(user_id)
        .bind(label_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_as_str() {
        assert_eq!(TaskStatus::Pending.as_str(), "pending");
        assert_eq!(TaskStatus::InProgress.as_str(), "in_progress");
        assert_eq!(TaskStatus::Completed.as_str(), "completed");
    }

    #[test]
    fn test_status_serde_uses_snake_case() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");

        let parsed: TaskStatus = serde_json::from_str("\"pending\"").unwrap();
        assert_eq!(parsed, TaskStatus::Pending);
    }

    #[test]
    fn test_priority_default_is_medium() {
        assert_eq!(TaskPriority::default(), TaskPriority::Medium);

        let parsed: TaskPriority = serde_json::from_str("\"high\"").unwrap();
        assert_eq!(parsed, TaskPriority::High);
    }

    #[test]
    fn test_create_task_defaults() {
        let data = CreateTask {
            title: "Buy milk".to_string(),
            ..Default::default()
        };

        assert_eq!(data.priority, TaskPriority::Medium);
        assert!(data.description.is_none());
        assert!(data.label_ids.is_empty());
    }

    #[test]
    fn test_task_owner_id_is_user_id() {
        let user_id = Uuid::new_v4();
        let task = Task {
            id: Uuid::new_v4(),
            user_id,
            title: "t".to_string(),
            description: None,
            priority: TaskPriority::Medium,
            status: TaskStatus::Pending,
            due_date: None,
            label_ids: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        use crate::auth::ownership::OwnedResource;
        assert_eq!(task.owner_id(), user_id);
    }

    #[test]
    fn test_update_task_default_is_empty() {
        let update = UpdateTask::default();
        assert!(update.title.is_none());
        assert!(update.status.is_none());
        assert!(update.label_ids.is_none());
    }
}
