use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{StoreResult, TaskStore, UserStore};
use crate::error::AppError;
use crate::models::{
    SortField, SortOrder, Task, TaskPatch, TaskPriority, TaskQuery, TaskStats, TaskStatus, User,
};

const USER_COLUMNS: &str =
    "id, name, email, password_hash, role, avatar, bio, created_at, updated_at";
const TASK_COLUMNS: &str =
    "id, user_id, title, description, status, priority, due_date, tags, created_at, updated_at";

const EMAIL_UNIQUE_CONSTRAINT: &str = "users_email_key";
const TASK_OWNER_CONSTRAINT: &str = "tasks_user_id_fkey";

/// Embedded schema migrations from `migrations/`.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// PostgreSQL-backed implementation of both stores.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Maps a violation of the unique email index to `DuplicateEmail`.
fn map_user_write_error(error: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &error {
        if db_err.constraint() == Some(EMAIL_UNIQUE_CONSTRAINT) {
            return AppError::DuplicateEmail;
        }
    }
    error.into()
}

/// Maps a task whose owner no longer exists to the owner's `NotFound`.
fn map_task_insert_error(error: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &error {
        if db_err.constraint() == Some(TASK_OWNER_CONSTRAINT) {
            return AppError::user_not_found();
        }
    }
    error.into()
}

/// Appends the WHERE and ORDER BY clauses of a task listing.
///
/// Every value is bound as a parameter. Search uses `strpos` on lowercased text, so
/// `%`, `_` and other pattern characters in the search text match literally.
pub fn push_task_filters(builder: &mut QueryBuilder<'_, Postgres>, owner: Uuid, query: &TaskQuery) {
    builder.push(" WHERE user_id = ").push_bind(owner);

    if let Some(status) = query.status {
        builder.push(" AND status = ").push_bind(status);
    }
    if let Some(priority) = query.priority {
        builder.push(" AND priority = ").push_bind(priority);
    }
    if let Some(search) = query.search_text() {
        let needle = search.to_lowercase();
        builder
            .push(" AND (strpos(lower(title), ")
            .push_bind(needle.clone())
            .push(") > 0 OR strpos(lower(description), ")
            .push_bind(needle)
            .push(") > 0)");
    }

    let direction = match query.sort_order() {
        SortOrder::Asc => "ASC",
        SortOrder::Desc => "DESC",
    };
    let column = match query.sort_field() {
        SortField::CreatedAt => "created_at",
        SortField::UpdatedAt => "updated_at",
        SortField::DueDate => "due_date",
        SortField::Title => "title COLLATE \"C\"",
    };
    builder.push(format!(
        " ORDER BY {} {} NULLS LAST, id ASC",
        column, direction
    ));
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert(&self, user: User) -> StoreResult<User> {
        let sql = format!(
            "INSERT INTO users (id, name, email, password_hash, role, avatar, bio, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {}",
            USER_COLUMNS
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(user.id)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role)
            .bind(&user.avatar)
            .bind(&user.bio)
            .bind(user.created_at)
            .bind(user.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(map_user_write_error)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update(&self, user: User) -> StoreResult<Option<User>> {
        let sql = format!(
            "UPDATE users
             SET name = $2, email = $3, password_hash = $4, avatar = $5, bio = $6, updated_at = $7
             WHERE id = $1
             RETURNING {}",
            USER_COLUMNS
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(user.id)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.avatar)
            .bind(&user.bio)
            .bind(user.updated_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_user_write_error)
    }

    async fn delete_with_tasks(&self, id: Uuid) -> StoreResult<Option<u64>> {
        let mut tx = self.pool.begin().await?;

        // Blocks concurrent task inserts, whose foreign key check needs a share lock
        // on this row, until the transaction ends.
        let locked = sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Ok(None);
        }

        let tasks = sqlx::query("DELETE FROM tasks WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(tasks.rows_affected()))
    }
}

#[async_trait]
impl TaskStore for PgStore {
    async fn list(&self, owner: Uuid, query: &TaskQuery) -> StoreResult<Vec<Task>> {
        let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM tasks", TASK_COLUMNS));
        push_task_filters(&mut builder, owner, query);
        Ok(builder
            .build_query_as::<Task>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get(&self, owner: Uuid, id: Uuid) -> StoreResult<Option<Task>> {
        let sql = format!(
            "SELECT {} FROM tasks WHERE id = $1 AND user_id = $2",
            TASK_COLUMNS
        );
        Ok(sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn insert(&self, task: Task) -> StoreResult<Task> {
        let sql = format!(
            "INSERT INTO tasks (id, user_id, title, description, status, priority, due_date, tags, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {}",
            TASK_COLUMNS
        );
        sqlx::query_as::<_, Task>(&sql)
            .bind(task.id)
            .bind(task.user_id)
            .bind(&task.title)
            .bind(&task.description)
            .bind(task.status)
            .bind(task.priority)
            .bind(task.due_date)
            .bind(&task.tags)
            .bind(task.created_at)
            .bind(task.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(map_task_insert_error)
    }

    async fn update(&self, owner: Uuid, id: Uuid, patch: TaskPatch) -> StoreResult<Option<Task>> {
        let mut tx = self.pool.begin().await?;

        let select = format!(
            "SELECT {} FROM tasks WHERE id = $1 AND user_id = $2 FOR UPDATE",
            TASK_COLUMNS
        );
        let existing = sqlx::query_as::<_, Task>(&select)
            .bind(id)
            .bind(owner)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(existing) = existing else {
            return Ok(None);
        };
        let task = patch.apply(&existing, Utc::now());

        let update = format!(
            "UPDATE tasks
             SET title = $3, description = $4, status = $5, priority = $6, due_date = $7, tags = $8, updated_at = $9
             WHERE id = $1 AND user_id = $2
             RETURNING {}",
            TASK_COLUMNS
        );
        let updated = sqlx::query_as::<_, Task>(&update)
            .bind(id)
            .bind(owner)
            .bind(&task.title)
            .bind(&task.description)
            .bind(task.status)
            .bind(task.priority)
            .bind(task.due_date)
            .bind(&task.tags)
            .bind(task.updated_at)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(updated))
    }

    async fn delete(&self, owner: Uuid, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn stats(&self, owner: Uuid) -> StoreResult<TaskStats> {
        // One statement, so all three aggregates come from the same snapshot.
        let groups = sqlx::query_as::<_, (TaskStatus, TaskPriority, i64)>(
            "SELECT status, priority, COUNT(*) FROM tasks WHERE user_id = $1 GROUP BY status, priority",
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;
        Ok(TaskStats::from_groups(groups))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sql_for(query: &TaskQuery) -> String {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT * FROM tasks");
        push_task_filters(&mut builder, Uuid::nil(), query);
        builder.sql().to_string()
    }

    #[test]
    fn test_default_listing_sql() {
        assert_eq!(
            sql_for(&TaskQuery::default()),
            "SELECT * FROM tasks WHERE user_id = $1 ORDER BY created_at DESC NULLS LAST, id ASC"
        );
    }

    #[test]
    fn test_filtered_listing_sql() {
        let query = TaskQuery {
            status: Some(TaskStatus::Completed),
            priority: Some(TaskPriority::High),
            search: Some(" Report ".into()),
            sort_by: Some(SortField::Title),
            order: Some(SortOrder::Asc),
        };
        assert_eq!(
            sql_for(&query),
            "SELECT * FROM tasks WHERE user_id = $1 AND status = $2 AND priority = $3 \
             AND (strpos(lower(title), $4) > 0 OR strpos(lower(description), $5) > 0) \
             ORDER BY title COLLATE \"C\" ASC NULLS LAST, id ASC"
        );
    }

    #[test]
    fn test_blank_search_adds_no_clause() {
        let query = TaskQuery {
            search: Some("   ".into()),
            sort_by: Some(SortField::DueDate),
            ..Default::default()
        };
        assert_eq!(
            sql_for(&query),
            "SELECT * FROM tasks WHERE user_id = $1 ORDER BY due_date DESC NULLS LAST, id ASC"
        );
    }
}
