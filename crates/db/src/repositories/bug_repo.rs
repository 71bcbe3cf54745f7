//! Repository for the `bugs` table.
//!
//! Every write runs in its own transaction: the scalar row, the tag registry
//! and the tag links either all commit or all roll back.

use bugtrack_core::bug::Operation;
use bugtrack_core::types::DbId;
use chrono::Utc;
use sqlx::{Sqlite, SqliteConnection, Transaction};

use crate::models::bug::{apply_bug_data, Bug, BugChanges, BugWithTags, CreateBug, UpdateBug};
use crate::repositories::TagRepo;
use crate::DbPool;

/// Column list for the `bugs` table.
const COLUMNS: &str = "id, title, description, status, priority, severity, \
    assigned_to, submitter, created_at, updated_at";

/// Provides CRUD operations for bugs and orchestrates their tags.
pub struct BugRepo;

impl BugRepo {
    /// Insert a new bug and link its tags, creating missing tags on the way.
    pub async fn create(pool: &DbPool, input: &CreateBug) -> Result<BugWithTags, sqlx::Error> {
        let mut tx = Self::begin_write(pool).await?;
        let result = Self::create_inner(&mut tx, input).await;
        Self::finish(tx, result, "create").await
    }

    /// Find a bug by id with its tags.
    pub async fn find_by_id(pool: &DbPool, id: DbId) -> Result<Option<BugWithTags>, sqlx::Error> {
        let mut conn = pool.acquire().await?;
        match Self::fetch_row(&mut conn, id).await? {
            Some(bug) => {
                let tags = TagRepo::tags_for_bug(&mut conn, bug.id).await?;
                Ok(Some(BugWithTags { bug, tags }))
            }
            None => Ok(None),
        }
    }

    /// List every bug with its tags, oldest first.
    pub async fn list_all(pool: &DbPool) -> Result<Vec<BugWithTags>, sqlx::Error> {
        let mut conn = pool.acquire().await?;

        let query = format!("SELECT {COLUMNS} FROM bugs ORDER BY id");
        let bugs = sqlx::query_as::<_, Bug>(&query)
            .fetch_all(&mut *conn)
            .await?;
        let mut tags = TagRepo::tags_by_bug(&mut conn).await?;

        Ok(bugs
            .into_iter()
            .map(|bug| {
                let tags = tags.remove(&bug.id).unwrap_or_default();
                BugWithTags { bug, tags }
            })
            .collect())
    }

    /// Apply a partial update. Tags in the payload are added, never removed.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update_partial(
        pool: &DbPool,
        id: DbId,
        input: &UpdateBug,
    ) -> Result<Option<BugWithTags>, sqlx::Error> {
        let mut tx = Self::begin_write(pool).await?;
        let result = Self::update_inner(&mut tx, id, BugChanges::Partial(input)).await;
        Self::finish(tx, result, "patch").await
    }

    /// Replace a bug's fields. Tags in the payload replace the whole set.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update_full(
        pool: &DbPool,
        id: DbId,
        input: &CreateBug,
    ) -> Result<Option<BugWithTags>, sqlx::Error> {
        let mut tx = Self::begin_write(pool).await?;
        let result = Self::update_inner(&mut tx, id, BugChanges::Full(input)).await;
        Self::finish(tx, result, "put").await
    }

    /// Delete a bug and its tag links. The tags stay in the registry.
    ///
    /// Returns `true` if a row was removed.
    pub async fn delete(pool: &DbPool, id: DbId) -> Result<bool, sqlx::Error> {
        let mut tx = Self::begin_write(pool).await?;
        let result = Self::delete_inner(&mut tx, id).await;
        Self::finish(tx, result, "delete").await
    }

    // -----------------------------------------------------------------------
    // Transaction bodies
    // -----------------------------------------------------------------------

    async fn create_inner(
        conn: &mut SqliteConnection,
        input: &CreateBug,
    ) -> Result<BugWithTags, sqlx::Error> {
        let bug = Self::insert_row(conn, &Bug::new_unsaved(input, Utc::now())).await?;

        let tags = match input.tags {
            Some(ref names) => {
                TagRepo::sync_tags(conn, bug.id, &[], names, Operation::Create).await?
            }
            None => Vec::new(),
        };

        Ok(BugWithTags { bug, tags })
    }

    async fn update_inner(
        conn: &mut SqliteConnection,
        id: DbId,
        changes: BugChanges<'_>,
    ) -> Result<Option<BugWithTags>, sqlx::Error> {
        let Some(mut bug) = Self::fetch_row(conn, id).await? else {
            return Ok(None);
        };
        let current = TagRepo::tags_for_bug(conn, id).await?;

        apply_bug_data(&mut bug, changes, Utc::now());
        Self::write_row(conn, &bug).await?;

        let (names, op) = match changes {
            BugChanges::Full(input) => (input.tags.as_deref(), Operation::Put),
            BugChanges::Partial(input) => (input.tags.as_deref(), Operation::Patch),
        };
        let tags = match names {
            Some(names) => TagRepo::sync_tags(conn, id, &current, names, op).await?,
            None => current,
        };

        Ok(Some(BugWithTags { bug, tags }))
    }

    async fn delete_inner(conn: &mut SqliteConnection, id: DbId) -> Result<bool, sqlx::Error> {
        if Self::fetch_row(conn, id).await?.is_none() {
            return Ok(false);
        }

        let unlinked = TagRepo::unlink_all(conn, id).await?;
        tracing::debug!(bug_id = id, unlinked, "Removed tag links");

        let result = sqlx::query("DELETE FROM bugs WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Open a transaction that takes SQLite's write lock up front.
    ///
    /// A deferred transaction that reads before writing gets `SQLITE_BUSY`
    /// immediately when it upgrades while another connection holds the lock.
    /// `BEGIN IMMEDIATE` waits out the busy timeout instead, so concurrent
    /// writers queue and the last commit wins.
    async fn begin_write(pool: &DbPool) -> Result<Transaction<'static, Sqlite>, sqlx::Error> {
        pool.begin_with("BEGIN IMMEDIATE").await
    }

    /// Commit on success. On failure, log and roll back, then return the write error.
    async fn finish<T>(
        tx: Transaction<'_, Sqlite>,
        result: Result<T, sqlx::Error>,
        action: &'static str,
    ) -> Result<T, sqlx::Error> {
        match result {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(e) => {
                tracing::error!(action, error = %e, "Bug write failed, rolling back");
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::error!(action, error = %rollback_err, "Rollback failed");
                }
                Err(e)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Row helpers
    // -----------------------------------------------------------------------

    async fn fetch_row(conn: &mut SqliteConnection, id: DbId) -> Result<Option<Bug>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM bugs WHERE id = $1");
        sqlx::query_as::<_, Bug>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
    }

    async fn insert_row(conn: &mut SqliteConnection, bug: &Bug) -> Result<Bug, sqlx::Error> {
        let query = format!(
            "INSERT INTO bugs \
                (title, description, status, priority, severity, \
                 assigned_to, submitter, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Bug>(&query)
            .bind(&bug.title)
            .bind(&bug.description)
            .bind(bug.status.as_str())
            .bind(bug.priority.as_str())
            .bind(bug.severity.as_str())
            .bind(&bug.assigned_to)
            .bind(&bug.submitter)
            .bind(bug.created_at)
            .bind(bug.updated_at)
            .fetch_one(&mut *conn)
            .await
    }

    /// Write every mutable column of `bug` back to its row.
    async fn write_row(conn: &mut SqliteConnection, bug: &Bug) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE bugs SET \
                title = $2, \
                description = $3, \
                status = $4, \
                priority = $5, \
                severity = $6, \
                assigned_to = $7, \
                submitter = $8, \
                updated_at = $9 \
             WHERE id = $1",
        )
        .bind(bug.id)
        .bind(&bug.title)
        .bind(&bug.description)
        .bind(bug.status.as_str())
        .bind(bug.priority.as_str())
        .bind(bug.severity.as_str())
        .bind(&bug.assigned_to)
        .bind(&bug.submitter)
        .bind(bug.updated_at)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }
}
