//! Repository for the `tags` and `bug_tags` tables.
//!
//! Hosts the tag registry (`sync_tags`: resolve names to persisted tags,
//! creating the missing ones) and the persistence half of the tag associator
//! (`assign_tags_to_bug`). Both run on a caller-supplied connection so they
//! take part in the caller's transaction.

use std::collections::{HashMap, HashSet};

use bugtrack_core::bug::Operation;
use bugtrack_core::tagging::{assign_tag_ids, missing_names, unique_names};
use bugtrack_core::types::DbId;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::models::tag::{BugTagRow, Tag};
use crate::DbPool;

/// Provides tag registry lookups and bug-tag associations.
pub struct TagRepo;

impl TagRepo {
    // -----------------------------------------------------------------------
    // Registry
    // -----------------------------------------------------------------------

    /// List every tag, oldest first.
    pub async fn list_all(pool: &DbPool) -> Result<Vec<Tag>, sqlx::Error> {
        sqlx::query_as::<_, Tag>("SELECT id, name FROM tags ORDER BY id")
            .fetch_all(pool)
            .await
    }

    /// Find all tags whose name is in `names`.
    pub async fn find_by_names(
        conn: &mut SqliteConnection,
        names: &[&str],
    ) -> Result<Vec<Tag>, sqlx::Error> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = QueryBuilder::<Sqlite>::new("SELECT id, name FROM tags WHERE name IN (");
        let mut separated = query.separated(", ");
        for name in names {
            separated.push_bind(*name);
        }
        separated.push_unseparated(") ORDER BY id");

        query.build_query_as::<Tag>().fetch_all(&mut *conn).await
    }

    /// Create a tag or return the existing one with the same name.
    ///
    /// Uses `ON CONFLICT` on the unique name so a tag inserted by another
    /// writer since our lookup is returned instead of failing the request.
    pub async fn create_or_get(
        conn: &mut SqliteConnection,
        name: &str,
    ) -> Result<Tag, sqlx::Error> {
        sqlx::query_as::<_, Tag>(
            "INSERT INTO tags (name) VALUES ($1) \
             ON CONFLICT (name) DO UPDATE SET name = excluded.name \
             RETURNING id, name",
        )
        .bind(name)
        .fetch_one(&mut *conn)
        .await
    }

    /// Resolve `tag_names` to persisted tags and assign them to a bug.
    ///
    /// Existing tags are reused; a tag row is inserted only for names not
    /// already stored, once per distinct name. The resolved list (in first
    /// request order) is then handed to [`Self::assign_tags_to_bug`] with
    /// `op`. On error nothing is rolled back here: the caller owns the
    /// transaction and must discard it.
    pub async fn sync_tags(
        conn: &mut SqliteConnection,
        bug_id: DbId,
        current: &[Tag],
        tag_names: &[String],
        op: Operation,
    ) -> Result<Vec<Tag>, sqlx::Error> {
        let requested = unique_names(tag_names);

        let existing = Self::find_by_names(conn, &requested).await.map_err(|e| {
            tracing::error!(bug_id, error = %e, "Unable to look up tags");
            e
        })?;
        let existing_names: HashSet<&str> = existing.iter().map(|t| t.name.as_str()).collect();
        let to_create = missing_names(&requested, &existing_names);

        let mut created = Vec::with_capacity(to_create.len());
        for name in &to_create {
            let tag = Self::create_or_get(conn, name).await.map_err(|e| {
                tracing::error!(bug_id, tag = %name, error = %e, "Unable to create tag");
                e
            })?;
            created.push(tag);
        }

        if !created.is_empty() {
            tracing::debug!(bug_id, count = created.len(), "Created new tags");
        }

        let mut by_name: HashMap<&str, &Tag> = existing
            .iter()
            .chain(created.iter())
            .map(|t| (t.name.as_str(), t))
            .collect();
        let resolved: Vec<Tag> = requested
            .iter()
            .filter_map(|name| by_name.remove(name).cloned())
            .collect();

        Self::assign_tags_to_bug(conn, bug_id, current, &resolved, op)
            .await
            .map_err(|e| {
                tracing::error!(bug_id, error = %e, "Unable to assign tags to bug");
                e
            })
    }

    // -----------------------------------------------------------------------
    // Associations
    // -----------------------------------------------------------------------

    /// Update a bug's links so its tag set follows `op`.
    ///
    /// - `Create` / `Put`: the set becomes exactly `resolved`.
    /// - `Patch`: tags in `resolved` that are not linked yet are added;
    ///   nothing is removed.
    ///
    /// Returns the bug's tags after the update.
    pub async fn assign_tags_to_bug(
        conn: &mut SqliteConnection,
        bug_id: DbId,
        current: &[Tag],
        resolved: &[Tag],
        op: Operation,
    ) -> Result<Vec<Tag>, sqlx::Error> {
        let current_ids: Vec<DbId> = current.iter().map(|t| t.id).collect();
        let resolved_ids: Vec<DbId> = resolved.iter().map(|t| t.id).collect();
        let plan = assign_tag_ids(&current_ids, &resolved_ids, op);

        Self::unlink(conn, bug_id, &plan.removed).await?;
        Self::link(conn, bug_id, &plan.added).await?;

        let known: HashMap<DbId, &Tag> = current
            .iter()
            .chain(resolved.iter())
            .map(|t| (t.id, t))
            .collect();
        Ok(plan
            .tag_ids
            .iter()
            .filter_map(|id| known.get(id).map(|t| (*t).clone()))
            .collect())
    }

    /// List the tags linked to one bug, oldest tag first.
    pub async fn tags_for_bug(
        conn: &mut SqliteConnection,
        bug_id: DbId,
    ) -> Result<Vec<Tag>, sqlx::Error> {
        sqlx::query_as::<_, Tag>(
            "SELECT t.id, t.name \
             FROM bug_tags bt \
             JOIN tags t ON t.id = bt.tag_id \
             WHERE bt.bug_id = $1 \
             ORDER BY t.id",
        )
        .bind(bug_id)
        .fetch_all(&mut *conn)
        .await
    }

    /// Load the tags of every bug in one query, grouped by bug id.
    pub async fn tags_by_bug(
        conn: &mut SqliteConnection,
    ) -> Result<HashMap<DbId, Vec<Tag>>, sqlx::Error> {
        let rows = sqlx::query_as::<_, BugTagRow>(
            "SELECT bt.bug_id, t.id AS tag_id, t.name \
             FROM bug_tags bt \
             JOIN tags t ON t.id = bt.tag_id \
             ORDER BY bt.bug_id, t.id",
        )
        .fetch_all(&mut *conn)
        .await?;

        let mut grouped: HashMap<DbId, Vec<Tag>> = HashMap::new();
        for row in rows {
            grouped.entry(row.bug_id).or_default().push(row.into_tag());
        }
        Ok(grouped)
    }

    /// Remove every tag link of a bug. The tags themselves are kept.
    pub async fn unlink_all(conn: &mut SqliteConnection, bug_id: DbId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM bug_tags WHERE bug_id = $1")
            .bind(bug_id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected())
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    /// Insert links from `bug_id` to each tag (idempotent).
    async fn link(
        conn: &mut SqliteConnection,
        bug_id: DbId,
        tag_ids: &[DbId],
    ) -> Result<(), sqlx::Error> {
        if tag_ids.is_empty() {
            return Ok(());
        }

        let mut query = QueryBuilder::<Sqlite>::new("INSERT INTO bug_tags (bug_id, tag_id) ");
        query.push_values(tag_ids, |mut row, tag_id| {
            row.push_bind(bug_id).push_bind(*tag_id);
        });
        query.push(" ON CONFLICT DO NOTHING");

        query.build().execute(&mut *conn).await?;
        Ok(())
    }

    /// Delete the links from `bug_id` to each tag.
    async fn unlink(
        conn: &mut SqliteConnection,
        bug_id: DbId,
        tag_ids: &[DbId],
    ) -> Result<(), sqlx::Error> {
        if tag_ids.is_empty() {
            return Ok(());
        }

        let mut query = QueryBuilder::<Sqlite>::new("DELETE FROM bug_tags WHERE bug_id = ");
        query.push_bind(bug_id);
        query.push(" AND tag_id IN (");
        let mut separated = query.separated(", ");
        for tag_id in tag_ids {
            separated.push_bind(*tag_id);
        }
        separated.push_unseparated(")");

        query.build().execute(&mut *conn).await?;
        Ok(())
    }
}
