//! SQLite-backed local attribute store

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::collections::BTreeMap;
use taxsync_common::Result;

use super::{CreatedTerm, LocalStore};
use crate::models::{AttributeRecord, TermRecord};

/// Local store over the `attributes` / `attribute_terms` / `term_meta` tables
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn attribute_from_row(row: &sqlx::sqlite::SqliteRow) -> AttributeRecord {
        AttributeRecord {
            id: row.get("id"),
            name: row.get("name"),
            slug: row.get("slug"),
            kind: row.get("kind"),
            order_by: row.get("order_by"),
            has_archives: row.get::<i64, _>("has_archives") != 0,
        }
    }

    async fn attach_meta(&self, term: &mut TermRecord) -> Result<()> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT key, value FROM term_meta WHERE term_id = ?")
                .bind(term.id)
                .fetch_all(&self.pool)
                .await?;

        term.meta = rows.into_iter().collect();
        term.retain_tracked_meta();
        Ok(())
    }

    async fn term_from_row(&self, row: &sqlx::sqlite::SqliteRow) -> Result<TermRecord> {
        let mut term = TermRecord {
            id: row.get("id"),
            attribute_id: row.get::<Option<i64>, _>("attribute_id").unwrap_or(0),
            name: row.get("name"),
            slug: row.get("slug"),
            description: row.get("description"),
            meta: BTreeMap::new(),
        };
        self.attach_meta(&mut term).await?;
        Ok(term)
    }
}

#[async_trait]
impl LocalStore for SqliteStore {
    async fn list_attributes(&self) -> Result<Vec<AttributeRecord>> {
        let rows = sqlx::query(
            "SELECT id, name, slug, kind, order_by, has_archives FROM attributes ORDER BY slug",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(Self::attribute_from_row).collect())
    }

    async fn get_attribute(&self, slug: &str) -> Result<Option<AttributeRecord>> {
        let row = sqlx::query(
            "SELECT id, name, slug, kind, order_by, has_archives FROM attributes WHERE slug = ?",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(Self::attribute_from_row))
    }

    async fn create_attribute(&self, record: &AttributeRecord) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO attributes (name, slug, kind, order_by, has_archives)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(slug) DO NOTHING
            "#,
        )
        .bind(&record.name)
        .bind(&record.slug)
        .bind(&record.kind)
        .bind(&record.order_by)
        .bind(record.has_archives as i64)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(result.last_insert_rowid());
        }

        // Slug already present: idempotent create resolves to the existing row
        let id: i64 = sqlx::query_scalar("SELECT id FROM attributes WHERE slug = ?")
            .bind(&record.slug)
            .fetch_one(&self.pool)
            .await?;

        Ok(id)
    }

    async fn list_terms(&self, taxonomy: &str) -> Result<Vec<TermRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT t.id, t.name, t.slug, t.description, a.id AS attribute_id
            FROM attribute_terms t
            LEFT JOIN attributes a ON a.slug = t.taxonomy
            WHERE t.taxonomy = ?
            ORDER BY t.slug
            "#,
        )
        .bind(taxonomy)
        .fetch_all(&self.pool)
        .await?;

        let mut terms = Vec::with_capacity(rows.len());
        for row in &rows {
            terms.push(self.term_from_row(row).await?);
        }

        Ok(terms)
    }

    async fn get_term(&self, slug_or_name: &str, taxonomy: &str) -> Result<Option<TermRecord>> {
        // Slug first
        let row = sqlx::query(
            r#"
            SELECT t.id, t.name, t.slug, t.description, a.id AS attribute_id
            FROM attribute_terms t
            LEFT JOIN attributes a ON a.slug = t.taxonomy
            WHERE t.taxonomy = ? AND t.slug = ?
            "#,
        )
        .bind(taxonomy)
        .bind(slug_or_name)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return Ok(Some(self.term_from_row(&row).await?));
        }

        // Exact case-insensitive name fallback
        let row = sqlx::query(
            r#"
            SELECT t.id, t.name, t.slug, t.description, a.id AS attribute_id
            FROM attribute_terms t
            LEFT JOIN attributes a ON a.slug = t.taxonomy
            WHERE t.taxonomy = ? AND LOWER(t.name) = LOWER(?)
            "#,
        )
        .bind(taxonomy)
        .bind(slug_or_name)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.term_from_row(&row).await?)),
            None => Ok(None),
        }
    }

    async fn create_term(&self, record: &TermRecord, taxonomy: &str) -> Result<CreatedTerm> {
        let result = sqlx::query(
            r#"
            INSERT INTO attribute_terms (taxonomy, name, slug, description)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(taxonomy, slug) DO NOTHING
            "#,
        )
        .bind(taxonomy)
        .bind(&record.name)
        .bind(&record.slug)
        .bind(&record.description)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(CreatedTerm {
                id: result.last_insert_rowid(),
                created: true,
            });
        }

        let id: i64 =
            sqlx::query_scalar("SELECT id FROM attribute_terms WHERE taxonomy = ? AND slug = ?")
                .bind(taxonomy)
                .bind(&record.slug)
                .fetch_one(&self.pool)
                .await?;

        Ok(CreatedTerm { id, created: false })
    }

    async fn update_term_core(
        &self,
        id: i64,
        name: &str,
        slug: &str,
        description: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE attribute_terms
            SET name = ?, slug = ?, description = ?, updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
        )
        .bind(name)
        .bind(slug)
        .bind(description)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_term_meta(&self, id: i64, meta: &BTreeMap<String, String>) -> Result<()> {
        for (key, value) in meta {
            sqlx::query(
                r#"
                INSERT INTO term_meta (term_id, key, value)
                VALUES (?, ?, ?)
                ON CONFLICT(term_id, key) DO UPDATE SET value = excluded.value
                "#,
            )
            .bind(id)
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await?;
        }

        Ok(())
    }
}
