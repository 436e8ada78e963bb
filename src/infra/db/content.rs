use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{
    ContentRepo, ContentWriteRepo, CreateContentParams, RepoError, UpdateContentParams,
};
use crate::domain::entities::{AuthorRecord, CategoryRecord, ContentRecord};
use crate::domain::types::{ContentStatus, ContentType};

use super::PostgresRepositories;
use super::map_sqlx_error;

const CONTENT_SELECT: &str = r#"
    SELECT c.id, c.title, c.slug, c.body_markdown, c.status, c.content_type,
           c.scheduled_at, c.created_at, c.modified_at,
           a.id AS author_id, a.username AS author_username,
           a.first_name AS author_first_name, a.created_at AS author_created_at
    FROM content c
    INNER JOIN authors a ON a.id = c.author_id
"#;

const PUBLISHED_POSTS: &str = "c.status = 'published'::content_status \
    AND c.content_type = 'post'::content_type \
    AND c.scheduled_at <= $1";

const NEWEST_FIRST: &str = "ORDER BY c.scheduled_at DESC, c.id DESC";

#[derive(sqlx::FromRow)]
struct ContentRow {
    id: Uuid,
    title: String,
    slug: String,
    body_markdown: String,
    status: ContentStatus,
    content_type: ContentType,
    scheduled_at: OffsetDateTime,
    created_at: OffsetDateTime,
    modified_at: OffsetDateTime,
    author_id: Uuid,
    author_username: String,
    author_first_name: Option<String>,
    author_created_at: OffsetDateTime,
}

impl ContentRow {
    fn into_record(self, categories: Vec<CategoryRecord>) -> ContentRecord {
        ContentRecord {
            id: self.id,
            title: self.title,
            slug: self.slug,
            body_markdown: self.body_markdown,
            status: self.status,
            content_type: self.content_type,
            scheduled_at: self.scheduled_at,
            created_at: self.created_at,
            modified_at: self.modified_at,
            author: AuthorRecord {
                id: self.author_id,
                username: self.author_username,
                first_name: self.author_first_name,
                created_at: self.author_created_at,
            },
            categories,
        }
    }
}

#[derive(sqlx::FromRow)]
struct LinkedCategoryRow {
    content_id: Uuid,
    id: Uuid,
    name: String,
    slug: String,
    description: String,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl PostgresRepositories {
    /// Attach categories to the rows with one extra query for the whole batch.
    async fn hydrate(&self, rows: Vec<ContentRow>) -> Result<Vec<ContentRecord>, RepoError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let links = sqlx::query_as::<_, LinkedCategoryRow>(
            r#"
            SELECT cc.content_id, k.id, k.name, k.slug, k.description, k.created_at, k.updated_at
            FROM content_categories cc
            INNER JOIN categories k ON k.id = cc.category_id
            WHERE cc.content_id = ANY($1)
            ORDER BY k.name ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        let mut by_content: HashMap<Uuid, Vec<CategoryRecord>> = HashMap::new();
        for link in links {
            by_content
                .entry(link.content_id)
                .or_default()
                .push(CategoryRecord {
                    id: link.id,
                    name: link.name,
                    slug: link.slug,
                    description: link.description,
                    created_at: link.created_at,
                    updated_at: link.updated_at,
                });
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let categories = by_content.remove(&row.id).unwrap_or_default();
                row.into_record(categories)
            })
            .collect())
    }

    async fn hydrate_one(&self, row: Option<ContentRow>) -> Result<Option<ContentRecord>, RepoError> {
        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn replace_content_categories(
        tx: &mut Transaction<'_, Postgres>,
        content_id: Uuid,
        category_ids: &[Uuid],
    ) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM content_categories WHERE content_id = $1")
            .bind(content_id)
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        if !category_ids.is_empty() {
            sqlx::query(
                r#"
                INSERT INTO content_categories (content_id, category_id)
                SELECT $1, id
                FROM UNNEST($2::uuid[]) AS id
                "#,
            )
            .bind(content_id)
            .bind(category_ids)
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;
        }

        Ok(())
    }
}

#[async_trait]
impl ContentRepo for PostgresRepositories {
    async fn list_published(
        &self,
        now: OffsetDateTime,
        limit: u32,
    ) -> Result<Vec<ContentRecord>, RepoError> {
        let sql = format!("{CONTENT_SELECT} WHERE {PUBLISHED_POSTS} {NEWEST_FIRST} LIMIT $2");
        let rows = sqlx::query_as::<_, ContentRow>(&sql)
            .bind(now)
            .bind(i64::from(limit))
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        self.hydrate(rows).await
    }

    async fn next_scheduled_after(
        &self,
        now: OffsetDateTime,
    ) -> Result<Option<OffsetDateTime>, RepoError> {
        sqlx::query_scalar::<_, Option<OffsetDateTime>>(
            r#"
            SELECT MIN(scheduled_at)
            FROM content
            WHERE status = 'published'::content_status
              AND content_type = 'post'::content_type
              AND scheduled_at > $1
            "#,
        )
        .bind(now)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn find_published_by_slug(
        &self,
        content_type: ContentType,
        slug: &str,
        now: OffsetDateTime,
    ) -> Result<Option<ContentRecord>, RepoError> {
        let sql = format!(
            "{CONTENT_SELECT} WHERE c.status = 'published'::content_status \
             AND c.scheduled_at <= $1 AND c.content_type = $2 AND c.slug = $3"
        );
        let row = sqlx::query_as::<_, ContentRow>(&sql)
            .bind(now)
            .bind(content_type)
            .bind(slug)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        self.hydrate_one(row).await
    }

    async fn list_published_by_category(
        &self,
        category_id: Uuid,
        now: OffsetDateTime,
    ) -> Result<Vec<ContentRecord>, RepoError> {
        let sql = format!(
            "{CONTENT_SELECT} WHERE {PUBLISHED_POSTS} AND EXISTS (\
                SELECT 1 FROM content_categories cc \
                WHERE cc.content_id = c.id AND cc.category_id = $2\
             ) {NEWEST_FIRST}"
        );
        let rows = sqlx::query_as::<_, ContentRow>(&sql)
            .bind(now)
            .bind(category_id)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        self.hydrate(rows).await
    }

    async fn list_published_by_author(
        &self,
        author_id: Uuid,
        now: OffsetDateTime,
    ) -> Result<Vec<ContentRecord>, RepoError> {
        let sql = format!("{CONTENT_SELECT} WHERE {PUBLISHED_POSTS} AND c.author_id = $2 {NEWEST_FIRST}");
        let rows = sqlx::query_as::<_, ContentRow>(&sql)
            .bind(now)
            .bind(author_id)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        self.hydrate(rows).await
    }

    async fn list_published_between(
        &self,
        start: OffsetDateTime,
        end: OffsetDateTime,
        now: OffsetDateTime,
    ) -> Result<Vec<ContentRecord>, RepoError> {
        let sql = format!(
            "{CONTENT_SELECT} WHERE {PUBLISHED_POSTS} \
             AND c.scheduled_at >= $2 AND c.scheduled_at < $3 {NEWEST_FIRST}"
        );
        let rows = sqlx::query_as::<_, ContentRow>(&sql)
            .bind(now)
            .bind(start)
            .bind(end)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        self.hydrate(rows).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ContentRecord>, RepoError> {
        let sql = format!("{CONTENT_SELECT} WHERE c.id = $1");
        let row = sqlx::query_as::<_, ContentRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        self.hydrate_one(row).await
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<ContentRecord>, RepoError> {
        let sql = format!("{CONTENT_SELECT} WHERE c.slug = $1");
        let row = sqlx::query_as::<_, ContentRow>(&sql)
            .bind(slug)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        self.hydrate_one(row).await
    }
}

#[async_trait]
impl ContentWriteRepo for PostgresRepositories {
    async fn create_content(
        &self,
        params: CreateContentParams,
    ) -> Result<ContentRecord, RepoError> {
        let CreateContentParams {
            slug,
            title,
            body_markdown,
            status,
            content_type,
            scheduled_at,
            author_id,
            category_ids,
            created_at,
        } = params;

        let id = Uuid::new_v4();
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        sqlx::query(
            r#"
            INSERT INTO content (
                id, title, slug, body_markdown, status, content_type,
                scheduled_at, author_id, created_at, modified_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            "#,
        )
        .bind(id)
        .bind(&title)
        .bind(&slug)
        .bind(&body_markdown)
        .bind(status)
        .bind(content_type)
        .bind(scheduled_at)
        .bind(author_id)
        .bind(created_at)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        Self::replace_content_categories(&mut tx, id, &category_ids).await?;
        tx.commit().await.map_err(map_sqlx_error)?;

        ContentRepo::find_by_id(self, id)
            .await?
            .ok_or(RepoError::NotFound)
    }

    async fn update_content(
        &self,
        params: UpdateContentParams,
    ) -> Result<ContentRecord, RepoError> {
        let UpdateContentParams {
            id,
            title,
            body_markdown,
            status,
            content_type,
            scheduled_at,
            category_ids,
            modified_at,
        } = params;

        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let result = sqlx::query(
            r#"
            UPDATE content
            SET title = $2,
                body_markdown = $3,
                status = $4,
                content_type = $5,
                scheduled_at = $6,
                modified_at = $7
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&title)
        .bind(&body_markdown)
        .bind(status)
        .bind(content_type)
        .bind(scheduled_at)
        .bind(modified_at)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }

        Self::replace_content_categories(&mut tx, id, &category_ids).await?;
        tx.commit().await.map_err(map_sqlx_error)?;

        ContentRepo::find_by_id(self, id)
            .await?
            .ok_or(RepoError::NotFound)
    }

    async fn delete_content(&self, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM content WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
