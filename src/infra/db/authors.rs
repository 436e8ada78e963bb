use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{AuthorsRepo, AuthorsWriteRepo, CreateAuthorParams, RepoError};
use crate::domain::entities::AuthorRecord;

use super::PostgresRepositories;
use super::map_sqlx_error;

#[derive(sqlx::FromRow)]
struct AuthorRow {
    id: Uuid,
    username: String,
    first_name: Option<String>,
    created_at: OffsetDateTime,
}

impl From<AuthorRow> for AuthorRecord {
    fn from(row: AuthorRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            first_name: row.first_name,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl AuthorsRepo for PostgresRepositories {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<AuthorRecord>, RepoError> {
        let row = sqlx::query_as::<_, AuthorRow>(
            "SELECT id, username, first_name, created_at FROM authors WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(AuthorRecord::from))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<AuthorRecord>, RepoError> {
        let row = sqlx::query_as::<_, AuthorRow>(
            "SELECT id, username, first_name, created_at FROM authors WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(AuthorRecord::from))
    }
}

#[async_trait]
impl AuthorsWriteRepo for PostgresRepositories {
    async fn create_author(&self, params: CreateAuthorParams) -> Result<AuthorRecord, RepoError> {
        let row = sqlx::query_as::<_, AuthorRow>(
            r#"
            INSERT INTO authors (id, username, first_name, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, first_name, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(params.username)
        .bind(params.first_name)
        .bind(params.created_at)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(AuthorRecord::from(row))
    }
}
