use std::sync::Arc;

use tracing::{info, instrument};

use crate::application::error::ContentError;
use crate::application::repos::{AuthorsRepo, AuthorsWriteRepo, CreateAuthorParams};
use crate::domain::entities::AuthorRecord;
use crate::util::clock::Clock;

use super::ensure_non_empty;

#[derive(Debug, Clone)]
pub struct CreateAuthorCommand {
    pub username: String,
    pub first_name: Option<String>,
}

/// Authors are referenced by content only; they have no cached snapshot.
#[derive(Clone)]
pub struct AdminAuthorService {
    reader: Arc<dyn AuthorsRepo>,
    writer: Arc<dyn AuthorsWriteRepo>,
    clock: Arc<dyn Clock>,
}

impl AdminAuthorService {
    pub fn new(
        reader: Arc<dyn AuthorsRepo>,
        writer: Arc<dyn AuthorsWriteRepo>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            reader,
            writer,
            clock,
        }
    }

    #[instrument(skip(self, command), fields(username = %command.username))]
    pub async fn create(&self, command: CreateAuthorCommand) -> Result<AuthorRecord, ContentError> {
        let username = command.username.trim().to_string();
        ensure_non_empty(&username, "username")?;

        if self.reader.find_by_username(&username).await?.is_some() {
            return Err(ContentError::validation(format!(
                "username `{username}` is already taken"
            )));
        }

        let first_name = command
            .first_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());

        let record = self
            .writer
            .create_author(CreateAuthorParams {
                username,
                first_name,
                created_at: self.clock.now(),
            })
            .await?;

        info!(author_id = %record.id, "author created");
        Ok(record)
    }
}
