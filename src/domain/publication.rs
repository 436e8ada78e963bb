use time::OffsetDateTime;

use crate::domain::{entities::ContentRecord, types::ContentStatus};

/// Whether `item` is visible to readers at `now`.
///
/// An item scheduled exactly at `now` is already visible.
pub fn is_published(item: &ContentRecord, now: OffsetDateTime) -> bool {
    item.status == ContentStatus::Published && item.scheduled_at <= now
}

#[cfg(test)]
mod tests {
    use time::{Duration, macros::datetime};
    use uuid::Uuid;

    use super::*;
    use crate::domain::{entities::AuthorRecord, types::ContentType};

    fn record(status: ContentStatus, scheduled_at: OffsetDateTime) -> ContentRecord {
        let created_at = datetime!(2024-01-01 00:00 UTC);
        ContentRecord {
            id: Uuid::new_v4(),
            title: "Scheduled".to_string(),
            slug: "scheduled".to_string(),
            body_markdown: String::new(),
            status,
            content_type: ContentType::Post,
            scheduled_at,
            created_at,
            modified_at: created_at,
            author: AuthorRecord {
                id: Uuid::new_v4(),
                username: "writer".to_string(),
                first_name: None,
                created_at,
            },
            categories: Vec::new(),
        }
    }

    #[test]
    fn published_when_schedule_has_passed() {
        let now = datetime!(2024-06-01 12:00 UTC);
        let item = record(ContentStatus::Published, now - Duration::hours(1));
        assert!(is_published(&item, now));
    }

    #[test]
    fn boundary_instant_counts_as_published() {
        let now = datetime!(2024-06-01 12:00 UTC);
        let item = record(ContentStatus::Published, now);
        assert!(is_published(&item, now));
    }

    #[test]
    fn future_and_draft_items_are_hidden() {
        let now = datetime!(2024-06-01 12:00 UTC);
        let future = record(ContentStatus::Published, now + Duration::seconds(1));
        let draft = record(ContentStatus::Draft, now - Duration::days(3));
        assert!(!is_published(&future, now));
        assert!(!is_published(&draft, now));
    }
}
