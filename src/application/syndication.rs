//! RSS feed of the most recent published posts.

use std::sync::Arc;

use thiserror::Error;
use time::format_description::well_known::Rfc2822;
use tracing::instrument;

use crate::application::error::ContentError;
use crate::application::published::PublishedContentService;
use crate::application::render::{MarkdownRenderer, RenderError};

#[derive(Debug, Clone)]
pub struct FeedSettings {
    pub blog_title: String,
    pub blog_description: String,
    pub site_url: String,
}

#[derive(Debug, Error)]
pub enum SyndicationError {
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

#[derive(Clone)]
pub struct SyndicationService {
    published: PublishedContentService,
    renderer: Arc<MarkdownRenderer>,
    settings: Arc<FeedSettings>,
}

impl SyndicationService {
    pub fn new(
        published: PublishedContentService,
        renderer: Arc<MarkdownRenderer>,
        settings: FeedSettings,
    ) -> Self {
        Self {
            published,
            renderer,
            settings: Arc::new(settings),
        }
    }

    /// Generate RSS 2.0 feed XML.
    ///
    /// Reads through the published snapshot, so the feed shares its expiry.
    #[instrument(skip(self))]
    pub async fn rss_feed(&self) -> Result<String, SyndicationError> {
        let recent_count = self.published.settings().recent_count;
        let posts = self.published.get_recent_published(recent_count).await?;
        let base = normalize_site_url(&self.settings.site_url);

        let mut items = String::new();
        for post in posts {
            let pub_date = post
                .scheduled_at
                .format(&Rfc2822)
                .unwrap_or_else(|_| post.scheduled_at.to_string());
            let link = format!("{base}posts/{}", post.slug);
            let summary = self.renderer.summary(&post.body_markdown)?;
            items.push_str(&format!(
                "    <item>\n      <title>{}</title>\n      <link>{}</link>\n      <guid>{}</guid>\n      <pubDate>{}</pubDate>\n      <description><![CDATA[{}]]></description>\n    </item>\n",
                xml_escape(&post.title),
                xml_escape(&link),
                xml_escape(&link),
                pub_date,
                cdata_escape(&summary),
            ));
        }

        Ok(format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<rss version=\"2.0\">\n  <channel>\n    <title>{}</title>\n    <link>{}</link>\n    <description>{}</description>\n{}  </channel>\n</rss>\n",
            xml_escape(&self.settings.blog_title),
            xml_escape(&base),
            xml_escape(&self.settings.blog_description),
            items
        ))
    }
}

fn normalize_site_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    format!("{trimmed}/")
}

fn xml_escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// A literal `]]>` would close the section early; split it across two.
fn cdata_escape(input: &str) -> String {
    input.replace("]]>", "]]]]><![CDATA[>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup_characters() {
        assert_eq!(xml_escape("Tom & \"Jerry\""), "Tom &amp; &quot;Jerry&quot;");
        assert_eq!(cdata_escape("a]]>b"), "a]]]]><![CDATA[>b");
    }

    #[test]
    fn site_url_gets_single_trailing_slash() {
        assert_eq!(normalize_site_url("https://example.com"), "https://example.com/");
        assert_eq!(normalize_site_url("https://example.com//"), "https://example.com/");
    }
}
