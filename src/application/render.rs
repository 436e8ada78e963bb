//! Markdown rendering.
//!
//! Comrak parses the body, fenced code blocks are swapped for syntect output
//! with `syntax-` prefixed classes, and ammonia sanitises the final HTML. The
//! stylesheet matching those classes is generated by the build script.

use comrak::nodes::{AstNode, NodeHtmlBlock, NodeValue};
use comrak::options::Options;
use comrak::{Arena, format_html, parse_document};
use serde::Serialize;
use syntect::{
    dumps::from_uncompressed_data,
    html::{ClassStyle, ClassedHTMLGenerator},
    parsing::{SyntaxReference, SyntaxSet},
    util::LinesWithEndings,
};
use thiserror::Error;

const SYNTAX_PACK: &[u8] = include_bytes!(env!("SYNTAX_PACK_FILE"));
const THEME_CSS: &str = include_str!(env!("SYNTAX_THEME_CSS"));

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("markdown rendering failed: {message}")]
    Markdown { message: String },
    #[error("syntax highlighting failed: {language}: {message}")]
    Highlighting { language: String, message: String },
}

/// Rendered body and summary of a post or page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedContent {
    pub html: String,
    pub summary_html: String,
    pub is_truncated: bool,
}

pub struct MarkdownRenderer {
    options: Options<'static>,
    syntax_set: SyntaxSet,
    class_style: ClassStyle,
    sanitizer: ammonia::Builder<'static>,
    truncate_tag: String,
}

impl MarkdownRenderer {
    pub fn new(truncate_tag: impl Into<String>) -> Result<Self, RenderError> {
        let syntax_set: SyntaxSet =
            from_uncompressed_data(SYNTAX_PACK).map_err(|err| RenderError::Highlighting {
                language: "*".to_string(),
                message: format!("syntax pack is invalid: {err}"),
            })?;

        Ok(Self {
            options: default_options(),
            syntax_set,
            class_style: ClassStyle::SpacedPrefixed { prefix: "syntax-" },
            sanitizer: build_sanitizer(),
            truncate_tag: truncate_tag.into(),
        })
    }

    /// Stylesheet for the highlighted code classes.
    pub fn theme_css() -> &'static str {
        THEME_CSS
    }

    pub fn render(&self, markdown: &str) -> Result<String, RenderError> {
        let arena = Arena::new();
        let root = parse_document(&arena, markdown, &self.options);

        self.highlight_code_blocks(root)?;

        let mut html = String::new();
        format_html(root, &self.options, &mut html).map_err(|err| RenderError::Markdown {
            message: err.to_string(),
        })?;

        Ok(self.sanitizer.clean(&html).to_string())
    }

    /// Rendered text before the truncate tag, or the whole body without one.
    pub fn summary(&self, markdown: &str) -> Result<String, RenderError> {
        let head = markdown
            .split_once(self.truncate_tag.as_str())
            .map_or(markdown, |(head, _)| head);
        self.render(head)
    }

    pub fn is_truncated(&self, markdown: &str) -> bool {
        markdown.contains(self.truncate_tag.as_str())
    }

    pub fn render_content(&self, markdown: &str) -> Result<RenderedContent, RenderError> {
        Ok(RenderedContent {
            html: self.render(markdown)?,
            summary_html: self.summary(markdown)?,
            is_truncated: self.is_truncated(markdown),
        })
    }

    fn highlight_code_blocks<'a>(&self, root: &'a AstNode<'a>) -> Result<(), RenderError> {
        for node in root.descendants() {
            let Some((info, literal)) = extract_code_block(node) else {
                continue;
            };
            let language = info.split_whitespace().next();
            let html = self.highlight(language, &literal)?;

            node.data.borrow_mut().value = NodeValue::HtmlBlock(NodeHtmlBlock {
                block_type: 0,
                literal: html,
            });
        }
        Ok(())
    }

    fn highlight(&self, language: Option<&str>, code: &str) -> Result<String, RenderError> {
        let token = language.unwrap_or("text");
        let syntax = find_syntax(&self.syntax_set, token)
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());

        let mut source = code.to_string();
        if !source.ends_with('\n') {
            source.push('\n');
        }

        let mut generator =
            ClassedHTMLGenerator::new_with_class_style(syntax, &self.syntax_set, self.class_style);
        for line in LinesWithEndings::from(source.as_str()) {
            generator
                .parse_html_for_line_which_includes_newline(line)
                .map_err(|err| RenderError::Highlighting {
                    language: token.to_string(),
                    message: err.to_string(),
                })?;
        }

        let lang = ammonia::clean_text(&token.to_ascii_lowercase());
        Ok(format!(
            "<pre class=\"syntax-highlight\"><code class=\"language-{lang}\">{}</code></pre>\n",
            generator.finalize()
        ))
    }
}

fn extract_code_block(node: &AstNode<'_>) -> Option<(String, String)> {
    let data = node.data.borrow();
    if let NodeValue::CodeBlock(block) = &data.value {
        Some((block.info.trim().to_string(), block.literal.clone()))
    } else {
        None
    }
}

fn find_syntax<'a>(syntax_set: &'a SyntaxSet, token: &str) -> Option<&'a SyntaxReference> {
    let lowercase = token.to_ascii_lowercase();
    syntax_set
        .find_syntax_by_token(&lowercase)
        .or_else(|| syntax_set.find_syntax_by_name(&lowercase))
        .or_else(|| syntax_set.find_syntax_by_extension(&lowercase))
}

fn default_options() -> Options<'static> {
    let mut options = Options::default();
    let ext = &mut options.extension;
    ext.strikethrough = true;
    ext.table = true;
    ext.autolink = true;
    ext.footnotes = true;
    ext.tasklist = true;

    // Raw HTML such as the truncate marker passes through; ammonia cleans it.
    options.render.r#unsafe = true;
    options
}

fn build_sanitizer() -> ammonia::Builder<'static> {
    let mut builder = ammonia::Builder::default();
    builder.add_tag_attributes("span", &["class"]);
    builder.add_tag_attributes("pre", &["class"]);
    builder.add_tag_attributes("code", &["class"]);
    builder.add_tag_attributes("input", &["type", "checked", "disabled"]);
    builder.add_tags(&["input"]);
    builder
}
