// src/converter/notion/rich_text.rs
//! Notion rich text arrays to text plus marks.

use super::context::ImportContext;
use crate::api::responses::{Annotations, Mention, RichText};
use crate::converter::text::TextBuilder;
use crate::model::{MarkKind, TextContent, TextStyle};
use crate::types::Color;

/// Concatenates `parts` into one text, keeping annotations, links and
/// mentions of imported objects as marks.
pub fn to_text(parts: &[RichText], style: TextStyle, ctx: &ImportContext) -> TextContent {
    let mut builder = TextBuilder::new();
    for part in parts {
        let from = builder.len();
        builder.push_str(&part.plain_text);
        annotate(&mut builder, from, &part.annotations);

        match &part.mention {
            Some(mention) => {
                if let Some(target) = mention_target(mention, ctx) {
                    builder.add_mark(from, MarkKind::Mention, target);
                }
            }
            None => {
                if let Some(href) = &part.href {
                    builder.add_mark(from, MarkKind::Link, href.as_str());
                }
            }
        }
    }
    builder.finish_raw(style)
}

fn annotate(builder: &mut TextBuilder, from: usize, annotations: &Annotations) {
    let flags = [
        (annotations.bold, MarkKind::Bold),
        (annotations.italic, MarkKind::Italic),
        (annotations.strikethrough, MarkKind::Strikethrough),
        (annotations.underline, MarkKind::Underscored),
        (annotations.code, MarkKind::Keyboard),
    ];
    for (on, kind) in flags {
        if on {
            builder.add_mark(from, kind, "");
        }
    }

    if annotations.color != Color::Default {
        if let Some(local) = annotations.color.to_local() {
            let kind = if annotations.color.is_background() {
                MarkKind::BackgroundColor
            } else {
                MarkKind::TextColor
            };
            builder.add_mark(from, kind, local.as_str());
        }
    }
}

fn mention_target(mention: &Mention, ctx: &ImportContext) -> Option<String> {
    let target = match mention {
        Mention::Page { page } => ctx.page_id(&page.id),
        Mention::Database { database } => ctx.database_id(&database.id),
        Mention::Other => None,
    };
    target.map(|id| id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::responses::{IdRef, Parent};
    use crate::model::{Mark, Range};
    use pretty_assertions::assert_eq;

    #[test]
    fn annotations_become_marks() {
        let ctx = ImportContext::new();
        let mut bold = RichText::plain("bold");
        bold.annotations.bold = true;
        bold.annotations.color = Color::RedBackground;
        let parts = vec![RichText::plain("a "), bold];

        let text = to_text(&parts, TextStyle::Paragraph, &ctx);
        assert_eq!(text.text, "a bold");
        assert_eq!(
            text.marks,
            vec![
                Mark::new(Range::new(2, 6), MarkKind::Bold),
                Mark::with_param(Range::new(2, 6), MarkKind::BackgroundColor, "red"),
            ]
        );
    }

    #[test]
    fn mentions_resolve_to_local_ids() {
        let ctx = ImportContext::new();
        let notion_id = "22222222222222222222222222222222";
        let local = ctx.register_page(notion_id, "Target", &Parent::Workspace);

        let mut known = RichText::plain("Target");
        known.mention = Some(Mention::Page {
            page: IdRef { id: notion_id.into() },
        });
        known.href = Some("https://www.notion.so/x".into());
        let mut unknown = RichText::plain(" other");
        unknown.mention = Some(Mention::Page {
            page: IdRef { id: "33333333333333333333333333333333".into() },
        });

        let text = to_text(&[known, unknown], TextStyle::Paragraph, &ctx);
        assert_eq!(text.text, "Target other");
        assert_eq!(
            text.marks,
            vec![Mark::with_param(Range::new(0, 6), MarkKind::Mention, local.as_str())]
        );
    }
}
