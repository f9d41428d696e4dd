// src/converter/notion/blocks.rs
//! Fetched Notion blocks to a local block tree.

use super::context::ImportContext;
use super::rich_text::to_text;
use crate::api::blocks::{
    BlockKind, CalloutBlock, FileBlock, LinkTarget, NotionBlock, TableBlock, TextBlock,
};
use crate::api::responses::{plain_text, FileObject};
use crate::constants::NOT_ACCESSIBLE_PLACEHOLDER;
use crate::model::{
    Block, BlockContent, BlockTree, BookmarkContent, DataviewContent, DivStyle, FileContent,
    FileKind, LayoutStyle, PendingFile, PendingSource, TextContent, TextStyle,
};
use crate::types::{BlockId, Color, ObjectId};

/// Maps the blocks of one page; collects Notion-hosted binaries on the way.
pub struct BlockMapper<'a> {
    ctx: &'a ImportContext,
    /// Notion ID of the page whose blocks are mapped.
    page: &'a str,
    tree: BlockTree,
    files: Vec<PendingFile>,
}

impl<'a> BlockMapper<'a> {
    pub fn new(ctx: &'a ImportContext, page: &'a str) -> Self {
        Self {
            ctx,
            page,
            tree: BlockTree::new(),
            files: Vec::new(),
        }
    }

    /// Maps `blocks` as top-level content and returns the tree plus the
    /// binaries it refers to.
    pub fn map(mut self, blocks: &[NotionBlock]) -> (BlockTree, Vec<PendingFile>) {
        for block in blocks {
            self.map_block(None, block);
        }
        (self.tree, self.files)
    }

    fn attach(&mut self, parent: Option<&BlockId>, block: Block) -> BlockId {
        match parent {
            Some(parent) => self.tree.push_child(parent, block),
            None => self.tree.push(block),
        }
    }

    fn map_children(&mut self, parent: &BlockId, children: &[NotionBlock]) {
        for child in children {
            self.map_block(Some(parent), child);
        }
    }

    fn map_block(&mut self, parent: Option<&BlockId>, block: &NotionBlock) {
        let content = match &block.kind {
            BlockKind::Paragraph(text) => return self.text(parent, block, text, TextStyle::Paragraph),
            BlockKind::Heading1(text) => return self.text(parent, block, text, TextStyle::Header1),
            BlockKind::Heading2(text) => return self.text(parent, block, text, TextStyle::Header2),
            BlockKind::Heading3(text) => return self.text(parent, block, text, TextStyle::Header3),
            BlockKind::BulletedListItem(text) => {
                return self.text(parent, block, text, TextStyle::Marked)
            }
            BlockKind::NumberedListItem(text) => {
                return self.text(parent, block, text, TextStyle::Numbered)
            }
            BlockKind::Toggle(text) => return self.text(parent, block, text, TextStyle::Toggle),
            BlockKind::Quote(text) => return self.text(parent, block, text, TextStyle::Quote),
            BlockKind::ToDo(todo) => {
                let mut text = to_text(&todo.rich_text, TextStyle::Checkbox, self.ctx);
                text.checked = todo.checked;
                return self.colored(parent, block, text, todo.color);
            }
            BlockKind::Callout(callout) => return self.callout(parent, block, callout),
            BlockKind::Code(code) => {
                let mut text = to_text(&code.rich_text, TextStyle::Code, self.ctx);
                if !code.language.is_empty() {
                    text.language = Some(code.language.clone());
                }
                BlockContent::Text(text)
            }
            BlockKind::Divider => BlockContent::Div {
                style: DivStyle::Line,
            },
            BlockKind::TableOfContents => BlockContent::TableOfContents,
            BlockKind::Embed(embed) => BlockContent::Embed {
                url: embed.url.clone(),
            },
            BlockKind::Bookmark(link) | BlockKind::LinkPreview(link) => {
                BlockContent::Bookmark(BookmarkContent {
                    url: link.url.clone(),
                    title: plain_text(&link.caption),
                })
            }
            BlockKind::Equation(equation) => BlockContent::Latex {
                text: equation.expression.clone(),
            },
            BlockKind::File(file) => self.file(file, FileKind::File),
            BlockKind::Image(file) => self.file(file, FileKind::Image),
            BlockKind::Video(file) => self.file(file, FileKind::Video),
            BlockKind::Audio(file) => self.file(file, FileKind::Audio),
            BlockKind::Pdf(file) => self.file(file, FileKind::Pdf),
            BlockKind::ColumnList => BlockContent::Layout {
                style: LayoutStyle::Row,
            },
            BlockKind::Column => BlockContent::Layout {
                style: LayoutStyle::Column,
            },
            BlockKind::Table(table) => return self.table(parent, block, table),
            // Rows outside a table carry no header information.
            BlockKind::TableRow(_) => return self.row(parent, block, false),
            BlockKind::ChildPage(title) => match self
                .ctx
                .claim_child(self.page, &title.title)
                .or_else(|| self.ctx.page_id(&block.id))
            {
                Some(target) => BlockContent::Link {
                    target_block_id: target,
                },
                None => placeholder(),
            },
            BlockKind::ChildDatabase(title) => match self.child_database(&block.id, &title.title) {
                Some(target) => BlockContent::Dataview(DataviewContent {
                    target_object_id: Some(target),
                    relation_links: Vec::new(),
                }),
                None => placeholder(),
            },
            BlockKind::LinkToPage(target) => {
                let resolved = match target {
                    LinkTarget::PageId { page_id } => self.ctx.page_id(page_id),
                    LinkTarget::DatabaseId { database_id } => self.ctx.database_id(database_id),
                    LinkTarget::Unsupported => None,
                };
                match resolved {
                    Some(target) => BlockContent::Link {
                        target_block_id: target,
                    },
                    None => placeholder(),
                }
            }
            BlockKind::Unsupported(kind) => {
                log::debug!("unsupported block {} ({}) kept as a div", block.id, kind);
                BlockContent::Layout {
                    style: LayoutStyle::Div,
                }
            }
        };

        let id = self.attach(parent, Block::new(content));
        self.map_children(&id, &block.children);
    }

    fn text(&mut self, parent: Option<&BlockId>, block: &NotionBlock, text: &TextBlock, style: TextStyle) {
        let content = to_text(&text.rich_text, style, self.ctx);
        self.colored(parent, block, content, text.color);
    }

    fn callout(&mut self, parent: Option<&BlockId>, block: &NotionBlock, callout: &CalloutBlock) {
        let mut text = to_text(&callout.rich_text, TextStyle::Callout, self.ctx);
        text.icon_emoji = match &callout.icon {
            Some(FileObject::Emoji { emoji }) => Some(emoji.clone()),
            _ => None,
        };
        self.colored(parent, block, text, callout.color);
    }

    /// Text colours go on the text, background colours on the block.
    fn colored(&mut self, parent: Option<&BlockId>, block: &NotionBlock, mut text: TextContent, color: Color) {
        let background = if color.is_background() {
            color.to_local()
        } else {
            text.color = color.to_local();
            None
        };
        let mut local = Block::new(BlockContent::Text(text));
        local.background_color = background;
        let id = self.attach(parent, local);
        self.map_children(&id, &block.children);
    }

    fn table(&mut self, parent: Option<&BlockId>, block: &NotionBlock, table: &TableBlock) {
        let id = self.attach(parent, Block::new(BlockContent::Table));
        for (index, row) in block.children.iter().enumerate() {
            if matches!(row.kind, BlockKind::TableRow(_)) {
                self.row(Some(&id), row, index == 0 && table.has_column_header);
            } else {
                self.map_block(Some(&id), row);
            }
        }
    }

    fn row(&mut self, parent: Option<&BlockId>, block: &NotionBlock, is_header: bool) {
        let BlockKind::TableRow(row) = &block.kind else {
            return;
        };
        let id = self.attach(parent, Block::new(BlockContent::TableRow { is_header }));
        for cell in &row.cells {
            let text = to_text(cell, TextStyle::Paragraph, self.ctx);
            self.tree.push_child(&id, Block::new(BlockContent::Text(text)));
        }
    }

    fn file(&mut self, file: &FileBlock, kind: FileKind) -> BlockContent {
        let Some(url) = file.source.url() else {
            return placeholder();
        };
        let name = file
            .name
            .clone()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| file_name(url));
        match &file.source {
            FileObject::File { .. } => {
                let pending = PendingFile::new(PendingSource::Url {
                    url: url.to_string(),
                });
                let content = FileContent::pending(kind, name, pending.content_id.clone());
                self.files.push(pending);
                BlockContent::File(content)
            }
            _ => BlockContent::File(FileContent::external(kind, name, url)),
        }
    }

    /// Inline databases are claimed by title under the page, then looked up
    /// by ID and finally by name across the workspace.
    fn child_database(&self, notion_id: &str, title: &str) -> Option<ObjectId> {
        self.ctx
            .claim_database(self.page, title)
            .or_else(|| self.ctx.database_id(notion_id))
            .or_else(|| self.ctx.database_by_name(title))
    }
}

pub(crate) fn placeholder() -> BlockContent {
    BlockContent::Text(TextContent::paragraph(NOT_ACCESSIBLE_PLACEHOLDER))
}

/// Last path segment of a URL without its query.
fn file_name(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let name = path.rsplit('/').next().unwrap_or(path);
    let decoded = urlencoding::decode(name)
        .map(|n| n.into_owned())
        .unwrap_or_else(|_| name.to_string());
    if decoded.is_empty() {
        "file".to_string()
    } else {
        decoded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::blocks::parse_block;
    use crate::api::responses::Parent;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    const PAGE: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

    fn block(raw: Value) -> NotionBlock {
        parse_block(&raw).unwrap()
    }

    fn under_page() -> Parent {
        Parent::PageId {
            page_id: PAGE.to_string(),
        }
    }

    #[test]
    fn child_pages_with_one_title_link_to_distinct_pages() {
        let ctx = ImportContext::new();
        let first = ctx.register_page("11111111111111111111111111111111", "Work", &under_page());
        let second = ctx.register_page("22222222222222222222222222222222", "Work", &under_page());

        let blocks: Vec<NotionBlock> = (0..3)
            .map(|i| {
                block(json!({
                    "id": format!("b{}", i), "type": "child_page",
                    "child_page": {"title": "Work"}
                }))
            })
            .collect();
        let (tree, _) = BlockMapper::new(&ctx, PAGE).map(&blocks);

        let contents: Vec<&BlockContent> = tree.blocks().iter().map(|b| &b.content).collect();
        assert_eq!(
            contents,
            vec![
                &BlockContent::Link { target_block_id: first },
                &BlockContent::Link { target_block_id: second },
                &placeholder(),
            ]
        );
    }

    #[test]
    fn unsupported_blocks_wrap_their_children() {
        let ctx = ImportContext::new();
        let mut synced = block(json!({
            "id": "s1", "type": "synced_block", "has_children": true,
            "synced_block": {"synced_from": null}
        }));
        synced.children = vec![block(json!({
            "id": "p1", "type": "paragraph",
            "paragraph": {"rich_text": [{"plain_text": "inside"}]}
        }))];
        let (tree, _) = BlockMapper::new(&ctx, PAGE).map(&[synced]);

        assert_eq!(tree.top_level().len(), 1);
        let wrapper = &tree.blocks()[0];
        assert_eq!(wrapper.content, BlockContent::Layout { style: LayoutStyle::Div });
        assert_eq!(wrapper.children_ids.len(), 1);
        assert_eq!(tree.blocks()[1].text().map(|t| t.text.as_str()), Some("inside"));
    }

    #[test]
    fn background_colors_land_on_the_block() {
        let ctx = ImportContext::new();
        let blocks = vec![block(json!({
            "id": "b1", "type": "paragraph",
            "paragraph": {"rich_text": [{"plain_text": "hi"}], "color": "blue_background"}
        }))];
        let (tree, _) = BlockMapper::new(&ctx, PAGE).map(&blocks);
        let mapped = &tree.blocks()[0];
        assert_eq!(mapped.background_color, Some(crate::types::OptionColor::Blue));
        assert_eq!(mapped.text().and_then(|t| t.color), None);
    }

    #[test]
    fn hosted_files_are_registered_for_upload() {
        let ctx = ImportContext::new();
        let blocks = vec![
            block(json!({
                "id": "b1", "type": "image",
                "image": {"type": "file", "file": {"url": "https://s3/x/photo.png?sig=1"}}
            })),
            block(json!({
                "id": "b2", "type": "pdf",
                "pdf": {"type": "external", "external": {"url": "https://x.org/a.pdf"}}
            })),
        ];
        let (tree, files) = BlockMapper::new(&ctx, PAGE).map(&blocks);
        assert_eq!(files.len(), 1);

        let BlockContent::File(hosted) = &tree.blocks()[0].content else {
            panic!("expected a file block");
        };
        assert_eq!(hosted.name, "photo.png");
        assert_eq!(hosted.content_id.as_ref(), Some(&files[0].content_id));

        let BlockContent::File(external) = &tree.blocks()[1].content else {
            panic!("expected a file block");
        };
        assert_eq!(external.url.as_deref(), Some("https://x.org/a.pdf"));
        assert_eq!(external.kind, FileKind::Pdf);
    }

    #[test]
    fn tables_mark_the_header_row() {
        let ctx = ImportContext::new();
        let mut table = block(json!({
            "id": "t", "type": "table", "has_children": true,
            "table": {"table_width": 2, "has_column_header": true}
        }));
        table.children = (0..2)
            .map(|i| {
                block(json!({
                    "id": format!("r{}", i), "type": "table_row",
                    "table_row": {"cells": [[{"plain_text": "a"}], [{"plain_text": "b"}]]}
                }))
            })
            .collect();
        let (tree, _) = BlockMapper::new(&ctx, PAGE).map(&[table]);

        let rows: Vec<&BlockContent> = tree
            .blocks()
            .iter()
            .map(|b| &b.content)
            .filter(|c| matches!(c, BlockContent::TableRow { .. }))
            .collect();
        assert_eq!(
            rows,
            vec![
                &BlockContent::TableRow { is_header: true },
                &BlockContent::TableRow { is_header: false },
            ]
        );
        // table + 2 rows + 4 cells
        assert_eq!(tree.blocks().len(), 7);
    }
}
