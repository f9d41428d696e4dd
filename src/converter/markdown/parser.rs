// src/converter/markdown/parser.rs
//! Markdown to block parser built on comrak's AST.

use crate::converter::text::TextBuilder;
use crate::model::{
    utf16_len, Block, BlockContent, BlockTree, DivStyle, FileContent, FileKind, MarkKind,
    TextContent, TextStyle,
};
use crate::types::BlockId;
use comrak::nodes::{AstNode, ListType, NodeValue};
use comrak::{parse_document, Arena, ComrakOptions};

fn options() -> ComrakOptions {
    let mut options = ComrakOptions::default();
    options.parse.smart = false;
    options.extension.table = true;
    options.extension.strikethrough = true;
    options.extension.autolink = true;
    options
}

/// Parses a Markdown body (front matter already removed) into blocks.
pub fn parse_markdown(text: &str) -> BlockTree {
    let arena = Arena::new();
    let root = parse_document(&arena, text, &options());

    let mut walker = Walker::default();
    for node in root.children() {
        walker.walk_block(node, None);
    }
    walker.tree
}

#[derive(Default)]
struct Walker {
    tree: BlockTree,
    deferred: Vec<Block>,
}

impl Walker {
    fn emit(&mut self, parent: Option<&BlockId>, block: Block) -> BlockId {
        match parent {
            Some(parent) => self.tree.push_child(parent, block),
            None => self.tree.push(block),
        }
    }

    fn emit_deferred(&mut self, parent: Option<&BlockId>) {
        for block in std::mem::take(&mut self.deferred) {
            self.emit(parent, block);
        }
    }

    fn walk_block<'a>(&mut self, node: &'a AstNode<'a>, parent: Option<&BlockId>) {
        let value = node.data.borrow().value.clone();
        match value {
            NodeValue::Paragraph => {
                let text = self.inline_text(node, TextStyle::Paragraph);
                if !text.text.is_empty() {
                    self.emit(parent, Block::new(BlockContent::Text(text)));
                }
                self.emit_deferred(parent);
            }
            NodeValue::Heading(heading) => {
                let text = self.inline_text(node, TextStyle::header(heading.level));
                self.emit(parent, Block::new(BlockContent::Text(text)));
                self.emit_deferred(parent);
            }
            NodeValue::BlockQuote => {
                let mut builder = TextBuilder::new();
                for (i, child) in node.children().enumerate() {
                    if i > 0 {
                        builder.push_str("\n");
                    }
                    self.collect_inline(child, &mut builder);
                }
                let text = builder.finish(TextStyle::Quote);
                self.emit(parent, Block::new(BlockContent::Text(text)));
                self.emit_deferred(parent);
            }
            NodeValue::List(list) => {
                let style = match list.list_type {
                    ListType::Bullet => TextStyle::Marked,
                    ListType::Ordered => TextStyle::Numbered,
                };
                for item in node.children() {
                    self.list_item(item, parent, style);
                }
            }
            NodeValue::CodeBlock(code) => {
                let mut text =
                    TextContent::new(code.literal.trim_end_matches('\n'), TextStyle::Code);
                text.language = code
                    .info
                    .split_whitespace()
                    .next()
                    .map(str::to_string);
                self.emit(parent, Block::new(BlockContent::Text(text)));
            }
            NodeValue::ThematicBreak => {
                self.emit(parent, Block::new(BlockContent::Div { style: DivStyle::Line }));
            }
            NodeValue::Table(..) => self.table(node, parent),
            NodeValue::HtmlBlock(_) | NodeValue::FrontMatter(_) => {}
            _ => {
                for child in node.children() {
                    self.walk_block(child, parent);
                }
            }
        }
    }

    fn list_item<'a>(&mut self, item: &'a AstNode<'a>, parent: Option<&BlockId>, style: TextStyle) {
        let mut children = item.children();
        let first = children.next();

        let mut text = match first {
            Some(node) if matches!(node.data.borrow().value, NodeValue::Paragraph) => {
                self.inline_text(node, style)
            }
            _ => TextContent::new("", style),
        };
        strip_task_marker(&mut text);

        let id = self.emit(parent, Block::new(BlockContent::Text(text)));
        self.emit_deferred(Some(&id));

        let rest: Vec<&'a AstNode<'a>> = match first {
            Some(node) if matches!(node.data.borrow().value, NodeValue::Paragraph) => {
                children.collect()
            }
            Some(node) => std::iter::once(node).chain(children).collect(),
            None => Vec::new(),
        };
        for child in rest {
            self.walk_block(child, Some(&id));
        }
    }

    fn table<'a>(&mut self, node: &'a AstNode<'a>, parent: Option<&BlockId>) {
        let table = self.emit(parent, Block::new(BlockContent::Table));
        for row in node.children() {
            let is_header = matches!(row.data.borrow().value, NodeValue::TableRow(true));
            let row_id = self.emit(Some(&table), Block::new(BlockContent::TableRow { is_header }));
            for cell in row.children() {
                let text = self.inline_text(cell, TextStyle::Paragraph);
                self.deferred.clear();
                self.emit(Some(&row_id), Block::new(BlockContent::Text(text)));
            }
        }
    }

    fn inline_text<'a>(&mut self, node: &'a AstNode<'a>, style: TextStyle) -> TextContent {
        let mut builder = TextBuilder::new();
        for child in node.children() {
            self.collect_inline(child, &mut builder);
        }
        builder.finish(style)
    }

    fn collect_inline<'a>(&mut self, node: &'a AstNode<'a>, builder: &mut TextBuilder) {
        let value = node.data.borrow().value.clone();
        let from = builder.len();
        let mark = match value {
            NodeValue::Text(text) => {
                builder.push_str(&text);
                return;
            }
            NodeValue::SoftBreak => {
                builder.push_str(" ");
                return;
            }
            NodeValue::LineBreak => {
                builder.push_str("\n");
                return;
            }
            NodeValue::Code(code) => {
                builder.push_str(&code.literal);
                builder.add_mark(from, MarkKind::Keyboard, "");
                return;
            }
            NodeValue::Image(link) => {
                let mut alt = TextBuilder::new();
                for child in node.children() {
                    self.collect_inline(child, &mut alt);
                }
                let alt = alt.finish(TextStyle::Paragraph).text;
                let name = if alt.is_empty() {
                    link.url.rsplit('/').next().unwrap_or(&link.url).to_string()
                } else {
                    alt
                };
                self.deferred.push(Block::new(BlockContent::File(FileContent::external(
                    FileKind::Image,
                    name,
                    link.url,
                ))));
                return;
            }
            NodeValue::HtmlInline(_) => return,
            NodeValue::Emph => Some((MarkKind::Italic, String::new())),
            NodeValue::Strong => Some((MarkKind::Bold, String::new())),
            NodeValue::Strikethrough => Some((MarkKind::Strikethrough, String::new())),
            NodeValue::Link(link) => Some((MarkKind::Link, link.url)),
            NodeValue::Paragraph => {
                if !builder.is_blank() {
                    builder.push_str("\n");
                }
                None
            }
            _ => None,
        };

        let from = builder.len();
        for child in node.children() {
            self.collect_inline(child, builder);
        }
        if let Some((kind, param)) = mark {
            builder.add_mark(from, kind, param);
        }
    }
}

/// Turns a leading `[ ] ` or `[x] ` into a checkbox.
fn strip_task_marker(text: &mut TextContent) {
    let checked = if text.text.starts_with("[ ] ") {
        false
    } else if text.text.starts_with("[x] ") || text.text.starts_with("[X] ") {
        true
    } else {
        return;
    };
    let shift = utf16_len("[ ] ");
    text.text = text.text[4..].to_string();
    text.style = TextStyle::Checkbox;
    text.checked = checked;
    for mark in text.marks.iter_mut() {
        mark.range.from = mark.range.from.saturating_sub(shift);
        mark.range.to = mark.range.to.saturating_sub(shift);
    }
    text.marks.retain(|m| !m.range.is_empty());
}
