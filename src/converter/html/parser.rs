// src/converter/html/parser.rs
//! HTML to block parser.

use crate::converter::text::TextBuilder;
use crate::model::{
    Block, BlockContent, BlockTree, DivStyle, FileContent, FileKind, MarkKind, TextContent,
    TextStyle,
};
use crate::types::BlockId;
use scraper::{ElementRef, Html, Selector};

/// Parses an HTML document into an ordered block forest.
pub fn parse_html(input: &str) -> BlockTree {
    let document = Html::parse_document(input);
    let body = Selector::parse("body")
        .ok()
        .and_then(|selector| document.select(&selector).next());

    let mut walker = Walker::default();
    match body {
        Some(body) => walker.walk_container(body, None),
        None => walker.walk_container(document.root_element(), None),
    }
    walker.tree
}

#[derive(Default)]
struct Walker {
    tree: BlockTree,
    /// Images met inside inline content; emitted after the enclosing text.
    deferred: Vec<Block>,
}

fn is_inline(name: &str) -> bool {
    matches!(
        name,
        "a" | "b"
            | "strong"
            | "i"
            | "em"
            | "s"
            | "del"
            | "strike"
            | "u"
            | "ins"
            | "code"
            | "kbd"
            | "span"
            | "mark"
            | "small"
            | "sub"
            | "sup"
            | "br"
            | "abbr"
            | "cite"
            | "q"
            | "label"
            | "font"
    )
}

fn is_skipped(name: &str) -> bool {
    matches!(
        name,
        "script" | "style" | "head" | "title" | "meta" | "link" | "noscript" | "template"
    )
}

fn inline_mark(element: &ElementRef) -> Option<(MarkKind, String)> {
    let kind = match element.value().name() {
        "b" | "strong" => MarkKind::Bold,
        "i" | "em" => MarkKind::Italic,
        "s" | "del" | "strike" => MarkKind::Strikethrough,
        "u" | "ins" => MarkKind::Underscored,
        "code" | "kbd" => MarkKind::Keyboard,
        "a" => {
            let href = element.value().attr("href")?;
            return Some((MarkKind::Link, href.to_string()));
        }
        _ => return None,
    };
    Some((kind, String::new()))
}

fn image_block(element: &ElementRef) -> Option<Block> {
    let src = element.value().attr("src")?.trim();
    if src.is_empty() {
        return None;
    }
    let name = element
        .value()
        .attr("alt")
        .filter(|alt| !alt.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| src.rsplit('/').next().unwrap_or(src).to_string());
    Some(Block::new(BlockContent::File(FileContent::external(
        FileKind::Image,
        name,
        src,
    ))))
}

impl Walker {
    fn emit(&mut self, parent: Option<&BlockId>, block: Block) -> BlockId {
        match parent {
            Some(parent) => self.tree.push_child(parent, block),
            None => match self.merge_code(&block) {
                Some(id) => id,
                None => self.tree.push(block),
            },
        }
    }

    /// Folds a code block into the previous one when both share a language.
    fn merge_code(&mut self, block: &Block) -> Option<BlockId> {
        let incoming = block.text().filter(|t| t.style == TextStyle::Code)?;
        let last = self.tree.last_top_level()?.clone();
        let previous = self.tree.block_mut(&last)?;
        if !previous.children_ids.is_empty() {
            return None;
        }
        let previous = previous
            .text_mut()
            .filter(|t| t.style == TextStyle::Code && t.language == incoming.language)?;
        previous.text.push('\n');
        previous.text.push_str(&incoming.text);
        Some(last)
    }

    fn flush(&mut self, inline: &mut TextBuilder, parent: Option<&BlockId>) {
        let pending = inline.take();
        if !pending.is_blank() {
            let text = pending.finish(TextStyle::Paragraph);
            self.emit(parent, Block::new(BlockContent::Text(text)));
        }
        for image in std::mem::take(&mut self.deferred) {
            self.emit(parent, image);
        }
    }

    fn walk_container(&mut self, element: ElementRef, parent: Option<&BlockId>) {
        let mut inline = TextBuilder::new();
        for child in element.children() {
            if let Some(text) = child.value().as_text() {
                inline.push_collapsed(text);
                continue;
            }
            let Some(child) = ElementRef::wrap(child) else {
                continue;
            };
            let name = child.value().name();
            if is_inline(name) {
                self.collect_inline(child, &mut inline);
                continue;
            }
            self.flush(&mut inline, parent);
            self.walk_block(child, parent);
        }
        self.flush(&mut inline, parent);
    }

    fn walk_block(&mut self, element: ElementRef, parent: Option<&BlockId>) {
        let name = element.value().name();
        match name {
            "p" => self.text_block(element, parent, TextStyle::Paragraph),
            "h1" => self.text_block(element, parent, TextStyle::Header1),
            "h2" => self.text_block(element, parent, TextStyle::Header2),
            "h3" => self.text_block(element, parent, TextStyle::Header3),
            "h4" | "h5" | "h6" => self.text_block(element, parent, TextStyle::Header4),
            "blockquote" => self.text_block(element, parent, TextStyle::Quote),
            "aside" => self.text_block(element, parent, TextStyle::Callout),
            "pre" => self.code_block(element, parent),
            "ul" => self.walk_list(element, parent, TextStyle::Marked),
            "ol" => self.walk_list(element, parent, TextStyle::Numbered),
            "li" => self.list_item(element, parent, TextStyle::Marked),
            "hr" => {
                self.emit(parent, Block::new(BlockContent::Div { style: DivStyle::Line }));
            }
            "table" => self.walk_table(element, parent),
            "img" => {
                if let Some(block) = image_block(&element) {
                    self.emit(parent, block);
                }
            }
            name if is_skipped(name) => {}
            _ => self.walk_container(element, parent),
        }
    }

    fn text_block(&mut self, element: ElementRef, parent: Option<&BlockId>, style: TextStyle) {
        let mut inline = TextBuilder::new();
        self.collect_children(element, &mut inline);
        let text = inline.finish(style);
        if !text.text.is_empty() {
            self.emit(parent, Block::new(BlockContent::Text(text)));
        }
        for image in std::mem::take(&mut self.deferred) {
            self.emit(parent, image);
        }
    }

    fn code_block(&mut self, element: ElementRef, parent: Option<&BlockId>) {
        let raw: String = element.text().collect();
        let language = Selector::parse("code").ok().and_then(|selector| {
            element.select(&selector).next().and_then(|code| {
                code.value().classes().find_map(|class| {
                    class
                        .strip_prefix("language-")
                        .or_else(|| class.strip_prefix("lang-"))
                        .map(str::to_string)
                })
            })
        });
        let mut text = TextContent::new(raw.trim_end_matches('\n'), TextStyle::Code);
        text.language = language;
        self.emit(parent, Block::new(BlockContent::Text(text)));
    }

    fn walk_list(&mut self, element: ElementRef, parent: Option<&BlockId>, style: TextStyle) {
        for child in element.children().filter_map(ElementRef::wrap) {
            match child.value().name() {
                "li" => self.list_item(child, parent, style),
                "ul" => self.walk_list(child, parent, TextStyle::Marked),
                "ol" => self.walk_list(child, parent, TextStyle::Numbered),
                _ => self.walk_block(child, parent),
            }
        }
    }

    fn list_item(&mut self, element: ElementRef, parent: Option<&BlockId>, style: TextStyle) {
        let mut inline = TextBuilder::new();
        let mut nested = Vec::new();
        let mut checkbox = None;

        for child in element.children() {
            if let Some(text) = child.value().as_text() {
                inline.push_collapsed(text);
                continue;
            }
            let Some(child) = ElementRef::wrap(child) else {
                continue;
            };
            match child.value().name() {
                "ul" => nested.push((child, TextStyle::Marked)),
                "ol" => nested.push((child, TextStyle::Numbered)),
                "input" if child.value().attr("type") == Some("checkbox") => {
                    checkbox = Some(child.value().attr("checked").is_some());
                }
                _ => self.collect_inline(child, &mut inline),
            }
        }

        let style = if checkbox.is_some() {
            TextStyle::Checkbox
        } else {
            style
        };
        let mut text = inline.finish(style);
        text.checked = checkbox.unwrap_or(false);
        let id = self.emit(parent, Block::new(BlockContent::Text(text)));
        for image in std::mem::take(&mut self.deferred) {
            self.emit(Some(&id), image);
        }
        for (list, nested_style) in nested {
            self.walk_list(list, Some(&id), nested_style);
        }
    }

    fn walk_table(&mut self, element: ElementRef, parent: Option<&BlockId>) {
        let Ok(rows) = Selector::parse("tr") else {
            return;
        };
        let table = self.emit(parent, Block::new(BlockContent::Table));
        for row in element.select(&rows) {
            let cells: Vec<ElementRef> = row
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|c| matches!(c.value().name(), "td" | "th"))
                .collect();
            let is_header = cells.iter().any(|c| c.value().name() == "th");
            let row_id = self.emit(
                Some(&table),
                Block::new(BlockContent::TableRow { is_header }),
            );
            for cell in cells {
                let mut inline = TextBuilder::new();
                self.collect_children(cell, &mut inline);
                self.deferred.clear();
                let text = inline.finish(TextStyle::Paragraph);
                self.emit(Some(&row_id), Block::new(BlockContent::Text(text)));
            }
        }
    }

    fn collect_children(&mut self, element: ElementRef, inline: &mut TextBuilder) {
        for child in element.children() {
            if let Some(text) = child.value().as_text() {
                inline.push_collapsed(text);
            } else if let Some(child) = ElementRef::wrap(child) {
                self.collect_inline(child, inline);
            }
        }
    }

    fn collect_inline(&mut self, element: ElementRef, inline: &mut TextBuilder) {
        let name = element.value().name();
        match name {
            "br" => {
                inline.push_str("\n");
                return;
            }
            "img" => {
                if let Some(block) = image_block(&element) {
                    self.deferred.push(block);
                }
                return;
            }
            name if is_skipped(name) => return,
            "p" | "div" | "li" if !inline.is_blank() => inline.push_str("\n"),
            _ => {}
        }

        let from = inline.len();
        self.collect_children(element, inline);
        if let Some((kind, param)) = inline_mark(&element) {
            inline.add_mark(from, kind, param);
        }
    }
}
