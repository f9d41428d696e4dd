// src/converter/text.rs
//! Accumulates inline text and its marks while a parser walks a document.

use crate::model::{utf16_len, Mark, MarkKind, Range, TextContent, TextStyle};

#[derive(Debug, Default, Clone)]
pub struct TextBuilder {
    text: String,
    len: usize,
    marks: Vec<Mark>,
}

impl TextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_str(&mut self, s: &str) {
        self.len += utf16_len(s);
        self.text.push_str(s);
    }

    /// Appends HTML-style text: whitespace runs collapse to one space.
    pub fn push_collapsed(&mut self, s: &str) {
        let mut out = String::with_capacity(s.len());
        let mut prev_space = self.text.is_empty() || self.text.ends_with(char::is_whitespace);
        for ch in s.chars() {
            if ch.is_whitespace() {
                if !prev_space {
                    out.push(' ');
                }
                prev_space = true;
            } else {
                out.push(ch);
                prev_space = false;
            }
        }
        self.push_str(&out);
    }

    /// Current length in UTF-16 code units.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn add_mark(&mut self, from: usize, kind: MarkKind, param: impl Into<String>) {
        let to = self.len;
        if to > from {
            self.marks
                .push(Mark::with_param(Range::new(from, to), kind, param));
        }
    }

    /// Produces trimmed text with marks shifted and clamped to it.
    pub fn finish(self, style: TextStyle) -> TextContent {
        let leading = utf16_len(&self.text[..self.text.len() - self.text.trim_start().len()]);
        let text = self.text.trim().to_string();
        let len = utf16_len(&text);
        let marks = self
            .marks
            .into_iter()
            .filter_map(|mut mark| {
                mark.range.from = mark.range.from.saturating_sub(leading).min(len);
                mark.range.to = mark.range.to.saturating_sub(leading).min(len);
                (!mark.range.is_empty()).then_some(mark)
            })
            .collect();
        TextContent::new(text, style).with_marks(marks)
    }

    /// Like [`finish`](Self::finish) but keeps whitespace, for code.
    pub fn finish_raw(self, style: TextStyle) -> TextContent {
        TextContent::new(self.text, style).with_marks(self.marks)
    }

    pub fn take(&mut self) -> TextBuilder {
        std::mem::take(self)
    }
}
