// src/model/marks.rs
use crate::types::OptionColor;
use serde::{Deserialize, Serialize};

/// Half-open range over the UTF-16 code units of a block's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub from: usize,
    pub to: usize,
}

impl Range {
    pub fn new(from: usize, to: usize) -> Self {
        Self { from, to }
    }

    pub fn is_empty(&self) -> bool {
        self.to <= self.from
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MarkKind {
    Bold,
    Italic,
    Strikethrough,
    Underscored,
    Keyboard,
    Link,
    Mention,
    TextColor,
    BackgroundColor,
}

/// Inline formatting; `param` holds the URL, target object ID or colour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mark {
    pub range: Range,
    #[serde(rename = "type")]
    pub kind: MarkKind,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub param: String,
}

impl Mark {
    pub fn new(range: Range, kind: MarkKind) -> Self {
        Self {
            range,
            kind,
            param: String::new(),
        }
    }

    pub fn with_param(range: Range, kind: MarkKind, param: impl Into<String>) -> Self {
        Self {
            range,
            kind,
            param: param.into(),
        }
    }

    pub fn color(range: Range, kind: MarkKind, color: OptionColor) -> Self {
        Self::with_param(range, kind, color.as_str())
    }
}

/// Length of `s` in UTF-16 code units.
pub fn utf16_len(s: &str) -> usize {
    s.encode_utf16().count()
}

/// Converts a UTF-16 offset back into a byte offset of `s`, clamped to its end.
pub fn utf16_to_byte(s: &str, offset: usize) -> usize {
    let mut units = 0;
    for (byte_idx, ch) in s.char_indices() {
        if units >= offset {
            return byte_idx;
        }
        units += ch.len_utf16();
    }
    s.len()
}

/// Whether the text outside `range` is whitespace only.
pub fn covers_whole_line(text: &str, range: Range) -> bool {
    let from = utf16_to_byte(text, range.from);
    let to = utf16_to_byte(text, range.to);
    text[..from].trim().is_empty() && text[to..].trim().is_empty()
}
