// src/converter/markdown/front_matter.rs
//! YAML front matter: a leading `---` block turned into typed page fields.

use crate::model::{keys, DetailValue, RelationFormat};
use crate::types::ValidatedUrl;
use chrono::{DateTime, NaiveDate};
use serde_yaml::Value;

const DELIMITER: &str = "---";

/// One front matter key with its inferred relation format.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub format: RelationFormat,
    pub value: DetailValue,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrontMatter {
    pub title: Option<String>,
    pub fields: Vec<Field>,
}

/// Splits `text` into its raw front matter and the Markdown body.
pub fn split_front_matter(text: &str) -> (Option<&str>, &str) {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let Some(rest) = text
        .strip_prefix(DELIMITER)
        .and_then(|r| r.strip_prefix("\r\n").or_else(|| r.strip_prefix('\n')))
    else {
        return (None, text);
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == DELIMITER {
            let body = &rest[offset + line.len()..];
            return (Some(&rest[..offset]), body);
        }
        offset += line.len();
    }
    (None, text)
}

/// Parses raw YAML; anything that is not a mapping yields no fields.
pub fn parse_front_matter(raw: &str) -> Result<FrontMatter, serde_yaml::Error> {
    let value: Value = serde_yaml::from_str(raw)?;
    let mut front = FrontMatter::default();
    let Value::Mapping(mapping) = value else {
        return Ok(front);
    };

    for (key, value) in mapping.iter() {
        let Some(name) = scalar_text(key) else {
            continue;
        };
        if name.eq_ignore_ascii_case("title") {
            front.title = scalar_text(value);
            continue;
        }
        if is_reserved(&name) {
            log::debug!("front matter key {} collides with a built-in detail", name);
            continue;
        }
        if let Some((format, value)) = infer(value) {
            front.fields.push(Field {
                name,
                format,
                value,
            });
        }
    }
    Ok(front)
}

fn is_reserved(name: &str) -> bool {
    [
        keys::ID,
        keys::NAME,
        keys::SOURCE,
        keys::IS_FAVORITE,
        keys::IS_ARCHIVED,
        keys::ICON_EMOJI,
        keys::ICON_IMAGE,
        keys::COVER_ID,
        keys::COVER_TYPE,
        keys::LAYOUT,
        keys::RELATION_KEY,
        keys::RELATION_FORMAT,
        keys::RELATION_OPTION_COLOR,
    ]
    .contains(&name)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Tagged(tagged) => scalar_text(&tagged.value),
        _ => None,
    }
}

fn infer(value: &Value) -> Option<(RelationFormat, DetailValue)> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some((RelationFormat::Checkbox, DetailValue::Bool(*b))),
        Value::Number(n) => n
            .as_f64()
            .map(|n| (RelationFormat::Number, DetailValue::Number(n))),
        Value::Sequence(items) => {
            let items: Vec<String> = items.iter().filter_map(scalar_text).collect();
            Some((RelationFormat::Tag, DetailValue::List(items)))
        }
        Value::String(s) => Some(infer_text(s)),
        Value::Tagged(tagged) => infer(&tagged.value),
        Value::Mapping(_) => serde_yaml::to_string(value)
            .ok()
            .map(|s| (RelationFormat::LongText, DetailValue::Text(s.trim_end().to_string()))),
    }
}

fn infer_text(s: &str) -> (RelationFormat, DetailValue) {
    if let Some(timestamp) = parse_date(s) {
        return (RelationFormat::Date, DetailValue::Number(timestamp as f64));
    }
    if ValidatedUrl::parse_web(s).is_ok() {
        return (RelationFormat::Url, DetailValue::text(s));
    }
    (RelationFormat::ShortText, DetailValue::text(s))
}

/// Unix seconds of an RFC 3339 timestamp or a bare `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp())
}
