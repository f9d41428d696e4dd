// src/model/details.rs
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Well-known detail keys shared by every converter.
pub mod keys {
    pub const ID: &str = "id";
    pub const NAME: &str = "name";
    pub const DESCRIPTION: &str = "description";
    pub const SOURCE: &str = "source";
    pub const IS_FAVORITE: &str = "isFavorite";
    pub const IS_ARCHIVED: &str = "isArchived";
    pub const ICON_EMOJI: &str = "iconEmoji";
    pub const ICON_IMAGE: &str = "iconImage";
    pub const COVER_ID: &str = "coverId";
    pub const COVER_TYPE: &str = "coverType";
    pub const CREATED_DATE: &str = "createdDate";
    pub const LAST_MODIFIED_DATE: &str = "lastModifiedDate";
    pub const LAYOUT: &str = "layout";
    pub const RELATION_KEY: &str = "relationKey";
    pub const RELATION_FORMAT: &str = "relationFormat";
    pub const RELATION_OPTION_COLOR: &str = "relationOptionColor";
}

/// Cover kinds recorded in the `coverType` detail.
pub const COVER_TYPE_IMAGE: f64 = 1.0;

/// A single detail value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DetailValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<String>),
}

impl DetailValue {
    pub fn text(value: impl Into<String>) -> Self {
        DetailValue::Text(value.into())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DetailValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            DetailValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Text values of either a single string or a list.
    pub fn values(&self) -> Vec<String> {
        match self {
            DetailValue::Text(s) => vec![s.clone()],
            DetailValue::List(items) => items.clone(),
            _ => Vec::new(),
        }
    }
}

impl From<bool> for DetailValue {
    fn from(v: bool) -> Self {
        DetailValue::Bool(v)
    }
}

impl From<f64> for DetailValue {
    fn from(v: f64) -> Self {
        DetailValue::Number(v)
    }
}

impl From<String> for DetailValue {
    fn from(v: String) -> Self {
        DetailValue::Text(v)
    }
}

impl From<&str> for DetailValue {
    fn from(v: &str) -> Self {
        DetailValue::Text(v.to_string())
    }
}

impl From<Vec<String>> for DetailValue {
    fn from(v: Vec<String>) -> Self {
        DetailValue::List(v)
    }
}

/// Insertion-ordered key/value attributes of one object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Details(IndexMap<String, DetailValue>);

impl Details {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<DetailValue>) -> &mut Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&DetailValue> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(DetailValue::as_str)
    }

    pub fn remove(&mut self, key: &str) -> Option<DetailValue> {
        self.0.shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Moves a value to a new key, keeping it when both keys are equal.
    pub fn rename(&mut self, from: &str, to: &str) {
        if from == to {
            return;
        }
        if let Some(value) = self.0.shift_remove(from) {
            self.0.insert(to.to_string(), value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &DetailValue)> {
        self.0.iter()
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut DetailValue> {
        self.0.values_mut()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn name(&self) -> Option<&str> {
        self.get_str(keys::NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rename_moves_and_keeps_order() {
        let mut details = Details::new();
        details.set("a", 1.0).set("Status", "Done").set("c", true);
        details.rename("Status", "key1");
        assert!(!details.contains_key("Status"));
        assert_eq!(details.get_str("key1"), Some("Done"));

        details.rename("key1", "key1");
        assert_eq!(details.get_str("key1"), Some("Done"));
    }

    #[test]
    fn serializes_untagged() {
        let mut details = Details::new();
        details
            .set("name", "Page")
            .set("tags", vec!["a".to_string()]);
        let json = serde_json::to_string(&details).unwrap();
        assert_eq!(json, r#"{"name":"Page","tags":["a"]}"#);
    }
}
