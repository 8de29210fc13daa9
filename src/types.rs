//! Catalog record types as they appear in dump JSON payloads

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};

/// Reference to another catalog entity, e.g. `{"key": "/authors/OL1A"}`
///
/// Work records wrap their author references in a role object
/// (`{"author": {"key": "/authors/OL1A"}, "type": {...}}`). Both shapes
/// deserialize to the same reference; anything else yields an empty key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ReferenceRepr")]
pub struct Reference {
    pub key: String,
}

impl Reference {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

#[derive(Deserialize)]
struct KeyOnly {
    key: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ReferenceRepr {
    Direct(KeyOnly),
    Role { author: KeyOnly },
    Other(IgnoredAny),
}

impl From<ReferenceRepr> for Reference {
    fn from(repr: ReferenceRepr) -> Self {
        match repr {
            ReferenceRepr::Direct(r) | ReferenceRepr::Role { author: r } => Reference { key: r.key },
            ReferenceRepr::Other(_) => Reference { key: String::new() },
        }
    }
}

/// Free-form text field: a plain string or a typed `{"type", "value"}` object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextBlock {
    Plain(String),
    Typed {
        #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
        kind: Option<String>,
        value: String,
    },
    /// Any other shape; kept verbatim, reads as empty text
    Other(serde_json::Value),
}

impl TextBlock {
    /// Plain text content of the block
    pub fn as_text(&self) -> &str {
        match self {
            TextBlock::Plain(text) => text,
            TextBlock::Typed { value, .. } => value,
            TextBlock::Other(_) => "",
        }
    }
}

/// Extract plain text from an optional description or bio field.
///
/// This is the one place callers should go through to read these fields.
pub fn text_of(block: Option<&TextBlock>) -> &str {
    block.map(TextBlock::as_text).unwrap_or("")
}

/// Read an explicit `null` as the field's default, the same as a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// List field where both the list and its elements may be `null`.
/// Null elements are dropped.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let items = Option::<Vec<Option<T>>>::deserialize(deserializer)?;
    Ok(items.into_iter().flatten().flatten().collect())
}

/// One published manifestation of a work
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Edition {
    #[serde(deserialize_with = "null_as_default")]
    pub key: String,
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "lenient_list", skip_serializing_if = "Vec::is_empty")]
    pub isbn_10: Vec<String>,
    #[serde(deserialize_with = "lenient_list", skip_serializing_if = "Vec::is_empty")]
    pub isbn_13: Vec<String>,
    #[serde(deserialize_with = "lenient_list", skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<Reference>,
    #[serde(deserialize_with = "lenient_list", skip_serializing_if = "Vec::is_empty")]
    pub publishers: Vec<String>,
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "String::is_empty")]
    pub publish_date: String,
    #[serde(deserialize_with = "lenient_list", skip_serializing_if = "Vec::is_empty")]
    pub covers: Vec<i64>,
    #[serde(deserialize_with = "lenient_list", skip_serializing_if = "Vec::is_empty")]
    pub languages: Vec<Reference>,
    #[serde(deserialize_with = "lenient_list", skip_serializing_if = "Vec::is_empty")]
    pub works: Vec<Reference>,
    #[serde(deserialize_with = "lenient_list", skip_serializing_if = "Vec::is_empty")]
    pub subjects: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<TextBlock>,
}

impl Edition {
    /// Edition-shaped view of a work, used for title search results.
    ///
    /// Carries the work's key, title, authors and covers, and references the
    /// work itself.
    pub fn from_work(work: &Work) -> Self {
        Self {
            key: work.key.clone(),
            title: work.title.clone(),
            authors: work.authors.clone(),
            covers: work.covers.clone(),
            works: vec![Reference::new(&work.key)],
            ..Default::default()
        }
    }

    pub fn description_text(&self) -> &str {
        text_of(self.description.as_ref())
    }
}

/// An abstract creative work
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Work {
    #[serde(deserialize_with = "null_as_default")]
    pub key: String,
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "lenient_list", skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<Reference>,
    #[serde(deserialize_with = "lenient_list", skip_serializing_if = "Vec::is_empty")]
    pub subjects: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<TextBlock>,
    #[serde(deserialize_with = "lenient_list", skip_serializing_if = "Vec::is_empty")]
    pub covers: Vec<i64>,
}

impl Work {
    pub fn description_text(&self) -> &str {
        text_of(self.description.as_ref())
    }
}

/// A person credited on works and editions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Author {
    #[serde(deserialize_with = "null_as_default")]
    pub key: String,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "String::is_empty")]
    pub birth_date: String,
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "String::is_empty")]
    pub death_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<TextBlock>,
    /// External identifiers (VIAF, Wikidata, ...), kept as an opaque blob
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_ids: Option<serde_json::Value>,
}

impl Author {
    pub fn bio_text(&self) -> &str {
        text_of(self.bio.as_ref())
    }
}
