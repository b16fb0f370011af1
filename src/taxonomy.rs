// Keyword taxonomy: user-defined categories of trigger words.
//
// Loaded once per run from a JSON object mapping category names to lists of
// trigger words, e.g. `{"Harassment": ["idiot", "loser"]}`. Categories keep
// the order they are declared in the file so repeated runs emit findings in
// the same sequence.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::pipeline::GENERAL_TOXICITY;

/// One category and its lowercased trigger words.
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub name: String,
    pub triggers: Vec<String>,
}

impl Category {
    /// True if any trigger is a substring of `lowered_text`.
    ///
    /// The caller lowercases the text once per post; triggers are stored
    /// lowercased at load time.
    pub fn matches(&self, lowered_text: &str) -> bool {
        self.triggers.iter().any(|t| lowered_text.contains(t.as_str()))
    }
}

/// Validated, immutable category → trigger-words mapping.
///
/// There is no way to construct an empty taxonomy: loading one fails with
/// `ConfigInvalid`, so "nothing configured" can never pass for "nothing flagged".
#[derive(Debug, Clone, PartialEq)]
pub struct Taxonomy {
    categories: Vec<Category>,
}

impl Taxonomy {
    /// Read and validate the keyword file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            Error::ConfigInvalid(format!(
                "cannot read keywords file {}: {e}",
                path.display()
            ))
        })?;
        let taxonomy = Self::from_json(&source).map_err(|e| match e {
            Error::ConfigInvalid(msg) => {
                Error::ConfigInvalid(format!("{}: {msg}", path.display()))
            }
            other => other,
        })?;

        info!(
            categories = taxonomy.len(),
            path = %path.display(),
            "Loaded keyword taxonomy"
        );
        Ok(taxonomy)
    }

    /// Parse a taxonomy from a JSON object of string → array of strings.
    pub fn from_json(source: &str) -> Result<Self> {
        let raw: RawTaxonomy = serde_json::from_str(source)
            .map_err(|e| Error::ConfigInvalid(format!("malformed keywords: {e}")))?;
        Self::from_entries(raw.0)
    }

    /// Build a taxonomy from (category, triggers) pairs, in declaration order.
    ///
    /// Category names and triggers are trimmed. Triggers are lowercased and
    /// deduplicated. Rejects an empty mapping, blank or duplicate category
    /// names, a category named like the classifier's own finding, blank
    /// triggers, and categories without triggers.
    pub fn from_entries<I, S, W>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Vec<W>)>,
        S: Into<String>,
        W: AsRef<str>,
    {
        let mut categories = Vec::new();
        let mut seen_names = HashSet::new();

        for (name, words) in entries {
            let name = name.into().trim().to_string();
            if name.is_empty() {
                return Err(Error::ConfigInvalid("category name is blank".into()));
            }
            if name.eq_ignore_ascii_case(GENERAL_TOXICITY) {
                return Err(Error::ConfigInvalid(format!(
                    "category \"{name}\" is reserved for classifier findings"
                )));
            }
            if !seen_names.insert(name.clone()) {
                return Err(Error::ConfigInvalid(format!(
                    "category \"{name}\" is defined more than once"
                )));
            }

            let mut triggers: Vec<String> = Vec::with_capacity(words.len());
            for word in &words {
                let word = word.as_ref().trim().to_lowercase();
                if word.is_empty() {
                    // A blank trigger would match every post.
                    return Err(Error::ConfigInvalid(format!(
                        "category \"{name}\" contains a blank trigger word"
                    )));
                }
                if !triggers.contains(&word) {
                    triggers.push(word);
                }
            }
            if triggers.is_empty() {
                return Err(Error::ConfigInvalid(format!(
                    "category \"{name}\" has no trigger words"
                )));
            }

            debug!(category = %name, triggers = triggers.len(), "Parsed category");
            categories.push(Category { name, triggers });
        }

        if categories.is_empty() {
            return Err(Error::ConfigInvalid("no keyword categories defined".into()));
        }

        Ok(Self { categories })
    }

    /// Categories in declaration order.
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    /// Always false for a loaded taxonomy; present for API completeness.
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Categories with at least one trigger found in `text` (case-insensitive),
    /// in declaration order.
    pub fn matching<'a>(&'a self, text: &str) -> impl Iterator<Item = &'a Category> + 'a {
        let lowered = text.to_lowercase();
        self.categories
            .iter()
            .filter(move |c| c.matches(&lowered))
    }
}

/// Order-preserving view of the JSON object; serde_json's own map type sorts keys.
struct RawTaxonomy(Vec<(String, Vec<String>)>);

impl<'de> Deserialize<'de> for RawTaxonomy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct RawVisitor;

        impl<'de> Visitor<'de> for RawVisitor {
            type Value = RawTaxonomy;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object mapping category names to arrays of trigger words")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((name, words)) = map.next_entry::<String, Vec<String>>()? {
                    entries.push((name, words));
                }
                Ok(RawTaxonomy(entries))
            }
        }

        deserializer.deserialize_map(RawVisitor)
    }
}
