//! Taxonomy indexing (tags, categories, and any configured extras)

use indexmap::IndexMap;

use super::Document;

/// One term of a taxonomy, e.g. the tag "rust"
#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    /// Display name (first spelling seen)
    pub name: String,
    pub slug: String,
    /// Positions in the document sequence the taxonomy was built from,
    /// in that sequence's order
    pub documents: Vec<usize>,
}

/// A taxonomy and its terms, sorted by name
#[derive(Debug, Clone, PartialEq)]
pub struct Taxonomy {
    pub singular: String,
    pub plural: String,
    pub terms: Vec<Term>,
}

impl Taxonomy {
    /// Build a taxonomy from documents already in listing order.
    ///
    /// Terms that slugify to the same value ("Rust", "rust") are merged.
    /// Terms with an empty slug are dropped.
    pub fn build<'d, I>(singular: &str, plural: &str, documents: I) -> Self
    where
        I: IntoIterator<Item = &'d Document>,
    {
        let mut terms: IndexMap<String, Term> = IndexMap::new();

        for (index, doc) in documents.into_iter().enumerate() {
            for name in doc.terms(plural) {
                let slug = slug::slugify(name);
                if slug.is_empty() {
                    continue;
                }
                let term = terms.entry(slug.clone()).or_insert_with(|| Term {
                    name: name.clone(),
                    slug,
                    documents: Vec::new(),
                });
                if term.documents.last() != Some(&index) {
                    term.documents.push(index);
                }
            }
        }

        let mut terms: Vec<Term> = terms.into_values().collect();
        terms.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.slug.cmp(&b.slug))
        });

        Self {
            singular: singular.to_string(),
            plural: plural.to_string(),
            terms,
        }
    }
}
