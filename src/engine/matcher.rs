//! Locating what a query is about.
//!
//! Lookup runs in fixed priority order and stops at the first hit:
//!
//! 1. entry name contained in the query
//! 2. brand name (alias) contained in the query
//! 3. category name contained in the query, narrowed to a subcategory when
//!    one of its subcategory names or example drugs is also contained
//! 4. subcategory name / example drug contained, across all categories
//! 5. closest category or subcategory name by edit-distance ratio, at or
//!    above [`FUZZY_CUTOFF`]
//!
//! Similarity is only computed against category and subcategory names,
//! never against individual entry names.
//!
//! All comparisons expect a query already passed through
//! [`normalize`](super::normalize::normalize).

use crate::knowledge::{Category, Entry, KnowledgeStore, Subcategory};

use super::intent::IntentField;
use super::normalize::normalize;

/// Minimum similarity (inclusive) for an approximate match.
pub const FUZZY_CUTOFF: f64 = 0.5;

/// How a [`MatchResult`] was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchVia {
    Name,
    Alias,
    Category,
    Subcategory,
    Fuzzy,
}

impl MatchVia {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchVia::Name => "name",
            MatchVia::Alias => "alias",
            MatchVia::Category => "category",
            MatchVia::Subcategory => "subcategory",
            MatchVia::Fuzzy => "fuzzy",
        }
    }
}

/// Outcome of a lookup. Borrowed from the store snapshot it was run against.
///
/// `entry` is set only for name/alias hits. A category-level hit leaves it
/// `None` and fills `category` (and `subcategory` when narrowed). When all
/// three are `None` nothing matched.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MatchResult<'a> {
    pub entry: Option<&'a Entry>,
    pub category: Option<&'a Category>,
    pub subcategory: Option<&'a Subcategory>,
    pub matched_via: Option<MatchVia>,
    pub intent: IntentField,
}

impl<'a> MatchResult<'a> {
    fn entry(category: &'a Category, entry: &'a Entry, via: MatchVia) -> Self {
        Self {
            entry: Some(entry),
            category: Some(category),
            matched_via: Some(via),
            ..Self::default()
        }
    }

    fn category(category: &'a Category, via: MatchVia) -> Self {
        Self { category: Some(category), matched_via: Some(via), ..Self::default() }
    }

    fn subcategory(category: &'a Category, subcategory: &'a Subcategory, via: MatchVia) -> Self {
        Self {
            category: Some(category),
            subcategory: Some(subcategory),
            matched_via: Some(via),
            ..Self::default()
        }
    }

    pub fn with_intent(self, intent: IntentField) -> Self {
        Self { intent, ..self }
    }

    /// `true` when nothing in the store matched.
    pub fn is_none(&self) -> bool {
        self.matched_via.is_none()
    }
}

/// Find the entry, subcategory or category referenced by `query`.
pub fn find<'a>(store: &'a KnowledgeStore, query: &str) -> MatchResult<'a> {
    by_name(store, query)
        .or_else(|| by_alias(store, query))
        .or_else(|| by_category(store, query))
        .or_else(|| by_similarity(store, query))
        .unwrap_or_default()
}

/// Edit-distance ratio in `[0, 1]`; `1.0` for identical strings.
pub fn similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b)
}

fn contains_term(query: &str, term: &str) -> bool {
    let term = normalize(term);
    !term.is_empty() && query.contains(&term)
}

fn by_name<'a>(store: &'a KnowledgeStore, query: &str) -> Option<MatchResult<'a>> {
    store
        .entries()
        .find(|(_, e)| contains_term(query, &e.name))
        .map(|(c, e)| MatchResult::entry(c, e, MatchVia::Name))
}

fn by_alias<'a>(store: &'a KnowledgeStore, query: &str) -> Option<MatchResult<'a>> {
    store
        .entries()
        .find(|(_, e)| e.aliases.iter().any(|a| contains_term(query, a)))
        .map(|(c, e)| MatchResult::entry(c, e, MatchVia::Alias))
}

fn by_category<'a>(store: &'a KnowledgeStore, query: &str) -> Option<MatchResult<'a>> {
    let named = store
        .categories()
        .iter()
        .find(|c| contains_term(query, &c.name));

    match named {
        Some(category) => {
            if let Some(sub) = subcategory_in(category, query) {
                return Some(MatchResult::subcategory(category, sub, MatchVia::Subcategory));
            }
            let subs = category.subcategories.iter().map(|s| (normalize(&s.name), s));
            if let Some(sub) = closest(query, subs) {
                return Some(MatchResult::subcategory(category, sub, MatchVia::Fuzzy));
            }
            Some(MatchResult::category(category, MatchVia::Category))
        }
        None => store.categories().iter().find_map(|c| {
            subcategory_in(c, query).map(|s| MatchResult::subcategory(c, s, MatchVia::Subcategory))
        }),
    }
}

/// Subcategory whose name, or failing that one of whose example drugs,
/// appears in the query.
fn subcategory_in<'a>(category: &'a Category, query: &str) -> Option<&'a Subcategory> {
    category
        .subcategories
        .iter()
        .find(|s| contains_term(query, &s.name))
        .or_else(|| {
            category
                .subcategories
                .iter()
                .find(|s| s.examples.iter().any(|x| contains_term(query, x)))
        })
}

enum Candidate<'a> {
    Category(&'a Category),
    Subcategory(&'a Category, &'a Subcategory),
}

fn by_similarity<'a>(store: &'a KnowledgeStore, query: &str) -> Option<MatchResult<'a>> {
    let candidates = store.categories().iter().flat_map(|c| {
        std::iter::once((normalize(&c.name), Candidate::Category(c))).chain(
            c.subcategories
                .iter()
                .map(move |s| (normalize(&s.name), Candidate::Subcategory(c, s))),
        )
    });

    closest(query, candidates).map(|candidate| match candidate {
        Candidate::Category(c) => MatchResult::category(c, MatchVia::Fuzzy),
        Candidate::Subcategory(c, s) => MatchResult::subcategory(c, s, MatchVia::Fuzzy),
    })
}

/// Highest-scoring candidate at or above the cutoff; the earlier one wins a tie.
fn closest<T>(query: &str, candidates: impl IntoIterator<Item = (String, T)>) -> Option<T> {
    let mut best: Option<(f64, T)> = None;
    for (name, item) in candidates {
        let score = similarity(query, &name);
        if score >= FUZZY_CUTOFF && best.as_ref().is_none_or(|(top, _)| score > *top) {
            best = Some((score, item));
        }
    }
    best.map(|(_, item)| item)
}
