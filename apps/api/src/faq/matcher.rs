//! Keyword FAQ matcher.
//!
//! Scoring is plain substring containment on the lower-cased input: no
//! tokenisation, stemming or punctuation stripping. A keyword such as "pdf"
//! therefore also matches inside "pdfs", and "how" matches inside "showcase".

use crate::faq::knowledge_base::{FaqEntry, FALLBACK_ANSWER};

/// Number of the entry's keywords contained in `input`. `input` must already be lower-cased.
pub fn keyword_score(input: &str, entry: &FaqEntry) -> usize {
    entry
        .keywords
        .iter()
        .filter(|kw| input.contains(*kw))
        .count()
}

/// Returns the highest scoring entry with its score, or `None` when nothing matched.
///
/// Only a strictly greater score replaces the current best, so among equal
/// scores the entry that comes first in `knowledge_base` wins.
pub fn best_match<'a>(text: &str, knowledge_base: &'a [FaqEntry]) -> Option<(&'a FaqEntry, usize)> {
    let input = text.to_lowercase();
    let mut best: Option<(&FaqEntry, usize)> = None;
    let mut max_score = 0;

    for entry in knowledge_base {
        let score = keyword_score(&input, entry);
        if score > max_score {
            max_score = score;
            best = Some((entry, score));
        }
    }

    best
}

/// Answers free text from the knowledge base, falling back to a topic list.
pub fn answer<'a>(text: &str, knowledge_base: &'a [FaqEntry]) -> &'a str {
    match best_match(text, knowledge_base) {
        Some((entry, _)) => entry.answer,
        None => FALLBACK_ANSWER,
    }
}
