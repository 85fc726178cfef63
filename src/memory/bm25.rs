//! BM25 ranking over a memory corpus.
//!
//! [`Bm25Engine`] is derived wholesale from a [`MemoryEntry`] collection and
//! rebuilt whenever the corpus changes — it is disposable, never a source of
//! truth. Rebuild-on-change keeps the statistics trivially consistent, which
//! is the right trade at corpus sizes of hundreds of entries.
//!
//! The tokenizer is shared between indexing ([`extract_keywords`], run when
//! a memory is stored) and querying, so both sides agree on term identity.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use unicode_normalization::UnicodeNormalization;

use super::types::MemoryEntry;

/// Term-frequency saturation.
const BM25_K1: f64 = 1.5;
/// Document length normalization.
const BM25_B: f64 = 0.75;

/// Default result cap for a search.
pub const DEFAULT_LIMIT: usize = 5;
/// Scores below this are treated as noise and dropped.
pub const DEFAULT_MIN_SCORE: f64 = 0.5;

/// Bilingual (Vietnamese + English) stopword set. Tokens in this set carry
/// no retrieval signal and are dropped by the tokenizer.
static STOPWORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        // Vietnamese
        "và", "là", "của", "có", "được", "cho", "này", "đó", "với", "trong",
        "từ", "để", "theo", "khi", "nếu", "nhưng", "như", "vì", "do", "bởi",
        "tôi", "bạn", "anh", "chị", "em", "nó", "họ", "chúng", "ta", "mình",
        "một", "các", "những", "cái", "con", "người", "việc", "điều", "chuyện",
        "đã", "đang", "sẽ", "rồi", "rất", "lắm", "quá", "thì", "mà", "hay",
        "cũng", "còn", "nữa", "lại", "ra", "vào", "lên", "xuống", "về",
        // English
        "the", "a", "an", "is", "are", "was", "were", "be", "been", "being",
        "have", "has", "had", "do", "does", "did", "will", "would", "could",
        "should", "may", "might", "must", "shall", "can", "need", "dare",
        "to", "of", "in", "for", "on", "with", "at", "by", "from", "as",
        "i", "you", "he", "she", "it", "we", "they", "me", "him", "her", "us",
        "my", "your", "his", "its", "our", "their", "this", "that", "these",
        "and", "or", "but", "if", "then", "else", "when", "where", "why", "how",
    ]
    .into_iter()
    .collect()
});

/// Tokenize text for indexing or querying.
///
/// Lowercases, normalizes to NFC (merging decomposed diacritic variants, so
/// Vietnamese text tokenizes consistently regardless of input encoding),
/// strips punctuation, splits on whitespace, and drops single-char tokens
/// and stopwords.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .nfc()
        .collect::<String>()
        .split(|c: char| c.is_whitespace() || is_punctuation(c))
        .filter(|w| w.chars().count() > 1 && !STOPWORDS.contains(w))
        .map(str::to_string)
        .collect()
}

fn is_punctuation(c: char) -> bool {
    matches!(
        c,
        '.' | ',' | '!' | '?' | ';' | ':' | '(' | ')' | '[' | ']' | '{' | '}'
            | '"' | '\'' | '“' | '”' | '‘' | '’'
    )
}

/// Derive the keyword list stored on a new memory: tokenized content with
/// duplicates removed, first occurrence order preserved.
pub fn extract_keywords(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    tokenize(content)
        .into_iter()
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// BM25 scorer for one memory corpus.
pub struct Bm25Engine {
    memories: Vec<MemoryEntry>,
    avg_doc_len: f64,
    doc_frequency: HashMap<String, usize>,
}

impl Bm25Engine {
    /// Build the engine, computing corpus statistics in full.
    pub fn new(memories: Vec<MemoryEntry>) -> Self {
        let mut engine = Self {
            memories: Vec::new(),
            avg_doc_len: 0.0,
            doc_frequency: HashMap::new(),
        };
        engine.set_memories(memories);
        engine
    }

    /// Replace the corpus and recompute average document length and per-term
    /// document frequencies.
    pub fn set_memories(&mut self, memories: Vec<MemoryEntry>) {
        self.memories = memories;
        self.doc_frequency.clear();

        if self.memories.is_empty() {
            self.avg_doc_len = 0.0;
            return;
        }

        let total_len: usize = self.memories.iter().map(|m| m.keywords.len()).sum();
        self.avg_doc_len = total_len as f64 / self.memories.len() as f64;

        for memory in &self.memories {
            let unique: HashSet<&String> = memory.keywords.iter().collect();
            for term in unique {
                *self.doc_frequency.entry(term.clone()).or_insert(0) += 1;
            }
        }
    }

    /// Smoothed BM25 inverse document frequency.
    fn idf(&self, term: &str) -> f64 {
        let n = self.memories.len() as f64;
        let df = self.doc_frequency.get(term).copied().unwrap_or(0) as f64;
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }

    /// Score one memory against the query terms. The BM25 sum is modulated
    /// (not overridden) by the memory's importance: `0.5 + 0.5 * importance`.
    fn score(&self, memory: &MemoryEntry, query_terms: &[String]) -> f64 {
        let doc_len = memory.keywords.len() as f64;
        let mut score = 0.0;

        for term in query_terms {
            let tf = memory.keywords.iter().filter(|k| *k == term).count() as f64;
            if tf == 0.0 {
                continue;
            }
            let numerator = tf * (BM25_K1 + 1.0);
            let denominator =
                tf + BM25_K1 * (1.0 - BM25_B + BM25_B * (doc_len / self.avg_doc_len));
            score += self.idf(term) * (numerator / denominator);
        }

        score * (0.5 + 0.5 * memory.importance)
    }

    /// Rank the corpus against `query`. Scores below `min_score` are dropped;
    /// the rest are returned best-first, at most `limit` entries.
    ///
    /// An empty corpus or a query that tokenizes to nothing returns empty
    /// without scoring.
    pub fn search(&self, query: &str, limit: usize, min_score: f64) -> Vec<MemoryEntry> {
        if self.memories.is_empty() {
            return Vec::new();
        }
        let query_terms = tokenize(query);
        if query_terms.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(&MemoryEntry, f64)> = self
            .memories
            .iter()
            .map(|m| (m, self.score(m, &query_terms)))
            .filter(|(_, score)| *score >= min_score)
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored
            .into_iter()
            .take(limit)
            .map(|(m, _)| m.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::types::MemoryType;

    fn memory(id: &str, content: &str, keywords: &[&str], importance: f64) -> MemoryEntry {
        MemoryEntry {
            id: id.to_string(),
            content: content.to_string(),
            memory_type: MemoryType::Fact,
            importance,
            source_message_id: "m1".to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            created_at: "2026-08-30T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn tokenize_drops_stopwords_and_short_tokens() {
        let tokens = tokenize("The user is a fan of strong coffee, và trà!");
        assert_eq!(tokens, vec!["user", "fan", "strong", "coffee", "trà"]);
    }

    #[test]
    fn tokenize_merges_diacritic_variants() {
        // "Hà" written composed vs. decomposed must produce the same token.
        let composed = tokenize("H\u{e0} Nội");
        let decomposed = tokenize("Ha\u{300} Nội");
        assert_eq!(composed, decomposed);
    }

    #[test]
    fn extract_keywords_dedupes_preserving_order() {
        let keywords = extract_keywords("coffee coffee milk coffee milk sugar");
        assert_eq!(keywords, vec!["coffee", "milk", "sugar"]);
    }

    #[test]
    fn empty_corpus_returns_empty() {
        let engine = Bm25Engine::new(Vec::new());
        assert!(engine.search("anything", 5, 0.0).is_empty());
    }

    #[test]
    fn empty_query_returns_empty() {
        let engine = Bm25Engine::new(vec![memory("a", "coffee", &["coffee"], 1.0)]);
        assert!(engine.search("", 5, 0.0).is_empty());
        // all-stopword query tokenizes to nothing
        assert!(engine.search("the a is of", 5, 0.0).is_empty());
    }

    #[test]
    fn higher_term_frequency_scores_higher() {
        let engine = Bm25Engine::new(vec![
            memory("once", "dragon", &["dragon", "cave", "gold"], 0.5),
            memory("twice", "dragon dragon", &["dragon", "dragon", "gold"], 0.5),
        ]);
        let results = engine.search("dragon", 5, 0.0);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "twice");
    }

    #[test]
    fn importance_breaks_ties_strictly() {
        let engine = Bm25Engine::new(vec![
            memory("low", "dragon", &["dragon", "cave"], 0.2),
            memory("high", "dragon", &["dragon", "cave"], 0.9),
        ]);
        let results = engine.search("dragon", 5, 0.0);
        assert_eq!(results[0].id, "high");
        assert_eq!(results[1].id, "low");
    }

    #[test]
    fn min_score_filters_weak_matches() {
        // A strong name match must surface; the unrelated entry must fall
        // below the default threshold.
        let engine = Bm25Engine::new(vec![
            memory("name", "User's name is Lan", &["lan", "name"], 0.9),
            memory("coffee", "User likes coffee", &["likes", "coffee"], 0.3),
        ]);
        let results = engine.search("Lan", DEFAULT_LIMIT, DEFAULT_MIN_SCORE);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "name");
    }

    #[test]
    fn limit_caps_results() {
        let memories: Vec<MemoryEntry> = (0..10)
            .map(|i| memory(&format!("m{i}"), "dragon", &["dragon"], 1.0))
            .collect();
        let engine = Bm25Engine::new(memories);
        assert_eq!(engine.search("dragon", 3, 0.0).len(), 3);
    }

    #[test]
    fn rebuild_reflects_corpus_changes() {
        let mut engine = Bm25Engine::new(vec![memory("a", "coffee", &["coffee"], 1.0)]);
        assert_eq!(engine.search("coffee", 5, 0.0).len(), 1);

        engine.set_memories(Vec::new());
        assert!(engine.search("coffee", 5, 0.0).is_empty());
    }
}
