use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use super::{EmbeddingModel, MatcherError};
use crate::brain::CharacteristicRecord;
use crate::pipeline::{CollaboratorError, StandardMatch, StandardsMatcher};

/// Pre-embedded standards sections searched by cosine similarity.
pub struct StandardsIndex {
    embedder: Arc<dyn EmbeddingModel>,
    keys: Vec<String>,
    embeddings: Vec<Vec<f32>>,
}

impl StandardsIndex {
    /// Embed `(key, text)` entries.
    pub fn build(
        embedder: Arc<dyn EmbeddingModel>,
        entries: &[(String, String)],
    ) -> Result<Self, MatcherError> {
        let texts: Vec<&str> = entries.iter().map(|(_, text)| text.as_str()).collect();
        let embeddings = embedder.embed_batch(&texts)?;
        let expected = embedder.dimension();
        if let Some(bad) = embeddings.iter().find(|e| e.len() != expected) {
            return Err(MatcherError::DimensionMismatch {
                expected,
                actual: bad.len(),
            });
        }

        tracing::info!(entries = entries.len(), dimension = expected, "Standards index built");
        Ok(Self {
            embedder,
            keys: entries.iter().map(|(key, _)| key.clone()).collect(),
            embeddings,
        })
    }

    /// Index characteristics by id, embedding name, category and usage text.
    pub fn from_characteristics(
        embedder: Arc<dyn EmbeddingModel>,
        records: &[CharacteristicRecord],
    ) -> Result<Self, MatcherError> {
        let entries: Vec<(String, String)> = records
            .iter()
            .map(|r| {
                let text = format!(
                    "{} {} {}",
                    r.name,
                    r.category,
                    r.when_to_use.as_deref().unwrap_or_default()
                );
                (r.id.clone(), text)
            })
            .collect();
        Self::build(embedder, &entries)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Top `top_k` sections for `query`, scores descending. Sections with no
    /// positive similarity are not matches and are left out.
    pub fn search(&self, query: &str, top_k: usize) -> Result<Vec<StandardMatch>, MatcherError> {
        if self.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let start = Instant::now();
        let query_embedding = self.embedder.embed(query)?;

        let mut scored: Vec<(f32, &String)> = self
            .embeddings
            .iter()
            .zip(&self.keys)
            .map(|(emb, key)| (cosine_similarity(&query_embedding, emb), key))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        let results: Vec<StandardMatch> = scored
            .into_iter()
            .filter(|(score, _)| *score > 0.0)
            .take(top_k)
            .map(|(score, key)| StandardMatch {
                key: key.clone(),
                score,
            })
            .collect();

        tracing::info!(
            query = %query.chars().take(60).collect::<String>(),
            top_score = results.first().map(|m| m.score).unwrap_or(0.0),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "match_standards"
        );
        Ok(results)
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

#[async_trait]
impl StandardsMatcher for StandardsIndex {
    async fn match_standards(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<StandardMatch>, CollaboratorError> {
        Ok(self.search(query, top_k)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::{list_characteristics, open_memory_database, seed_defaults};
    use crate::matcher::HashingEmbedder;

    fn seeded_index() -> StandardsIndex {
        let conn = open_memory_database().unwrap();
        seed_defaults(&conn).unwrap();
        let records = list_characteristics(&conn).unwrap();
        StandardsIndex::from_characteristics(Arc::new(HashingEmbedder::new()), &records).unwrap()
    }

    #[test]
    fn cosine_similarity_identical_vectors() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_similarity_orthogonal_vectors() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
    }

    #[test]
    fn cosine_similarity_length_mismatch_is_zero() {
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn index_covers_all_characteristics() {
        assert_eq!(seeded_index().len(), 14);
    }

    #[test]
    fn boss_perpendicularity_query_ranks_perpendicularity_first() {
        let index = seeded_index();
        let results = index
            .search("boss bearing_bore_concentric perpendicularity Perpendicularity", 5)
            .unwrap();
        assert!(results.len() <= 5);
        assert_eq!(results[0].key, "perpendicularity");
    }

    #[test]
    fn scores_are_descending_and_positive() {
        let results = seeded_index().search("hole position fasteners", 14).unwrap();
        assert!(!results.is_empty());
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
        assert!(results.iter().all(|m| m.score > 0.0));
    }

    #[test]
    fn top_k_larger_than_index_is_capped() {
        let results = seeded_index().search("flatness", 50).unwrap();
        assert!(!results.is_empty());
        assert!(results.len() <= 14);
    }

    #[test]
    fn query_without_content_words_matches_nothing() {
        assert!(seeded_index().search("the and of", 5).unwrap().is_empty());
    }

    #[test]
    fn non_positive_scores_are_dropped() {
        let entries = vec![
            ("flatness".to_string(), "flatness".to_string()),
            ("position".to_string(), "position".to_string()),
        ];
        let index = StandardsIndex::build(Arc::new(AxisEmbedder), &entries).unwrap();
        let results = index.search("flatness", 5).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].key, "flatness");
    }

    #[test]
    fn empty_index_returns_nothing() {
        let index = StandardsIndex::build(Arc::new(HashingEmbedder::new()), &[]).unwrap();
        assert!(index.search("flatness", 5).unwrap().is_empty());
    }

    /// Maps "flatness" to +x and anything else to -x.
    struct AxisEmbedder;

    impl EmbeddingModel for AxisEmbedder {
        fn embed(&self, text: &str) -> Result<Vec<f32>, MatcherError> {
            Ok(if text == "flatness" { vec![1.0, 0.0] } else { vec![-1.0, 0.0] })
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    struct ShortEmbedder;

    impl EmbeddingModel for ShortEmbedder {
        fn embed(&self, _text: &str) -> Result<Vec<f32>, MatcherError> {
            Ok(vec![1.0])
        }

        fn dimension(&self) -> usize {
            4
        }
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let entries = vec![("flatness".to_string(), "Flatness".to_string())];
        let err = StandardsIndex::build(Arc::new(ShortEmbedder), &entries)
            .err()
            .unwrap();
        assert!(matches!(err, MatcherError::DimensionMismatch { expected: 4, actual: 1 }));
    }

    #[tokio::test]
    async fn implements_standards_matcher() {
        let index = seeded_index();
        let results = index.match_standards("flatness sealing face", 3).await.unwrap();
        assert!(!results.is_empty() && results.len() <= 3);
        assert_eq!(results[0].key, "flatness");
    }
}
