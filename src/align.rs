//! Similarity alignment between two runs' factor lists.
//!
//! For every previous-run factor, [`align`] picks the current-run factor
//! with the highest cosine similarity at or above a threshold. This is a
//! greedy one-sided best match: one new factor may be the best match for
//! several old factors. The result is only a hint for the comparison
//! prompt, never a constraint on the model's classification.

use anyhow::Result;
use serde::Serialize;

use crate::embedding::{cosine_similarity, EmbeddingProvider};

/// Default minimum similarity for a pair to be reported.
pub const DEFAULT_THRESHOLD: f32 = 0.8;

/// An old factor and its best-matching new factor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignedPair {
    pub old_text: String,
    pub new_text: String,
    pub similarity: f32,
}

/// Align `old_texts` against `new_texts` using `provider` embeddings.
///
/// Returns an empty alignment when either list is empty or no provider is
/// available. Each list is embedded with a single batched call. Output
/// order follows `old_texts`; old factors without a candidate at or above
/// `threshold` are omitted.
pub async fn align(
    provider: Option<&dyn EmbeddingProvider>,
    old_texts: &[String],
    new_texts: &[String],
    threshold: f32,
) -> Result<Vec<AlignedPair>> {
    let provider = match provider {
        Some(p) => p,
        None => return Ok(Vec::new()),
    };
    if old_texts.is_empty() || new_texts.is_empty() {
        return Ok(Vec::new());
    }

    let old_vecs = provider.embed(old_texts).await?;
    let new_vecs = provider.embed(new_texts).await?;

    if old_vecs.len() != old_texts.len() || new_vecs.len() != new_texts.len() {
        anyhow::bail!(
            "embedding provider '{}' returned {} + {} vectors for {} + {} texts",
            provider.model_name(),
            old_vecs.len(),
            new_vecs.len(),
            old_texts.len(),
            new_texts.len()
        );
    }

    Ok(best_matches(
        old_texts, &old_vecs, new_texts, &new_vecs, threshold,
    ))
}

/// Pick, for each old vector, the strictly best new vector at or above
/// `threshold`. Ties keep the earliest new index.
pub fn best_matches(
    old_texts: &[String],
    old_vecs: &[Vec<f32>],
    new_texts: &[String],
    new_vecs: &[Vec<f32>],
    threshold: f32,
) -> Vec<AlignedPair> {
    let mut pairs = Vec::new();

    for (old_text, old_vec) in old_texts.iter().zip(old_vecs) {
        let mut best: Option<(usize, f32)> = None;

        for (j, new_vec) in new_vecs.iter().enumerate() {
            let score = cosine_similarity(old_vec, new_vec);
            if score.is_nan() || score < threshold {
                continue;
            }
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((j, score)),
            }
        }

        if let Some((j, similarity)) = best {
            pairs.push(AlignedPair {
                old_text: old_text.clone(),
                new_text: new_texts[j].clone(),
                similarity,
            });
        }
    }

    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// Looks vectors up by text; unknown texts embed to the zero vector.
    struct TableEmbedder {
        table: HashMap<String, Vec<f32>>,
    }

    impl TableEmbedder {
        fn new(entries: &[(&str, [f32; 2])]) -> Self {
            Self {
                table: entries
                    .iter()
                    .map(|(t, v)| (t.to_string(), v.to_vec()))
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for TableEmbedder {
        fn model_name(&self) -> &str {
            "table"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| self.table.get(t).cloned().unwrap_or_else(|| vec![0.0, 0.0]))
                .collect())
        }
    }

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn empty_inputs_give_empty_alignment() {
        let embedder = TableEmbedder::new(&[("a", [1.0, 0.0])]);
        let provider: &dyn EmbeddingProvider = &embedder;
        let some = strings(&["a"]);
        assert!(align(Some(provider), &[], &some, 0.8).await.unwrap().is_empty());
        assert!(align(Some(provider), &some, &[], 0.8).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_provider_gives_empty_alignment() {
        let texts = strings(&["a", "b"]);
        assert!(align(None, &texts, &texts, 0.8).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn picks_best_match_above_threshold() {
        let embedder = TableEmbedder::new(&[
            ("strong brand", [1.0, 0.0]),
            ("slow delivery", [0.0, 1.0]),
            ("recognised brand", [0.95, 0.05]),
            ("unrelated", [-1.0, 0.2]),
        ]);
        let old = strings(&["strong brand", "slow delivery"]);
        let new = strings(&["unrelated", "recognised brand"]);

        let provider: &dyn EmbeddingProvider = &embedder;
        let pairs = align(Some(provider), &old, &new, 0.8).await.unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].old_text, "strong brand");
        assert_eq!(pairs[0].new_text, "recognised brand");
        assert!(pairs[0].similarity >= 0.8);
    }

    #[test]
    fn nan_scores_never_pass_the_threshold() {
        let old = strings(&["a"]);
        let new = strings(&["b"]);
        let pairs = best_matches(&old, &[vec![f32::NAN, 1.0]], &new, &[vec![1.0, 0.0]], 0.8);
        assert!(pairs.is_empty());

        let new = strings(&["real", "broken"]);
        let pairs = best_matches(
            &old,
            &[vec![1.0, 0.0]],
            &new,
            &[vec![1.0, 0.0], vec![f32::NAN, 0.0]],
            0.8,
        );
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].new_text, "real");
        assert!(pairs[0].similarity >= 0.8);
    }

    #[test]
    fn ties_resolve_to_earliest_new_index() {
        let old = strings(&["x"]);
        let new = strings(&["first", "second"]);
        let pairs = best_matches(
            &old,
            &[vec![1.0, 0.0]],
            &new,
            &[vec![1.0, 0.0], vec![2.0, 0.0]],
            0.8,
        );
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].new_text, "first");
    }

    #[test]
    fn same_new_item_may_match_several_old_items() {
        let old = strings(&["a", "b", "c"]);
        let new = strings(&["n"]);
        let pairs = best_matches(
            &old,
            &[vec![1.0, 0.0], vec![0.9, 0.1], vec![0.0, 1.0]],
            &new,
            &[vec![1.0, 0.0]],
            0.8,
        );
        let olds: Vec<&str> = pairs.iter().map(|p| p.old_text.as_str()).collect();
        assert_eq!(olds, vec!["a", "b"]);
        assert!(pairs.iter().all(|p| p.new_text == "n"));
    }

    #[test]
    fn output_bounded_and_above_threshold() {
        let old = strings(&["a", "b", "c", "d"]);
        let new = strings(&["p", "q"]);
        let old_vecs = vec![
            vec![1.0, 0.0],
            vec![0.7, 0.7],
            vec![0.0, 1.0],
            vec![-1.0, 0.0],
        ];
        let new_vecs = vec![vec![1.0, 0.1], vec![0.1, 1.0]];
        let pairs = best_matches(&old, &old_vecs, &new, &new_vecs, 0.8);
        assert!(pairs.len() <= old.len());
        assert!(pairs.iter().all(|p| p.similarity >= 0.8));
        // Order follows the old list.
        let olds: Vec<&str> = pairs.iter().map(|p| p.old_text.as_str()).collect();
        assert_eq!(olds, vec!["a", "c"]);
    }

    #[test]
    fn zero_norm_similarity_is_zero() {
        let old = strings(&["a"]);
        let new = strings(&["b"]);
        let pairs = best_matches(&old, &[vec![0.0, 0.0]], &new, &[vec![0.0, 0.0]], 0.0);
        // Similarity falls back to 0.0, which still clears a zero threshold.
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].similarity, 0.0);

        let pairs = best_matches(&old, &[vec![0.0, 0.0]], &new, &[vec![0.0, 0.0]], 0.8);
        assert!(pairs.is_empty());
    }
}
