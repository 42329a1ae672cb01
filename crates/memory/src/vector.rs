//! Vector similarity ranking.
//!
//! Backends keep embeddings next to each memory and rank in Rust; there is
//! no ANN index, scopes are small (one wedding's history).

use sanskara_core::memory::MemoryEntry;

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal, -1 = opposite.
/// Returns 0.0 if the lengths differ or either vector is empty or all zeros.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (dot, norm_a, norm_b) = a.iter().zip(b).fold((0.0f64, 0.0f64, 0.0f64), |acc, (x, y)| {
        let (x, y) = (*x as f64, *y as f64);
        (acc.0 + x * y, acc.1 + x * x, acc.2 + y * y)
    });

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// Rank entries by cosine similarity to a query embedding.
///
/// Entries without an embedding or scoring below `min_score` are skipped.
/// The survivors come back most similar first with `score` set; equal scores
/// keep the newer entry first so ranking is deterministic.
pub fn vector_search<'a, I>(
    entries: I,
    query_embedding: &[f32],
    limit: usize,
    min_score: f32,
) -> Vec<MemoryEntry>
where
    I: IntoIterator<Item = &'a MemoryEntry>,
{
    let mut scored: Vec<MemoryEntry> = entries
        .into_iter()
        .filter_map(|entry| {
            let emb = entry.embedding.as_ref()?;
            let sim = cosine_similarity(emb, query_embedding);
            (sim >= min_score).then(|| {
                let mut e = entry.clone();
                e.score = sim;
                e
            })
        })
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
    scored.truncate(limit);
    scored
}
