//! Prompt similarity scoring.
//!
//! `EmbeddingScorer` asks an embedding service for sentence vectors and
//! compares them; `LexicalScorer` is the offline fallback that compares word
//! counts. Either way the result is a cosine similarity in [-1, 1].

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::game::scoring::{ScoringPair, aggregate_scores};
use crate::gateway::GatewayError;

#[async_trait]
pub trait ScoringGateway: Send + Sync {
    async fn similarity(&self, a: &str, b: &str) -> Result<f64, GatewayError>;
}

/// Client for an embedding endpoint.
///
/// Request: `{"inputs": ["text a", "text b"]}`.
/// Response: `{"embeddings": [[f64, ...], [f64, ...]]}`.
pub struct EmbeddingScorer {
    http: reqwest::Client,
    url: String,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    inputs: [&'a str; 2],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embeddings: Vec<Vec<f64>>,
}

impl EmbeddingScorer {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl ScoringGateway for EmbeddingScorer {
    async fn similarity(&self, a: &str, b: &str) -> Result<f64, GatewayError> {
        let response: EmbeddingResponse = self
            .http
            .post(&self.url)
            .json(&EmbeddingRequest { inputs: [a, b] })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        match response.embeddings.as_slice() {
            [first, second] if first.len() == second.len() && !first.is_empty() => {
                Ok(cosine_similarity(first, second))
            }
            _ => Err(GatewayError::Protocol(format!(
                "expected two embeddings of equal length, got {}",
                response.embeddings.len()
            ))),
        }
    }
}

/// Cosine similarity of lower-cased word counts. No external service needed.
#[derive(Debug, Default, Clone, Copy)]
pub struct LexicalScorer;

#[async_trait]
impl ScoringGateway for LexicalScorer {
    async fn similarity(&self, a: &str, b: &str) -> Result<f64, GatewayError> {
        Ok(lexical_similarity(a, b))
    }
}

pub fn lexical_similarity(a: &str, b: &str) -> f64 {
    let counts_a = word_counts(a);
    let counts_b = word_counts(b);
    let dot: f64 = counts_a
        .iter()
        .filter_map(|(word, n)| counts_b.get(word).map(|m| n * m))
        .sum();
    let norm_a = counts_a.values().map(|n| n * n).sum::<f64>().sqrt();
    let norm_b = counts_b.values().map(|n| n * n).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

fn word_counts(text: &str) -> HashMap<String, f64> {
    let mut counts = HashMap::new();
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        *counts.entry(word.to_lowercase()).or_insert(0.0) += 1.0;
    }
    counts
}

pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

/// Score every pair and aggregate per player. Pairs the scorer fails on are
/// skipped, so one bad request does not cost the whole gallery its scores.
pub async fn score_chains(
    scorer: &dyn ScoringGateway,
    players: &[String],
    pairs: &[ScoringPair],
) -> BTreeMap<String, i64> {
    let mut samples = Vec::with_capacity(pairs.len());
    for pair in pairs {
        match scorer.similarity(&pair.previous, &pair.current).await {
            Ok(similarity) => {
                debug!(
                    "[Scoring] {} '{}' -> '{}': {:.3}",
                    pair.author, pair.previous, pair.current, similarity
                );
                samples.push((pair.author.clone(), similarity));
            }
            Err(err) => warn!("[Scoring] Skipping pair by {}: {}", pair.author, err),
        }
    }
    aggregate_scores(players, samples)
}
