/// Final score aggregation.
///
/// A player earns one similarity sample per turn they added to someone else's
/// chain: how close their description is to the prompt right before it. The
/// score is the mean sample scaled by `SCORE_SCALE` and rounded.
use std::collections::{BTreeMap, HashMap};

use crate::config::game::SCORE_SCALE;
use crate::game::types::Chain;

/// Two consecutive prompts of a chain; `author` wrote `current`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoringPair {
    pub author: String,
    pub previous: String,
    pub current: String,
}

/// Every consecutive prompt pair across all chains.
pub fn scoring_pairs<'a>(chains: impl IntoIterator<Item = &'a Chain>) -> Vec<ScoringPair> {
    chains
        .into_iter()
        .flat_map(|chain| {
            chain.windows(2).map(|pair| ScoringPair {
                author: pair[1].author.clone(),
                previous: pair[0].prompt.clone(),
                current: pair[1].prompt.clone(),
            })
        })
        .collect()
}

/// Average each player's samples into an integer score. Every listed player
/// gets an entry; players without samples score zero.
pub fn aggregate_scores(
    players: &[String],
    samples: impl IntoIterator<Item = (String, f64)>,
) -> BTreeMap<String, i64> {
    let mut sums: HashMap<String, (f64, u32)> = HashMap::new();
    for (author, similarity) in samples {
        let entry = sums.entry(author).or_insert((0.0, 0));
        entry.0 += similarity;
        entry.1 += 1;
    }

    let mut scores: BTreeMap<String, i64> =
        players.iter().map(|p| (p.clone(), 0)).collect();
    for (author, (sum, count)) in sums {
        if count > 0 {
            let mean = sum / count as f64;
            scores.insert(author, (mean * SCORE_SCALE).round() as i64);
        }
    }
    scores
}
