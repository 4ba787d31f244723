/// Game configuration constants.
///
/// This module defines the parameters of the chain game itself: how hard the
/// assignment engine searches and how similarity is turned into points.
pub const MAX_ASSIGNMENT_TRIALS: usize = 100; // Randomized trials before giving up on a round.

/// Multiplier applied to a player's mean similarity to get an integer score.
pub const SCORE_SCALE: f64 = 1000.0;
