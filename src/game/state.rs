//! Authoritative session state and its phase machine.
//!
//! `SessionState` owns players, chains, assignments and history, and is only
//! ever mutated through the transition methods below. Each transition either
//! commits completely or returns an error with the state untouched.
//!
//! Submissions are split in two: `begin_submission` validates and marks the
//! player as pending while the image renders, `commit_submission` re-validates
//! against whatever the state has become and applies the turn.

use std::collections::{BTreeMap, HashSet};

use log::{debug, info};
use rand::Rng;
use serde::Serialize;

use crate::config::game::MAX_ASSIGNMENT_TRIALS;
use crate::game::assignment::{Assignments, ChainHistory, assign_chains};
use crate::game::error::GameError;
use crate::game::scoring::{ScoringPair, scoring_pairs};
use crate::game::types::{Chain, Image, Phase, Player, Turn};

/// What a successful transition changed, so the caller knows what to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Nothing changed (repeated join, ready twice, ...).
    Unchanged,
    /// The state changed within the current round.
    Updated,
    /// Everyone was ready: the lobby became round 1 of a game.
    GameStarted,
    /// All chains reported; the given round has begun.
    RoundAdvanced(u32),
    /// The last round completed; the session is in the gallery and needs scores.
    GameOver,
    /// The session was cleared back to an empty lobby.
    Reset,
}

/// A turn a player wants to add, before its image exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Opening prompt of the player's own chain (round 1).
    Prompt { author: String, prompt: String },
    /// Description of the last image of `chain_owner`'s chain (rounds 2+).
    Description {
        author: String,
        chain_owner: String,
        description: String,
    },
}

impl Submission {
    pub fn author(&self) -> &str {
        match self {
            Submission::Prompt { author, .. } | Submission::Description { author, .. } => author,
        }
    }

    /// Text sent to the image generator.
    pub fn text(&self) -> &str {
        match self {
            Submission::Prompt { prompt, .. } => prompt,
            Submission::Description { description, .. } => description,
        }
    }
}

/// Handed out by `begin_submission`; ties the pending generation to the game
/// it was started in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionTicket {
    epoch: u64,
}

/// Broadcast view of the session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameSnapshot {
    pub phase: Phase,
    pub round_number: u32,
    pub players: Vec<Player>,
    pub chains: BTreeMap<String, Chain>,
    pub assignments: Assignments,
    pub scores: BTreeMap<String, i64>,
}

#[derive(Debug)]
pub struct SessionState {
    phase: Phase,
    round: u32,
    /// Join order is kept for display and for the assignment engine.
    players: Vec<Player>,
    chains: BTreeMap<String, Chain>,
    assignments: Assignments,
    history: ChainHistory,
    scores: BTreeMap<String, i64>,
    /// Players whose image is being generated right now.
    pending: HashSet<String>,
    /// Bumped on every reset; stale generations are matched against it.
    epoch: u64,
    /// Randomized trials the assignment engine gets per round.
    assignment_trials: usize,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self::with_assignment_trials(MAX_ASSIGNMENT_TRIALS)
    }

    /// Empty lobby whose assignment engine gives up after `trials` attempts
    /// per round.
    pub fn with_assignment_trials(trials: usize) -> Self {
        Self {
            phase: Phase::Lobby,
            round: 1,
            players: Vec::new(),
            chains: BTreeMap::new(),
            assignments: Assignments::new(),
            history: ChainHistory::new(),
            scores: BTreeMap::new(),
            pending: HashSet::new(),
            epoch: 0,
            assignment_trials: trials,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, name: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.name == name)
    }

    pub fn player_names(&self) -> Vec<String> {
        self.players.iter().map(|p| p.name.clone()).collect()
    }

    pub fn chain(&self, owner: &str) -> Option<&Chain> {
        self.chains.get(owner)
    }

    pub fn chains(&self) -> &BTreeMap<String, Chain> {
        &self.chains
    }

    pub fn assignments(&self) -> &Assignments {
        &self.assignments
    }

    pub fn history(&self) -> &ChainHistory {
        &self.history
    }

    pub fn scores(&self) -> &BTreeMap<String, i64> {
        &self.scores
    }

    pub fn is_pending(&self, name: &str) -> bool {
        self.pending.contains(name)
    }

    /// Register a player. Known names are merged silently. New names are
    /// accepted in the lobby and during round 1, where the round then waits
    /// for the newcomer's opening prompt too.
    pub fn join(&mut self, name: &str) -> Result<Progress, GameError> {
        if self.player(name).is_some() {
            debug!("[Session] {} joined again, ignoring", name);
            return Ok(Progress::Unchanged);
        }
        match self.phase {
            Phase::Lobby => {}
            Phase::Playing if self.round == 1 => {
                self.history
                    .insert(name.to_string(), HashSet::from([name.to_string()]));
            }
            _ => return Err(GameError::GameInProgress(name.to_string())),
        }
        self.players.push(Player::new(name));
        info!("[Session] {} joined ({} players)", name, self.players.len());
        Ok(Progress::Updated)
    }

    /// Mark a lobby player ready, starting the game once everybody is.
    /// Outside the lobby readiness follows submissions, so this is ignored.
    pub fn set_ready(&mut self, name: &str) -> Result<Progress, GameError> {
        if self.phase != Phase::Lobby {
            debug!("[Session] Ready from {} ignored in {:?}", name, self.phase);
            return Ok(Progress::Unchanged);
        }
        let player = self
            .player_mut(name)
            .ok_or_else(|| GameError::UnknownPlayer(name.to_string()))?;
        if player.ready {
            return Ok(Progress::Unchanged);
        }
        player.ready = true;

        if self.try_start_game() {
            Ok(Progress::GameStarted)
        } else {
            Ok(Progress::Updated)
        }
    }

    /// `Lobby -> Playing` once the lobby is non-empty and fully ready.
    fn try_start_game(&mut self) -> bool {
        if self.phase != Phase::Lobby
            || self.players.is_empty()
            || !self.players.iter().all(|p| p.ready)
        {
            return false;
        }
        self.phase = Phase::Playing;
        self.round = 1;
        self.history = self
            .players
            .iter()
            .map(|p| (p.name.clone(), HashSet::from([p.name.clone()])))
            .collect();
        for player in &mut self.players {
            player.ready = false;
        }
        info!("[Session] Game started with {} players", self.players.len());
        true
    }

    /// Check that a submission is acceptable right now and reserve the
    /// player's slot while its image is generated.
    pub fn begin_submission(
        &mut self,
        submission: &Submission,
    ) -> Result<SubmissionTicket, GameError> {
        self.validate(submission)?;
        let author = submission.author();
        if !self.pending.insert(author.to_string()) {
            return Err(GameError::SubmissionPending(author.to_string()));
        }
        Ok(SubmissionTicket { epoch: self.epoch })
    }

    /// Release a reservation after a failed generation.
    pub fn cancel_submission(&mut self, ticket: SubmissionTicket, author: &str) {
        if ticket.epoch == self.epoch {
            self.pending.remove(author);
        }
    }

    /// Record the generated turn, then advance the round if it was the last
    /// one missing. The submission is checked again since other events may
    /// have been processed while the image was rendering.
    pub fn commit_submission<R: Rng + ?Sized>(
        &mut self,
        ticket: SubmissionTicket,
        submission: Submission,
        image: Image,
        rng: &mut R,
    ) -> Result<Progress, GameError> {
        if ticket.epoch != self.epoch {
            return Err(GameError::StaleSubmission);
        }
        self.pending.remove(submission.author());
        self.validate(&submission)?;

        match submission {
            Submission::Prompt { author, prompt } => {
                let turn = Turn {
                    author: author.clone(),
                    prompt,
                    image,
                };
                self.chains.insert(author.clone(), vec![turn]);
                self.mark_ready(&author);
                debug!("[Session] {} started a chain", author);

                if self.chains.len() == self.players.len() {
                    self.advance_round(rng)
                } else {
                    Ok(Progress::Updated)
                }
            }
            Submission::Description {
                author,
                chain_owner,
                description,
            } => {
                let chain = self
                    .chains
                    .get_mut(&chain_owner)
                    .ok_or_else(|| GameError::UnknownChainOwner(chain_owner.clone()))?;
                chain.push(Turn {
                    author: author.clone(),
                    prompt: description,
                    image,
                });
                self.mark_ready(&author);
                self.history
                    .entry(author.clone())
                    .or_default()
                    .insert(chain_owner.clone());
                debug!("[Session] {} described the chain of {}", author, chain_owner);

                if self.players.iter().all(|p| p.ready) {
                    self.advance_round(rng)
                } else {
                    Ok(Progress::Updated)
                }
            }
        }
    }

    fn validate(&self, submission: &Submission) -> Result<(), GameError> {
        let author = submission.author();
        let player = self
            .player(author)
            .ok_or_else(|| GameError::UnknownPlayer(author.to_string()))?;

        match submission {
            Submission::Prompt { .. } => {
                if self.phase != Phase::Playing || self.round != 1 {
                    return Err(self.wrong_phase("submit_prompt"));
                }
                if self.chains.contains_key(author) {
                    return Err(GameError::AlreadySubmitted(author.to_string()));
                }
            }
            Submission::Description { chain_owner, .. } => {
                if self.phase != Phase::Playing || self.round < 2 {
                    return Err(self.wrong_phase("submit_description"));
                }
                if !self.chains.contains_key(chain_owner) {
                    return Err(GameError::UnknownChainOwner(chain_owner.clone()));
                }
                if player.ready {
                    return Err(GameError::AlreadySubmitted(author.to_string()));
                }
                if self.assignments.get(author) != Some(chain_owner) {
                    return Err(GameError::NotAssigned {
                        player: author.to_string(),
                        requested: chain_owner.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Close the current round: clear readiness, fold the round's
    /// assignments into history, then assign the next round or end the game.
    /// Nothing is written if the next assignment cannot be found.
    fn advance_round<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<Progress, GameError> {
        let mut history = self.history.clone();
        for (reviewer, owner) in &self.assignments {
            history
                .entry(reviewer.clone())
                .or_default()
                .insert(owner.clone());
        }
        let next_round = self.round + 1;

        if next_round as usize > self.players.len() {
            self.history = history;
            self.round = next_round;
            self.assignments.clear();
            self.clear_ready();
            self.phase = Phase::Gallery;
            info!("[Session] All {} rounds played, entering gallery", self.players.len());
            return Ok(Progress::GameOver);
        }

        let assignments =
            assign_chains(&self.player_names(), &history, self.assignment_trials, rng)?;
        self.history = history;
        self.round = next_round;
        self.assignments = assignments;
        self.clear_ready();
        info!("[Session] Round {} started: {:?}", self.round, self.assignments);
        Ok(Progress::RoundAdvanced(self.round))
    }

    /// End the run early with the chains built so far.
    pub fn abort_to_gallery(&mut self) {
        self.phase = Phase::Gallery;
        self.assignments.clear();
        self.pending.clear();
        self.clear_ready();
    }

    /// Store final scores. Only meaningful in the gallery.
    pub fn set_scores(&mut self, scores: BTreeMap<String, i64>) {
        if self.phase == Phase::Gallery {
            self.scores = scores;
        }
    }

    /// Back to an empty lobby. Generations still in flight become stale.
    pub fn restart(&mut self) -> Progress {
        self.players.clear();
        self.chains.clear();
        self.assignments.clear();
        self.history.clear();
        self.scores.clear();
        self.pending.clear();
        self.phase = Phase::Lobby;
        self.round = 1;
        self.epoch += 1;
        info!("[Session] Game restarted (epoch {})", self.epoch);
        Progress::Reset
    }

    pub fn scoring_pairs(&self) -> Vec<ScoringPair> {
        scoring_pairs(self.chains.values())
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            phase: self.phase,
            round_number: self.round,
            players: self.players.clone(),
            chains: self.chains.clone(),
            assignments: self.assignments.clone(),
            scores: if self.phase == Phase::Gallery {
                self.scores.clone()
            } else {
                BTreeMap::new()
            },
        }
    }

    fn player_mut(&mut self, name: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.name == name)
    }

    fn mark_ready(&mut self, name: &str) {
        if let Some(player) = self.player_mut(name) {
            player.ready = true;
        }
    }

    fn clear_ready(&mut self) {
        for player in &mut self.players {
            player.ready = false;
        }
    }

    fn wrong_phase(&self, action: &'static str) -> GameError {
        GameError::WrongPhase {
            action,
            phase: self.phase,
            round: self.round,
        }
    }
}
