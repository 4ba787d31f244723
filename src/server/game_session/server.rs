//! Session orchestrator actor.
//!
//! `GameSession` is the only owner of `SessionState`. Connections send it
//! events through its mailbox, it applies one transition per event and
//! broadcasts the resulting snapshot to every registered connection.
//!
//! Image generation is slow, so submissions do not hold the mailbox: the
//! gateway call runs as a future on the actor's context and its result is
//! committed (re-validated) when it lands. Scoring at game end runs under
//! `ctx.wait`, so the scored gallery is the next thing anyone sees.

use std::sync::Arc;

use actix::prelude::*;
use log::{debug, error, info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::game::error::GameError;
use crate::game::state::{Progress, SessionState, Submission};
use crate::game::types::Image;
use crate::gateway::generation::GenerationGateway;
use crate::gateway::scoring::{ScoringGateway, score_chains};
use crate::server::game_session::messages::{
    ClientMessage, Connect, Disconnect, GetConnectionCount, GetSnapshot, ProcessClientMessage,
    ServerMessage,
};
use crate::server::registry::ConnectionRegistry;

pub struct GameSession {
    state: SessionState,
    registry: ConnectionRegistry,
    generator: Arc<dyn GenerationGateway>,
    scorer: Arc<dyn ScoringGateway>,
    rng: StdRng,
}

impl Actor for GameSession {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        info!("[GameSession] Started");
    }
}

impl GameSession {
    pub fn new(generator: Arc<dyn GenerationGateway>, scorer: Arc<dyn ScoringGateway>) -> Self {
        Self::with_parts(
            SessionState::new(),
            generator,
            scorer,
            StdRng::from_os_rng(),
            ConnectionRegistry::default(),
        )
    }

    pub fn with_parts(
        state: SessionState,
        generator: Arc<dyn GenerationGateway>,
        scorer: Arc<dyn ScoringGateway>,
        rng: StdRng,
        registry: ConnectionRegistry,
    ) -> Self {
        Self {
            state,
            registry,
            generator,
            scorer,
            rng,
        }
    }

    fn broadcast_state(&mut self, ctx: &mut Context<Self>) {
        let snapshot = self.state.snapshot();
        debug!(
            "[GameSession] Broadcast game_state: phase={:?} round={} players={} connections={}",
            snapshot.phase,
            snapshot.round_number,
            snapshot.players.len(),
            self.registry.len()
        );
        self.registry.broadcast(
            &ServerMessage::GameState(snapshot),
            ctx.address().recipient(),
        );
    }

    /// Start generating the image for a submission; the turn is committed
    /// when the gateway answers.
    fn submit(
        &mut self,
        submission: Submission,
        ctx: &mut Context<Self>,
    ) -> ResponseActFuture<Self, Result<(), GameError>> {
        let ticket = match self.state.begin_submission(&submission) {
            Ok(ticket) => ticket,
            Err(err) => return Box::pin(fut::ready(self.settle(Err(err), ctx))),
        };
        debug!(
            "[GameSession] Generating image for {}: '{}'",
            submission.author(),
            submission.text()
        );

        let generator = Arc::clone(&self.generator);
        let text = submission.text().to_string();
        Box::pin(
            async move { generator.generate(&text).await }
                .into_actor(self)
                .map(move |generated, act, ctx| {
                    let result = match generated {
                        Ok(png) => act.state.commit_submission(
                            ticket,
                            submission,
                            Image::from_png(&png),
                            &mut act.rng,
                        ),
                        Err(err) => {
                            act.state.cancel_submission(ticket, submission.author());
                            Err(GameError::from(err))
                        }
                    };
                    act.settle(result, ctx)
                }),
        )
    }

    /// Turn a transition result into broadcasts and the reply for the sender.
    fn settle(
        &mut self,
        result: Result<Progress, GameError>,
        ctx: &mut Context<Self>,
    ) -> Result<(), GameError> {
        match result {
            Ok(Progress::GameOver) => {
                self.finish_game(ctx);
                Ok(())
            }
            Ok(progress) => {
                debug!("[GameSession] Transition: {:?}", progress);
                self.broadcast_state(ctx);
                Ok(())
            }
            Err(err @ GameError::AssignmentExhausted { .. }) => {
                error!("[GameSession] {}; ending the game early", err);
                self.registry
                    .broadcast(&ServerMessage::from_game_error(&err), ctx.address().recipient());
                self.state.abort_to_gallery();
                self.finish_game(ctx);
                Ok(())
            }
            Err(err) if err.is_noop() => {
                warn!("[GameSession] Ignored: {}", err);
                self.broadcast_state(ctx);
                Ok(())
            }
            Err(err) => {
                warn!("[GameSession] Rejected: {}", err);
                self.broadcast_state(ctx);
                Err(err)
            }
        }
    }

    /// Score the finished chains, then broadcast the gallery with scores.
    /// Blocks the mailbox until done so no event slips in between.
    fn finish_game(&mut self, ctx: &mut Context<Self>) {
        let scorer = Arc::clone(&self.scorer);
        let players = self.state.player_names();
        let pairs = self.state.scoring_pairs();
        let epoch = self.state.epoch();
        info!("[GameSession] Scoring {} turns", pairs.len());

        ctx.wait(
            async move { score_chains(&*scorer, &players, &pairs).await }
                .into_actor(self)
                .map(move |scores, act, ctx| {
                    if act.state.epoch() == epoch {
                        info!("[GameSession] Final scores: {:?}", scores);
                        act.state.set_scores(scores);
                    }
                    act.broadcast_state(ctx);
                }),
        );
    }
}

impl Handler<ProcessClientMessage> for GameSession {
    type Result = ResponseActFuture<Self, Result<(), GameError>>;

    fn handle(&mut self, msg: ProcessClientMessage, ctx: &mut Context<Self>) -> Self::Result {
        debug!("[GameSession] {} from {}", msg.msg.kind(), msg.conn_id);

        let result = match msg.msg {
            ClientMessage::Join { name } => self.state.join(&name),
            ClientMessage::Ready { name } => self.state.set_ready(&name),
            ClientMessage::RestartGame => Ok(self.state.restart()),
            ClientMessage::SubmitPrompt { name, prompt } => {
                return self.submit(
                    Submission::Prompt {
                        author: name,
                        prompt,
                    },
                    ctx,
                );
            }
            ClientMessage::SubmitDescription {
                name,
                description,
                chain_owner,
            } => {
                return self.submit(
                    Submission::Description {
                        author: name,
                        chain_owner,
                        description,
                    },
                    ctx,
                );
            }
        };
        Box::pin(fut::ready(self.settle(result, ctx)))
    }
}

impl Handler<Connect> for GameSession {
    type Result = ();

    fn handle(&mut self, msg: Connect, _: &mut Context<Self>) -> Self::Result {
        self.registry.register(msg.conn_id, msg.addr);
        // New connections see the current state right away.
        self.registry
            .send_to(&msg.conn_id, &ServerMessage::GameState(self.state.snapshot()));
    }
}

impl Handler<Disconnect> for GameSession {
    type Result = ();

    fn handle(&mut self, msg: Disconnect, _: &mut Context<Self>) -> Self::Result {
        if self.registry.unregister(&msg.conn_id) {
            info!("[GameSession] Connection {} left", msg.conn_id);
        }
    }
}

impl Handler<GetSnapshot> for GameSession {
    type Result = MessageResult<GetSnapshot>;

    fn handle(&mut self, _: GetSnapshot, _: &mut Context<Self>) -> Self::Result {
        MessageResult(self.state.snapshot())
    }
}

impl Handler<GetConnectionCount> for GameSession {
    type Result = usize;

    fn handle(&mut self, _: GetConnectionCount, _: &mut Context<Self>) -> Self::Result {
        self.registry.len()
    }
}
