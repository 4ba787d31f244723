/// WebSocket session handler for one client.
///
/// This actor owns a single browser connection: it registers with the game
/// session on start, turns incoming JSON frames into `ClientMessage`s for the
/// orchestrator, relays broadcast frames back, and reports rejected actions
/// to this client only. Silent clients are dropped after `CLIENT_TIMEOUT`.
use std::time::Instant;

use actix::prelude::*;
use actix_web::{Error, HttpRequest, HttpResponse, web};
use actix_web_actors::ws;
use log::{debug, info, warn};
use uuid::Uuid;

use crate::config::server::{CLIENT_TIMEOUT, HEARTBEAT_INTERVAL};
use crate::server::game_session::messages::{
    ClientMessage, Connect, Disconnect, OutboundText, ProcessClientMessage,
};
use crate::server::game_session::GameSession;
use crate::server::ws_error::{ws_error_message, ws_game_error_message};

pub struct PlayerSession {
    pub conn_id: Uuid,
    pub session_addr: Addr<GameSession>,
    last_heartbeat: Instant,
}

impl PlayerSession {
    pub fn new(session_addr: Addr<GameSession>) -> Self {
        Self {
            conn_id: Uuid::new_v4(),
            session_addr,
            last_heartbeat: Instant::now(),
        }
    }

    fn start_heartbeat(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.last_heartbeat) > CLIENT_TIMEOUT {
                warn!("[PlayerSession] {} timed out", act.conn_id);
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }

    /// Forward an event and report a rejection back to this client.
    fn forward(&self, msg: ClientMessage, ctx: &mut ws::WebsocketContext<Self>) {
        self.session_addr
            .send(ProcessClientMessage {
                conn_id: self.conn_id,
                msg,
            })
            .into_actor(self)
            .map(|res, act, ctx| match res {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    debug!("[PlayerSession] {} rejected: {}", act.conn_id, err);
                    ctx.text(ws_game_error_message(&err));
                }
                Err(e) => {
                    warn!("[PlayerSession] Game session unreachable: {}", e);
                    ctx.text(ws_error_message("INTERNAL_ERROR", "Game session unavailable"));
                }
            })
            .spawn(ctx);
    }
}

impl Actor for PlayerSession {
    type Context = ws::WebsocketContext<Self>;

    /// Join the broadcast set; the game session answers with the current state.
    fn started(&mut self, ctx: &mut Self::Context) {
        info!("[PlayerSession] {} connected", self.conn_id);
        self.session_addr.do_send(Connect {
            conn_id: self.conn_id,
            addr: ctx.address().recipient(),
        });
        self.start_heartbeat(ctx);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        info!("[PlayerSession] {} disconnected", self.conn_id);
        self.session_addr.do_send(Disconnect {
            conn_id: self.conn_id,
        });
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for PlayerSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        let msg = match msg {
            Ok(msg) => msg,
            Err(e) => {
                warn!("[PlayerSession] {} protocol error: {}", self.conn_id, e);
                ctx.stop();
                return;
            }
        };
        self.last_heartbeat = Instant::now();

        match msg {
            ws::Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => self.forward(client_msg, ctx),
                Err(e) => {
                    debug!("[PlayerSession] {} sent invalid message: {}", self.conn_id, e);
                    ctx.text(ws_error_message("INVALID_MESSAGE", "Invalid client message"));
                }
            },
            ws::Message::Ping(payload) => ctx.pong(&payload),
            ws::Message::Pong(_) => {}
            ws::Message::Close(reason) => {
                ctx.close(reason);
                ctx.stop();
            }
            ws::Message::Binary(_) => {
                ctx.text(ws_error_message("INVALID_MESSAGE", "Binary frames are not supported"));
            }
            ws::Message::Continuation(_) | ws::Message::Nop => {}
        }
    }
}

impl Handler<OutboundText> for PlayerSession {
    type Result = ();

    fn handle(&mut self, msg: OutboundText, ctx: &mut Self::Context) -> Self::Result {
        ctx.text(&*msg.0);
    }
}

/// WebSocket endpoint for the game. Any client may connect; identity is the
/// display name carried by each message.
pub async fn ws_game(
    req: HttpRequest,
    stream: web::Payload,
    data: web::Data<crate::server::state::AppState>,
) -> Result<HttpResponse, Error> {
    ws::start(PlayerSession::new(data.game_session.clone()), &req, stream)
}
