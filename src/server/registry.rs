/// Set of open client connections and best-effort fan-out to them.
use std::collections::HashMap;
use std::time::Duration;

use actix::prelude::*;
use log::{debug, error, warn};
use uuid::Uuid;

use crate::config::server::BROADCAST_SEND_TIMEOUT;
use crate::server::game_session::messages::{Disconnect, OutboundText, ServerMessage};

pub struct ConnectionRegistry {
    connections: HashMap<Uuid, Recipient<OutboundText>>,
    send_timeout: Duration,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new(BROADCAST_SEND_TIMEOUT)
    }
}

impl ConnectionRegistry {
    pub fn new(send_timeout: Duration) -> Self {
        Self {
            connections: HashMap::new(),
            send_timeout,
        }
    }

    pub fn register(&mut self, conn_id: Uuid, recipient: Recipient<OutboundText>) {
        self.connections.insert(conn_id, recipient);
        debug!("[Registry] Connection {} registered ({} open)", conn_id, self.connections.len());
    }

    /// Returns false if the connection was already gone.
    pub fn unregister(&mut self, conn_id: &Uuid) -> bool {
        let removed = self.connections.remove(conn_id).is_some();
        if removed {
            debug!("[Registry] Connection {} removed ({} open)", conn_id, self.connections.len());
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Send a frame to a single connection without waiting.
    pub fn send_to(&self, conn_id: &Uuid, msg: &ServerMessage) {
        let Some(recipient) = self.connections.get(conn_id) else {
            return;
        };
        match OutboundText::encode(msg) {
            Ok(text) => recipient.do_send(text),
            Err(e) => error!("[Registry] Failed to serialize message: {}", e),
        }
    }

    /// Serialize once and deliver to every connection. Closed mailboxes are
    /// dropped right away; a send that fails or outlives the timeout reports
    /// the connection to `on_failure` so it gets removed too. Never blocks.
    pub fn broadcast(&mut self, msg: &ServerMessage, on_failure: Recipient<Disconnect>) {
        let text = match OutboundText::encode(msg) {
            Ok(text) => text,
            Err(e) => {
                error!("[Registry] Failed to serialize broadcast: {}", e);
                return;
            }
        };

        self.connections.retain(|conn_id, recipient| {
            let open = recipient.connected();
            if !open {
                warn!("[Registry] Dropping closed connection {}", conn_id);
            }
            open
        });

        for (conn_id, recipient) in &self.connections {
            let conn_id = *conn_id;
            let request = recipient.send(text.clone()).timeout(self.send_timeout);
            let on_failure = on_failure.clone();
            actix::spawn(async move {
                if let Err(e) = request.await {
                    warn!("[Registry] Send to {} failed ({}), disconnecting", conn_id, e);
                    on_failure.do_send(Disconnect { conn_id });
                }
            });
        }
    }
}
