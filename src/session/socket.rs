use async_trait::async_trait;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::stream::StreamExt;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::result::SessionResult;
use crate::shared::AppState;

/// Simple WebSocket abstraction - all we care about is send/receive
#[async_trait]
pub trait SocketWrapper: Send {
    /// Send a text message to the client
    async fn send_message(&mut self, message: String) -> Result<(), SocketError>;

    /// Receive the next message from the client (None if connection closed)
    async fn receive_message(&mut self) -> Result<Option<String>, SocketError>;

    /// Close the connection
    async fn close(&mut self) -> Result<(), SocketError>;
}

#[derive(Debug)]
pub enum SocketError {
    SendFailed(String),
    ReceiveFailed(String),
    Encode(String),
}

/// Direct implementation on axum's WebSocket
#[async_trait]
impl SocketWrapper for WebSocket {
    async fn send_message(&mut self, message: String) -> Result<(), SocketError> {
        self.send(Message::Text(message))
            .await
            .map_err(|e| SocketError::SendFailed(e.to_string()))
    }

    async fn receive_message(&mut self) -> Result<Option<String>, SocketError> {
        loop {
            match self.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(text)),
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // Ignore binary/ping/pong
                Some(Err(e)) => return Err(SocketError::ReceiveFailed(e.to_string())),
            }
        }
    }

    async fn close(&mut self) -> Result<(), SocketError> {
        self.send(Message::Close(None))
            .await
            .map_err(|e| SocketError::SendFailed(e.to_string()))
    }
}

/// Pushes every session state change to one subscriber socket
pub struct StateFeed {
    socket: Box<dyn SocketWrapper>,
    updates: watch::Receiver<SessionResult>,
}

impl StateFeed {
    pub fn new(socket: Box<dyn SocketWrapper>, updates: watch::Receiver<SessionResult>) -> Self {
        Self { socket, updates }
    }

    async fn push_current(&mut self) -> Result<(), SocketError> {
        let payload = {
            let state = self.updates.borrow_and_update();
            serde_json::to_string(&*state).map_err(|e| SocketError::Encode(e.to_string()))?
        };
        self.socket.send_message(payload).await
    }

    /// Sends the current state, then each change, until either side goes away.
    /// Anything the client sends is ignored.
    pub async fn run(mut self) -> Result<(), SocketError> {
        self.push_current().await?;

        loop {
            tokio::select! {
                changed = self.updates.changed() => {
                    match changed {
                        Ok(()) => self.push_current().await?,
                        Err(_) => break, // Controller dropped
                    }
                }

                msg = self.socket.receive_message() => {
                    match msg {
                        Ok(Some(text)) => debug!(message = %text, "Ignoring client message"),
                        Ok(None) => break, // Client disconnected
                        Err(e) => return Err(e),
                    }
                }
            }
        }

        // Clean disconnect
        let _ = self.socket.close().await;
        Ok(())
    }
}

/// GET /auth/ws
pub async fn state_socket(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let updates = state.session_controller.subscribe();

    ws.on_upgrade(move |socket| async move {
        info!("Session state subscriber connected");
        let feed = StateFeed::new(Box::new(socket), updates);
        match feed.run().await {
            Ok(()) => info!("Session state subscriber disconnected"),
            Err(e) => warn!(error = ?e, "Session state subscriber dropped"),
        }
    })
}
