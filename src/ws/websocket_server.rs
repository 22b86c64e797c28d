use crate::breaks::StatusSnapshot;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::protocol::Message;

pub const DEFAULT_CONTROL_PORT: u16 = 8765;

/// A request frame, e.g. `{"action": "toggle_pause"}`.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ControlRequest {
    Status,
    TogglePause,
    Exit,
}

/// Commands forwarded to the event loop. Status queries are answered here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    TogglePause,
    Exit,
}

#[derive(Debug, Serialize)]
pub struct ControlResponse {
    pub success: bool,
    pub message: Option<String>,
    pub status: Option<StatusSnapshot>,
}

impl ControlResponse {
    fn ok(message: &str, status: StatusSnapshot) -> Self {
        Self {
            success: true,
            message: Some(message.to_string()),
            status: Some(status),
        }
    }

    fn failed(message: String) -> Self {
        Self {
            success: false,
            message: Some(message),
            status: None,
        }
    }
}

pub type CommandSender = mpsc::UnboundedSender<ControlCommand>;
pub type CommandReceiver = mpsc::UnboundedReceiver<ControlCommand>;
pub type StatusWatch = watch::Receiver<StatusSnapshot>;

pub fn create_command_channel() -> (CommandSender, CommandReceiver) {
    mpsc::unbounded_channel()
}

pub async fn start_control_server(
    addr: SocketAddr,
    command_tx: CommandSender,
    status_rx: StatusWatch,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Control server listening on: ws://{}", addr);
    serve(listener, command_tx, status_rx).await;
    Ok(())
}

pub async fn serve(listener: TcpListener, command_tx: CommandSender, status_rx: StatusWatch) {
    while let Ok((stream, peer_addr)) = listener.accept().await {
        tracing::debug!("New control connection from: {}", peer_addr);
        let tx = command_tx.clone();
        let rx = status_rx.clone();
        tokio::spawn(handle_connection(stream, peer_addr, tx, rx));
    }
}

fn handle_request(text: &str, command_tx: &CommandSender, status_rx: &StatusWatch) -> ControlResponse {
    let request = match serde_json::from_str::<ControlRequest>(text) {
        Ok(request) => request,
        Err(e) => return ControlResponse::failed(format!("Parse error: {}", e)),
    };

    let status = status_rx.borrow().clone();
    let (command, message) = match request {
        ControlRequest::Status => return ControlResponse::ok("Status", status),
        ControlRequest::TogglePause => (ControlCommand::TogglePause, "Pause toggled"),
        ControlRequest::Exit => (ControlCommand::Exit, "Exiting"),
    };

    match command_tx.send(command) {
        Ok(()) => ControlResponse::ok(message, status),
        Err(_) => ControlResponse::failed("Scheduler is shutting down".to_string()),
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    command_tx: CommandSender,
    status_rx: StatusWatch,
) {
    let ws_stream = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            tracing::warn!("WebSocket handshake failed with {}: {}", peer_addr, e);
            return;
        }
    };

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                let response = handle_request(&text, &command_tx, &status_rx);
                if !response.success {
                    tracing::debug!("Rejected control request from {}: {}", peer_addr, text);
                }
                if let Ok(response_json) = serde_json::to_string(&response) {
                    if let Err(e) = ws_sender.send(Message::Text(response_json)).await {
                        tracing::debug!("Failed to send control response: {}", e);
                        break;
                    }
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(Message::Ping(data)) => {
                if ws_sender.send(Message::Pong(data)).await.is_err() {
                    break;
                }
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!("WebSocket error from {}: {}", peer_addr, e);
                break;
            }
        }
    }

    tracing::debug!("Control connection with {} terminated", peer_addr);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breaks::Phase;

    fn waiting(countdown: u64) -> StatusSnapshot {
        StatusSnapshot {
            phase: Phase::Waiting,
            paused: false,
            countdown,
            label: Some(format!("Time until next break: {} seconds", countdown)),
        }
    }

    #[test]
    fn test_status_request_reads_snapshot() {
        let (tx, mut rx) = create_command_channel();
        let (_status_tx, status_rx) = watch::channel(waiting(42));

        let response = handle_request(r#"{"action":"status"}"#, &tx, &status_rx);
        assert!(response.success);
        assert_eq!(response.status.unwrap().countdown, 42);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_commands_are_forwarded() {
        let (tx, mut rx) = create_command_channel();
        let (_status_tx, status_rx) = watch::channel(waiting(5));

        assert!(handle_request(r#"{"action":"toggle_pause"}"#, &tx, &status_rx).success);
        assert!(handle_request(r#"{"action":"exit"}"#, &tx, &status_rx).success);
        assert_eq!(rx.try_recv().unwrap(), ControlCommand::TogglePause);
        assert_eq!(rx.try_recv().unwrap(), ControlCommand::Exit);
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        let (tx, mut rx) = create_command_channel();
        let (_status_tx, status_rx) = watch::channel(waiting(5));

        let response = handle_request(r#"{"action":"snooze"}"#, &tx, &status_rx);
        assert!(!response.success);
        assert!(response.message.unwrap().starts_with("Parse error"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_closed_loop_reports_failure() {
        let (tx, rx) = create_command_channel();
        drop(rx);
        let (_status_tx, status_rx) = watch::channel(waiting(5));

        assert!(!handle_request(r#"{"action":"exit"}"#, &tx, &status_rx).success);
    }

    #[tokio::test]
    async fn test_websocket_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, mut rx) = create_command_channel();
        let (_status_tx, status_rx) = watch::channel(waiting(9));
        tokio::spawn(serve(listener, tx, status_rx));

        let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{}", addr))
            .await
            .unwrap();
        ws.send(Message::Text(r#"{"action":"toggle_pause"}"#.to_string()))
            .await
            .unwrap();

        let reply = match ws.next().await {
            Some(Ok(Message::Text(text))) => text,
            other => panic!("unexpected reply: {:?}", other),
        };
        let reply: serde_json::Value = serde_json::from_str(&reply).unwrap();
        assert_eq!(reply["success"], true);
        assert_eq!(reply["status"]["countdown"], 9);
        assert_eq!(reply["status"]["phase"], "waiting");

        assert_eq!(rx.recv().await, Some(ControlCommand::TogglePause));
    }
}
