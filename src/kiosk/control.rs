//! Remote kiosk control over a minimal local HTTP listener.
//!
//! - `GET /health` → `200 ok`
//! - `POST /control` → JSON `{enabled?, message?, action?, forceReload?}`
//! - `POST /toggle` → same as a tap on the screen

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::player::KioskCommand;
use crate::error::Result;

const MAX_REQUEST_BYTES: usize = 64 * 1024;
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Payload pushed by the remote control channel.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ControlAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_reload: Option<bool>,
}

impl ControlMessage {
    pub fn requests_reload(&self) -> bool {
        self.action == Some(ControlAction::Restart) || self.force_reload == Some(true)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlAction {
    Restart,
    /// Actions this kiosk does not know are ignored.
    #[serde(other)]
    Unknown,
}

/// Bind the control listener and serve it in the background.
///
/// Returns the bound address (useful with port 0) and the server task.
pub async fn start_control_server(
    addr: &str,
    commands: mpsc::Sender<KioskCommand>,
) -> Result<(SocketAddr, JoinHandle<()>)> {
    let listener = TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        let listener = &listener;
        accept_loop(move || listener.accept(), commands).await;
    });

    Ok((local, handle))
}

async fn accept_loop<A, F>(mut accept: A, commands: mpsc::Sender<KioskCommand>)
where
    A: FnMut() -> F,
    F: Future<Output = std::io::Result<(TcpStream, SocketAddr)>>,
{
    loop {
        let (stream, peer) = match accept().await {
            Ok(conn) => conn,
            Err(e) => {
                // e.g. EMFILE: retrying at once would spin.
                warn!(%e, "control accept failed");
                tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                continue;
            }
        };

        let tx = commands.clone();
        tokio::spawn(async move {
            debug!(%peer, "control connection");
            handle_connection(stream, tx).await;
        });
    }
}

struct Request {
    line: String,
    body: Vec<u8>,
}

/// Read the request head, then as much body as `Content-Length` announces.
async fn read_request(stream: &mut TcpStream) -> Option<Request> {
    let mut buf = Vec::with_capacity(4096);
    let mut chunk = [0u8; 4096];

    let head_end = loop {
        if let Some(pos) = find_subslice(&buf, b"\r\n\r\n") {
            break pos;
        }
        if buf.len() > MAX_REQUEST_BYTES {
            return None;
        }
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return None,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let content_length = head
        .lines()
        .skip(1)
        .filter_map(|l| l.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0)
        .min(MAX_REQUEST_BYTES);

    let mut body = buf[head_end + 4..].to_vec();
    while body.len() < content_length {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => body.extend_from_slice(&chunk[..n]),
        }
    }
    body.truncate(content_length);

    Some(Request {
        line: head.lines().next().unwrap_or("").to_string(),
        body,
    })
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn response(status: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\nAccess-Control-Allow-Origin: *\r\n\r\n{body}",
        body.len()
    )
}

async fn handle_connection(mut stream: TcpStream, tx: mpsc::Sender<KioskCommand>) {
    let Some(request) = read_request(&mut stream).await else {
        return;
    };

    let reply = if request.line.starts_with("GET /health") {
        response("200 OK", "ok")
    } else if request.line.starts_with("POST /control") {
        match serde_json::from_slice::<ControlMessage>(&request.body) {
            Ok(message) => forward(&tx, KioskCommand::Control(message)).await,
            Err(e) => {
                warn!(%e, "rejected control payload");
                response("400 Bad Request", "invalid control payload")
            }
        }
    } else if request.line.starts_with("POST /toggle") {
        forward(&tx, KioskCommand::Toggle).await
    } else if request.line.starts_with("OPTIONS") {
        "HTTP/1.1 204 No Content\r\nAccess-Control-Allow-Origin: *\r\nAccess-Control-Allow-Methods: GET, POST, OPTIONS\r\nAccess-Control-Allow-Headers: Content-Type\r\nConnection: close\r\n\r\n".to_string()
    } else {
        response("404 Not Found", "not found")
    };

    let _ = stream.write_all(reply.as_bytes()).await;
}

async fn forward(tx: &mpsc::Sender<KioskCommand>, command: KioskCommand) -> String {
    match tx.send(command).await {
        Ok(()) => response("200 OK", "ok"),
        Err(_) => response("503 Service Unavailable", "player stopped"),
    }
}
