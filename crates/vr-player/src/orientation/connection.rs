use std::net::{TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tungstenite::client::IntoClientRequest;
use tungstenite::protocol::Message;

use super::types::{SocketEvent, SocketState};
use crate::events::EventPoster;

/// Upper bound for TCP connect and the WebSocket handshake.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
/// Read timeout so the loop can observe the shutdown flag.
const READ_POLL: Duration = Duration::from_millis(100);

/// Spawn one connection attempt. The thread posts `Connected` once the
/// handshake completes, forwards binary frames in arrival order, and always
/// finishes by posting `Unconnected`.
pub fn spawn_connection(
    url: String,
    generation: u64,
    poster: EventPoster,
    shutdown: Arc<AtomicBool>,
) -> anyhow::Result<JoinHandle<()>> {
    let handle = thread::Builder::new()
        .name(format!("vr-player-orientation-{generation}"))
        .spawn(move || {
            if let Err(e) = run_connection(&url, generation, &poster, &shutdown) {
                log::debug!("Orientation connection to {url} ended: {e}");
            }
            poster.socket(generation, SocketEvent::StateChanged(SocketState::Unconnected));
        })?;
    Ok(handle)
}

fn run_connection(
    url: &str,
    generation: u64,
    poster: &EventPoster,
    shutdown: &AtomicBool,
) -> anyhow::Result<()> {
    let request = url.into_client_request()?;
    let uri = request.uri();
    let host = uri
        .host()
        .ok_or_else(|| anyhow::anyhow!("URL '{url}' has no host"))?
        .trim_start_matches('[')
        .trim_end_matches(']')
        .to_string();
    let port = uri.port_u16().unwrap_or(80);
    if uri.scheme_str() == Some("wss") {
        anyhow::bail!("secure WebSocket URLs are not supported");
    }

    let addr = (host.as_str(), port)
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| anyhow::anyhow!("could not resolve {host}"))?;
    let stream = TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT)?;
    if shutdown.load(Ordering::Relaxed) {
        anyhow::bail!("connection attempt aborted");
    }
    stream.set_read_timeout(Some(CONNECT_TIMEOUT))?;
    stream.set_nodelay(true)?;

    let (mut ws, _response) = tungstenite::client(request, stream)
        .map_err(|e| anyhow::anyhow!("WebSocket handshake failed: {e}"))?;
    if shutdown.load(Ordering::Relaxed) {
        let _ = ws.close(None);
        anyhow::bail!("connection attempt aborted");
    }
    ws.get_mut().set_read_timeout(Some(READ_POLL))?;

    log::info!("Orientation socket connected to {url}");
    poster.socket(generation, SocketEvent::StateChanged(SocketState::Connected));

    loop {
        if shutdown.load(Ordering::Relaxed) {
            let _ = ws.close(None);
            let _ = ws.flush();
            break;
        }

        match ws.read() {
            Ok(Message::Binary(data)) => {
                poster.socket(generation, SocketEvent::BinaryMessage(data.to_vec()));
            }
            Ok(Message::Close(_)) => {
                log::info!("Orientation server closed the connection");
                break;
            }
            Ok(_) => {} // Text, ping/pong (pongs are queued by tungstenite), raw frames
            Err(tungstenite::Error::Io(ref e))
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                // Timeout: flush any queued pong and check the shutdown flag
                let _ = ws.flush();
            }
            Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                break;
            }
            Err(e) => {
                log::info!("Orientation socket read error: {e}");
                break;
            }
        }
    }
    Ok(())
}
