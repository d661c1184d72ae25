use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use super::connection;
use super::types::{MotionSample, SocketEvent, SocketState};
use crate::events::EventPoster;
use crate::timer::Timer;
use crate::viewpoint::MotionSource;

pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_secs(1);

/// Long-lived connection to the orientation server.
///
/// Lives on the event context. Socket I/O runs on one thread per connection
/// attempt; each attempt gets a new generation number and events from older
/// generations are ignored, so an aborted attempt can never resurrect state.
pub struct OrientationClient {
    poster: EventPoster,
    url: Option<String>,
    state: SocketState,
    /// True from `connect()` until `disconnect()`.
    reconnect_expected: bool,
    reconnect: Timer,
    generation: u64,
    shutdown: Option<Arc<AtomicBool>>,
    threads: Vec<JoinHandle<()>>,
    latest: Option<MotionSample>,
    last_returned: Option<MotionSample>,
}

impl OrientationClient {
    pub fn new(poster: EventPoster, reconnect_interval: Duration) -> Self {
        Self {
            poster,
            url: None,
            state: SocketState::Unconnected,
            reconnect_expected: false,
            reconnect: Timer::single_shot(reconnect_interval),
            generation: 0,
            shutdown: None,
            threads: Vec::new(),
            latest: None,
            last_returned: None,
        }
    }

    pub fn state(&self) -> SocketState {
        self.state
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Start reaching `url`. Idempotent while already connecting or connected
    /// to the same URL; a different URL replaces the current connection.
    /// Returns the new state if it changed.
    pub fn connect(&mut self, url: &str) -> Option<SocketState> {
        let same_url = self.url.as_deref() == Some(url);
        if same_url && self.reconnect_expected && self.state != SocketState::Unconnected {
            return None;
        }
        if !same_url {
            self.retire_attempt();
            self.latest = None;
            self.last_returned = None;
        }
        self.url = Some(url.to_string());
        self.reconnect_expected = true;
        self.reconnect.stop();
        self.open_attempt()
    }

    /// Close the connection and stop reconnecting; aborts an attempt in flight.
    pub fn disconnect(&mut self) -> Option<SocketState> {
        self.reconnect_expected = false;
        self.reconnect.stop();
        self.retire_attempt();
        self.set_state(SocketState::Unconnected)
    }

    /// Handle an event posted by a socket thread.
    pub fn on_socket_event(
        &mut self,
        generation: u64,
        event: SocketEvent,
        now: Instant,
    ) -> Option<SocketState> {
        if generation != self.generation || self.shutdown.is_none() {
            log::trace!("Dropping event from stale connection {generation}");
            return None;
        }
        match event {
            SocketEvent::StateChanged(state) => {
                match state {
                    SocketState::Connected => self.reconnect.stop(),
                    SocketState::Unconnected if self.reconnect_expected => {
                        log::debug!(
                            "Orientation socket lost, retrying in {:?}",
                            self.reconnect.interval()
                        );
                        self.reconnect.start(now);
                    }
                    _ => {}
                }
                self.set_state(state)
            }
            SocketEvent::BinaryMessage(bytes) => {
                match MotionSample::from_bytes(&bytes) {
                    Some(sample) => self.latest = Some(sample),
                    None => log::debug!("Ignoring {}-byte binary frame", bytes.len()),
                }
                None
            }
        }
    }

    /// Fire the reconnect timer if due.
    pub fn poll_timers(&mut self, now: Instant) -> Option<SocketState> {
        if self.reconnect.poll(now) && self.reconnect_expected {
            return self.open_attempt();
        }
        None
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.reconnect.deadline()
    }

    fn open_attempt(&mut self) -> Option<SocketState> {
        let Some(url) = self.url.clone() else {
            return None;
        };
        self.retire_attempt();
        self.reap_threads();

        self.generation += 1;
        let shutdown = Arc::new(AtomicBool::new(false));
        match connection::spawn_connection(
            url.clone(),
            self.generation,
            self.poster.clone(),
            shutdown.clone(),
        ) {
            Ok(handle) => {
                log::info!("Connecting to orientation server {url}");
                self.threads.push(handle);
                self.shutdown = Some(shutdown);
                self.set_state(SocketState::Connecting)
            }
            Err(e) => {
                log::error!("Failed to start orientation connection: {e}");
                self.reconnect.start(Instant::now());
                self.set_state(SocketState::Unconnected)
            }
        }
    }

    fn retire_attempt(&mut self) {
        if let Some(flag) = self.shutdown.take() {
            flag.store(true, Ordering::Relaxed);
        }
    }

    /// Join threads that already exited; the rest finish on their own.
    fn reap_threads(&mut self) {
        let (done, running): (Vec<_>, Vec<_>) =
            self.threads.drain(..).partition(|h| h.is_finished());
        for handle in done {
            let _ = handle.join();
        }
        self.threads = running;
    }

    fn set_state(&mut self, state: SocketState) -> Option<SocketState> {
        if self.state == state {
            return None;
        }
        log::info!("Orientation socket {} -> {}", self.state, state);
        self.state = state;
        Some(state)
    }
}

impl MotionSource for OrientationClient {
    /// The most recent sample, only if it differs from the one returned last.
    fn latest_motion(&mut self) -> Option<MotionSample> {
        match self.latest {
            Some(sample) if self.last_returned != Some(sample) => {
                self.last_returned = Some(sample);
                Some(sample)
            }
            _ => None,
        }
    }
}

impl Drop for OrientationClient {
    fn drop(&mut self) {
        self.reconnect_expected = false;
        self.retire_attempt();
        for handle in self.threads.drain(..) {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::thread;

    use tungstenite::Message;

    use super::*;
    use crate::events::{CoreEvent, EventBus};

    fn frame(yaw: f64, pitch: f64, roll: f64) -> Vec<u8> {
        MotionSample { yaw, pitch, roll }.to_bytes().to_vec()
    }

    /// Drain bus events into the client until `pred` holds or the timeout passes.
    fn pump_until(
        bus: &EventBus,
        client: &mut OrientationClient,
        timeout: Duration,
        mut pred: impl FnMut(&OrientationClient, &[SocketState]) -> bool,
    ) -> Vec<SocketState> {
        let end = Instant::now() + timeout;
        let mut seen = Vec::new();
        while Instant::now() < end && !pred(client, &seen) {
            let deadline = client
                .next_deadline()
                .map_or(end, |d| d.min(end))
                .min(Instant::now() + Duration::from_millis(20));
            if let Some(CoreEvent::Socket { generation, event }) = bus.next_before(Some(deadline)) {
                if let Some(s) = client.on_socket_event(generation, event, Instant::now()) {
                    seen.push(s);
                }
            }
            if let Some(s) = client.poll_timers(Instant::now()) {
                seen.push(s);
            }
        }
        seen
    }

    #[test]
    fn dedups_identical_samples() {
        let bus = EventBus::new();
        let mut c = OrientationClient::new(bus.poster(), DEFAULT_RECONNECT_INTERVAL);
        c.shutdown = Some(Arc::new(AtomicBool::new(false)));
        let g = c.generation;
        assert!(c.latest_motion().is_none());

        c.on_socket_event(g, SocketEvent::BinaryMessage(frame(1.0, 2.0, 3.0)), Instant::now());
        assert_eq!(c.latest_motion(), Some(MotionSample { yaw: 1.0, pitch: 2.0, roll: 3.0 }));
        assert!(c.latest_motion().is_none(), "second poll sees nothing new");

        c.on_socket_event(g, SocketEvent::BinaryMessage(frame(1.0, 2.0, 3.0)), Instant::now());
        assert!(c.latest_motion().is_none(), "identical sample suppressed");

        // Last writer wins between polls
        c.on_socket_event(g, SocketEvent::BinaryMessage(frame(4.0, 0.0, 0.0)), Instant::now());
        c.on_socket_event(g, SocketEvent::BinaryMessage(frame(5.0, 0.0, 0.0)), Instant::now());
        assert_eq!(c.latest_motion().map(|s| s.yaw), Some(5.0));
    }

    #[test]
    fn malformed_frames_are_ignored() {
        let bus = EventBus::new();
        let mut c = OrientationClient::new(bus.poster(), DEFAULT_RECONNECT_INTERVAL);
        c.shutdown = Some(Arc::new(AtomicBool::new(false)));
        let g = c.generation;
        c.on_socket_event(g, SocketEvent::BinaryMessage(vec![1, 2, 3]), Instant::now());
        assert!(c.latest_motion().is_none());
    }

    #[test]
    fn stale_generation_is_ignored() {
        let bus = EventBus::new();
        let mut c = OrientationClient::new(bus.poster(), DEFAULT_RECONNECT_INTERVAL);
        c.shutdown = Some(Arc::new(AtomicBool::new(false)));
        c.generation = 3;
        let changed = c.on_socket_event(
            2,
            SocketEvent::StateChanged(SocketState::Connected),
            Instant::now(),
        );
        assert!(changed.is_none());
        assert_eq!(c.state(), SocketState::Unconnected);
    }

    #[test]
    fn loss_schedules_reconnect_only_when_expected() {
        let bus = EventBus::new();
        let mut c = OrientationClient::new(bus.poster(), Duration::from_millis(1000));
        c.shutdown = Some(Arc::new(AtomicBool::new(false)));
        c.url = Some("ws://127.0.0.1:9".into());
        c.state = SocketState::Connected;
        let g = c.generation;
        let t0 = Instant::now();

        c.reconnect_expected = true;
        c.on_socket_event(g, SocketEvent::StateChanged(SocketState::Unconnected), t0);
        assert_eq!(c.next_deadline(), Some(t0 + Duration::from_millis(1000)));

        c.disconnect();
        assert!(c.next_deadline().is_none());
        assert!(c.poll_timers(t0 + Duration::from_secs(5)).is_none());
    }

    #[test]
    fn connect_is_idempotent_while_connecting() {
        let bus = EventBus::new();
        let mut c = OrientationClient::new(bus.poster(), DEFAULT_RECONNECT_INTERVAL);
        // Reserved port: the attempt fails, but only after connect() returns
        assert_eq!(c.connect("ws://127.0.0.1:9"), Some(SocketState::Connecting));
        let g = c.generation();
        assert_eq!(c.connect("ws://127.0.0.1:9"), None);
        assert_eq!(c.generation(), g);
        c.disconnect();
        assert_eq!(c.state(), SocketState::Unconnected);
    }

    #[test]
    fn receives_frames_and_reconnects_after_server_restart() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let url = format!("ws://{addr}");

        // First server session: send one sample, then drop the connection.
        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut ws = tungstenite::accept(stream).unwrap();
            ws.send(Message::Text("hello".into())).unwrap();
            ws.send(Message::Binary(frame(10.0, 0.0, 0.0).into())).unwrap();
            thread::sleep(Duration::from_millis(200));
            drop(ws);
            listener
        });

        let bus = EventBus::new();
        let mut c = OrientationClient::new(bus.poster(), Duration::from_millis(300));
        let mut states = vec![c.connect(&url).unwrap()];
        states.extend(pump_until(&bus, &mut c, Duration::from_secs(5), |c, _| {
            c.latest.is_some()
        }));
        assert_eq!(c.latest_motion().map(|s| s.yaw), Some(10.0));

        states.extend(pump_until(&bus, &mut c, Duration::from_secs(5), |_, seen| {
            seen.contains(&SocketState::Unconnected)
        }));

        // Second session on the same port
        let listener = server.join().unwrap();
        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut ws = tungstenite::accept(stream).unwrap();
            ws.send(Message::Binary(frame(20.0, 0.0, 0.0).into())).unwrap();
            thread::sleep(Duration::from_millis(300));
        });

        states.extend(pump_until(&bus, &mut c, Duration::from_secs(5), |c, _| {
            c.state() == SocketState::Connected && c.latest.map(|s| s.yaw) == Some(20.0)
        }));
        assert_eq!(c.state(), SocketState::Connected);
        assert_eq!(c.latest_motion().map(|s| s.yaw), Some(20.0));

        assert_eq!(
            &states[..3],
            &[SocketState::Connecting, SocketState::Connected, SocketState::Unconnected]
        );
        assert!(
            states[3..]
                .windows(2)
                .any(|w| w == [SocketState::Connecting, SocketState::Connected])
        );

        c.disconnect();
        server.join().unwrap();
    }

    #[test]
    fn disconnect_cancels_attempt_in_flight() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        listener.set_nonblocking(true).unwrap();

        // Accept every client until stopped; returns how many connected.
        let stop = Arc::new(AtomicBool::new(false));
        let server = {
            let stop = stop.clone();
            thread::spawn(move || {
                let mut sessions = Vec::new();
                let mut accepted = 0;
                while !stop.load(Ordering::Relaxed) {
                    match listener.accept() {
                        Ok((stream, _)) => {
                            accepted += 1;
                            stream.set_nonblocking(false).unwrap();
                            if let Ok(ws) = tungstenite::accept(stream) {
                                sessions.push(ws);
                            }
                        }
                        Err(_) => thread::sleep(Duration::from_millis(10)),
                    }
                }
                accepted
            })
        };

        let interval = Duration::from_millis(200);
        let bus = EventBus::new();
        let mut c = OrientationClient::new(bus.poster(), interval);
        assert_eq!(c.connect(&url), Some(SocketState::Connecting));
        assert_eq!(c.disconnect(), Some(SocketState::Unconnected));

        let window = interval * 2 + Duration::from_millis(100);
        let states = pump_until(&bus, &mut c, window, |_, _| false);
        assert!(states.is_empty(), "no state change after disconnect: {states:?}");
        assert_eq!(c.state(), SocketState::Unconnected);
        assert!(c.next_deadline().is_none());

        stop.store(true, Ordering::Relaxed);
        let accepted = server.join().unwrap();
        assert!(accepted <= 1, "no reconnect attempt reached the server ({accepted})");
    }
}
