use std::fmt;

/// Size of a binary motion frame: three f64s.
pub const MOTION_FRAME_LEN: usize = 24;

/// Connection state of the orientation socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SocketState {
    #[default]
    Unconnected,
    Connecting,
    Connected,
}

impl fmt::Display for SocketState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SocketState::Unconnected => "unconnected",
            SocketState::Connecting => "connecting",
            SocketState::Connected => "connected",
        })
    }
}

/// Posted by the socket I/O thread, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketEvent {
    StateChanged(SocketState),
    BinaryMessage(Vec<u8>),
}

/// Head orientation from the remote, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionSample {
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
}

impl MotionSample {
    /// Reinterpret a binary frame as three native-endian doubles.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != MOTION_FRAME_LEN {
            return None;
        }
        let read = |i: usize| {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&bytes[i * 8..(i + 1) * 8]);
            f64::from_ne_bytes(raw)
        };
        Some(Self {
            yaw: read(0),
            pitch: read(1),
            roll: read(2),
        })
    }

    pub fn to_bytes(&self) -> [u8; MOTION_FRAME_LEN] {
        let mut out = [0u8; MOTION_FRAME_LEN];
        for (i, v) in [self.yaw, self.pitch, self.roll].iter().enumerate() {
            out[i * 8..(i + 1) * 8].copy_from_slice(&v.to_ne_bytes());
        }
        out
    }
}
