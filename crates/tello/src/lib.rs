//! Ryze/DJI Tello access: the plain-text UDP command channel and the
//! H.264 video feed the drone pushes once `streamon` has been acknowledged.

mod command;
pub use command::*;

mod video;
pub use video::*;

use std::{net::SocketAddr, time::Duration};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct TelloConfig {
    /// Where the drone listens for SDK commands.
    pub drone_addr: SocketAddr,
    /// Local address the command socket binds to. Responses arrive here.
    pub local_addr: SocketAddr,
    #[serde(with = "duration_millis")]
    pub response_timeout: Duration,
    /// FFmpeg input URL of the video feed.
    pub video_url: String,
    /// The feed carries no usable rate, so the recording uses this one.
    pub frame_rate: u32,
    #[serde(with = "duration_millis")]
    pub video_timeout: Duration,
}

impl TelloConfig {
    pub const DEFAULT_DRONE_ADDR: &'static str = "192.168.10.1:8889";
    pub const DEFAULT_LOCAL_ADDR: &'static str = "0.0.0.0:8889";
    pub const DEFAULT_VIDEO_URL: &'static str = "udp://0.0.0.0:11111";
}

impl Default for TelloConfig {
    fn default() -> Self {
        Self {
            drone_addr: ([192, 168, 10, 1], 8889).into(),
            local_addr: ([0, 0, 0, 0], 8889).into(),
            response_timeout: Duration::from_secs(7),
            video_url: Self::DEFAULT_VIDEO_URL.to_string(),
            frame_rate: 30,
            video_timeout: Duration::from_secs(5),
        }
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_addresses_match_constants() {
        let config = TelloConfig::default();

        assert_eq!(
            config.drone_addr,
            TelloConfig::DEFAULT_DRONE_ADDR.parse().unwrap()
        );
        assert_eq!(
            config.local_addr,
            TelloConfig::DEFAULT_LOCAL_ADDR.parse().unwrap()
        );
        assert_eq!(config.frame_rate, 30);
    }
}
