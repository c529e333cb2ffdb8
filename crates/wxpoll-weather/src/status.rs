/// Connection status reported for the collector device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceStatus {
    #[default]
    Disconnected,
    Ready,
    Connecting,
    Connected,
    Disconnecting,
}

impl DeviceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "DISCONNECTED",
            Self::Ready => "READY",
            Self::Connecting => "CONNECTING",
            Self::Connected => "CONNECTED",
            Self::Disconnecting => "DISCONNECTING",
        }
    }
}

impl std::fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives device status changes
pub trait StatusListener: Send + Sync {
    fn update_status(&self, device: &str, status: DeviceStatus);
}

/// Logs status changes
#[derive(Debug, Clone, Copy, Default)]
pub struct LogStatusListener;

impl StatusListener for LogStatusListener {
    fn update_status(&self, device: &str, status: DeviceStatus) {
        tracing::info!("{} status: {}", device, status);
    }
}
