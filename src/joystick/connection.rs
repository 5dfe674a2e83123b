use statum::{machine, state};
use tokio::fs::OpenOptions;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::JoystickSettings;
use crate::joystick::event::{EventRecord, RECORD_SIZE};

/// Errors inside the reconnect loop. Neither variant crosses the public
/// boundary: `Cancelled` ends the worker cleanly and `ReadError` feeds the
/// disconnect/retry transition.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("Device read failed: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Operation cancelled")]
    Cancelled,
}

/// Connector states: probe for the device file, open it, stream records.
#[state]
#[derive(Debug, Clone)]
pub enum LinkState {
    Waiting,
    Opening,
    Streaming,
}

/// Owns the device handle and drives the reconnect state machine
/// `Waiting → Opening → Streaming → (I/O failure) → Waiting → …`.
///
/// The retry interval is uniform and backoff-free for both the absence poll
/// and the post-failure cooldown. Every wait and read observes cancellation
/// while suspended, not only after it completes.
#[machine]
#[derive(Debug)]
pub struct DeviceLink<S: LinkState> {
    settings: JoystickSettings,
    stream: Option<tokio::fs::File>,
}

/// Result of an open attempt. Open failures are swallowed, never surfaced:
/// permissions, busy devices, and unplug races all funnel back to `Waiting`.
pub enum OpenOutcome {
    Up(DeviceLink<Streaming>),
    Down(DeviceLink<Waiting>),
}

impl DeviceLink<Waiting> {
    pub fn create(settings: JoystickSettings) -> Self {
        Self::new(settings, None)
    }

    /// Poll for device-file existence at the retry interval until it shows
    /// up or the session is cancelled. Checks before the first wait, so a
    /// present device connects without delay.
    pub async fn await_device(
        self,
        cancel: &CancellationToken,
    ) -> Result<DeviceLink<Opening>, LinkError> {
        loop {
            if cancel.is_cancelled() {
                return Err(LinkError::Cancelled);
            }
            if tokio::fs::try_exists(&self.settings.device_path)
                .await
                .unwrap_or(false)
            {
                debug!("Device file {} present", self.settings.device_path.display());
                return Ok(self.transition());
            }
            debug!(
                "Device file {} absent, next probe in {:?}",
                self.settings.device_path.display(),
                self.settings.retry_interval()
            );
            tokio::select! {
                _ = cancel.cancelled() => return Err(LinkError::Cancelled),
                _ = tokio::time::sleep(self.settings.retry_interval()) => {}
            }
        }
    }

    /// Uniform wait applied after a failed open or a lost connection before
    /// the next probe.
    pub async fn cooldown(&self, cancel: &CancellationToken) -> Result<(), LinkError> {
        tokio::select! {
            _ = cancel.cancelled() => Err(LinkError::Cancelled),
            _ = tokio::time::sleep(self.settings.retry_interval()) => Ok(()),
        }
    }
}

impl DeviceLink<Opening> {
    /// Try to open the device read-only in blocking mode. Other processes
    /// may keep reading it concurrently.
    pub async fn open(mut self) -> OpenOutcome {
        match OpenOptions::new()
            .read(true)
            .open(&self.settings.device_path)
            .await
        {
            Ok(file) => {
                info!("Opened device {}", self.settings.device_path.display());
                self.stream = Some(file);
                OpenOutcome::Up(self.transition())
            }
            Err(e) => {
                debug!(
                    "Failed to open {} (will retry): {}",
                    self.settings.device_path.display(),
                    e
                );
                OpenOutcome::Down(self.transition())
            }
        }
    }
}

impl DeviceLink<Streaming> {
    /// Read exactly one wire record, decoded. A short read or any other I/O
    /// error reports `ReadError`; cancellation is observed while the read is
    /// in flight.
    pub async fn next_record(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<EventRecord, LinkError> {
        let Some(stream) = self.stream.as_mut() else {
            // Unreachable by construction: the stream is set on open.
            return Err(LinkError::ReadError(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "device stream missing",
            )));
        };
        let mut buf = [0u8; RECORD_SIZE];
        tokio::select! {
            _ = cancel.cancelled() => Err(LinkError::Cancelled),
            read = stream.read_exact(&mut buf) => {
                read?;
                Ok(EventRecord::parse(&buf))
            }
        }
    }

    /// Drop the device handle and fall back to probing.
    pub fn disconnect(mut self) -> DeviceLink<Waiting> {
        self.stream = None;
        self.transition()
    }
}
