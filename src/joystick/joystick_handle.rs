use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::JoystickSettings;
use crate::joystick::connection::{DeviceLink, LinkError, OpenOutcome, Streaming, Waiting};
use crate::joystick::event::JoystickEvent;
use crate::joystick::notifier::ChangeNotifier;
use crate::joystick::state::StateMirror;

/// Errors surfaced by the public session API.
///
/// Device absence, open failures, and read failures are never errors: the
/// worker retries them forever and the only observable signals are
/// `ConnectionChanged` events and default/stale accessor values.
#[derive(Debug, thiserror::Error)]
pub enum JoystickError {
    #[error("Failed to start joystick session: {0}")]
    InitializationError(String),
}

/// Public handle for one joystick session.
///
/// Spawning the handle starts the background worker immediately; there is no
/// separate start step. The worker owns all device I/O and is the sole
/// writer of the state mirror, while any number of caller threads poll the
/// accessors concurrently.
#[derive(Debug)]
pub struct JoystickHandle {
    mirror: Arc<StateMirror>,
    notifier: Arc<ChangeNotifier>,
    cancel: CancellationToken,
    worker: Option<JoinHandle<()>>,
    shutdown_timeout: Duration,
}

impl JoystickHandle {
    /// Spawn the session worker. Must be called from within a tokio
    /// runtime; that is the only failure mode.
    pub fn spawn(settings: Option<JoystickSettings>) -> Result<Self, JoystickError> {
        let settings = settings.unwrap_or_default();
        info!(
            "Spawning joystick session for {}",
            settings.device_path.display()
        );

        if tokio::runtime::Handle::try_current().is_err() {
            return Err(JoystickError::InitializationError(
                "no tokio runtime available".to_string(),
            ));
        }

        let mirror = Arc::new(StateMirror::new());
        let notifier = Arc::new(ChangeNotifier::new(settings.event_capacity));
        let cancel = CancellationToken::new();
        let shutdown_timeout = settings.shutdown_timeout();

        let worker = tokio::spawn(run_device_loop(
            settings,
            Arc::clone(&mirror),
            Arc::clone(&notifier),
            cancel.clone(),
        ));
        debug!("Joystick worker task spawned");

        Ok(Self {
            mirror,
            notifier,
            cancel,
            worker: Some(worker),
            shutdown_timeout,
        })
    }

    /// Subscribe to change events. Events are sent by the worker without
    /// blocking; a receiver that falls behind the channel capacity observes
    /// `Lagged` and continues from the oldest retained event.
    pub fn subscribe(&self) -> broadcast::Receiver<JoystickEvent> {
        self.notifier.subscribe()
    }

    /// Current mirrored state of a button; `false` when never observed.
    pub fn button_pressed(&self, address: u8) -> bool {
        self.mirror.button_pressed(address)
    }

    /// Current mirrored position of an axis; `0` when never observed.
    pub fn axis_value(&self, address: u8) -> i16 {
        self.mirror.axis_value(address)
    }

    /// Whether the device stream is currently established. While `false`,
    /// accessors keep returning the last-known (stale) values.
    pub fn is_connected(&self) -> bool {
        self.mirror.is_connected()
    }

    /// Stop the session. Idempotent: cancels the worker, waits up to the
    /// configured shutdown timeout for it to exit, and proceeds regardless
    /// of the outcome.
    pub async fn shutdown(&mut self) {
        self.cancel.cancel();
        let Some(worker) = self.worker.take() else {
            return;
        };
        match tokio::time::timeout(self.shutdown_timeout, worker).await {
            Ok(Ok(())) => info!("Joystick session stopped"),
            Ok(Err(e)) => warn!("Joystick worker ended abnormally: {}", e),
            Err(_) => warn!(
                "Joystick worker did not stop within {:?}, detaching",
                self.shutdown_timeout
            ),
        }
    }
}

impl Drop for JoystickHandle {
    fn drop(&mut self) {
        // Dropping without shutdown still stops the worker, just without
        // waiting for it.
        self.cancel.cancel();
    }
}

/// Worker entry point: drive the reconnect state machine until cancelled.
async fn run_device_loop(
    settings: JoystickSettings,
    mirror: Arc<StateMirror>,
    notifier: Arc<ChangeNotifier>,
    cancel: CancellationToken,
) {
    info!(
        "Joystick worker started for {}",
        settings.device_path.display()
    );
    let mut link = DeviceLink::create(settings);
    loop {
        let opening = match link.await_device(&cancel).await {
            Ok(opening) => opening,
            Err(_) => break,
        };
        let waiting = match opening.open().await {
            OpenOutcome::Up(streaming) => {
                match stream_records(streaming, &mirror, &notifier, &cancel).await {
                    Ok(waiting) => waiting,
                    Err(_) => break,
                }
            }
            // Open failure is swallowed and funneled back into the wait.
            OpenOutcome::Down(waiting) => waiting,
        };
        if waiting.cooldown(&cancel).await.is_err() {
            break;
        }
        link = waiting;
    }
    info!("Joystick worker stopped");
}

/// Pump records from an established stream until it fails or the session is
/// cancelled. Any read failure, including a short read, is treated
/// uniformly as a disconnect and hands the link back for the retry loop.
async fn stream_records(
    mut link: DeviceLink<Streaming>,
    mirror: &StateMirror,
    notifier: &ChangeNotifier,
    cancel: &CancellationToken,
) -> Result<DeviceLink<Waiting>, LinkError> {
    notifier.announce_connection(mirror, true);
    loop {
        match link.next_record(cancel).await {
            Ok(record) => notifier.apply(&record, mirror),
            Err(LinkError::Cancelled) => return Err(LinkError::Cancelled),
            Err(LinkError::ReadError(e)) => {
                warn!("Device read failed, treating as disconnected: {}", e);
                notifier.announce_connection(mirror, false);
                return Ok(link.disconnect());
            }
        }
    }
}
