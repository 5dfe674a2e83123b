use chrono::Local;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::joystick::event::{EventRecord, JoystickEvent};
use crate::joystick::state::StateMirror;

/// Applies decoded records to the state mirror and broadcasts an event for
/// every genuine transition.
///
/// Called only from the session worker. Subscribers receive events on their
/// own receiver tasks; a subscriber that falls behind the channel capacity
/// observes `Lagged` instead of slowing the worker down.
#[derive(Debug)]
pub(crate) struct ChangeNotifier {
    sender: broadcast::Sender<JoystickEvent>,
}

impl ChangeNotifier {
    pub fn new(capacity: usize) -> Self {
        // broadcast::channel rejects a zero capacity.
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JoystickEvent> {
        self.sender.subscribe()
    }

    /// Apply one decoded record to the mirror, firing change events as
    /// warranted.
    ///
    /// Init records are absorbed silently as baseline: the relevant channels
    /// are marked seen and forced to their defaults, and nothing is
    /// broadcast. A record carrying neither channel bit is a pure sync
    /// marker and is skipped.
    pub fn apply(&self, record: &EventRecord, mirror: &StateMirror) {
        if record.is_init() {
            if record.is_button() {
                mirror.absorb_init_button(record.address);
            }
            if record.is_axis() {
                mirror.absorb_init_axis(record.address);
            }
            debug!(
                "Absorbed init record: address={} flags={:#04x}",
                record.address, record.flags
            );
            return;
        }

        let timestamp = Local::now();

        if record.is_button() {
            let pressed = record.button_pressed();
            if mirror.apply_button(record.address, pressed) {
                debug!(
                    "Button {} -> {} at {}",
                    record.address,
                    pressed,
                    timestamp.format("%H:%M:%S.%3f")
                );
                self.send(JoystickEvent::ButtonChanged {
                    address: record.address,
                    pressed,
                    timestamp,
                });
            }
        }

        if record.is_axis() {
            let value = record.axis_value();
            if mirror.apply_axis(record.address, value) {
                debug!(
                    "Axis {} -> {} at {}",
                    record.address,
                    value,
                    timestamp.format("%H:%M:%S.%3f")
                );
                self.send(JoystickEvent::AxisChanged {
                    address: record.address,
                    value,
                    timestamp,
                });
            }
        }
    }

    /// Announce a connection transition.
    ///
    /// Going up resets every mirror slot *before* the event is sent, so no
    /// stale state can be observed as current once reconnection is
    /// announced. Going down leaves the mirrors untouched: last-known values
    /// stay readable until the device returns. Re-announcing the current
    /// state is a no-op.
    pub fn announce_connection(&self, mirror: &StateMirror, connected: bool) {
        if mirror.is_connected() == connected {
            return;
        }
        if connected {
            mirror.reset_channels();
            info!("Joystick device connected");
        } else {
            warn!("Joystick device disconnected");
        }
        mirror.set_connected(connected);
        self.send(JoystickEvent::ConnectionChanged {
            connected,
            timestamp: Local::now(),
        });
    }

    fn send(&self, event: JoystickEvent) {
        // Err only means nobody is subscribed right now.
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::joystick::event::RECORD_SIZE;

    fn record(value: i16, flags: u8, address: u8) -> EventRecord {
        let mut buf = [0u8; RECORD_SIZE];
        buf[4..6].copy_from_slice(&value.to_le_bytes());
        buf[6] = flags;
        buf[7] = address;
        EventRecord::parse(&buf)
    }

    fn drain(rx: &mut broadcast::Receiver<JoystickEvent>) -> Vec<JoystickEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn live_button_record_fires_once_and_updates_mirror() {
        let mirror = StateMirror::new();
        let notifier = ChangeNotifier::new(16);
        let mut rx = notifier.subscribe();

        notifier.apply(&record(1, 0x01, 5), &mirror);
        notifier.apply(&record(1, 0x01, 5), &mirror);

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            JoystickEvent::ButtonChanged {
                address: 5,
                pressed: true,
                ..
            }
        ));
        assert!(mirror.button_pressed(5));
    }

    #[test]
    fn live_axis_record_reports_signed_value() {
        let mirror = StateMirror::new();
        let notifier = ChangeNotifier::new(16);
        let mut rx = notifier.subscribe();

        notifier.apply(&record(-100, 0x02, 3), &mirror);

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            JoystickEvent::AxisChanged {
                address: 3,
                value: -100,
                ..
            }
        ));
        assert_eq!(mirror.axis_value(3), -100);
    }

    #[test]
    fn init_records_are_absorbed_silently() {
        let mirror = StateMirror::new();
        let notifier = ChangeNotifier::new(16);
        let mut rx = notifier.subscribe();

        // Init | button, value claims pressed: still no event, still default.
        notifier.apply(&record(1, 0x81, 4), &mirror);

        assert!(drain(&mut rx).is_empty());
        assert!(!mirror.button_pressed(4));
        // Baseline was absorbed: a live release of the same button stays quiet.
        notifier.apply(&record(0, 0x01, 4), &mirror);
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn pure_sync_record_is_skipped() {
        let mirror = StateMirror::new();
        let notifier = ChangeNotifier::new(16);
        let mut rx = notifier.subscribe();

        notifier.apply(&record(1, 0x80, 0), &mirror);
        notifier.apply(&record(1, 0x00, 0), &mirror);

        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn disconnect_keeps_state_and_reconnect_resets_it() {
        let mirror = StateMirror::new();
        let notifier = ChangeNotifier::new(16);
        notifier.announce_connection(&mirror, true);
        notifier.apply(&record(1, 0x01, 2), &mirror);
        notifier.apply(&record(500, 0x02, 1), &mirror);

        let mut rx = notifier.subscribe();
        notifier.announce_connection(&mirror, false);
        // Stale values stay readable while disconnected.
        assert!(mirror.button_pressed(2));
        assert_eq!(mirror.axis_value(1), 500);

        notifier.announce_connection(&mirror, true);
        // The reset happened before the connected event was sent.
        assert!(!mirror.button_pressed(2));
        assert_eq!(mirror.axis_value(1), 0);

        let events = drain(&mut rx);
        assert_eq!(events.len(), 2);
        assert!(matches!(
            events[0],
            JoystickEvent::ConnectionChanged {
                connected: false,
                ..
            }
        ));
        assert!(matches!(
            events[1],
            JoystickEvent::ConnectionChanged {
                connected: true,
                ..
            }
        ));
    }

    #[test]
    fn reannouncing_current_connection_state_is_silent() {
        let mirror = StateMirror::new();
        let notifier = ChangeNotifier::new(16);
        let mut rx = notifier.subscribe();

        notifier.announce_connection(&mirror, false);
        notifier.announce_connection(&mirror, true);
        notifier.announce_connection(&mirror, true);

        assert_eq!(drain(&mut rx).len(), 1);
    }
}
