use std::sync::atomic::{AtomicBool, AtomicI16, Ordering};

/// Number of addressable channels per namespace (single-byte addresses).
pub const CHANNEL_COUNT: usize = 256;

/// Live mirror of the device's button and axis state.
///
/// Buttons and axes live in separate address namespaces; the same numeric
/// address can name one of each. Every slot carries a "seen" flag so that
/// "never observed" is distinguishable from "observed and equal to the
/// default".
///
/// All slots are independent atomics accessed with relaxed ordering: the
/// worker is the only writer for the lifetime of a session, readers tolerate
/// eventual consistency, and no cross-slot snapshot is promised. Two
/// accessor calls back to back may reflect two different underlying records.
#[derive(Debug)]
pub struct StateMirror {
    buttons: [AtomicBool; CHANNEL_COUNT],
    button_seen: [AtomicBool; CHANNEL_COUNT],
    axes: [AtomicI16; CHANNEL_COUNT],
    axis_seen: [AtomicBool; CHANNEL_COUNT],
    connected: AtomicBool,
}

impl StateMirror {
    pub fn new() -> Self {
        Self {
            buttons: [const { AtomicBool::new(false) }; CHANNEL_COUNT],
            button_seen: [const { AtomicBool::new(false) }; CHANNEL_COUNT],
            axes: [const { AtomicI16::new(0) }; CHANNEL_COUNT],
            axis_seen: [const { AtomicBool::new(false) }; CHANNEL_COUNT],
            connected: AtomicBool::new(false),
        }
    }

    /// Current mirrored button state; `false` when never observed.
    pub fn button_pressed(&self, address: u8) -> bool {
        self.buttons[address as usize].load(Ordering::Relaxed)
    }

    /// Current mirrored axis position; `0` when never observed.
    pub fn axis_value(&self, address: u8) -> i16 {
        self.axes[address as usize].load(Ordering::Relaxed)
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    pub(crate) fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Relaxed);
    }

    /// Record a live button value. Returns `true` when this is a genuine
    /// transition (unseen address or changed value) that warrants an event.
    pub(crate) fn apply_button(&self, address: u8, pressed: bool) -> bool {
        let idx = address as usize;
        let seen = self.button_seen[idx].swap(true, Ordering::Relaxed);
        let previous = self.buttons[idx].swap(pressed, Ordering::Relaxed);
        !seen || previous != pressed
    }

    /// Record a live axis value. Same change gate as [`Self::apply_button`].
    pub(crate) fn apply_axis(&self, address: u8, value: i16) -> bool {
        let idx = address as usize;
        let seen = self.axis_seen[idx].swap(true, Ordering::Relaxed);
        let previous = self.axes[idx].swap(value, Ordering::Relaxed);
        !seen || previous != value
    }

    /// Absorb an init-record button channel: mark seen, force the default.
    pub(crate) fn absorb_init_button(&self, address: u8) {
        let idx = address as usize;
        self.buttons[idx].store(false, Ordering::Relaxed);
        self.button_seen[idx].store(true, Ordering::Relaxed);
    }

    /// Absorb an init-record axis channel: mark seen, force the default.
    pub(crate) fn absorb_init_axis(&self, address: u8) {
        let idx = address as usize;
        self.axes[idx].store(0, Ordering::Relaxed);
        self.axis_seen[idx].store(true, Ordering::Relaxed);
    }

    /// Reset every slot to default and clear all seen flags. Runs on the
    /// disconnected→connected transition, before the event announcing it.
    pub(crate) fn reset_channels(&self) {
        for idx in 0..CHANNEL_COUNT {
            self.buttons[idx].store(false, Ordering::Relaxed);
            self.button_seen[idx].store(false, Ordering::Relaxed);
            self.axes[idx].store(0, Ordering::Relaxed);
            self.axis_seen[idx].store(false, Ordering::Relaxed);
        }
    }
}

impl Default for StateMirror {
    fn default() -> Self {
        Self::new()
    }
}
