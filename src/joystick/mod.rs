//! Joystick subsystem for the kernel joystick device stream
//!
//! Implements a single-worker read pipeline:
//!
//! 1. [`event`] - wire record decoding and public change events
//! 2. [`state`] - shared button/axis mirror for lock-free polling
//! 3. [`connection`] - device probing, opening, and record reads
//! 4. [`notifier`] - change suppression and event broadcast
//! 5. [`joystick_handle`] - public API and lifecycle management
//!
//! # Architecture
//!
//! ```text
//! /dev/input/js0 ──► DeviceLink ──► EventRecord ──► ChangeNotifier ──► JoystickEvent
//!                    (8-byte reads)  (decoded)       │
//!                                                    ▼
//!                                               StateMirror ◄── polling readers
//! ```
//!
//! One background worker owns all device I/O and is the only writer of the
//! state mirror; any number of caller threads read the mirror concurrently.

pub mod connection;
pub mod event;
pub mod joystick_handle;
pub mod notifier;
pub mod state;

pub use event::{EventRecord, JoystickEvent, RECORD_SIZE};
pub use joystick_handle::{JoystickError, JoystickHandle};
