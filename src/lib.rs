//! Resilient client for the Linux joystick device stream.
//!
//! The crate reads the kernel's fixed-size joystick records from a device
//! special file (conventionally `/dev/input/js0`), mirrors the current
//! button/axis state for lock-free polling, and broadcasts change events to
//! any number of subscribers. Device absence, disconnection, and
//! reconnection are handled by a background worker that retries forever and
//! never surfaces I/O failures to the consuming application.
//!
//! Spawning a [`JoystickHandle`] starts the worker immediately; dropping it
//! (or calling [`JoystickHandle::shutdown`]) stops it.

pub mod config;
pub mod joystick;

pub use config::{ConfigError, JoystickSettings};
pub use joystick::{EventRecord, JoystickError, JoystickEvent, JoystickHandle};
