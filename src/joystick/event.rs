use chrono::{DateTime, Local};

/// Size of one wire record in bytes.
pub const RECORD_SIZE: usize = 8;

/// Flag bit: record concerns a button channel.
const FLAG_BUTTON: u8 = 0x01;
/// Flag bit: record concerns an axis channel.
const FLAG_AXIS: u8 = 0x02;
/// Flag bit: init/sync record replaying baseline state on open.
const FLAG_INIT: u8 = 0x80;

/// One decoded 8-byte record from the device stream.
///
/// Wire layout (little-endian): `timestamp:u32` at offset 0, `value:i16` at
/// offset 4, `flags:u8` at offset 6, `address:u8` at offset 7. The timestamp
/// is carried for diagnostics only and plays no part in classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EventRecord {
    pub time: u32,
    pub value: i16,
    pub flags: u8,
    pub address: u8,
}

impl EventRecord {
    /// Decode a raw wire record. Never fails: every 8-byte pattern is a
    /// structurally valid record, and unknown flag bits are ignored.
    pub fn parse(buf: &[u8; RECORD_SIZE]) -> Self {
        Self {
            time: u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
            value: i16::from_le_bytes([buf[4], buf[5]]),
            flags: buf[6],
            address: buf[7],
        }
    }

    /// Init/sync record: baseline replay on device open, not a live change.
    pub fn is_init(&self) -> bool {
        self.flags & FLAG_INIT != 0
    }

    pub fn is_button(&self) -> bool {
        self.flags & FLAG_BUTTON != 0
    }

    pub fn is_axis(&self) -> bool {
        self.flags & FLAG_AXIS != 0
    }

    /// Button state carried by this record: the low byte of `value` equal to
    /// exactly 1 means pressed, anything else released.
    pub fn button_pressed(&self) -> bool {
        ((self.value as u16) & 0x00FF) == 1
    }

    /// Axis position carried by this record, the full signed 16-bit value.
    pub fn axis_value(&self) -> i16 {
        self.value
    }
}

/// Change notification broadcast by the session worker.
///
/// Events fire only on genuine transitions: a value re-asserted by the
/// device without changing produces nothing. Each event is stamped with the
/// local capture time of the underlying record.
#[derive(Clone, Debug)]
pub enum JoystickEvent {
    /// Device became reachable or was lost. On reconnection the state
    /// mirror has already been reset to defaults when this fires.
    ConnectionChanged {
        connected: bool,
        timestamp: DateTime<Local>,
    },

    ButtonChanged {
        address: u8,
        pressed: bool,
        timestamp: DateTime<Local>,
    },

    AxisChanged {
        address: u8,
        value: i16,
        timestamp: DateTime<Local>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_button_record() {
        let record = EventRecord::parse(&[0, 0, 0, 0, 0x01, 0x00, 0x01, 0x05]);
        assert!(record.is_button());
        assert!(!record.is_axis());
        assert!(!record.is_init());
        assert_eq!(record.address, 5);
        assert!(record.button_pressed());
    }

    #[test]
    fn decodes_negative_axis_record() {
        let record = EventRecord::parse(&[0, 0, 0, 0, 0x9C, 0xFF, 0x02, 0x03]);
        assert!(record.is_axis());
        assert!(!record.is_button());
        assert_eq!(record.address, 3);
        assert_eq!(record.axis_value(), -100);
    }

    #[test]
    fn init_flag_combines_with_channel_bits() {
        let record = EventRecord::parse(&[0, 0, 0, 0, 0x01, 0x00, 0x81, 0x02]);
        assert!(record.is_init());
        assert!(record.is_button());
    }

    #[test]
    fn pure_sync_record_is_neither_button_nor_axis() {
        let record = EventRecord::parse(&[0, 0, 0, 0, 0x00, 0x00, 0x80, 0x00]);
        assert!(record.is_init());
        assert!(!record.is_button());
        assert!(!record.is_axis());
    }

    #[test]
    fn timestamp_is_decoded_but_does_not_classify() {
        let record = EventRecord::parse(&[0x78, 0x56, 0x34, 0x12, 0x01, 0x00, 0x01, 0x00]);
        assert_eq!(record.time, 0x1234_5678);
        assert!(record.is_button());
    }

    #[test]
    fn button_press_requires_low_byte_exactly_one() {
        // value 2: released
        let released = EventRecord::parse(&[0, 0, 0, 0, 0x02, 0x00, 0x01, 0x00]);
        assert!(!released.button_pressed());
        // value 256: low byte 0, released even though nonzero
        let high_only = EventRecord::parse(&[0, 0, 0, 0, 0x00, 0x01, 0x01, 0x00]);
        assert!(!high_only.button_pressed());
        // value 257: low byte 1, pressed
        let pressed = EventRecord::parse(&[0, 0, 0, 0, 0x01, 0x01, 0x01, 0x00]);
        assert!(pressed.button_pressed());
    }
}
