//! Message type tags.
//!
//! Tags 0x0000-0x00FF are reserved.
//! Tags 0x01xx are device telemetry, 0x02xx are host commands.

/// Point cloud scan (device to host).
pub const POINT_CLOUD: u16 = 0x0101;

/// IMU attitude sample (device to host).
pub const IMU: u16 = 0x0102;

/// Firmware version report (device to host).
pub const VERSION: u16 = 0x0103;

/// Auxiliary status report, carries the cover dirty percentage (device to host).
pub const AUXILIARY: u16 = 0x0104;

/// Working mode change (host to device).
pub const WORK_MODE: u16 = 0x0201;

/// LED ring display mode (host to device).
pub const LED_DISPLAY: u16 = 0x0202;

/// Returns a human-readable name for a type tag.
pub fn type_name(tag: u16) -> &'static str {
    match tag {
        POINT_CLOUD => "POINT_CLOUD",
        IMU => "IMU",
        VERSION => "VERSION",
        AUXILIARY => "AUXILIARY",
        WORK_MODE => "WORK_MODE",
        LED_DISPLAY => "LED_DISPLAY",
        0x0000..=0x00FF => "RESERVED",
        _ => "UNKNOWN",
    }
}

/// Returns true if the tag is a host-to-device command.
pub fn is_command(tag: u16) -> bool {
    matches!(tag, WORK_MODE | LED_DISPLAY)
}
