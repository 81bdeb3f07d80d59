//! Human-readable lines announcing device lifecycle changes to Telnet users.

use crate::domain::LifecycleEvent;

/// Returns the line broadcast to every client for `event`, or `None` if the
/// event is not announced.
///
/// Only the three power events are announced.  The line ends in CRLF so it
/// starts a fresh line in any terminal.
///
/// ```rust
/// use serial_bridge::application::lifecycle_notice;
/// use serial_bridge::domain::LifecycleEvent;
///
/// assert_eq!(
///     lifecycle_notice("Wireless serial", &LifecycleEvent::PowerLow).as_deref(),
///     Some(">>> Wireless serial: Low power <<<\r\n"),
/// );
/// ```
pub fn lifecycle_notice(device_name: &str, event: &LifecycleEvent) -> Option<String> {
    let what = match event {
        LifecycleEvent::PowerDown => "Power down",
        LifecycleEvent::PowerOn => "Power on",
        LifecycleEvent::PowerLow => "Low power",
        LifecycleEvent::DeviceNameChanged(_) => return None,
    };
    Some(format!(">>> {device_name}: {what} <<<\r\n"))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
