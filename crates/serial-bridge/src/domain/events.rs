//! Events consumed by the fan-out task.

/// Something the serial driver reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SerialEvent {
    /// Bytes received on the line, in arrival order.
    Data(Vec<u8>),
    /// A break condition was detected on the receive line.
    Break,
    /// A character arrived with bad parity.
    ParityError,
    /// A character arrived with a framing error.
    FrameError,
    /// The driver's receive buffer overflowed and data was lost.
    BufferFull,
    /// Any other driver-specific condition, identified by its code.
    Other(u32),
}

/// Device lifecycle notifications published on the event bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The device was renamed.
    DeviceNameChanged(String),
    /// The device is about to power down.
    PowerDown,
    /// External power was connected.
    PowerOn,
    /// The battery is running low.
    PowerLow,
}
