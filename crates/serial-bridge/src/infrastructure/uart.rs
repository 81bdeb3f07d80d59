//! Host UART driver built on `tokio-serial`.
//!
//! The serial port is owned by a single driver task.  Everything else talks
//! to it through a cloneable [`UartHandle`]:
//!
//! ```text
//! UartHandle::write / send_break ──► command queue ──► driver task ──► port
//!                                                          │
//! fan-out ◄── SerialEvent::Data ◄── event queue ◄──────────┘ (reads)
//! ```
//!
//! Keeping one owner means reads, writes, and break requests can never race on
//! the device, and no lock is held across an await.
//!
//! The driver never waits for room in the event queue.  Writes from the event
//! loop wait for the driver, so a driver parked on a full queue would stall
//! both directions; received data is dropped instead.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{debug, error, info, trace, warn};

use crate::application::ports::{SerialError, SerialTransport};
use crate::domain::{DataBits, FlowControl, Parity, SerialEvent, SerialSettings, StopBits};

/// Bytes read from the device per `SerialEvent::Data`.
const READ_BUFFER_SIZE: usize = 1024;
const COMMAND_QUEUE_DEPTH: usize = 32;
const EVENT_QUEUE_DEPTH: usize = 32;

/// Break control on top of byte I/O.
trait LineControl {
    fn set_break(&self) -> io::Result<()>;
    fn clear_break(&self) -> io::Result<()>;
}

impl LineControl for SerialStream {
    fn set_break(&self) -> io::Result<()> {
        tokio_serial::SerialPort::set_break(self).map_err(io::Error::from)
    }

    fn clear_break(&self) -> io::Result<()> {
        tokio_serial::SerialPort::clear_break(self).map_err(io::Error::from)
    }
}

#[derive(Debug)]
enum UartCommand {
    Write {
        data: Vec<u8>,
        reply: oneshot::Sender<Result<usize, SerialError>>,
    },
    Break {
        duration: Duration,
        reply: oneshot::Sender<Result<(), SerialError>>,
    },
}

/// Cloneable handle to the driver task.  Dropping every handle stops the task.
#[derive(Debug, Clone)]
pub struct UartHandle {
    commands: mpsc::Sender<UartCommand>,
}

/// Opens the serial device described by `settings` and starts its driver.
///
/// Returns the handle used for writing and the queue of receive events.
///
/// # Errors
///
/// Returns [`SerialError::Open`] if the device cannot be opened or configured.
pub fn open_uart(
    settings: &SerialSettings,
) -> Result<(UartHandle, mpsc::Receiver<SerialEvent>), SerialError> {
    let port = tokio_serial::new(settings.device.as_str(), settings.baud_rate)
        .data_bits(data_bits(settings.data_bits))
        .parity(parity(settings.parity))
        .stop_bits(stop_bits(settings.stop_bits))
        .flow_control(flow_control(settings.flow_control))
        .open_native_async()
        .map_err(|e| SerialError::Open {
            device: settings.device.clone(),
            reason: e.to_string(),
        })?;

    info!("opened serial device {settings}");
    Ok(spawn_driver(port, settings.device.clone()))
}

fn spawn_driver<P>(port: P, device: String) -> (UartHandle, mpsc::Receiver<SerialEvent>)
where
    P: AsyncRead + AsyncWrite + LineControl + Unpin + Send + 'static,
{
    let (commands_tx, commands_rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
    let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
    tokio::spawn(run_driver(port, device, commands_rx, events_tx));
    (
        UartHandle {
            commands: commands_tx,
        },
        events_rx,
    )
}

// ── Driver task ───────────────────────────────────────────────────────────────

async fn run_driver<P>(
    mut port: P,
    device: String,
    mut commands: mpsc::Receiver<UartCommand>,
    events: mpsc::Sender<SerialEvent>,
) where
    P: AsyncRead + AsyncWrite + LineControl + Unpin,
{
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    let mut reading = true;

    loop {
        tokio::select! {
            read = port.read(&mut buf), if reading => match read {
                Ok(0) => {
                    warn!(%device, "serial device reported end of stream");
                    reading = false;
                }
                Ok(n) => {
                    trace!(%device, "{n} bytes received");
                    if !publish(&events, &device, SerialEvent::Data(buf[..n].to_vec())) {
                        debug!(%device, "nobody consumes serial events; reads stopped");
                        reading = false;
                    }
                }
                Err(e) => {
                    error!(%device, "serial read failed: {e}");
                    let code = e.raw_os_error().unwrap_or_default().unsigned_abs();
                    publish(&events, &device, SerialEvent::Other(code));
                    reading = false;
                }
            },
            command = commands.recv() => match command {
                Some(command) => execute(&mut port, command).await,
                None => {
                    debug!(%device, "all serial handles dropped; driver stopping");
                    break;
                }
            },
        }
    }
}

/// Queues `event` without waiting.  A full queue drops the event so that the
/// driver keeps servicing writes; returns `false` once the receiver is gone.
fn publish(events: &mpsc::Sender<SerialEvent>, device: &str, event: SerialEvent) -> bool {
    match events.try_send(event) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            debug!(%device, "serial event queue full; event dropped");
            true
        }
        Err(TrySendError::Closed(_)) => false,
    }
}

async fn execute<P>(port: &mut P, command: UartCommand)
where
    P: AsyncWrite + LineControl + Unpin,
{
    match command {
        UartCommand::Write { data, reply } => {
            let result = port
                .write_all(&data)
                .await
                .map(|()| data.len())
                .map_err(SerialError::from);
            let _ = reply.send(result);
        }
        UartCommand::Break { duration, reply } => {
            let _ = reply.send(hold_break(port, duration).await);
        }
    }
}

async fn hold_break<P>(port: &mut P, duration: Duration) -> Result<(), SerialError>
where
    P: AsyncWrite + LineControl + Unpin,
{
    // Pending output must leave the line before it is pulled low.
    port.flush().await?;
    port.set_break()?;
    tokio::time::sleep(duration).await;
    port.clear_break()?;
    Ok(())
}

#[async_trait]
impl SerialTransport for UartHandle {
    async fn write(&self, data: &[u8]) -> Result<usize, SerialError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(UartCommand::Write {
                data: data.to_vec(),
                reply,
            })
            .await
            .map_err(|_| SerialError::Disconnected)?;
        response.await.map_err(|_| SerialError::Disconnected)?
    }

    async fn send_break(&self, duration: Duration) -> Result<(), SerialError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(UartCommand::Break { duration, reply })
            .await
            .map_err(|_| SerialError::Disconnected)?;
        response.await.map_err(|_| SerialError::Disconnected)?
    }
}

// ── Settings mapping ──────────────────────────────────────────────────────────

fn data_bits(bits: DataBits) -> tokio_serial::DataBits {
    match bits {
        DataBits::Five => tokio_serial::DataBits::Five,
        DataBits::Six => tokio_serial::DataBits::Six,
        DataBits::Seven => tokio_serial::DataBits::Seven,
        DataBits::Eight => tokio_serial::DataBits::Eight,
    }
}

fn parity(parity: Parity) -> tokio_serial::Parity {
    match parity {
        Parity::None => tokio_serial::Parity::None,
        Parity::Odd => tokio_serial::Parity::Odd,
        Parity::Even => tokio_serial::Parity::Even,
    }
}

fn stop_bits(bits: StopBits) -> tokio_serial::StopBits {
    match bits {
        StopBits::One => tokio_serial::StopBits::One,
        StopBits::Two => tokio_serial::StopBits::Two,
    }
}

fn flow_control(flow: FlowControl) -> tokio_serial::FlowControl {
    match flow {
        FlowControl::None => tokio_serial::FlowControl::None,
        FlowControl::Software => tokio_serial::FlowControl::Software,
        FlowControl::Hardware => tokio_serial::FlowControl::Hardware,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
