//! Serial-event fan-out task.
//!
//! Listens to the serial driver and the lifecycle bus and turns what it hears
//! into broadcast requests for the Telnet event loop.  The event loop owns the
//! client table, so the fan-out never touches a socket: it only sends byte
//! buffers down a bounded channel.  Sends never wait: when the event loop is
//! behind, output is dropped rather than queued without bound.

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, trace, warn};

use crate::application::lifecycle_notice;
use crate::domain::{LifecycleEvent, SerialEvent};

pub struct FanOut {
    serial_events: mpsc::Receiver<SerialEvent>,
    lifecycle: broadcast::Receiver<LifecycleEvent>,
    broadcasts: mpsc::Sender<Vec<u8>>,
    device_name: String,
}

impl FanOut {
    pub fn new(
        serial_events: mpsc::Receiver<SerialEvent>,
        lifecycle: broadcast::Receiver<LifecycleEvent>,
        broadcasts: mpsc::Sender<Vec<u8>>,
        device_name: impl Into<String>,
    ) -> Self {
        Self {
            serial_events,
            lifecycle,
            broadcasts,
            device_name: device_name.into(),
        }
    }

    /// Runs until both event sources are closed or the event loop has gone
    /// away.
    pub async fn run(mut self) {
        let mut serial_open = true;
        let mut lifecycle_open = true;

        while serial_open || lifecycle_open {
            let delivered = tokio::select! {
                event = self.serial_events.recv(), if serial_open => match event {
                    Some(event) => self.on_serial_event(event),
                    None => {
                        info!("serial event stream ended");
                        serial_open = false;
                        true
                    }
                },
                event = self.lifecycle.recv(), if lifecycle_open => match event {
                    Ok(event) => self.on_lifecycle_event(event),
                    Err(RecvError::Lagged(missed)) => {
                        warn!("fan-out fell behind; {missed} lifecycle events missed");
                        true
                    }
                    Err(RecvError::Closed) => {
                        debug!("lifecycle bus closed");
                        lifecycle_open = false;
                        true
                    }
                },
            };

            if !delivered {
                debug!("event loop no longer takes broadcasts; fan-out stopping");
                return;
            }
        }
        debug!("fan-out has no event sources left");
    }

    /// Hands `payload` to the event loop without waiting.  A full queue drops
    /// the payload; returns `false` once the event loop has gone away.
    fn offer(&self, payload: Vec<u8>) -> bool {
        match self.broadcasts.try_send(payload) {
            Ok(()) => true,
            Err(TrySendError::Full(payload)) => {
                debug!("broadcast queue full; dropped {} bytes", payload.len());
                true
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    fn on_serial_event(&self, event: SerialEvent) -> bool {
        match event {
            SerialEvent::Data(bytes) => {
                trace!("broadcasting {} serial bytes", bytes.len());
                self.offer(bytes)
            }
            SerialEvent::Break => {
                info!("serial line break detected");
                true
            }
            SerialEvent::ParityError => {
                warn!("serial parity error");
                true
            }
            SerialEvent::FrameError => {
                warn!("serial framing error");
                true
            }
            SerialEvent::BufferFull => {
                warn!("serial receive buffer full");
                true
            }
            SerialEvent::Other(code) => {
                warn!("serial driver event {code}");
                true
            }
        }
    }

    fn on_lifecycle_event(&mut self, event: LifecycleEvent) -> bool {
        if let LifecycleEvent::DeviceNameChanged(name) = &event {
            info!("device renamed from {:?} to {name:?}", self.device_name);
            self.device_name.clone_from(name);
            return true;
        }
        match lifecycle_notice(&self.device_name, &event) {
            Some(notice) => self.offer(notice.into_bytes()),
            None => true,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::task::JoinHandle;
    use tokio::time::timeout;

    struct Harness {
        serial: mpsc::Sender<SerialEvent>,
        lifecycle: broadcast::Sender<LifecycleEvent>,
        broadcasts: mpsc::Receiver<Vec<u8>>,
        task: JoinHandle<()>,
    }

    fn start() -> Harness {
        let (serial, serial_rx) = mpsc::channel(8);
        let (lifecycle, lifecycle_rx) = broadcast::channel(8);
        let (broadcasts_tx, broadcasts) = mpsc::channel(8);
        let task = tokio::spawn(
            FanOut::new(serial_rx, lifecycle_rx, broadcasts_tx, "Wireless serial").run(),
        );
        Harness {
            serial,
            lifecycle,
            broadcasts,
            task,
        }
    }

    async fn next_broadcast(rx: &mut mpsc::Receiver<Vec<u8>>) -> Vec<u8> {
        timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("no broadcast within 1s")
            .expect("broadcast channel closed")
    }

    #[tokio::test]
    async fn test_serial_data_is_broadcast_unmodified() {
        // Arrange
        let mut h = start();
        let payload = vec![0x00, 0xFF, b'o', b'k'];

        // Act
        h.serial.send(SerialEvent::Data(payload.clone())).await.unwrap();

        // Assert
        assert_eq!(next_broadcast(&mut h.broadcasts).await, payload);
    }

    #[tokio::test]
    async fn test_line_errors_are_not_broadcast() {
        let mut h = start();

        h.serial.send(SerialEvent::ParityError).await.unwrap();
        h.serial.send(SerialEvent::FrameError).await.unwrap();
        h.serial.send(SerialEvent::Other(7)).await.unwrap();
        h.serial.send(SerialEvent::Data(b"after".to_vec())).await.unwrap();

        // The first broadcast is the data that followed the errors.
        assert_eq!(next_broadcast(&mut h.broadcasts).await, b"after");
    }

    #[tokio::test]
    async fn test_power_events_become_notices() {
        let mut h = start();

        h.lifecycle.send(LifecycleEvent::PowerDown).unwrap();
        h.lifecycle.send(LifecycleEvent::PowerOn).unwrap();
        h.lifecycle.send(LifecycleEvent::PowerLow).unwrap();

        assert_eq!(
            next_broadcast(&mut h.broadcasts).await,
            b">>> Wireless serial: Power down <<<\r\n"
        );
        assert_eq!(
            next_broadcast(&mut h.broadcasts).await,
            b">>> Wireless serial: Power on <<<\r\n"
        );
        assert_eq!(
            next_broadcast(&mut h.broadcasts).await,
            b">>> Wireless serial: Low power <<<\r\n"
        );
    }

    #[tokio::test]
    async fn test_rename_changes_later_notices() {
        let mut h = start();

        h.lifecycle
            .send(LifecycleEvent::DeviceNameChanged("lab-uart".to_string()))
            .unwrap();
        h.lifecycle.send(LifecycleEvent::PowerOn).unwrap();

        assert_eq!(
            next_broadcast(&mut h.broadcasts).await,
            b">>> lab-uart: Power on <<<\r\n"
        );
    }

    #[tokio::test]
    async fn test_full_broadcast_queue_drops_instead_of_blocking() {
        // Arrange: nobody drains the broadcast queue (depth 8)
        let mut h = start();

        // Act: far more data than the queue holds; every send must complete
        for i in 0..40u8 {
            timeout(Duration::from_secs(1), h.serial.send(SerialEvent::Data(vec![i])))
                .await
                .expect("fan-out stopped consuming serial events")
                .unwrap();
        }
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Assert: the queue holds the first 8, the rest were dropped
        let mut queued = Vec::new();
        while let Ok(payload) = h.broadcasts.try_recv() {
            queued.push(payload);
        }
        assert_eq!(queued, (0..8u8).map(|i| vec![i]).collect::<Vec<_>>());

        // Once drained, new output flows again
        h.serial.send(SerialEvent::Data(b"fresh".to_vec())).await.unwrap();
        assert_eq!(next_broadcast(&mut h.broadcasts).await, b"fresh");
    }

    #[tokio::test]
    async fn test_stops_when_both_sources_close() {
        let h = start();

        drop(h.serial);
        drop(h.lifecycle);

        tokio_test::assert_ok!(timeout(Duration::from_secs(1), h.task).await);
    }

    #[tokio::test]
    async fn test_stops_when_event_loop_goes_away() {
        let h = start();
        drop(h.broadcasts);

        h.serial.send(SerialEvent::Data(b"x".to_vec())).await.unwrap();

        tokio_test::assert_ok!(timeout(Duration::from_secs(1), h.task).await);
    }
}
