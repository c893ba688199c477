use crate::decode::PacketTransform;
use crate::device::DeviceHandle;
use crate::transport::Transport;
use crate::types::{PollOutcome, SensorFrame};
use crate::{EpocError, Result};
use crossbeam_channel::{Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Gap between empty polls on the reader thread. The headset sends a frame
/// every ~7.8 ms.
const IDLE_SLEEP: Duration = Duration::from_millis(1);

const CHANNEL_CAPACITY: usize = 256;

/// Transport failure parked by the reader until the consumer drains the
/// channel. Never blocks the reader, so `stop()` cannot hang on a full queue.
type FailureSlot = Arc<Mutex<Option<EpocError>>>;

/// Frames from a background reader thread that owns the device handle.
///
/// This is the cancellable form of [`DeviceHandle::wait_for_frame`]:
/// [`FrameStream::stop`] ends the reader and gives the handle back.
pub struct FrameStream<T, D>
where
    T: Transport + Send + 'static,
    D: PacketTransform + Send + 'static,
{
    receiver: Receiver<SensorFrame>,
    failure: FailureSlot,
    stop_flag: Arc<AtomicBool>,
    thread: Option<std::thread::JoinHandle<DeviceHandle<T, D>>>,
}

impl<T, D> FrameStream<T, D>
where
    T: Transport + Send + 'static,
    D: PacketTransform + Send + 'static,
{
    /// Move `handle` onto a reader thread and start polling.
    pub fn start(handle: DeviceHandle<T, D>) -> Result<Self> {
        let (sender, receiver) = crossbeam_channel::bounded(CHANNEL_CAPACITY);
        let failure = FailureSlot::default();
        let failure_clone = failure.clone();
        let stop_flag = Arc::new(AtomicBool::new(false));
        let stop_clone = stop_flag.clone();

        let thread = std::thread::Builder::new()
            .name("epoc-reader".into())
            .spawn(move || reader_loop(handle, sender, failure_clone, stop_clone))
            .map_err(|e| EpocError::Transport(format!("Failed to spawn reader thread: {}", e)))?;

        Ok(FrameStream {
            receiver,
            failure,
            stop_flag,
            thread: Some(thread),
        })
    }

    /// Receive the next frame (blocks until available). Frames queued before
    /// a transport failure come first, then the failure is delivered once,
    /// then the stream reports [`EpocError::StreamStopped`].
    pub fn recv(&self) -> Result<SensorFrame> {
        self.receiver.recv().map_err(|_| self.take_failure())
    }

    /// Try to receive a frame without blocking.
    pub fn try_recv(&self) -> Option<Result<SensorFrame>> {
        match self.receiver.try_recv() {
            Ok(frame) => Some(Ok(frame)),
            Err(crossbeam_channel::TryRecvError::Empty) => None,
            Err(crossbeam_channel::TryRecvError::Disconnected) => Some(Err(self.take_failure())),
        }
    }

    /// Receive a frame with a timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<SensorFrame> {
        self.receiver.recv_timeout(timeout).map_err(|e| match e {
            crossbeam_channel::RecvTimeoutError::Timeout => EpocError::Timeout,
            crossbeam_channel::RecvTimeoutError::Disconnected => self.take_failure(),
        })
    }

    /// Check if the reader is still running.
    pub fn is_active(&self) -> bool {
        !self.stop_flag.load(Ordering::Relaxed)
            && self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop the reader and return the handle so it can be closed or polled
    /// directly. `None` if the reader thread panicked.
    pub fn stop(mut self) -> Option<DeviceHandle<T, D>> {
        self.shutdown()
    }

    fn take_failure(&self) -> EpocError {
        self.failure
            .lock()
            .ok()
            .and_then(|mut slot| slot.take())
            .unwrap_or(EpocError::StreamStopped)
    }

    fn shutdown(&mut self) -> Option<DeviceHandle<T, D>> {
        self.stop_flag.store(true, Ordering::Relaxed);
        self.thread.take().and_then(|thread| thread.join().ok())
    }
}

impl<T, D> Drop for FrameStream<T, D>
where
    T: Transport + Send + 'static,
    D: PacketTransform + Send + 'static,
{
    fn drop(&mut self) {
        if let Some(handle) = self.shutdown() {
            handle.close();
        }
    }
}

fn reader_loop<T: Transport, D: PacketTransform>(
    mut handle: DeviceHandle<T, D>,
    sender: Sender<SensorFrame>,
    failure: FailureSlot,
    stop_flag: Arc<AtomicBool>,
) -> DeviceHandle<T, D> {
    log::info!("EPOC reader started");

    loop {
        if stop_flag.load(Ordering::Relaxed) {
            log::info!("EPOC reader stopping (stop flag set)");
            break;
        }

        match handle.poll() {
            PollOutcome::Ready(frame) => {
                if let Err(e) = sender.try_send(frame) {
                    match e {
                        crossbeam_channel::TrySendError::Full(_) => {
                            log::trace!("Frame channel full, dropping frame");
                        }
                        crossbeam_channel::TrySendError::Disconnected(_) => {
                            log::info!("Frame channel disconnected, stopping reader");
                            break;
                        }
                    }
                }
            }
            PollOutcome::NotYetAvailable => std::thread::sleep(IDLE_SLEEP),
            PollOutcome::HardFailure(e) => {
                log::warn!("EPOC read error: {}", e);
                if let Ok(mut slot) = failure.lock() {
                    *slot = Some(e);
                }
                break;
            }
        }
    }

    stop_flag.store(true, Ordering::Relaxed);
    handle
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OpenOptions;
    use crate::decode::PlaintextLayout;
    use crate::types::{DeviceVariant, RawPacket};
    use std::collections::VecDeque;
    use std::time::Instant;

    /// Thread-safe scripted transport: `None` is a transport error.
    struct QueueTransport {
        queue: Arc<Mutex<VecDeque<Option<[u8; 32]>>>>,
        pending: Option<[u8; 32]>,
    }

    impl Transport for QueueTransport {
        fn poll(&mut self) -> Result<usize> {
            match self.queue.lock().unwrap().pop_front() {
                None => Ok(0),
                Some(Some(bytes)) => {
                    self.pending = Some(bytes);
                    Ok(32)
                }
                Some(None) => Err(EpocError::Transport("unplugged".into())),
            }
        }

        fn read_raw(&mut self) -> Result<RawPacket> {
            self.pending
                .take()
                .map(RawPacket::new)
                .ok_or_else(|| EpocError::Transport("no packet".into()))
        }
    }

    struct QueueBackend(Arc<Mutex<VecDeque<Option<[u8; 32]>>>>);

    impl crate::transport::Backend for QueueBackend {
        type Transport = QueueTransport;

        fn device_count(&self, _vid: u16, _pid: u16) -> Result<usize> {
            Ok(1)
        }

        fn open(&self, _vid: u16, _pid: u16, _options: &OpenOptions) -> Result<QueueTransport> {
            Ok(QueueTransport {
                queue: self.0.clone(),
                pending: None,
            })
        }
    }

    fn plaintext(counter: u8) -> Option<[u8; 32]> {
        let mut bytes = [0u8; 32];
        bytes[0] = counter;
        bytes[29] = 106;
        bytes[30] = 105;
        Some(bytes)
    }

    fn start(
        items: Vec<Option<[u8; 32]>>,
    ) -> (FrameStream<QueueTransport, PlaintextLayout>, Arc<Mutex<VecDeque<Option<[u8; 32]>>>>) {
        let queue = Arc::new(Mutex::new(VecDeque::from(items)));
        let backend = QueueBackend(queue.clone());
        let handle =
            DeviceHandle::open_with(&backend, &OpenOptions::new(DeviceVariant::Consumer), PlaintextLayout)
                .unwrap();
        (FrameStream::start(handle).unwrap(), queue)
    }

    #[test]
    fn test_stream_delivers_frames_in_order() {
        let (stream, _queue) = start(vec![plaintext(1), plaintext(0), plaintext(2), plaintext(3)]);
        let timeout = Duration::from_secs(2);
        let counters: Vec<u8> = (0..3)
            .map(|_| stream.recv_timeout(timeout).unwrap().counter())
            .collect();
        assert_eq!(counters, vec![1, 2, 3]);
        assert!(stream.is_active());

        let handle = stream.stop().expect("reader returns the handle");
        handle.close();
    }

    #[test]
    fn test_stream_surfaces_failure_then_stops() {
        let (stream, _queue) = start(vec![plaintext(5), None, plaintext(6)]);
        let timeout = Duration::from_secs(2);
        assert_eq!(stream.recv_timeout(timeout).unwrap().counter(), 5);
        assert!(matches!(stream.recv_timeout(timeout), Err(EpocError::Transport(_))));
        assert!(matches!(stream.recv_timeout(timeout), Err(EpocError::StreamStopped)));
        assert!(!stream.is_active());
    }

    /// Queue more frames than the channel holds, then a transport error.
    fn start_overfilled() -> FrameStream<QueueTransport, PlaintextLayout> {
        let mut items: Vec<_> = (0..CHANNEL_CAPACITY + 44)
            .map(|i| plaintext((i % 127 + 1) as u8))
            .collect();
        items.push(None);
        let (stream, _queue) = start(items);

        let deadline = Instant::now() + Duration::from_secs(3);
        while stream.is_active() {
            assert!(Instant::now() < deadline, "reader never reached the failure");
            std::thread::sleep(Duration::from_millis(1));
        }
        stream
    }

    #[test]
    fn test_stop_returns_after_failure_on_full_channel() {
        let stream = start_overfilled();

        let (tx, rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            let _ = tx.send(stream.stop().is_some());
        });
        let returned = rx
            .recv_timeout(Duration::from_secs(3))
            .expect("stop() hung on a full channel");
        assert!(returned);
    }

    #[test]
    fn test_failure_follows_queued_frames_on_full_channel() {
        let stream = start_overfilled();

        for _ in 0..CHANNEL_CAPACITY {
            assert!(stream.recv().is_ok());
        }
        assert!(matches!(stream.recv(), Err(EpocError::Transport(_))));
        assert!(matches!(stream.try_recv(), Some(Err(EpocError::StreamStopped))));
    }

    #[test]
    fn test_stop_while_idle() {
        let (stream, queue) = start(vec![]);
        assert!(matches!(
            stream.recv_timeout(Duration::from_millis(20)),
            Err(EpocError::Timeout)
        ));
        let mut handle = stream.stop().unwrap();

        // handle keeps working after the reader gave it back
        queue.lock().unwrap().push_back(plaintext(77));
        assert_eq!(handle.wait_for_frame().unwrap().counter(), 77);
        handle.close();
    }
}
