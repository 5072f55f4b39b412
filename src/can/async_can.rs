//! Async wrapper for Adapters implementing the [`CanAdapter`] trait.

use std::collections::{HashMap, VecDeque};

use crate::can::CanAdapter;
use crate::can::Frame;
use crate::can::Identifier;
use crate::error::Error;
use crate::Stream;
use async_stream::stream;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, warn};

const CAN_TX_BUFFER_SIZE: usize = 128;
const CAN_RX_BUFFER_SIZE: usize = 1024;
const CAN_PENDING_MAX: usize = 8192;
const CAN_BACKLOG_MAX: usize = 8192;
const POLL_INTERVAL: std::time::Duration = std::time::Duration::from_millis(1);

type BusIdentifier = (u8, Identifier);
type FrameCallback = (Frame, Option<oneshot::Sender<()>>);

fn process<T: CanAdapter>(
    mut adapter: T,
    mut shutdown_receiver: oneshot::Receiver<()>,
    rx_sender: broadcast::Sender<Frame>,
    mut tx_receiver: mpsc::Receiver<FrameCallback>,
) {
    let mut buffer: VecDeque<Frame> = VecDeque::new();
    let mut callbacks: HashMap<BusIdentifier, VecDeque<FrameCallback>> = HashMap::new();

    while shutdown_receiver.try_recv().is_err() {
        let frames = match adapter.recv() {
            Ok(frames) => frames,
            Err(e) => {
                warn!("RX failed: {}", e);
                vec![]
            }
        };

        for frame in frames {
            debug!("RX {:?}", frame);

            // Wake up sender
            if frame.loopback {
                let callback = callbacks
                    .entry((frame.bus, frame.id))
                    .or_default()
                    .pop_front();

                match callback {
                    Some((tx_frame, callback)) => {
                        // Frames are expected back in the order they were handed to the adapter
                        if tx_frame.data != frame.data {
                            warn!("Loopback frame out of order: {:?}", frame);
                        }
                        if let Some(callback) = callback {
                            // Receiver might have been dropped, which is fine
                            let _ = callback.send(());
                        }
                    }
                    None => warn!("Received loopback frame with no pending callback: {:?}", frame),
                };
            }

            // No subscribers is not an error
            let _ = rx_sender.send(frame);
        }

        while let Ok((frame, callback)) = tx_receiver.try_recv() {
            let pending = callbacks.entry((frame.bus, frame.id)).or_default();

            // Adapters without loopback support never drain this queue
            if pending.len() >= CAN_PENDING_MAX {
                pending.pop_front();
            }
            pending.push_back((frame.clone(), callback));

            debug!("TX {:?}", frame);
            buffer.push_back(frame);
        }

        if !buffer.is_empty() {
            if let Err(e) = adapter.send(&mut buffer) {
                warn!("TX failed: {}", e);
            }
        }

        let dropped = trim_backlog(&mut buffer, CAN_BACKLOG_MAX);
        if dropped > 0 {
            warn!("TX backlog full, {} frames dropped", dropped);
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

/// Drop the oldest frames until at most `max` remain. Returns the number of dropped frames.
fn trim_backlog(buffer: &mut VecDeque<Frame>, max: usize) -> usize {
    let excess = buffer.len().saturating_sub(max);
    buffer.drain(..excess);
    excess
}

/// Async wrapper around a [`CanAdapter`]. Starts a background thread to handle sending and receiving frames. Uses tokio channels to communicate with the background thread.
pub struct AsyncCanAdapter {
    processing_handle: Option<std::thread::JoinHandle<()>>,
    recv_receiver: broadcast::Receiver<Frame>,
    send_sender: mpsc::Sender<FrameCallback>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl AsyncCanAdapter {
    pub fn new<T: CanAdapter + Send + 'static>(adapter: T) -> Self {
        let (shutdown_sender, shutdown_receiver) = oneshot::channel();
        let (send_sender, send_receiver) = mpsc::channel(CAN_TX_BUFFER_SIZE);
        let (recv_sender, recv_receiver) = broadcast::channel(CAN_RX_BUFFER_SIZE);

        let mut ret = AsyncCanAdapter {
            shutdown: Some(shutdown_sender),
            processing_handle: None,
            recv_receiver,
            send_sender,
        };

        ret.processing_handle = Some(std::thread::spawn(move || {
            process(adapter, shutdown_receiver, recv_sender, send_receiver);
        }));

        ret
    }

    /// Send a single frame. The Future will resolve once the frame has been handed over to the adapter and echoed back as a loopback frame. This does not mean the message is sent out on the CAN bus yet, as this could be pending arbitration.
    pub async fn send(&self, frame: &Frame) -> Result<(), Error> {
        // Create oneshot channel to signal the completion of the send operation
        let (callback_sender, callback_receiver) = oneshot::channel();
        self.send_sender
            .send((frame.clone(), Some(callback_sender)))
            .await
            .map_err(|_| Error::Disconnected)?;

        callback_receiver.await.map_err(|_| Error::Disconnected)
    }

    /// Queue a frame for transmission without waiting. Intended for fixed-period control loops that must never block. Returns [`Error::TxQueueFull`] when the transmit queue is saturated; the frame is dropped in that case.
    pub fn try_send(&self, frame: &Frame) -> Result<(), Error> {
        match self.send_sender.try_send((frame.clone(), None)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(Error::TxQueueFull),
            Err(TrySendError::Closed(_)) => Err(Error::Disconnected),
        }
    }

    /// Receive all frames.
    pub fn recv(&self) -> impl Stream<Item = Frame> {
        self.recv_filter(|_| true)
    }

    /// Receive frames that match a filter. Useful in combination with stream adapters.
    pub fn recv_filter(&self, filter: impl Fn(&Frame) -> bool) -> impl Stream<Item = Frame> {
        let mut rx = self.recv_receiver.resubscribe();

        Box::pin(stream! {
            loop { match rx.recv().await {
                    Ok(frame) => {
                        if filter(&frame) {
                            yield frame
                        } else {
                            continue
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Receiver lagged, {} frames dropped", n);
                        continue
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}

impl Drop for AsyncCanAdapter {
    fn drop(&mut self) {
        if let Some(handle) = self.processing_handle.take() {
            // Send shutdown signal to background tread
            if let Some(shutdown) = self.shutdown.take() {
                let _ = shutdown.send(());
            }
            let _ = handle.join();
        }
    }
}
