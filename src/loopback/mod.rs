//! In-memory [`CanAdapter`] for replaying recorded traffic and for tests.
//!
//! Frames handed to [`CanAdapter::send`] are echoed back as loopback frames, like a real adapter with `recv_own_msgs` enabled. Frames from the simulated bus are injected through the [`std::sync::mpsc::Sender`] returned by [`LoopbackAdapter::new`].
use std::collections::VecDeque;
use std::sync::mpsc;

use tracing::info;

use crate::can::{AsyncCanAdapter, CanAdapter, Frame};
use crate::Result;

/// Virtual bus without hardware behind it.
pub struct LoopbackAdapter {
    pending: VecDeque<Frame>,
    incoming: mpsc::Receiver<Frame>,
    /// Frames accepted for transmission, in order
    sent: u64,
}

impl LoopbackAdapter {
    pub fn new() -> (Self, mpsc::Sender<Frame>) {
        let (sender, incoming) = mpsc::channel();
        let adapter = Self {
            pending: VecDeque::new(),
            incoming,
            sent: 0,
        };
        (adapter, sender)
    }

    pub fn new_async() -> (AsyncCanAdapter, mpsc::Sender<Frame>) {
        let (adapter, sender) = LoopbackAdapter::new();

        info!("Connected to loopback bus");
        (AsyncCanAdapter::new(adapter), sender)
    }

    /// Number of frames transmitted so far.
    pub fn sent(&self) -> u64 {
        self.sent
    }
}

impl CanAdapter for LoopbackAdapter {
    fn send(&mut self, frames: &mut VecDeque<Frame>) -> Result<()> {
        while let Some(mut frame) = frames.pop_front() {
            frame.loopback = true;
            self.pending.push_back(frame);
            self.sent += 1;
        }

        Ok(())
    }

    fn recv(&mut self) -> Result<Vec<Frame>> {
        // Injected frames first, an echo is only produced after the frame was sent
        let mut frames: Vec<Frame> = self.incoming.try_iter().collect();
        frames.extend(self.pending.drain(..));

        Ok(frames)
    }
}
