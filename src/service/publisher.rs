//! Latest value publication to a single consumer

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use tracing::debug;

/// Channel of depth one. Publishing into a full channel replaces the unread
/// value, so the consumer always gets the newest one.
#[derive(Debug)]
pub struct Publisher<T> {
    sender: Mutex<Option<Sender<T>>>,
    drain: Receiver<T>,
}

impl<T> Publisher<T> {
    pub fn new() -> Self {
        let (sender, drain) = bounded(1);
        Self {
            sender: Mutex::new(Some(sender)),
            drain,
        }
    }

    pub fn subscribe(&self) -> Receiver<T> {
        self.drain.clone()
    }

    /// False once closed
    pub fn publish(&self, value: T) -> bool {
        // Held while replacing, so concurrent publishers cannot interleave
        let sender = self.sender.lock();
        let Some(sender) = sender.as_ref() else {
            return false;
        };

        let mut value = value;
        loop {
            match sender.try_send(value) {
                Ok(()) => return true,
                Err(TrySendError::Full(v)) => {
                    if self.drain.try_recv().is_ok() {
                        debug!("Dropped unread change");
                    }
                    value = v;
                }
                Err(TrySendError::Disconnected(_)) => return false,
            }
        }
    }

    /// Subscribers see a disconnected channel once the pending value is read
    pub fn close(&self) {
        self.sender.lock().take();
    }
}

impl<T> Default for Publisher<T> {
    fn default() -> Self {
        Self::new()
    }
}
