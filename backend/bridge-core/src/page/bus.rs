use crate::page::protocol::PageMessage;

use tokio::sync::broadcast;

const PAGE_BUS_CAPACITY: usize = 256;

/// Broadcast channel standing in for the page's message port. Every listener
/// sees every message, including its own posts.
#[derive(Clone)]
pub struct PageBus {
    sender: broadcast::Sender<PageMessage>,
}

impl Default for PageBus {
    fn default() -> Self {
        Self::new()
    }
}

impl PageBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(PAGE_BUS_CAPACITY);
        Self { sender }
    }

    /// Returns how many listeners received the message.
    pub fn post(&self, message: PageMessage) -> usize {
        self.sender.send(message).unwrap_or(0)
    }

    pub fn listen(&self) -> broadcast::Receiver<PageMessage> {
        self.sender.subscribe()
    }
}
