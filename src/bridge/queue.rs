// src/bridge/queue.rs - Fixed-capacity deferred command buffer
use crate::error::CommandError;

/// Longest command text a queue slot holds, in characters.
pub const MAX_QUEUED_COMMAND_LEN: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub command_text: String,
    /// Empty until the entry has been drained and executed.
    pub response_text: String,
}

/// Ring buffer of pending commands. Enqueue never blocks: a full queue
/// rejects the new entry and keeps the old ones.
#[derive(Debug, Clone)]
pub struct CommandQueue {
    slots: Vec<Option<QueueEntry>>,
    write: usize,
    read: usize,
    count: usize,
}

impl CommandQueue {
    pub fn new(capacity: usize) -> Self {
        Self { slots: vec![None; capacity.max(1)], write: 0, read: 0, count: 0 }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count == self.slots.len()
    }

    /// Returns the number of pending entries after the append.
    pub fn enqueue(&mut self, command: &str) -> Result<usize, CommandError> {
        if self.is_full() {
            return Err(CommandError::QueueFull { capacity: self.capacity() });
        }
        if command.chars().count() > MAX_QUEUED_COMMAND_LEN {
            return Err(CommandError::InvalidCommand(format!(
                "command longer than {} characters",
                MAX_QUEUED_COMMAND_LEN
            )));
        }
        self.slots[self.write] = Some(QueueEntry { command_text: command.to_string(), response_text: String::new() });
        self.write = (self.write + 1) % self.slots.len();
        self.count += 1;
        Ok(self.count)
    }

    /// Oldest pending entry.
    pub fn pop(&mut self) -> Option<QueueEntry> {
        if self.count == 0 {
            return None;
        }
        let entry = self.slots[self.read].take();
        self.read = (self.read + 1) % self.slots.len();
        self.count -= 1;
        entry
    }

    pub fn peek(&self) -> Option<&QueueEntry> {
        if self.count == 0 {
            return None;
        }
        self.slots[self.read].as_ref()
    }
}
