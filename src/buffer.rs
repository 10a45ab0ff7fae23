//! Bounded line store with a single read cursor.
//!
//! [`LineBuffer`] keeps at most `capacity` lines. When a push would exceed
//! that, the oldest line is evicted and the cursor moves back by one so the
//! next unread line stays the same. If the consumer has not read the evicted
//! line yet (cursor at 0) the line is gone for good and counted as lost.
//!
//! Drop-oldest is lossy on purpose: a session can run for hours and the
//! buffer must not grow without bound. A consumer that falls more than
//! `capacity` lines behind will miss output; [`LineBuffer::lost`] reports how
//! many lines that was.

use std::collections::VecDeque;

/// Default number of lines kept in memory per session.
pub const DEFAULT_CAPACITY: usize = 5000;

#[derive(Debug)]
pub struct LineBuffer {
    lines: VecDeque<String>,
    capacity: usize,
    cursor: usize,
    evicted: u64,
    lost: u64,
}

impl LineBuffer {
    /// Create an empty buffer. A capacity of 0 is bumped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            lines: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            cursor: 0,
            evicted: 0,
            lost: 0,
        }
    }

    /// Append a line, evicting the oldest one if the buffer is full.
    ///
    /// Returns `true` if the evicted line had not been read yet.
    pub fn push(&mut self, line: String) -> bool {
        self.lines.push_back(line);
        if self.lines.len() <= self.capacity {
            return false;
        }

        self.lines.pop_front();
        self.evicted += 1;
        if self.cursor > 0 {
            self.cursor -= 1;
            false
        } else {
            self.lost += 1;
            true
        }
    }

    /// Take the next unread line and advance the cursor.
    pub fn next_unread(&mut self) -> Option<String> {
        let line = self.lines.get(self.cursor)?.clone();
        self.cursor += 1;
        Some(line)
    }

    pub fn has_unread(&self) -> bool {
        self.cursor < self.lines.len()
    }

    pub fn unread(&self) -> usize {
        self.lines.len() - self.cursor
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Total number of lines dropped by eviction.
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    /// Lines dropped before the consumer ever saw them.
    pub fn lost(&self) -> u64 {
        self.lost
    }

    /// Iterate over the lines currently held, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
