//! Background line capture over a child's output stream.
//!
//! [`LineReader::spawn`] starts a thread that reads the stream line by line
//! into a [`LineBuffer`]. The consumer pulls lines with
//! [`LineReader::read_next`], which waits on a condition variable instead of
//! sleeping so new output wakes it immediately.

use crate::buffer::LineBuffer;
use crate::encoding::LineEncoding;
use std::io::{self, BufRead, BufReader, Read};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{Span, debug, trace, warn};

/// How long a blocking read may wait for output.
///
/// The reader waits up to `poll_interval` per attempt and gives up after
/// `max_attempts` attempts without a new line, so the total budget is
/// `poll_interval * max_attempts`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budget {
    pub poll_interval: Duration,
    pub max_attempts: u32,
}

impl Budget {
    pub const fn new(poll_interval: Duration, max_attempts: u32) -> Self {
        Self {
            poll_interval,
            max_attempts,
        }
    }

    /// A single attempt lasting `timeout`.
    pub const fn from_timeout(timeout: Duration) -> Self {
        Self::new(timeout, 1)
    }

    /// Do not wait at all; only already captured lines are returned.
    pub const fn immediate() -> Self {
        Self::new(Duration::ZERO, 0)
    }

    /// Total time the budget allows.
    pub fn total(&self) -> Duration {
        self.poll_interval
            .checked_mul(self.max_attempts)
            .unwrap_or(Duration::MAX)
    }
}

impl Default for Budget {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), 1)
    }
}

#[derive(Debug)]
struct State {
    buffer: LineBuffer,
    closed: bool,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<State>,
    changed: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Owns the capture thread and the buffer it fills.
///
/// Only one consumer may read at a time; the read cursor is shared state.
pub struct LineReader {
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
    span: Span,
}

impl LineReader {
    /// Start capturing `stream` on a dedicated thread.
    ///
    /// The thread runs until the stream reports end-of-stream or a read
    /// error, then marks the reader closed.
    pub fn spawn<R>(
        stream: R,
        capacity: usize,
        encoding: LineEncoding,
        span: Span,
    ) -> io::Result<Self>
    where
        R: Read + Send + 'static,
    {
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                buffer: LineBuffer::new(capacity),
                closed: false,
            }),
            changed: Condvar::new(),
        });

        let thread_shared = Arc::clone(&shared);
        let thread_span = span.clone();
        let handle = thread::Builder::new()
            .name("shexpect-capture".into())
            .spawn(move || {
                let _enter = thread_span.enter();
                capture(stream, &thread_shared, encoding);
            })?;

        Ok(Self {
            shared,
            handle: Some(handle),
            span,
        })
    }

    /// Return the next unread line, waiting within `budget` for one to arrive.
    ///
    /// Returns `None` when the budget runs out without new output, or right
    /// away once the stream has closed and everything has been read.
    pub fn read_next(&self, budget: Budget) -> Option<String> {
        let mut state = self.shared.lock();
        let mut attempts = 0;
        loop {
            if let Some(line) = state.buffer.next_unread() {
                return Some(line);
            }
            if state.closed || attempts >= budget.max_attempts {
                return None;
            }
            attempts += 1;
            let (guard, _) = self
                .shared
                .changed
                .wait_timeout_while(state, budget.poll_interval, |s| {
                    !s.buffer.has_unread() && !s.closed
                })
                .unwrap_or_else(PoisonError::into_inner);
            state = guard;
        }
    }

    /// Whether the capture thread has seen end-of-stream.
    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }

    /// Whether there are no unread lines and none can arrive any more.
    pub fn is_exhausted(&self) -> bool {
        let state = self.shared.lock();
        state.closed && !state.buffer.has_unread()
    }

    /// Number of lines currently held in the buffer.
    pub fn len(&self) -> usize {
        self.shared.lock().buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of captured lines not yet returned by [`read_next`](Self::read_next).
    pub fn unread(&self) -> usize {
        self.shared.lock().buffer.unread()
    }

    /// Lines evicted before they were read.
    pub fn lost_lines(&self) -> u64 {
        self.shared.lock().buffer.lost()
    }

    /// All lines evicted so far, read or not.
    pub fn evicted_lines(&self) -> u64 {
        self.shared.lock().buffer.evicted()
    }

    /// Block until the stream closes or `timeout` elapses.
    pub fn wait_closed(&self, timeout: Duration) -> bool {
        let state = self.shared.lock();
        let (state, _) = self
            .shared
            .changed
            .wait_timeout_while(state, timeout, |s| !s.closed)
            .unwrap_or_else(PoisonError::into_inner);
        state.closed
    }

    /// Join the capture thread if it finishes within `timeout`.
    ///
    /// If the stream is still open after `timeout` the thread is detached
    /// and keeps running until the stream closes. Returns whether it was
    /// joined.
    pub fn join(&mut self, timeout: Duration) -> bool {
        let Some(handle) = self.handle.take() else {
            return true;
        };
        let _enter = self.span.enter();

        if !self.wait_closed(timeout) {
            warn!(?timeout, "output stream still open, detaching capture thread");
            return false;
        }
        if handle.join().is_err() {
            warn!("capture thread panicked");
        }
        true
    }
}

fn capture<R: Read>(stream: R, shared: &Shared, encoding: LineEncoding) {
    let mut reader = BufReader::new(stream);
    let mut raw = Vec::with_capacity(256);
    let mut warned_loss = false;
    debug!("capture started");

    loop {
        raw.clear();
        match reader.read_until(b'\n', &mut raw) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                // A PTY master reports a hung-up child as EIO.
                debug!(error = %e, "output read failed, treating as end of stream");
                break;
            }
        }

        let line = match encoding.decode(trim_line_end(&raw)) {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, len = raw.len(), "skipping undecodable line");
                continue;
            }
        };
        trace!(%line, "captured");

        let lost = shared.lock().buffer.push(line);
        shared.changed.notify_all();

        if lost && !warned_loss {
            warn!("line buffer full, unread output is being dropped");
            warned_loss = true;
        }
    }

    shared.lock().closed = true;
    shared.changed.notify_all();
    debug!("capture finished");
}

/// Strip trailing `\n` and `\r` bytes.
pub(crate) fn trim_line_end(raw: &[u8]) -> &[u8] {
    let end = raw
        .iter()
        .rposition(|&b| b != b'\n' && b != b'\r')
        .map_or(0, |i| i + 1);
    &raw[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ChannelStream;
    use std::io::Cursor;

    const PATIENT: Budget = Budget::new(Duration::from_secs(5), 1);

    fn reader_over(data: &[u8], capacity: usize) -> LineReader {
        LineReader::spawn(
            Cursor::new(data.to_vec()),
            capacity,
            LineEncoding::Utf8,
            Span::none(),
        )
        .unwrap()
    }

    #[test]
    fn test_trim_line_end() {
        assert_eq!(trim_line_end(b"abc\r\n"), b"abc");
        assert_eq!(trim_line_end(b"abc\n"), b"abc");
        assert_eq!(trim_line_end(b"abc"), b"abc");
        assert_eq!(trim_line_end(b"\r\n"), b"");
        assert_eq!(trim_line_end(b"  padded  \n"), b"  padded  ");
    }

    #[test]
    fn test_budget_total() {
        assert_eq!(
            Budget::new(Duration::from_millis(250), 4).total(),
            Duration::from_secs(1)
        );
        assert_eq!(Budget::new(Duration::ZERO, 1).total(), Duration::ZERO);
        assert_eq!(Budget::default().total(), Duration::from_secs(1));
    }

    #[test]
    fn test_reads_lines_in_order() {
        let reader = reader_over(b"one\r\ntwo\nthree", 10);
        assert_eq!(reader.read_next(PATIENT).as_deref(), Some("one"));
        assert_eq!(reader.read_next(PATIENT).as_deref(), Some("two"));
        assert_eq!(reader.read_next(PATIENT).as_deref(), Some("three"));
        assert_eq!(reader.read_next(PATIENT), None);
        assert!(reader.is_exhausted());
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let mut reader = reader_over(b"A\nB\nC\nD\n", 3);
        assert!(reader.join(Duration::from_secs(5)));
        assert_eq!(reader.len(), 3);
        assert_eq!(reader.read_next(PATIENT).as_deref(), Some("B"));
        assert_eq!(reader.lost_lines(), 1);
        assert_eq!(reader.evicted_lines(), 1);
    }

    #[test]
    fn test_malformed_line_is_skipped() {
        let mut reader = reader_over(b"good\nbad \xff\nstill good\n", 10);
        assert!(reader.join(Duration::from_secs(5)));
        assert_eq!(reader.read_next(PATIENT).as_deref(), Some("good"));
        assert_eq!(reader.read_next(PATIENT).as_deref(), Some("still good"));
        assert_eq!(reader.read_next(PATIENT), None);
    }

    #[test]
    fn test_no_data_after_budget() {
        let (feed, stream) = ChannelStream::pair();
        let reader = LineReader::spawn(stream, 10, LineEncoding::Utf8, Span::none()).unwrap();

        let budget = Budget::new(Duration::from_millis(20), 2);
        assert_eq!(reader.read_next(budget), None);
        assert!(!reader.is_closed());

        feed.send(b"late\n".to_vec()).unwrap();
        assert_eq!(reader.read_next(PATIENT).as_deref(), Some("late"));
    }

    #[test]
    fn test_waiting_reader_wakes_on_new_line() {
        let (feed, stream) = ChannelStream::pair();
        let reader = LineReader::spawn(stream, 10, LineEncoding::Utf8, Span::none()).unwrap();

        let writer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            feed.send(b"wake up\n".to_vec()).unwrap();
        });

        let start = std::time::Instant::now();
        let line = reader.read_next(Budget::new(Duration::from_secs(30), 1));
        assert_eq!(line.as_deref(), Some("wake up"));
        assert!(start.elapsed() < Duration::from_secs(10));
        writer.join().unwrap();
    }

    #[test]
    fn test_join_detaches_open_stream() {
        let (_feed, stream) = ChannelStream::pair();
        let mut reader = LineReader::spawn(stream, 10, LineEncoding::Utf8, Span::none()).unwrap();
        assert!(!reader.join(Duration::from_millis(20)));
        // Already detached; nothing left to join.
        assert!(reader.join(Duration::ZERO));
    }

    #[test]
    fn test_closed_stream_returns_immediately() {
        let mut reader = reader_over(b"", 10);
        assert!(reader.join(Duration::from_secs(5)));
        let start = std::time::Instant::now();
        assert_eq!(reader.read_next(Budget::new(Duration::from_secs(30), 3)), None);
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
