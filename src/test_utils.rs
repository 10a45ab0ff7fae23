use crate::process::{ChildProcess, SpawnedProcess};
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, Mutex};

/// A blocking byte stream fed through a channel. Dropping the sender is EOF.
pub struct ChannelStream {
    rx: Receiver<Vec<u8>>,
    pending: Vec<u8>,
    pos: usize,
}

impl ChannelStream {
    pub fn pair() -> (Sender<Vec<u8>>, Self) {
        let (tx, rx) = channel();
        (
            tx,
            Self {
                rx,
                pending: Vec::new(),
                pos: 0,
            },
        )
    }
}

impl Read for ChannelStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.pos >= self.pending.len() {
            match self.rx.recv() {
                Ok(chunk) => {
                    self.pending = chunk;
                    self.pos = 0;
                }
                Err(_) => return Ok(0),
            }
        }
        let n = buf.len().min(self.pending.len() - self.pos);
        buf[..n].copy_from_slice(&self.pending[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// Collects everything written to it.
#[derive(Clone, Default)]
pub struct SharedSink(pub Arc<Mutex<Vec<u8>>>);

impl SharedSink {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for SharedSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Child handle that drops the output feed when it goes away, like a real
/// process closing its stdout on exit.
///
/// It exits by itself once an `exit` line has been written to its input,
/// unless [`FakeControls::ignore_exit`] is set.
pub struct FakeChild {
    feed: Arc<Mutex<Option<Sender<Vec<u8>>>>>,
    input: SharedSink,
    ignore_exit: Arc<AtomicBool>,
    terminated: Arc<AtomicBool>,
    killed: Arc<AtomicBool>,
}

impl FakeChild {
    fn go_away(&self) {
        self.terminated.store(true, Ordering::SeqCst);
        self.feed.lock().unwrap().take();
    }
}

impl ChildProcess for FakeChild {
    fn process_id(&self) -> Option<u32> {
        None
    }

    fn has_exited(&mut self) -> bool {
        let asked_to_exit = self.input.contents().lines().any(|line| line == "exit");
        if asked_to_exit && !self.ignore_exit.load(Ordering::SeqCst) {
            self.go_away();
        }
        self.terminated.load(Ordering::SeqCst)
    }

    fn terminate(&mut self) -> io::Result<()> {
        if !self.has_exited() {
            self.killed.store(true, Ordering::SeqCst);
            self.go_away();
        }
        Ok(())
    }

    fn wait(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Test-side controls for a [`fake_process`].
#[derive(Clone)]
pub struct FakeControls {
    feed: Arc<Mutex<Option<Sender<Vec<u8>>>>>,
    pub input: SharedSink,
    /// Set once the child is gone, by exiting or by being killed.
    pub terminated: Arc<AtomicBool>,
    /// Set only when the child had to be killed.
    pub killed: Arc<AtomicBool>,
    pub ignore_exit: Arc<AtomicBool>,
}

impl FakeControls {
    /// Emit output lines from the fake child.
    pub fn emit(&self, lines: &[&str]) {
        if let Some(tx) = self.feed.lock().unwrap().as_ref() {
            for line in lines {
                let _ = tx.send(format!("{line}\n").into_bytes());
            }
        }
    }

    /// Emit raw output bytes.
    pub fn emit_raw(&self, bytes: &[u8]) {
        if let Some(tx) = self.feed.lock().unwrap().as_ref() {
            let _ = tx.send(bytes.to_vec());
        }
    }

    /// Close the child's output stream.
    pub fn close(&self) {
        self.feed.lock().unwrap().take();
    }
}

/// An in-memory child process with scriptable output.
pub fn fake_process() -> (SpawnedProcess, FakeControls) {
    let (tx, stream) = ChannelStream::pair();
    let feed = Arc::new(Mutex::new(Some(tx)));
    let input = SharedSink::default();
    let ignore_exit = Arc::new(AtomicBool::new(false));
    let terminated = Arc::new(AtomicBool::new(false));
    let killed = Arc::new(AtomicBool::new(false));

    let process = SpawnedProcess {
        child: Box::new(FakeChild {
            feed: Arc::clone(&feed),
            input: input.clone(),
            ignore_exit: Arc::clone(&ignore_exit),
            terminated: Arc::clone(&terminated),
            killed: Arc::clone(&killed),
        }),
        input: Box::new(input.clone()),
        output: Box::new(stream),
        error: None,
    };
    let controls = FakeControls {
        feed,
        input,
        terminated,
        killed,
        ignore_exit,
    };
    (process, controls)
}
