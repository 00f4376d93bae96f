//! Async file logger with a bounded in-memory ring.
//!
//! The hot path formats into a fixed 256-byte entry and pushes it onto a
//! lock-free bounded queue; it never blocks and never allocates. When the
//! ring is full, new entries are dropped and counted. A background thread
//! drains the ring to the file every 10 ms and on shutdown.
//!
//! Output format: one entry per line, `<ns_timestamp> <message>`.

use std::fmt::{self, Write as _};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_queue::ArrayQueue;

use crate::time::now_ns;

/// Maximum message payload per entry; longer messages are truncated.
pub const MAX_MESSAGE_SIZE: usize = 256;

/// Default ring capacity (power of two).
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

const FLUSH_INTERVAL: Duration = Duration::from_millis(10);

/// Fixed-size log entry; no heap allocation on the logging path.
struct LogEntry {
    timestamp: u64,
    len: usize,
    message: [u8; MAX_MESSAGE_SIZE],
}

/// Bounded formatter that truncates at the entry size instead of failing.
struct MsgBuf {
    buf: [u8; MAX_MESSAGE_SIZE],
    len: usize,
}

impl MsgBuf {
    fn new() -> Self {
        Self {
            buf: [0; MAX_MESSAGE_SIZE],
            len: 0,
        }
    }
}

impl fmt::Write for MsgBuf {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let space = MAX_MESSAGE_SIZE - self.len;
        if space == 0 {
            return Ok(());
        }

        let mut take = s.len().min(space);
        // Never split a multi-byte character.
        while take > 0 && !s.is_char_boundary(take) {
            take -= 1;
        }

        self.buf[self.len..self.len + take].copy_from_slice(&s.as_bytes()[..take]);
        self.len += take;
        Ok(())
    }
}

struct Shared {
    ring: ArrayQueue<LogEntry>,
    logged: AtomicU64,
    dropped: AtomicU64,
    stop: AtomicBool,
}

/// Handle used on the hot path. Cheap to clone; all clones feed the same
/// ring.
#[derive(Clone)]
pub struct LogHandle {
    shared: Arc<Shared>,
}

impl LogHandle {
    /// Enqueue a formatted message. Drops (and counts) on a full ring.
    pub fn log(&self, args: fmt::Arguments<'_>) {
        let mut msg = MsgBuf::new();
        // MsgBuf::write_str never errors; truncation is silent.
        let _ = msg.write_fmt(args);

        let entry = LogEntry {
            timestamp: now_ns(),
            len: msg.len,
            message: msg.buf,
        };

        if self.shared.ring.push(entry).is_err() {
            self.shared.dropped.fetch_add(1, Ordering::Relaxed);
        } else {
            self.shared.logged.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn messages_logged(&self) -> u64 {
        self.shared.logged.load(Ordering::Relaxed)
    }

    pub fn messages_dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }
}

/// Owner of the flush thread. Dropping it (or calling [`shutdown`]) drains
/// the ring a final time and closes the file.
///
/// [`shutdown`]: AsyncLogger::shutdown
pub struct AsyncLogger {
    handle: LogHandle,
    flusher: Option<JoinHandle<()>>,
}

impl AsyncLogger {
    /// Open `path` (truncating) and start the flush thread.
    ///
    /// Open failure is fatal for callers and is surfaced as the error.
    pub fn create<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let file = File::create(path)?;

        let shared = Arc::new(Shared {
            ring: ArrayQueue::new(DEFAULT_BUFFER_SIZE),
            logged: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            stop: AtomicBool::new(false),
        });

        let flusher_shared = Arc::clone(&shared);
        let flusher = thread::Builder::new()
            .name("log-flusher".into())
            .spawn(move || flush_loop(flusher_shared, file))?;

        Ok(Self {
            handle: LogHandle { shared },
            flusher: Some(flusher),
        })
    }

    /// Hot-path handle for the engine thread.
    pub fn handle(&self) -> LogHandle {
        self.handle.clone()
    }

    pub fn messages_logged(&self) -> u64 {
        self.handle.messages_logged()
    }

    pub fn messages_dropped(&self) -> u64 {
        self.handle.messages_dropped()
    }

    /// Stop the flush thread after a final drain.
    pub fn shutdown(mut self) {
        self.stop_and_join();
    }

    fn stop_and_join(&mut self) {
        self.handle.shared.stop.store(true, Ordering::Release);
        if let Some(flusher) = self.flusher.take() {
            let _ = flusher.join();
        }
    }
}

impl Drop for AsyncLogger {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

fn flush_loop(shared: Arc<Shared>, file: File) {
    let mut writer = BufWriter::new(file);

    loop {
        let stopping = shared.stop.load(Ordering::Acquire);

        while let Some(entry) = shared.ring.pop() {
            // Entries hold only what MsgBuf wrote, which is valid UTF-8.
            let message = std::str::from_utf8(&entry.message[..entry.len]).unwrap_or("");
            let _ = writeln!(writer, "{} {}", entry.timestamp, message);
        }
        let _ = writer.flush();

        if stopping {
            break;
        }
        thread::sleep(FLUSH_INTERVAL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Write as _;

    fn temp_log_path(name: &str) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("tickforge-{}-{}.log", name, std::process::id()));
        path
    }

    #[test]
    fn test_msgbuf_truncates_at_capacity() {
        let mut buf = MsgBuf::new();
        let long = "x".repeat(MAX_MESSAGE_SIZE + 100);
        buf.write_str(&long).unwrap();
        assert_eq!(buf.len, MAX_MESSAGE_SIZE);

        // Further writes are swallowed, not errors.
        buf.write_str("more").unwrap();
        assert_eq!(buf.len, MAX_MESSAGE_SIZE);
    }

    #[test]
    fn test_msgbuf_respects_char_boundaries() {
        let mut buf = MsgBuf::new();
        // 255 ASCII bytes then a 2-byte char that cannot fit whole.
        buf.write_str(&"a".repeat(MAX_MESSAGE_SIZE - 1)).unwrap();
        buf.write_str("é").unwrap();
        assert_eq!(buf.len, MAX_MESSAGE_SIZE - 1);
        assert!(std::str::from_utf8(&buf.buf[..buf.len]).is_ok());
    }

    #[test]
    fn test_log_roundtrip_to_file() {
        let path = temp_log_path("roundtrip");
        {
            let logger = AsyncLogger::create(&path).unwrap();
            let handle = logger.handle();
            handle.log(format_args!("trade {} @ {}", 10, 100));
            handle.log(format_args!("second line"));
            assert_eq!(logger.messages_logged(), 2);
            logger.shutdown();
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("trade 10 @ 100"));
        // Each line leads with a numeric ns timestamp.
        let ts: u64 = lines[0].split(' ').next().unwrap().parse().unwrap();
        let _ = ts;

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_create_fails_on_bad_path() {
        let result = AsyncLogger::create("/nonexistent-dir-tickforge/engine.log");
        assert!(result.is_err());
    }
}
