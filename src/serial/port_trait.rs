//! Trait abstraction for SDI-12 port operations to enable testing

use async_trait::async_trait;
use std::io;

/// Trait for line-oriented SDI-12 bus I/O
///
/// The bus is ASCII command/response: commands are written as raw bytes and
/// every response is a single line terminated by `\r\n`. Implementations
/// apply the bus-wide read timeout inside `read_line`.
#[async_trait]
pub trait Sdi12PortIo: Send {
    /// Write a complete command to the bus
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Read one response line, including its terminators
    ///
    /// Returns `io::ErrorKind::TimedOut` if the bus stays silent past the
    /// configured read timeout.
    async fn read_line(&mut self) -> io::Result<Vec<u8>>;
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Mock SDI-12 port for testing
    ///
    /// Queues canned response lines; records every command written. Clone
    /// handles share state so tests can inspect traffic after the port has
    /// been moved into a driver.
    #[derive(Clone)]
    pub struct MockSdi12Port {
        pub written: Arc<Mutex<Vec<Vec<u8>>>>,
        pub responses: Arc<Mutex<VecDeque<io::Result<Vec<u8>>>>>,
        pub write_error: Arc<Mutex<Option<io::ErrorKind>>>,
    }

    impl MockSdi12Port {
        pub fn new() -> Self {
            Self {
                written: Arc::new(Mutex::new(Vec::new())),
                responses: Arc::new(Mutex::new(VecDeque::new())),
                write_error: Arc::new(Mutex::new(None)),
            }
        }

        /// Queue a response line for the next read
        pub fn push_line(&self, line: &[u8]) {
            self.responses.lock().unwrap().push_back(Ok(line.to_vec()));
        }

        /// Queue a read error (e.g. a simulated timeout)
        pub fn push_read_error(&self, kind: io::ErrorKind) {
            self.responses
                .lock()
                .unwrap()
                .push_back(Err(io::Error::new(kind, "mock read error")));
        }

        pub fn set_write_error(&self, kind: io::ErrorKind) {
            *self.write_error.lock().unwrap() = Some(kind);
        }

        /// Commands written so far, oldest first
        pub fn get_written(&self) -> Vec<Vec<u8>> {
            self.written.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Sdi12PortIo for MockSdi12Port {
        async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
            if let Some(kind) = *self.write_error.lock().unwrap() {
                return Err(io::Error::new(kind, "mock write error"));
            }
            self.written.lock().unwrap().push(data.to_vec());
            Ok(())
        }

        async fn read_line(&mut self) -> io::Result<Vec<u8>> {
            match self.responses.lock().unwrap().pop_front() {
                Some(result) => result,
                // An empty queue behaves like a silent bus
                None => Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "no queued response",
                )),
            }
        }
    }
}
