//! Sync-over-async bridge for binary-format libraries.
//!
//! Many format libraries expect `std::io::Read + Seek`. [`BlockingReader`]
//! adapts any [`StoreReader`] to that contract by running its async methods
//! on a dedicated current-thread runtime living on a background thread.
//! Commands are shipped over a channel, so calling into the bridge is safe
//! from any thread, including threads that are themselves inside a tokio
//! runtime, where a plain `block_on` would panic or deadlock the driver.

use std::io;
use std::io::SeekFrom;
use std::sync::mpsc;
use std::thread::JoinHandle;

use bytes::Bytes;

use crate::error::StoreError;

use super::StoreReader;

enum Command {
    Read {
        len: usize,
        reply: mpsc::Sender<Result<Bytes, StoreError>>,
    },
    Seek {
        pos: SeekFrom,
        reply: mpsc::Sender<Result<u64, StoreError>>,
    },
    Tell {
        reply: mpsc::Sender<u64>,
    },
    Shutdown,
}

/// Blocking adapter over any [`StoreReader`].
///
/// The wrapped reader lives on a background thread that owns a dedicated
/// tokio runtime; every `read`/`seek` call sends a command to that thread
/// and blocks the caller until the reply arrives. Dropping the adapter
/// closes the wrapped reader and shuts the thread down.
///
/// ```ignore
/// let reader = BlockReader::new(store, "data/file.nc");
/// let mut file = BlockingReader::new(reader)?;
/// let mut header = [0u8; 8];
/// file.read_exact(&mut header)?;
/// ```
pub struct BlockingReader {
    commands: mpsc::Sender<Command>,
    worker: Option<JoinHandle<()>>,
}

impl BlockingReader {
    /// Move `reader` onto a dedicated background event loop.
    pub fn new<R: StoreReader + 'static>(reader: R) -> io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let (commands, inbox) = mpsc::channel::<Command>();

        let worker = std::thread::Builder::new()
            .name("rangestore-blocking".to_string())
            .spawn(move || {
                let mut reader = reader;
                for command in inbox {
                    match command {
                        Command::Read { len, reply } => {
                            let _ = reply.send(runtime.block_on(reader.read(len)));
                        }
                        Command::Seek { pos, reply } => {
                            let _ = reply.send(runtime.block_on(reader.seek(pos)));
                        }
                        Command::Tell { reply } => {
                            let _ = reply.send(reader.tell());
                        }
                        Command::Shutdown => break,
                    }
                }
                reader.close();
            })?;

        Ok(Self {
            commands,
            worker: Some(worker),
        })
    }

    /// The current position of the wrapped reader.
    pub fn tell(&self) -> io::Result<u64> {
        let (reply, inbox) = mpsc::channel();
        self.commands
            .send(Command::Tell { reply })
            .map_err(|_| worker_gone())?;
        inbox.recv().map_err(|_| worker_gone())
    }
}

impl io::Read for BlockingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let (reply, inbox) = mpsc::channel();
        self.commands
            .send(Command::Read {
                len: buf.len(),
                reply,
            })
            .map_err(|_| worker_gone())?;
        let data = inbox
            .recv()
            .map_err(|_| worker_gone())?
            .map_err(into_io_error)?;
        buf[..data.len()].copy_from_slice(&data);
        Ok(data.len())
    }
}

impl io::Seek for BlockingReader {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let (reply, inbox) = mpsc::channel();
        self.commands
            .send(Command::Seek { pos, reply })
            .map_err(|_| worker_gone())?;
        inbox
            .recv()
            .map_err(|_| worker_gone())?
            .map_err(into_io_error)
    }
}

impl Drop for BlockingReader {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn worker_gone() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "reader worker thread exited")
}

fn into_io_error(err: StoreError) -> io::Error {
    let kind = match &err {
        StoreError::NotFound(_) => io::ErrorKind::NotFound,
        StoreError::OutOfRange { .. } => io::ErrorKind::InvalidInput,
        StoreError::Precondition { .. } => io::ErrorKind::PermissionDenied,
        StoreError::Transport(_) => io::ErrorKind::Other,
        StoreError::InvalidGlob { .. } => io::ErrorKind::InvalidInput,
    };
    io::Error::new(kind, err)
}
