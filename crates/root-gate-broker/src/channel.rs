// crates/root-gate-broker/src/channel.rs
// ============================================================================
// Module: Root Gate Decision Channel
// Description: Write-once, must-close pipe carrying a decision to the requester.
// Purpose: Encapsulate the "respond exactly once, always close" contract.
// Dependencies: root-gate-core, thiserror, std
// ============================================================================

//! ## Overview
//! A [`DecisionChannel`] wraps a [`ChannelTransport`] opened on the
//! caller-supplied path. Its entire payload is one 4-byte big-endian signed
//! integer (the [`PolicyAction`] code) followed by a flush.
//! Invariants:
//! - At most one decision is written per channel.
//! - The transport is closed exactly once: on the first [`DecisionChannel::close`]
//!   or, failing that, when the channel is dropped.
//!
//! Security posture: the path is caller-supplied; opening it is attempted but
//! never trusted beyond that. Opening never creates files.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::fs::Metadata;
use std::fs::OpenOptions;
use std::io;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use root_gate_core::ChannelOpener;
use root_gate_core::ChannelTransport;
use root_gate_core::PolicyAction;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors returned by [`DecisionChannel::send`].
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Channel was already closed.
    #[error("decision channel is closed")]
    Closed,
    /// A decision was already written on this channel.
    #[error("decision already sent on this channel")]
    AlreadySent,
    /// Transport write or flush failed.
    #[error("decision channel io error: {0}")]
    Io(#[from] io::Error),
}

// ============================================================================
// SECTION: Decision Channel
// ============================================================================

/// Lifecycle state of a decision channel.
///
/// An unopened channel has no value; [`DecisionChannel::open`] either yields
/// an `Open` channel or an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// Transport held and writable.
    Open,
    /// Transport released. Terminal.
    Closed,
}

/// One-shot decision channel bound to a requester's pipe.
pub struct DecisionChannel {
    /// Path the channel was opened on.
    path: PathBuf,
    /// Transport, present until closed.
    transport: Option<Box<dyn ChannelTransport>>,
    /// Whether a write was attempted.
    sent: bool,
}

impl DecisionChannel {
    /// Opens a channel on `path` with the given opener.
    ///
    /// # Errors
    ///
    /// Returns [`io::Error`] when the opener cannot acquire the transport.
    pub fn open(opener: &dyn ChannelOpener, path: &Path) -> io::Result<Self> {
        let transport = opener.open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            transport: Some(transport),
            sent: false,
        })
    }

    /// Returns the path the channel was opened on.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> ChannelState {
        if self.transport.is_some() { ChannelState::Open } else { ChannelState::Closed }
    }

    /// Writes the decision code as a 4-byte big-endian integer and flushes.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError`] when the channel is closed, a decision was
    /// already sent, or the transport fails.
    pub fn send(&mut self, action: PolicyAction) -> Result<(), ChannelError> {
        if self.sent {
            return Err(ChannelError::AlreadySent);
        }
        let transport = self.transport.as_mut().ok_or(ChannelError::Closed)?;
        self.sent = true;
        transport.write_all(&action.code().to_be_bytes())?;
        transport.flush()?;
        Ok(())
    }

    /// Closes the channel. Later calls are no-ops returning `Ok`.
    ///
    /// # Errors
    ///
    /// Returns the transport's close error on the first call only.
    pub fn close(&mut self) -> io::Result<()> {
        self.transport.take().map_or(Ok(()), |transport| transport.close())
    }
}

impl Drop for DecisionChannel {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

// ============================================================================
// SECTION: Writer Transport
// ============================================================================

/// [`ChannelTransport`] over any [`Write`] implementation.
pub struct WriterTransport<W: Write + Send> {
    /// Underlying writer.
    writer: W,
}

impl<W: Write + Send> WriterTransport<W> {
    /// Wraps a writer.
    pub const fn new(writer: W) -> Self {
        Self {
            writer,
        }
    }
}

impl<W: Write + Send> ChannelTransport for WriterTransport<W> {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.writer.write_all(bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    fn close(self: Box<Self>) -> io::Result<()> {
        let mut writer = self.writer;
        writer.flush()
    }
}

// ============================================================================
// SECTION: FIFO Opener
// ============================================================================

/// Opens existing pipes (or files) for writing without creating them.
#[derive(Debug, Clone, Copy, Default)]
pub struct FifoOpener {
    /// Reject targets that are not named pipes.
    require_fifo: bool,
}

impl FifoOpener {
    /// Creates an opener that accepts any existing writable path.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            require_fifo: false,
        }
    }

    /// Creates an opener that only accepts named pipes.
    #[must_use]
    pub const fn fifo_only() -> Self {
        Self {
            require_fifo: true,
        }
    }
}

impl ChannelOpener for FifoOpener {
    fn open(&self, path: &Path) -> io::Result<Box<dyn ChannelTransport>> {
        let file: File = OpenOptions::new().write(true).open(path)?;
        if self.require_fifo && !is_fifo(&file.metadata()?) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a named pipe", path.display()),
            ));
        }
        Ok(Box::new(WriterTransport::new(BufWriter::new(file))))
    }
}

/// Returns true when the metadata describes a named pipe.
#[cfg(unix)]
fn is_fifo(metadata: &Metadata) -> bool {
    use std::os::unix::fs::FileTypeExt;
    metadata.file_type().is_fifo()
}

/// Named pipes are not supported off unix.
#[cfg(not(unix))]
const fn is_fifo(_metadata: &Metadata) -> bool {
    false
}
