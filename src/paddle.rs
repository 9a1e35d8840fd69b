//! Paddle contacts wired to a serial port's modem-status inputs.
//!
//! The dit paddle closes DCD and the dah paddle closes CTS. A reader thread
//! sleeps in the kernel until either line changes, then reports the new
//! contact state.

use crossbeam_channel::{bounded, Receiver, Sender};
use std::fs::File;
use std::os::fd::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::messages::Paddles;

#[derive(Debug, Error)]
pub enum PaddleError {
    #[error("failed to open keyer device {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to start paddle reader: {0}")]
    Spawn(std::io::Error),
    #[error("paddle input needs modem-status interrupts, which this platform lacks")]
    Unsupported,
}

/// Owns the keyer device. Dropping it closes the device, which ends the
/// reader thread with an I/O error and closes the event channel.
#[derive(Debug)]
pub struct PaddleReader {
    _device: File,
}

impl PaddleReader {
    pub fn open(path: &Path) -> Result<(Self, Receiver<Paddles>), PaddleError> {
        if !cfg!(target_os = "linux") {
            return Err(PaddleError::Unsupported);
        }

        let device = File::open(path).map_err(|source| PaddleError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let fd = device.as_raw_fd();
        let (tx, rx) = bounded(10);

        std::thread::Builder::new()
            .name("paddle-reader".into())
            .spawn(move || read_paddles(fd, tx))
            .map_err(PaddleError::Spawn)?;

        log::info!("reading paddles from {}", path.display());
        Ok((Self { _device: device }, rx))
    }
}

/// Map TIOCMGET modem bits to paddle contacts.
pub fn paddles_from_modem_bits(bits: libc::c_int) -> Paddles {
    let mut paddles = Paddles::NONE;
    if bits & libc::TIOCM_CD != 0 {
        paddles |= Paddles::DIT;
    }
    if bits & libc::TIOCM_CTS != 0 {
        paddles |= Paddles::DAH;
    }
    paddles
}

#[cfg(target_os = "linux")]
fn read_paddles(fd: RawFd, tx: Sender<Paddles>) {
    // asm-generic value; libc does not export it
    const TIOCMIWAIT: libc::c_ulong = 0x545C;
    let mask = (libc::TIOCM_CD | libc::TIOCM_CTS) as libc::c_ulong;

    loop {
        // SAFETY: fd stays a valid descriptor or fails with EBADF once closed
        if unsafe { libc::ioctl(fd, TIOCMIWAIT as _, mask) } < 0 {
            log::error!("ioctl TIOCMIWAIT: {}", std::io::Error::last_os_error());
            return;
        }
        let mut bits: libc::c_int = 0;
        // SAFETY: TIOCMGET writes one c_int through the pointer
        if unsafe { libc::ioctl(fd, libc::TIOCMGET as _, &mut bits as *mut libc::c_int) } < 0 {
            log::error!("ioctl TIOCMGET: {}", std::io::Error::last_os_error());
            return;
        }
        if tx.send(paddles_from_modem_bits(bits)).is_err() {
            log::debug!("paddle receiver gone");
            return;
        }
    }
}

#[cfg(not(target_os = "linux"))]
fn read_paddles(_fd: RawFd, _tx: Sender<Paddles>) {}
