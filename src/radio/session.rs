use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use std::time::{Duration, Instant};

use super::client::{RadioClient, RadioError};
use super::protocol::RadioMessage;
use crate::keyer::CommandSink;
use crate::messages::RadioCommand;

/// The client we key on behalf of, found during the bind handshake.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    /// Client handle, e.g. `0x7A2D1E09`
    pub client_handle: String,
    pub client_uuid: String,
    /// Per-process index stamped on every key command
    next_index: u32,
}

impl Session {
    pub fn new(client_handle: impl Into<String>, client_uuid: impl Into<String>) -> Self {
        Self {
            client_handle: client_handle.into(),
            client_uuid: client_uuid.into(),
            next_index: 0,
        }
    }

    /// Wait for the GUI client on `station` to appear, then bind to it.
    ///
    /// Messages that arrive meanwhile and are not part of the handshake are
    /// dropped.
    pub fn bind(
        client: &mut RadioClient,
        rx: &Receiver<RadioMessage>,
        station: &str,
        timeout: Duration,
    ) -> Result<Self, RadioError> {
        let deadline = Instant::now() + timeout;
        log::info!("waiting for station {station:?}");

        let sub_seq = client.send("sub client all")?;
        let mut sub_done = false;
        let mut found = None;

        while !sub_done || found.is_none() {
            match recv_before(rx, deadline, station)? {
                RadioMessage::Response { seq, code, message } if seq == sub_seq => {
                    check_response("sub client all", code, message)?;
                    sub_done = true;
                }
                RadioMessage::Status(update)
                    if update.object.starts_with("client ")
                        && update.field("station") == Some(station) =>
                {
                    let handle = update.object.split_whitespace().nth(1).unwrap_or_default();
                    let uuid = update.field("client_id").unwrap_or_default();
                    found = Some(Session::new(handle, uuid));
                }
                _ => {}
            }
        }

        let session = found.ok_or_else(|| RadioError::BindTimeout {
            station: station.to_string(),
        })?;
        log::info!(
            "found client {} uuid {}",
            session.client_handle,
            session.client_uuid
        );

        let bind_cmd = format!("client bind client_id={}", session.client_uuid);
        let bind_seq = client.send(&bind_cmd)?;
        loop {
            if let RadioMessage::Response { seq, code, message } = recv_before(rx, deadline, station)? {
                if seq == bind_seq {
                    check_response(&bind_cmd, code, message)?;
                    break;
                }
            }
        }

        client.send("sub tx all")?;
        Ok(session)
    }

    /// Text of a command for the radio. Key commands consume an index.
    pub fn command_text(&mut self, command: RadioCommand, now_millis: i64) -> String {
        match command {
            RadioCommand::Key { down } => {
                let text = format!(
                    "cw key {} time=0x{:04X} index={} client_handle={}",
                    u8::from(down),
                    now_millis.rem_euclid(65536),
                    self.next_index,
                    self.client_handle
                );
                self.next_index = self.next_index.wrapping_add(1);
                text
            }
            RadioCommand::Speed(wpm) => format!("cw wpm {wpm}"),
            RadioCommand::Pitch(hz) => format!("cw pitch {hz}"),
            RadioCommand::MonitorGain(gain) => format!("transmit set mon_gain_cw={gain}"),
        }
    }
}

fn recv_before(
    rx: &Receiver<RadioMessage>,
    deadline: Instant,
    station: &str,
) -> Result<RadioMessage, RadioError> {
    let remaining = deadline.saturating_duration_since(Instant::now());
    rx.recv_timeout(remaining).map_err(|e| match e {
        RecvTimeoutError::Timeout => RadioError::BindTimeout {
            station: station.to_string(),
        },
        RecvTimeoutError::Disconnected => RadioError::Disconnected,
    })
}

fn check_response(command: &str, code: u32, message: String) -> Result<(), RadioError> {
    if code == 0 {
        Ok(())
    } else {
        Err(RadioError::CommandFailed {
            command: command.to_string(),
            code,
            message,
        })
    }
}

/// Commands waiting for the writer thread before new ones are dropped.
const OUTBOUND_QUEUE: usize = 32;

/// Outbound side of a bound session.
///
/// Commands are formatted (and timestamped) on the caller's thread and
/// handed to a writer thread that owns the socket, so a stalled connection
/// never holds up keying. When the queue is full the command is dropped.
pub struct RadioLink {
    session: Session,
    outbound: Sender<String>,
}

impl RadioLink {
    pub fn spawn(mut client: RadioClient, session: Session) -> Result<Self, RadioError> {
        let (tx, rx) = bounded::<String>(OUTBOUND_QUEUE);
        std::thread::Builder::new()
            .name("radio-writer".into())
            .spawn(move || {
                for text in rx {
                    if let Err(e) = client.send(&text) {
                        log::warn!("dropped {text:?}: {e}");
                    }
                }
            })?;
        Ok(Self::with_queue(session, tx))
    }

    fn with_queue(session: Session, outbound: Sender<String>) -> Self {
        Self { session, outbound }
    }
}

impl CommandSink for RadioLink {
    fn send(&mut self, command: RadioCommand) {
        let text = self
            .session
            .command_text(command, chrono::Utc::now().timestamp_millis());
        match self.outbound.try_send(text) {
            Ok(()) => {}
            Err(TrySendError::Full(text)) => log::warn!("radio busy, dropped {text:?}"),
            Err(TrySendError::Disconnected(text)) => {
                log::warn!("radio writer gone, dropped {text:?}")
            }
        }
    }
}
