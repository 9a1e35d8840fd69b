use crossbeam_channel::{bounded, Receiver};
use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use thiserror::Error;

use super::protocol::{encode_command, parse_line, RadioMessage};

/// TCP port of the transceiver's command API.
pub const DEFAULT_PORT: u16 = 4992;

#[derive(Debug, Error)]
pub enum RadioError {
    #[error("failed to connect to {address}: {source}")]
    Connect {
        address: String,
        source: std::io::Error,
    },
    #[error("radio connection error: {0}")]
    Io(#[from] std::io::Error),
    #[error("radio connection closed")]
    Disconnected,
    #[error("timed out waiting for station {station:?}")]
    BindTimeout { station: String },
    #[error("command {command:?} failed with code {code:#010X}: {message}")]
    CommandFailed {
        command: String,
        code: u32,
        message: String,
    },
}

/// Write half of a connection to the transceiver.
///
/// The read half runs on its own thread and delivers parsed lines over the
/// channel returned by [`RadioClient::connect`]; the channel closes when the
/// connection drops.
pub struct RadioClient {
    writer: TcpStream,
    seq: u32,
}

impl RadioClient {
    pub fn connect(address: &str) -> Result<(Self, Receiver<RadioMessage>), RadioError> {
        let address = with_default_port(address);
        let stream = TcpStream::connect(&address).map_err(|source| RadioError::Connect {
            address: address.clone(),
            source,
        })?;
        stream.set_nodelay(true)?;
        let reader = stream.try_clone()?;

        let (tx, rx) = bounded::<RadioMessage>(64);
        std::thread::Builder::new()
            .name("radio-reader".into())
            .spawn(move || {
                for line in BufReader::new(reader).lines() {
                    let line = match line {
                        Ok(line) => line,
                        Err(e) => {
                            log::error!("radio read failed: {e}");
                            break;
                        }
                    };
                    match parse_line(&line) {
                        Some(msg) => {
                            if tx.send(msg).is_err() {
                                break;
                            }
                        }
                        None => log::debug!("unparsed radio line {line:?}"),
                    }
                }
                log::info!("radio connection closed");
            })?;

        log::info!("connected to radio at {address}");
        Ok((Self { writer: stream, seq: 0 }, rx))
    }

    /// Send a command and return its sequence number. Does not wait for the
    /// response.
    pub fn send(&mut self, command: &str) -> Result<u32, RadioError> {
        self.seq = self.seq.wrapping_add(1);
        log::trace!("-> C{}|{}", self.seq, command);
        self.writer
            .write_all(encode_command(self.seq, command).as_bytes())?;
        Ok(self.seq)
    }
}

fn with_default_port(address: &str) -> String {
    if address.rsplit_once(':').is_some_and(|(_, port)| port.parse::<u16>().is_ok()) {
        address.to_string()
    } else {
        format!("{address}:{DEFAULT_PORT}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::time::Duration;

    #[test]
    fn test_default_port() {
        assert_eq!(with_default_port("10.0.0.2"), "10.0.0.2:4992");
        assert_eq!(with_default_port("10.0.0.2:5000"), "10.0.0.2:5000");
        assert_eq!(with_default_port("radio.local"), "radio.local:4992");
    }

    #[test]
    fn test_send_and_receive_lines() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap().to_string();

        let server = std::thread::spawn(move || {
            let (mut sock, _) = listener.accept().unwrap();
            sock.write_all(b"V1.4.0.0\nH00AB12CD\n").unwrap();
            let mut line = String::new();
            BufReader::new(sock.try_clone().unwrap())
                .read_line(&mut line)
                .unwrap();
            line
        });

        let (mut client, rx) = RadioClient::connect(&address).unwrap();
        assert_eq!(client.send("sub tx all").unwrap(), 1);

        let timeout = Duration::from_secs(2);
        assert_eq!(
            rx.recv_timeout(timeout).unwrap(),
            RadioMessage::Version("1.4.0.0".to_string())
        );
        assert_eq!(
            rx.recv_timeout(timeout).unwrap(),
            RadioMessage::Handle("00AB12CD".to_string())
        );
        assert_eq!(server.join().unwrap(), "C1|sub tx all\n");

        // server side dropped: channel closes
        assert!(rx.recv_timeout(timeout).is_err());
    }
}
