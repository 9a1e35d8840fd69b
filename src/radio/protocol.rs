//! Line codec for the transceiver's text API.
//!
//! Outgoing commands are `C<seq>|<command>`. Incoming lines start with a
//! one-letter tag: `V` version, `H` our handle, `R` command response,
//! `S` status update, `M` message.

use std::collections::HashMap;

/// A status update: the object it describes and its changed fields.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StatusUpdate {
    pub handle: String,
    pub object: String,
    pub fields: HashMap<String, String>,
}

impl StatusUpdate {
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RadioMessage {
    Version(String),
    Handle(String),
    Response {
        seq: u32,
        code: u32,
        message: String,
    },
    Status(StatusUpdate),
    Message(String),
}

pub fn encode_command(seq: u32, command: &str) -> String {
    format!("C{seq}|{command}\n")
}

pub fn parse_line(line: &str) -> Option<RadioMessage> {
    let line = line.trim_end_matches(['\r', '\n']);
    let mut chars = line.chars();
    let tag = chars.next()?;
    let body = chars.as_str();

    match tag {
        'V' => Some(RadioMessage::Version(body.to_string())),
        'H' => Some(RadioMessage::Handle(body.to_string())),
        'R' => {
            let mut parts = body.splitn(3, '|');
            let seq = parts.next()?.parse().ok()?;
            let code = u32::from_str_radix(parts.next()?, 16).ok()?;
            let message = parts.next().unwrap_or_default().to_string();
            Some(RadioMessage::Response { seq, code, message })
        }
        'S' => {
            let (handle, rest) = body.split_once('|')?;
            Some(RadioMessage::Status(parse_status(handle, rest)))
        }
        'M' => Some(RadioMessage::Message(
            body.split_once('|').map_or(body, |(_, text)| text).to_string(),
        )),
        _ => None,
    }
}

/// Leading words without `=` name the object; the rest are `key=value`.
fn parse_status(handle: &str, rest: &str) -> StatusUpdate {
    let mut object_words = Vec::new();
    let mut fields = HashMap::new();

    for word in rest.split_whitespace() {
        match word.split_once('=') {
            Some((key, value)) => {
                fields.insert(key.to_string(), value.to_string());
            }
            None if fields.is_empty() => object_words.push(word),
            None => {}
        }
    }

    StatusUpdate {
        handle: handle.to_string(),
        object: object_words.join(" "),
        fields,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_command() {
        assert_eq!(encode_command(7, "sub tx all"), "C7|sub tx all\n");
    }

    #[test]
    fn test_parse_transmit_status() {
        let msg = parse_line("S1A2B3C4D|transmit speed=22 pitch=650 mon_gain_cw=40\r\n").unwrap();
        let RadioMessage::Status(update) = msg else {
            panic!("expected status, got {msg:?}");
        };
        assert_eq!(update.handle, "1A2B3C4D");
        assert_eq!(update.object, "transmit");
        assert_eq!(update.field("speed"), Some("22"));
        assert_eq!(update.field("mon_gain_cw"), Some("40"));
        assert_eq!(update.field("missing"), None);
    }

    #[test]
    fn test_parse_client_status() {
        let msg = parse_line(
            "S0|client 0x7A2D1E09 connected local_ptt=0 client_id=9B1D-44 program=SmartSDR station=Flex",
        )
        .unwrap();
        let RadioMessage::Status(update) = msg else {
            panic!("expected status");
        };
        assert_eq!(update.object, "client 0x7A2D1E09 connected");
        assert_eq!(update.field("station"), Some("Flex"));
        assert_eq!(update.field("client_id"), Some("9B1D-44"));
    }

    #[test]
    fn test_parse_response() {
        assert_eq!(
            parse_line("R12|50000015|Unknown command"),
            Some(RadioMessage::Response {
                seq: 12,
                code: 0x5000_0015,
                message: "Unknown command".to_string(),
            })
        );
        assert_eq!(
            parse_line("R3|0|"),
            Some(RadioMessage::Response {
                seq: 3,
                code: 0,
                message: String::new(),
            })
        );
    }

    #[test]
    fn test_parse_other_lines() {
        assert_eq!(
            parse_line("V1.4.0.0"),
            Some(RadioMessage::Version("1.4.0.0".to_string()))
        );
        assert_eq!(
            parse_line("H5E3A91C0"),
            Some(RadioMessage::Handle("5E3A91C0".to_string()))
        );
        assert_eq!(
            parse_line("M10000001|Radio is busy"),
            Some(RadioMessage::Message("Radio is busy".to_string()))
        );
        assert_eq!(parse_line(""), None);
        assert_eq!(parse_line("Rnot-a-number|0|"), None);
        assert_eq!(parse_line("Xjunk"), None);
    }
}
