use super::protocol::StatusUpdate;

/// Remote keyer parameters carried by a `transmit` status update.
///
/// Only fields present in the update are set; absence means "unchanged".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ParamUpdate {
    pub speed: Option<u32>,
    pub pitch: Option<u32>,
    pub volume: Option<u32>,
}

impl ParamUpdate {
    /// Extract parameters from a status update, if it describes the
    /// transmitter. A malformed field is logged and skipped on its own.
    pub fn from_status(update: &StatusUpdate) -> Option<Self> {
        if update.object != "transmit" {
            return None;
        }
        Some(Self {
            speed: parse_field(update, "speed"),
            pitch: parse_field(update, "pitch"),
            volume: parse_field(update, "mon_gain_cw"),
        })
    }
}

#[cfg(test)]
impl ParamUpdate {
    pub fn is_empty(&self) -> bool {
        self.speed.is_none() && self.pitch.is_none() && self.volume.is_none()
    }
}

fn parse_field(update: &StatusUpdate, key: &str) -> Option<u32> {
    let raw = update.field(key).filter(|value| !value.is_empty())?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("ignoring transmit {key}={raw:?}: {e}");
            None
        }
    }
}
