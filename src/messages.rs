use std::ops::{BitOr, BitOrAssign};

/// Paddle contacts currently closed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Paddles(u8);

impl Paddles {
    pub const NONE: Paddles = Paddles(0);
    pub const DIT: Paddles = Paddles(1 << 0);
    pub const DAH: Paddles = Paddles(1 << 1);
    #[cfg(test)]
    pub const BOTH: Paddles = Paddles(Self::DIT.0 | Self::DAH.0);

    pub fn dit(self) -> bool {
        self.0 & Self::DIT.0 != 0
    }

    pub fn dah(self) -> bool {
        self.0 & Self::DAH.0 != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Paddles {
    type Output = Paddles;

    fn bitor(self, rhs: Paddles) -> Paddles {
        Paddles(self.0 | rhs.0)
    }
}

impl BitOrAssign for Paddles {
    fn bitor_assign(&mut self, rhs: Paddles) {
        self.0 |= rhs.0;
    }
}

/// Messages from the UI thread to the event loop
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UserCommand {
    SpeedUp,
    SpeedDown,
    PitchUp,
    PitchDown,
    VolumeUp,
    VolumeDown,
    Quit,
}

/// Outbound commands to the transceiver, fire-and-forget
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RadioCommand {
    Key { down: bool },
    Speed(u32),
    Pitch(u32),
    MonitorGain(u32),
}

/// Snapshot of what the front end displays
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyerStatus {
    pub wpm: u32,
    pub pitch: u32,
    pub volume: u32,
    pub decoded: String,
}

/// Why the event loop stopped
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitReason {
    /// User asked to quit, or the front end went away
    Quit,
    Shutdown,
    PaddleClosed,
    RadioClosed,
}

/// Messages from the event loop to the UI thread
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UiEvent {
    Status(KeyerStatus),
    /// Formatted line for the log pane
    Log(String),
    Stopped(ExitReason),
}
