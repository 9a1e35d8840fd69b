use std::time::Duration;

/// Default inter-word threshold, in dit lengths after the inter-character gap.
pub const DEFAULT_WORD_GAP_UNITS: u32 = 5;

/// A single Morse code element
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MorseElement {
    Dit,        // 1 unit tone
    Dah,        // 3 units tone
    ElementGap, // 1 unit silence (between dit/dah in same character)
    WordGap,    // configurable silence after a character closes out the word
}

/// PARIS timing derived from a keying speed.
///
/// One dit is 1200 ms / wpm. A dah is three dits and the gap between
/// elements of a character is one dit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MorseTiming {
    dit: Duration,
    word_gap_units: u32,
}

impl MorseTiming {
    pub fn new(wpm: u32, word_gap_units: u32) -> Self {
        Self {
            dit: Self::dit_length(wpm),
            word_gap_units,
        }
    }

    /// Dit length for a speed. A speed of zero is treated as 1 wpm.
    pub fn dit_length(wpm: u32) -> Duration {
        Duration::from_millis(1200) / wpm.max(1)
    }

    /// Returns the duration in units (1 unit = dit length)
    pub fn units(&self, element: MorseElement) -> u32 {
        match element {
            MorseElement::Dit => 1,
            MorseElement::Dah => 3,
            MorseElement::ElementGap => 1,
            MorseElement::WordGap => self.word_gap_units,
        }
    }

    pub fn duration(&self, element: MorseElement) -> Duration {
        self.dit * self.units(element)
    }

    pub fn dit(&self) -> Duration {
        self.dit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paris_timing_law() {
        for wpm in 1..=60 {
            let timing = MorseTiming::new(wpm, DEFAULT_WORD_GAP_UNITS);
            let dit = Duration::from_millis(1200) / wpm;
            assert_eq!(timing.dit(), dit);
            assert_eq!(timing.duration(MorseElement::Dit), dit);
            assert_eq!(timing.duration(MorseElement::Dah), dit * 3);
            assert_eq!(timing.duration(MorseElement::ElementGap), dit);
        }
    }

    #[test]
    fn test_twenty_wpm_is_sixty_ms() {
        let timing = MorseTiming::new(20, DEFAULT_WORD_GAP_UNITS);
        assert_eq!(timing.dit(), Duration::from_millis(60));
        assert_eq!(timing.duration(MorseElement::WordGap), Duration::from_millis(300));
    }

    #[test]
    fn test_zero_wpm_does_not_divide_by_zero() {
        assert_eq!(MorseTiming::dit_length(0), Duration::from_millis(1200));
    }
}
