use crossbeam_channel::Receiver;
use std::sync::Arc;
use std::time::Instant;

use super::timer::KeyTimer;
use crate::audio::Sidetone;
use crate::config::KeyerSettings;
use crate::messages::{KeyerStatus, Paddles, RadioCommand};
use crate::morse::{Decoder, MorseElement, MorseTiming, DAH_TOKEN, DIT_TOKEN, GAP_TOKEN};

const INIT_WPM: u8 = 1 << 0;
const INIT_PITCH: u8 = 1 << 1;
const INIT_VOLUME: u8 = 1 << 2;
const INIT_ALL: u8 = INIT_WPM | INIT_PITCH | INIT_VOLUME;

/// Where outbound keying and parameter commands go.
pub trait CommandSink: Send {
    fn send(&mut self, command: RadioCommand);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    /// Nothing keyed, word closed out
    Idle,
    /// Character closed out, waiting to close the word
    IdleChar,
    Dit,
    Dah,
    /// Inter-element gap after a dit
    PauseDit,
    /// Inter-element gap after a dah
    PauseDah,
}

/// Iambic keyer state machine.
///
/// Driven from a single thread by paddle events and expiries of its own
/// timer. Keying goes out through the [`CommandSink`] and the [`Sidetone`];
/// every keyed element is fed through the decoder.
pub struct Keyer {
    settings: KeyerSettings,
    wpm: u32,
    pitch: u32,
    volume: u32,
    initialized: u8,
    timing: MorseTiming,

    pressed: Paddles,
    queued: Paddles,
    state: State,
    timer: KeyTimer,

    sidetone: Arc<dyn Sidetone>,
    sink: Box<dyn CommandSink>,
    decoder: Decoder,
}

impl Keyer {
    pub fn new(
        settings: KeyerSettings,
        sidetone: Arc<dyn Sidetone>,
        sink: Box<dyn CommandSink>,
    ) -> Self {
        let timing = MorseTiming::new(settings.min_wpm, settings.word_gap_units);
        Self {
            settings,
            wpm: 0,
            pitch: 0,
            volume: 0,
            initialized: 0,
            timing,
            pressed: Paddles::NONE,
            queued: Paddles::NONE,
            state: State::Idle,
            timer: KeyTimer::new(),
            sidetone,
            sink,
            decoder: Decoder::new(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized == INIT_ALL
    }

    /// Receiver for the current timer arm, for the event loop's select.
    pub fn timer_receiver(&self) -> Receiver<Instant> {
        self.timer.receiver().clone()
    }

    pub fn status(&self) -> KeyerStatus {
        KeyerStatus {
            wpm: self.wpm,
            pitch: self.pitch,
            volume: self.volume,
            decoded: self.decoder.text().to_string(),
        }
    }

    pub fn on_paddle_event(&mut self, pressed: Paddles) {
        self.pressed = pressed;

        match self.state {
            State::Idle | State::IdleChar => {
                if pressed.is_empty() {
                    return;
                }
                if !self.is_initialized() {
                    log::debug!("paddle {pressed:?} ignored until speed, pitch and volume are known");
                    return;
                }
                // In the unlikely case we register both at once, dah wins
                if pressed.dah() {
                    self.start_element(MorseElement::Dah);
                } else if pressed.dit() {
                    self.start_element(MorseElement::Dit);
                }
            }
            State::Dit | State::PauseDit => {
                if pressed.dah() {
                    self.queued = Paddles::DAH;
                }
            }
            State::Dah | State::PauseDah => {
                if pressed.dit() {
                    self.queued = Paddles::DIT;
                }
            }
        }
    }

    pub fn on_timer_expiry(&mut self) {
        self.timer.consume();

        match self.state {
            State::Dit => {
                self.state = State::PauseDit;
                self.end_element();
            }
            State::Dah => {
                self.state = State::PauseDah;
                self.end_element();
            }
            State::PauseDit => {
                if self.pressed.dah() || self.queued.dah() {
                    self.start_element(MorseElement::Dah);
                } else if self.pressed.dit() {
                    self.start_element(MorseElement::Dit);
                } else {
                    self.close_character();
                }
            }
            State::PauseDah => {
                if self.pressed.dit() || self.queued.dit() {
                    self.start_element(MorseElement::Dit);
                } else if self.pressed.dah() {
                    self.start_element(MorseElement::Dah);
                } else {
                    self.close_character();
                }
            }
            State::IdleChar => {
                self.state = State::Idle;
                if !self.decoder.is_empty() && !self.decoder.ends_with_gap() {
                    self.decoder.push(GAP_TOKEN);
                }
            }
            State::Idle => log::debug!("timer expired while idle"),
        }
    }

    fn start_element(&mut self, element: MorseElement) {
        let (state, token) = match element {
            MorseElement::Dit => (State::Dit, DIT_TOKEN),
            MorseElement::Dah => (State::Dah, DAH_TOKEN),
            MorseElement::ElementGap | MorseElement::WordGap => return,
        };
        log::debug!("{element:?}");
        self.state = state;
        self.queued = Paddles::NONE;
        self.timer.arm(self.timing.duration(element));
        self.decoder.push(token);
        self.key(true);
    }

    fn end_element(&mut self) {
        self.timer.arm(self.timing.duration(MorseElement::ElementGap));
        self.key(false);
    }

    fn close_character(&mut self) {
        self.state = State::IdleChar;
        self.timer.arm(self.timing.duration(MorseElement::WordGap));
        self.decoder.push(GAP_TOKEN);
    }

    fn key(&mut self, down: bool) {
        self.sink.send(RadioCommand::Key { down });
        self.sidetone.set_keyed(down);
    }

    pub fn set_wpm(&mut self, wpm: u32) {
        self.wpm = self.clamp_wpm(wpm);
        self.init_one(INIT_WPM);
    }

    pub fn set_pitch(&mut self, pitch: u32) {
        self.pitch = pitch;
        self.init_one(INIT_PITCH);
    }

    pub fn set_volume(&mut self, volume: u32) {
        self.volume = volume.min(100);
        self.init_one(INIT_VOLUME);
    }

    fn init_one(&mut self, flag: u8) {
        self.initialized |= flag;
        if self.is_initialized() {
            self.update();
        }
    }

    /// Recompute derived timing and push parameters to the sidetone.
    fn update(&mut self) {
        self.timing = MorseTiming::new(self.wpm, self.settings.word_gap_units);
        self.sidetone.set_pitch(self.pitch);
        self.sidetone.set_volume(self.volume);
        self.sidetone.set_ramp(self.timing.dit());
        log::info!(
            "wpm={} pitch={} volume={} ditlen={:?}",
            self.wpm,
            self.pitch,
            self.volume,
            self.timing.dit()
        );
    }

    fn clamp_wpm(&self, wpm: u32) -> u32 {
        wpm.clamp(self.settings.min_wpm.max(1), self.settings.max_wpm.max(1))
    }

    /// Local adjustments only make sense once the radio has told us where we
    /// start from.
    fn can_adjust(&self) -> bool {
        if !self.is_initialized() {
            log::warn!("adjustment ignored until the radio reports speed, pitch and volume");
        }
        self.is_initialized()
    }

    pub fn speed_up(&mut self) {
        if self.can_adjust() {
            self.wpm = self.clamp_wpm(self.wpm.saturating_add(self.settings.speed_step));
            self.sink.send(RadioCommand::Speed(self.wpm));
            self.update();
        }
    }

    pub fn speed_down(&mut self) {
        if self.can_adjust() {
            self.wpm = self.clamp_wpm(self.wpm.saturating_sub(self.settings.speed_step));
            self.sink.send(RadioCommand::Speed(self.wpm));
            self.update();
        }
    }

    pub fn pitch_up(&mut self) {
        if self.can_adjust() {
            self.pitch = self.pitch.saturating_add(self.settings.pitch_step_hz);
            self.sink.send(RadioCommand::Pitch(self.pitch));
            self.update();
        }
    }

    pub fn pitch_down(&mut self) {
        if self.can_adjust() {
            let step = self.settings.pitch_step_hz;
            self.pitch = self.pitch.saturating_sub(step).max(step);
            self.sink.send(RadioCommand::Pitch(self.pitch));
            self.update();
        }
    }

    pub fn volume_up(&mut self) {
        if self.can_adjust() {
            self.volume = (self.volume + self.settings.volume_step).min(100);
            self.sink.send(RadioCommand::MonitorGain(self.volume));
            self.update();
        }
    }

    pub fn volume_down(&mut self) {
        if self.can_adjust() {
            self.volume = self.volume.saturating_sub(self.settings.volume_step);
            self.sink.send(RadioCommand::MonitorGain(self.volume));
            self.update();
        }
    }
}

#[cfg(test)]
impl Keyer {
    pub fn state(&self) -> State {
        self.state
    }

    pub fn queued(&self) -> Paddles {
        self.queued
    }

    pub fn dit_length(&self) -> std::time::Duration {
        self.timing.dit()
    }

    pub fn decoded(&self) -> &str {
        self.decoder.text()
    }

    pub fn timer(&self) -> &KeyTimer {
        &self.timer
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::audio::SidetoneOscillator;
    use parking_lot::Mutex;
    use std::time::Duration;

    /// Records every command instead of sending it
    #[derive(Clone, Default)]
    pub(crate) struct RecordingSink(pub Arc<Mutex<Vec<RadioCommand>>>);

    impl CommandSink for RecordingSink {
        fn send(&mut self, command: RadioCommand) {
            self.0.lock().push(command);
        }
    }

    impl RecordingSink {
        pub(crate) fn take(&self) -> Vec<RadioCommand> {
            std::mem::take(&mut *self.0.lock())
        }
    }

    const DOWN: RadioCommand = RadioCommand::Key { down: true };
    const UP: RadioCommand = RadioCommand::Key { down: false };

    fn keyer_at(wpm: u32) -> (Keyer, RecordingSink, Arc<SidetoneOscillator>) {
        let sink = RecordingSink::default();
        let osc = Arc::new(SidetoneOscillator::new(48_000));
        let mut keyer = Keyer::new(KeyerSettings::default(), osc.clone(), Box::new(sink.clone()));
        keyer.set_wpm(wpm);
        keyer.set_pitch(600);
        keyer.set_volume(50);
        sink.take();
        (keyer, sink, osc)
    }

    fn ms(n: u64) -> Option<Duration> {
        Some(Duration::from_millis(n))
    }

    #[test]
    fn test_parameters_gate_first_update() {
        let sink = RecordingSink::default();
        let osc = Arc::new(SidetoneOscillator::new(48_000));
        let mut keyer = Keyer::new(KeyerSettings::default(), osc.clone(), Box::new(sink));

        keyer.set_pitch(700);
        keyer.set_volume(40);
        assert!(!keyer.is_initialized());
        assert_eq!(osc.snapshot().pitch, 0);
        assert_eq!(osc.snapshot().ramp_len, 0);

        keyer.set_wpm(20);
        assert!(keyer.is_initialized());
        assert_eq!(keyer.dit_length(), Duration::from_millis(60));
        let st = osc.snapshot();
        assert_eq!(st.pitch, 700);
        assert_eq!(st.ramp_len, 288);
    }

    #[test]
    fn test_paddle_ignored_before_initialized() {
        let sink = RecordingSink::default();
        let osc = Arc::new(SidetoneOscillator::new(48_000));
        let mut keyer = Keyer::new(KeyerSettings::default(), osc, Box::new(sink.clone()));
        keyer.on_paddle_event(Paddles::DIT);
        assert_eq!(keyer.state(), State::Idle);
        assert!(sink.take().is_empty());
    }

    #[test]
    fn test_dah_wins_tie_break() {
        let (mut keyer, sink, osc) = keyer_at(20);
        keyer.on_paddle_event(Paddles::BOTH);
        assert_eq!(keyer.state(), State::Dah);
        assert_eq!(keyer.timer().interval(), ms(180));
        assert_eq!(keyer.decoded(), "-");
        assert_eq!(sink.take(), vec![DOWN]);
        assert!(osc.snapshot().keyed);
    }

    #[test]
    fn test_dit_element_cycle() {
        let (mut keyer, sink, osc) = keyer_at(20);
        keyer.on_paddle_event(Paddles::DIT);
        assert_eq!(keyer.state(), State::Dit);
        assert_eq!(keyer.timer().interval(), ms(60));

        keyer.on_paddle_event(Paddles::NONE);
        keyer.on_timer_expiry();
        assert_eq!(keyer.state(), State::PauseDit);
        assert_eq!(keyer.timer().interval(), ms(60));
        assert!(!osc.snapshot().keyed);

        keyer.on_timer_expiry();
        assert_eq!(keyer.state(), State::IdleChar);
        assert_eq!(keyer.timer().interval(), ms(300));
        assert_eq!(keyer.decoded(), "E");

        keyer.on_timer_expiry();
        assert_eq!(keyer.state(), State::Idle);
        assert_eq!(keyer.timer().interval(), None);
        assert_eq!(keyer.decoded(), "E ");
        assert_eq!(sink.take(), vec![DOWN, UP]);
    }

    #[test]
    fn test_squeeze_memory_survives_release() {
        let (mut keyer, _sink, _osc) = keyer_at(20);
        keyer.on_paddle_event(Paddles::DIT);
        // dah tapped and released during the dit
        keyer.on_paddle_event(Paddles::DIT | Paddles::DAH);
        keyer.on_paddle_event(Paddles::NONE);
        assert_eq!(keyer.queued(), Paddles::DAH);

        keyer.on_timer_expiry();
        assert_eq!(keyer.state(), State::PauseDit);
        keyer.on_timer_expiry();
        assert_eq!(keyer.state(), State::Dah);
        assert_eq!(keyer.queued(), Paddles::NONE);
        assert_eq!(keyer.decoded(), ".-");
    }

    #[test]
    fn test_squeeze_memory_during_pause() {
        let (mut keyer, _sink, _osc) = keyer_at(20);
        keyer.on_paddle_event(Paddles::DAH);
        keyer.on_paddle_event(Paddles::NONE);
        keyer.on_timer_expiry();
        assert_eq!(keyer.state(), State::PauseDah);

        keyer.on_paddle_event(Paddles::DIT);
        keyer.on_paddle_event(Paddles::NONE);
        keyer.on_timer_expiry();
        assert_eq!(keyer.state(), State::Dit);
        assert_eq!(keyer.decoded(), "-.");
    }

    #[test]
    fn test_squeeze_alternates() {
        let (mut keyer, _sink, _osc) = keyer_at(20);
        keyer.on_paddle_event(Paddles::BOTH);
        for _ in 0..3 {
            keyer.on_timer_expiry(); // element ends
            keyer.on_timer_expiry(); // pause ends, opposite element starts
        }
        assert_eq!(keyer.decoded(), "-.-.");
        keyer.on_paddle_event(Paddles::NONE);
        keyer.on_timer_expiry();
        keyer.on_timer_expiry();
        assert_eq!(keyer.decoded(), "C");
    }

    #[test]
    fn test_held_dit_repeats_and_decodes_h() {
        let (mut keyer, sink, _osc) = keyer_at(20);
        keyer.on_paddle_event(Paddles::DIT);
        for i in 0..4 {
            assert_eq!(keyer.state(), State::Dit);
            assert_eq!(keyer.timer().interval(), ms(60));
            if i == 3 {
                keyer.on_paddle_event(Paddles::NONE);
            }
            keyer.on_timer_expiry();
            assert_eq!(keyer.state(), State::PauseDit);
            assert_eq!(keyer.timer().interval(), ms(60));
            keyer.on_timer_expiry();
        }
        assert_eq!(keyer.state(), State::IdleChar);
        assert_eq!(keyer.decoded(), "H");
        assert_eq!(sink.take(), [DOWN, UP].repeat(4));
    }

    #[test]
    fn test_new_element_during_idle_char_continues_word() {
        let (mut keyer, _sink, _osc) = keyer_at(20);
        keyer.on_paddle_event(Paddles::DAH);
        keyer.on_paddle_event(Paddles::NONE);
        keyer.on_timer_expiry();
        keyer.on_timer_expiry();
        assert_eq!(keyer.state(), State::IdleChar);

        keyer.on_paddle_event(Paddles::DIT);
        assert_eq!(keyer.state(), State::Dit);
        keyer.on_paddle_event(Paddles::NONE);
        keyer.on_timer_expiry();
        keyer.on_timer_expiry();
        keyer.on_timer_expiry();
        assert_eq!(keyer.decoded(), "TE ");
    }

    #[test]
    fn test_word_gap_not_doubled() {
        let (mut keyer, _sink, _osc) = keyer_at(20);
        keyer.on_paddle_event(Paddles::DAH);
        keyer.on_paddle_event(Paddles::NONE);
        keyer.on_timer_expiry();
        keyer.on_timer_expiry();
        keyer.on_timer_expiry();
        assert_eq!(keyer.decoded(), "T ");
        keyer.on_timer_expiry();
        assert_eq!(keyer.decoded(), "T ");
    }

    #[test]
    fn test_adjustments_push_to_radio() {
        let (mut keyer, sink, osc) = keyer_at(20);
        keyer.speed_up();
        keyer.pitch_down();
        keyer.volume_up();
        assert_eq!(
            sink.take(),
            vec![
                RadioCommand::Speed(21),
                RadioCommand::Pitch(590),
                RadioCommand::MonitorGain(51),
            ]
        );
        assert_eq!(keyer.dit_length(), Duration::from_millis(1200) / 21);
        let st = osc.snapshot();
        assert_eq!(st.pitch, 590);
        assert!((st.volume - 0.51).abs() < 1e-6);
    }

    #[test]
    fn test_adjustments_clamped() {
        let (mut keyer, sink, _osc) = keyer_at(5);
        keyer.speed_down();
        keyer.set_volume(100);
        keyer.volume_up();
        assert_eq!(
            sink.take(),
            vec![RadioCommand::Speed(5), RadioCommand::MonitorGain(100)]
        );
        assert_eq!(keyer.status().wpm, 5);
    }

    #[test]
    fn test_adjustment_ignored_before_initialized() {
        let sink = RecordingSink::default();
        let osc = Arc::new(SidetoneOscillator::new(48_000));
        let mut keyer = Keyer::new(KeyerSettings::default(), osc, Box::new(sink.clone()));
        keyer.speed_up();
        keyer.pitch_up();
        assert!(sink.take().is_empty());
        assert_eq!(keyer.status(), KeyerStatus::default());
    }
}
