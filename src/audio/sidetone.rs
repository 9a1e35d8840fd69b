use parking_lot::Mutex;
use std::f64::consts::{PI, TAU};
use std::time::Duration;

/// Shortest click-suppression ramp, whatever the keying speed.
pub const MIN_RAMP: Duration = Duration::from_millis(5);

/// Pulls mono samples for an audio output callback.
///
/// Implementations must not block: `fill_buffer` runs on the audio thread.
pub trait SampleSource: Send + Sync {
    fn fill_buffer(&self, out: &mut [f32]);
}

/// Parameters the keyer pushes to whatever produces the local sidetone.
pub trait Sidetone: Send + Sync {
    fn set_pitch(&self, hz: u32);
    /// Volume on a 0-100 scale.
    fn set_volume(&self, percent: u32);
    fn set_keyed(&self, keyed: bool);
    /// Derive the envelope ramp from a nominal duration, normally one dit.
    fn set_ramp(&self, nominal: Duration);
}

/// Used when no audio output could be opened.
#[derive(Clone, Copy, Debug, Default)]
pub struct SilentSidetone;

impl Sidetone for SilentSidetone {
    fn set_pitch(&self, _hz: u32) {}
    fn set_volume(&self, _percent: u32) {}
    fn set_keyed(&self, _keyed: bool) {}
    fn set_ramp(&self, _nominal: Duration) {}
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct OscillatorState {
    pub pitch: u32,
    /// 0.0 - 1.0
    pub volume: f32,
    pub keyed: bool,
    pub phase: f64,
    /// Envelope ramp length in samples
    pub ramp_len: u32,
    /// Current position on the ramp, `0..=ramp_len`
    pub ramp_level: u32,
}

/// Sine sidetone with a raised-cosine keying envelope.
///
/// Every field sits behind one lock shared by the parameter setters and the
/// audio callback. The callback holds it for one buffer and does no I/O.
pub struct SidetoneOscillator {
    sample_rate: u32,
    state: Mutex<OscillatorState>,
}

impl SidetoneOscillator {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            state: Mutex::new(OscillatorState::default()),
        }
    }

    /// Ramp length in samples for a nominal duration: a tenth of it, but
    /// never shorter than [`MIN_RAMP`].
    pub fn ramp_samples(&self, nominal: Duration) -> u32 {
        let ramp = (nominal / 10).max(MIN_RAMP);
        (self.sample_rate as f64 * ramp.as_secs_f64()).round() as u32
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> OscillatorState {
        self.state.lock().clone()
    }

    /// Render `out.len()` samples, advancing phase and envelope.
    pub fn generate(&self, out: &mut [f32]) {
        let mut st = self.state.lock();
        let phase_increment = st.pitch as f64 * TAU / self.sample_rate as f64;

        for sample in out.iter_mut() {
            st.phase += phase_increment;
            if st.phase >= TAU {
                st.phase %= TAU;
            }

            if st.keyed {
                if st.ramp_level < st.ramp_len {
                    st.ramp_level += 1;
                }
            } else if st.ramp_level > 0 {
                st.ramp_level -= 1;
            }

            *sample = if st.ramp_level > 0 {
                let mut gain = st.volume;
                if st.ramp_level < st.ramp_len {
                    let progress = st.ramp_level as f64 / st.ramp_len as f64;
                    gain *= ((1.0 + (PI * (progress - 0.5)).sin()) / 2.0) as f32;
                }
                st.phase.sin() as f32 * gain
            } else {
                0.0
            };
        }
    }
}

impl Sidetone for SidetoneOscillator {
    fn set_pitch(&self, hz: u32) {
        self.state.lock().pitch = hz;
    }

    fn set_volume(&self, percent: u32) {
        self.state.lock().volume = percent.min(100) as f32 / 100.0;
    }

    fn set_keyed(&self, keyed: bool) {
        self.state.lock().keyed = keyed;
    }

    fn set_ramp(&self, nominal: Duration) {
        let ramp_len = self.ramp_samples(nominal);
        let mut st = self.state.lock();
        st.ramp_len = ramp_len;
        st.ramp_level = st.ramp_level.min(ramp_len);
    }
}

impl SampleSource for SidetoneOscillator {
    fn fill_buffer(&self, out: &mut [f32]) {
        self.generate(out);
    }
}
