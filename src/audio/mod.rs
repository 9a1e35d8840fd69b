mod engine;
mod sidetone;

pub use engine::AudioEngine;
pub use sidetone::{Sidetone, SidetoneOscillator, SilentSidetone};
