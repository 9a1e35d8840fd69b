mod decoder;
mod table;
mod timing;

pub use decoder::{Decoder, DAH_TOKEN, DIT_TOKEN, GAP_TOKEN};
pub use timing::{MorseElement, MorseTiming, DEFAULT_WORD_GAP_UNITS};
