mod machine;
mod timer;

pub use machine::{CommandSink, Keyer};

#[cfg(test)]
pub(crate) use machine::tests::RecordingSink;
