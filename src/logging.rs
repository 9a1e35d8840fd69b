use crossbeam_channel::Sender;
use log::{Log, Metadata, Record};

use crate::messages::UiEvent;

/// Writes through env_logger and copies every line that passes its filter
/// to the window's log pane.
pub struct UiLogger {
    inner: env_logger::Logger,
    ui: Option<Sender<UiEvent>>,
}

impl UiLogger {
    pub fn new(inner: env_logger::Logger, ui: Option<Sender<UiEvent>>) -> Self {
        Self { inner, ui }
    }

    /// Install as the global logger.
    pub fn init(self) -> Result<(), log::SetLoggerError> {
        let max_level = self.inner.filter();
        log::set_boxed_logger(Box::new(self))?;
        log::set_max_level(max_level);
        Ok(())
    }
}

/// One log pane line: local time, level, message.
fn pane_line(record: &Record) -> String {
    format!(
        "{} {:<5} {}",
        chrono::Local::now().format("%H:%M:%S"),
        record.level(),
        record.args()
    )
}

impl Log for UiLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        if !self.inner.matches(record) {
            return;
        }
        self.inner.log(record);
        if let Some(ui) = &self.ui {
            // Window gone; stderr still has it
            let _ = ui.send(UiEvent::Log(pane_line(record)));
        }
    }

    fn flush(&self) {
        self.inner.flush();
    }
}
