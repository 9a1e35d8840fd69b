use crossbeam_channel::{Receiver, Sender};
use egui::Key;
use std::collections::VecDeque;
use std::time::Duration;

use crate::config::AppSettings;
use crate::messages::{ExitReason, KeyerStatus, UiEvent, UserCommand};
use crate::ui::render_main_panel;

/// Lines kept in the log pane
pub const LOG_LINES: usize = 200;

/// Front end: shows what the event loop publishes and forwards key presses.
pub struct KeyerApp {
    pub settings: AppSettings,
    pub settings_notice: Option<String>,
    pub status: KeyerStatus,
    pub stopped: Option<ExitReason>,
    pub log_lines: VecDeque<String>,
    cmd_tx: Sender<UserCommand>,
    event_rx: Receiver<UiEvent>,
}

/// Keyboard shortcut for a keyer command.
pub fn command_for_key(key: Key) -> Option<UserCommand> {
    match key {
        Key::ArrowUp => Some(UserCommand::SpeedUp),
        Key::ArrowDown => Some(UserCommand::SpeedDown),
        Key::PageUp => Some(UserCommand::PitchUp),
        Key::PageDown => Some(UserCommand::PitchDown),
        Key::Plus | Key::Equals => Some(UserCommand::VolumeUp),
        Key::Minus => Some(UserCommand::VolumeDown),
        Key::Escape | Key::Q => Some(UserCommand::Quit),
        _ => None,
    }
}

impl KeyerApp {
    pub fn new(
        settings: AppSettings,
        settings_notice: Option<String>,
        cmd_tx: Sender<UserCommand>,
        event_rx: Receiver<UiEvent>,
    ) -> Self {
        Self {
            settings,
            settings_notice,
            status: KeyerStatus::default(),
            stopped: None,
            log_lines: VecDeque::with_capacity(LOG_LINES),
            cmd_tx,
            event_rx,
        }
    }

    pub fn send(&self, cmd: UserCommand) {
        // Loop already gone; the window closes on the Stopped event
        let _ = self.cmd_tx.send(cmd);
    }

    fn process_events(&mut self) {
        while let Ok(event) = self.event_rx.try_recv() {
            match event {
                UiEvent::Status(status) => self.status = status,
                UiEvent::Stopped(reason) => self.stopped = Some(reason),
                UiEvent::Log(line) => {
                    if self.log_lines.len() == LOG_LINES {
                        self.log_lines.pop_front();
                    }
                    self.log_lines.push_back(line);
                }
            }
        }
    }

    fn handle_keyboard(&mut self, ctx: &egui::Context) {
        let commands: Vec<UserCommand> = ctx.input(|i| {
            i.events
                .iter()
                .filter_map(|event| match event {
                    egui::Event::Key {
                        key, pressed: true, ..
                    } => command_for_key(*key),
                    _ => None,
                })
                .collect()
        });
        for cmd in commands {
            self.send(cmd);
        }
    }
}

impl eframe::App for KeyerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.style_mut(|style| {
            style.text_styles.iter_mut().for_each(|(_, font_id)| {
                font_id.size = self.settings.ui.font_size;
            });
        });

        self.process_events();
        if self.stopped.is_some() {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }

        self.handle_keyboard(ctx);

        if ctx.input(|i| i.viewport().close_requested()) {
            self.send(UserCommand::Quit);
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            render_main_panel(ui, self);
        });

        // Status arrives on a channel, so poll for it
        ctx.request_repaint_after(Duration::from_millis(50));
    }
}
