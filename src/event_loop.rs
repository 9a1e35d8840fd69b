use crossbeam_channel::{select, Receiver, Sender};

use crate::keyer::Keyer;
use crate::messages::{ExitReason, KeyerStatus, Paddles, UiEvent, UserCommand};
use crate::radio::{ParamUpdate, RadioMessage};

/// Single-threaded dispatcher that owns the keyer.
///
/// Every source is polled by one `select!`, which picks among ready
/// channels at random so no source can starve another. Each event is fully
/// handled before the next select.
pub struct EventLoop {
    keyer: Keyer,
    shutdown: Receiver<()>,
    radio: Receiver<RadioMessage>,
    commands: Receiver<UserCommand>,
    paddles: Receiver<Paddles>,
    ui: Sender<UiEvent>,
    last_status: Option<KeyerStatus>,
}

impl EventLoop {
    pub fn new(
        keyer: Keyer,
        shutdown: Receiver<()>,
        radio: Receiver<RadioMessage>,
        commands: Receiver<UserCommand>,
        paddles: Receiver<Paddles>,
        ui: Sender<UiEvent>,
    ) -> Self {
        Self {
            keyer,
            shutdown,
            radio,
            commands,
            paddles,
            ui,
            last_status: None,
        }
    }

    /// Run until a source closes or the user quits.
    pub fn run(mut self) -> ExitReason {
        let reason = loop {
            // The keyer swaps in a fresh channel each time it arms
            let timer = self.keyer.timer_receiver();

            let exit = select! {
                recv(self.shutdown) -> _ => Some(ExitReason::Shutdown),
                recv(self.radio) -> msg => match msg {
                    Ok(msg) => {
                        self.on_radio_message(msg);
                        None
                    }
                    Err(_) => Some(ExitReason::RadioClosed),
                },
                recv(self.commands) -> cmd => match cmd {
                    Ok(UserCommand::Quit) | Err(_) => Some(ExitReason::Quit),
                    Ok(cmd) => {
                        self.on_user_command(cmd);
                        None
                    }
                },
                recv(self.paddles) -> paddles => match paddles {
                    Ok(paddles) => {
                        self.keyer.on_paddle_event(paddles);
                        None
                    }
                    Err(_) => {
                        log::error!("paddle input closed");
                        Some(ExitReason::PaddleClosed)
                    }
                },
                recv(timer) -> _ => {
                    self.keyer.on_timer_expiry();
                    None
                },
            };

            if let Some(reason) = exit {
                break reason;
            }
            self.publish_status();
        };

        log::info!("event loop stopped: {reason:?}");
        let _ = self.ui.send(UiEvent::Stopped(reason));
        reason
    }

    fn on_radio_message(&mut self, msg: RadioMessage) {
        match msg {
            RadioMessage::Status(update) => {
                if let Some(params) = ParamUpdate::from_status(&update) {
                    self.apply_params(params);
                }
            }
            RadioMessage::Response { code, message, .. } if code != 0 => {
                log::warn!("command failed: 0x{code:08X} {message}");
            }
            RadioMessage::Message(text) => log::info!("radio: {text}"),
            other => log::trace!("{other:?}"),
        }
    }

    fn apply_params(&mut self, params: ParamUpdate) {
        if let Some(wpm) = params.speed {
            self.keyer.set_wpm(wpm);
        }
        if let Some(pitch) = params.pitch {
            self.keyer.set_pitch(pitch);
        }
        if let Some(volume) = params.volume {
            self.keyer.set_volume(volume);
        }
    }

    fn on_user_command(&mut self, cmd: UserCommand) {
        match cmd {
            UserCommand::SpeedUp => self.keyer.speed_up(),
            UserCommand::SpeedDown => self.keyer.speed_down(),
            UserCommand::PitchUp => self.keyer.pitch_up(),
            UserCommand::PitchDown => self.keyer.pitch_down(),
            UserCommand::VolumeUp => self.keyer.volume_up(),
            UserCommand::VolumeDown => self.keyer.volume_down(),
            UserCommand::Quit => {}
        }
    }

    fn publish_status(&mut self) {
        let status = self.keyer.status();
        if self.last_status.as_ref() == Some(&status) {
            return;
        }
        // Front end may already be gone; the loop ends on its own then
        let _ = self.ui.send(UiEvent::Status(status.clone()));
        self.last_status = Some(status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SilentSidetone;
    use crate::config::KeyerSettings;
    use crate::keyer::RecordingSink;
    use crate::messages::RadioCommand;
    use crate::radio::StatusUpdate;
    use crossbeam_channel::{unbounded, RecvTimeoutError};
    use std::sync::Arc;
    use std::thread::JoinHandle;
    use std::time::Duration;

    struct Harness {
        shutdown: Sender<()>,
        radio: Sender<RadioMessage>,
        commands: Sender<UserCommand>,
        paddles: Sender<Paddles>,
        ui: Receiver<UiEvent>,
        sink: RecordingSink,
        handle: JoinHandle<ExitReason>,
    }

    fn spawn_loop() -> Harness {
        let sink = RecordingSink::default();
        let keyer = Keyer::new(
            KeyerSettings::default(),
            Arc::new(SilentSidetone),
            Box::new(sink.clone()),
        );
        let (shutdown_tx, shutdown_rx) = unbounded();
        let (radio_tx, radio_rx) = unbounded();
        let (cmd_tx, cmd_rx) = unbounded();
        let (paddle_tx, paddle_rx) = unbounded();
        let (ui_tx, ui_rx) = unbounded();
        let event_loop = EventLoop::new(keyer, shutdown_rx, radio_rx, cmd_rx, paddle_rx, ui_tx);
        Harness {
            shutdown: shutdown_tx,
            radio: radio_tx,
            commands: cmd_tx,
            paddles: paddle_tx,
            ui: ui_rx,
            sink,
            handle: std::thread::spawn(move || event_loop.run()),
        }
    }

    fn transmit(fields: &[(&str, &str)]) -> RadioMessage {
        RadioMessage::Status(StatusUpdate {
            handle: "0x1".to_string(),
            object: "transmit".to_string(),
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        })
    }

    /// Wait for a status matching `pred`, skipping earlier ones.
    fn wait_status(ui: &Receiver<UiEvent>, pred: impl Fn(&KeyerStatus) -> bool) -> KeyerStatus {
        loop {
            match ui.recv_timeout(Duration::from_secs(2)) {
                Ok(UiEvent::Status(status)) if pred(&status) => return status,
                Ok(_) => {}
                Err(RecvTimeoutError::Timeout) => panic!("no matching status"),
                Err(RecvTimeoutError::Disconnected) => panic!("loop exited"),
            }
        }
    }

    #[test]
    fn test_remote_params_and_keying() {
        let h = spawn_loop();
        h.radio
            .send(transmit(&[("speed", "60"), ("pitch", "650"), ("mon_gain_cw", "30")]))
            .unwrap();
        let status = wait_status(&h.ui, |s| s.wpm == 60);
        assert_eq!((status.pitch, status.volume), (650, 30));

        // 20 ms dit, closed out as "E " after the gaps run down
        h.paddles.send(Paddles::DIT).unwrap();
        h.paddles.send(Paddles::NONE).unwrap();
        wait_status(&h.ui, |s| s.decoded == "E ");

        assert_eq!(
            h.sink.take(),
            vec![RadioCommand::Key { down: true }, RadioCommand::Key { down: false }]
        );

        h.shutdown.send(()).unwrap();
        assert_eq!(h.handle.join().unwrap(), ExitReason::Shutdown);
        assert!(h.ui.iter().any(|e| e == UiEvent::Stopped(ExitReason::Shutdown)));
    }

    #[test]
    fn test_bad_field_does_not_block_others() {
        let h = spawn_loop();
        h.radio
            .send(transmit(&[("speed", "fast"), ("pitch", "700"), ("mon_gain_cw", "10")]))
            .unwrap();
        h.radio.send(transmit(&[("speed", "25")])).unwrap();
        let status = wait_status(&h.ui, |s| s.wpm == 25);
        assert_eq!((status.pitch, status.volume), (700, 10));
        drop(h.commands);
        assert_eq!(h.handle.join().unwrap(), ExitReason::Quit);
    }

    #[test]
    fn test_user_commands_reach_radio() {
        let h = spawn_loop();
        h.radio
            .send(transmit(&[("speed", "20"), ("pitch", "600"), ("mon_gain_cw", "50")]))
            .unwrap();
        wait_status(&h.ui, |s| s.wpm == 20);

        h.commands.send(UserCommand::SpeedUp).unwrap();
        h.commands.send(UserCommand::PitchDown).unwrap();
        h.commands.send(UserCommand::Quit).unwrap();
        assert_eq!(h.handle.join().unwrap(), ExitReason::Quit);
        assert_eq!(
            h.sink.take(),
            vec![RadioCommand::Speed(21), RadioCommand::Pitch(590)]
        );
    }

    #[test]
    fn test_closed_sources_stop_loop() {
        let h = spawn_loop();
        drop(h.paddles);
        assert_eq!(h.handle.join().unwrap(), ExitReason::PaddleClosed);

        let h = spawn_loop();
        drop(h.radio);
        assert_eq!(h.handle.join().unwrap(), ExitReason::RadioClosed);
    }
}
