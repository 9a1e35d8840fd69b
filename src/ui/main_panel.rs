use crate::app::KeyerApp;
use crate::messages::UserCommand;
use egui::{Color32, RichText};

pub fn render_main_panel(ui: &mut egui::Ui, app: &mut KeyerApp) {
    if let Some(notice) = app.settings_notice.clone() {
        ui.horizontal(|ui| {
            ui.label(RichText::new(notice).color(Color32::YELLOW));
            if ui.button("Dismiss").clicked() {
                app.settings_notice = None;
            }
        });
        ui.add_space(4.0);
    }

    ui.horizontal(|ui| {
        ui.label(RichText::new("Station:").strong());
        ui.label(app.settings.radio.station.as_str());
        ui.add_space(20.0);
        ui.label(RichText::new("Radio:").strong());
        ui.label(app.settings.radio.address.as_str());
    });

    ui.add_space(8.0);

    // Parameter boxes
    ui.horizontal(|ui| {
        render_param(
            ui,
            app,
            "WPM",
            app.status.wpm,
            UserCommand::SpeedDown,
            UserCommand::SpeedUp,
        );
        ui.add_space(12.0);
        render_param(
            ui,
            app,
            "Volume",
            app.status.volume,
            UserCommand::VolumeDown,
            UserCommand::VolumeUp,
        );
        ui.add_space(12.0);
        render_param(
            ui,
            app,
            "Pitch",
            app.status.pitch,
            UserCommand::PitchDown,
            UserCommand::PitchUp,
        );
    });

    ui.add_space(8.0);
    ui.separator();
    ui.add_space(8.0);

    // Decoder line
    ui.label(RichText::new("Decoder").strong());
    egui::Frame::group(ui.style()).show(ui, |ui| {
        ui.set_min_width(ui.available_width());
        ui.label(RichText::new(app.status.decoded.as_str()).monospace());
    });

    ui.add_space(8.0);

    // Log pane
    ui.label(RichText::new("Log").strong());
    egui::Frame::group(ui.style()).show(ui, |ui| {
        ui.set_min_width(ui.available_width());
        egui::ScrollArea::vertical()
            .max_height(160.0)
            .stick_to_bottom(true)
            .show(ui, |ui| {
                for line in &app.log_lines {
                    ui.label(RichText::new(line.as_str()).monospace().small());
                }
            });
    });

    ui.add_space(8.0);
    ui.separator();
    ui.add_space(8.0);

    render_key_hints(ui);
}

/// Labeled value with step buttons. A zero value means the radio has not
/// reported it yet.
fn render_param(
    ui: &mut egui::Ui,
    app: &KeyerApp,
    label: &str,
    value: u32,
    down: UserCommand,
    up: UserCommand,
) {
    egui::Frame::group(ui.style()).show(ui, |ui| {
        ui.vertical_centered(|ui| {
            ui.label(RichText::new(label).strong());
            let text = if value == 0 {
                "--".to_string()
            } else {
                value.to_string()
            };
            ui.label(RichText::new(text).monospace().size(app.settings.ui.font_size + 8.0));
            ui.horizontal(|ui| {
                if ui.small_button("-").clicked() {
                    app.send(down);
                }
                if ui.small_button("+").clicked() {
                    app.send(up);
                }
            });
        });
    });
}

fn render_key_hints(ui: &mut egui::Ui) {
    ui.horizontal(|ui| {
        ui.label(RichText::new("Up/Down").strong().monospace());
        ui.label("Speed");
        ui.add_space(10.0);

        ui.label(RichText::new("PgUp/PgDn").strong().monospace());
        ui.label("Pitch");
        ui.add_space(10.0);

        ui.label(RichText::new("+/-").strong().monospace());
        ui.label("Volume");
        ui.add_space(10.0);

        ui.label(RichText::new("Esc").strong().monospace());
        ui.label("Quit");
    });
}
