pub mod main_panel;

pub use main_panel::render_main_panel;
