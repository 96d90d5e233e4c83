pub mod args;
pub mod canvas;

pub use args::{Cli, Commands, ServiceArgs, SettingsAction};
pub use canvas::JsonCanvas;
