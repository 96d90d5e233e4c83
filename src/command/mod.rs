mod chat;
mod models;
mod plugin;
mod review;
mod serve;
mod settings;
mod status;

pub use chat::run_chat;
pub use models::run_models;
pub use review::run_review;
pub use serve::run_serve;
pub use settings::run_settings;
pub use status::run_status;
