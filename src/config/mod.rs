// src/config/mod.rs
pub mod settings;
pub mod table;

pub use settings::{LogFormat, Settings};
pub use table::BotTable;
