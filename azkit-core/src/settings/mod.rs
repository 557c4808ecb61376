pub mod config;
pub mod manager;

#[cfg(test)]
mod tests;

pub use config::{JobDefaults, Settings, SpeechSettings, WorkspaceSettings};
pub use manager::SettingsManager;
