pub mod audio;
pub mod auth;
pub mod error;
pub mod ml;
pub mod settings;
pub mod speech;

// Public library API - the CLI only goes through these, everything else is
// public for callers who want to wire the pieces differently.
pub use auth::{DefaultCredential, TokenCredential};
pub use ml::{command, CommandJob, MlClient, SubmittedJob, WorkspaceScope};
pub use settings::{Settings, SettingsManager};
pub use speech::{SpeechConfig, SpeechSynthesizer, SynthesisResult};
