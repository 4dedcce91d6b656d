pub mod remote_api;
pub mod whisper_cli;

pub use remote_api::RemoteSttProvider;
pub use whisper_cli::WhisperCliProvider;
