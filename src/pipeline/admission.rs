//! Upload admission checks. Everything here runs before any task id is
//! allocated or any byte is written, so a rejected submission leaves no
//! trace anywhere in the system.

use thiserror::Error;

/// Declared media types we accept. The declaration is trusted at admission;
/// content problems surface later as a conversion stage error.
pub const SUPPORTED_MEDIA_TYPES: [&str; 3] = ["audio/wav", "audio/mp3", "audio/m4a"];

/// Upper bound on files per batch submission.
pub const MAX_BATCH_SIZE: usize = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AdmissionError {
    #[error("unsupported media type '{media_type}' for {file_name}")]
    UnsupportedMediaType {
        file_name: String,
        media_type: String,
    },
    #[error("batch of {count} files exceeds the maximum of {MAX_BATCH_SIZE}")]
    BatchTooLarge { count: usize },
    #[error("empty upload for {file_name}")]
    EmptyUpload { file_name: String },
}

/// A single uploaded recording as received from the transport layer.
#[derive(Debug, Clone)]
pub struct SubmittedRecording {
    pub file_name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl SubmittedRecording {
    pub fn new(
        file_name: impl Into<String>,
        media_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }
}

pub fn validate_single(recording: &SubmittedRecording) -> Result<(), AdmissionError> {
    if !SUPPORTED_MEDIA_TYPES.contains(&recording.media_type.as_str()) {
        return Err(AdmissionError::UnsupportedMediaType {
            file_name: recording.file_name.clone(),
            media_type: recording.media_type.clone(),
        });
    }
    if recording.bytes.is_empty() {
        return Err(AdmissionError::EmptyUpload {
            file_name: recording.file_name.clone(),
        });
    }
    Ok(())
}

/// All-or-nothing batch validation: size first, then every member. A single
/// bad file rejects the whole batch before any side effect.
pub fn validate_batch(recordings: &[SubmittedRecording]) -> Result<(), AdmissionError> {
    if recordings.len() > MAX_BATCH_SIZE {
        return Err(AdmissionError::BatchTooLarge {
            count: recordings.len(),
        });
    }
    for recording in recordings {
        validate_single(recording)?;
    }
    Ok(())
}

/// File extension used when spooling the upload to disk.
pub fn extension_for(media_type: &str) -> &'static str {
    match media_type {
        "audio/wav" => "wav",
        "audio/mp3" => "mp3",
        "audio/m4a" => "m4a",
        _ => "bin",
    }
}
