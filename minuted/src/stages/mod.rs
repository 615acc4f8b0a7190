//! The three pipeline stages: transcription, report generation, export.
pub mod export;
pub mod report;
pub mod transcribe;
