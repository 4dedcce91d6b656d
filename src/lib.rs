pub mod analysis;
pub mod api;
pub mod app;
pub mod auth;
pub mod classification;
pub mod cli;
pub mod config;
pub mod convert;
pub mod db;
pub mod export;
pub mod global;
pub mod pipeline;
pub mod search;
pub mod transcription;
