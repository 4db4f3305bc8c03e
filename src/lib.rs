//! Playfit - media library normalizer
//!
//! This library crate exposes the batch layer for integration testing. The
//! media work itself lives in `playfit-av`.

pub mod audit;
pub mod config;
pub mod lock;
pub mod plex;
pub mod processor;
pub mod scanner;
