pub mod common;
pub mod downloader;
pub mod queue;
