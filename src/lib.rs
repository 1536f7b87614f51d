pub mod config;
pub mod constants;
pub mod crawler;
pub mod error;
pub mod extractor;
pub mod geocoder;
pub mod listing;
pub mod logging;
pub mod pipeline;
pub mod storage;
pub mod subtitle;
pub mod types;
