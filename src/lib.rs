pub mod decoder;
pub mod engine;
pub mod entry;
pub mod error;
pub mod export;
pub mod identity;
pub mod io;
pub mod record;
pub mod report;
pub mod stats;

