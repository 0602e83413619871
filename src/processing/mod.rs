//! Background ingestion processing: bounded queue, document-parallel workers

mod queue;
mod worker;

pub use queue::IngestQueue;
pub use worker::spawn_workers;
