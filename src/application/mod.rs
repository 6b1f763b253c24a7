pub mod ingest;

pub use ingest::{run_ingest, Caller, IngestError, IngestRequest, IngestResponse};
