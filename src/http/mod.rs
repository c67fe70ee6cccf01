pub mod document_api;
pub mod pool;
pub mod submitter;

pub use document_api::DocumentApi;
pub use submitter::{HttpSubmitter, Reply, Submitter};
