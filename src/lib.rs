//! Batched ELB access-log ingestion: S3 notification in, parsed documents
//! out to an Elasticsearch bulk endpoint, under the invocation's time budget.

pub mod batch;
pub mod budget;
pub mod config;
pub mod ingestion;
pub mod models;
pub mod observability;
pub mod parser;
pub mod session;
pub mod storage;
