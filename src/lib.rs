//! `clickhouse-http-stream` is an async streaming client for ClickHouse over HTTP.
//!
//! Queries are sent with `FORMAT JSON` and their rows are decoded one at a
//! time while the response body is still arriving:
//! - [`ClickHouseClient::query`] streams decoded rows
//! - [`ClickHouseClient::insert`] sends rows as `JSONEachRow` and streams the
//!   server's acknowledgement
//!
//! Failures end the stream with a single [`ClickHouseError`] and are logged
//! once through `tracing`.

mod client;
mod compression;
mod config;
mod decode;
mod error;
mod options;
mod report;
mod request;
mod types;
mod wire;

pub use client::{ClickHouseClient, InsertStream, QueryStream};
pub use compression::{headers_for, ResponseTransform};
pub use config::ClientConfig;
pub use decode::{RowScanner, ROWS_FIELD};
pub use error::ClickHouseError;
pub use options::ClientOptions;
pub use request::RequestDescriptor;
pub use types::{Compression, Format, Protocol};
pub use wire::{encode_rows, insert_query, INSERT_FORMAT};

pub type Result<T> = std::result::Result<T, ClickHouseError>;
