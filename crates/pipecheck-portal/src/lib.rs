//! Metadata sources for pipecheck.
//!
//! - [`PortalClient`]: blocking HTTP client for the metadata portal, with
//!   basic-auth credentials and bounded retries.
//! - [`load_fixture_dir`]: an offline [`RecordStore`] hydrated from JSON and
//!   JSONL files on disk.
//!
//! Both implement [`pipecheck_kernel::MetadataSource`].
//!
//! [`RecordStore`]: pipecheck_kernel::RecordStore

pub mod client;
pub mod error;
pub mod fixtures;

pub use client::{Credentials, PortalClient, PortalConfig};
pub use error::PortalError;
pub use fixtures::{load_fixture_dir, read_records};
