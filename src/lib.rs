//! Chat Media Downloader Core Library
//!
//! Browse the history of a chat on a remote message service and download the
//! documents attached to selected messages.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`parser`] - Chat reference validation and selection expressions
//! - [`service`] - Remote message service port, HTTP gateway and in-memory adapters
//! - [`listing`] - History enumeration into a numbered listing
//! - [`download`] - Sequential, retrying media downloads to disk
//! - [`session`] - The interactive prompt/list/select/download loop
//! - [`config`] - JSON configuration loading and validation

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod download;
pub mod listing;
pub mod parser;
pub mod service;
pub mod session;

// Re-export commonly used types
pub use config::{AppConfig, ConfigOverrides};
pub use download::{
    DownloadReport, RetryPolicy, RetryingDownloader, TransferErrorKind, TransferOutcome,
    TransferStatus,
};
pub use listing::{ListError, ListedItem, Listing, MessageLister};
pub use parser::{ResourceReference, Selection, SelectionError, ValidationError, parse_selection};
pub use service::{
    Entity, HttpMessageService, InMemoryService, MessageService, RemoteMessage, ServiceError,
};
pub use session::{Session, SessionEnd, SessionOptions};
