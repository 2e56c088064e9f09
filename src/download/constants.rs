//! Constants for the download module.

/// Name of the failure log written into the download root.
pub const LOG_FILE_NAME: &str = "log.txt";

/// Name used when a sanitized file name ends up empty or unsafe.
pub const FALLBACK_FILE_NAME: &str = "download.bin";

/// Longest file name written, in bytes.
pub const MAX_FILE_NAME_BYTES: usize = 255;
