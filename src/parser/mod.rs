//! Parsing of operator input: chat references and selection expressions.
//!
//! # Overview
//!
//! - [`ResourceReference::parse`] recognizes a chat link, username or id
//!   and normalizes it for the remote service.
//! - [`parse_selection`] turns `10,15,18-30`, `T` or `Q` into a
//!   [`Selection`] over a listing.
//!
//! # Example
//!
//! ```
//! use tgmedia_core::parser::{ResourceReference, Selection, parse_selection};
//!
//! let reference = ResourceReference::parse("https://web.telegram.org/k/#-100123").unwrap();
//! assert_eq!(reference.as_str(), "-100123");
//!
//! let selection = parse_selection("2,4-5", 10).unwrap();
//! assert_eq!(selection, Selection::Indices(vec![2, 4, 5]));
//! ```

mod error;
mod reference;
mod selection;

pub use error::{MAX_REFERENCE_LENGTH, SelectionError, ValidationError};
pub use reference::{ReferenceKind, ResourceReference, WEB_CLIENT_PREFIX, normalize, validate};
pub use selection::{Selection, parse_selection};
