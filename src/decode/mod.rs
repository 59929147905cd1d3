//! Page decoder module
//!
//! Turns one raw page of search results into ordered records.
//!
//! # Overview
//!
//! Decoding tolerates partial failure at record granularity: a malformed
//! hit is skipped and reported, while the rest of the page is still
//! decoded. Only a page missing its hits array is an error.

mod decoders;
mod types;

pub(crate) use decoders::lookup_path;
pub use decoders::HitsDecoder;
pub use types::{DecodeSkip, DecodedPage, PageDecoder, SkipReason};
