//! Profile page fetching and follower count extraction.
//!
//! The pipeline is split at two seams:
//! - `HttpTransport`: one GET with a header map and optional proxy
//! - `CountExtractor`: pulls the count out of the response body
//!
//! `ProfileFetcher` composes them into the `Fetcher` contract used by jobs.

mod extract;
mod http;
mod profile;
mod types;

pub use extract::{MarkerPatternExtractor, FOLLOWED_BY_MARKER, VIEWER_MARKER};
pub use http::ReqwestTransport;
pub use profile::ProfileFetcher;
pub use types::*;
