//! Link resolution module.
//!
//! Redirect-following resolution with a per-run coalescing cache, a static
//! host reliability policy, and the HTTP boundary both sit behind.

pub mod fetch;
pub mod reliability;
pub mod resolver;

pub use fetch::{FetchError, FetchOutcome, HttpFetch, ReqwestFetcher};
pub use reliability::{HostPattern, HostPolicy, HostReliability};
pub use resolver::{LinkResolution, LinkResolver, LinkStatus, ResolveOptions, ResolverError};
