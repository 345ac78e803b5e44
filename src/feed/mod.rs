// Feed API module.
// Client, transport, retrying fetcher and types for the subscription feed backend.

pub mod client;
pub mod endpoints;
pub mod fetcher;
pub mod transport;
pub mod types;

pub use client::FeedClient;
pub use fetcher::{AuthenticatedFetcher, RetryPolicy};
pub use transport::{ReqwestTransport, Transport, TransportResponse};
pub use types::*;
