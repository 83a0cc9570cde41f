//! Network seam between the worker and the origin server.

use crate::Error;
use crate::request::{Request, Response};

/// Performs live requests against the origin.
///
/// Implementations return non-2xx responses as `Ok`; only a failure to obtain
/// any response at all is an error, reported as `Error::NetworkUnavailable`.
#[async_trait::async_trait]
pub trait Origin: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}
