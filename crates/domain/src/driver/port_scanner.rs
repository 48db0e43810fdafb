use crate::device::Endpoint;

/// Presence checks over the host's transport endpoints.
///
/// Both methods must be cheap: a filesystem lookup, never a connection attempt.
pub trait PortScanner: Send + Sync {
    /// Numbered candidate ports (`prefix0..prefixN-1`) that currently exist, in index order
    fn list_candidate_endpoints(&self) -> Vec<Endpoint>;

    /// Point-in-time existence check. `None` never exists.
    fn exists(&self, endpoint: Option<&Endpoint>) -> bool;
}
