use std::path::Path;

use domain::device::Endpoint;
use domain::driver::PortScanner;

/// Enumerates numbered serial device nodes (`/dev/ttyUSB0` .. `/dev/ttyUSB{N-1}`)
/// by checking the filesystem.
#[derive(Debug, Clone)]
pub struct DevicePathScanner {
    prefix: String,
    max_ports: usize,
}

impl DevicePathScanner {
    pub fn new(prefix: impl Into<String>, max_ports: usize) -> Self {
        Self {
            prefix: prefix.into(),
            max_ports,
        }
    }

    /// Candidate paths in index order, present or not
    pub fn candidate_paths(&self) -> impl Iterator<Item = String> + '_ {
        (0..self.max_ports).map(move |n| format!("{}{}", self.prefix, n))
    }
}

impl PortScanner for DevicePathScanner {
    fn list_candidate_endpoints(&self) -> Vec<Endpoint> {
        self.candidate_paths()
            .filter(|path| Path::new(path).exists())
            .filter_map(|path| Endpoint::new(path).ok())
            .collect()
    }

    fn exists(&self, endpoint: Option<&Endpoint>) -> bool {
        endpoint.is_some_and(|ep| Path::new(ep.as_str()).exists())
    }
}
