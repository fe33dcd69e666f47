use std::path::PathBuf;

use carscout_core::SiteType;
use scout_logging::{scout_error, scout_info};
use sha2::{Digest, Sha256};

use crate::AtomicFileWriter;

/// Receives raw pages an adapter could not make sense of, for offline inspection.
pub trait DiagnosticSink: Send + Sync {
    fn record(&self, site_type: SiteType, url: &str, raw: &[u8]);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDiagnosticSink;

impl DiagnosticSink for NullDiagnosticSink {
    fn record(&self, _site_type: SiteType, _url: &str, _raw: &[u8]) {}
}

/// Keeps the latest unparsable page per URL as `{site}-{hash}.html`.
#[derive(Debug, Clone)]
pub struct FileDiagnosticSink {
    writer: AtomicFileWriter,
}

impl FileDiagnosticSink {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            writer: AtomicFileWriter::new(dir),
        }
    }
}

impl DiagnosticSink for FileDiagnosticSink {
    fn record(&self, site_type: SiteType, url: &str, raw: &[u8]) {
        let filename = diagnostic_filename(site_type, url);
        match self.writer.write(&filename, raw) {
            Ok(path) => scout_info!("Saved unparsable page for {} to {:?}", url, path),
            Err(err) => scout_error!("Failed to save unparsable page for {}: {}", url, err),
        }
    }
}

/// Stable file name for a query URL: the same URL always overwrites its
/// previous dump instead of piling up files.
pub fn diagnostic_filename(site_type: SiteType, url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    let hash: String = digest.iter().take(6).map(|b| format!("{b:02x}")).collect();
    format!("{}-{hash}.html", site_type.label().to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_is_stable_and_per_url() {
        let a = diagnostic_filename(SiteType::Mobile, "https://suchen.mobile.de/a");
        let b = diagnostic_filename(SiteType::Mobile, "https://suchen.mobile.de/b");
        assert_eq!(a, diagnostic_filename(SiteType::Mobile, "https://suchen.mobile.de/a"));
        assert_ne!(a, b);
        assert!(a.starts_with("mobile-"));
        assert!(a.ends_with(".html"));
        assert_eq!(a.len(), "mobile-".len() + 12 + ".html".len());
    }
}
