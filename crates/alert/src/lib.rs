//! Canary alerts for decoy file access.
//!
//! An alert is a DNS lookup of a synthetic hostname that encodes which decoy
//! was touched and by which process:
//!
//! ```text
//! u<1000..=9999>.f<base32(file name)>.i<base32(process image name)>.<domain>
//! ```
//!
//! The authoritative server for `<domain>` sees the query; the answer is
//! irrelevant. Lookups run on a tokio runtime and are never awaited by the
//! caller. Debouncing is the caller's job.

use std::sync::Arc;

use data_encoding::BASE32_NOPAD;
use rand::Rng;
use tokio::runtime::Handle;

/// Label used when the accessing process is unknown.
pub const UNKNOWN_PROCESS: &str = "unknown";

/// Port passed to the resolver. Only the name is looked up.
const LOOKUP_PORT: u16 = 53;

/// Sink for decoy access alerts.
pub trait CanaryAlert: Send + Sync {
    /// Report that `virtual_path` was accessed by `process_image`.
    ///
    /// Must not block on network I/O.
    fn alert(&self, virtual_path: &str, process_image: &str);
}

impl<T: CanaryAlert + ?Sized> CanaryAlert for Arc<T> {
    fn alert(&self, virtual_path: &str, process_image: &str) {
        (**self).alert(virtual_path, process_image)
    }
}

/// Final segment of a Windows or POSIX style path.
fn last_segment(path: &str) -> &str {
    path.rsplit(['\\', '/']).next().unwrap_or(path)
}

/// Base32 (RFC 4648, unpadded) of the UTF-8 bytes of `label`.
pub fn encode_label(label: &str) -> String {
    BASE32_NOPAD.encode(label.as_bytes())
}

/// Build the canary hostname for one access.
///
/// # Arguments
/// * `virtual_path` - Accessed decoy path (only the file name is encoded)
/// * `process_image` - Image path of the accessing process
/// * `unique` - Disambiguating number defeating resolver caches
/// * `domain` - Alert domain
///
/// # Returns
/// `u<unique>.f<file>.i<process>.<domain>`
pub fn alert_hostname(virtual_path: &str, process_image: &str, unique: u16, domain: &str) -> String {
    let file: &str = last_segment(virtual_path);
    let process: &str = match last_segment(process_image) {
        "" => UNKNOWN_PROCESS,
        name => name,
    };

    format!(
        "u{}.f{}.i{}.{}",
        unique,
        encode_label(file),
        encode_label(process),
        domain.trim_matches('.')
    )
}

/// Alerter that resolves canary hostnames in the background.
#[derive(Debug, Clone)]
pub struct DnsCanaryAlerter {
    domain: Option<String>,
    runtime: Handle,
}

impl DnsCanaryAlerter {
    /// Create an alerter.
    ///
    /// # Arguments
    /// * `domain` - Alert domain; None logs alerts without any lookup
    /// * `runtime` - Runtime the lookups are spawned on
    pub fn new(domain: Option<String>, runtime: Handle) -> Self {
        let domain: Option<String> = domain
            .map(|d| d.trim().trim_matches('.').to_string())
            .filter(|d| !d.is_empty());
        Self { domain, runtime }
    }

    /// Configured alert domain.
    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }
}

impl CanaryAlert for DnsCanaryAlerter {
    fn alert(&self, virtual_path: &str, process_image: &str) {
        tracing::info!(file = virtual_path, process = process_image, "decoy accessed");

        let Some(domain) = self.domain.as_deref() else {
            return;
        };

        let unique: u16 = rand::thread_rng().gen_range(1000..=9999);
        let hostname: String = alert_hostname(virtual_path, process_image, unique, domain);

        self.runtime.spawn(async move {
            match tokio::net::lookup_host((hostname.as_str(), LOOKUP_PORT)).await {
                Ok(_) => tracing::debug!(hostname = %hostname, "canary lookup sent"),
                Err(e) => tracing::debug!(hostname = %hostname, error = %e, "canary lookup failed"),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_label_rfc4648() {
        assert_eq!(encode_label("f"), "MY");
        assert_eq!(encode_label("foobar"), "MZXW6YTBOI");
        assert_eq!(encode_label(""), "");
    }

    #[test]
    fn test_alert_hostname_shape() {
        let host: String = alert_hostname(
            "\\Network\\Network Diagram.pdf",
            "C:\\Windows\\explorer.exe",
            4321,
            "alerts.example.com",
        );
        assert_eq!(
            host,
            format!(
                "u4321.f{}.i{}.alerts.example.com",
                encode_label("Network Diagram.pdf"),
                encode_label("explorer.exe")
            )
        );
    }

    #[test]
    fn test_alert_hostname_unknown_process() {
        let host: String = alert_hostname("\\a.txt", "", 1000, "x.test");
        assert!(host.contains(&format!(".i{}.", encode_label(UNKNOWN_PROCESS))));
    }

    #[test]
    fn test_alert_hostname_forward_slashes_and_dots() {
        let host: String = alert_hostname("/dir/a.txt", "/usr/bin/cat", 9999, ".x.test.");
        assert_eq!(
            host,
            format!("u9999.f{}.i{}.x.test", encode_label("a.txt"), encode_label("cat"))
        );
    }

    #[test]
    fn test_new_ignores_blank_domain() {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let alerter = DnsCanaryAlerter::new(Some("  ".into()), rt.handle().clone());
        assert_eq!(alerter.domain(), None);

        let alerter = DnsCanaryAlerter::new(Some("canary.test.".into()), rt.handle().clone());
        assert_eq!(alerter.domain(), Some("canary.test"));
    }

    #[tokio::test]
    async fn test_alert_is_fire_and_forget() {
        // `.invalid` never resolves; the call must still return immediately.
        let alerter = DnsCanaryAlerter::new(Some("canary.invalid".into()), Handle::current());
        alerter.alert("\\Network\\Plan.txt", "C:\\tools\\cat.exe");

        let shared: Arc<dyn CanaryAlert> = Arc::new(alerter);
        shared.alert("\\Network\\Plan.txt", "");
    }
}
