//! Locating a locally spawned backend through its port file and health endpoint.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tokio::time::{Instant, sleep};

use crate::CoreError;
use crate::config::Config;

const PORT_FILE_POLL: Duration = Duration::from_millis(80);
const HEALTH_POLL: Duration = Duration::from_millis(100);
const HEALTH_REQUEST_TIMEOUT: Duration = Duration::from_millis(800);

/// Contents of the port file the backend writes once it has bound a socket.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PortInfo {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub pid: i64,
}

impl PortInfo {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// Read and parse the port file, `None` while it is missing or half-written.
pub fn read_port_file(path: &Path) -> Option<PortInfo> {
    let text = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&text).ok()
}

/// Wait until the port file is readable and `/api/health` answers 2xx.
///
/// Returns the backend base URL. Both stages share the `timeout` budget.
pub async fn wait_for_backend(port_file: &Path, timeout: Duration) -> Result<String, CoreError> {
    let start = Instant::now();

    let info = loop {
        if start.elapsed() > timeout {
            return Err(CoreError::BackendUnavailable(format!(
                "timeout waiting for port file {}",
                port_file.display()
            )));
        }
        if let Some(info) = read_port_file(port_file) {
            break info;
        }
        sleep(PORT_FILE_POLL).await;
    };

    let base = info.base_url();
    log::debug!("port file found, backend pid {} at {base}", info.pid);

    let client = reqwest::Client::builder()
        .timeout(HEALTH_REQUEST_TIMEOUT)
        .build()?;
    let health_url = format!("{base}/api/health");
    loop {
        if start.elapsed() > timeout {
            return Err(CoreError::BackendUnavailable(format!(
                "timeout waiting for {health_url}"
            )));
        }
        let ok = client
            .get(&health_url)
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false);
        if ok {
            break;
        }
        sleep(HEALTH_POLL).await;
    }

    log::info!("backend ready at {base}");
    Ok(base)
}

/// The base URL to talk to: discovered through the port file when one is
/// configured, otherwise `backend_url` as is.
pub async fn resolve_base_url(config: &Config) -> Result<String, CoreError> {
    match &config.port_file {
        Some(path) => wait_for_backend(path, config.health_timeout).await,
        None => Ok(config.backend_url.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_info_url() {
        let info: PortInfo =
            serde_json::from_str(r#"{"host":"127.0.0.1","port":51234,"pid":42}"#).unwrap();
        assert_eq!(info.base_url(), "http://127.0.0.1:51234");
    }

    #[test]
    fn partial_port_file_is_not_ready() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("port.json");
        assert!(read_port_file(&path).is_none());
        std::fs::write(&path, "").unwrap();
        assert!(read_port_file(&path).is_none());
        std::fs::write(&path, r#"{"host":"127.0.0.1","port":8001}"#).unwrap();
        assert_eq!(read_port_file(&path).map(|i| i.port), Some(8001));
    }

    #[tokio::test]
    async fn without_port_file_uses_backend_url() {
        let config = Config {
            backend_url: "http://10.0.0.5:8000".into(),
            ..Config::default()
        };
        assert_eq!(resolve_base_url(&config).await.unwrap(), "http://10.0.0.5:8000");
    }

    #[tokio::test(start_paused = true)]
    async fn missing_port_file_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let err = wait_for_backend(&dir.path().join("never.json"), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::BackendUnavailable(msg) if msg.contains("port file")));
    }
}
