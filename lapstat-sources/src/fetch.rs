//! Document sources: HTTP with bounded retry, and local files

use lapstat_core::config::FetchSettings;
use lapstat_core::error::SourceError;
use lapstat_core::source::DocumentSource;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

/// Linear backoff before `attempt` (1-based); the first attempt never waits
fn retry_delay(settings: &FetchSettings, attempt: u32) -> Duration {
    let step = u64::from(attempt.saturating_sub(1));
    Duration::from_millis(settings.backoff_ms.saturating_mul(step))
}

/// Replay documents served over HTTP(S)
pub struct HttpSource {
    url: String,
    client: reqwest::blocking::Client,
    settings: FetchSettings,
}

impl HttpSource {
    pub fn new(url: impl Into<String>, settings: FetchSettings) -> Result<Self, SourceError> {
        let url = url.into();
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_s))
            .build()
            .map_err(|e| SourceError::unavailable(&url, e))?;
        Ok(Self {
            url,
            client,
            settings,
        })
    }

    fn fetch_once(&self) -> reqwest::Result<String> {
        self.client.get(&self.url).send()?.error_for_status()?.text()
    }
}

impl DocumentSource for HttpSource {
    fn name(&self) -> &str {
        "http"
    }

    fn location(&self) -> String {
        self.url.clone()
    }

    fn load(&self) -> Result<String, SourceError> {
        let attempts = self.settings.retries.saturating_add(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            if attempt > 1 {
                thread::sleep(retry_delay(&self.settings, attempt));
            }

            match self.fetch_once() {
                Ok(body) => {
                    info!(url = %self.url, bytes = body.len(), attempt, "Fetched document");
                    return Ok(body);
                }
                Err(e) => {
                    warn!(url = %self.url, attempt, attempts, "Fetch failed: {}", e);
                    last_error = e.to_string();
                }
            }
        }

        Err(SourceError::unavailable(&self.url, last_error))
    }
}

/// Documents on the local filesystem
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DocumentSource for FileSource {
    fn name(&self) -> &str {
        "file"
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> Result<String, SourceError> {
        let text = std::fs::read_to_string(&self.path)
            .map_err(|e| SourceError::unavailable(self.location(), e))?;
        info!(path = %self.path.display(), bytes = text.len(), "Read document");
        Ok(text)
    }
}

fn is_url(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// HTTP source for URLs, file source for anything else
pub fn source_for(
    location: &str,
    settings: &FetchSettings,
) -> Result<Box<dyn DocumentSource>, SourceError> {
    if is_url(location) {
        Ok(Box::new(HttpSource::new(location, settings.clone())?))
    } else {
        Ok(Box::new(FileSource::new(location)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_delay_is_linear() {
        let settings = FetchSettings {
            backoff_ms: 500,
            ..FetchSettings::default()
        };
        assert_eq!(retry_delay(&settings, 1), Duration::ZERO);
        assert_eq!(retry_delay(&settings, 2), Duration::from_millis(500));
        assert_eq!(retry_delay(&settings, 4), Duration::from_millis(1500));
    }

    #[test]
    fn test_retry_delay_saturates() {
        let settings = FetchSettings {
            backoff_ms: u64::MAX,
            ..FetchSettings::default()
        };
        assert_eq!(retry_delay(&settings, u32::MAX), Duration::from_millis(u64::MAX));
    }

    #[test]
    fn test_is_url() {
        assert!(is_url("https://www.accreplay.com/api/replays/32392"));
        assert!(is_url("http://localhost:8080/replay.json"));
        assert!(!is_url("ACC_companion_dumps/misano.json"));
        assert!(!is_url("/tmp/replay.json"));
    }

    #[test]
    fn test_source_for_picks_kind() {
        let settings = FetchSettings::default();
        let http = source_for("https://example.com/replay", &settings).unwrap();
        assert_eq!(http.name(), "http");
        assert_eq!(http.location(), "https://example.com/replay");

        let file = source_for("dumps/misano.json", &settings).unwrap();
        assert_eq!(file.name(), "file");
        assert_eq!(file.location(), "dumps/misano.json");
    }
}
