use serde::Serialize;
use std::time::Duration;

use crate::config::ApiKey;

const PING_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    Pass,
    Fail,
    // no datastore configured
    Skip,
}

/// Liveness ping against the hosted datastore's REST endpoint.
pub struct DatastoreProbe {
    client: reqwest::Client,
    base_url: Option<String>,
    api_key: Option<ApiKey>,
}

impl DatastoreProbe {
    pub fn new(client: reqwest::Client, base_url: Option<String>, api_key: Option<ApiKey>) -> Self {
        Self {
            client,
            base_url: base_url.map(|url| url.trim_end_matches('/').to_string()),
            api_key,
        }
    }

    pub fn disabled() -> Self {
        Self::new(reqwest::Client::new(), None, None)
    }

    pub async fn ping(&self) -> ProbeStatus {
        let Some(base_url) = &self.base_url else {
            return ProbeStatus::Skip;
        };

        let url = format!("{base_url}/rest/v1/projects?select=id&limit=1");
        let mut request = self.client.get(&url).timeout(PING_TIMEOUT);
        if let Some(key) = &self.api_key {
            request = request
                .header("apikey", key.expose())
                .bearer_auth(key.expose());
        }

        match request.send().await {
            Ok(res) if res.status().is_success() => {
                tracing::debug!("Datastore connection healthy");
                ProbeStatus::Pass
            }
            Ok(res) => {
                tracing::error!(status = res.status().as_u16(), "Datastore connection check failed");
                ProbeStatus::Fail
            }
            Err(e) => {
                tracing::error!(error = %e.without_url(), "Datastore connection check error");
                ProbeStatus::Fail
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_probe_is_skipped() {
        assert_eq!(DatastoreProbe::disabled().ping().await, ProbeStatus::Skip);
    }

    #[tokio::test]
    async fn unreachable_datastore_fails() {
        // nothing listens on port 1
        let probe = DatastoreProbe::new(
            reqwest::Client::new(),
            Some("http://127.0.0.1:1/".to_string()),
            Some(ApiKey::new("anon")),
        );
        assert_eq!(probe.ping().await, ProbeStatus::Fail);
    }
}
