use super::FetchError;
use crate::{Provider, ResolverConfig};
use ::utils::surf_logging::SurfLogging;
use ::utils::urls::normalize_base_url;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use surf::Client;

const SESSION_COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

/// Session pool a provider asks the relay to keep warm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayPoolConfig {
    pub provider: Provider,
    pub session_count: usize,
    pub warmup_url: String,
}

/// Clamps a requested session count to the global cap. A cap of 0 disables pooling.
pub fn apply_session_cap(count: usize, cap: usize) -> usize {
    if cap > 0 {
        count.min(cap)
    } else {
        0
    }
}

/// Which providers go through the relay and how many sessions each one gets.
#[derive(Debug, Clone, Default)]
pub struct RelayPools {
    pools: HashMap<Provider, RelayPoolConfig>,
}

impl RelayPools {
    /// One session per mirror, capped by `relay_sessions`, for every relayed provider that has
    /// at least one mirror. Empty when no relay is configured.
    pub fn from_config(config: &ResolverConfig) -> Self {
        let mut pools = HashMap::new();
        for provider in &config.relay_providers {
            if !config.relay_enabled_for(*provider) {
                continue;
            }
            let mirrors = config.mirrors(*provider);
            let Some(warmup_url) = mirrors.first() else {
                continue;
            };
            pools.insert(
                *provider,
                RelayPoolConfig {
                    provider: *provider,
                    session_count: apply_session_cap(mirrors.len(), config.relay_sessions),
                    warmup_url: warmup_url.clone(),
                },
            );
        }
        Self { pools }
    }

    pub fn uses_relay(&self, provider: Provider) -> bool {
        self.pools.contains_key(&provider)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RelayPoolConfig> {
        self.pools.values()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RelayCommand<'a> {
    cmd: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_timeout: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    session: Option<&'a str>,
}

impl<'a> RelayCommand<'a> {
    fn request_get(url: &'a str, timeout: Duration, session: Option<&'a str>) -> Self {
        Self {
            cmd: "request.get",
            url: Some(url),
            max_timeout: Some(timeout.as_millis() as u64),
            session,
        }
    }

    fn session(cmd: &'a str, session: &'a str) -> Self {
        Self {
            cmd,
            url: None,
            max_timeout: None,
            session: Some(session),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RelayResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    solution: Option<RelaySolution>,
}

#[derive(Debug, Deserialize)]
struct RelaySolution {
    #[serde(default)]
    response: Option<String>,
    status: u16,
}

impl RelayResponse {
    fn is_ok(&self) -> bool {
        self.status == "ok"
    }

    /// The resolved body, if the relay succeeded and the target answered 2xx.
    fn into_body(self) -> Result<String, FetchError> {
        if !self.is_ok() {
            return Err(FetchError::Relay(format!(
                "status `{}`{}",
                self.status,
                self.message.map(|m| format!(": {m}")).unwrap_or_default()
            )));
        }
        let solution = self
            .solution
            .ok_or_else(|| FetchError::Relay("missing solution".to_string()))?;
        if !(200..300).contains(&solution.status) {
            return Err(FetchError::Status(solution.status));
        }
        solution
            .response
            .filter(|body| !body.is_empty())
            .ok_or_else(|| FetchError::Relay("empty response".to_string()))
    }
}

struct SessionRing {
    ids: Vec<String>,
    next: AtomicUsize,
}

impl SessionRing {
    fn next_id(&self) -> Option<&str> {
        if self.ids.is_empty() {
            return None;
        }
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.ids.len();
        Some(self.ids[index].as_str())
    }
}

/// Client for a local challenge-solving relay speaking the `request.get` / `sessions.*`
/// command protocol on `POST {base}/v1`.
pub struct RelayClient {
    http: Client,
    endpoint: String,
    pools: RelayPools,
    sessions: DashMap<Provider, SessionRing>,
}

impl RelayClient {
    pub fn new(base_url: &str, pools: RelayPools) -> Self {
        Self {
            http: Client::new().with(SurfLogging),
            endpoint: format!("{}/v1", normalize_base_url(base_url)),
            pools,
            sessions: DashMap::new(),
        }
    }

    async fn send(&self, command: &RelayCommand<'_>, timeout: Duration) -> Result<RelayResponse, FetchError> {
        let request = async {
            let mut response = self
                .http
                .post(&self.endpoint)
                .body_json(command)
                .map_err(FetchError::Http)?
                .await
                .map_err(FetchError::Http)?;
            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status(status as u16));
            }
            response
                .body_json::<RelayResponse>()
                .await
                .map_err(FetchError::Http)
        };

        tokio::time::timeout(timeout, request)
            .await
            .map_err(|_| FetchError::Timeout(timeout))?
    }

    /// Executes a GET inside the relay, using a pooled session for `provider` when one is live.
    pub(crate) async fn request_get(
        &self,
        url: &str,
        timeout: Duration,
        provider: Option<Provider>,
    ) -> Result<String, FetchError> {
        let session = provider.and_then(|p| {
            self.sessions
                .get(&p)
                .and_then(|ring| ring.next_id().map(str::to_string))
        });
        let command = RelayCommand::request_get(url, timeout, session.as_deref());
        self.send(&command, timeout).await?.into_body()
    }

    /// Creates every configured session and primes each pool once against its warm-up URL.
    /// Sessions the relay refuses are skipped; their provider falls back to sessionless calls.
    pub async fn warm_up(&self) {
        for pool in self.pools.iter() {
            let mut ids = Vec::with_capacity(pool.session_count);
            for index in 0..pool.session_count {
                let id = format!("{}-{}", pool.provider.slug(), index);
                match self
                    .send(&RelayCommand::session("sessions.create", &id), SESSION_COMMAND_TIMEOUT)
                    .await
                {
                    Ok(response) if response.is_ok() => ids.push(id),
                    Ok(response) => log::warn!(
                        "Relay refused session {}: {}",
                        id,
                        response.message.unwrap_or(response.status)
                    ),
                    Err(err) => log::warn!("Relay session {} not created: {}", id, err),
                }
            }

            if let Some(first) = ids.first() {
                let command =
                    RelayCommand::request_get(&pool.warmup_url, SESSION_COMMAND_TIMEOUT, Some(first));
                if let Err(err) = self
                    .send(&command, SESSION_COMMAND_TIMEOUT)
                    .await
                    .and_then(RelayResponse::into_body)
                {
                    log::warn!("Relay warm-up for {} failed: {}", pool.provider, err);
                }
            }

            log::info!(
                "Relay pool for {} ready with {}/{} session(s)",
                pool.provider,
                ids.len(),
                pool.session_count
            );
            self.sessions.insert(
                pool.provider,
                SessionRing {
                    ids,
                    next: AtomicUsize::new(0),
                },
            );
        }
    }

    /// Destroys every session created by [`RelayClient::warm_up`].
    pub async fn shutdown(&self) {
        let rings: Vec<(Provider, Vec<String>)> = self
            .sessions
            .iter()
            .map(|entry| (*entry.key(), entry.value().ids.clone()))
            .collect();
        self.sessions.clear();

        for (provider, ids) in rings {
            for id in ids {
                if let Err(err) = self
                    .send(&RelayCommand::session("sessions.destroy", &id), SESSION_COMMAND_TIMEOUT)
                    .await
                {
                    log::debug!("Relay session {} for {} not destroyed: {}", id, provider, err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_cap() {
        assert_eq!(apply_session_cap(3, 2), 2);
        assert_eq!(apply_session_cap(1, 4), 1);
        assert_eq!(apply_session_cap(5, 0), 0);
    }

    #[test]
    fn pools_follow_config() {
        let config = ResolverConfig {
            relay_url: Some("http://localhost:8191".to_string()),
            relay_sessions: 2,
            relay_providers: vec![Provider::TorrentGalaxy, Provider::Eztv],
            tgx_urls: vec![
                "https://a.example".to_string(),
                "https://b.example".to_string(),
                "https://c.example".to_string(),
            ],
            eztv_urls: vec![],
            ..Default::default()
        };
        let pools = RelayPools::from_config(&config);

        let tgx = pools
            .iter()
            .find(|pool| pool.provider == Provider::TorrentGalaxy)
            .unwrap();
        assert_eq!(tgx.session_count, 2);
        assert_eq!(tgx.warmup_url, "https://a.example");
        assert!(!pools.uses_relay(Provider::Eztv));
        assert!(!pools.uses_relay(Provider::Yts));
    }

    #[test]
    fn no_relay_url_means_no_pools() {
        let pools = RelayPools::from_config(&ResolverConfig::default());
        assert_eq!(pools.iter().count(), 0);
    }

    #[test]
    fn request_command_wire_format() {
        let command = RelayCommand::request_get("https://x.example", Duration::from_secs(10), None);
        let json = serde_json::to_value(&command).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"cmd": "request.get", "url": "https://x.example", "maxTimeout": 10000})
        );
    }

    #[test]
    fn only_ok_and_2xx_yield_a_body() {
        let ok: RelayResponse = serde_json::from_str(
            r#"{"status":"ok","solution":{"response":"<html></html>","status":200}}"#,
        )
        .unwrap();
        assert_eq!(ok.into_body().unwrap(), "<html></html>");

        let blocked: RelayResponse =
            serde_json::from_str(r#"{"status":"ok","solution":{"response":"denied","status":403}}"#)
                .unwrap();
        assert!(matches!(blocked.into_body(), Err(FetchError::Status(403))));

        let failed: RelayResponse =
            serde_json::from_str(r#"{"status":"error","message":"Challenge not solved"}"#).unwrap();
        assert!(matches!(failed.into_body(), Err(FetchError::Relay(_))));

        let empty: RelayResponse =
            serde_json::from_str(r#"{"status":"ok","solution":{"response":"","status":200}}"#)
                .unwrap();
        assert!(empty.into_body().is_err());
    }

    #[test]
    fn sessions_rotate() {
        let ring = SessionRing {
            ids: vec!["tgx-0".to_string(), "tgx-1".to_string()],
            next: AtomicUsize::new(0),
        };
        assert_eq!(ring.next_id(), Some("tgx-0"));
        assert_eq!(ring.next_id(), Some("tgx-1"));
        assert_eq!(ring.next_id(), Some("tgx-0"));

        let empty = SessionRing {
            ids: vec![],
            next: AtomicUsize::new(0),
        };
        assert_eq!(empty.next_id(), None);
    }
}
