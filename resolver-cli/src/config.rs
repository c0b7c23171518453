use crate::error::CliError;
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use simplelog::LevelFilter;
use std::path::Path;
use stream_resolver::ResolverConfig;

pub const DEFAULT_CONFIG_FILE: &str = "resolver.yaml";
pub const ENV_PREFIX: &str = "RESOLVER_";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub resolver: ResolverConfig,
    pub log_level: LevelFilter,
}

/// Defaults, then the YAML file, then `RESOLVER_*` environment variables.
fn figment(file: &Path) -> Figment {
    Figment::from(Serialized::defaults(ResolverConfig::default()))
        .merge(Serialized::default("log_level", "info"))
        .merge(Yaml::file(file))
        .merge(Env::prefixed(ENV_PREFIX))
}

impl AppConfig {
    /// An explicit `path` must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, CliError> {
        if let Some(path) = path {
            if !path.exists() {
                return Err(CliError::MissingConfig(path.to_path_buf()));
            }
        }
        let figment = figment(path.unwrap_or(Path::new(DEFAULT_CONFIG_FILE)));

        let resolver: ResolverConfig = figment.extract()?;
        let level: String = figment.extract_inner("log_level")?;
        let log_level = level
            .parse::<LevelFilter>()
            .map_err(|_| CliError::LogLevel(level))?;

        Ok(Self { resolver, log_level })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use stream_resolver::Provider;

    #[test]
    fn defaults_without_file_or_env() {
        Jail::expect_with(|_jail| {
            let config = AppConfig::load(None).expect("defaults load");
            assert_eq!(config.log_level, LevelFilter::Info);
            assert_eq!(config.resolver.fetch_timeout_ms, 10_000);
            assert_eq!(config.resolver.cache_ttl_seconds(), 604_800);
            assert_eq!(config.resolver.relay_providers, vec![Provider::TorrentGalaxy]);
            assert!(config.resolver.relay_url.is_none());
            Ok(())
        });
    }

    #[test]
    fn env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                DEFAULT_CONFIG_FILE,
                r#"
log_level: debug
fetch_timeout_ms: 2500
cache_ttl_hours: 1
tgx_urls:
  - https://tgx.example
relay_providers:
  - eztv
"#,
            )?;
            jail.set_env("RESOLVER_FETCH_TIMEOUT_MS", "4000");
            jail.set_env("RESOLVER_RELAY_URL", "http://localhost:8191");

            let config = AppConfig::load(None).expect("config loads");
            assert_eq!(config.log_level, LevelFilter::Debug);
            assert_eq!(config.resolver.fetch_timeout_ms, 4000);
            assert_eq!(config.resolver.cache_ttl_seconds(), 3600);
            assert_eq!(config.resolver.tgx_urls, vec!["https://tgx.example"]);
            assert_eq!(config.resolver.yts_urls, vec!["https://yts.mx"]);
            assert_eq!(config.resolver.relay_providers, vec![Provider::Eztv]);
            assert_eq!(
                config.resolver.relay_url.as_deref(),
                Some("http://localhost:8191")
            );
            Ok(())
        });
    }

    #[test]
    fn explicit_path_must_exist() {
        Jail::expect_with(|_jail| {
            let err = AppConfig::load(Some(Path::new("missing.yaml"))).unwrap_err();
            assert!(matches!(err, CliError::MissingConfig(_)));
            Ok(())
        });
    }

    #[test]
    fn bad_log_level_is_rejected() {
        Jail::expect_with(|jail| {
            jail.set_env("RESOLVER_LOG_LEVEL", "chatty");
            assert!(matches!(AppConfig::load(None), Err(CliError::LogLevel(_))));
            Ok(())
        });
    }
}
