use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} missing, it is required")]
    Missing(&'static str),

    #[error("{name} is invalid: {value}")]
    Invalid { name: &'static str, value: String },

    #[error("no flag source configured, set FLAGS_FILE or DATABASE_URL")]
    NoFlagSource,
}

/// Where flags are read from.
#[derive(Debug, Clone, PartialEq)]
pub enum FlagSource {
    File(PathBuf),
    Database {
        url: String,
        max_connections: u32,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub flag_source: FlagSource,
    /// Empty means any origin.
    pub cors_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenv().is_ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// `FLAGS_FILE` wins over `DATABASE_URL` when both are set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string());

        let port = lookup("PORT").ok_or(ConfigError::Missing("PORT"))?;
        let port = port
            .parse()
            .map_err(|_| ConfigError::Invalid { name: "PORT", value: port })?;

        let flag_source = match (lookup("FLAGS_FILE"), lookup("DATABASE_URL")) {
            (Some(path), _) => FlagSource::File(PathBuf::from(path)),
            (None, Some(url)) => {
                let max_connections = match lookup("DB_MAX_CONNECTIONS") {
                    Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                        name: "DB_MAX_CONNECTIONS",
                        value: raw,
                    })?,
                    None => 5,
                };
                FlagSource::Database { url, max_connections }
            }
            (None, None) => return Err(ConfigError::NoFlagSource),
        };

        let cors_origins = lookup("CORS_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            host,
            port,
            flag_source,
            cors_origins,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_database_source_with_defaults() {
        let config =
            Config::from_lookup(lookup(&[("PORT", "8080"), ("DATABASE_URL", "postgres://db/flags")]))
                .unwrap();

        assert_eq!(config.addr(), "127.0.0.1:8080");
        assert_eq!(
            config.flag_source,
            FlagSource::Database {
                url: "postgres://db/flags".to_string(),
                max_connections: 5
            }
        );
        assert!(config.cors_origins.is_empty());
    }

    #[test]
    fn test_flags_file_wins() {
        let config = Config::from_lookup(lookup(&[
            ("PORT", "8080"),
            ("HOST", "0.0.0.0"),
            ("FLAGS_FILE", "flags.json"),
            ("DATABASE_URL", "postgres://db/flags"),
            ("CORS_ORIGINS", "http://a.test, http://b.test,"),
        ]))
        .unwrap();

        assert_eq!(config.flag_source, FlagSource::File(PathBuf::from("flags.json")));
        assert_eq!(config.cors_origins, vec!["http://a.test", "http://b.test"]);
        assert_eq!(config.addr(), "0.0.0.0:8080");
    }

    #[test]
    fn test_port_errors() {
        assert!(matches!(
            Config::from_lookup(lookup(&[("FLAGS_FILE", "flags.json")])),
            Err(ConfigError::Missing("PORT"))
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[("PORT", "eighty"), ("FLAGS_FILE", "flags.json")])),
            Err(ConfigError::Invalid { name: "PORT", .. })
        ));
    }

    #[test]
    fn test_requires_flag_source() {
        assert!(matches!(
            Config::from_lookup(lookup(&[("PORT", "8080")])),
            Err(ConfigError::NoFlagSource)
        ));
    }
}
