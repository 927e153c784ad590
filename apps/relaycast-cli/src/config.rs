use config::{Config, ConfigError, Environment, File};
use relaycast_core::DEFAULT_RELAYS;
use relaycast_node::{PublishConfig, RetryPolicy};
use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct CliConfig {
    #[serde(with = "humantime_serde")]
    pub per_attempt_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    #[serde(default, with = "humantime_serde")]
    pub overall_timeout: Option<Duration>,
    pub min_successes: usize,
    pub max_attempts: u32,
    #[serde(with = "humantime_serde")]
    pub retry_base_delay: Duration,
    #[serde(with = "humantime_serde")]
    pub retry_max_delay: Duration,
    pub retry_jitter: bool,
    #[serde(deserialize_with = "deserialize_list")]
    pub default_relays: Vec<String>,
    /// Name of the environment variable holding the secret key.
    pub secret_env: String,
}

fn deserialize_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct ListVisitor;

    impl<'de> Visitor<'de> for ListVisitor {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or a sequence of strings")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(split_list(value))
        }

        fn visit_seq<S>(self, mut seq: S) -> Result<Self::Value, S::Error>
        where
            S: de::SeqAccess<'de>,
        {
            let mut vec = Vec::new();
            while let Some(element) = seq.next_element()? {
                vec.push(element);
            }
            Ok(vec)
        }
    }

    deserializer.deserialize_any(ListVisitor)
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(|c| c == ',' || c == ';')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl CliConfig {
    pub fn new(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("per_attempt_timeout", "15s")?
            .set_default("connect_timeout", "10s")?
            .set_default("min_successes", 1)?
            .set_default("max_attempts", 3)?
            .set_default("retry_base_delay", "500ms")?
            .set_default("retry_max_delay", "8s")?
            .set_default("retry_jitter", true)?
            .set_default(
                "default_relays",
                DEFAULT_RELAYS
                    .iter()
                    .map(|r| r.to_string())
                    .collect::<Vec<_>>(),
            )?
            .set_default("secret_env", "NOSTR_NSEC")?;

        if let Some(path) = config_path {
            if path.extension().and_then(|ext| ext.to_str()) == Some("env") {
                // .env files feed the RELAYCAST_ environment source below.
                match dotenvy::from_path(&path) {
                    Ok(_) => tracing::info!("loaded environment from {}", path.display()),
                    Err(err) => {
                        tracing::warn!("failed to load .env from {}: {}", path.display(), err)
                    }
                }
            } else {
                builder = builder.add_source(File::from(path));
            }
        }

        builder = builder.add_source(Environment::with_prefix("RELAYCAST").try_parsing(true));

        builder.build()?.try_deserialize()
    }

    pub fn publish_config(&self) -> PublishConfig {
        PublishConfig {
            per_attempt_timeout: self.per_attempt_timeout,
            connect_timeout: self.connect_timeout,
            overall_timeout: self.overall_timeout,
            min_successes: self.min_successes,
            retry: RetryPolicy {
                max_attempts: self.max_attempts,
                base_delay: self.retry_base_delay,
                max_delay: self.retry_max_delay,
                jitter: self.retry_jitter,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::time::Duration;

    // The process environment is shared by every test thread.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn with_env<F>(vars: &[(&str, &str)], test: F)
    where
        F: FnOnce(),
    {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let mut old = Vec::new();
        for (k, v) in vars {
            old.push((k.to_string(), env::var(k).ok()));
            env::set_var(k, v);
        }

        test();

        for (k, maybe_old) in old {
            match maybe_old {
                Some(val) => env::set_var(k, val),
                None => env::remove_var(k),
            }
        }
    }

    #[test]
    fn defaults_are_applied() {
        with_env(&[], || {
            let cfg = CliConfig::new(None).expect("failed to build config");

            assert_eq!(cfg.per_attempt_timeout, Duration::from_secs(15));
            assert_eq!(cfg.connect_timeout, Duration::from_secs(10));
            assert_eq!(cfg.overall_timeout, None);
            assert_eq!(cfg.min_successes, 1);
            assert_eq!(cfg.max_attempts, 3);
            assert_eq!(cfg.retry_base_delay, Duration::from_millis(500));
            assert_eq!(cfg.retry_max_delay, Duration::from_secs(8));
            assert!(cfg.retry_jitter);
            assert_eq!(cfg.default_relays.len(), DEFAULT_RELAYS.len());
            assert_eq!(cfg.default_relays[0], "wss://relay.damus.io");
            assert_eq!(cfg.secret_env, "NOSTR_NSEC");
            assert_eq!(cfg.publish_config(), PublishConfig::default());
        });
    }

    #[test]
    fn env_vars_override_defaults() {
        with_env(
            &[
                ("RELAYCAST_MIN_SUCCESSES", "2"),
                ("RELAYCAST_MAX_ATTEMPTS", "5"),
                ("RELAYCAST_RETRY_JITTER", "false"),
                ("RELAYCAST_SECRET_ENV", "MY_NSEC"),
            ],
            || {
                let cfg = CliConfig::new(None).expect("failed to build config");
                assert_eq!(cfg.min_successes, 2);
                assert_eq!(cfg.max_attempts, 5);
                assert!(!cfg.retry_jitter);
                assert_eq!(cfg.secret_env, "MY_NSEC");
                assert_eq!(cfg.publish_config().max_attempts_per_endpoint(), 5);
            },
        );
    }

    #[test]
    fn human_readable_durations_are_parsed() {
        with_env(
            &[
                ("RELAYCAST_PER_ATTEMPT_TIMEOUT", "3s"),
                ("RELAYCAST_OVERALL_TIMEOUT", "1m"),
                ("RELAYCAST_RETRY_BASE_DELAY", "250ms"),
            ],
            || {
                let cfg = CliConfig::new(None).expect("failed to build config");
                assert_eq!(cfg.per_attempt_timeout, Duration::from_secs(3));
                assert_eq!(cfg.overall_timeout, Some(Duration::from_secs(60)));
                assert_eq!(cfg.retry_base_delay, Duration::from_millis(250));
            },
        );
    }

    #[test]
    fn list_separator_parses_relays() {
        with_env(
            &[(
                "RELAYCAST_DEFAULT_RELAYS",
                "wss://relay1.example;wss://relay2.example",
            )],
            || {
                let cfg = CliConfig::new(None).expect("failed to build config");
                assert_eq!(
                    cfg.default_relays,
                    vec![
                        "wss://relay1.example".to_string(),
                        "wss://relay2.example".to_string()
                    ]
                );
            },
        );
    }

    #[test]
    fn file_overrides_defaults_and_env_overrides_file() {
        use std::io::Write;

        let mut tmp = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("temp file");
        writeln!(
            tmp,
            r#"
per_attempt_timeout = "20s"
min_successes = 3
default_relays = ["wss://file-relay1","wss://file-relay2"]
"#
        )
        .expect("write to temp file");

        with_env(&[("RELAYCAST_MIN_SUCCESSES", "4")], || {
            let cfg = CliConfig::new(Some(PathBuf::from(tmp.path()))).expect("load config");
            assert_eq!(cfg.per_attempt_timeout, Duration::from_secs(20));
            assert_eq!(cfg.min_successes, 4);
            assert_eq!(
                cfg.default_relays,
                vec!["wss://file-relay1".to_string(), "wss://file-relay2".to_string()]
            );
        });
    }

    #[test]
    fn env_file_is_loaded_into_environment() {
        use std::io::Write;

        let mut tmp = tempfile::Builder::new()
            .suffix(".env")
            .tempfile()
            .expect("temp file");
        writeln!(tmp, "RELAYCAST_CONNECT_TIMEOUT=4s").expect("write to temp file");

        with_env(&[], || {
            let cfg = CliConfig::new(Some(PathBuf::from(tmp.path()))).expect("load config");
            env::remove_var("RELAYCAST_CONNECT_TIMEOUT");
            assert_eq!(cfg.connect_timeout, Duration::from_secs(4));
        });
    }

    #[test]
    fn split_list_is_robust() {
        let cases = vec![
            ("a,b,c", vec!["a", "b", "c"]),
            ("a;b;c", vec!["a", "b", "c"]),
            ("a, b ; c ", vec!["a", "b", "c"]),
            (",a,,b;", vec!["a", "b"]),
            ("  ", Vec::<&str>::new()),
            ("", Vec::<&str>::new()),
        ];

        for (input, expected) in cases {
            let expected: Vec<String> = expected.into_iter().map(|s| s.to_string()).collect();
            assert_eq!(split_list(input), expected, "failed on input: {}", input);
        }
    }
}
