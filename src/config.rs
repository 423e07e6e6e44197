use std::{collections::BTreeMap, fmt, time::Duration};

use serde::Serialize;
use tracing::{level_filters::LevelFilter, warn};

use crate::error::PublishError;

pub const HOST: &str = "host";
pub const PORT: &str = "port";
pub const USE_DYNAMIC_NAMESPACE: &str = "useDynamicNamespace";
pub const DEBUG: &str = "debug";
pub const LOG_LEVEL: &str = "logLevel";
pub const TIMEOUT_SECS: &str = "timeoutSecs";

pub const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::WARN;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub type ConfigMap = BTreeMap<String, ConfigValue>;

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Str(String),
    Int(i64),
    Bool(bool),
    Float(f64),
}
impl ConfigValue {
    pub fn kind(&self) -> ConfigKind {
        match self {
            Self::Str(_) => ConfigKind::String,
            Self::Int(_) => ConfigKind::Integer,
            Self::Bool(_) => ConfigKind::Boolean,
            Self::Float(_) => ConfigKind::Float,
        }
    }
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(v) => Some(v),
            Self::Int(_) | Self::Bool(_) | Self::Float(_) => None,
        }
    }
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Str(_) | Self::Bool(_) | Self::Float(_) => None,
        }
    }
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            Self::Str(_) | Self::Int(_) | Self::Float(_) => None,
        }
    }
}
impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}
impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}
impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}
impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}
impl From<f64> for ConfigValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigKind {
    String,
    Integer,
    Boolean,
    Float,
}
impl fmt::Display for ConfigKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Float => "float",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigRule {
    pub key: &'static str,
    pub kind: ConfigKind,
    pub required: bool,
    pub description: &'static str,
}

/// What the host framework has to collect before calling `publish`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigPolicy {
    rules: Vec<ConfigRule>,
}
impl ConfigPolicy {
    pub fn rule(&self, key: &str) -> Option<&ConfigRule> {
        self.rules.iter().find(|rule| rule.key == key)
    }
}

pub fn config_policy() -> ConfigPolicy {
    let rule = |key, kind, required, description| ConfigRule {
        key,
        kind,
        required,
        description,
    };
    ConfigPolicy {
        rules: vec![
            rule(HOST, ConfigKind::String, true, "KairosDB host"),
            rule(PORT, ConfigKind::Integer, true, "KairosDB port"),
            rule(
                USE_DYNAMIC_NAMESPACE,
                ConfigKind::Boolean,
                true,
                "Move dynamic namespace elements into tags",
            ),
            rule(DEBUG, ConfigKind::Boolean, false, "Log at debug level"),
            rule(
                LOG_LEVEL,
                ConfigKind::String,
                false,
                "Log level: warn, error, debug or info",
            ),
            rule(
                TIMEOUT_SECS,
                ConfigKind::Integer,
                false,
                "Request timeout in seconds",
            ),
        ],
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfigViolation {
    pub key: &'static str,
    pub problem: ConfigProblem,
}
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigProblem {
    Missing,
    WrongKind {
        expected: ConfigKind,
        found: ConfigKind,
    },
    OutOfRange(i64),
    Empty,
}
impl fmt::Display for ConfigViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.problem {
            ConfigProblem::Missing => write!(f, "{} is missing", self.key),
            ConfigProblem::WrongKind { expected, found } => {
                write!(f, "{} must be {expected}, got {found}", self.key)
            }
            ConfigProblem::OutOfRange(v) => write!(f, "{} is out of range: {v}", self.key),
            ConfigProblem::Empty => write!(f, "{} is empty", self.key),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PublisherConfig {
    pub host: String,
    pub port: u16,
    pub use_dynamic_namespace: bool,
    pub timeout: Duration,
}
impl PublisherConfig {
    /// Every required-key problem is reported at once. Bad optional keys only warn.
    pub fn from_map(map: &ConfigMap) -> Result<Self, PublishError> {
        let mut violations = vec![];
        let host = required(map, HOST, ConfigKind::String, ConfigValue::as_str, &mut violations)
            .and_then(|host| {
                if host.trim().is_empty() {
                    violations.push(ConfigViolation {
                        key: HOST,
                        problem: ConfigProblem::Empty,
                    });
                    return None;
                }
                Some(host)
            });
        let port = required(map, PORT, ConfigKind::Integer, ConfigValue::as_int, &mut violations)
            .and_then(|port| match u16::try_from(port) {
                Ok(port) if port != 0 => Some(port),
                _ => {
                    violations.push(ConfigViolation {
                        key: PORT,
                        problem: ConfigProblem::OutOfRange(port),
                    });
                    None
                }
            });
        let use_dynamic_namespace = required(
            map,
            USE_DYNAMIC_NAMESPACE,
            ConfigKind::Boolean,
            ConfigValue::as_bool,
            &mut violations,
        );
        let (Some(host), Some(port), Some(use_dynamic_namespace)) =
            (host, port, use_dynamic_namespace)
        else {
            return Err(PublishError::ConfigInvalid { violations });
        };
        Ok(Self {
            host: host.to_owned(),
            port,
            use_dynamic_namespace,
            timeout: timeout(map),
        })
    }
}

fn required<'a, T>(
    map: &'a ConfigMap,
    key: &'static str,
    expected: ConfigKind,
    extract: impl Fn(&'a ConfigValue) -> Option<T>,
    violations: &mut Vec<ConfigViolation>,
) -> Option<T> {
    let Some(value) = map.get(key) else {
        violations.push(ConfigViolation {
            key,
            problem: ConfigProblem::Missing,
        });
        return None;
    };
    let extracted = extract(value);
    if extracted.is_none() {
        violations.push(ConfigViolation {
            key,
            problem: ConfigProblem::WrongKind {
                expected,
                found: value.kind(),
            },
        });
    }
    extracted
}

fn timeout(map: &ConfigMap) -> Duration {
    let Some(value) = map.get(TIMEOUT_SECS) else {
        return DEFAULT_TIMEOUT;
    };
    match value.as_int().map(u64::try_from) {
        Some(Ok(secs)) if secs > 0 => Duration::from_secs(secs),
        _ => {
            warn!(field = TIMEOUT_SECS, value = ?value, default = ?DEFAULT_TIMEOUT, "invalid config value");
            DEFAULT_TIMEOUT
        }
    }
}

/// Logger verbosity resolved from `debug` and `logLevel`.
///
/// Resolved before any logger exists, so problems are collected and emitted by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct LogSettings {
    pub level: LevelFilter,
    pub warnings: Vec<String>,
}
impl LogSettings {
    pub fn from_map(map: &ConfigMap) -> Self {
        let mut warnings = vec![];
        if let Some(value) = map.get(DEBUG) {
            match value {
                ConfigValue::Bool(true) => {
                    return Self {
                        level: LevelFilter::DEBUG,
                        warnings,
                    }
                }
                ConfigValue::Bool(false) => (),
                ConfigValue::Str(_) | ConfigValue::Int(_) | ConfigValue::Float(_) => {
                    warnings.push(format!(
                        "invalid config type: {DEBUG} must be {}, got {}",
                        ConfigKind::Boolean,
                        value.kind()
                    ));
                }
            }
        }
        let mut level = DEFAULT_LOG_LEVEL;
        if let Some(value) = map.get(LOG_LEVEL) {
            match value {
                ConfigValue::Str(s) => match parse_level(s) {
                    Some(parsed) => level = parsed,
                    None => warnings.push(format!(
                        "invalid config value: {LOG_LEVEL} '{}', acceptable values: warn, error, debug, info",
                        s.to_lowercase()
                    )),
                },
                ConfigValue::Int(_) | ConfigValue::Bool(_) | ConfigValue::Float(_) => {
                    warnings.push(format!(
                        "invalid config type: {LOG_LEVEL} must be {}, got {}",
                        ConfigKind::String,
                        value.kind()
                    ));
                }
            }
        }
        Self { level, warnings }
    }
}

fn parse_level(s: &str) -> Option<LevelFilter> {
    let level = match s.to_lowercase().as_str() {
        "warn" => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        "debug" => LevelFilter::DEBUG,
        "info" => LevelFilter::INFO,
        _ => return None,
    };
    Some(level)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> ConfigMap {
        ConfigMap::from([
            (HOST.to_owned(), ConfigValue::from("10.0.0.1")),
            (PORT.to_owned(), ConfigValue::from(8080i64)),
            (USE_DYNAMIC_NAMESPACE.to_owned(), ConfigValue::from(true)),
        ])
    }

    fn violations(map: &ConfigMap) -> Vec<ConfigViolation> {
        match PublisherConfig::from_map(map) {
            Err(PublishError::ConfigInvalid { violations }) => violations,
            other => panic!("expected ConfigInvalid, got {other:?}"),
        }
    }

    #[test]
    fn test_valid() {
        let config = PublisherConfig::from_map(&valid()).unwrap();
        assert_eq!(
            config,
            PublisherConfig {
                host: "10.0.0.1".into(),
                port: 8080,
                use_dynamic_namespace: true,
                timeout: DEFAULT_TIMEOUT,
            }
        );
    }

    #[test]
    fn test_missing_port() {
        let mut map = valid();
        map.remove(PORT);
        assert_eq!(
            violations(&map),
            vec![ConfigViolation {
                key: PORT,
                problem: ConfigProblem::Missing
            }]
        );
    }

    #[test]
    fn test_all_violations_reported() {
        let map = ConfigMap::from([
            (HOST.to_owned(), ConfigValue::from(1i64)),
            (PORT.to_owned(), ConfigValue::from("8080")),
        ]);
        let violations = violations(&map);
        let keys: Vec<_> = violations.iter().map(|v| v.key).collect();
        assert_eq!(keys, [HOST, PORT, USE_DYNAMIC_NAMESPACE]);
        assert_eq!(
            violations[0].problem,
            ConfigProblem::WrongKind {
                expected: ConfigKind::String,
                found: ConfigKind::Integer
            }
        );
        assert_eq!(violations[1].to_string(), "port must be integer, got string");
    }

    #[test]
    fn test_port_range() {
        for port in [0i64, -1, 65_536] {
            let mut map = valid();
            map.insert(PORT.to_owned(), ConfigValue::from(port));
            assert_eq!(violations(&map)[0].problem, ConfigProblem::OutOfRange(port));
        }
    }

    #[test]
    fn test_empty_host() {
        for host in ["", "  "] {
            let mut map = valid();
            map.insert(HOST.to_owned(), ConfigValue::from(host));
            assert_eq!(
                violations(&map),
                vec![ConfigViolation {
                    key: HOST,
                    problem: ConfigProblem::Empty
                }]
            );
        }
    }

    #[test]
    fn test_timeout() {
        let mut map = valid();
        map.insert(TIMEOUT_SECS.to_owned(), ConfigValue::from(3i64));
        assert_eq!(
            PublisherConfig::from_map(&map).unwrap().timeout,
            Duration::from_secs(3)
        );
        map.insert(TIMEOUT_SECS.to_owned(), ConfigValue::from("3"));
        assert_eq!(PublisherConfig::from_map(&map).unwrap().timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_log_settings() {
        let settings = LogSettings::from_map(&valid());
        assert_eq!(settings.level, DEFAULT_LOG_LEVEL);
        assert!(settings.warnings.is_empty());

        let mut map = valid();
        map.insert(LOG_LEVEL.to_owned(), ConfigValue::from("INFO"));
        assert_eq!(LogSettings::from_map(&map).level, LevelFilter::INFO);

        map.insert(DEBUG.to_owned(), ConfigValue::from(true));
        assert_eq!(LogSettings::from_map(&map).level, LevelFilter::DEBUG);
    }

    #[test]
    fn test_bad_log_settings_only_warn() {
        let mut map = valid();
        map.insert(LOG_LEVEL.to_owned(), ConfigValue::from("verbose"));
        map.insert(DEBUG.to_owned(), ConfigValue::from("yes"));
        let settings = LogSettings::from_map(&map);
        assert_eq!(settings.level, DEFAULT_LOG_LEVEL);
        assert_eq!(settings.warnings.len(), 2);
        assert!(PublisherConfig::from_map(&map).is_ok());
    }

    #[test]
    fn test_policy_kinds_match_validation() {
        let policy = config_policy();
        for key in [HOST, PORT, USE_DYNAMIC_NAMESPACE] {
            let rule = policy.rule(key).unwrap();
            assert!(rule.required);
            assert_eq!(Some(rule.kind), valid().get(key).map(ConfigValue::kind));
        }
        for key in [DEBUG, LOG_LEVEL, TIMEOUT_SECS] {
            assert!(!policy.rule(key).unwrap().required);
        }
    }
}
