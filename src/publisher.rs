use std::fmt;

use serde::Serialize;
use tracing::{debug, error, warn};

use crate::{
    codec,
    config::{self, ConfigMap, ConfigPolicy, LogSettings, PublisherConfig},
    error::PublishError,
    exporter::HttpExporter,
    logging::PublishLogger,
    translate::{NamespaceMode, Translator},
    BINARY_CONTENT_TYPE,
};

pub const NAME: &str = "kairos";
pub const VERSION: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginType {
    Collector,
    Processor,
    Publisher,
}
impl fmt::Display for PluginType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Collector => "collector",
            Self::Processor => "processor",
            Self::Publisher => "publisher",
        };
        f.write_str(s)
    }
}

/// Registration descriptor handed to the host framework.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginMeta {
    pub name: &'static str,
    pub version: u32,
    pub plugin_type: PluginType,
    pub accepted_content_types: Vec<&'static str>,
    pub returned_content_types: Vec<&'static str>,
}

pub fn meta() -> PluginMeta {
    PluginMeta {
        name: NAME,
        version: VERSION,
        plugin_type: PluginType::Publisher,
        accepted_content_types: vec![BINARY_CONTENT_TYPE],
        returned_content_types: vec![BINARY_CONTENT_TYPE],
    }
}

/// Stateless; every call validates, decodes, translates and sends on its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct Publisher;
impl Publisher {
    pub fn new() -> Self {
        Self
    }

    pub fn config_policy(&self) -> ConfigPolicy {
        config::config_policy()
    }

    /// Blocking I/O
    pub fn publish(
        &self,
        content_type: &str,
        content: &[u8],
        config: &ConfigMap,
    ) -> Result<(), PublishError> {
        let log_settings = LogSettings::from_map(config);
        let logger = PublishLogger::new(log_settings.level);
        logger.in_scope(|| {
            for warning in &log_settings.warnings {
                warn!("{warning}");
            }
            let res = publish_batch(content_type, content, config);
            if let Err(e) = &res {
                error!(error = %e, "publish failed");
            }
            res
        })
    }
}

fn publish_batch(
    content_type: &str,
    content: &[u8],
    config: &ConfigMap,
) -> Result<(), PublishError> {
    let config = PublisherConfig::from_map(config)?;
    let records = codec::decode(content_type, content)?;
    debug!(count = records.len(), "decoded metrics");

    let translator = Translator::new(NamespaceMode::new(config.use_dynamic_namespace));
    let points = translator.translate_all(&records);

    let mut exporter = HttpExporter::from_config(&config);
    exporter.export(&points)?;
    debug!(count = points.len(), url = exporter.url(), "published points");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigValue, HOST, PORT, USE_DYNAMIC_NAMESPACE};

    #[test]
    fn test_meta() {
        let meta = meta();
        assert_eq!(meta.name, "kairos");
        assert_eq!(meta.version, 2);
        assert_eq!(meta.plugin_type, PluginType::Publisher);
        assert_eq!(meta.accepted_content_types, [BINARY_CONTENT_TYPE]);
        assert_eq!(meta.returned_content_types, [BINARY_CONTENT_TYPE]);
    }

    #[test]
    fn test_policy_serializes() {
        let policy = serde_json::to_value(Publisher::new().config_policy()).unwrap();
        let rules = policy["rules"].as_array().unwrap();
        assert_eq!(rules[0]["key"], "host");
        assert_eq!(rules[0]["kind"], "string");
        assert_eq!(rules[0]["required"], true);
    }

    #[test]
    fn test_config_checked_before_decoding() {
        let config = ConfigMap::from([
            (HOST.to_owned(), ConfigValue::from("localhost")),
            (USE_DYNAMIC_NAMESPACE.to_owned(), ConfigValue::from(false)),
        ]);
        let err = Publisher::new()
            .publish("snap.gob", b"garbage", &config)
            .unwrap_err();
        let PublishError::ConfigInvalid { violations } = &err else {
            panic!("expected ConfigInvalid, got {err:?}");
        };
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].key, PORT);
    }
}
