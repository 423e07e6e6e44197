use tracing::{debug, warn};

use crate::{
    point::DataPoint,
    record::{MetricRecord, Tags},
};

/// Tag the host framework sets to the name of the machine a collector ran on
pub const RUNNING_ON_TAG: &str = "plugin_running_on";
pub const HOSTNAME_TAG: &str = "hostname";
pub const HOST_TAG: &str = "host";
pub const FALLBACK_HOSTNAME: &str = "localhost";

const NANOS_PER_MILLI: u64 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespaceMode {
    /// The whole namespace becomes the point name
    Flat,
    /// Dynamic segments are moved out of the name into tags
    Dynamic,
}
impl NamespaceMode {
    pub fn new(use_dynamic_namespace: bool) -> Self {
        if use_dynamic_namespace {
            Self::Dynamic
        } else {
            Self::Flat
        }
    }
}

#[derive(Debug, Clone)]
pub struct Translator {
    mode: NamespaceMode,
    local_hostname: String,
}
impl Translator {
    pub fn new(mode: NamespaceMode) -> Self {
        let local_hostname = match mode {
            NamespaceMode::Flat => local_hostname(),
            NamespaceMode::Dynamic => String::new(),
        };
        Self::with_hostname(mode, local_hostname)
    }
    pub fn with_hostname(mode: NamespaceMode, local_hostname: String) -> Self {
        Self {
            mode,
            local_hostname,
        }
    }

    pub fn translate_all(&self, records: &[MetricRecord]) -> Vec<DataPoint> {
        records.iter().map(|record| self.translate(record)).collect()
    }

    pub fn translate(&self, record: &MetricRecord) -> DataPoint {
        let (name, tags) = match self.mode {
            NamespaceMode::Flat => (record.namespace.path(), self.flat_tags(record)),
            NamespaceMode::Dynamic => (record.namespace.literal_path(), dynamic_tags(record)),
        };
        DataPoint {
            name,
            value: record.value.clone(),
            timestamp: record.timestamp / NANOS_PER_MILLI,
            tags,
        }
    }

    fn flat_tags(&self, record: &MetricRecord) -> Tags {
        let mut tags = Tags::new();
        // KairosDB refuses points without at least one tag
        let hostname = record
            .tags
            .get(RUNNING_ON_TAG)
            .cloned()
            .unwrap_or_else(|| self.local_hostname.clone());
        tags.insert(HOSTNAME_TAG.to_owned(), hostname);
        tags.extend(record.tags.iter().map(|(k, v)| (k.clone(), v.clone())));
        tags
    }
}

fn dynamic_tags(record: &MetricRecord) -> Tags {
    let mut tags = Tags::new();
    for (_, name, value) in record.namespace.dynamic_segments() {
        tags.insert(name.to_owned(), value.to_owned());
    }
    for (key, value) in &record.tags {
        if let Some(previous) = tags.insert(key.clone(), value.clone()) {
            if previous != *value {
                warn!(
                    tag = %key,
                    namespace_value = %previous,
                    tag_value = %value,
                    "record tag overrides dynamic namespace segment"
                );
            }
        }
    }
    let host = record.tags.get(RUNNING_ON_TAG).cloned().unwrap_or_default();
    if let Some(previous) = tags.insert(HOST_TAG.to_owned(), host.clone()) {
        if previous != host {
            warn!(
                tag = HOST_TAG,
                previous_value = %previous,
                host_value = %host,
                "host tag overrides record tag"
            );
        }
    }
    tags
}

fn local_hostname() -> String {
    match hostname::get() {
        Ok(name) => name.into_string().unwrap_or_else(|name| {
            debug!(?name, "hostname is not valid unicode");
            FALLBACK_HOSTNAME.to_owned()
        }),
        Err(e) => {
            debug!(error = %e, "failed to look up hostname");
            FALLBACK_HOSTNAME.to_owned()
        }
    }
}
