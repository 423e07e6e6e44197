use tracing::{level_filters::LevelFilter, Dispatch};
use tracing_subscriber::fmt::MakeWriter;

use crate::publisher::{PluginType, NAME, VERSION};

/// Logger owned by a single publish call.
///
/// The level lives in this instance rather than in a process-wide subscriber, so concurrent
/// calls configured with different levels do not affect each other.
#[derive(Debug, Clone)]
pub struct PublishLogger {
    dispatch: Dispatch,
}
impl PublishLogger {
    pub fn new(level: LevelFilter) -> Self {
        Self::with_writer(level, std::io::stderr)
    }
    pub fn with_writer<W>(level: LevelFilter, writer: W) -> Self
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(writer)
            .with_ansi(false)
            .finish();
        let dispatch = Dispatch::new(subscriber);
        Self { dispatch }
    }

    /// Runs `f` with this logger as the current thread's default.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, || {
            // error level so the plugin fields survive any max level
            let span = tracing::error_span!(
                "publish",
                plugin_name = NAME,
                plugin_version = VERSION,
                plugin_type = %PluginType::Publisher,
            );
            span.in_scope(f)
        })
    }
}


#[cfg(test)]
mod tests {
    use tracing::{debug, error, warn};

    use super::{capture::logger, *};

    #[test]
    fn test_level_is_per_instance() {
        let (quiet, quiet_out) = logger(LevelFilter::ERROR);
        let (loud, loud_out) = logger(LevelFilter::DEBUG);
        for logger in [&quiet, &loud] {
            logger.in_scope(|| {
                debug!("decoded metrics");
                warn!("invalid config value");
                error!("request error");
            });
        }
        let quiet_out = quiet_out.text();
        assert!(!quiet_out.contains("decoded metrics"));
        assert!(!quiet_out.contains("invalid config value"));
        assert!(quiet_out.contains("request error"));
        let loud_out = loud_out.text();
        assert!(loud_out.contains("decoded metrics"));
        assert!(loud_out.contains("invalid config value"));
        assert!(loud_out.contains("request error"));
    }

    #[test]
    fn test_plugin_fields() {
        let (logger, out) = logger(LevelFilter::WARN);
        logger.in_scope(|| warn!("something"));
        let out = out.text();
        assert!(out.contains("plugin_name=\"kairos\"") || out.contains("plugin_name=kairos"));
        assert!(out.contains("plugin_type=publisher"));
    }
}
