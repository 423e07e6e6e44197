use std::time::Duration;

use tracing::debug;

use crate::{
    config::PublisherConfig,
    error::PublishError,
    point::{serialize_points, DataPoint},
};

pub const PUBLISH_PATH: &str = "/api/v1/datapoints";
/// KairosDB answers a stored batch with 204 No Content
pub const STATUS_STORED: u16 = 204;

pub fn publish_url(host: &str, port: u16) -> String {
    format!("http://{host}:{port}{PUBLISH_PATH}")
}

#[derive(Debug)]
pub struct HttpExporter {
    client: ureq::Agent,
    url: String,
    buf: Vec<u8>,
}
impl HttpExporter {
    pub fn new(url: String, timeout: Duration) -> Self {
        let buf = vec![];
        // a 3xx is the destination's answer, not a hop to follow
        let client = ureq::AgentBuilder::new()
            .timeout(timeout)
            .redirects(0)
            .build();
        Self { client, url, buf }
    }
    pub fn from_config(config: &PublisherConfig) -> Self {
        Self::new(publish_url(&config.host, config.port), config.timeout)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Blocking I/O. Sends exactly one request and never retries.
    pub fn export(&mut self, points: &[DataPoint]) -> Result<(), PublishError> {
        serialize_points(&mut self.buf, points)?;
        debug!(url = %self.url, points = points.len(), bytes = self.buf.len(), "sending points");
        let resp = self
            .client
            .post(&self.url)
            .set("Content-Type", "application/json")
            .send_bytes(&self.buf);
        let status = match resp {
            Ok(resp) => resp.status(),
            Err(ureq::Error::Status(status, _)) => status,
            Err(ureq::Error::Transport(e)) => return Err(PublishError::Delivery(Box::new(e))),
        };
        if status != STATUS_STORED {
            return Err(PublishError::DestinationRejected { status });
        }
        Ok(())
    }
}
