use anyhow::Context;
use log::debug;
use std::io::Write;
use std::time::Duration;

/// Blocking HTTP access used by the catalog and the SVG fetcher.
///
/// Any non-success response is an error; callers decide whether that is
/// fatal (catalog) or skippable (single SVG).
pub trait Transport {
    /// GET `url` and decode the body as JSON. Object key order is preserved.
    fn get_json(&self, url: &str) -> anyhow::Result<serde_json::Value>;

    /// GET `url` and stream the whole body into `out`, returning the byte count.
    fn download(&self, url: &str, out: &mut dyn Write) -> anyhow::Result<u64>;
}

/// Builds the ureq Agent shared by every request of a run.
pub fn get_agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build()
        .into()
}

pub struct HttpTransport {
    agent: ureq::Agent,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Self {
        Self {
            agent: get_agent(timeout),
        }
    }
}

impl Transport for HttpTransport {
    fn get_json(&self, url: &str) -> anyhow::Result<serde_json::Value> {
        debug!("GET {url}");
        let resp = self
            .agent
            .get(url)
            .call()
            .with_context(|| format!("HTTP error for {url}"))?;
        let mut body = resp.into_body();
        body.read_json::<serde_json::Value>()
            .with_context(|| format!("Failed to parse JSON from {url}"))
    }

    fn download(&self, url: &str, out: &mut dyn Write) -> anyhow::Result<u64> {
        debug!("GET {url}");
        let resp = self
            .agent
            .get(url)
            .call()
            .with_context(|| format!("HTTP error for {url}"))?;
        let mut reader = resp.into_body().into_reader();
        let n = std::io::copy(&mut reader, out)
            .with_context(|| format!("Failed to stream body of {url}"))?;
        out.flush()?;
        Ok(n)
    }
}
