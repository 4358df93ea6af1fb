use crate::core::network::Transport;
use anyhow::Context;
use log::{debug, info, warn};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

pub const ID_PLACEHOLDER: &str = "{id}";

#[derive(Debug, Default, PartialEq, Eq)]
pub struct FetchReport {
    pub fetched: usize,
    pub failed_urls: Vec<String>,
}

pub fn svg_url(template: &str, id: &str) -> String {
    template.replace(ID_PLACEHOLDER, id)
}

pub fn svg_path(dir: &Path, id: &str) -> PathBuf {
    dir.join(format!("{id}.svg"))
}

fn download_one<T: Transport>(transport: &T, url: &str, dest: &Path) -> anyhow::Result<u64> {
    let mut part = dest.as_os_str().to_owned();
    part.push(".part");
    let part = PathBuf::from(part);

    let result = (|| -> anyhow::Result<u64> {
        let file = File::create(&part)
            .with_context(|| format!("Failed to create '{}'", part.display()))?;
        let mut out = BufWriter::new(file);
        let n = transport.download(url, &mut out)?;
        out.into_inner()
            .map_err(|e| e.into_error())
            .with_context(|| format!("Failed to flush '{}'", part.display()))?;
        fs::rename(&part, dest)
            .with_context(|| format!("Failed to move into '{}'", dest.display()))?;
        Ok(n)
    })();

    if result.is_err() && part.exists() {
        let _ = fs::remove_file(&part);
    }
    result
}

/// Downloads `<id>.svg` for every identifier into `dir`. A failed item is
/// logged and skipped; only failing to create `dir` aborts.
pub fn download_svgs<'a, T, I>(
    transport: &T,
    ids: I,
    dir: &Path,
    url_template: &str,
) -> anyhow::Result<FetchReport>
where
    T: Transport,
    I: IntoIterator<Item = &'a str>,
{
    fs::create_dir_all(dir).with_context(|| format!("Failed to create '{}'", dir.display()))?;

    let mut report = FetchReport::default();
    for id in ids {
        let url = svg_url(url_template, id);
        match download_one(transport, &url, &svg_path(dir, id)) {
            Ok(bytes) => {
                debug!("Fetched {url} ({bytes} bytes)");
                report.fetched += 1;
            }
            Err(e) => {
                warn!("{url}: {e:#}");
                report.failed_urls.push(url);
            }
        }
    }

    info!(
        "Downloaded {} SVGs into '{}', {} failed.",
        report.fetched,
        dir.display(),
        report.failed_urls.len()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::{FetchReport, download_svgs, svg_url};
    use crate::core::network::Transport;
    use anyhow::bail;
    use std::cell::{Cell, RefCell};
    use std::fs;
    use std::io::Write;

    /// Serves `<svg>{url}</svg>` and fails every `fail_every`th request.
    struct FlakyTransport {
        fail_every: usize,
        calls: Cell<usize>,
        seen: RefCell<Vec<String>>,
    }

    impl FlakyTransport {
        fn new(fail_every: usize) -> Self {
            Self {
                fail_every,
                calls: Cell::new(0),
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl Transport for FlakyTransport {
        fn get_json(&self, _url: &str) -> anyhow::Result<serde_json::Value> {
            bail!("not used")
        }

        fn download(&self, url: &str, out: &mut dyn Write) -> anyhow::Result<u64> {
            let n = self.calls.get() + 1;
            self.calls.set(n);
            self.seen.borrow_mut().push(url.to_string());
            if n % self.fail_every == 0 {
                // Half a body, then the connection drops.
                out.write_all(b"<svg")?;
                bail!("connection reset");
            }
            let body = format!("<svg>{url}</svg>");
            out.write_all(body.as_bytes())?;
            Ok(body.len() as u64)
        }
    }

    #[test]
    fn url_template_substitutes_identifier() {
        assert_eq!(
            svg_url("https://cdn/svg/{id}.svg", "1f3f3-fe0f-200d-1f308"),
            "https://cdn/svg/1f3f3-fe0f-200d-1f308.svg"
        );
    }

    #[test]
    fn failures_do_not_stop_later_downloads() {
        let dir = tempfile::tempdir().unwrap();
        let svg_dir = dir.path().join("svg");
        let transport = FlakyTransport::new(3);
        let ids = ["a", "b", "c", "d", "e", "f", "g"];

        let report = download_svgs(&transport, ids, &svg_dir, "https://cdn/{id}.svg").unwrap();

        assert_eq!(transport.seen.borrow().len(), ids.len());
        assert_eq!(
            report,
            FetchReport {
                fetched: 5,
                failed_urls: vec![
                    "https://cdn/c.svg".to_string(),
                    "https://cdn/f.svg".to_string()
                ],
            }
        );
        for id in ["a", "b", "d", "e", "g"] {
            let body = fs::read_to_string(svg_dir.join(format!("{id}.svg"))).unwrap();
            assert_eq!(body, format!("<svg>https://cdn/{id}.svg</svg>"));
        }
        // Failed items leave neither a truncated SVG nor a partial file behind.
        let mut left: Vec<_> = fs::read_dir(&svg_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        left.sort();
        assert_eq!(left, vec!["a.svg", "b.svg", "d.svg", "e.svg", "g.svg"]);
    }

    #[test]
    fn rerun_overwrites_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.svg"), "stale").unwrap();
        let transport = FlakyTransport::new(usize::MAX);
        download_svgs(&transport, ["a"], dir.path(), "u/{id}").unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("a.svg")).unwrap(),
            "<svg>u/a</svg>"
        );
    }
}
