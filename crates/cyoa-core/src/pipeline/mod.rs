//! Image pipeline: inline or download every image a project references.
//!
//! `transform` runs up to two passes over the same source text. Each pass
//! scans for `"image":"<value>"` occurrences, fetches what needs fetching
//! through the worker pool, then rewrites values in occurrence order:
//!
//! - embed: the value becomes `data:<mime>;base64,<data>`
//! - download: the bytes land in `<output>/images/<name>` and the value
//!   becomes `images/<name>`
//!
//! The passes never see each other's output and fetch independently. An
//! image that cannot be fetched keeps its original value.

mod download;
mod fetch;
mod pool;
mod scan;

pub use download::{write_image, FilenameTable, TEMP_SUFFIX};
pub use fetch::{fetch_image, FetchOutcome, ResolvedImage};
pub use scan::{rewrite, scan, ImageOccurrence};

use std::fs;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tracing::{error, info};

use crate::control::AbortToken;
use crate::error::CyoaError;
use crate::http::{Fetcher, HeaderPolicy};
use crate::mime;
use crate::retry::RetryPolicy;
use crate::url_model;

/// Subdirectory of the output directory that receives downloaded images.
pub const IMAGES_DIR: &str = "images";

/// Which outputs to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Mode {
    pub embed: bool,
    pub download: bool,
}

impl Mode {
    pub const EMBED: Mode = Mode {
        embed: true,
        download: false,
    };
    pub const DOWNLOAD: Mode = Mode {
        embed: false,
        download: true,
    };
    pub const BOTH: Mode = Mode {
        embed: true,
        download: true,
    };
}

/// Everything a pipeline run needs besides the text itself.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub retry: RetryPolicy,
    pub headers: HeaderPolicy,
    /// Concurrent image fetches; 1 is fully sequential.
    pub workers: usize,
    pub abort: AbortToken,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            headers: HeaderPolicy::default(),
            workers: 1,
            abort: AbortToken::new(),
        }
    }
}

/// Counters for one image pass, or summed over the passes of a `transform`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipelineReport {
    pub embedded: usize,
    pub downloaded: usize,
    /// Occurrences already inline, left untouched.
    pub skipped: usize,
    /// Occurrences left unchanged because their image could not be fetched.
    pub failed: usize,
}

impl PipelineReport {
    fn add(&mut self, other: &PipelineReport) {
        self.embedded += other.embedded;
        self.downloaded += other.downloaded;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

/// Output of `transform`: one text and one report per requested mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transformed {
    pub embedded: Option<String>,
    pub downloaded: Option<String>,
    pub embed_report: Option<PipelineReport>,
    pub download_report: Option<PipelineReport>,
    /// Sum of the per-pass reports.
    pub report: PipelineReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    Embed,
    Download,
}

impl Pass {
    fn name(self) -> &'static str {
        match self {
            Pass::Embed => "embed",
            Pass::Download => "download",
        }
    }
}

/// Rewrites image references of a project against one fetcher.
pub struct ImagePipeline<'a> {
    fetcher: &'a dyn Fetcher,
    config: PipelineConfig,
}

impl<'a> ImagePipeline<'a> {
    pub fn new(fetcher: &'a dyn Fetcher, config: PipelineConfig) -> Self {
        Self { fetcher, config }
    }

    /// Produce the texts `mode` asks for.
    ///
    /// `output_dir` is required for downloads; without it this fails with
    /// `CyoaError::Config` before any request is made.
    pub fn transform(
        &self,
        text: &str,
        base_url: &str,
        mode: Mode,
        output_dir: Option<&Path>,
    ) -> Result<Transformed, CyoaError> {
        let images_dir = match (mode.download, output_dir) {
            (true, None) => {
                return Err(CyoaError::Config(
                    "an output directory is required to download images".to_string(),
                ))
            }
            (true, Some(dir)) => {
                let images = dir.join(IMAGES_DIR);
                fs::create_dir_all(&images)?;
                Some(images)
            }
            (false, _) => None,
        };

        let embed = if mode.embed {
            Some(self.run_pass(text, base_url, Pass::Embed, None)?)
        } else {
            None
        };
        let download = match images_dir {
            Some(dir) => Some(self.run_pass(text, base_url, Pass::Download, Some(dir.as_path()))?),
            None => None,
        };

        let mut report = PipelineReport::default();
        for (_, r) in embed.iter().chain(download.iter()) {
            report.add(r);
        }
        let (embedded, embed_report) = embed.unzip();
        let (downloaded, download_report) = download.unzip();
        Ok(Transformed {
            embedded,
            downloaded,
            embed_report,
            download_report,
            report,
        })
    }

    fn run_pass(
        &self,
        text: &str,
        base_url: &str,
        pass: Pass,
        images_dir: Option<&Path>,
    ) -> Result<(String, PipelineReport), CyoaError> {
        let mut report = PipelineReport::default();
        let occurrences = scan(text);
        let mut replacements: Vec<Option<String>> = vec![None; occurrences.len()];
        let mut jobs: Vec<(usize, String)> = Vec::new();

        for (i, occ) in occurrences.iter().enumerate() {
            if mime::is_data_uri(&occ.value) {
                info!("skipping already embedded image");
                report.skipped += 1;
                continue;
            }
            match url_model::resolve_image_url(base_url, &occ.value) {
                Ok(url) => jobs.push((i, url)),
                Err(e) => {
                    error!("failed to process image {}: {}", occ.value, e);
                    report.failed += 1;
                }
            }
        }
        info!(
            pass = pass.name(),
            occurrences = occurrences.len(),
            to_fetch = jobs.len(),
            "processing images"
        );

        let mut table = images_dir.map(FilenameTable::new);
        let abort = &self.config.abort;
        pool::run_ordered(
            jobs,
            self.config.workers,
            abort,
            |(i, url): (usize, String)| {
                info!("processing image: {}", url);
                let fetched =
                    fetch_image(self.fetcher, &self.config.headers, &self.config.retry, abort, &url);
                (i, fetched)
            },
            |_, (i, fetched): (usize, Result<ResolvedImage, CyoaError>)| {
                let image = fetched?;
                if !image.is_success() {
                    error!("failed to process image: {}", occurrences[i].value);
                    report.failed += 1;
                    return Ok(());
                }
                replacements[i] = Some(match (&mut table, images_dir) {
                    (Some(table), Some(dir)) => {
                        abort.check()?;
                        let wanted = url_model::image_filename(&image.source_url, &image.mime_type);
                        let name = table.claim(&wanted);
                        let path = write_image(dir, &name, &image.bytes)?;
                        info!("saved image: {}", path.display());
                        report.downloaded += 1;
                        format!("{IMAGES_DIR}/{name}")
                    }
                    _ => {
                        report.embedded += 1;
                        format!("data:{};base64,{}", image.mime_type, STANDARD.encode(&image.bytes))
                    }
                });
                Ok(())
            },
        )?;

        info!(
            pass = pass.name(),
            embedded = report.embedded,
            downloaded = report.downloaded,
            skipped = report.skipped,
            failed = report.failed,
            "image pass finished"
        );
        Ok((rewrite(text, &occurrences, &replacements), report))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::http::mock::MockFetcher;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\nfakepng";

    fn config(workers: usize) -> PipelineConfig {
        PipelineConfig {
            retry: RetryPolicy {
                max_attempts: 3,
                rate_limit_wait: Duration::ZERO,
                transient_wait: Duration::ZERO,
            },
            workers,
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn embed_and_download_scenario() {
        let f = MockFetcher::new();
        f.bytes("https://site.example/proj/pic.png", Some("image/png"), PNG);
        let out = tempfile::tempdir().unwrap();
        let t = ImagePipeline::new(&f, config(1))
            .transform(
                r#"{"image":"pic.png"}"#,
                "https://site.example/proj/",
                Mode::BOTH,
                Some(out.path()),
            )
            .unwrap();
        assert_eq!(
            t.embedded.unwrap(),
            format!(r#"{{"image":"data:image/png;base64,{}"}}"#, STANDARD.encode(PNG))
        );
        assert_eq!(t.downloaded.unwrap(), r#"{"image":"images/pic.png"}"#);
        assert_eq!(fs::read(out.path().join("images/pic.png")).unwrap(), PNG);
        assert_eq!(t.report.embedded, 1);
        assert_eq!(t.report.downloaded, 1);
        // each pass fetches on its own
        assert_eq!(f.get_count("https://site.example/proj/pic.png"), 2);
    }

    #[test]
    fn data_uri_passes_through_untouched() {
        let f = MockFetcher::new();
        let text = r#"{"image":"data:image/gif;base64,R0lGOD=="}"#;
        let t = ImagePipeline::new(&f, config(1))
            .transform(text, "https://site.example/", Mode::EMBED, None)
            .unwrap();
        assert_eq!(t.embedded.as_deref(), Some(text));
        assert_eq!(t.report.skipped, 1);
        assert!(f.calls().is_empty());
    }

    #[test]
    fn download_without_directory_is_config_error() {
        let f = MockFetcher::new();
        let r = ImagePipeline::new(&f, config(1)).transform(
            r#"{"image":"a.png"}"#,
            "https://site.example/",
            Mode::DOWNLOAD,
            None,
        );
        assert!(matches!(r, Err(CyoaError::Config(_))));
        assert!(f.calls().is_empty());
    }

    #[test]
    fn same_basename_from_different_urls_gets_suffix() {
        let f = MockFetcher::new();
        f.bytes("https://a.example/x/pic.png", Some("image/png"), b"one")
            .bytes("https://b.example/y/pic.png", Some("image/png"), b"two");
        let out = tempfile::tempdir().unwrap();
        let text = r#"[{"image":"https://a.example/x/pic.png"},{"image":"https://b.example/y/pic.png"}]"#;
        let t = ImagePipeline::new(&f, config(2))
            .transform(text, "https://site.example/", Mode::DOWNLOAD, Some(out.path()))
            .unwrap();
        assert_eq!(
            t.downloaded.unwrap(),
            r#"[{"image":"images/pic.png"},{"image":"images/pic_1.png"}]"#
        );
        assert_eq!(fs::read(out.path().join("images/pic.png")).unwrap(), b"one");
        assert_eq!(fs::read(out.path().join("images/pic_1.png")).unwrap(), b"two");
    }

    #[test]
    fn rate_limited_image_is_left_and_others_continue() {
        let f = MockFetcher::new();
        f.status("https://site.example/busy.png", 429)
            .bytes("https://site.example/ok.png", Some("image/png"), PNG);
        let text = r#"{"a":{"image":"busy.png"},"b":{"image":"ok.png"}}"#;
        let t = ImagePipeline::new(&f, config(1))
            .transform(text, "https://site.example/", Mode::EMBED, None)
            .unwrap();
        let embedded = t.embedded.unwrap();
        assert!(embedded.contains(r#""image":"busy.png""#));
        assert!(embedded.contains("data:image/png;base64,"));
        assert_eq!(f.get_count("https://site.example/busy.png"), 3);
        assert_eq!(t.report.failed, 1);
        assert_eq!(t.report.embedded, 1);
    }

    #[test]
    fn output_is_independent_of_worker_count() {
        let f = MockFetcher::new();
        let mut text = String::from("[");
        for i in 0..12 {
            f.bytes(&format!("https://site.example/{i}.jpg"), Some("image/jpeg"), format!("img{i}").as_bytes());
            if i > 0 {
                text.push(',');
            }
            text.push_str(&format!(r#"{{"image":"{i}.jpg"}}"#));
        }
        text.push(']');
        let one = ImagePipeline::new(&f, config(1))
            .transform(&text, "https://site.example/", Mode::EMBED, None)
            .unwrap();
        let many = ImagePipeline::new(&f, config(6))
            .transform(&text, "https://site.example/", Mode::EMBED, None)
            .unwrap();
        assert_eq!(one.embedded, many.embedded);
        assert_eq!(many.report.embedded, 12);
    }

    #[test]
    fn overlong_image_name_is_shortened_and_pass_continues() {
        let f = MockFetcher::new();
        let long = format!("{}.png", "a".repeat(248));
        f.bytes(&format!("https://site.example/{long}"), Some("image/png"), b"long")
            .bytes("https://site.example/ok.png", Some("image/png"), PNG);
        let out = tempfile::tempdir().unwrap();
        let text = format!(r#"[{{"image":"{long}"}},{{"image":"ok.png"}}]"#);
        let t = ImagePipeline::new(&f, config(1))
            .transform(&text, "https://site.example/", Mode::DOWNLOAD, Some(out.path()))
            .unwrap();
        assert_eq!(t.report.downloaded, 2);
        assert_eq!(t.report.failed, 0);
        let images = out.path().join(IMAGES_DIR);
        assert_eq!(fs::read(images.join("ok.png")).unwrap(), PNG);
        let names: Vec<String> = fs::read_dir(&images)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.iter().all(|n| n.len() <= 250 && !n.ends_with(".part")));
        assert!(names.iter().any(|n| n.starts_with("aaaa") && n.ends_with(".png")));
    }

    #[test]
    fn reports_are_kept_per_pass() {
        let f = MockFetcher::new();
        let text = r#"[{"image":"data:image/gif;base64,R0lGOD=="},{"image":"gone.png"}]"#;
        let out = tempfile::tempdir().unwrap();
        let t = ImagePipeline::new(&f, config(1))
            .transform(text, "https://site.example/", Mode::BOTH, Some(out.path()))
            .unwrap();
        let per_pass = PipelineReport {
            skipped: 1,
            failed: 1,
            ..PipelineReport::default()
        };
        assert_eq!(t.embed_report, Some(per_pass));
        assert_eq!(t.download_report, Some(per_pass));
        assert_eq!(t.report.skipped, 2);
        assert_eq!(t.report.failed, 2);

        let embed_only = ImagePipeline::new(&f, config(1))
            .transform(text, "https://site.example/", Mode::EMBED, None)
            .unwrap();
        assert!(embed_only.download_report.is_none());
        assert_eq!(Some(embed_only.report), embed_only.embed_report);
    }

    #[test]
    fn aborted_pipeline_returns_aborted() {
        let f = MockFetcher::new();
        f.bytes("https://site.example/a.png", Some("image/png"), PNG);
        let cfg = config(1);
        cfg.abort.abort();
        let r = ImagePipeline::new(&f, cfg).transform(
            r#"{"image":"a.png"}"#,
            "https://site.example/",
            Mode::EMBED,
            None,
        );
        assert!(matches!(r, Err(CyoaError::Aborted)));
    }
}
