//! Resolve, transform and save one project.

use anyhow::{Context, Result};
use cyoa_core::config::CyoaConfig;
use cyoa_core::control::AbortToken;
use cyoa_core::http::CurlFetcher;
use cyoa_core::pipeline::{ImagePipeline, PipelineConfig};
use cyoa_core::resolve::{ResolverOptions, SourceResolver};
use std::fs;
use std::time::Duration;

use super::{archive, output, Cli};

/// Name of the project file inside the archive.
const ARCHIVE_PROJECT_FILE: &str = "project.json";

pub fn pipeline_config(cli: &Cli, cfg: &CyoaConfig, abort: AbortToken) -> PipelineConfig {
    let mut retry = cfg.retry_policy();
    if let Some(secs) = cli.wait_time {
        retry.rate_limit_wait = Duration::from_secs(secs);
    }
    PipelineConfig {
        retry,
        headers: cfg.header_policy(),
        workers: cli.jobs.unwrap_or(cfg.image_workers).max(1),
        abort,
    }
}

pub fn run_download(cli: &Cli, cfg: &CyoaConfig) -> Result<()> {
    let mode = cli.mode();
    tracing::info!("url: {}", cli.url);
    tracing::info!(
        "filename: {}",
        cli.filename.as_deref().unwrap_or("[auto-generated]")
    );
    tracing::info!(embed = mode.embed, download = mode.download, "outputs");

    let fetcher = CurlFetcher::new(cfg.request_timeout());
    let abort = AbortToken::new();
    let resolver = SourceResolver::new(
        &fetcher,
        ResolverOptions {
            max_depth: cfg.max_depth,
            gateway: cfg.gateway(),
            abort: abort.clone(),
        },
    );
    let source = resolver
        .resolve(&cli.url)
        .context("could not find project.json")?;
    let name = output::output_name(cli.filename.as_deref(), source.project_url());
    tracing::info!("base url: {}", source.base_url());

    let staging = if mode.download {
        Some(
            tempfile::Builder::new()
                .prefix("cyoa_")
                .tempdir()
                .context("failed to create staging directory")?,
        )
    } else {
        None
    };

    let pipeline = ImagePipeline::new(&fetcher, pipeline_config(cli, cfg, abort));
    let result = pipeline.transform(
        source.json_block(),
        source.base_url(),
        mode,
        staging.as_ref().map(|d| d.path()),
    )?;

    let cwd = std::env::current_dir()?;
    if let Some(text) = &result.embedded {
        tracing::info!("saving file: {}.json", name);
        output::save_new(&cwd, &format!("{name}.json"), text)?;
    }
    if let (Some(text), Some(dir)) = (&result.downloaded, &staging) {
        let project = dir.path().join(ARCHIVE_PROJECT_FILE);
        fs::write(&project, text).with_context(|| format!("failed to write {}", project.display()))?;
        let zip_path = output::unique_path(&cwd, &format!("{name}.zip"));
        tracing::info!("saving file: {}", zip_path.display());
        archive::zip_dir(dir.path(), &zip_path)?;
    }
    if let Some(dir) = staging {
        let path = dir.path().to_path_buf();
        dir.close()
            .with_context(|| format!("failed to delete {}", path.display()))?;
        tracing::info!("deleted temporary folder: {}", path.display());
    }

    let r = result.report;
    tracing::info!(
        embedded = r.embedded,
        downloaded = r.downloaded,
        skipped = r.skipped,
        failed = r.failed,
        "download successful"
    );
    Ok(())
}
