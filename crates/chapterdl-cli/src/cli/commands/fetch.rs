//! `chapterdl fetch` – run the pipeline for one series manifest.

use anyhow::{Context, Result};
use chapterdl_core::chapter::ChapterStatus;
use chapterdl_core::config::ChapterdlConfig;
use chapterdl_core::control::{CancelToken, ThreadSleeper};
use chapterdl_core::fetcher::{CurlSource, ImageFetcher};
use chapterdl_core::manifest::{parse_chapter_selection, SeriesManifest};
use chapterdl_core::pipeline::{ChapterReport, Pipeline, RunReport};
use std::sync::Arc;

use crate::cli::FetchArgs;

pub async fn run_fetch(cfg: ChapterdlConfig, args: &FetchArgs) -> Result<i32> {
    let manifest = SeriesManifest::load(&args.manifest)?;
    let selection = args
        .chapters
        .as_deref()
        .map(parse_chapter_selection)
        .transpose()
        .context("invalid --chapters list")?;

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || {
            eprintln!("\ninterrupted; finishing in-flight requests and stopping");
            cancel.cancel();
        })
        .context("install Ctrl-C handler")?;
    }

    let sleeper = Arc::new(ThreadSleeper::default());
    let source = Arc::new(CurlSource::new(cfg.http_options()));
    let fetcher =
        ImageFetcher::new(source, cfg.retry_policy(), sleeper.clone()).with_referer(manifest.referer.clone());

    let (report_tx, mut report_rx) = tokio::sync::mpsc::channel::<ChapterReport>(16);
    let printer = tokio::spawn(async move {
        while let Some(r) = report_rx.recv().await {
            print_chapter(&r);
        }
    });

    println!("{} ({} chapters in manifest)", manifest.title, manifest.chapters.len());
    let pipeline = Pipeline::new(cfg.pipeline_config(), fetcher, sleeper, cancel).with_reports(report_tx);
    let result = pipeline.run(manifest.into_request(selection)).await;
    drop(pipeline);
    let _ = printer.await;
    let report = result?;

    print_summary(&report);
    if let Some(path) = &args.report {
        report.write_json(path)?;
        tracing::info!(path = %path.display(), "wrote run report");
    }
    Ok(report.exit_status())
}

fn print_chapter(r: &ChapterReport) {
    let detail = match r.status {
        ChapterStatus::Partial => format!(
            "missing pages {}",
            r.missing_pages.iter().map(u32::to_string).collect::<Vec<_>>().join(",")
        ),
        ChapterStatus::Failed => r.reason.clone().unwrap_or_else(|| "all pages failed".to_string()),
        _ => r
            .archive
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default(),
    };
    println!("{:>8}  {:<16} {}", r.number.to_string(), r.status.to_string(), detail);
}

fn print_summary(report: &RunReport) {
    if let Some(cutoff) = &report.resume_point {
        println!("Resumed after chapter {cutoff}.");
    }
    if report.chapters.is_empty() && !report.cancelled {
        println!("No chapters to fetch.");
        return;
    }
    println!(
        "{} complete, {} partial, {} skipped, {} failed -> {}",
        report.count(ChapterStatus::Complete),
        report.count(ChapterStatus::Partial),
        report.count(ChapterStatus::SkippedExisting),
        report.count(ChapterStatus::Failed),
        report.output_dir.display()
    );
    if report.cancelled {
        println!("Run cancelled.");
    }
}
