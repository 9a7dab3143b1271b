//! Console output for deployments

use anyhow::Result;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use sitepush_core::{DeploySummary, FileOutcome, SourceTree, UploadStatus};
use tabled::{Table, Tabled};

/// Prints per-file status lines and the final summary.
///
/// With JSON output, status lines go to stderr and stdout only carries the
/// summary document.
pub struct ConsoleReporter {
    json: bool,
    bar: Option<ProgressBar>,
}

impl ConsoleReporter {
    pub fn new(json: bool, progress_len: Option<usize>) -> Result<Self> {
        let bar = match progress_len {
            Some(len) => {
                let pb = ProgressBar::new(len as u64);
                pb.set_style(
                    ProgressStyle::default_bar()
                        .template("{spinner:.green} [{elapsed_precise}] [{bar:30.cyan/blue}] {pos}/{len} {msg}")?
                        .progress_chars("=> "),
                );
                Some(pb)
            }
            None => None,
        };

        Ok(Self { json, bar })
    }

    pub fn header(&self, bucket: &str, tree: &SourceTree, dry_run: bool) {
        let mode = if dry_run { " (dry run)" } else { "" };
        self.line(format!(
            "🚀 Deploying {} to bucket: {}{}",
            tree.root.display(),
            bucket,
            mode
        ));
        self.line(format!(
            "  {} files, {}",
            tree.len(),
            format_bytes(tree.total_bytes())
        ));
    }

    pub fn file(&self, outcome: &FileOutcome) {
        let line = match &outcome.status {
            UploadStatus::Uploaded => format!("{} Uploaded {}", style("✓").green(), outcome.key),
            UploadStatus::Failed(reason) => format!(
                "{} Failed to upload {}: {}",
                style("✗").red(),
                outcome.key,
                reason
            ),
        };
        self.line(line);

        if let Some(bar) = &self.bar {
            bar.set_message(outcome.key.clone());
            bar.inc(1);
        }
    }

    pub fn finish(&self, summary: &DeploySummary, site_url: Option<&str>) -> Result<()> {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }

        if self.json {
            println!("{}", serde_json::to_string_pretty(summary)?);
            return Ok(());
        }

        println!();
        println!(
            "📊 Deployment summary: {} uploaded, {} failed",
            summary.uploaded, summary.failed
        );
        println!(
            "  ✓ Successfully uploaded: {} files ({}) in {:.1}s",
            summary.uploaded,
            format_bytes(summary.bytes_uploaded),
            summary.elapsed_ms as f64 / 1000.0
        );
        if summary.failed > 0 {
            println!("  ✗ Failed uploads: {} files", summary.failed);
        }
        println!();

        if summary.is_success() {
            println!("🎉 Deployment successful!");
            if summary.dry_run {
                println!("Dry run: nothing was sent to the bucket.");
            } else if let Some(url) = site_url {
                println!("Website URL: {}", url);
                println!("Note: a CDN in front of the bucket may take a few minutes to update.");
            }
        } else {
            println!("⚠️  Deployment completed with errors.");

            #[derive(Tabled)]
            struct FailureRow {
                key: String,
                reason: String,
            }

            let rows: Vec<FailureRow> = summary
                .failures
                .iter()
                .map(|f| FailureRow {
                    key: f.key.clone(),
                    reason: f.reason.clone(),
                })
                .collect();

            println!();
            println!("{}", Table::new(rows));
        }

        Ok(())
    }

    fn line(&self, message: String) {
        if let Some(bar) = &self.bar {
            bar.println(message);
        } else if self.json {
            eprintln!("{}", message);
        } else {
            println!("{}", message);
        }
    }
}

/// Format bytes to human-readable size
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}
