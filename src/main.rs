use std::path::{Path, PathBuf};

use activity_tracker::config::Settings;
use activity_tracker::select::{select_with_video_upload, DrillDown, Report};
use activity_tracker::table::{RawTable, Upload, UploadCache};
use activity_tracker::{normalize_employees, ReportMode, ReportView};
use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "activity-tracker")]
#[command(about = "Employee activity summaries from tabular uploads", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build one report from the uploaded tables
    Report {
        /// Employee activity file (CSV, TSV or spreadsheet)
        #[arg(long)]
        employees: PathBuf,
        /// SME video duration file (CSV, TSV or spreadsheet)
        #[arg(long)]
        videos: Option<PathBuf>,
        /// weekly, monthly, overall, attendance, buffer or video
        #[arg(long, default_value = "weekly")]
        mode: ReportMode,
        /// Person to drill into for attendance and video reports
        #[arg(long)]
        name: Option<String>,
        /// Directory for CSV exports
        #[arg(long)]
        out_dir: Option<PathBuf>,
        #[arg(long)]
        weekly_target: Option<usize>,
        #[arg(long)]
        video_target: Option<f64>,
        /// Print the chart description as JSON
        #[arg(long)]
        chart: bool,
    },
    /// List report modes
    Modes,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = Settings::from_env().context("invalid TRACKER_* environment settings")?;

    match cli.command {
        Commands::Modes => {
            for mode in ReportMode::ALL {
                println!("{:<12} {}", mode.key(), mode.label());
            }
        }
        Commands::Report {
            employees,
            videos,
            mode,
            name,
            out_dir,
            weekly_target,
            video_target,
            chart,
        } => {
            let mut policy = settings.target_policy();
            if let Some(target) = weekly_target {
                policy.weekly_topics = target;
            }
            if let Some(target) = video_target {
                policy.video_minutes = target;
            }

            let mut cache = UploadCache::new();
            let raw = load_upload(&mut cache, &employees)?;
            let employee_table = normalize_employees(raw)?;
            info!(
                records = employee_table.records.len(),
                dropped = employee_table.dropped_rows,
                "loaded employee data"
            );

            // the video upload only matters to the video report
            let view = match (mode, videos.as_deref()) {
                (ReportMode::Video, Some(path)) => match load_upload(&mut cache, path) {
                    Ok(raw) => select_with_video_upload(mode, &employee_table, Some(raw), &policy),
                    Err(err) => {
                        warn!(error = %err, "video upload could not be loaded");
                        ReportView::Unavailable(format!("{err:#}"))
                    }
                },
                _ => select_with_video_upload(mode, &employee_table, None, &policy),
            };

            match view {
                ReportView::Ready(report) => {
                    let out_dir = out_dir.unwrap_or(settings.output_dir);
                    present(&report, &out_dir, name.as_deref(), chart)?;
                }
                ReportView::Unavailable(reason) => warn!("{reason}"),
                ReportView::AwaitingInput(message) => println!("{message}"),
            }
        }
    }

    Ok(())
}

fn load_upload<'c>(cache: &'c mut UploadCache, path: &Path) -> anyhow::Result<&'c RawTable> {
    let upload = Upload::from_path(path).with_context(|| format!("failed to read {}", path.display()))?;
    cache
        .load(&upload)
        .with_context(|| format!("failed to parse {}", path.display()))
}

fn present(
    report: &Report,
    out_dir: &Path,
    name: Option<&str>,
    chart: bool,
) -> anyhow::Result<()> {
    println!("{}", report.mode.label());
    if report.table.is_empty() {
        println!("No rows for this report.");
    } else {
        print!("{}", report.table.render_text());
    }

    if let Some(file_name) = report.export_name {
        std::fs::create_dir_all(out_dir)?;
        let path = out_dir.join(file_name);
        std::fs::write(&path, report.table.to_csv()?)?;
        println!("Summary written to {}.", path.display());
    }

    if chart {
        if let Some(spec) = &report.chart {
            println!("{}", spec.to_json()?);
        }
        if let Some(rows) = report.chart_rows() {
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
    }

    let people = report.people();
    let selected = name.map(str::to_string).or_else(|| people.first().cloned());
    if let Some(person) = selected {
        match report.drill_down(&person) {
            Some(detail) => {
                println!();
                println!("{}", detail.describe());
                if let DrillDown::Attendance { chart: spec, .. } = &detail {
                    if chart {
                        println!("{}", spec.to_json()?);
                    }
                }
            }
            None if !people.is_empty() => {
                warn!(%person, "no rows for selected person; choose one of {}", people.join(", "))
            }
            None => {}
        }
    }

    Ok(())
}
