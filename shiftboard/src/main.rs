// Shiftboard - shift board display
// Entry point: follows the shared reports directory and logs what a board
// would show.

use anyhow::Context;
use shiftboard::app;
use shiftboard::model::ShiftType;
use shiftboard::services::report_writer::absence_summary;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Data directory: first argument, then `SHIFTBOARD_DATA_DIR`, then `./shiftboard-data`
fn data_dir() -> PathBuf {
    std::env::args_os()
        .nth(1)
        .or_else(|| std::env::var_os("SHIFTBOARD_DATA_DIR"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("shiftboard-data"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shiftboard=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Shiftboard display");

    let state = app::setup(data_dir())
        .await
        .context("failed to initialize application")?;

    let poller = state.poller();
    poller
        .on_report(|delivery| {
            if !delivery.changed {
                return;
            }
            let report = &delivery.report;
            tracing::info!(
                "Report {} ({}): {} employees, {} managers, absences {}",
                if report.date.is_empty() { "-" } else { report.date.as_str() },
                report.last_modified,
                report.employees.len(),
                report.managers.len(),
                absence_summary(&report.absences)
            );
            for group in &report.shifts.shift_groups {
                tracing::info!(
                    "  {}: morning {}/{}, evening {}/{}",
                    group.name,
                    group.shift(ShiftType::Morning).occupancy(),
                    group.shift(ShiftType::Morning).capacity,
                    group.shift(ShiftType::Evening).occupancy(),
                    group.shift(ShiftType::Evening).capacity
                );
            }
        })
        .await;

    let watcher = state.settings_watcher();
    watcher
        .on_reload(|settings| {
            tracing::info!("Settings reloaded, background {}", settings.background_color);
        })
        .await;

    poller.start().await;
    watcher.start().await;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    tracing::info!("Shutting down");
    poller.stop().await;
    watcher.stop().await;

    Ok(())
}
