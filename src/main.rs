use anyhow::Result;
use dayahead_core::Config;
use dayahead_services::{Dashboard, RefreshPolicy};

#[tokio::main]
async fn main() -> Result<()> {
    dayahead_core::init()?;

    let (config, _) = Config::load_validated()?;
    tracing::info!("Data directory: {}", config.data_dir.display());

    let dashboard = Dashboard::open(&config).map_err(|e| {
        tracing::error!("{}", e.user_message());
        anyhow::anyhow!("Failed to open dashboard: {}", e)
    })?;

    let cancel = dashboard.cancellation_token();

    let refresher = if config.refresh.interval_minutes == 0 {
        let report = dashboard.refresh_all().await;
        tracing::info!("Single refresh finished: {:?}", report.outcome);
        None
    } else {
        let scheduler = dashboard.scheduler(RefreshPolicy::from(&config.refresh));
        Some(tokio::spawn(scheduler.run(cancel.clone())))
    };

    let mut view = dashboard.view_state();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = view.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = view.borrow_and_update().clone();
                match state.summary {
                    Some(summary) => tracing::info!("{}", summary),
                    None => tracing::info!("Waiting for weather before composing the summary"),
                }
                if let Some(fact) = state.fun_fact {
                    tracing::debug!("Fun fact: {}", fact);
                }
                if let Some(steps) = state.steps.and_then(|r| r.count()) {
                    tracing::debug!("Steps today: {}", steps);
                }
            }
        }
    }

    tracing::info!("Shutting down");
    dashboard.shutdown().await;
    if let Some(task) = refresher {
        if let Err(e) = task.await {
            tracing::warn!("Refresh scheduler ended abnormally: {}", e);
        }
    }

    Ok(())
}
