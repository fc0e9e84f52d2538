use std::sync::Arc;

use etfwatch_core::{DriveClient, ReconcileConfig, ReconcileService, SnapshotStore};
use etfwatch_market_data::PriceResolver;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{Config, FundFolder};

pub struct AppState {
    pub drive: DriveClient,
    pub store: SnapshotStore,
    pub reconcile_service: ReconcileService,
    pub funds: Vec<FundFolder>,
}

pub fn init_tracing() {
    let log_format = std::env::var("ETFWATCH_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

pub fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let resolver = Arc::new(PriceResolver::taiwan_market()?);
    let reconcile_service = ReconcileService::new(resolver, ReconcileConfig::default());

    Ok(Arc::new(AppState {
        drive: DriveClient::new()?,
        store: SnapshotStore::new(&config.cache_dir),
        reconcile_service,
        funds: config.funds.clone(),
    }))
}
