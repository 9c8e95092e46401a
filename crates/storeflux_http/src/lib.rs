pub mod monitor;
pub mod storage;
pub mod transport;

use std::sync::Arc;
use storeflux_core::{AppConfig, MonitorApi, StorageApi, StoreError};

pub use monitor::HttpMonitorApi;
pub use storage::HttpStorageApi;
pub use transport::{HttpClient, HttpError};

/// Builds both API clients for the configured service, sharing one connection pool.
pub fn connect(config: &AppConfig) -> Result<(Arc<dyn StorageApi>, Arc<dyn MonitorApi>), StoreError> {
    config.validate()?;

    let client = HttpClient::new(&config.api_url, config.request_timeout())?;
    log::info!("Using storage service at {}", client.base_url());

    Ok((
        Arc::new(HttpStorageApi::new(client.clone())),
        Arc::new(HttpMonitorApi::new(client)),
    ))
}
