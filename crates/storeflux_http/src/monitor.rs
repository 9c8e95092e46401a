use async_trait::async_trait;
use serde::Deserialize;
use storeflux_core::{
    ActionAck, ActionRequest, ContainerInfo, ContainerLogs, LogEntry, MonitorApi, StoreError,
    SystemStats,
};

use crate::HttpClient;

#[derive(Debug, Deserialize)]
struct ContainersResponse {
    #[serde(default)]
    containers: Vec<ContainerInfo>,
}

/// `MonitorApi` over the service's `/monitor` endpoints.
#[derive(Clone, Debug)]
pub struct HttpMonitorApi {
    http: HttpClient,
}

impl HttpMonitorApi {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl MonitorApi for HttpMonitorApi {
    async fn stats(&self) -> Result<SystemStats, StoreError> {
        let url = self.http.url(&["monitor", "stats"], &[]);
        Ok(self.http.get(url).await?)
    }

    async fn containers(&self) -> Result<Vec<ContainerInfo>, StoreError> {
        let url = self.http.url(&["monitor", "containers"], &[]);
        let response: ContainersResponse = self.http.get(url).await?;
        Ok(response.containers)
    }

    async fn container_logs(
        &self,
        container_id: &str,
        tail: Option<u32>,
    ) -> Result<Vec<LogEntry>, StoreError> {
        let tail = tail.map(|t| t.to_string());
        let url = self.http.url(
            &["monitor", "containers", container_id, "logs"],
            &[("tail", tail.as_deref())],
        );
        let response: ContainerLogs = self.http.get(url).await?;
        Ok(response.logs)
    }

    async fn execute_action(&self, request: &ActionRequest) -> Result<ActionAck, StoreError> {
        let url = self.http.url(&["monitor", "actions"], &[]);
        Ok(self.http.post(url, request).await?)
    }
}
