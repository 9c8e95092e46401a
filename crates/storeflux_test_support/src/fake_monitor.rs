use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use storeflux_core::{
    ActionAck, ActionRequest, ContainerInfo, LogEntry, MonitorApi, StoreError, SystemStats,
};
use tokio::sync::Notify;

use crate::FakeFailure;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorCall {
    Stats,
    Containers,
    Logs {
        container_id: String,
        tail: Option<u32>,
    },
    Action(ActionRequest),
}

#[derive(Default)]
struct FakeMonitorState {
    stats: Mutex<SystemStats>,
    containers: Mutex<Vec<ContainerInfo>>,
    logs: Mutex<HashMap<String, Vec<LogEntry>>>,
    stalled: Mutex<Vec<String>>,
    failure: Mutex<Option<FakeFailure>>,
    calls: Mutex<Vec<MonitorCall>>,
    log_requested: Notify,
}

/// In-memory monitor service.
#[derive(Clone, Default)]
pub struct FakeMonitor {
    state: Arc<FakeMonitorState>,
}

impl FakeMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stats(self, stats: SystemStats) -> Self {
        *mutex_lock(&self.state.stats) = stats;
        self
    }

    pub fn with_container(self, container: ContainerInfo) -> Self {
        mutex_lock(&self.state.containers).push(container);
        self
    }

    pub fn with_logs(self, container_id: &str, messages: &[&str]) -> Self {
        let entries = messages
            .iter()
            .enumerate()
            .map(|(i, message)| LogEntry {
                timestamp: format!("2026-01-01T00:00:{:02}Z", i),
                message: message.to_string(),
            })
            .collect();
        mutex_lock(&self.state.logs).insert(container_id.to_string(), entries);
        self
    }

    /// Log requests for `container_id` never resolve.
    pub fn with_stalled_logs(self, container_id: &str) -> Self {
        mutex_lock(&self.state.stalled).push(container_id.to_string());
        self
    }

    /// Every call fails with `failure` until cleared.
    pub fn fail_all(&self, failure: FakeFailure) {
        *mutex_lock(&self.state.failure) = Some(failure);
    }

    pub fn clear_failure(&self) {
        *mutex_lock(&self.state.failure) = None;
    }

    pub fn calls(&self) -> Vec<MonitorCall> {
        mutex_lock(&self.state.calls).clone()
    }

    pub fn log_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, MonitorCall::Logs { .. }))
            .count()
    }

    pub fn actions(&self) -> Vec<ActionRequest> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                MonitorCall::Action(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    /// Resolves when the next log request reaches the fake.
    pub async fn log_requested(&self) {
        self.state.log_requested.notified().await;
    }

    pub fn as_api_arc(self) -> Arc<dyn MonitorApi> {
        Arc::new(self)
    }

    fn enter(&self, call: MonitorCall) -> Result<(), StoreError> {
        mutex_lock(&self.state.calls).push(call);

        match mutex_lock(&self.state.failure).as_ref() {
            Some(failure) => Err(failure.to_error()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl MonitorApi for FakeMonitor {
    async fn stats(&self) -> Result<SystemStats, StoreError> {
        self.enter(MonitorCall::Stats)?;
        Ok(mutex_lock(&self.state.stats).clone())
    }

    async fn containers(&self) -> Result<Vec<ContainerInfo>, StoreError> {
        self.enter(MonitorCall::Containers)?;
        Ok(mutex_lock(&self.state.containers).clone())
    }

    async fn container_logs(
        &self,
        container_id: &str,
        tail: Option<u32>,
    ) -> Result<Vec<LogEntry>, StoreError> {
        self.enter(MonitorCall::Logs {
            container_id: container_id.to_string(),
            tail,
        })?;
        self.state.log_requested.notify_one();

        let stalled = mutex_lock(&self.state.stalled)
            .iter()
            .any(|id| id == container_id);
        if stalled {
            std::future::pending::<()>().await;
        }

        let mut entries = mutex_lock(&self.state.logs)
            .get(container_id)
            .cloned()
            .ok_or(StoreError::NotFound)?;

        if let Some(tail) = tail {
            let skip = entries.len().saturating_sub(tail as usize);
            entries.drain(..skip);
        }

        Ok(entries)
    }

    async fn execute_action(&self, request: &ActionRequest) -> Result<ActionAck, StoreError> {
        self.enter(MonitorCall::Action(request.clone()))?;

        let known = mutex_lock(&self.state.containers)
            .iter()
            .any(|c| c.id == request.container_id);
        if !known {
            return Err(StoreError::NotFound);
        }

        Ok(ActionAck {
            status: "ok".to_string(),
            message: None,
        })
    }
}

fn mutex_lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poison| poison.into_inner())
}
