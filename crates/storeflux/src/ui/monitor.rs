use std::sync::{Arc, Mutex, MutexGuard};
use storeflux_core::{
    ContainerAction, MonitorConfig, MonitorGateway, MonitorPoller, MonitorState, load_logs,
    refresh_overview,
};
use tokio::task::JoinHandle;

/// System monitor: host stats, containers, and the selected container's logs.
///
/// Polling runs only while the screen is mounted. Log fetches run as
/// background tasks so a deselection can cancel them mid-flight.
pub struct MonitorScreen {
    state: Arc<Mutex<MonitorState>>,
    gateway: MonitorGateway,
    config: MonitorConfig,
    poller: Option<MonitorPoller>,
    log_task: Option<JoinHandle<bool>>,
}

impl MonitorScreen {
    pub fn new(gateway: MonitorGateway, config: MonitorConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(MonitorState::new())),
            gateway,
            config,
            poller: None,
            log_task: None,
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn is_mounted(&self) -> bool {
        self.poller.is_some()
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&MonitorState) -> R) -> R {
        f(&self.lock())
    }

    pub fn mount(&mut self) {
        if self.is_mounted() {
            return;
        }

        self.poller = Some(MonitorPoller::start(
            self.state.clone(),
            self.gateway.clone(),
            &self.config,
        ));
    }

    /// Stops polling and drops the container selection.
    pub fn unmount(&mut self) {
        if let Some(mut poller) = self.poller.take() {
            poller.stop();
        }
        self.deselect_container();
    }

    pub async fn refresh(&self) {
        refresh_overview(&self.state, &self.gateway).await;
    }

    pub fn select_container(&mut self, container_id: &str) {
        let request = self.lock().select_container(container_id);
        let tail = Some(self.config.log_tail).filter(|tail| *tail > 0);
        let state = self.state.clone();
        let gateway = self.gateway.clone();

        self.log_task = Some(tokio::spawn(async move {
            load_logs(&state, &gateway, request, tail).await
        }));
    }

    pub fn deselect_container(&mut self) {
        self.lock().deselect_container();
        self.log_task = None;
    }

    pub async fn action(&self, container_id: &str, action: ContainerAction) -> bool {
        let done = self.gateway.execute_action(container_id, action).await;
        self.refresh().await;
        done
    }

    fn lock(&self) -> MutexGuard<'_, MonitorState> {
        storeflux_core::lock(&self.state)
    }
}

impl Drop for MonitorScreen {
    fn drop(&mut self) {
        self.unmount();
    }
}
