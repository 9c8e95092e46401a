use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::{LogRequest, MonitorConfig, MonitorGateway, MonitorState, lock};

/// Refreshes system stats and the container list together.
pub async fn refresh_overview(state: &Mutex<MonitorState>, gateway: &MonitorGateway) {
    let (stats, containers) = futures::future::join(gateway.stats(), gateway.containers()).await;

    let mut state = lock(state);
    state.apply_stats(stats);
    state.apply_containers(containers);
}

/// Runs a log request issued by a container selection.
pub async fn load_logs(
    state: &Mutex<MonitorState>,
    gateway: &MonitorGateway,
    request: LogRequest,
    tail: Option<u32>,
) -> bool {
    let outcome = gateway.fetch_logs(&request, tail).await;
    lock(state).apply_logs(outcome)
}

/// Re-fetches logs for the selected container. No-op without a selection.
pub async fn refresh_logs(
    state: &Mutex<MonitorState>,
    gateway: &MonitorGateway,
    tail: Option<u32>,
) -> bool {
    let request = {
        let mut state = lock(state);
        state.poll_logs()
    };

    match request {
        Some(request) => load_logs(state, gateway, request, tail).await,
        None => false,
    }
}

/// Background refresh loops for the monitor screen.
///
/// Started when the screen mounts; every loop is aborted by [`stop`](Self::stop)
/// or when the poller is dropped.
pub struct MonitorPoller {
    handles: Vec<JoinHandle<()>>,
}

impl MonitorPoller {
    pub fn start(
        state: Arc<Mutex<MonitorState>>,
        gateway: MonitorGateway,
        config: &MonitorConfig,
    ) -> Self {
        let mut handles = Vec::with_capacity(2);
        let tail = Some(config.log_tail).filter(|tail| *tail > 0);

        {
            let state = state.clone();
            let gateway = gateway.clone();
            let every = config.stats_policy().duration();

            handles.push(tokio::spawn(async move {
                match every {
                    Some(every) => {
                        let mut ticker = interval(every);
                        loop {
                            ticker.tick().await;
                            refresh_overview(&state, &gateway).await;
                        }
                    }
                    None => refresh_overview(&state, &gateway).await,
                }
            }));
        }

        if let Some(every) = config.logs_policy().duration() {
            handles.push(tokio::spawn(async move {
                let mut ticker = interval(every);
                // The selection itself triggers the first fetch.
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    refresh_logs(&state, &gateway, tail).await;
                }
            }));
        }

        log::info!("Monitor polling started ({} loops)", handles.len());
        Self { handles }
    }

    pub fn is_running(&self) -> bool {
        self.handles.iter().any(|handle| !handle.is_finished())
    }

    pub fn stop(&mut self) {
        if self.handles.is_empty() {
            return;
        }

        for handle in self.handles.drain(..) {
            handle.abort();
        }
        log::info!("Monitor polling stopped");
    }
}

impl Drop for MonitorPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

fn interval(every: Duration) -> tokio::time::Interval {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}
