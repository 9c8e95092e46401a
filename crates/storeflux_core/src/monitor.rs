use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{CancelToken, StoreError};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CpuStats {
    #[serde(default)]
    pub percent: f64,
    #[serde(default)]
    pub cores: u32,
}

/// Used/total pair for memory and disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageStats {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub used: u64,
    #[serde(default)]
    pub percent: f64,
}

/// Host resource snapshot returned by `GET /monitor/stats`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemStats {
    #[serde(default)]
    pub cpu: CpuStats,
    #[serde(default)]
    pub memory: UsageStats,
    #[serde(default)]
    pub disk: UsageStats,
    #[serde(default)]
    pub uptime_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerInfo {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image: String,
    /// Human-readable status line, e.g. "Up 3 hours".
    #[serde(default)]
    pub status: String,
    /// Machine state, e.g. "running" or "exited".
    #[serde(default)]
    pub state: String,
}

impl ContainerInfo {
    pub fn is_running(&self) -> bool {
        self.state.eq_ignore_ascii_case("running")
    }

    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(default)]
    pub timestamp: String,
    pub message: String,
}

/// Body of `GET /monitor/containers/{id}/logs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerLogs {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub container_id: String,
    #[serde(default)]
    pub logs: Vec<LogEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerAction {
    Start,
    Stop,
    Restart,
}

impl ContainerAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerAction::Start => "start",
            ContainerAction::Stop => "stop",
            ContainerAction::Restart => "restart",
        }
    }
}

impl fmt::Display for ContainerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContainerAction {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "start" => Ok(ContainerAction::Start),
            "stop" => Ok(ContainerAction::Stop),
            "restart" => Ok(ContainerAction::Restart),
            other => Err(StoreError::unsupported(format!(
                "container action '{}'",
                other
            ))),
        }
    }
}

/// Body of `POST /monitor/actions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub action: ContainerAction,
    pub container_id: String,
}

impl ActionRequest {
    pub fn new(action: ContainerAction, container_id: impl Into<String>) -> Self {
        Self {
            action,
            container_id: container_id.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionAck {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// Identifies the container selection a log request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogTicket {
    generation: u64,
}

/// A log tail fetch to run for the selected container.
#[derive(Debug, Clone)]
pub struct LogRequest {
    pub ticket: LogTicket,
    pub container_id: String,
    pub cancel: CancelToken,
}

/// Result of a log tail fetch as seen by the monitor state.
#[derive(Debug)]
pub enum LogFetch {
    Loaded(Vec<LogEntry>),
    /// The selection changed while the request was in flight.
    Aborted,
    Failed(StoreError),
}

#[derive(Debug)]
pub struct LogOutcome {
    pub ticket: LogTicket,
    pub fetch: LogFetch,
}

/// State behind the system monitor screen.
///
/// Log requests are tied to the current container selection: selecting another
/// container or deselecting cancels the in-flight request, and any outcome
/// carrying an older ticket is ignored.
#[derive(Debug, Default)]
pub struct MonitorState {
    stats: Option<SystemStats>,
    containers: Vec<ContainerInfo>,
    selected: Option<String>,
    logs: Vec<LogEntry>,
    logs_loading: bool,
    log_generation: u64,
    log_cancel: Option<CancelToken>,
}

impl MonitorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> Option<&SystemStats> {
        self.stats.as_ref()
    }

    pub fn containers(&self) -> &[ContainerInfo] {
        &self.containers
    }

    pub fn selected_container(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn logs(&self) -> &[LogEntry] {
        &self.logs
    }

    pub fn is_loading_logs(&self) -> bool {
        self.logs_loading
    }

    /// A failed refresh keeps the previous snapshot on screen.
    pub fn apply_stats(&mut self, stats: Option<SystemStats>) {
        if let Some(stats) = stats {
            self.stats = Some(stats);
        }
    }

    pub fn apply_containers(&mut self, containers: Option<Vec<ContainerInfo>>) {
        if let Some(containers) = containers {
            self.containers = containers;
        }
    }

    pub fn select_container(&mut self, container_id: impl Into<String>) -> LogRequest {
        self.abort_log_tail();
        self.logs.clear();

        let container_id = container_id.into();
        self.selected = Some(container_id.clone());
        self.log_generation += 1;

        let cancel = CancelToken::new();
        self.log_cancel = Some(cancel.clone());
        self.logs_loading = true;

        LogRequest {
            ticket: self.current_ticket(),
            container_id,
            cancel,
        }
    }

    /// Cancels the in-flight log request and clears displayed logs.
    pub fn deselect_container(&mut self) {
        self.abort_log_tail();
        self.selected = None;
        self.logs.clear();
        self.log_generation += 1;
    }

    /// Request for the next poll of the selected container's logs.
    ///
    /// Reuses the selection's cancel token so a later deselection also aborts
    /// poll requests.
    pub fn poll_logs(&mut self) -> Option<LogRequest> {
        let container_id = self.selected.clone()?;
        let cancel = self.log_cancel.get_or_insert_with(CancelToken::new).clone();
        self.logs_loading = true;

        Some(LogRequest {
            ticket: self.current_ticket(),
            container_id,
            cancel,
        })
    }

    /// Returns `true` when the outcome changed what is displayed.
    pub fn apply_logs(&mut self, outcome: LogOutcome) -> bool {
        if outcome.ticket != self.current_ticket() {
            log::debug!("Dropping log outcome for a superseded container selection");
            return false;
        }

        self.logs_loading = false;

        match outcome.fetch {
            LogFetch::Loaded(entries) => {
                self.logs = entries;
                true
            }
            LogFetch::Aborted => false,
            LogFetch::Failed(_) => {
                self.logs.clear();
                true
            }
        }
    }

    fn abort_log_tail(&mut self) {
        if let Some(cancel) = self.log_cancel.take() {
            cancel.cancel();
        }
        self.logs_loading = false;
    }

    fn current_ticket(&self) -> LogTicket {
        LogTicket {
            generation: self.log_generation,
        }
    }
}
