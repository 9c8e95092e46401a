mod api;
mod app_config;
mod backend;
mod editor;
mod error;
mod gateway;
mod item;
mod loader;
mod monitor;
mod notification;
mod poller;
mod refresh_policy;
mod selection;
mod task;

use std::sync::{Mutex, MutexGuard};

pub use api::{MonitorApi, StorageApi};
pub use app_config::{
    API_URL_ENV, AppConfig, AppConfigStore, BACKEND_ENV, EditorConfig, MonitorConfig,
    SearchConfig,
};
pub use backend::{Backend, BackendCapabilities};
pub use editor::{EditorError, EditorMode, ItemEditor, StructuredValuePolicy, parse_value, submit};
pub use error::StoreError;
pub use gateway::{MonitorGateway, Operation, StorageGateway};
pub use item::{Item, ItemValue, MutationAck, SearchResult, SetItemRequest, SimilarityQuery};
pub use loader::{
    Applied, CascadingLoader, LoadOutcome, LoadRequest, SimilarityRequest, Ticket, drive,
};
pub use monitor::{
    ActionAck, ActionRequest, ContainerAction, ContainerInfo, ContainerLogs, CpuStats, LogEntry,
    LogFetch, LogOutcome, LogRequest, LogTicket, MonitorState, SystemStats, UsageStats,
};
pub use notification::{Notification, NotificationCenter, NotificationLevel, Notifier};
pub use poller::{MonitorPoller, load_logs, refresh_logs, refresh_overview};
pub use refresh_policy::RefreshPolicy;
pub use selection::{LoadPhase, LoadStep, SelectionState};
pub use task::CancelToken;

/// Safely truncate a string at a character boundary, appending "..." if truncated.
pub fn truncate_string_safe(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }

    let truncate_at = max_len.saturating_sub(3);
    let safe_end = s
        .char_indices()
        .take_while(|(idx, _)| *idx <= truncate_at)
        .last()
        .map(|(idx, _)| idx)
        .unwrap_or(0);

    format!("{}...", &s[..safe_end])
}

/// Locks a mutex, recovering the data if a previous holder panicked.
pub fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
