use serde_json::json;
use std::sync::Arc;
use storeflux_core::{
    Backend, ContainerInfo, CpuStats, ItemValue, MonitorGateway, NotificationCenter,
    SearchResult, StorageGateway, SystemStats, UsageStats,
};

use crate::{FakeMonitor, FakeStorage};

/// Storage with one populated database per backend.
///
/// Key-value: `db0` → `sessions`, `users` (`db1` is empty). Document: `main` →
/// `events`. Vector: `default` → `docs`.
pub fn sample_storage() -> FakeStorage {
    FakeStorage::new()
        .with_databases(Backend::KeyValue, &["db0", "db1"])
        .with_collections(Backend::KeyValue, "db0", &["sessions", "users"])
        .with_databases(Backend::Document, &["main"])
        .with_collections(Backend::Document, "main", &["events"])
        .with_databases(Backend::Vector, &["default"])
        .with_collections(Backend::Vector, "default", &["docs"])
        .with_item("sessions", "foo1", ItemValue::text("a"))
        .with_item("sessions", "foo2", ItemValue::text("b"))
        .with_item("sessions", "bar", ItemValue::text("c"))
        .with_item("users", "user:1", ItemValue::Structured(json!({"name": "Ada"})))
        .with_item("events", "evt-1", ItemValue::Structured(json!({"kind": "login"})))
        .with_item("docs", "doc-1", ItemValue::text("cats sleep a lot"))
        .with_search_results(vec![search_result("doc-1", "cats sleep a lot", 0.12)])
}

pub fn search_result(id: &str, document: &str, distance: f64) -> SearchResult {
    SearchResult {
        id: id.to_string(),
        document: Some(document.to_string()),
        metadata: None,
        distance: Some(distance),
    }
}

pub fn container(id: &str, name: &str, state: &str) -> ContainerInfo {
    ContainerInfo {
        id: id.to_string(),
        name: name.to_string(),
        image: format!("{}:latest", name),
        status: if state == "running" {
            "Up 2 hours".to_string()
        } else {
            "Exited (0)".to_string()
        },
        state: state.to_string(),
    }
}

pub fn system_stats(cpu_percent: f64) -> SystemStats {
    SystemStats {
        cpu: CpuStats {
            percent: cpu_percent,
            cores: 4,
        },
        memory: UsageStats {
            total: 8 * 1024 * 1024 * 1024,
            used: 2 * 1024 * 1024 * 1024,
            percent: 25.0,
        },
        disk: UsageStats {
            total: 100 * 1024 * 1024 * 1024,
            used: 40 * 1024 * 1024 * 1024,
            percent: 40.0,
        },
        uptime_seconds: 3_600,
    }
}

/// Monitor with a running `web` container that has logs and an exited `db`.
pub fn sample_monitor() -> FakeMonitor {
    FakeMonitor::new()
        .with_stats(system_stats(12.5))
        .with_container(container("c-web", "web", "running"))
        .with_container(container("c-db", "db", "exited"))
        .with_logs("c-web", &["listening on :80", "GET / 200"])
        .with_logs("c-db", &["shutdown complete"])
}

pub fn storage_gateway(fake: &FakeStorage) -> (StorageGateway, Arc<NotificationCenter>) {
    let notifications = Arc::new(NotificationCenter::new());
    let gateway = StorageGateway::new(fake.clone().as_api_arc(), notifications.clone());
    (gateway, notifications)
}

pub fn monitor_gateway(fake: &FakeMonitor) -> (MonitorGateway, Arc<NotificationCenter>) {
    let notifications = Arc::new(NotificationCenter::new());
    let gateway = MonitorGateway::new(fake.clone().as_api_arc(), notifications.clone());
    (gateway, notifications)
}
