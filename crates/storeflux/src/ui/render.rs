use std::fmt::Write;
use storeflux_core::{
    BackendCapabilities, ItemEditor, LoadPhase, MonitorConfig, MonitorState, Notification, SelectionState, UsageStats,
    truncate_string_safe,
};

const VALUE_WIDTH: usize = 60;
const KEY_WIDTH: usize = 24;
const LOG_WIDTH: usize = 120;

/// Renders the browser: selectors, search box, item rows, similarity results
/// and, when open, the item form.
pub fn browser(state: &SelectionState, form: Option<(&str, &ItemEditor)>) -> String {
    let mut out = String::new();
    let backend = state.backend();

    let _ = write!(out, "Backend: {}    ", backend.display_name());
    if backend.supports(BackendCapabilities::MULTIPLE_DATABASES) {
        let _ = write!(
            out,
            "Database: {}    ",
            selector(
                state.database(),
                state.databases(),
                state.phase() == LoadPhase::LoadingDatabases
            )
        );
    }
    let _ = writeln!(
        out,
        "{}: {}",
        backend.container_name(),
        selector(
            state.collection(),
            state.collections(),
            state.phase() == LoadPhase::LoadingCollections
        ),
    );

    if let Some(pattern) = state.search_pattern() {
        let _ = writeln!(out, "Search: {}", pattern);
    }

    match state.phase() {
        LoadPhase::Error(step) => {
            let _ = writeln!(
                out,
                "! {} failed: {}",
                step.label(),
                state.last_error().unwrap_or("unknown error")
            );
        }
        phase if phase.is_loading() => {
            let _ = writeln!(out, "... {}", phase.label());
        }
        _ => {}
    }

    if state.collection().is_some() {
        if state.is_loading_items() {
            let _ = writeln!(out, "  (loading)");
        } else if state.items().is_empty() {
            let _ = writeln!(out, "  (no {})", backend.record_name().to_lowercase());
        } else {
            for item in state.items() {
                let _ = writeln!(
                    out,
                    "  {:<width$}  {}",
                    truncate_string_safe(&item.key, KEY_WIDTH),
                    item.value.as_display_string_truncated(VALUE_WIDTH),
                    width = KEY_WIDTH
                );
            }
            let _ = writeln!(
                out,
                "  {} {}",
                state.items().len(),
                backend.record_name().to_lowercase()
            );
        }
    }

    if !state.similarity_results().is_empty() {
        let _ = writeln!(out, "Similar:");
        for result in state.similarity_results() {
            let distance = result
                .distance
                .map(|d| format!("{:.3}", d))
                .unwrap_or_else(|| "-".to_string());
            let document = result.document.as_deref().unwrap_or("");
            let _ = writeln!(
                out,
                "  {:<width$}  {:>7}  {}",
                truncate_string_safe(&result.id, KEY_WIDTH),
                distance,
                truncate_string_safe(document, VALUE_WIDTH),
                width = KEY_WIDTH
            );
        }
    }

    if let Some((title, form)) = form {
        out.push_str(&item_form(title, form));
    }

    out
}

fn selector(active: Option<&str>, options: &[String], loading: bool) -> String {
    if loading {
        return "(loading)".to_string();
    }

    match active {
        Some(active) if options.len() > 1 => format!("{} [{}]", active, options.join(", ")),
        Some(active) => active.to_string(),
        None => "-".to_string(),
    }
}

pub fn item_form(title: &str, form: &ItemEditor) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "+-- {}", title);
    let _ = writeln!(out, "| key:   {}", form.key());
    for (i, line) in form.value().lines().enumerate() {
        let label = if i == 0 { "value:" } else { "      " };
        let _ = writeln!(out, "| {} {}", label, line);
    }
    if form.is_saving() {
        let _ = writeln!(out, "| saving...");
    }
    if let Some(error) = form.error() {
        let _ = writeln!(out, "| ! {}", error);
    }
    out.push_str("+--\n");

    out
}

/// Renders the monitor: stats, containers, and the selected container's logs.
pub fn monitor(state: &MonitorState, config: &MonitorConfig) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "System (refresh {}, logs {})",
        config.stats_policy().label(),
        config.logs_policy().label()
    );

    match state.stats() {
        Some(stats) => {
            let _ = writeln!(
                out,
                "  CPU     {:>5.1}%  ({} cores)",
                stats.cpu.percent, stats.cpu.cores
            );
            let _ = writeln!(out, "  Memory  {}", usage(&stats.memory));
            let _ = writeln!(out, "  Disk    {}", usage(&stats.disk));
            let _ = writeln!(out, "  Uptime  {}", format_uptime(stats.uptime_seconds));
        }
        None => {
            let _ = writeln!(out, "  (no stats)");
        }
    }

    let _ = writeln!(out, "Containers:");
    if state.containers().is_empty() {
        let _ = writeln!(out, "  (none)");
    }
    for container in state.containers() {
        let marker = if state.selected_container() == Some(container.id.as_str()) {
            '>'
        } else {
            ' '
        };
        let _ = writeln!(
            out,
            "{} {:<12} {:<20} {:<8} {}",
            marker,
            truncate_string_safe(&container.id, 12),
            truncate_string_safe(container.display_name(), 20),
            container.state,
            container.status
        );
    }

    if let Some(selected) = state.selected_container() {
        let _ = writeln!(out, "Logs for {}:", selected);
        if state.is_loading_logs() && state.logs().is_empty() {
            let _ = writeln!(out, "  (loading)");
        } else if state.logs().is_empty() {
            let _ = writeln!(out, "  (empty)");
        }
        for entry in state.logs() {
            let _ = writeln!(
                out,
                "  {} {}",
                entry.timestamp,
                truncate_string_safe(&entry.message, LOG_WIDTH)
            );
        }
    }

    out
}

fn usage(stats: &UsageStats) -> String {
    format!(
        "{:>5.1}%  {} / {}",
        stats.percent,
        format_bytes(stats.used),
        format_bytes(stats.total)
    )
}

pub fn notifications(notifications: &[Notification]) -> String {
    let mut out = String::new();
    for notification in notifications {
        let _ = writeln!(
            out,
            "[{}] {} {}",
            notification.created_at.format("%H:%M:%S"),
            notification.level.label(),
            notification.message
        );
    }
    out
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

pub fn format_uptime(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;

    if days > 0 {
        format!("{}d {}h {}m", days, hours, minutes)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}
