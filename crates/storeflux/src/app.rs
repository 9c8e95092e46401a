use std::io::{self, Write};
use std::sync::Arc;
use storeflux_core::{
    AppConfig, Backend, MonitorApi, MonitorGateway, NotificationCenter, StorageApi,
    StorageGateway,
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::commands::{Command, HELP};
use crate::ui::browser::BrowserScreen;
use crate::ui::monitor::MonitorScreen;
use crate::ui::render;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Browser,
    Monitor,
}

/// What the shell should do after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    Render,
    Print(String),
    Quit,
}

pub struct AppState {
    browser: BrowserScreen,
    monitor: MonitorScreen,
    notifications: Arc<NotificationCenter>,
    screen: Screen,
    initial_backend: Backend,
}

impl AppState {
    pub fn new(
        config: &AppConfig,
        storage: Arc<dyn StorageApi>,
        monitor: Arc<dyn MonitorApi>,
    ) -> Self {
        let notifications = Arc::new(NotificationCenter::new());

        let browser = BrowserScreen::new(
            StorageGateway::new(storage, notifications.clone()),
            config.default_backend,
            config.editor.structured_values,
            config.search.n_results,
        );
        let monitor = MonitorScreen::new(
            MonitorGateway::new(monitor, notifications.clone()),
            config.monitor.clone(),
        );

        Self {
            browser,
            monitor,
            notifications,
            screen: Screen::Browser,
            initial_backend: config.default_backend,
        }
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    /// Loads the configured backend's databases and cascades from there.
    pub async fn start(&self) {
        self.browser.select_backend(self.initial_backend).await;
    }

    pub async fn execute(&mut self, command: Command) -> Flow {
        log::debug!("Executing {:?}", command);

        match command {
            Command::Backend(backend) => {
                self.show_browser();
                self.browser.select_backend(backend).await;
            }
            Command::Database(name) => {
                self.show_browser();
                self.browser.select_database(&name).await;
            }
            Command::Collection(name) => {
                self.show_browser();
                self.browser.select_collection(&name).await;
            }
            Command::Search(pattern) => {
                self.show_browser();
                self.browser.search(&pattern).await;
            }
            Command::Similar { query, n_results } => {
                self.show_browser();
                self.browser.similar(&query, n_results).await;
            }
            Command::Add { key, value } => {
                self.show_browser();
                self.browser.add(&key, &value).await;
            }
            Command::Edit { key, value } => {
                self.show_browser();
                self.browser.edit(&key, &value).await;
            }
            Command::Delete(key) => {
                self.show_browser();
                self.browser.delete(&key).await;
            }
            Command::Close => self.browser.modal().close(),
            Command::Refresh => match self.screen {
                Screen::Browser => {
                    self.browser.refresh().await;
                }
                Screen::Monitor => self.monitor.refresh().await,
            },
            Command::Browser => self.show_browser(),
            Command::Monitor => self.show_monitor(),
            Command::Containers => {
                self.show_monitor();
                self.monitor.refresh().await;
            }
            Command::Logs(id) => {
                self.show_monitor();
                self.monitor.select_container(&id);
            }
            Command::Unlog => self.monitor.deselect_container(),
            Command::Action(action, id) => {
                self.show_monitor();
                self.monitor.action(&id, action).await;
            }
            Command::Show => {}
            Command::Help => return Flow::Print(HELP.to_string()),
            Command::Quit => {
                self.monitor.unmount();
                return Flow::Quit;
            }
        }

        Flow::Render
    }

    pub fn render(&self) -> String {
        match self.screen {
            Screen::Browser => {
                let modal = self.browser.modal();
                let title = modal.title();
                let form = modal.form();
                let form = modal.is_open().then_some((title.as_str(), &form));
                render::browser(&self.browser.snapshot(), form)
            }
            Screen::Monitor => self
                .monitor
                .with_state(|state| render::monitor(state, self.monitor.config())),
        }
    }

    fn show_browser(&mut self) {
        if self.screen == Screen::Monitor {
            self.monitor.unmount();
            self.screen = Screen::Browser;
        }
    }

    fn show_monitor(&mut self) {
        self.monitor.mount();
        self.screen = Screen::Monitor;
    }
}

/// Reads commands line by line until `quit` or end of input, printing the
/// active screen and pending notifications after each one.
pub async fn run_shell<R, W>(app: &mut AppState, input: R, out: &mut W) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();

    write!(out, "{}", app.render())?;
    flush_notifications(app, out)?;

    loop {
        write!(out, "> ")?;
        out.flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match Command::parse(&line) {
            Ok(None) => continue,
            Ok(Some(command)) => match app.execute(command).await {
                Flow::Render => write!(out, "{}", app.render())?,
                Flow::Print(text) => writeln!(out, "{}", text)?,
                Flow::Quit => break,
            },
            Err(err) => writeln!(out, "{}", err)?,
        }

        flush_notifications(app, out)?;
    }

    app.monitor.unmount();
    Ok(())
}

fn flush_notifications<W: Write>(app: &AppState, out: &mut W) -> io::Result<()> {
    let pending = app.notifications.drain();
    if !pending.is_empty() {
        write!(out, "{}", render::notifications(&pending))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use storeflux_test_support::fixtures::{sample_monitor, sample_storage};
    use storeflux_test_support::{FakeMonitor, FakeStorage, StorageOp};

    fn app(storage: &FakeStorage, monitor: &FakeMonitor) -> AppState {
        AppState::new(
            &AppConfig::default(),
            storage.clone().as_api_arc(),
            monitor.clone().as_api_arc(),
        )
    }

    async fn run(app: &mut AppState, script: &str) -> String {
        let mut out = Vec::new();
        run_shell(app, script.as_bytes(), &mut out).await.unwrap();
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn start_loads_default_backend() {
        let storage = sample_storage();
        let app = app(&storage, &sample_monitor());

        app.start().await;

        let text = app.render();
        assert!(text.contains("Backend: Key-Value"));
        assert!(text.contains("Database: db0 [db0, db1]"));
        assert!(text.contains("foo1"));
    }

    #[tokio::test]
    async fn shell_runs_search_and_add() {
        let storage = sample_storage();
        let mut app = app(&storage, &sample_monitor());
        app.start().await;

        let output = run(&mut app, "search foo*\nadd foo9 {\"a\":1}\nquit\n").await;

        assert!(output.contains("Search: foo*"));
        assert!(output.contains("foo9"));
        assert_eq!(storage.value("sessions", "foo9").map(|v| v.is_structured()), Some(true));
        assert_eq!(storage.count(StorageOp::Set), 1);
    }

    #[tokio::test]
    async fn shell_reports_parse_errors_and_notifications() {
        let storage = sample_storage();
        let mut app = app(&storage, &sample_monitor());
        app.start().await;

        let output = run(&mut app, "bogus\nsimilar cats\n").await;

        assert!(output.contains("Unknown command 'bogus'"));
        assert!(output.contains("warn Operation not supported: similarity search"));
    }

    #[tokio::test]
    async fn monitor_commands_switch_screens() {
        let storage = sample_storage();
        let monitor = sample_monitor();
        let mut app = app(&storage, &monitor);

        assert_eq!(app.execute(Command::Containers).await, Flow::Render);
        assert_eq!(app.screen(), Screen::Monitor);
        assert!(app.render().contains("web"));

        app.execute(Command::Backend(Backend::Document)).await;
        assert_eq!(app.screen(), Screen::Browser);
        assert!(app.render().contains("Collection: events"));

        assert_eq!(app.execute(Command::Quit).await, Flow::Quit);
    }
}
