use storeflux_core::{Backend, ContainerAction};
use thiserror::Error;

pub const HELP: &str = "\
Browser:
  backend <key-value|document|vector>   switch backend
  db <name>                             select database
  collection <name>                     select collection
  search [pattern]                      filter keys (glob, empty = all)
  similar <query> [n]                   similarity search (vector backend)
  add <key> <value>                     create an item
  edit <key> <value>                    replace an item's value
  delete <key>                          delete an item
  close                                 discard the item form
  refresh                               reload the current view
  browser                               show the browser

Monitor:
  monitor                               open the monitor (starts polling)
  containers                            refresh stats and containers
  logs <id>                             tail a container's logs
  unlog                                 stop tailing logs
  start|stop|restart <id>               container actions

  show   help   quit";

/// A line typed into the shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Backend(Backend),
    Database(String),
    Collection(String),
    Search(String),
    Similar { query: String, n_results: Option<u32> },
    Add { key: String, value: String },
    Edit { key: String, value: String },
    Delete(String),
    Close,
    Refresh,
    Browser,
    Monitor,
    Containers,
    Logs(String),
    Unlog,
    Action(ContainerAction, String),
    Show,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Unknown command '{0}' (try 'help')")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("{0}")]
    Invalid(String),
}

impl Command {
    pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let (name, rest) = split_word(line);

        let command = match name.to_ascii_lowercase().as_str() {
            "backend" => {
                let backend = required(rest, "backend <key-value|document|vector>")?
                    .parse()
                    .map_err(|e: storeflux_core::StoreError| CommandError::Invalid(e.to_string()))?;
                Command::Backend(backend)
            }
            "db" | "database" => Command::Database(required(rest, "db <name>")?.to_string()),
            "collection" | "col" => {
                Command::Collection(required(rest, "collection <name>")?.to_string())
            }
            "search" => Command::Search(rest.to_string()),
            "similar" => parse_similar(rest)?,
            "add" => {
                let (key, value) = key_value(rest, "add <key> <value>")?;
                Command::Add { key, value }
            }
            "edit" => {
                let (key, value) = key_value(rest, "edit <key> <value>")?;
                Command::Edit { key, value }
            }
            "delete" | "del" => Command::Delete(required(rest, "delete <key>")?.to_string()),
            "close" => Command::Close,
            "refresh" => Command::Refresh,
            "browser" => Command::Browser,
            "monitor" => Command::Monitor,
            "containers" => Command::Containers,
            "logs" => Command::Logs(required(rest, "logs <container-id>")?.to_string()),
            "unlog" => Command::Unlog,
            "start" | "stop" | "restart" => {
                let action = name
                    .parse()
                    .map_err(|e: storeflux_core::StoreError| CommandError::Invalid(e.to_string()))?;
                let id = required(rest, "start|stop|restart <container-id>")?;
                Command::Action(action, id.to_string())
            }
            "show" | "ls" => Command::Show,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };

        Ok(Some(command))
    }
}

fn split_word(input: &str) -> (&str, &str) {
    match input.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (input, ""),
    }
}

fn required<'a>(rest: &'a str, usage: &'static str) -> Result<&'a str, CommandError> {
    if rest.is_empty() {
        Err(CommandError::Usage(usage))
    } else {
        Ok(rest)
    }
}

/// The value keeps its inner whitespace so JSON can be typed verbatim.
fn key_value(rest: &str, usage: &'static str) -> Result<(String, String), CommandError> {
    let (key, value) = split_word(required(rest, usage)?);
    if value.is_empty() {
        return Err(CommandError::Usage(usage));
    }
    Ok((key.to_string(), value.to_string()))
}

fn parse_similar(rest: &str) -> Result<Command, CommandError> {
    let rest = required(rest, "similar <query> [n]")?;

    if let Some((query, last)) = rest.rsplit_once(char::is_whitespace)
        && let Ok(n) = last.parse::<u32>()
    {
        return Ok(Command::Similar {
            query: query.trim().to_string(),
            n_results: Some(n),
        });
    }

    Ok(Command::Similar {
        query: rest.to_string(),
        n_results: None,
    })
}
