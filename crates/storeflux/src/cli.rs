use std::path::PathBuf;
use thiserror::Error;

pub const USAGE: &str = "\
Usage: storeflux [OPTIONS]

Options:
  --api-url <URL>     Base URL of the storage/monitor API
  --backend <NAME>    Initial backend: key-value, document or vector
  --config <PATH>     Config file (default: platform config dir)
  -h, --help          Print this help
";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CliError {
    #[error("Unknown option '{0}'")]
    UnknownOption(String),

    #[error("Option '{0}' requires a value")]
    MissingValue(String),
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct CliArgs {
    pub api_url: Option<String>,
    pub backend: Option<String>,
    pub config_path: Option<PathBuf>,
    pub help: bool,
}

impl CliArgs {
    /// Parses arguments, excluding the program name.
    pub fn parse<I>(args: I) -> Result<Self, CliError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut parsed = CliArgs::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            let (flag, inline) = match arg.split_once('=') {
                Some((flag, value)) if flag.starts_with("--") => {
                    (flag.to_string(), Some(value.to_string()))
                }
                _ => (arg.clone(), None),
            };

            match flag.as_str() {
                "-h" | "--help" => parsed.help = true,
                "--api-url" => parsed.api_url = Some(value(&flag, inline, &mut args)?),
                "--backend" => parsed.backend = Some(value(&flag, inline, &mut args)?),
                "--config" => {
                    parsed.config_path = Some(PathBuf::from(value(&flag, inline, &mut args)?))
                }
                _ => return Err(CliError::UnknownOption(arg)),
            }
        }

        Ok(parsed)
    }
}

fn value(
    flag: &str,
    inline: Option<String>,
    args: &mut impl Iterator<Item = String>,
) -> Result<String, CliError> {
    inline
        .or_else(|| args.next())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| CliError::MissingValue(flag.to_string()))
}
