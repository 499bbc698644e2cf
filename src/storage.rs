use chrono::Local;
use std::env;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

const LOG_FILE: &str = "execution_log.txt";

/// `$XDG_DATA_HOME/pfactor`, falling back to `$HOME/.local/share/pfactor`.
pub fn get_data_dir() -> io::Result<PathBuf> {
    let data_home = env::var("XDG_DATA_HOME")
        .ok()
        .filter(|path| !path.is_empty())
        .map(PathBuf::from)
        .or_else(|| {
            env::var("HOME")
                .ok()
                .map(|home| PathBuf::from(home).join(".local/share"))
        })
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                "could not determine data directory (XDG_DATA_HOME and HOME unset)",
            )
        })?;

    Ok(data_home.join("pfactor"))
}

/// One line of the execution log.
#[derive(Debug, Clone)]
pub struct Execution<'a> {
    pub subcommand: &'a str,
    pub inputs: usize,
    pub capacity: usize,
    pub duration: Duration,
}

/// Append `execution` to the log in the default data directory.
pub fn log_execution(execution: &Execution<'_>) -> io::Result<PathBuf> {
    let data_dir = get_data_dir()?;
    log_execution_in(&data_dir, execution)
}

/// Append `execution` to `<data_dir>/execution_log.txt`, creating the
/// directory if needed.
pub fn log_execution_in(data_dir: &Path, execution: &Execution<'_>) -> io::Result<PathBuf> {
    fs::create_dir_all(data_dir)?;

    let log_path = data_dir.join(LOG_FILE);
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");

    writeln!(
        file,
        "{} | {} | {} | c{} | {}us",
        timestamp,
        execution.subcommand,
        execution.inputs,
        execution.capacity,
        execution.duration.as_micros()
    )?;

    Ok(log_path)
}
