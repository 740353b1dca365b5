use directories::ProjectDirs;
use env_logger::{Builder, Target};
use log::LevelFilter;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use crate::{ConfigError, Result};

const LOG_FILE_NAME: &str = "cranectl.log";

/// Set up `env_logger` for `cranectl`.
///
/// Records always land in `cranectl.log` under the local data directory
/// (`~/.local/share/cranectl` on Linux, `~/Library/Application Support/io.gocrane.cranectl`
/// on macOS), or the working directory when no home is known. Unless `quiet`
/// is set they are mirrored to stdout. `RUST_LOG` overrides the level chosen
/// from `verbose`.
pub fn init_logger(verbose: bool, quiet: bool) -> Result<()> {
    let path = log_path()?;
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| ConfigError::FileError(format!("cannot open {}: {e}", path.display())))?;

    let sink: Box<dyn Write + Send> = if quiet {
        Box::new(file)
    } else {
        Box::new(Mirror { file })
    };

    Builder::new()
        .filter_level(level(verbose))
        .parse_default_env()
        .format_timestamp_secs()
        .target(Target::Pipe(sink))
        .init();

    log::debug!("Writing log records to {}", path.display());
    Ok(())
}

fn level(verbose: bool) -> LevelFilter {
    match verbose {
        true => LevelFilter::Debug,
        false => LevelFilter::Info,
    }
}

fn log_path() -> Result<PathBuf> {
    let dir = match ProjectDirs::from("io", "gocrane", "cranectl") {
        Some(dirs) => dirs.data_local_dir().to_path_buf(),
        None => std::env::current_dir()
            .map_err(|e| ConfigError::FileError(format!("no working directory: {e}")))?,
    };
    fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::FileError(format!("cannot create {}: {e}", dir.display())))?;
    Ok(dir.join(LOG_FILE_NAME))
}

/// Copies every record to stdout as well as the log file
struct Mirror<W> {
    file: W,
}

impl<W: Write> Write for Mirror<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stdout().write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stdout().flush()?;
        self.file.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mirror_keeps_file_copy() {
        let mut writer = Mirror { file: Vec::new() };
        writer.write_all(b"hello\n").unwrap();
        writer.flush().unwrap();
        assert_eq!(writer.file, b"hello\n");
    }

    #[test]
    fn verbose_selects_debug() {
        assert_eq!(level(true), LevelFilter::Debug);
        assert_eq!(level(false), LevelFilter::Info);
    }
}
