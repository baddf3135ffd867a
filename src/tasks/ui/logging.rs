/* ************************************************************************ **
** This file is part of qr-eigen, and is licensed under EITHER the MIT      **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

use crate::FailResult;

use ::log::{Level, LevelFilter};
use ::std::fmt;
use ::std::path::{Path, PathBuf};

/// Builder-style setup for logging
#[derive(Debug, Clone, Default)]
pub struct GlobalLogger {
    path: Option<PathBuf>,
    verbosity: Verbosity,
    quiet: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Verbosity { Default, Loud, Louder }

impl Default for Verbosity {
    fn default() -> Self { Verbosity::Default }
}

impl GlobalLogger {
    /// Also write everything to this file.
    pub fn path<P: AsRef<Path>>(&mut self, path: P) -> &mut Self
    { self.path = Some(path.as_ref().to_owned()); self }

    /// Any integer will be accepted; the level will be truncated
    /// to the most extreme value supported.
    pub fn verbosity(&mut self, level: u64) -> &mut Self
    {
        self.verbosity = match level {
            0 => Verbosity::Default,
            1 => Verbosity::Loud,
            _ => Verbosity::Louder,
        };
        self
    }

    /// Only warnings and errors. Used on MPI ranks other than the coordinator.
    pub fn quiet(&mut self, quiet: bool) -> &mut Self
    { self.quiet = quiet; self }

    fn library_level(&self) -> LevelFilter {
        match (self.quiet, self.verbosity) {
            (true, _) => LevelFilter::Warn,
            (false, Verbosity::Default) => LevelFilter::Info,
            (false, Verbosity::Loud) => LevelFilter::Debug,
            (false, Verbosity::Louder) => LevelFilter::Trace,
        }
    }

    /// Installs the logger. Fails if called a second time.
    pub fn apply(&mut self) -> FailResult<()>
    {Ok({
        use ::std::time::Instant;

        let start = Instant::now();
        let color = crate::env::log_color()?;
        let show_mod = crate::env::log_mod()?;
        let level = self.library_level();

        let mut fern = ::fern::Dispatch::new();
        fern = fern.format(move |out, message, record| {
                let t = start.elapsed();
                let level = ColorizedLevel { level: record.level(), color };
                match show_mod {
                    true => out.finish(format_args!("[{:>4}.{:03}s][{}][{}] {}",
                        t.as_secs(),
                        t.subsec_millis(),
                        record.target(),
                        level,
                        message)),
                    false => out.finish(format_args!("[{:>4}.{:03}s][{}] {}",
                        t.as_secs(),
                        t.subsec_millis(),
                        level,
                        message)),
                }
            })
            .level(match self.quiet {
                true => LevelFilter::Warn,
                false => LevelFilter::Info,
            })
            .level_for("qr_eigen_tasks", level)
            .level_for("qr_eigen_linalg", level)
            .level_for("qr_eigen_comm", level)
            .chain(::std::io::stderr());

        if let Some(path) = self.path.as_ref() {
            fern = fern.chain(::fern::log_file(path)?);
        }

        fern.apply()?;
    })}
}

#[derive(Debug, Copy, Clone)]
pub struct ColorizedLevel {
    pub level: Level,
    pub color: bool,
}

impl fmt::Display for ColorizedLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if !self.color {
            return write!(f, "{}", self.level);
        }
        let style = match self.level {
            Level::Error => ::ansi_term::Colour::Red.bold(),
            Level::Warn  => ::ansi_term::Colour::Red.normal(),
            Level::Info  => ::ansi_term::Colour::Cyan.bold(),
            Level::Debug => ::ansi_term::Colour::Yellow.dimmed(),
            Level::Trace => ::ansi_term::Colour::Cyan.normal(),
        };
        write!(f, "{}", style.paint(self.level.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels() {
        assert_eq!(GlobalLogger::default().library_level(), LevelFilter::Info);
        assert_eq!(GlobalLogger::default().verbosity(1).library_level(), LevelFilter::Debug);
        assert_eq!(GlobalLogger::default().verbosity(7).library_level(), LevelFilter::Trace);
        assert_eq!(GlobalLogger::default().verbosity(2).quiet(true).library_level(), LevelFilter::Warn);
    }

    #[test]
    fn plain_level() {
        let level = ColorizedLevel { level: Level::Warn, color: false };
        assert_eq!(level.to_string(), "WARN");
    }
}
