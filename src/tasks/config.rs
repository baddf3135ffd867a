/* ************************************************************************ **
** This file is part of qr-eigen, and is licensed under EITHER the MIT      **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! Run settings, as read from YAML and overridden on the command line.

use crate::FailResult;

use ::qr_eigen_linalg::{Mode, StopCondition, DEFAULT_ITERATIONS};
use ::std::path::{Path, PathBuf};
use ::std::str::FromStr;

/// Largest accepted `max-number`; beyond it the sampling interval overflows.
pub const MAX_NUMBER_LIMIT: f64 = ::std::f64::MAX / 2.0;

/// Raw settings.
///
/// Everything is optional here so that a config file and the command line
/// can each supply part of it. Call [`Settings::validate`] before use.
#[derive(Serialize, Deserialize)]
#[derive(Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Settings {
    /// Number of rows (and columns) of the generated matrix.
    #[serde(default)]
    pub size: Option<usize>,

    /// Entries are drawn uniformly from `[-max_number, max_number]`.
    #[serde(default = "self::defaults::settings::max_number")]
    pub max_number: f64,

    /// Print A, Q, R, QR and the eigenvalue estimate.
    #[serde(default)]
    pub display: bool,

    /// Append `size,seconds` to this file after factorizing.
    #[serde(default)]
    pub output: Option<PathBuf>,

    #[serde(default)]
    pub mode: ModeKind,

    /// Rayon threads for `shared-memory`. Defaults to the number of CPUs.
    #[serde(default)]
    pub threads: Option<usize>,

    /// Ranks for `distributed`.
    ///
    /// When absent, an MPI build runs on the MPI world; otherwise this
    /// defaults to the number of CPUs.
    #[serde(default)]
    pub processes: Option<usize>,

    #[serde(default = "self::defaults::settings::iterations")]
    pub iterations: usize,

    /// Stop the eigenvalue iteration early once the diagonal moves by no
    /// more than this.
    #[serde(default)]
    pub tolerance: Option<f64>,

    /// Replaces `iterations` and `tolerance` entirely.
    #[serde(default)]
    pub stop_condition: Option<StopCondition>,

    #[serde(default)]
    pub seed: Option<u32>,
}

mod defaults {
    pub(crate) mod settings {
        pub(crate) fn max_number() -> f64 { 100.0 }
        pub(crate) fn iterations() -> usize { ::qr_eigen_linalg::DEFAULT_ITERATIONS }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            size: None,
            max_number: defaults::settings::max_number(),
            display: false,
            output: None,
            mode: ModeKind::default(),
            threads: None,
            processes: None,
            iterations: DEFAULT_ITERATIONS,
            tolerance: None,
            stop_condition: None,
            seed: None,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ModeKind {
    Sequential,
    SharedMemory,
    Distributed,
}

impl Default for ModeKind {
    fn default() -> Self { ModeKind::Sequential }
}

impl FromStr for ModeKind {
    type Err = ::failure::Error;

    fn from_str(s: &str) -> FailResult<ModeKind> {
        Ok(match s {
            "sequential" => ModeKind::Sequential,
            "shared-memory" => ModeKind::SharedMemory,
            "distributed" => ModeKind::Distributed,
            _ => bail!("invalid mode {:?} (expected sequential, shared-memory or distributed)", s),
        })
    }
}

/// Where the ranks of a distributed run come from.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Ranks {
    /// This many threads in the current process.
    Local(usize),
    /// Every process of the MPI world.
    MpiWorld,
}

/// How the work gets executed, after defaults have been filled in.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Execution {
    Sequential,
    SharedMemory { threads: usize },
    Distributed(Ranks),
}

impl Execution {
    /// `None` for runs that have to be driven over MPI.
    pub fn local_mode(&self) -> Option<Mode> {
        match *self {
            Execution::Sequential => Some(Mode::Sequential),
            Execution::SharedMemory { threads } => Some(Mode::SharedMemory { threads }),
            Execution::Distributed(Ranks::Local(processes)) => Some(Mode::Distributed { processes }),
            Execution::Distributed(Ranks::MpiWorld) => None,
        }
    }
}

/// Settings that passed validation, with every default resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedSettings {
    pub size: usize,
    pub max_number: f64,
    pub display: bool,
    pub output: Option<PathBuf>,
    pub execution: Execution,
    pub stop: StopCondition,
    pub seed: Option<u32>,
}

impl Settings {
    /// Reads YAML, warning about keys that nothing uses.
    pub fn from_yaml_str(text: &str) -> FailResult<Settings> {
        if text.trim().is_empty() {
            return Ok(Settings::default());
        }
        let value: ::serde_yaml::Value = ::serde_yaml::from_str(text)?;
        if value == ::serde_yaml::Value::Null {
            return Ok(Settings::default());
        }
        let settings = ::serde_ignored::deserialize(
            value,
            |path| warn!("Unused config item (possible typo?): {}", path),
        )?;
        Ok(settings)
    }

    pub fn from_yaml_file(path: &Path) -> FailResult<Settings> {
        let text = ::std::fs::read_to_string(path)
            .map_err(|e| format_err!("could not read {}: {}", path.display(), e))?;
        Settings::from_yaml_str(&text)
    }

    pub fn validate(self) -> FailResult<ValidatedSettings> {
        let size = match self.size {
            None => bail!("the matrix size is required (-n/--size)"),
            Some(0) => bail!("the matrix size must be positive"),
            Some(n) => n,
        };
        if !(self.max_number.is_finite() && self.max_number > 0.0) {
            bail!("max-number must be a positive number, got {}", self.max_number);
        }
        // entries are drawn from an interval of width 2 * max-number
        if self.max_number > MAX_NUMBER_LIMIT {
            bail!("max-number must be at most {:e}, got {:e}", MAX_NUMBER_LIMIT, self.max_number);
        }
        if let Some(tol) = self.tolerance {
            if !(tol.is_finite() && tol >= 0.0) {
                bail!("tolerance must be a non-negative number, got {}", tol);
            }
        }

        let execution = match self.mode {
            ModeKind::Sequential => Execution::Sequential,
            ModeKind::SharedMemory => Execution::SharedMemory {
                threads: positive_count("threads", self.threads)?
                    .unwrap_or_else(crate::env::default_num_threads),
            },
            ModeKind::Distributed => Execution::Distributed({
                match positive_count("processes", self.processes)? {
                    Some(n) => Ranks::Local(n),
                    None => crate::env::default_ranks(),
                }
            }),
        };
        if self.mode != ModeKind::SharedMemory && self.threads.is_some() {
            warn!("--threads has no effect in {:?} mode", self.mode);
        }
        if self.mode != ModeKind::Distributed && self.processes.is_some() {
            warn!("--processes has no effect in {:?} mode", self.mode);
        }

        let stop = match (self.stop_condition, self.tolerance) {
            (Some(cond), _) => cond,
            (None, Some(tol)) => StopCondition::converged_or_exhausted(self.iterations, tol),
            (None, None) => StopCondition::Iterations(self.iterations),
        };

        Ok(ValidatedSettings {
            size,
            max_number: self.max_number,
            display: self.display,
            output: self.output,
            execution,
            stop,
            seed: self.seed,
        })
    }
}

fn positive_count(name: &str, value: Option<usize>) -> FailResult<Option<usize>> {
    match value {
        Some(0) => bail!("{} must be at least 1", name),
        v => Ok(v),
    }
}
