/* ************************************************************************ **
** This file is part of qr-eigen, and is licensed under EITHER the MIT      **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

use crate::FailResult;
use crate::config::Ranks;
use ::std::env;

fn var(key: &str) -> FailResult<Option<String>>
{ match env::var(key) {
    Ok(s) => Ok(Some(s)),
    Err(env::VarError::NotPresent) => Ok(None),
    Err(env::VarError::NotUnicode(s)) => bail!("env var not unicode: {}={:?}", key, s),
}}

fn nonempty_var(key: &str) -> FailResult<Option<String>>
{ match var(key) {
    Ok(Some(ref s)) if s == "" => Ok(None),
    r => r,
}}

/// Colored log levels, unless `NO_COLOR` is set to anything.
pub fn log_color() -> FailResult<bool>
{ Ok(nonempty_var("NO_COLOR")?.is_none()) }

/// Show module names in log output.
pub fn log_mod() -> FailResult<bool>
{Ok({
    match nonempty_var("QR_EIGEN_LOG_MOD")? {
        None => false,
        Some(s) => match &s[..] {
            "1" => true,
            "0" => false,
            _ => bail!("Invalid setting for QR_EIGEN_LOG_MOD: {:?}", s),
        },
    }
})}

/// Thread count when `--threads` is not given.
pub fn default_num_threads() -> usize { ::num_cpus::get() }

/// Ranks of a distributed run when `--processes` is not given.
#[cfg(feature = "mpi-support")]
pub fn default_ranks() -> Ranks { Ranks::MpiWorld }

#[cfg(not(feature = "mpi-support"))]
pub fn default_ranks() -> Ranks { Ranks::Local(::num_cpus::get()) }
