/* ************************************************************************ **
** This file is part of qr-eigen, and is licensed under EITHER the MIT      **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! The command-line interface.

use crate::FailResult;
use crate::config::Settings;

use ::clap::{App, Arg, ArgMatches};
use ::std::path::PathBuf;
use ::std::str::FromStr;

/// Options that only affect the process, not the computation.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config: Option<PathBuf>,
    pub log: Option<PathBuf>,
    pub verbosity: u64,
}

pub fn app() -> App<'static, 'static> {
    App::new("qr-eigen")
        .version(crate_version!())
        .about("QR factorization of a random square matrix by Gram-Schmidt, \
                followed by the unshifted QR eigenvalue iteration.")
        .args(&[
            Arg::with_name("size").short("n").long("size").takes_value(true).value_name("SIZE")
                .help("size of matrix (required, here or in the config)"),
            Arg::with_name("max_number").short("m").long("max-number").takes_value(true)
                .value_name("MAX")
                .help("maximum magnitude of a cell in the generated matrix [default: 100]"),
            Arg::with_name("display").short("v").long("display")
                .help("display A, Q, R, A = QR and the eigenvalue estimate"),
            Arg::with_name("output").short("o").long("output").takes_value(true).value_name("FILE")
                .help("append size and execution time to FILE (in csv format)"),
            Arg::with_name("mode").long("mode").takes_value(true).value_name("MODE")
                .possible_values(&["sequential", "shared-memory", "distributed"])
                .help("how the factorization is executed [default: sequential]"),
            Arg::with_name("threads").long("threads").takes_value(true).value_name("N")
                .help("threads for shared-memory mode [default: number of CPUs]"),
            Arg::with_name("processes").long("processes").takes_value(true).value_name("N")
                .help("in-process ranks for distributed mode"),
            Arg::with_name("iterations").long("iterations").takes_value(true).value_name("N")
                .help("iterations of the eigenvalue algorithm [default: 10]"),
            Arg::with_name("tolerance").long("tolerance").takes_value(true).value_name("TOL")
                .help("stop iterating early once no diagonal entry moves by more than TOL"),
            Arg::with_name("seed").long("seed").takes_value(true).value_name("SEED")
                .help("seed for the random matrix"),
            Arg::with_name("config").short("c").long("config").takes_value(true).value_name("FILE")
                .help("YAML settings; command-line options take precedence"),
            Arg::with_name("log").long("log").takes_value(true).value_name("FILE")
                .help("also write the log to FILE"),
            Arg::with_name("verbose").long("verbose").multiple(true)
                .help("more log output (repeatable)"),
        ])
}

impl CliArgs {
    pub fn from_matches(m: &ArgMatches) -> CliArgs {
        CliArgs {
            config: m.value_of_os("config").map(PathBuf::from),
            log: m.value_of_os("log").map(PathBuf::from),
            verbosity: m.occurrences_of("verbose"),
        }
    }
}

fn parse<T>(m: &ArgMatches, name: &str) -> FailResult<Option<T>>
where
    T: FromStr,
    T::Err: ::std::fmt::Display,
{
    match m.value_of(name) {
        None => Ok(None),
        Some(s) => match s.parse() {
            Ok(x) => Ok(Some(x)),
            Err(e) => bail!("invalid value {:?} for --{}: {}", s, name.replace('_', "-"), e),
        },
    }
}

/// Overwrite everything in `settings` that was given on the command line.
pub fn apply_overrides(settings: &mut Settings, m: &ArgMatches) -> FailResult<()> {
    if let Some(x) = parse(m, "size")? { settings.size = Some(x); }
    if let Some(x) = parse(m, "max_number")? { settings.max_number = x; }
    if m.is_present("display") { settings.display = true; }
    if let Some(x) = m.value_of_os("output") { settings.output = Some(PathBuf::from(x)); }
    if let Some(x) = parse(m, "mode")? { settings.mode = x; }
    if let Some(x) = parse(m, "threads")? { settings.threads = Some(x); }
    if let Some(x) = parse(m, "processes")? { settings.processes = Some(x); }
    if let Some(x) = parse(m, "iterations")? {
        settings.iterations = x;
        settings.stop_condition = None;
    }
    if let Some(x) = parse(m, "tolerance")? {
        settings.tolerance = Some(x);
        settings.stop_condition = None;
    }
    if let Some(x) = parse(m, "seed")? { settings.seed = Some(x); }
    Ok(())
}
