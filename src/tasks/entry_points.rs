/* ************************************************************************ **
** This file is part of qr-eigen, and is licensed under EITHER the MIT      **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

use crate::FailResult;
use crate::config::Settings;
use crate::ui::cli::{self, CliArgs};
use crate::ui::logging::GlobalLogger;

use ::std::ffi::OsStr;

fn wrap_result_main<F>(main: F)
where F: FnOnce() -> FailResult<()>,
{
    main().unwrap_or_else(|e| {
        for cause in e.iter_chain() {
            error!("{}", cause);
        }

        if ::std::env::var_os("RUST_BACKTRACE") == Some(OsStr::new("1").to_owned()) {
            error!("{}", e.backtrace());
        }
        ::std::process::exit(1);
    });
}

fn init_logger(args: &CliArgs, quiet: bool) -> FailResult<()> {
    let mut logger = GlobalLogger::default();
    logger.verbosity(args.verbosity).quiet(quiet);
    if let Some(path) = &args.log {
        logger.path(path);
    }
    logger.apply()
}

fn load_settings(args: &CliArgs, matches: &::clap::ArgMatches) -> FailResult<Settings> {
    let mut settings = match &args.config {
        Some(path) => Settings::from_yaml_file(path)?,
        None => Settings::default(),
    };
    cli::apply_overrides(&mut settings, matches)?;
    Ok(settings)
}

#[cfg(feature = "mpi-support")]
fn start(args: &CliArgs, matches: &::clap::ArgMatches) -> FailResult<()> {
    let session = crate::run::MpiSession::init()?;
    init_logger(args, !session.role().is_coordinator())?;

    let settings = load_settings(args, matches)?.validate()?;
    debug!("{:?}", settings);
    session.run(&settings)
}

#[cfg(not(feature = "mpi-support"))]
fn start(args: &CliArgs, matches: &::clap::ArgMatches) -> FailResult<()> {
    init_logger(args, false)?;

    let settings = load_settings(args, matches)?.validate()?;
    debug!("{:?}", settings);
    crate::run::run(&settings)
}

// %% CRATES: binary: qr-eigen %%
pub fn qr_eigen() {
    wrap_result_main(|| {
        let matches = cli::app().get_matches();
        let args = CliArgs::from_matches(&matches);
        start(&args, &matches)
    });
}
