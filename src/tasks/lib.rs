/* ************************************************************************ **
** This file is part of qr-eigen, and is licensed under EITHER the MIT      **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! The `qr-eigen` program: configuration, logging, and reporting around
//! `qr-eigen-linalg`.

#[macro_use]
extern crate log;
#[macro_use]
extern crate failure;
#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate clap;
#[cfg(test)]
#[macro_use]
extern crate qr_eigen_assert_close;

pub type FailResult<T> = Result<T, ::failure::Error>;

pub use crate::config::{Execution, ModeKind, Ranks, Settings, ValidatedSettings};
pub mod config;

pub mod entry_points;
pub mod report;
pub mod run;

mod env;
mod ui;
