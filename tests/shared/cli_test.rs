/* ************************************************************************ **
** This file is part of qr-eigen, and is licensed under EITHER the MIT      **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! Runs the `qr-eigen` binary in a temporary directory.

use ::failure::Error;
use ::std::ffi::{OsStr, OsString};
use ::std::path::Path;
use ::std::process::Command;
use ::tempdir::TempDir;

pub type Result<T> = ::std::result::Result<T, Error>;

/// What a finished run left behind.
pub struct Output<'a> {
    pub dir: &'a Path,
    pub stdout: &'a str,
    pub stderr: &'a str,
}

pub type Checker = Box<dyn Fn(&Output<'_>) -> Result<()>>;

#[must_use]
pub struct CliTest {
    cmd: Vec<OsString>,
    files: Vec<(String, String)>,
    expect_success: Option<bool>,
    checkers: Vec<Checker>,
}

impl CliTest {
    pub fn qr_eigen() -> Self {
        CliTest {
            cmd: vec![env!("CARGO_BIN_EXE_qr-eigen").into()],
            files: vec![],
            expect_success: Some(true),
            checkers: vec![],
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.cmd.push(arg.as_ref().into());
        self
    }

    pub fn args<S: AsRef<OsStr>>(mut self, args: &[S]) -> Self {
        self.cmd.extend(args.iter().map(|s| s.as_ref().to_owned()));
        self
    }

    /// Write a file into the working directory before running.
    pub fn file(mut self, name: &str, contents: &str) -> Self {
        self.files.push((name.to_owned(), contents.to_owned()));
        self
    }

    pub fn expect_success(mut self, success: bool) -> Self {
        self.expect_success = Some(success);
        self
    }

    pub fn check<F>(mut self, checker: F) -> Self
    where F: Fn(&Output<'_>) -> Result<()> + 'static,
    {
        self.checkers.push(Box::new(checker));
        self
    }

    pub fn run(self) -> Result<()> {
        let CliTest { cmd, files, expect_success, checkers } = self;

        let tmp = TempDir::new("qr-eigen")?;
        for (name, contents) in &files {
            ::std::fs::write(tmp.path().join(name), contents)?;
        }

        let output = {
            let mut args = cmd;
            let bin = args.remove(0);

            let mut cmd = Command::new(&bin);
            cmd.args(&args);
            cmd.current_dir(tmp.path());
            cmd.env("NO_COLOR", "1");
            println!("Running {:?}", cmd);
            cmd.output()?
        };
        let stdout = String::from_utf8(output.stdout)?;
        let stderr = String::from_utf8(output.stderr)?;
        print!("{}", stdout);
        eprint!("{}", stderr);

        if let Some(success) = expect_success {
            assert_eq!(success, output.status.success(), "{}", output.status);
        }

        let output = Output { dir: tmp.path(), stdout: &stdout, stderr: &stderr };
        for checker in checkers {
            checker(&output)?;
        }
        Ok(())
    }
}
