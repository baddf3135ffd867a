/* ************************************************************************ **
** This file is part of qr-eigen, and is licensed under EITHER the MIT      **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! Everything the coordinator writes to stdout or to the timing file.

use crate::FailResult;

use ::qr_eigen_linalg::{multiply_parallel, EigenEstimate, Matrix, QrFactors};
use ::std::fs::OpenOptions;
use ::std::io::{self, Write};
use ::std::path::Path;
use ::std::time::Duration;

pub fn started(size: usize) {
    println!("Started QR decomposition for {0}x{0} matrix", size);
}

pub fn finished(size: usize, elapsed: Duration) {
    println!(
        "Executed QR decomposition on matrix of size {0}x{0} in {1:.6} s",
        size, elapsed.as_secs_f64(),
    );
}

/// Appends one `size,seconds` record, creating the file if needed.
pub fn append_timing(path: &Path, size: usize, elapsed: Duration) -> FailResult<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)
        .map_err(|e| format_err!("could not open {}: {}", path.display(), e))?;
    writeln!(file, "{}", timing_record(size, elapsed))?;
    Ok(())
}

fn timing_record(size: usize, elapsed: Duration) -> String {
    format!("{},{:.6}", size, elapsed.as_secs_f64())
}

fn write_matrix<W: Write>(w: &mut W, label: &str, matrix: &Matrix) -> io::Result<()> {
    writeln!(w, "{}", label)?;
    write!(w, "{}", matrix)?;
    writeln!(w)
}

/// A, Q, R, their product, and the eigenvalue estimate.
pub fn write_results<W: Write>(
    w: &mut W,
    a: &Matrix,
    factors: &QrFactors,
    eigen: &EigenEstimate,
) -> FailResult<()> {
    write_matrix(w, "A", a)?;
    write_matrix(w, "Q", &factors.q)?;
    write_matrix(w, "R", &factors.r)?;
    write_matrix(w, "A = QR", &multiply_parallel(&factors.q, &factors.r)?)?;

    writeln!(w, "Eigenvalues ({} iterations)", eigen.iterations)?;
    let cells: Vec<_> = eigen.values.iter().map(|x| format!("{:.6}", x)).collect();
    writeln!(w, "{}", cells.join(","))?;
    Ok(())
}

pub fn display(a: &Matrix, factors: &QrFactors, eigen: &EigenEstimate) -> FailResult<()> {
    let stdout = io::stdout();
    let mut lock = stdout.lock();
    write_results(&mut lock, a, factors, eigen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::qr_eigen_linalg::sequential;
    use ::tempdir::TempDir;

    #[test]
    fn timing_file_is_appended() {
        let dir = TempDir::new("qr-eigen-report").unwrap();
        let path = dir.path().join("times.csv");
        append_timing(&path, 100, Duration::from_millis(1500)).unwrap();
        append_timing(&path, 200, Duration::from_micros(2)).unwrap();

        let text = ::std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "100,1.500000\n200,0.000002\n");
    }

    #[test]
    fn results_layout() {
        let a = Matrix::from_rows(&[[3.0, 1.0], [4.0, 2.0]]).unwrap();
        let factors = sequential::factorize(&a).unwrap();
        let eigen = EigenEstimate { values: vec![4.5, 0.5], iterations: 3 };

        let mut out = vec![];
        write_results(&mut out, &a, &factors, &eigen).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("A\n 3.00, 1.00,\n 4.00, 2.00,\n\nQ\n"));
        assert!(text.contains("\nA = QR\n 3.00, 1.00,\n 4.00, 2.00,\n"));
        assert!(text.ends_with("Eigenvalues (3 iterations)\n4.500000,0.500000\n"));
    }
}
