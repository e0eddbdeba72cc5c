//! Comma-separated numeric tables in the layout `numpy.savetxt` produces.

use std::io::Write;
use std::path::Path;

use crate::directional::{Matrix, TrainingView};
use crate::error::TableError;

pub fn parse_matrix(text: &str) -> Result<Matrix, TableError> {
    let mut rows: Vec<Vec<f64>> = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let row = line
            .split(',')
            .map(|cell| {
                let cell = cell.trim();
                cell.parse::<f64>().map_err(|_| TableError::Parse {
                    line: index + 1,
                    cell: cell.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        if let Some(first) = rows.first() {
            if first.len() != row.len() {
                return Err(TableError::Ragged {
                    line: index + 1,
                    expected: first.len(),
                    found: row.len(),
                });
            }
        }
        rows.push(row);
    }
    Matrix::from_rows(rows)
}

pub fn read_matrix(path: &Path) -> Result<Matrix, TableError> {
    let text = std::fs::read_to_string(path).map_err(|err| TableError::io(path, err))?;
    parse_matrix(&text)
}

/// Reads a table and checks it has the given shape.
pub fn read_matrix_shaped(path: &Path, rows: usize, cols: usize) -> Result<Matrix, TableError> {
    let matrix = read_matrix(path)?;
    if matrix.shape() != (rows, cols) {
        return Err(TableError::Shape {
            expected_rows: rows,
            expected_cols: cols,
            rows: matrix.rows(),
            cols: matrix.cols(),
        });
    }
    Ok(matrix)
}

pub fn write_matrix(path: &Path, matrix: &Matrix) -> Result<(), TableError> {
    let io = |err| TableError::io(path, err);
    let file = std::fs::File::create(path).map_err(io)?;
    let mut out = std::io::BufWriter::new(file);
    for row in matrix.iter_rows() {
        let line = row
            .iter()
            .map(|value| format_scientific(*value))
            .collect::<Vec<_>>()
            .join(",");
        writeln!(out, "{}", line).map_err(io)?;
    }
    out.flush().map_err(io)
}

/// `azimuth,elevation` rows of training viewpoints.
pub fn read_training_views(path: &Path) -> Result<Vec<TrainingView>, TableError> {
    let matrix = read_matrix(path)?;
    if matrix.rows() > 0 && matrix.cols() < 2 {
        return Err(TableError::Shape {
            expected_rows: matrix.rows(),
            expected_cols: 2,
            rows: matrix.rows(),
            cols: matrix.cols(),
        });
    }
    Ok(matrix
        .iter_rows()
        .map(|row| TrainingView {
            azimuth: row[0],
            elevation: row[1],
        })
        .collect())
}

pub fn write_training_views(path: &Path, views: &[TrainingView]) -> Result<(), TableError> {
    let rows = views
        .iter()
        .map(|view| vec![view.azimuth, view.elevation])
        .collect();
    write_matrix(path, &Matrix::from_rows(rows)?)
}

/// `%.18e` formatting: signed, at least two exponent digits.
pub fn format_scientific(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let formatted = format!("{:.18e}", value);
    let Some((mantissa, exponent)) = formatted.split_once('e') else {
        return formatted;
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let sign = if exponent < 0 { '-' } else { '+' };
    format!("{}e{}{:02}", mantissa, sign, exponent.abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_like_savetxt() {
        assert_eq!(format_scientific(0.5), "5.000000000000000000e-01");
        assert_eq!(format_scientific(0.0), "0.000000000000000000e+00");
        assert_eq!(format_scientific(-1234.5), "-1.234500000000000000e+03");
        assert_eq!(format_scientific(f64::NAN), "nan");
    }

    #[test]
    fn parses_savetxt_output() {
        let text = "# header\n5.000000000000000000e-01,1.0e+00\n\n2.5e-01 , nan\n";
        let matrix = parse_matrix(text).unwrap();
        assert_eq!(matrix.shape(), (2, 2));
        assert_eq!(matrix.get(0, 0), Some(0.5));
        assert_eq!(matrix.get(1, 0), Some(0.25));
        assert!(matrix.get(1, 1).unwrap().is_nan());
    }

    #[test]
    fn reports_bad_cells_and_ragged_rows() {
        assert!(matches!(
            parse_matrix("1,2\n3,x\n"),
            Err(TableError::Parse { line: 2, .. })
        ));
        assert!(matches!(
            parse_matrix("1,2\n3\n"),
            Err(TableError::Ragged { line: 2, .. })
        ));
    }

    #[test]
    fn written_tables_read_back() {
        let matrix = Matrix::from_rows(vec![vec![0.1, 1.0 / 3.0], vec![2.0e-7, 42.0]]).unwrap();
        let path = std::env::temp_dir().join(format!("deltaview_table_{}.csv", std::process::id()));
        write_matrix(&path, &matrix).unwrap();
        let loaded = read_matrix_shaped(&path, 2, 2).unwrap();
        assert!(matches!(
            read_matrix_shaped(&path, 25, 25),
            Err(TableError::Shape { .. })
        ));
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded, matrix);
    }
}
