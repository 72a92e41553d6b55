//! CSV export of rolling coefficients and walk-forward predictions.

use std::fs;
use std::io::Write;
use std::path::Path;

use crate::domain::error::AptError;
use crate::domain::prediction::Prediction;
use crate::domain::rolling::RollingFit;

fn csv_error(e: csv::Error) -> AptError {
    match e.into_kind() {
        csv::ErrorKind::Io(io) => AptError::Io(io),
        other => AptError::Io(std::io::Error::other(format!("{other:?}"))),
    }
}

fn create_parent(path: &Path) -> Result<(), AptError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// `date,const,<factor>...,r_squared`, one row per window.
pub fn write_rolling<W: Write>(writer: W, rolling: &RollingFit) -> Result<(), AptError> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = vec!["date".to_string()];
    header.extend(rolling.names.iter().cloned());
    header.push("r_squared".to_string());
    wtr.write_record(&header).map_err(csv_error)?;

    for p in &rolling.points {
        let mut row = vec![p.date.to_string()];
        row.extend(p.coefficients.iter().map(|c| c.to_string()));
        row.push(p.r_squared.to_string());
        wtr.write_record(&row).map_err(csv_error)?;
    }
    wtr.flush()?;
    Ok(())
}

/// `date,predicted,actual,error`.
pub fn write_predictions<W: Write>(writer: W, predictions: &[Prediction]) -> Result<(), AptError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["date", "predicted", "actual", "error"])
        .map_err(csv_error)?;

    for p in predictions {
        wtr.write_record([
            p.date.to_string(),
            p.predicted.to_string(),
            p.actual.to_string(),
            p.error().to_string(),
        ])
        .map_err(csv_error)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_rolling_csv(path: &Path, rolling: &RollingFit) -> Result<(), AptError> {
    create_parent(path)?;
    write_rolling(fs::File::create(path)?, rolling)?;
    log::info!("rolling coefficients written to {}", path.display());
    Ok(())
}

pub fn write_predictions_csv(path: &Path, predictions: &[Prediction]) -> Result<(), AptError> {
    create_parent(path)?;
    write_predictions(fs::File::create(path)?, predictions)?;
    log::info!("predictions written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rolling::RollingPoint;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    #[test]
    fn rolling_csv_layout() {
        let rolling = RollingFit {
            asset: "MSFT".into(),
            window: 3,
            names: vec!["const".into(), "market".into()],
            points: vec![RollingPoint {
                date: d(4),
                coefficients: vec![0.5, 1.25],
                r_squared: 0.75,
            }],
            skipped: 0,
        };
        let mut buf = Vec::new();
        write_rolling(&mut buf, &rolling).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "date,const,market,r_squared\n2024-03-04,0.5,1.25,0.75\n");
    }

    #[test]
    fn predictions_csv_includes_error() {
        let preds = vec![Prediction {
            date: d(5),
            predicted: 0.25,
            actual: 0.5,
        }];
        let mut buf = Vec::new();
        write_predictions(&mut buf, &preds).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "date,predicted,actual,error\n2024-03-05,0.25,0.5,0.25\n");
    }

    #[test]
    fn file_export_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out/preds.csv");
        write_predictions_csv(&path, &[]).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "date,predicted,actual,error\n"
        );
    }
}
