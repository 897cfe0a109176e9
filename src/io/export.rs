//! Export simulated series to CSV.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream scripts.
//! One row per time step, both phases side by side.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::domain::{Phase1Series, Phase2Series};
use crate::error::AppError;

pub const SERIES_CSV_HEADER: &str =
    "time,heat,temperature,pressure_phase1,pressure_phase2,displacement,work";

/// Write both phases to a CSV file.
pub fn write_series_csv(path: &Path, phase1: &Phase1Series, phase2: &Phase2Series) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    let mut out = BufWriter::new(file);
    write_series(&mut out, phase1, phase2)?;
    out.flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush export CSV: {e}")))?;
    log::info!("wrote {} rows to {}", phase1.heat.len(), path.display());
    Ok(())
}

/// Write both phases as CSV to any writer.
pub fn write_series<W: Write>(out: &mut W, phase1: &Phase1Series, phase2: &Phase2Series) -> Result<(), AppError> {
    let n = phase1.heat.len();
    if phase2.work.len() != n {
        return Err(AppError::new(
            2,
            format!("Phase lengths differ: {n} vs {}.", phase2.work.len()),
        ));
    }

    writeln!(out, "{SERIES_CSV_HEADER}")
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV header: {e}")))?;

    let columns = [
        phase1.heat.values(),
        phase1.temperature.values(),
        phase1.pressure.values(),
        phase2.pressure.values(),
        phase2.displacement.values(),
        phase2.work.values(),
    ];
    for (i, t) in phase1.heat.time().iter().enumerate() {
        writeln!(
            out,
            "{t:.6},{:.10},{:.10},{:.10},{:.10},{:.10},{:.10}",
            columns[0][i], columns[1][i], columns[2][i], columns[3][i], columns[4][i], columns[5][i],
        )
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
    }

    Ok(())
}
