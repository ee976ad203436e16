//! Input-less estimation of pi over a fixed unit-square grid.
//!
//! Every map samples the same deterministic grid, so re-running a job
//! reproduces its records exactly and the inside/total ratio is
//! independent of how many daemons took part.

use client::formats::{RecordRead, RecordWrite, KV};
use utilities::result::{DfsError, Result};

const GRID: u32 = 256;

/// Emits how many grid cell centers fall inside the unit circle, and
/// how many were sampled. The reader is ignored; this is a generator
/// workload.
pub fn map(_reader: Option<&mut dyn RecordRead>, writer: &mut dyn RecordWrite) -> Result<()> {
    let mut inside = 0u64;
    for i in 0..GRID {
        for j in 0..GRID {
            let x = (f64::from(i) + 0.5) / f64::from(GRID);
            let y = (f64::from(j) + 0.5) / f64::from(GRID);
            if x * x + y * y <= 1.0 {
                inside += 1;
            }
        }
    }
    writer.write(&KV::new("inside", inside.to_string()))?;
    writer.write(&KV::new("total", (u64::from(GRID) * u64::from(GRID)).to_string()))?;
    Ok(())
}

/// Sums the tallies of every map and emits the estimate.
pub fn reduce(reader: &mut dyn RecordRead, writer: &mut dyn RecordWrite) -> Result<()> {
    let mut inside = 0u64;
    let mut total = 0u64;
    while let Some(record) = reader.read()? {
        let count: u64 = record
            .value
            .parse()
            .map_err(|e| DfsError::protocol(format!("bad tally {:?}: {e}", record.value)))?;
        match record.key.as_str() {
            "inside" => inside += count,
            "total" => total += count,
            other => {
                return Err(DfsError::protocol(format!("unexpected tally key {other:?}")));
            }
        }
    }
    if total == 0 {
        return Err(DfsError::protocol("no tallies to reduce"));
    }
    let estimate = 4.0 * inside as f64 / total as f64;
    writer.write(&KV::new("pi", format!("{estimate:.6}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use client::formats::{KvReader, KvWriter};

    #[test]
    fn generator_is_deterministic() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut outputs = Vec::new();
        for run in 0..2 {
            let path = dir.path().join(format!("run-{run}.kv"));
            let mut writer = KvWriter::create(&path)?;
            map(None, &mut writer)?;
            writer.flush()?;
            outputs.push(std::fs::read_to_string(&path)?);
        }
        assert_eq!(outputs[0], outputs[1]);
        Ok(())
    }

    #[test]
    fn estimate_lands_near_pi() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let tallies = dir.path().join("tallies.kv");
        let mut writer = KvWriter::create(&tallies)?;
        // two daemons, identical grids
        map(None, &mut writer)?;
        map(None, &mut writer)?;
        writer.flush()?;

        let result = dir.path().join("pi.kv");
        let mut reader = KvReader::open(&tallies)?;
        let mut result_writer = KvWriter::create(&result)?;
        reduce(&mut reader, &mut result_writer)?;
        result_writer.flush()?;

        let mut result_reader = KvReader::open(&result)?;
        let record = result_reader.read()?.expect("one estimate record");
        assert_eq!(record.key, "pi");
        let estimate: f64 = record.value.parse().unwrap();
        assert!((estimate - std::f64::consts::PI).abs() < 0.05);
        Ok(())
    }
}
