use super::{Error, Result, SweepMeta};

/// The sampled values of one sweep axis
#[derive(Debug, Clone, PartialEq)]
pub struct AxisInterval {
    pub name: String,
    /// `start`, `start + step`, ... up to and including `stop`
    pub values: Vec<f64>,
    pub start: f64,
    pub stop: f64,
    pub step: f64,
    /// Declared number of samples, `values` may hold one more
    pub count: usize,
}

impl AxisInterval {
    fn single(name: String, start: f64) -> Self {
        Self {
            name,
            values: vec![start],
            start,
            stop: start,
            step: 0.,
            count: 1,
        }
    }
}

/// Largest number of values an axis may be sampled at
const MAX_SAMPLES: usize = 1 << 24;

/// Half-open arithmetic progression `[start, end)` by `step`
///
/// Mirrors the usual `arange` length rule, `ceil((end - start) / step)`.
fn arange(name: &str, start: f64, end: f64, step: f64) -> Result<Vec<f64>> {
    let n = ((end - start) / step).ceil();
    if n.is_nan() || n <= 0. {
        return Ok(Vec::new());
    }
    if n > MAX_SAMPLES as f64 {
        return Err(Error::TooManySamples {
            name: name.to_string(),
            found: n,
            limit: MAX_SAMPLES,
        });
    }
    Ok((0..n as usize).map(|i| start + i as f64 * step).collect())
}

/// Rebuilds the (primary, secondary) axis values from the file metadata
///
/// The upper bound handed to the progression is `stop + step` so that `stop`
/// itself is sampled; with a step that does not divide the range evenly one
/// extra trailing value may appear. The values are never truncated here, but
/// `count` is the declared number of samples.
pub fn reconstruct(meta: &SweepMeta) -> Result<(AxisInterval, AxisInterval)> {
    let (primary_name, secondary_name) = meta
        .names
        .clone()
        .ok_or(Error::MissingMetadata("Channel.VName"))?;

    let start = meta
        .primary
        .start
        .ok_or(Error::MissingMetadata("Measurement.Bias.Source"))?;
    let stop = meta
        .primary
        .stop
        .ok_or(Error::MissingMetadata("Measurement.Primary.Stop"))?;
    let (step, count) = match (meta.primary.count, meta.primary.step) {
        (Some(count), _) if count < 2 => return Err(Error::DegeneratePrimaryAxis(count)),
        (Some(count), _) => ((stop - start) / (count - 1) as f64, Some(count)),
        (None, Some(step)) => (step, None),
        (None, None) => return Err(Error::MissingMetadata("Measurement.Primary.Count")),
    };
    if step == 0. {
        return Err(Error::ZeroStep(primary_name));
    }
    let values = arange(&primary_name, start, stop + step, step)?;
    let count = count.unwrap_or_else(|| {
        let n = ((stop - start) / step).round() + 1.;
        (n.max(0.) as usize).min(values.len())
    });
    let primary = AxisInterval {
        name: primary_name,
        count,
        values,
        start,
        stop,
        step,
    };

    let start = meta
        .secondary
        .start
        .ok_or(Error::MissingMetadata("Measurement.Bias.Source"))?;
    let secondary = match (meta.secondary.step, meta.secondary.count) {
        (Some(step), Some(count)) if count > 1 => {
            if step == 0. {
                return Err(Error::ZeroStep(secondary_name));
            }
            let stop = start + (count - 1) as f64 * step;
            AxisInterval {
                values: arange(&secondary_name, start, stop + step, step)?,
                name: secondary_name,
                start,
                stop,
                step,
                count,
            }
        }
        // single row of data
        _ => AxisInterval::single(secondary_name, start),
    };
    tracing::debug!(
        primary = %primary.name,
        primary_count = primary.count,
        secondary = %secondary.name,
        secondary_count = secondary.count,
        "sweep intervals reconstructed"
    );
    Ok((primary, secondary))
}
