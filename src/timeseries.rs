//! Time series objects: the targets of range references
//!
//! A time series owns a primary data array and either explicit timestamps or
//! a starting time plus sampling rate. Its `ObjectReference` is assigned once
//! at creation and persisted with it.

use crate::container::{AttrValue, ContainerIo, Dataset, Element, Group};
use crate::reference::ObjectReference;
use crate::schema::TypeTag;
use crate::types::{ElementType, OBJECT_ID_ATTR, StoreError, StoreResult};
use std::ops::Range;
use std::sync::Arc;

/// Live handle to a loaded time series
pub type Handle = Arc<TimeSeries>;

const UNIT_ATTR: &str = "unit";
const STARTING_TIME_ATTR: &str = "starting_time";
const RATE_ATTR: &str = "rate";
const DATA_DATASET: &str = "data";
const TIMESTAMPS_DATASET: &str = "timestamps";

/// Sample timing of a time series
#[derive(Debug, Clone, PartialEq)]
pub enum Timing {
    /// One timestamp per sample, non-decreasing
    Timestamps(Vec<f64>),
    /// Regular sampling
    Rate { starting_time: f64, rate: f64 },
}

/// A named series of samples
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    name: String,
    object_id: ObjectReference,
    unit: String,
    data: Vec<f64>,
    timing: Timing,
}

impl TimeSeries {
    /// Create a series with explicit timestamps
    ///
    /// # Arguments
    /// * `name` - Name of the series, also its group name when written
    /// * `unit` - Unit of the samples
    /// * `data` - Primary data array
    /// * `timestamps` - One non-decreasing timestamp per sample
    ///
    /// A length mismatch or a decreasing timestamp is an `InvalidArgument`.
    pub fn with_timestamps(
        name: impl Into<String>,
        unit: impl Into<String>,
        data: Vec<f64>,
        timestamps: Vec<f64>,
    ) -> StoreResult<Self> {
        let timing = Timing::Timestamps(timestamps);
        check_timing(data.len(), &timing).map_err(StoreError::InvalidArgument)?;
        Ok(Self {
            name: name.into(),
            object_id: ObjectReference::generate(),
            unit: unit.into(),
            data,
            timing,
        })
    }

    /// Create a regularly sampled series
    ///
    /// # Arguments
    /// * `name` - Name of the series, also its group name when written
    /// * `unit` - Unit of the samples
    /// * `data` - Primary data array
    /// * `starting_time` - Time of the first sample
    /// * `rate` - Samples per time unit, positive and finite
    pub fn with_rate(
        name: impl Into<String>,
        unit: impl Into<String>,
        data: Vec<f64>,
        starting_time: f64,
        rate: f64,
    ) -> StoreResult<Self> {
        let timing = Timing::Rate {
            starting_time,
            rate,
        };
        check_timing(data.len(), &timing).map_err(StoreError::InvalidArgument)?;
        Ok(Self {
            name: name.into(),
            object_id: ObjectReference::generate(),
            unit: unit.into(),
            data,
            timing,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn object_id(&self) -> &ObjectReference {
        &self.object_id
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    /// Number of samples in the primary data array
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Timestamps for a range of sample indices
    pub fn timestamps_in(&self, range: Range<usize>) -> Vec<f64> {
        match &self.timing {
            Timing::Timestamps(ts) => ts[range].to_vec(),
            Timing::Rate {
                starting_time,
                rate,
            } => range.map(|i| starting_time + i as f64 / rate).collect(),
        }
    }

    /// Sample range covering `[start_time, stop_time)`, as `(start, count)`
    ///
    /// With timestamps this is a left bisection on both bounds. With a rate
    /// the first sample at or after each bound is used. Both ends are
    /// clamped to the data length.
    pub fn index_range(&self, start_time: f64, stop_time: f64) -> (u64, u64) {
        let len = self.data.len();
        let (start, stop) = match &self.timing {
            Timing::Timestamps(ts) => (
                ts.partition_point(|t| *t < start_time),
                ts.partition_point(|t| *t < stop_time),
            ),
            Timing::Rate {
                starting_time,
                rate,
            } => {
                let first = |t: f64| ((t - starting_time) * rate).ceil().max(0.0) as usize;
                (first(start_time), first(stop_time))
            }
        };
        let start = start.min(len);
        let stop = stop.clamp(start, len);
        (start as u64, (stop - start) as u64)
    }

    /// Persist this series as a group at `path`
    pub fn write<C: ContainerIo + ?Sized>(&self, container: &mut C, path: &str) -> StoreResult<()> {
        container.create_group(path)?;
        let tag = TypeTag::time_series();
        container.set_attribute(path, crate::types::TYPE_NAME_ATTR, AttrValue::Text(tag.name))?;
        container.set_attribute(path, crate::types::NAMESPACE_ATTR, AttrValue::Text(tag.namespace))?;
        container.set_attribute(
            path,
            OBJECT_ID_ATTR,
            AttrValue::Text(self.object_id.as_str().to_string()),
        )?;
        container.set_attribute(path, UNIT_ATTR, AttrValue::Text(self.unit.clone()))?;

        let data_path = format!("{}/{}", path, DATA_DATASET);
        container.write_dataset(&data_path, Dataset::from_floats(&self.data))?;

        match &self.timing {
            Timing::Timestamps(ts) => {
                let ts_path = format!("{}/{}", path, TIMESTAMPS_DATASET);
                container.write_dataset(&ts_path, Dataset::from_floats(ts))?;
            }
            Timing::Rate {
                starting_time,
                rate,
            } => {
                container.set_attribute(path, STARTING_TIME_ATTR, AttrValue::Float(*starting_time))?;
                container.set_attribute(path, RATE_ATTR, AttrValue::Float(*rate))?;
            }
        }
        Ok(())
    }

    /// Rebuild a series from its persisted group
    pub fn from_group(name: &str, group: &Group) -> StoreResult<Self> {
        let object_id = match group.attrs.get(OBJECT_ID_ATTR) {
            Some(AttrValue::Text(id)) => ObjectReference::from_string(id.clone()),
            _ => {
                return Err(StoreError::ParseError(format!(
                    "time series '{}' has no object id",
                    name
                )));
            }
        };
        let unit = match group.attrs.get(UNIT_ATTR) {
            Some(AttrValue::Text(unit)) => unit.clone(),
            _ => String::new(),
        };
        let data = float_values(name, group.datasets.get(DATA_DATASET))?;

        let timing = match group.datasets.get(TIMESTAMPS_DATASET) {
            Some(ts) => Timing::Timestamps(float_values(name, Some(ts))?),
            None => {
                let starting_time = group
                    .attrs
                    .get(STARTING_TIME_ATTR)
                    .and_then(AttrValue::as_f64)
                    .unwrap_or(0.0);
                let rate = group
                    .attrs
                    .get(RATE_ATTR)
                    .and_then(AttrValue::as_f64)
                    .ok_or_else(|| {
                        StoreError::ParseError(format!(
                            "time series '{}' has neither timestamps nor rate",
                            name
                        ))
                    })?;
                Timing::Rate {
                    starting_time,
                    rate,
                }
            }
        };

        check_timing(data.len(), &timing)
            .map_err(|reason| StoreError::ParseError(format!("time series '{}': {}", name, reason)))?;

        Ok(Self {
            name: name.to_string(),
            object_id,
            unit,
            data,
            timing,
        })
    }
}

fn check_timing(samples: usize, timing: &Timing) -> Result<(), String> {
    match timing {
        Timing::Timestamps(ts) => {
            if ts.len() != samples {
                return Err(format!("{} timestamps for {} samples", ts.len(), samples));
            }
            if ts.windows(2).any(|w| w[1] < w[0]) {
                return Err("timestamps must be non-decreasing".to_string());
            }
        }
        Timing::Rate { rate, .. } => {
            if !(*rate > 0.0 && rate.is_finite()) {
                return Err(format!("sampling rate must be positive, got {}", rate));
            }
        }
    }
    Ok(())
}

fn float_values(name: &str, dataset: Option<&Dataset>) -> StoreResult<Vec<f64>> {
    let dataset = dataset.ok_or_else(|| {
        StoreError::ParseError(format!("time series '{}' has no data", name))
    })?;
    if dataset.field_types() != [ElementType::Float64] {
        return Err(StoreError::ParseError(format!(
            "time series '{}' data is not float64",
            name
        )));
    }
    dataset
        .rows
        .iter()
        .map(|row| match row.first() {
            Some(Element::Float(v)) => Ok(*v),
            _ => Err(StoreError::ParseError(format!(
                "time series '{}' has a malformed sample",
                name
            ))),
        })
        .collect()
}
