//! Hourly aggregation of per-entity record batches.

use arrow::array::{
    Array, Float32Array, Float64Array, Int32Array, Int64Array, StringArray,
    TimestampMicrosecondArray, TimestampMillisecondArray, TimestampNanosecondArray,
    TimestampSecondArray,
};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use mf_error::{ParseError, Result};
use mf_types::{HourlyTable, ReductionPolicy, COL_ENTITY_ID, COL_HOUR};
use std::collections::BTreeMap;
use std::sync::Arc;

/// One entity's hourly-reduced series, hours ascending.
#[derive(Debug)]
pub struct PathSeries {
    pub entity_id: String,
    pub hours: Vec<i64>,
    /// Reduced values, indexed `[measurement][row]`
    pub values: Vec<Vec<f64>>,
}

impl PathSeries {
    pub fn num_rows(&self) -> usize {
        self.hours.len()
    }
}

/// Per-hour running sums and non-null counts, one slot per measurement.
struct HourAcc {
    sums: Vec<f64>,
    counts: Vec<u64>,
}

impl HourAcc {
    fn new(width: usize) -> Self {
        Self {
            sums: vec![0.0; width],
            counts: vec![0; width],
        }
    }
}

/// Floor an epoch-seconds timestamp to its containing clock hour.
#[inline]
pub fn floor_hour(epoch_secs: i64) -> i64 {
    epoch_secs.div_euclid(3600) * 3600
}

/// Reduce one entity's record batches to one row per hour.
///
/// Null timestamps drop the row; null measurements are excluded from
/// both the sum and the mean denominator. An hour where every sample of
/// a column was null yields `0.0` under sum and `NaN` under mean.
pub fn aggregate_hourly(
    entity_id: &str,
    batches: &[RecordBatch],
    timestamp_column: &str,
    measurement_columns: &[String],
    policy: ReductionPolicy,
) -> Result<PathSeries> {
    let width = measurement_columns.len();
    let mut acc: BTreeMap<i64, HourAcc> = BTreeMap::new();

    for batch in batches {
        let hours = hour_values(batch, timestamp_column)?;

        let mut columns = Vec::with_capacity(width);
        for name in measurement_columns {
            columns.push(numeric_values(batch, name)?);
        }

        for (row, hour) in hours.into_iter().enumerate() {
            let Some(hour) = hour else { continue };
            let slot = acc.entry(hour).or_insert_with(|| HourAcc::new(width));

            for (col, values) in columns.iter().enumerate() {
                if let Some(v) = values[row] {
                    slot.sums[col] += v;
                    slot.counts[col] += 1;
                }
            }
        }
    }

    let mut hours = Vec::with_capacity(acc.len());
    let mut values = vec![Vec::with_capacity(acc.len()); width];

    for (hour, slot) in acc {
        hours.push(hour);
        for col in 0..width {
            let reduced = match policy {
                ReductionPolicy::Sum => slot.sums[col],
                ReductionPolicy::Mean => {
                    if slot.counts[col] == 0 {
                        f64::NAN
                    } else {
                        slot.sums[col] / slot.counts[col] as f64
                    }
                }
            };
            values[col].push(reduced);
        }
    }

    Ok(PathSeries {
        entity_id: entity_id.to_string(),
        hours,
        values,
    })
}

/// Concatenate per-path series into one aggregated table, in path order.
pub fn build_table(series: Vec<PathSeries>, measurement_columns: &[String]) -> Result<HourlyTable> {
    let total_rows: usize = series.iter().map(PathSeries::num_rows).sum();

    let mut entity_ids = Vec::with_capacity(total_rows);
    let mut hours = Vec::with_capacity(total_rows);
    let mut values: Vec<Vec<f64>> = vec![Vec::with_capacity(total_rows); measurement_columns.len()];
    let mut contained = Vec::with_capacity(series.len());

    for path_series in series {
        contained.push(path_series.entity_id.clone());
        for row in 0..path_series.num_rows() {
            entity_ids.push(path_series.entity_id.clone());
            hours.push(path_series.hours[row]);
            for (col, reduced) in path_series.values.iter().enumerate() {
                values[col].push(reduced[row]);
            }
        }
    }

    let mut fields = vec![
        Field::new(COL_ENTITY_ID, DataType::Utf8, false),
        Field::new(COL_HOUR, DataType::Timestamp(TimeUnit::Second, None), false),
    ];
    for name in measurement_columns {
        fields.push(Field::new(name, DataType::Float64, true));
    }

    let mut arrays: Vec<Arc<dyn Array>> = vec![
        Arc::new(StringArray::from(entity_ids)),
        Arc::new(TimestampSecondArray::from(hours)),
    ];
    for column in values {
        arrays.push(Arc::new(Float64Array::from(column)));
    }

    let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)
        .map_err(|e| ParseError::Schema(format!("building aggregated table: {e}")))?;

    Ok(HourlyTable::new(batch, contained))
}

/// Extract the timestamp column floored to hours, per row.
fn hour_values(batch: &RecordBatch, timestamp_column: &str) -> Result<Vec<Option<i64>>> {
    let idx = batch.schema().index_of(timestamp_column).map_err(|_| {
        ParseError::Schema(format!("missing timestamp column '{timestamp_column}'"))
    })?;
    let column = batch.column(idx);

    macro_rules! floor_all {
        ($array:expr, $divisor:expr) => {
            (0..$array.len())
                .map(|i| {
                    (!$array.is_null(i)).then(|| floor_hour($array.value(i).div_euclid($divisor)))
                })
                .collect()
        };
    }

    let hours = match column.data_type() {
        DataType::Timestamp(TimeUnit::Second, _) => {
            let a = column
                .as_any()
                .downcast_ref::<TimestampSecondArray>()
                .expect("checked data type");
            floor_all!(a, 1)
        }
        DataType::Timestamp(TimeUnit::Millisecond, _) => {
            let a = column
                .as_any()
                .downcast_ref::<TimestampMillisecondArray>()
                .expect("checked data type");
            floor_all!(a, 1_000)
        }
        DataType::Timestamp(TimeUnit::Microsecond, _) => {
            let a = column
                .as_any()
                .downcast_ref::<TimestampMicrosecondArray>()
                .expect("checked data type");
            floor_all!(a, 1_000_000)
        }
        DataType::Timestamp(TimeUnit::Nanosecond, _) => {
            let a = column
                .as_any()
                .downcast_ref::<TimestampNanosecondArray>()
                .expect("checked data type");
            floor_all!(a, 1_000_000_000)
        }
        other => {
            return Err(ParseError::Schema(format!(
                "timestamp column '{timestamp_column}' is {other:?}, expected a timestamp"
            ))
            .into())
        }
    };

    Ok(hours)
}

/// Extract a measurement column widened to f64, per row.
fn numeric_values(batch: &RecordBatch, name: &str) -> Result<Vec<Option<f64>>> {
    let idx = batch
        .schema()
        .index_of(name)
        .map_err(|_| ParseError::Schema(format!("missing measurement column '{name}'")))?;
    let column = batch.column(idx);

    macro_rules! widen_all {
        ($array:expr) => {
            Ok((0..$array.len())
                .map(|i| (!$array.is_null(i)).then(|| $array.value(i) as f64))
                .collect())
        };
    }

    if let Some(a) = column.as_any().downcast_ref::<Float64Array>() {
        widen_all!(a)
    } else if let Some(a) = column.as_any().downcast_ref::<Float32Array>() {
        widen_all!(a)
    } else if let Some(a) = column.as_any().downcast_ref::<Int64Array>() {
        widen_all!(a)
    } else if let Some(a) = column.as_any().downcast_ref::<Int32Array>() {
        widen_all!(a)
    } else {
        Err(ParseError::Schema(format!(
            "measurement column '{name}' is {:?}, expected a numeric type",
            column.data_type()
        ))
        .into())
    }
}
