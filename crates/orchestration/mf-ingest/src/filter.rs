//! Entity filtering from partition metadata.

use arrow::array::{Array, Int32Array, Int64Array, StringArray, UInt32Array, UInt64Array};
use arrow::record_batch::RecordBatch;
use mf_error::{FilterError, Result};
use mf_types::entity_id_from_path;
use std::collections::HashSet;
use tracing::warn;

/// Predicate over entity metadata attributes.
///
/// An entity is allowed when every configured attribute column's value
/// is a member of the allowed value set (e.g. "all listed appliances
/// use an allowed energy carrier"). The predicate is applied by this
/// caller-side type, not by the metadata provider.
#[derive(Debug, Clone)]
pub struct EntityFilter {
    /// Column carrying the entity id
    pub id_column: String,

    /// Categorical attribute columns the predicate ranges over.
    /// Empty means every entity in the metadata table is allowed.
    pub attribute_columns: Vec<String>,

    /// Values the attribute columns are allowed to take
    pub allowed_values: HashSet<String>,
}

impl EntityFilter {
    /// Create a filter over the given id column.
    pub fn new(id_column: impl Into<String>) -> Self {
        Self {
            id_column: id_column.into(),
            attribute_columns: Vec::new(),
            allowed_values: HashSet::new(),
        }
    }

    /// Set the attribute columns the predicate ranges over.
    pub fn with_attribute_columns(mut self, columns: Vec<String>) -> Self {
        self.attribute_columns = columns;
        self
    }

    /// Set the allowed attribute values.
    pub fn with_allowed_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_values = values.into_iter().map(Into::into).collect();
        self
    }

    /// Derive the allowed entity-id set from the metadata table.
    ///
    /// # Errors
    ///
    /// `FilterError` when a configured column is missing or has an
    /// unusable type - fatal at the run level.
    pub fn allowed_ids(&self, metadata: &[RecordBatch]) -> Result<HashSet<String>> {
        let mut allowed = HashSet::new();

        for batch in metadata {
            let ids = id_values(batch, &self.id_column)?;

            let mut attr_arrays = Vec::with_capacity(self.attribute_columns.len());
            for name in &self.attribute_columns {
                let idx = batch
                    .schema()
                    .index_of(name)
                    .map_err(|_| FilterError::MissingColumn(name.clone()))?;
                let array = batch
                    .column(idx)
                    .as_any()
                    .downcast_ref::<StringArray>()
                    .ok_or_else(|| {
                        FilterError::Schema(format!(
                            "attribute column '{}' is {:?}, expected Utf8",
                            name,
                            batch.column(idx).data_type()
                        ))
                    })?
                    .clone();
                attr_arrays.push(array);
            }

            for (row, id) in ids.into_iter().enumerate() {
                let Some(id) = id else { continue };

                let passes = attr_arrays.iter().all(|array| {
                    !array.is_null(row) && self.allowed_values.contains(array.value(row))
                });
                if passes {
                    allowed.insert(id);
                }
            }
        }

        Ok(allowed)
    }
}

/// Extract entity ids from the metadata id column as strings.
fn id_values(batch: &RecordBatch, id_column: &str) -> Result<Vec<Option<String>>> {
    let idx = batch
        .schema()
        .index_of(id_column)
        .map_err(|_| FilterError::MissingColumn(id_column.to_string()))?;
    let column = batch.column(idx);

    macro_rules! collect_ids {
        ($array:expr) => {
            (0..$array.len())
                .map(|i| (!$array.is_null(i)).then(|| $array.value(i).to_string()))
                .collect()
        };
    }

    let ids = if let Some(a) = column.as_any().downcast_ref::<StringArray>() {
        collect_ids!(a)
    } else if let Some(a) = column.as_any().downcast_ref::<Int64Array>() {
        collect_ids!(a)
    } else if let Some(a) = column.as_any().downcast_ref::<Int32Array>() {
        collect_ids!(a)
    } else if let Some(a) = column.as_any().downcast_ref::<UInt64Array>() {
        collect_ids!(a)
    } else if let Some(a) = column.as_any().downcast_ref::<UInt32Array>() {
        collect_ids!(a)
    } else {
        return Err(FilterError::Schema(format!(
            "id column '{}' is {:?}, expected string or integer",
            id_column,
            column.data_type()
        ))
        .into());
    };

    Ok(ids)
}

/// True when a path's derived entity id is in the allowed set.
///
/// A path that fails id derivation is logged and treated as not
/// allowed - it never aborts processing.
pub fn path_allowed(path: &str, allowed: &HashSet<String>) -> bool {
    match entity_id_from_path(path) {
        Ok(id) => allowed.contains(&id),
        Err(e) => {
            warn!(path = path, error = %e, "Dropping path with unrecognized naming");
            false
        }
    }
}

/// Count the listed paths the workers will skip.
pub fn count_excluded(paths: &[String], allowed: &HashSet<String>) -> usize {
    paths
        .iter()
        .filter(|p| !matches!(entity_id_from_path(p), Ok(id) if allowed.contains(&id)))
        .count()
}
