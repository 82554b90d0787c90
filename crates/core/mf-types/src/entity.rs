//! Entity id derivation from object paths.

use mf_error::{ParseError, Result};

/// Derives the entity id from an object path.
///
/// The file name is expected to follow the `<entity_id>[-<index>].parquet`
/// convention: the `.parquet` extension is stripped, then an optional
/// trailing `-<digits>` upgrade/index marker.
///
/// ```
/// use mf_types::entity_id_from_path;
///
/// let id = entity_id_from_path("s3://lake/by_state/state=CO/100035-0.parquet").unwrap();
/// assert_eq!(id, "100035");
/// ```
///
/// # Errors
///
/// Returns [`ParseError::Naming`] for paths without a `.parquet` extension
/// or with an empty stem. Resumption depends on ids being a pure function
/// of the path, so there is no fallback derivation.
pub fn entity_id_from_path(path: &str) -> Result<String> {
    let file_name = path.rsplit('/').next().unwrap_or(path);

    let stem = file_name
        .strip_suffix(".parquet")
        .ok_or_else(|| ParseError::Naming(format!("expected .parquet extension: {path}")))?;

    let id = match stem.rsplit_once('-') {
        Some((head, tail)) if !tail.is_empty() && tail.bytes().all(|b| b.is_ascii_digit()) => head,
        _ => stem,
    };

    if id.is_empty() {
        return Err(ParseError::Naming(format!("empty entity id in path: {path}")).into());
    }

    Ok(id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_index_marker_and_extension() {
        assert_eq!(entity_id_from_path("100035-0.parquet").unwrap(), "100035");
        assert_eq!(entity_id_from_path("100035-12.parquet").unwrap(), "100035");
    }

    #[test]
    fn test_plain_stem_without_marker() {
        assert_eq!(entity_id_from_path("100035.parquet").unwrap(), "100035");
    }

    #[test]
    fn test_uses_file_name_only() {
        assert_eq!(
            entity_id_from_path("s3://bucket/state=CO/100035-0.parquet").unwrap(),
            "100035"
        );
        assert_eq!(
            entity_id_from_path("/tmp/data/100035-0.parquet").unwrap(),
            "100035"
        );
    }

    #[test]
    fn test_non_numeric_tail_is_kept() {
        // Only a trailing digits marker is stripped
        assert_eq!(entity_id_from_path("site-a.parquet").unwrap(), "site-a");
    }

    #[test]
    fn test_rejects_wrong_extension() {
        assert!(entity_id_from_path("100035-0.csv").is_err());
        assert!(entity_id_from_path("100035-0").is_err());
    }

    #[test]
    fn test_rejects_empty_stem() {
        assert!(entity_id_from_path(".parquet").is_err());
        assert!(entity_id_from_path("dir/.parquet").is_err());
    }
}
