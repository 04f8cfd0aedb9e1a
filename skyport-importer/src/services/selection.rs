//! Selection resolver
//!
//! Turns a submitted selection (string-encoded positions plus an inversion
//! flag) into the ordered list of positions to import.
//!
//! - Direct mode: the submitted positions, ascending. Positions are not
//!   range-checked here; out-of-range ones fail when the import dereferences
//!   them against the dataset.
//! - Inversion mode: every position of the dataset except the submitted
//!   ones, ascending. Out-of-range or unparseable entries exclude nothing.

use std::collections::BTreeSet;

use crate::error::ImportError;
use crate::models::SelectionRequest;

/// Maximum number of items in one import job
pub const MAX_SELECTION: usize = 11_666;

/// Resolve a parsed position set against a dataset of `dataset_size` items
pub fn resolve_selection(
    dataset_size: usize,
    requested: &BTreeSet<i64>,
    invert: bool,
) -> Result<Vec<i64>, ImportError> {
    if requested.is_empty() && !invert {
        return Err(ImportError::EmptySelection);
    }

    let resolved: Vec<i64> = if invert {
        (0..dataset_size as i64)
            .filter(|position| !requested.contains(position))
            .collect()
    } else {
        requested.iter().copied().collect()
    };

    if resolved.is_empty() {
        return Err(ImportError::EmptySelection);
    }

    if resolved.len() > MAX_SELECTION {
        return Err(ImportError::SelectionTooLarge {
            count: resolved.len(),
            max: MAX_SELECTION,
        });
    }

    Ok(resolved)
}

/// Parse string-encoded positions
///
/// In direct mode an entry that is not an integer can never be dereferenced,
/// so it is rejected immediately. In inversion mode it is dropped.
pub fn parse_positions(
    raw: &[String],
    invert: bool,
    dataset_size: usize,
) -> Result<BTreeSet<i64>, ImportError> {
    let mut positions = BTreeSet::new();

    for entry in raw {
        match entry.trim().parse::<i64>() {
            Ok(position) => {
                positions.insert(position);
            }
            Err(_) if invert => {
                tracing::debug!(entry = %entry, "Ignoring unparseable excluded position");
            }
            Err(_) => {
                return Err(ImportError::InvalidPosition {
                    position: entry.clone(),
                    dataset_size,
                });
            }
        }
    }

    Ok(positions)
}

/// Resolve a `POST /import/start` request body
pub fn resolve_request(
    dataset_size: usize,
    request: &SelectionRequest,
) -> Result<Vec<i64>, ImportError> {
    let requested = parse_positions(&request.tweet_indices, request.inversion, dataset_size)?;
    resolve_selection(dataset_size, &requested, request.inversion)
}
