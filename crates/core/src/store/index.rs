//! Bookmark index lists such as `1 4 7-9`.

use crate::{Result, ShelfmarkError};

/// Expands single indices and inclusive `min-max` ranges into ids.
///
/// Order of first appearance is kept and repeats are dropped.
///
/// # Errors
///
/// Returns [`ShelfmarkError::InvalidIndex`] for a part that is not a
/// positive integer or a range with `1 <= min <= max`.
///
/// # Example
///
/// ```rust
/// use shelfmark_core::store::parse_index_list;
///
/// assert_eq!(parse_index_list(&["3", "1-2", "2"]).unwrap(), [3, 1, 2]);
/// assert!(parse_index_list(&["5-2"]).is_err());
/// ```
pub fn parse_index_list<S: AsRef<str>>(parts: &[S]) -> Result<Vec<i64>> {
    let mut ids = Vec::new();

    for part in parts {
        let part = part.as_ref().trim();
        if part.contains('-') {
            let bounds: Vec<&str> = part.split('-').collect();
            let [min, max] = bounds.as_slice() else {
                return Err(ShelfmarkError::InvalidIndex(part.to_string()));
            };
            let min = parse_positive(min, part)?;
            let max = parse_positive(max, part)?;
            if min > max {
                return Err(ShelfmarkError::InvalidIndex(part.to_string()));
            }
            ids.extend(min..=max);
        } else {
            ids.push(parse_positive(part, part)?);
        }
    }

    let mut seen = std::collections::HashSet::new();
    ids.retain(|id| seen.insert(*id));
    Ok(ids)
}

fn parse_positive(value: &str, part: &str) -> Result<i64> {
    match value.trim().parse::<i64>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(ShelfmarkError::InvalidIndex(part.to_string())),
    }
}
