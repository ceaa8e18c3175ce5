use regex::Regex;

use crate::error::{Error, Result};

/// Normalize a cuisine name before it touches any set: underscores become
/// spaces, punctuation is dropped, whitespace collapses, case folds.
pub fn sanitize(input: &str) -> String {
    let replace = Regex::new(r"[_]").unwrap();
    let mut s = replace.replace_all(input, " ").into_owned();

    let clean_re = Regex::new(r"[^A-Za-z0-9- ]").unwrap();
    s = clean_re.replace_all(&s, "").into_owned();

    s = s.trim().to_string();

    let collapse = Regex::new(r" +").unwrap();
    collapse.replace_all(&s, " ").into_owned().to_lowercase()
}

/// Round to one decimal, matching the stored `averageRating` precision.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Inclusive index window for 1-based pagination. Page 0 is treated as
/// page 1. A zero limit yields an empty window.
pub fn page_window(page: u32, limit: u32) -> (isize, isize) {
    let start = ((page.max(1) - 1) as isize) * limit as isize;
    (start, start + limit as isize - 1)
}

/// Split a stored `lat,long` location string into its two coordinates.
pub fn split_coordinates(location: &str) -> Result<(&str, &str)> {
    let malformed = || Error::Validation {
        field: "location",
        reason: format!("expected lat,long but got {location:?}"),
    };

    let (lat, lng) = location.split_once(',').ok_or_else(malformed)?;
    let (lat, lng) = (lat.trim(), lng.trim());

    if lat.parse::<f64>().is_err() || lng.parse::<f64>().is_err() {
        return Err(malformed());
    }

    Ok((lat, lng))
}
