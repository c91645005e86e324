//! Room number normalization against the occupancy map

use super::error::TransferError;
use shared::models::OccupancyEntry;
use std::collections::BTreeMap;

/// Candidate spellings of a room number: as typed, zero-padded to 2-4
/// digits, then with leading zeros stripped
fn candidates(input: &str) -> Vec<String> {
    let trimmed = input.trim();
    let mut out = vec![trimmed.to_string()];
    if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
        for width in 2..=4 {
            out.push(format!("{:0>width$}", trimmed, width = width));
        }
        let stripped = trimmed.trim_start_matches('0');
        out.push(if stripped.is_empty() { "0".to_string() } else { stripped.to_string() });
    }
    out.dedup();
    out
}

/// Resolve `input` to an occupied room key
///
/// Fails with `RoomNotFound` when no spelling matches, and with
/// `RoomNotOccupied` when the entry carries a status other than occupied.
pub fn normalize_room(
    input: &str,
    occupancy: &BTreeMap<String, OccupancyEntry>,
) -> Result<String, TransferError> {
    let key = candidates(input)
        .into_iter()
        .find(|c| occupancy.contains_key(c))
        .ok_or_else(|| TransferError::RoomNotFound(input.trim().to_string()))?;

    match occupancy.get(&key) {
        Some(entry) if entry.is_occupied() => Ok(key),
        _ => Err(TransferError::RoomNotOccupied(key)),
    }
}
