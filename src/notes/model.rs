use std::collections::BTreeSet;

use crate::foundation::error::{NotefallError, NotefallResult};

/// A timed drum event with rendering metadata, produced by the upstream
/// event parser (an external collaborator; JSON is its fixed interface).
///
/// The lane system supports regular columns (`lane >= 0`) and a reserved
/// full-width bar variant (`lane == -1`, typically the kick drum).
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Note {
    /// Source event code (e.g. the MIDI note number). Non-semantic here.
    pub pitch_id: u32,
    /// Absolute trigger time in seconds, >= 0.
    pub time: f64,
    /// Intensity 0..=127; scales note brightness.
    pub velocity: u8,
    /// Spatial column; `-1` renders as a full-width bar.
    pub lane: i32,
    /// RGB color, 0-255 per channel.
    pub color: [u8; 3],
    /// Display name, non-semantic.
    #[serde(default)]
    pub label: String,
}

impl Note {
    /// Validate the per-note invariants from the data model.
    pub fn validate(&self) -> NotefallResult<()> {
        if self.time < 0.0 || !self.time.is_finite() {
            return Err(NotefallError::configuration(format!(
                "note '{}' has invalid time {}",
                self.label, self.time
            )));
        }
        if self.velocity > 127 {
            return Err(NotefallError::configuration(format!(
                "note '{}' has velocity {} > 127",
                self.label, self.velocity
            )));
        }
        if self.lane < -1 {
            return Err(NotefallError::configuration(format!(
                "note '{}' has unsupported lane {}",
                self.label, self.lane
            )));
        }
        Ok(())
    }
}

/// Parse a JSON array of notes (the fixed interface to the excluded parser).
pub fn notes_from_json(json: &str) -> NotefallResult<Vec<Note>> {
    let notes: Vec<Note> =
        serde_json::from_str(json).map_err(|e| NotefallError::serde(format!("note list: {e}")))?;
    for n in &notes {
        n.validate()?;
    }
    Ok(notes)
}

/// Total video duration: `max(note.time) + tail_seconds`, so the last note
/// has time to fall off screen. Empty input yields just the tail.
pub fn derive_duration(notes: &[Note], tail_seconds: f64) -> f64 {
    let last = notes.iter().map(|n| n.time).fold(0.0_f64, f64::max);
    last + tail_seconds
}

/// Distinct non-negative lane ids present in the input, in ascending order.
pub fn used_lanes(notes: &[Note]) -> BTreeSet<i32> {
    notes.iter().map(|n| n.lane).filter(|&l| l >= 0).collect()
}

/// Compact sparse lane ids to consecutive columns (0, 1, 2, ...).
///
/// When some lanes carry no notes the layout would leave empty columns;
/// remapping keeps the used lanes adjacent. Special lanes (negative) are
/// passed through unchanged.
pub fn remap_lanes(notes: &[Note]) -> Vec<Note> {
    let mapping: std::collections::HashMap<i32, i32> = used_lanes(notes)
        .into_iter()
        .enumerate()
        .map(|(new, original)| (original, new as i32))
        .collect();

    notes
        .iter()
        .map(|n| {
            let mut out = n.clone();
            if let Some(&new) = mapping.get(&n.lane) {
                out.lane = new;
            }
            out
        })
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/notes/model.rs"]
mod tests;
