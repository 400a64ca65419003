//! Project file import/export.
//!
//! The project is a JSON object with `name`, `instruments`, `patterns`,
//! `song`, and an optional `sampleData` table mapping instrument ids to
//! base64-encoded float-32 WAV. Pattern notes travel as 12-character note
//! strings. Importers tolerate missing instrument fields by falling back
//! to the data-model defaults.

use std::collections::HashMap;
use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use rt_ir::{Instrument, InstrumentId, Pattern, Project, Song};

use crate::note_string::{format_note, parse_note, NoteParseError};

/// Error type for project import/export.
#[derive(Debug)]
pub enum ProjectError {
    Json(serde_json::Error),
    Note { row: u16, track: u8, source: NoteParseError },
    BadInstrumentId(String),
    BadBase64(InstrumentId),
    CellOutOfBounds { pattern: u32, row: u16, track: u8 },
}

impl fmt::Display for ProjectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectError::Json(e) => write!(f, "project JSON error: {}", e),
            ProjectError::Note { row, track, source } => {
                write!(f, "bad note at row {} track {}: {}", row, track, source)
            }
            ProjectError::BadInstrumentId(s) => write!(f, "bad instrument id {:?}", s),
            ProjectError::BadBase64(id) => write!(f, "bad base64 sample data for instrument {}", id),
            ProjectError::CellOutOfBounds { pattern, row, track } => {
                write!(f, "note outside pattern {}: row {} track {}", pattern, row, track)
            }
        }
    }
}

impl std::error::Error for ProjectError {}

impl From<serde_json::Error> for ProjectError {
    fn from(e: serde_json::Error) -> Self {
        ProjectError::Json(e)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectFile {
    #[serde(default)]
    name: String,
    #[serde(default)]
    instruments: Vec<Instrument>,
    #[serde(default)]
    patterns: Vec<PatternFile>,
    #[serde(default)]
    song: Vec<Vec<u32>>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    sample_data: HashMap<String, String>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PatternFile {
    id: u32,
    #[serde(default)]
    name: String,
    #[serde(default = "default_tempo")]
    tempo: u16,
    tracks: u8,
    rows: u16,
    #[serde(default)]
    notes: Vec<NoteFile>,
}

fn default_tempo() -> u16 {
    Pattern::DEFAULT_TEMPO
}

#[derive(Serialize, Deserialize)]
struct NoteFile {
    row: u16,
    track: u8,
    /// 12-character note string.
    data: String,
}

/// Parse a project from JSON text.
pub fn project_from_json(json: &str) -> Result<Project, ProjectError> {
    let file: ProjectFile = serde_json::from_str(json)?;

    let mut patterns = Vec::with_capacity(file.patterns.len());
    for pf in file.patterns {
        let mut pattern = Pattern::with_tempo(pf.id, &pf.name, pf.tempo, pf.tracks, pf.rows);
        for note in pf.notes {
            if note.row >= pattern.rows || note.track >= pattern.tracks {
                return Err(ProjectError::CellOutOfBounds {
                    pattern: pf.id,
                    row: note.row,
                    track: note.track,
                });
            }
            let cell = parse_note(&note.data).map_err(|source| ProjectError::Note {
                row: note.row,
                track: note.track,
                source,
            })?;
            pattern.set_cell(note.row, note.track, Some(cell));
        }
        patterns.push(pattern);
    }

    let mut sample_data = HashMap::new();
    for (key, encoded) in file.sample_data {
        let id = InstrumentId::from_hex(&key).ok_or_else(|| ProjectError::BadInstrumentId(key))?;
        let bytes = BASE64.decode(encoded.as_bytes()).map_err(|_| ProjectError::BadBase64(id))?;
        sample_data.insert(id, bytes);
    }

    Ok(Project {
        name: file.name,
        instruments: file.instruments.into_iter().map(Instrument::clamped).collect(),
        patterns,
        song: Song { sequences: file.song },
        sample_data,
    })
}

/// Serialize a project to pretty-printed JSON.
pub fn project_to_json(project: &Project) -> Result<String, ProjectError> {
    let patterns = project
        .patterns
        .iter()
        .map(|p| PatternFile {
            id: p.id,
            name: p.name.to_string(),
            tempo: p.tempo,
            tracks: p.tracks,
            rows: p.rows,
            notes: p
                .iter_cells()
                .map(|(row, track, cell)| NoteFile { row, track, data: format_note(cell) })
                .collect(),
        })
        .collect();

    let file = ProjectFile {
        name: project.name.clone(),
        instruments: project.instruments.clone(),
        patterns,
        song: project.song.sequences.clone(),
        sample_data: project
            .sample_data
            .iter()
            .map(|(id, bytes)| (id.to_string(), BASE64.encode(bytes)))
            .collect(),
    };

    Ok(serde_json::to_string_pretty(&file)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rt_ir::Cell;

    fn id(raw: u8) -> InstrumentId {
        InstrumentId::new(raw).unwrap()
    }

    fn demo_project() -> Project {
        let mut project = Project::new("demo");
        project.instruments.push(Instrument::new(id(0), "lead"));

        let mut pattern = Pattern::with_tempo(0, "intro", 140, 2, 8);
        pattern.set_cell(0, 0, Some(Cell::note(id(0), 60, 255)));
        pattern.set_cell(4, 1, Some(Cell::note_off(id(0))));
        project.patterns.push(pattern);
        project.song.add_sequence(vec![0]);
        project.sample_data.insert(id(0), vec![1, 2, 3, 4]);
        project
    }

    #[test]
    fn round_trip_preserves_everything() {
        let original = demo_project();
        let json = project_to_json(&original).unwrap();
        let parsed = project_from_json(&json).unwrap();

        assert_eq!(parsed.name, "demo");
        assert_eq!(parsed.instruments, original.instruments);
        assert_eq!(parsed.patterns, original.patterns);
        assert_eq!(parsed.song, original.song);
        assert_eq!(parsed.sample_data, original.sample_data);
    }

    #[test]
    fn minimal_project_parses_with_defaults() {
        let json = r#"{
            "name": "min",
            "instruments": [{ "id": "01", "oscillator": { "waveform": "sine" } }],
            "patterns": [{ "id": 0, "tracks": 4, "rows": 16 }],
            "song": [[0]]
        }"#;
        let project = project_from_json(json).unwrap();
        assert_eq!(project.instruments[0].max_voices, rt_ir::DEFAULT_MAX_VOICES);
        assert_eq!(project.patterns[0].tempo, Pattern::DEFAULT_TEMPO);
        assert!(project.sample_data.is_empty());
    }

    #[test]
    fn bad_note_string_is_reported_with_position() {
        let json = r#"{
            "patterns": [{ "id": 0, "tracks": 1, "rows": 8,
                "notes": [{ "row": 3, "track": 0, "data": "xx" }] }]
        }"#;
        match project_from_json(json) {
            Err(ProjectError::Note { row: 3, track: 0, .. }) => {}
            other => panic!("expected note error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn out_of_bounds_note_rejected() {
        let json = r#"{
            "patterns": [{ "id": 5, "tracks": 1, "rows": 8,
                "notes": [{ "row": 9, "track": 0, "data": "00FFC4000000" }] }]
        }"#;
        assert!(matches!(
            project_from_json(json),
            Err(ProjectError::CellOutOfBounds { pattern: 5, row: 9, track: 0 })
        ));
    }

    #[test]
    fn bad_sample_id_rejected() {
        let json = r#"{ "sampleData": { "nope": "AAAA" } }"#;
        assert!(matches!(project_from_json(json), Err(ProjectError::BadInstrumentId(_))));
    }
}
