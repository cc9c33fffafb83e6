//! # Data Store
//!
//! JSON file storage rooted at a data directory:
//!
//! ```text
//! <root>/categories.json          taxonomy (read-only)
//! <root>/projects/<id>.json       one TrackedEntity per file
//! <root>/snapshots/<date>.jsonl   append-only event log
//! <root>/rankings/<date>.json     one RankingArtifact per day
//! ```
//!
//! Entity and ranking writes go through a temporary file in the target
//! directory followed by a rename, so readers never see a partial file.

use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::models::{RankingArtifact, SnapshotEvent, Taxonomy, TrackedEntity};

const PROJECTS_DIR: &str = "projects";
const SNAPSHOTS_DIR: &str = "snapshots";
const RANKINGS_DIR: &str = "rankings";
const TAXONOMY_FILE: &str = "categories.json";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// File-backed store for entities, snapshots and rankings.
#[derive(Debug, Clone)]
pub struct DataStore {
    root: PathBuf,
}

impl DataStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn projects_dir(&self) -> PathBuf {
        self.root.join(PROJECTS_DIR)
    }

    fn snapshots_dir(&self) -> PathBuf {
        self.root.join(SNAPSHOTS_DIR)
    }

    fn rankings_dir(&self) -> PathBuf {
        self.root.join(RANKINGS_DIR)
    }

    fn entity_path(&self, id: &str) -> PathBuf {
        self.projects_dir().join(format!("{id}.json"))
    }

    fn snapshot_path(&self, date: NaiveDate) -> PathBuf {
        self.snapshots_dir()
            .join(format!("{}.jsonl", date.format(DATE_FORMAT)))
    }

    fn ranking_path(&self, date: NaiveDate) -> PathBuf {
        self.rankings_dir()
            .join(format!("{}.json", date.format(DATE_FORMAT)))
    }

    // --- Entities ---

    /// Load one entity by id; a missing file is [`StoreError::NotFound`].
    pub fn load_entity(&self, id: &str) -> Result<TrackedEntity, StoreError> {
        read_json(&self.entity_path(id), "entity", id)
    }

    /// Atomically replace the stored record for `entity.id`.
    pub fn save_entity(&self, entity: &TrackedEntity) -> Result<(), StoreError> {
        write_json_atomic(&self.entity_path(&entity.id), entity)
    }

    /// Every readable entity in file-name order. Unparseable files are skipped.
    pub fn list_entities(&self) -> Result<Vec<TrackedEntity>, StoreError> {
        let dir = self.projects_dir();
        let mut entities = Vec::new();

        for id in list_stems(&dir, "json")? {
            match self.load_entity(&id) {
                Ok(entity) => entities.push(entity),
                Err(err) => warn!(entity_id = %id, error = %err, "Skipping unreadable entity file"),
            }
        }

        Ok(entities)
    }

    // --- Snapshots ---

    /// Append one self-contained JSON line to the event log for `event.date`.
    pub fn append_snapshot(&self, event: &SnapshotEvent) -> Result<(), StoreError> {
        let path = self.snapshot_path(event.date);
        ensure_parent(&path)?;

        let mut line =
            serde_json::to_vec(event).map_err(|err| StoreError::serialization(&path, err))?;
        line.push(b'\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|err| StoreError::io(&path, err))?;
        file.write_all(&line)
            .map_err(|err| StoreError::io(&path, err))?;

        Ok(())
    }

    /// All events logged on `date`; no log file yields an empty list.
    pub fn load_snapshots(&self, date: NaiveDate) -> Result<Vec<SnapshotEvent>, StoreError> {
        let path = self.snapshot_path(date);
        let file = match fs::File::open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(StoreError::io(&path, err)),
        };

        // Lines are split on raw bytes so one corrupt line cannot fail the whole day.
        let mut events = Vec::new();
        for (index, line) in BufReader::new(file).split(b'\n').enumerate() {
            let line = line.map_err(|err| StoreError::io(&path, err))?;
            if line.trim_ascii().is_empty() {
                continue;
            }
            match serde_json::from_slice::<SnapshotEvent>(&line) {
                Ok(event) => events.push(event),
                Err(err) => warn!(
                    path = %path.display(),
                    line = index + 1,
                    error = %err,
                    "Skipping unparseable snapshot line"
                ),
            }
        }

        Ok(events)
    }

    // --- Rankings ---

    pub fn save_ranking(&self, ranking: &RankingArtifact) -> Result<(), StoreError> {
        write_json_atomic(&self.ranking_path(ranking.date), ranking)
    }

    pub fn load_ranking(&self, date: NaiveDate) -> Result<RankingArtifact, StoreError> {
        let id = date.format(DATE_FORMAT).to_string();
        read_json(&self.ranking_path(date), "ranking", &id)
    }

    /// Dates of all stored rankings, ascending.
    pub fn ranking_dates(&self) -> Result<Vec<NaiveDate>, StoreError> {
        let mut dates: Vec<NaiveDate> = list_stems(&self.rankings_dir(), "json")?
            .into_iter()
            .filter_map(|stem| match NaiveDate::parse_from_str(&stem, DATE_FORMAT) {
                Ok(date) => Some(date),
                Err(_) => {
                    debug!(file = %stem, "Ignoring ranking file without a date name");
                    None
                }
            })
            .collect();
        dates.sort();
        Ok(dates)
    }

    /// The ranking with the greatest date, if any exist.
    pub fn load_latest_ranking(&self) -> Result<Option<RankingArtifact>, StoreError> {
        match self.ranking_dates()?.last() {
            Some(&date) => self.load_ranking(date).map(Some),
            None => Ok(None),
        }
    }

    /// The most recent ranking dated strictly before `date`.
    pub fn load_latest_ranking_before(
        &self,
        date: NaiveDate,
    ) -> Result<Option<RankingArtifact>, StoreError> {
        let previous = self
            .ranking_dates()?
            .into_iter()
            .filter(|candidate| *candidate < date)
            .next_back();

        match previous {
            Some(previous) => self.load_ranking(previous).map(Some),
            None => Ok(None),
        }
    }

    // --- Taxonomy ---

    pub fn load_taxonomy(&self) -> Result<Taxonomy, StoreError> {
        read_json(&self.root.join(TAXONOMY_FILE), "taxonomy", TAXONOMY_FILE)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path, kind: &'static str, id: &str) -> Result<T, StoreError> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Err(StoreError::NotFound {
                kind,
                id: id.to_string(),
            });
        }
        Err(err) => return Err(StoreError::io(path, err)),
    };

    serde_json::from_slice(&data).map_err(|err| StoreError::serialization(path, err))
}

fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let dir = ensure_parent(path)?;

    let mut data =
        serde_json::to_vec_pretty(value).map_err(|err| StoreError::serialization(path, err))?;
    data.push(b'\n');

    // The temp file lives in the destination directory so the rename stays on one filesystem.
    let mut tmp = NamedTempFile::new_in(dir).map_err(|err| StoreError::io(dir, err))?;
    tmp.write_all(&data)
        .map_err(|err| StoreError::io(tmp.path(), err))?;
    tmp.as_file()
        .sync_all()
        .map_err(|err| StoreError::io(tmp.path(), err))?;
    tmp.persist(path).map_err(|err| StoreError::Persist {
        path: path.to_path_buf(),
        source: err.error,
    })?;

    Ok(())
}

fn ensure_parent(path: &Path) -> Result<&Path, StoreError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(|err| StoreError::io(dir, err))?;
    Ok(dir)
}

/// File stems with the given extension, sorted. A missing directory is empty.
fn list_stems(dir: &Path, extension: &str) -> Result<Vec<String>, StoreError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(StoreError::io(dir, err)),
    };

    let mut stems = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| StoreError::io(dir, err))?;
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|ext| ext.to_str()) != Some(extension) {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
            stems.push(stem.to_string());
        }
    }
    stems.sort();
    Ok(stems)
}
