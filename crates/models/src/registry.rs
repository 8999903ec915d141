use std::{
    fs::{self, OpenOptions},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};

use crate::{to_pretty_json, EsxiEntry, EsxiRecord, ModelError, RackRecord};

pub const SNAPSHOT_PREFIX: &str = "datacenter";

/// The rack registry: an ordered list of racks, serialized as a bare JSON
/// array.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(transparent)]
pub struct Registry {
    pub racks: Vec<RackRecord>,
}

impl Registry {
    pub fn new(racks: Vec<RackRecord>) -> Self {
        Self { racks }
    }

    /// Reads a registry file.
    ///
    /// A missing file is reported as [`ModelError::NotFound`] and a file
    /// that does not parse as [`ModelError::Decode`], so callers can decide
    /// how to fall back.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let data = fs::read_to_string(path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => ModelError::NotFound {
                path: path.to_path_buf(),
            },
            _ => ModelError::Read {
                path: path.to_path_buf(),
                source,
            },
        })?;

        serde_json::from_str(&data).map_err(|source| ModelError::Decode {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn rack(&self, rack_id: &str) -> Option<&RackRecord> {
        self.racks.iter().find(|r| r.rack_id == rack_id)
    }

    /// Finds the rack with `rack_id`, appending an empty one if none exists.
    pub fn rack_mut_or_insert(&mut self, rack_id: &str) -> &mut RackRecord {
        let idx = match self.racks.iter().position(|r| r.rack_id == rack_id) {
            Some(idx) => idx,
            None => {
                self.racks.push(RackRecord::new(rack_id));
                self.racks.len() - 1
            }
        };
        &mut self.racks[idx]
    }

    /// Places an ESXi host in its rack. An existing entry for the same IP in
    /// that rack is replaced in place.
    pub fn upsert_esxi(&mut self, entry: &EsxiEntry) -> &EsxiRecord {
        let rack = self.rack_mut_or_insert(&entry.rack_id);
        let (idx, _) = rack.esxis.insert_full(entry.esxi_ip.clone(), entry.to_record());
        &rack.esxis[idx]
    }

    pub fn esxi_count(&self) -> usize {
        self.racks.iter().map(|r| r.esxis.len()).sum()
    }

    /// Writes the registry to a new `datacenter_<YYYYMMDDHHMMSS>.json` file
    /// in `dir`. Existing snapshots are never overwritten.
    pub fn save_snapshot<Tz>(&self, dir: &Path, now: &DateTime<Tz>) -> Result<PathBuf, ModelError>
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let path = dir.join(snapshot_file_name(now));
        let bytes = to_pretty_json(self)?;

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|source| match source.kind() {
                ErrorKind::AlreadyExists => ModelError::SnapshotExists { path: path.clone() },
                _ => ModelError::Write {
                    path: path.clone(),
                    source,
                },
            })?;

        file.write_all(&bytes).map_err(|source| ModelError::Write {
            path: path.clone(),
            source,
        })?;

        Ok(path)
    }
}

pub fn snapshot_file_name<Tz>(now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    format!("{SNAPSHOT_PREFIX}_{}.json", now.format("%Y%m%d%H%M%S"))
}
