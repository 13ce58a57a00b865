//! Per-run record files and the final compressed bundle

use crate::error::ArchiveError;
use chrono::{DateTime, Local};
use docstruct_domain::{RunMetadata, StructuredRecord};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Name of the run-level summary entry
pub const METADATA_FILE_NAME: &str = "metadata.json";

/// Archive entry name for a section record, e.g. `section_007.json`
///
/// Numbers are zero-padded to at least 3 digits, and to the width of
/// `total_sections` beyond that, so names within one run sort in section order.
pub fn section_file_name(section_number: usize, total_sections: usize) -> String {
    let width = total_sections.to_string().len().max(3);
    format!("section_{:0width$}.json", section_number, width = width)
}

/// A file written into the run's working directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    name: String,
    path: PathBuf,
}

impl FileHandle {
    /// Entry name inside the archive
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Location on disk
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Writes records into a run's working directory and bundles them
#[derive(Debug, Clone)]
pub struct ArchiveBuilder {
    work_dir: PathBuf,
    total_sections: usize,
}

impl ArchiveBuilder {
    /// Create a builder for a run of `total_sections`, writing into `work_dir`
    /// (which must exist)
    pub fn new(work_dir: impl Into<PathBuf>, total_sections: usize) -> Self {
        Self {
            work_dir: work_dir.into(),
            total_sections,
        }
    }

    /// Persist a section record as `section_NNN.json`
    pub fn write(&self, record: &StructuredRecord) -> Result<FileHandle, ArchiveError> {
        let name = section_file_name(record.section_number, self.total_sections);
        self.write_json(name, record)
    }

    /// Persist the run summary as `metadata.json`
    pub fn write_metadata(&self, metadata: &RunMetadata) -> Result<FileHandle, ArchiveError> {
        self.write_json(METADATA_FILE_NAME.to_string(), metadata)
    }

    fn write_json<T: Serialize>(&self, name: String, value: &T) -> Result<FileHandle, ArchiveError> {
        let path = self.work_dir.join(&name);
        let json = serde_json::to_vec_pretty(value)?;
        fs::write(&path, json)?;
        debug!("Wrote {}", path.display());
        Ok(FileHandle { name, path })
    }

    /// Bundle `handles` (in the given order) into a new archive in `store`
    ///
    /// Returns the archive identifier. A failed bundle leaves no archive.
    pub fn finalize(
        &self,
        handles: &[FileHandle],
        store: &ArchiveStore,
    ) -> Result<String, ArchiveError> {
        let (archive_id, path, file) = store.create(Local::now())?;

        match write_zip(file, handles) {
            Ok(()) => {
                info!("Created archive {} with {} entries", archive_id, handles.len());
                Ok(archive_id)
            }
            Err(e) => {
                let _ = fs::remove_file(&path);
                Err(e)
            }
        }
    }
}

fn write_zip(file: File, handles: &[FileHandle]) -> Result<(), ArchiveError> {
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for handle in handles {
        zip.start_file(handle.name.as_str(), options)?;
        let mut source = File::open(&handle.path)?;
        io::copy(&mut source, &mut zip)?;
    }

    let mut writer = zip.finish()?;
    writer.flush()?;
    Ok(())
}

/// Directory of finalized archives
#[derive(Debug, Clone)]
pub struct ArchiveStore {
    dir: PathBuf,
}

impl ArchiveStore {
    /// Open (creating if needed) the archive directory
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, ArchiveError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Archive directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Resolve an identifier to a path inside the store
    ///
    /// Identifiers are plain `.zip` file names; anything that could leave
    /// the directory is rejected.
    pub fn path_for(&self, archive_id: &str) -> Result<PathBuf, ArchiveError> {
        let valid = !archive_id.is_empty()
            && archive_id.ends_with(".zip")
            && !archive_id.contains(['/', '\\'])
            && !archive_id.contains("..");
        if !valid {
            return Err(ArchiveError::InvalidId(archive_id.to_string()));
        }
        Ok(self.dir.join(archive_id))
    }

    /// Read an archive's bytes
    pub fn read(&self, archive_id: &str) -> Result<Vec<u8>, ArchiveError> {
        let path = self.path_for(archive_id)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(ArchiveError::NotFound(archive_id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Identifiers of all archives in the store, sorted
    pub fn list(&self) -> Result<Vec<String>, ArchiveError> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let name = entry?.file_name().to_string_lossy().into_owned();
            if name.ends_with(".zip") {
                ids.push(name);
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Claim a fresh timestamped archive file
    ///
    /// Names follow `structured_data_YYYYmmdd_HHMMSS.zip`; runs finishing in
    /// the same second get a `_2`, `_3`, ... suffix.
    fn create(&self, now: DateTime<Local>) -> Result<(String, PathBuf, File), ArchiveError> {
        let stem = format!("structured_data_{}", now.format("%Y%m%d_%H%M%S"));

        for n in 1..=u32::MAX {
            let archive_id = if n == 1 {
                format!("{}.zip", stem)
            } else {
                format!("{}_{}.zip", stem, n)
            };
            let path = self.dir.join(&archive_id);
            match File::options().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((archive_id, path, file)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(ArchiveError::Io(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("no free archive name for {}", stem),
        )))
    }
}
