use std::{
    fs,
    io::{self, BufReader, BufWriter},
    path::{Path, PathBuf},
};

use ::serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    error::CheckpointError,
    extractor::{
        corpus::{CorpusAccumulator, CorpusFingerprint, CorpusStatistics},
        discover::HashtagCounter,
        scan::ScanState,
    },
};

/// Scan state tagged with the corpus fingerprint it was started under
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stamped<T> {
    pub fingerprint: CorpusFingerprint,
    pub state: T,
}

/// Checkpoint directory layout: one cbor file per scan plus the finished
/// corpus statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointDir {
    root: PathBuf,
}

impl CheckpointDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// interrupted discovery scan
    pub fn discovery(&self) -> PathBuf {
        self.root.join("discovery.cbor")
    }

    /// interrupted aggregation scan
    pub fn aggregation(&self) -> PathBuf {
        self.root.join("corpus.cbor")
    }

    /// finished corpus statistics
    pub fn statistics(&self) -> PathBuf {
        self.root.join("statistics.cbor")
    }

    pub fn load_discovery(&self) -> Result<Option<ScanState<HashtagCounter>>, CheckpointError> {
        load(&self.discovery())
    }

    /// Interrupted aggregation, only if it was started under `fingerprint`
    pub fn load_aggregation(
        &self,
        fingerprint: &CorpusFingerprint,
    ) -> Result<Option<ScanState<CorpusAccumulator>>, CheckpointError> {
        match load::<Stamped<ScanState<CorpusAccumulator>>>(&self.aggregation())? {
            Some(stamped) if stamped.fingerprint == *fingerprint => Ok(Some(stamped.state)),
            Some(stamped) => {
                info!(
                    checkpoint = ?stamped.fingerprint,
                    current = ?fingerprint,
                    "aggregation checkpoint belongs to another corpus, restarting"
                );
                Ok(None)
            }
            None => Ok(None),
        }
    }

    pub fn save_statistics(&self, stats: &CorpusStatistics) -> Result<(), CheckpointError> {
        save(&self.statistics(), stats)
    }

    /// Statistics snapshot, only if it was computed under `fingerprint`
    pub fn load_statistics(&self, fingerprint: &CorpusFingerprint) -> Result<Option<CorpusStatistics>, CheckpointError> {
        match load::<CorpusStatistics>(&self.statistics())? {
            Some(stats) if stats.fingerprint == *fingerprint => Ok(Some(stats)),
            Some(stats) => {
                info!(
                    snapshot = ?stats.fingerprint,
                    current = ?fingerprint,
                    "statistics snapshot is stale, recomputing"
                );
                Ok(None)
            }
            None => Ok(None),
        }
    }
}

/// Write `value` as cbor to `path`.
///
/// The value goes to a sibling `.tmp` file first and is renamed over `path`,
/// so a crash never leaves a half-written checkpoint.
pub fn save<T: Serialize>(path: &Path, value: &T) -> Result<(), CheckpointError> {
    let io_err = |source: io::Error| CheckpointError::Io { path: path.to_path_buf(), source };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let tmp = path.with_extension("tmp");
    {
        let file = fs::File::create(&tmp).map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        serde_cbor::to_writer(&mut writer, value)?;
        io::Write::flush(&mut writer).map_err(io_err)?;
    }
    fs::rename(&tmp, path).map_err(io_err)?;
    debug!(path = %path.display(), "checkpoint written");
    Ok(())
}

/// Read a cbor checkpoint. `Ok(None)` if there is none at `path`.
pub fn load<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, CheckpointError> {
    let file = match fs::File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => return Err(CheckpointError::Io { path: path.to_path_buf(), source }),
    };
    let value = serde_cbor::from_reader(BufReader::new(file))?;
    debug!(path = %path.display(), "checkpoint loaded");
    Ok(Some(value))
}

/// Delete the checkpoint at `path` if there is one
pub fn remove(path: &Path) -> Result<(), CheckpointError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(CheckpointError::Io { path: path.to_path_buf(), source }),
    }
}
