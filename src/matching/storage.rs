//! Persistence for the index + ID-map artifact pair.
//!
//! Index file layout:
//!
//! Header (47 bytes):
//! - version: u8 (1)
//! - model_id: [u8; 32] (SHA256 hash of the embedding model identity)
//! - dimensions: u16 (little-endian)
//! - count: u64 (little-endian)
//! - checksum: u32 (CRC32 of header fields before checksum)
//!
//! Vectors (repeated `count` times):
//! - embedding: [f32; dimensions] (little-endian)
//!
//! The ID map is a sibling JSON array of identifier strings. Both files are
//! written together (temp file then rename) and read together; a pairing
//! mismatch between vector count and ID count rejects the whole artifact.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::matching::index::{IdMap, VectorIndex};

/// Current index file format version
const FORMAT_VERSION: u8 = 1;

/// Header size in bytes: version(1) + model_id(32) + dimensions(2) + count(8) + checksum(4)
const HEADER_SIZE: usize = 47;

#[derive(Debug, thiserror::Error)]
pub enum IndexStorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid id map: {0}")]
    InvalidIdMap(#[from] serde_json::Error),

    #[error("version mismatch: file version {0}, supported version {1}")]
    VersionMismatch(u8, u8),

    #[error("model mismatch: file was built with a different embedding model")]
    ModelMismatch,

    #[error("checksum mismatch: index file may be corrupted")]
    ChecksumMismatch,

    #[error("dimension mismatch: expected {expected}, file has {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("artifact pair mismatch: {vectors} vectors but {ids} ids")]
    PairingMismatch { vectors: usize, ids: usize },
}

/// Storage manager for the co-persisted artifact pair.
pub struct IndexStorage {
    index_path: PathBuf,
    id_map_path: PathBuf,
}

impl IndexStorage {
    pub fn new(index_path: PathBuf, id_map_path: PathBuf) -> Self {
        Self {
            index_path,
            id_map_path,
        }
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    pub fn exists(&self) -> bool {
        self.index_path.exists() && self.id_map_path.exists()
    }

    /// Load and validate both artifacts.
    pub fn load(
        &self,
        expected_model_id: &[u8; 32],
        expected_dimensions: usize,
    ) -> Result<(VectorIndex, IdMap), IndexStorageError> {
        let file = File::open(&self.index_path)?;
        let mut reader = BufReader::new(file);

        let header = self.read_header(&mut reader)?;
        self.validate_header(&header, expected_model_id, expected_dimensions)?;

        let dimensions = header.dimensions as usize;
        let mut index = VectorIndex::with_capacity(dimensions, header.count as usize);
        let mut embedding = vec![0f32; dimensions];
        let mut float_bytes = [0u8; 4];

        for _ in 0..header.count {
            for value in embedding.iter_mut() {
                reader.read_exact(&mut float_bytes)?;
                *value = f32::from_le_bytes(float_bytes);
            }
            // infallible: the buffer length is the index dimension
            let _ = index.push(&embedding);
        }

        let id_map_file = File::open(&self.id_map_path)?;
        let id_map: IdMap = serde_json::from_reader(BufReader::new(id_map_file))?;

        if id_map.len() != index.count() {
            return Err(IndexStorageError::PairingMismatch {
                vectors: index.count(),
                ids: id_map.len(),
            });
        }

        Ok((index, id_map))
    }

    /// Persist both artifacts atomically (temp file, fsync, rename).
    pub fn save(
        &self,
        index: &VectorIndex,
        id_map: &IdMap,
        model_id: &[u8; 32],
    ) -> Result<(), IndexStorageError> {
        if id_map.len() != index.count() {
            return Err(IndexStorageError::PairingMismatch {
                vectors: index.count(),
                ids: id_map.len(),
            });
        }

        let temp_index = self.index_path.with_extension("tmp");
        if let Err(err) = self.write_index_file(&temp_index, index, model_id) {
            let _ = std::fs::remove_file(&temp_index);
            return Err(err);
        }

        let temp_id_map = self.id_map_path.with_extension("tmp");
        if let Err(err) = self.write_id_map_file(&temp_id_map, id_map) {
            let _ = std::fs::remove_file(&temp_index);
            let _ = std::fs::remove_file(&temp_id_map);
            return Err(err);
        }

        std::fs::rename(&temp_index, &self.index_path)?;
        std::fs::rename(&temp_id_map, &self.id_map_path)?;

        Ok(())
    }

    fn write_index_file(
        &self,
        path: &Path,
        index: &VectorIndex,
        model_id: &[u8; 32],
    ) -> Result<(), IndexStorageError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        let header = Header {
            version: FORMAT_VERSION,
            model_id: *model_id,
            dimensions: index.dimensions() as u16,
            count: index.count() as u64,
        };
        self.write_header(&mut writer, &header)?;

        for position in 0..index.count() {
            // position bound checked by the loop
            let vector = index.vector(position).expect("position in range");
            for &value in vector {
                writer.write_all(&value.to_le_bytes())?;
            }
        }

        writer.flush()?;
        let file = writer
            .into_inner()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        file.sync_all()?;

        Ok(())
    }

    fn write_id_map_file(&self, path: &Path, id_map: &IdMap) -> Result<(), IndexStorageError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, id_map)?;

        writer.flush()?;
        let file = writer
            .into_inner()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        file.sync_all()?;

        Ok(())
    }

    fn read_header(&self, reader: &mut BufReader<File>) -> Result<Header, IndexStorageError> {
        let mut header_bytes = [0u8; HEADER_SIZE];
        reader.read_exact(&mut header_bytes)?;

        let version = header_bytes[0];
        if version > FORMAT_VERSION {
            return Err(IndexStorageError::VersionMismatch(version, FORMAT_VERSION));
        }

        let mut model_id = [0u8; 32];
        model_id.copy_from_slice(&header_bytes[1..33]);

        let dimensions = u16::from_le_bytes([header_bytes[33], header_bytes[34]]);
        let count = u64::from_le_bytes([
            header_bytes[35],
            header_bytes[36],
            header_bytes[37],
            header_bytes[38],
            header_bytes[39],
            header_bytes[40],
            header_bytes[41],
            header_bytes[42],
        ]);
        let stored_checksum = u32::from_le_bytes([
            header_bytes[43],
            header_bytes[44],
            header_bytes[45],
            header_bytes[46],
        ]);

        let computed_checksum = crc32fast::hash(&header_bytes[0..43]);
        if stored_checksum != computed_checksum {
            return Err(IndexStorageError::ChecksumMismatch);
        }

        Ok(Header {
            version,
            model_id,
            dimensions,
            count,
        })
    }

    fn validate_header(
        &self,
        header: &Header,
        expected_model_id: &[u8; 32],
        expected_dimensions: usize,
    ) -> Result<(), IndexStorageError> {
        if header.model_id != *expected_model_id {
            return Err(IndexStorageError::ModelMismatch);
        }

        if header.dimensions as usize != expected_dimensions {
            return Err(IndexStorageError::DimensionMismatch {
                expected: expected_dimensions,
                got: header.dimensions as usize,
            });
        }

        Ok(())
    }

    fn write_header(
        &self,
        writer: &mut BufWriter<File>,
        header: &Header,
    ) -> Result<(), IndexStorageError> {
        let mut header_bytes = [0u8; HEADER_SIZE];

        header_bytes[0] = header.version;
        header_bytes[1..33].copy_from_slice(&header.model_id);
        header_bytes[33..35].copy_from_slice(&header.dimensions.to_le_bytes());
        header_bytes[35..43].copy_from_slice(&header.count.to_le_bytes());

        let checksum = crc32fast::hash(&header_bytes[0..43]);
        header_bytes[43..47].copy_from_slice(&checksum.to_le_bytes());

        writer.write_all(&header_bytes)?;
        Ok(())
    }
}

#[derive(Debug)]
struct Header {
    version: u8,
    model_id: [u8; 32],
    dimensions: u16,
    count: u64,
}
