//! On-disk shard container
//!
//! Each shard of an encoded file is stored as `<name>.<index>.rsf`: a fixed
//! little-endian header followed by the shard payload. The header repeats the
//! set geometry so any single surviving file describes the whole set.

use crate::reed_solomon::Construction;
use binrw::{BinRead, BinReaderExt, BinWrite};
use log::{debug, warn};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const FORMAT_VERSION: u8 = 1;

/// Header bytes preceding the payload
pub const HEADER_LEN: usize = 44;

pub const SHARD_EXTENSION: &str = "rsf";

#[derive(Debug, Error)]
pub enum ShardFileError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed shard header: {0}")]
    Format(#[from] binrw::Error),

    #[error("Unsupported shard format version {0}")]
    UnsupportedVersion(u8),

    #[error("Unknown matrix construction {0}")]
    InvalidConstruction(u8),

    #[error("Shard {index} checksum mismatch: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        index: usize,
        expected: u32,
        actual: u32,
    },

    #[error("No shard files found for {0}")]
    NoShards(PathBuf),
}

pub type Result<T> = std::result::Result<T, ShardFileError>;

#[derive(Debug, Clone, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little, magic = b"RSFEC\0\0\x01")]
pub struct ShardHeader {
    pub version: u8,
    pub data_shards: u8,
    pub parity_shards: u8,
    pub index: u8,
    #[brw(pad_after = 3)]
    pub construction: u8,
    pub original_len: u64,
    pub shard_len: u64,
    pub stripe_size: u64,
    pub crc32: u32,
}

/// Geometry shared by every shard of one encoded file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetInfo {
    pub data_shards: usize,
    pub parity_shards: usize,
    pub construction: Construction,
    pub original_len: u64,
    pub shard_len: u64,
    pub stripe_size: u64,
}

impl SetInfo {
    pub fn total_shards(&self) -> usize {
        self.data_shards + self.parity_shards
    }
}

fn construction_code(construction: Construction) -> u8 {
    match construction {
        Construction::Vandermonde => 0,
        Construction::Cauchy => 1,
    }
}

fn construction_from_code(code: u8) -> Result<Construction> {
    match code {
        0 => Ok(Construction::Vandermonde),
        1 => Ok(Construction::Cauchy),
        other => Err(ShardFileError::InvalidConstruction(other)),
    }
}

/// One shard with its header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardFile {
    pub header: ShardHeader,
    pub payload: Vec<u8>,
}

impl ShardFile {
    /// Wrap `payload` as shard `index` of the set described by `info`
    ///
    /// Shard counts and index must fit the one-byte header fields, which
    /// holds for every valid encoder shape.
    pub fn new(info: &SetInfo, index: usize, payload: Vec<u8>) -> Self {
        let header = ShardHeader {
            version: FORMAT_VERSION,
            data_shards: info.data_shards as u8,
            parity_shards: info.parity_shards as u8,
            index: index as u8,
            construction: construction_code(info.construction),
            original_len: info.original_len,
            shard_len: payload.len() as u64,
            stripe_size: info.stripe_size,
            crc32: crc32fast::hash(&payload),
        };
        Self { header, payload }
    }

    pub fn index(&self) -> usize {
        self.header.index as usize
    }

    pub fn info(&self) -> Result<SetInfo> {
        Ok(SetInfo {
            data_shards: self.header.data_shards as usize,
            parity_shards: self.header.parity_shards as usize,
            construction: construction_from_code(self.header.construction)?,
            original_len: self.header.original_len,
            shard_len: self.header.shard_len,
            stripe_size: self.header.stripe_size,
        })
    }

    pub fn write_to<W: Write + Seek>(&self, writer: &mut W) -> Result<()> {
        self.header.write(writer)?;
        writer.write_all(&self.payload)?;
        Ok(())
    }

    /// Parse a shard, rejecting unknown versions and payload corruption
    pub fn read_from<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        let header: ShardHeader = reader.read_le()?;
        if header.version != FORMAT_VERSION {
            return Err(ShardFileError::UnsupportedVersion(header.version));
        }
        construction_from_code(header.construction)?;

        let mut payload = Vec::new();
        reader
            .by_ref()
            .take(header.shard_len)
            .read_to_end(&mut payload)?;
        if payload.len() as u64 != header.shard_len {
            return Err(ShardFileError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!(
                    "shard {} payload truncated: {} of {} bytes",
                    header.index,
                    payload.len(),
                    header.shard_len
                ),
            )));
        }

        let actual = crc32fast::hash(&payload);
        if actual != header.crc32 {
            return Err(ShardFileError::ChecksumMismatch {
                index: header.index as usize,
                expected: header.crc32,
                actual,
            });
        }

        Ok(Self { header, payload })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = BufReader::new(File::open(path)?);
        Self::read_from(&mut reader)
    }
}

/// `<base>.<index>.rsf`
pub fn shard_path(base: &Path, index: usize) -> PathBuf {
    let mut name = base.as_os_str().to_os_string();
    name.push(format!(".{}.{}", index, SHARD_EXTENSION));
    PathBuf::from(name)
}

/// Shards found on disk for one base path
#[derive(Debug)]
pub struct ShardSet {
    pub info: SetInfo,
    /// One slot per shard index, `None` for missing or damaged files
    pub shards: Vec<Option<Vec<u8>>>,
    /// Indices whose files exist but failed to load or disagree with the set
    pub damaged: Vec<usize>,
}

impl ShardSet {
    pub fn missing(&self) -> Vec<usize> {
        self.shards
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_none())
            .map(|(i, _)| i)
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.shards.iter().all(Option::is_some)
    }
}

/// Geometry claimed by the most shards, with its vote count
///
/// Ties go to the geometry seen first, i.e. the lowest-indexed shard.
fn majority_geometry(loaded: &[ShardFile]) -> Option<(SetInfo, usize)> {
    let mut tally: Vec<(SetInfo, usize)> = Vec::new();
    for info in loaded.iter().filter_map(|s| s.info().ok()) {
        match tally.iter_mut().find(|(seen, _)| *seen == info) {
            Some((_, votes)) => *votes += 1,
            None => tally.push((info, 1)),
        }
    }
    // max_by_key keeps the last maximum
    tally.into_iter().rev().max_by_key(|&(_, votes)| votes)
}

/// Load every shard file of `base`; unreadable files count as erasures
///
/// The checksum covers only the payload, so set geometry is the one most
/// readable headers agree on. Shards whose header disagrees with it are
/// treated as damaged.
pub fn load_shard_set(base: &Path) -> Result<ShardSet> {
    let mut loaded: Vec<ShardFile> = Vec::new();
    let mut damaged = Vec::new();

    for index in 0..u8::MAX as usize {
        let path = shard_path(base, index);
        if !path.exists() {
            continue;
        }
        match ShardFile::load(&path) {
            Ok(shard) if shard.index() == index => loaded.push(shard),
            Ok(shard) => {
                warn!(
                    "{} claims index {}, ignoring",
                    path.display(),
                    shard.index()
                );
                damaged.push(index);
            }
            Err(e) => {
                warn!("{}: {}", path.display(), e);
                damaged.push(index);
            }
        }
    }

    let (info, votes) = majority_geometry(&loaded)
        .ok_or_else(|| ShardFileError::NoShards(base.to_path_buf()))?;
    debug!(
        "Shard set {}: {} data + {} parity, {} readable, {} agree",
        base.display(),
        info.data_shards,
        info.parity_shards,
        loaded.len(),
        votes
    );

    let mut shards: Vec<Option<Vec<u8>>> = vec![None; info.total_shards()];
    for shard in loaded {
        let index = shard.index();
        let consistent = shard.info().map(|i| i == info).unwrap_or(false);
        if index >= shards.len() || !consistent {
            warn!("Shard {} does not match set geometry, ignoring", index);
            damaged.push(index);
            continue;
        }
        shards[index] = Some(shard.payload);
    }
    damaged.sort_unstable();

    Ok(ShardSet {
        info,
        shards,
        damaged,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn info() -> SetInfo {
        SetInfo {
            data_shards: 3,
            parity_shards: 2,
            construction: Construction::Cauchy,
            original_len: 10,
            shard_len: 4,
            stripe_size: 1024,
        }
    }

    #[test]
    fn header_layout() {
        let shard = ShardFile::new(&info(), 4, vec![1, 2, 3, 4]);
        let mut buffer = Cursor::new(Vec::new());
        shard.write_to(&mut buffer).unwrap();
        let bytes = buffer.into_inner();

        assert_eq!(bytes.len(), HEADER_LEN + 4);
        assert_eq!(&bytes[..8], b"RSFEC\0\0\x01");
        assert_eq!(&bytes[8..13], &[FORMAT_VERSION, 3, 2, 4, 1]);
        assert_eq!(&bytes[13..16], &[0, 0, 0]);
        assert_eq!(&bytes[16..24], &10u64.to_le_bytes());
        assert_eq!(&bytes[24..32], &4u64.to_le_bytes());
        assert_eq!(&bytes[32..40], &1024u64.to_le_bytes());
        assert_eq!(&bytes[40..44], &crc32fast::hash(&[1, 2, 3, 4]).to_le_bytes());
        assert_eq!(&bytes[44..], &[1, 2, 3, 4]);
    }

    #[test]
    fn read_back_and_info() {
        let shard = ShardFile::new(&info(), 1, vec![9; 4]);
        let mut buffer = Cursor::new(Vec::new());
        shard.write_to(&mut buffer).unwrap();
        buffer.set_position(0);

        let parsed = ShardFile::read_from(&mut buffer).unwrap();
        assert_eq!(parsed, shard);
        assert_eq!(parsed.info().unwrap(), info());
    }

    #[test]
    fn corrupted_payload_fails_checksum() {
        let shard = ShardFile::new(&info(), 0, vec![5; 4]);
        let mut buffer = Cursor::new(Vec::new());
        shard.write_to(&mut buffer).unwrap();
        let mut bytes = buffer.into_inner();
        bytes[HEADER_LEN + 2] ^= 0xFF;

        let err = ShardFile::read_from(&mut Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, ShardFileError::ChecksumMismatch { index: 0, .. }));
    }

    #[test]
    fn bad_magic_and_version() {
        let shard = ShardFile::new(&info(), 0, vec![5; 4]);
        let mut buffer = Cursor::new(Vec::new());
        shard.write_to(&mut buffer).unwrap();
        let bytes = buffer.into_inner();

        let mut bad_magic = bytes.clone();
        bad_magic[0] = b'X';
        assert!(matches!(
            ShardFile::read_from(&mut Cursor::new(bad_magic)),
            Err(ShardFileError::Format(_))
        ));

        let mut bad_version = bytes;
        bad_version[8] = 9;
        assert!(matches!(
            ShardFile::read_from(&mut Cursor::new(bad_version)),
            Err(ShardFileError::UnsupportedVersion(9))
        ));
    }

    #[test]
    fn shard_paths() {
        assert_eq!(
            shard_path(Path::new("/tmp/out/data.bin"), 7),
            PathBuf::from("/tmp/out/data.bin.7.rsf")
        );
    }

    #[test]
    fn load_set_marks_damage() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("file.dat");
        for index in 0..5 {
            if index == 2 {
                continue;
            }
            ShardFile::new(&info(), index, vec![index as u8; 4])
                .save(&shard_path(&base, index))
                .unwrap();
        }
        std::fs::write(shard_path(&base, 3), b"garbage").unwrap();

        let set = load_shard_set(&base).unwrap();
        assert_eq!(set.info, info());
        assert_eq!(set.missing(), vec![2, 3]);
        assert_eq!(set.damaged, vec![3]);
        assert_eq!(set.shards[4].as_deref(), Some(&[4u8; 4][..]));
        assert!(!set.is_complete());
    }

    #[test]
    fn load_set_outvotes_damaged_header() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("file.dat");
        for index in 0..5 {
            ShardFile::new(&info(), index, vec![index as u8; 4])
                .save(&shard_path(&base, index))
                .unwrap();
        }

        // original_len lives outside the payload checksum
        let path = shard_path(&base, 0);
        let mut bytes = std::fs::read(&path).unwrap();
        bytes[16] ^= 0x6F;
        std::fs::write(&path, bytes).unwrap();

        let set = load_shard_set(&base).unwrap();
        assert_eq!(set.info, info());
        assert_eq!(set.damaged, vec![0]);
        assert_eq!(set.missing(), vec![0]);
        for index in 1..5 {
            assert_eq!(set.shards[index].as_deref(), Some(&[index as u8; 4][..]));
        }
    }

    #[test]
    fn load_set_tie_prefers_lowest_index() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("file.dat");
        let other = SetInfo {
            original_len: 11,
            ..info()
        };
        ShardFile::new(&info(), 1, vec![1; 4])
            .save(&shard_path(&base, 1))
            .unwrap();
        ShardFile::new(&other, 3, vec![3; 4])
            .save(&shard_path(&base, 3))
            .unwrap();

        let set = load_shard_set(&base).unwrap();
        assert_eq!(set.info, info());
        assert_eq!(set.damaged, vec![3]);
    }

    #[test]
    fn load_set_without_files() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_shard_set(&dir.path().join("nothing")),
            Err(ShardFileError::NoShards(_))
        ));
    }
}
