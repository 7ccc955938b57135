use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::debug;
use zcompare_common::{ArchiveSide, CompareError, EntryArchive};
use zip::result::ZipError;
use zip::ZipArchive;

/// Zip archive opened for comparison (read-only)
///
/// Entry names and uncompressed sizes are indexed once at open time; entry
/// contents are only read on demand through [`EntryArchive::open_entry`].
pub struct ZipArchiveHandle<R: Read + Seek> {
    side: ArchiveSide,
    archive: ZipArchive<R>,
    entries: Vec<ZipEntryInfo>,
    by_name: HashMap<String, usize>,
    encrypted: Option<Vec<bool>>,
}

#[derive(Debug, Clone)]
struct ZipEntryInfo {
    name: String,
    size: u64,
}

pub type ZipFileHandle = ZipArchiveHandle<File>;
pub type ZipBufferHandle = ZipArchiveHandle<Cursor<Vec<u8>>>;

impl ZipArchiveHandle<File> {
    /// Open a zip file on disk; the file is closed when the handle drops
    pub fn open_path(path: &Path, side: ArchiveSide, max_size: u64) -> Result<Self, CompareError> {
        let file = File::open(path).map_err(|e| {
            CompareError::Read(format!("cannot open {}: {}", path.display(), e))
        })?;
        Self::open(file, side, max_size)
    }
}

impl ZipArchiveHandle<Cursor<Vec<u8>>> {
    pub fn from_bytes(bytes: Vec<u8>, side: ArchiveSide, max_size: u64) -> Result<Self, CompareError> {
        Self::open(Cursor::new(bytes), side, max_size)
    }
}

impl<R: Read + Seek> ZipArchiveHandle<R> {
    /// Validate and index an archive.
    ///
    /// The serialized size is checked against `max_size` before the
    /// container is parsed, so an oversized input is rejected whether or not
    /// it is a valid zip.
    pub fn open(mut reader: R, side: ArchiveSide, max_size: u64) -> Result<Self, CompareError> {
        let size = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;

        if size > max_size {
            return Err(CompareError::SizeLimitExceeded {
                side,
                limit_mb: max_size / (1024 * 1024),
            });
        }

        let mut archive = ZipArchive::new(reader).map_err(|e| CompareError::InvalidArchive {
            side,
            reason: e.to_string(),
        })?;

        let mut entries = Vec::with_capacity(archive.len());
        let mut by_name = HashMap::with_capacity(archive.len());
        for i in 0..archive.len() {
            let file = archive.by_index_raw(i).map_err(|e| CompareError::InvalidArchive {
                side,
                reason: e.to_string(),
            })?;
            by_name.insert(file.name().to_string(), i);
            entries.push(ZipEntryInfo {
                name: file.name().to_string(),
                size: file.size(),
            });
        }

        debug!("{} archive: {} bytes, {} entries", side, size, entries.len());

        Ok(Self {
            side,
            archive,
            entries,
            by_name,
            encrypted: None,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn index_of(&self, name: &str) -> Result<usize, CompareError> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| CompareError::Read(format!("entry not found: {}", name)))
    }

    /// Per-entry encryption flags, probed once and cached
    fn encryption_flags(&mut self) -> Result<&[bool], CompareError> {
        if self.encrypted.is_none() {
            let mut flags = Vec::with_capacity(self.entries.len());
            for i in 0..self.entries.len() {
                let needs_password = match self.archive.by_index(i) {
                    Ok(_) => false,
                    Err(ZipError::UnsupportedArchive(msg)) if msg == ZipError::PASSWORD_REQUIRED => {
                        true
                    }
                    Err(e) => return Err(zip_read_error(&self.entries[i].name, e)),
                };
                flags.push(needs_password);
            }
            self.encrypted = Some(flags);
        }

        Ok(self.encrypted.as_deref().unwrap_or(&[]))
    }

    fn entry_is_encrypted(&mut self, index: usize) -> Result<bool, CompareError> {
        Ok(self.encryption_flags()?.get(index).copied().unwrap_or(false))
    }
}

impl<R: Read + Seek> EntryArchive for ZipArchiveHandle<R> {
    fn entry_names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    fn entry_size(&self, name: &str) -> Result<u64, CompareError> {
        let index = self.index_of(name)?;
        Ok(self.entries[index].size)
    }

    fn is_encrypted(&mut self) -> Result<bool, CompareError> {
        Ok(self.encryption_flags()?.iter().any(|&flag| flag))
    }

    /// Decrypt and drain the first encrypted entry.
    ///
    /// The zip header check only covers one byte of the key stream, so the
    /// entry is read to the end to let the CRC catch keys that slip past it.
    fn verify_password(&mut self, password: &[u8]) -> Result<(), CompareError> {
        let side = self.side;
        let first_encrypted = self.encryption_flags()?.iter().position(|&flag| flag);
        let Some(index) = first_encrypted else {
            return Ok(());
        };

        match self.archive.by_index_decrypt(index, password) {
            Ok(Ok(mut file)) => {
                io::copy(&mut file, &mut io::sink())
                    .map_err(|_| CompareError::IncorrectPassword(side))?;
                Ok(())
            }
            Ok(Err(_)) => Err(CompareError::IncorrectPassword(side)),
            Err(e) => Err(zip_read_error(&self.entries[index].name, e)),
        }
    }

    fn open_entry<'a>(
        &'a mut self,
        name: &str,
        password: Option<&[u8]>,
    ) -> Result<Box<dyn Read + 'a>, CompareError> {
        let side = self.side;
        let index = self.index_of(name)?;

        match password {
            Some(password) => match self.archive.by_index_decrypt(index, password) {
                Ok(Ok(file)) => Ok(Box::new(file)),
                Ok(Err(_)) => Err(CompareError::IncorrectPassword(side)),
                Err(e) => Err(zip_read_error(name, e)),
            },
            None => match self.archive.by_index(index) {
                Ok(file) => Ok(Box::new(file)),
                Err(ZipError::UnsupportedArchive(msg)) if msg == ZipError::PASSWORD_REQUIRED => {
                    Err(CompareError::MissingPassword(side))
                }
                Err(e) => Err(zip_read_error(name, e)),
            },
        }
    }

    /// A failing read of a decrypted entry means the key was wrong
    fn read_failure(&mut self, name: &str, err: io::Error) -> CompareError {
        let encrypted = self
            .index_of(name)
            .and_then(|index| self.entry_is_encrypted(index))
            .unwrap_or(false);

        if encrypted {
            CompareError::IncorrectPassword(self.side)
        } else {
            CompareError::Read(format!("{}: {}", name, err))
        }
    }
}

fn zip_read_error(name: &str, err: ZipError) -> CompareError {
    CompareError::Read(format!("{}: {}", name, err))
}
