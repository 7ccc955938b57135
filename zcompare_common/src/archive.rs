use crate::CompareError;
use std::io::{self, Read};

/// Read access to an opened archive.
///
/// This trait lets the comparator treat zip files, in-memory buffers, and
/// test doubles uniformly. Implementations only need random access to entries
/// by name; the comparator never writes.
pub trait EntryArchive {
    /// Entry names as stored in the archive
    fn entry_names(&self) -> Vec<String>;

    /// Uncompressed size of a named entry
    fn entry_size(&self, name: &str) -> Result<u64, CompareError>;

    /// Whether reading at least one entry requires a password
    fn is_encrypted(&mut self) -> Result<bool, CompareError>;

    /// Check a password eagerly, before any entry is read.
    ///
    /// The default accepts everything and leaves mismatches to surface from
    /// [`EntryArchive::open_entry`].
    fn verify_password(&mut self, _password: &[u8]) -> Result<(), CompareError> {
        Ok(())
    }

    /// Open a named entry for reading, decrypting with `password` when needed
    fn open_entry<'a>(
        &'a mut self,
        name: &str,
        password: Option<&[u8]>,
    ) -> Result<Box<dyn Read + 'a>, CompareError>;

    /// Translate an I/O failure raised while reading a named entry
    fn read_failure(&mut self, name: &str, err: io::Error) -> CompareError {
        CompareError::Read(format!("{}: {}", name, err))
    }
}
