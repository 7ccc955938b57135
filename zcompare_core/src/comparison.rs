use crate::archive::ZipArchiveHandle;
use crate::hashing::ContentHasher;
use std::collections::BTreeSet;
use std::io::{Read, Seek};
use std::path::Path;
use tracing::{debug, info, warn};
use zcompare_common::{
    format_file_size, ArchiveSide, CompareError, CompareOptions, ComparisonReport,
    ComparisonResult, ContentDigest, Credentials, EntryArchive, EntryComparison, ExclusionSet,
};

/// Compares the entries of two archives
pub struct ArchiveComparator {
    options: CompareOptions,
    hasher: ContentHasher,
}

impl Default for ArchiveComparator {
    fn default() -> Self {
        Self::new(CompareOptions::default())
    }
}

impl ArchiveComparator {
    pub fn new(options: CompareOptions) -> Self {
        Self {
            options,
            hasher: ContentHasher::new(options.hash_algorithm),
        }
    }

    pub fn options(&self) -> &CompareOptions {
        &self.options
    }

    /// Compare two zip files on disk and wrap the result in a report
    pub fn compare_paths(
        &self,
        first: &Path,
        second: &Path,
        credentials: &Credentials,
        exclusions: &ExclusionSet,
    ) -> Result<ComparisonReport, CompareError> {
        info!("Comparing:");
        info!("  First:  {}", first.display());
        info!("  Second: {}", second.display());

        let first_handle =
            ZipArchiveHandle::open_path(first, ArchiveSide::First, self.options.max_archive_size)?;
        let second_handle =
            ZipArchiveHandle::open_path(second, ArchiveSide::Second, self.options.max_archive_size)?;

        let comparison = self.compare_handles(first_handle, second_handle, credentials, exclusions)?;

        Ok(build_report(display_name(first), display_name(second), comparison, exclusions))
    }

    /// Compare two zip archives held in memory and wrap the result in a report
    pub fn compare_bytes(
        &self,
        first: Vec<u8>,
        second: Vec<u8>,
        first_name: &str,
        second_name: &str,
        credentials: &Credentials,
        exclusions: &ExclusionSet,
    ) -> Result<ComparisonReport, CompareError> {
        debug!(
            "Comparing in-memory archives {} ({} bytes) and {} ({} bytes)",
            first_name,
            first.len(),
            second_name,
            second.len()
        );

        let first_handle =
            ZipArchiveHandle::from_bytes(first, ArchiveSide::First, self.options.max_archive_size)?;
        let second_handle =
            ZipArchiveHandle::from_bytes(second, ArchiveSide::Second, self.options.max_archive_size)?;

        let comparison = self.compare_handles(first_handle, second_handle, credentials, exclusions)?;

        Ok(build_report(first_name.to_string(), second_name.to_string(), comparison, exclusions))
    }

    /// Compare two zip archives from any seekable source (files, in-memory buffers)
    pub fn compare_readers<R1, R2>(
        &self,
        first: R1,
        second: R2,
        credentials: &Credentials,
        exclusions: &ExclusionSet,
    ) -> Result<ComparisonResult, CompareError>
    where
        R1: Read + Seek,
        R2: Read + Seek,
    {
        let first_handle = ZipArchiveHandle::open(first, ArchiveSide::First, self.options.max_archive_size)?;
        let second_handle =
            ZipArchiveHandle::open(second, ArchiveSide::Second, self.options.max_archive_size)?;

        self.compare_handles(first_handle, second_handle, credentials, exclusions)
    }

    fn compare_handles<R1, R2>(
        &self,
        mut first: ZipArchiveHandle<R1>,
        mut second: ZipArchiveHandle<R2>,
        credentials: &Credentials,
        exclusions: &ExclusionSet,
    ) -> Result<ComparisonResult, CompareError>
    where
        R1: Read + Seek,
        R2: Read + Seek,
    {
        self.compare(
            &mut first,
            &mut second,
            credentials.for_side(ArchiveSide::First),
            credentials.for_side(ArchiveSide::Second),
            exclusions,
        )
    }

    /// Compare two opened archives entry by entry.
    ///
    /// Entries whose extension is excluded are left out of the result.
    /// Contents are only read when an entry is present in both archives with
    /// equal uncompressed sizes. Any failure aborts the whole comparison.
    pub fn compare<A, B>(
        &self,
        first: &mut A,
        second: &mut B,
        password_first: Option<&[u8]>,
        password_second: Option<&[u8]>,
        exclusions: &ExclusionSet,
    ) -> Result<ComparisonResult, CompareError>
    where
        A: EntryArchive + ?Sized,
        B: EntryArchive + ?Sized,
    {
        let first_encrypted = require_password(first, ArchiveSide::First, password_first)?;
        let second_encrypted = require_password(second, ArchiveSide::Second, password_second)?;
        if let (true, Some(password)) = (first_encrypted, password_first) {
            verify_password(first, ArchiveSide::First, password)?;
        }
        if let (true, Some(password)) = (second_encrypted, password_second) {
            verify_password(second, ArchiveSide::Second, password)?;
        }

        let names_first: BTreeSet<String> = first.entry_names().into_iter().collect();
        let names_second: BTreeSet<String> = second.entry_names().into_iter().collect();

        info!(
            "Comparing {} entries with {} entries ({} exclusions, {} hash)",
            names_first.len(),
            names_second.len(),
            exclusions.len(),
            self.hasher.algorithm()
        );

        let mut result = ComparisonResult::new();

        for name in names_first.union(&names_second) {
            if exclusions.excludes(name) {
                debug!("Skipping excluded entry {}", name);
                continue;
            }

            let in_first = names_first.contains(name);
            let in_second = names_second.contains(name);

            let size_first = if in_first { Some(first.entry_size(name)?) } else { None };
            let size_second = if in_second { Some(second.entry_size(name)?) } else { None };

            let identical = match (size_first, size_second) {
                (Some(a), Some(b)) if a == b => {
                    let digest_first = self.hash_entry(first, name, password_first)?;
                    let digest_second = self.hash_entry(second, name, password_second)?;
                    debug!(
                        "{}: {} vs {}",
                        name,
                        digest_first.to_hex(),
                        digest_second.to_hex()
                    );
                    digest_first == digest_second
                }
                _ => false,
            };

            result.insert(
                name.clone(),
                EntryComparison {
                    in_first,
                    in_second,
                    identical,
                    size_first: size_first.map(format_file_size),
                    size_second: size_second.map(format_file_size),
                },
            );
        }

        let summary = result.summary();
        info!(
            "Compared {} entries: {} identical, {} different, {} first only, {} second only",
            summary.total, summary.identical, summary.different, summary.first_only, summary.second_only
        );

        Ok(result)
    }

    fn hash_entry<A>(
        &self,
        archive: &mut A,
        name: &str,
        password: Option<&[u8]>,
    ) -> Result<ContentDigest, CompareError>
    where
        A: EntryArchive + ?Sized,
    {
        let reader = archive.open_entry(name, password)?;
        let digest = self.hasher.hash_reader(reader);
        digest.map_err(|err| archive.read_failure(name, err))
    }
}

/// Probe for encryption; an encrypted archive without a password is rejected
fn require_password<A>(
    archive: &mut A,
    side: ArchiveSide,
    password: Option<&[u8]>,
) -> Result<bool, CompareError>
where
    A: EntryArchive + ?Sized,
{
    let encrypted = archive.is_encrypted()?;
    if encrypted && password.is_none() {
        warn!("{} archive is encrypted but no password was supplied", side);
        return Err(CompareError::MissingPassword(side));
    }
    Ok(encrypted)
}

fn verify_password<A>(archive: &mut A, side: ArchiveSide, password: &[u8]) -> Result<(), CompareError>
where
    A: EntryArchive + ?Sized,
{
    archive.verify_password(password).map_err(|err| {
        if matches!(err, CompareError::IncorrectPassword(_)) {
            warn!("{} archive rejected the supplied password", side);
        }
        err
    })
}

fn build_report(
    first_name: String,
    second_name: String,
    comparison: ComparisonResult,
    exclusions: &ExclusionSet,
) -> ComparisonReport {
    ComparisonReport {
        first_name,
        second_name,
        comparison,
        exclude_list: exclusions.as_list(),
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
