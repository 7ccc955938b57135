use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Identifies one of the two archives taking part in a comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArchiveSide {
    First,
    Second,
}

impl ArchiveSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArchiveSide::First => "First",
            ArchiveSide::Second => "Second",
        }
    }
}

impl fmt::Display for ArchiveSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional passwords for the two archives.
///
/// Blank passwords count as not supplied.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    first: Option<String>,
    second: Option<String>,
}

impl Credentials {
    pub fn new(first: Option<String>, second: Option<String>) -> Self {
        Self {
            first: first.filter(|p| !p.is_empty()),
            second: second.filter(|p| !p.is_empty()),
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn for_side(&self, side: ArchiveSide) -> Option<&[u8]> {
        match side {
            ArchiveSide::First => self.first.as_deref().map(str::as_bytes),
            ArchiveSide::Second => self.second.as_deref().map(str::as_bytes),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("first", &self.first.as_ref().map(|_| "***"))
            .field("second", &self.second.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Content hash used to decide whether two equally sized entries are identical
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// 64-bit xxHash, fast and non-cryptographic
    #[default]
    Xxh64,
    /// BLAKE3, for callers that want collision resistance
    Blake3,
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashAlgorithm::Xxh64 => f.write_str("xxh64"),
            HashAlgorithm::Blake3 => f.write_str("blake3"),
        }
    }
}

/// Digest of an entry's full contents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentDigest {
    Xxh64(u64),
    Blake3([u8; 32]),
}

impl ContentDigest {
    pub fn to_hex(&self) -> String {
        match self {
            ContentDigest::Xxh64(value) => hex::encode(value.to_be_bytes()),
            ContentDigest::Blake3(bytes) => hex::encode(bytes),
        }
    }
}

/// Lowercase file extensions (with leading `.`) whose entries are left out of a comparison
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionSet {
    extensions: BTreeSet<String>,
}

impl ExclusionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from caller-supplied items.
    ///
    /// Items are trimmed and lowercased, blanks are dropped, and a missing
    /// leading dot is added, so `"LOG"` and `".log"` are the same exclusion.
    pub fn from_list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions = items
            .into_iter()
            .filter_map(|item| normalize_extension(item.as_ref()))
            .collect();
        Self { extensions }
    }

    /// Parse a comma separated list such as `".log, .tmp"`
    pub fn from_csv(list: &str) -> Self {
        Self::from_list(list.split(','))
    }

    pub fn extend(&mut self, other: &ExclusionSet) {
        self.extensions.extend(other.extensions.iter().cloned());
    }

    /// Whether an entry with this name is skipped
    pub fn excludes(&self, entry_name: &str) -> bool {
        !self.extensions.is_empty() && self.extensions.contains(&entry_extension(entry_name))
    }

    pub fn contains(&self, extension: &str) -> bool {
        normalize_extension(extension)
            .map(|ext| self.extensions.contains(&ext))
            .unwrap_or(false)
    }

    /// Normalized exclusions in sorted order
    pub fn as_list(&self) -> Vec<String> {
        self.extensions.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}

fn normalize_extension(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lower = trimmed.to_lowercase();
    if lower.starts_with('.') {
        Some(lower)
    } else {
        Some(format!(".{}", lower))
    }
}

/// Exclusion key for an archive entry name.
///
/// Only the final path component is considered, and its leading dots do not
/// start an extension (`.env` has none). The key is `.` followed by the
/// lowercased text after the last remaining dot; names without an extension
/// yield `"."`.
pub fn entry_extension(name: &str) -> String {
    let file_name = name.rsplit('/').next().unwrap_or(name);
    let stem_start = file_name.len() - file_name.trim_start_matches('.').len();
    let candidate = &file_name[stem_start..];

    match candidate.rfind('.') {
        Some(idx) => format!(".{}", candidate[idx + 1..].to_lowercase()),
        None => String::from("."),
    }
}

/// Render a byte count in binary units with two decimals (`1536` -> `"1.50 KB"`)
pub fn format_file_size(size_in_bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

    let mut size = size_in_bytes as f64;
    for unit in UNITS {
        if size < 1024.0 {
            return format!("{:.2} {}", size, unit);
        }
        size /= 1024.0;
    }
    format!("{:.2} TB", size)
}

/// Per-entry comparison record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryComparison {
    pub in_first: bool,
    pub in_second: bool,
    /// True only when the entry is in both archives and the contents match
    pub identical: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_first: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_second: Option<String>,
}

impl EntryComparison {
    pub fn status(&self) -> EntryStatus {
        match (self.in_first, self.in_second) {
            (true, true) if self.identical => EntryStatus::Identical,
            (true, true) => EntryStatus::Different,
            (true, false) => EntryStatus::FirstOnly,
            _ => EntryStatus::SecondOnly,
        }
    }
}

/// Derived classification of an entry, used for summaries and display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Identical,
    Different,
    FirstOnly,
    SecondOnly,
}

/// Mapping from entry name to its comparison record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComparisonResult {
    entries: BTreeMap<String, EntryComparison>,
}

impl ComparisonResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: String, record: EntryComparison) {
        self.entries.insert(name, record);
    }

    pub fn get(&self, name: &str) -> Option<&EntryComparison> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &EntryComparison)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn summary(&self) -> ComparisonSummary {
        let mut summary = ComparisonSummary {
            total: self.entries.len(),
            ..ComparisonSummary::default()
        };
        for record in self.entries.values() {
            match record.status() {
                EntryStatus::Identical => summary.identical += 1,
                EntryStatus::Different => summary.different += 1,
                EntryStatus::FirstOnly => summary.first_only += 1,
                EntryStatus::SecondOnly => summary.second_only += 1,
            }
        }
        summary
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonSummary {
    pub total: usize,
    pub identical: usize,
    pub different: usize,
    pub first_only: usize,
    pub second_only: usize,
}

impl ComparisonSummary {
    pub fn all_identical(&self) -> bool {
        self.identical == self.total
    }
}

/// Caller-facing envelope around a comparison result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub first_name: String,
    pub second_name: String,
    pub comparison: ComparisonResult,
    pub exclude_list: Vec<String>,
}
