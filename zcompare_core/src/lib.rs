pub mod archive;
pub mod comparison;
pub mod hashing;


#[cfg(test)]
mod tests_comparison;

pub use archive::{ZipArchiveHandle, ZipBufferHandle, ZipFileHandle};
pub use comparison::ArchiveComparator;
pub use hashing::ContentHasher;
