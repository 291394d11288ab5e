pub mod archive;
pub mod execute;
pub mod references;

pub use archive::{load_archive, read_archive, ArchiveError, LoadedArchive};
pub use execute::{ImportMode, ImportReport, Importer};
