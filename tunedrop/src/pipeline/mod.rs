//! The download pipeline and its external collaborators.
//!
//! [`DownloadPipeline`] is the task body executed by the job queue for
//! submitted downloads. It drives a job through a fixed sequence of
//! stages and delegates the actual work to narrow collaborator traits:
//! URL resolution, fetching, library import, and rescan notification.

pub mod download;
pub mod fetcher;
pub mod importer;
pub mod rescan;
pub mod resolver;

pub use download::{DownloadPipeline, DownloadRequest};
pub use fetcher::{FetchRequest, FetchSummary, MediaFetcher, YtDlpConfig, YtDlpFetcher};
pub use importer::{BeetsImporter, LibraryImporter};
pub use rescan::{HttpRescanNotifier, RescanNotifier};
pub use resolver::{OdesliResolver, UrlResolver};
