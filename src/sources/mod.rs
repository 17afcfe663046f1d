//! External dependency sources.

pub mod archive;
pub mod download;
pub mod fetch;

pub use download::{Downloader, HttpDownloader};
pub use fetch::{is_fetched, DependencyFetcher, FetchError};
