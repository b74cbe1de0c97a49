pub mod assets;
pub mod capture;
pub mod config;
pub mod crawler;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod profile;
pub mod renderer;
pub mod result;
pub mod sink;

pub use assets::AssetStore;
pub use capture::PageCapturer;
pub use config::{CrawlConfig, Pacing};
pub use crawler::{Crawler, PageCallback, ProgressCallback};
pub use error::CaptureError;
pub use fetch::{HttpFetch, ReqwestFetch};
pub use profile::{DefaultProfiles, FixedProfile, Profile, ProfileSelector};
pub use renderer::{BrowserOptions, ChromiumRenderer, Renderer};
pub use result::{AssetCategory, AssetManifest, CapturedPage, CrawlSummary};
pub use sink::{FileSink, FsSink};
