pub mod bootstrap;
pub mod builder;
pub mod config;
pub mod data;
pub mod dom;
pub mod form;
pub mod minify;
pub mod render;

// Re-export main types
pub use bootstrap::{PageOptions, PageOutcome, boot};
pub use builder::{BuildError, BuildReport, Site, SiteBuilder, build_site};
pub use data::{DataLoadError, DataSource, FileSource, HttpSource, SiteData, load_data};
pub use dom::{Document, Dom};
pub use form::{ContactForm, SubmitDecision};
