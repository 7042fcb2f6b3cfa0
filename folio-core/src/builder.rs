use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

use crate::bootstrap::{PageOptions, PageOutcome, boot};
use crate::config::Config;
use crate::data::{FileSource, HttpSource};
use crate::dom::Document;
use crate::minify::minify_html;

/// The page that gets pre-rendered; every other file is copied as-is.
pub const ENTRY_PAGE: &str = "index.html";

/// Directories shipped to the output besides HTML files.
const COPIED_DIRS: [&str; 2] = ["assets", "data"];

/// Stylesheet entry point, compiled rather than copied. Partials under
/// `scss/` are only reachable through its imports.
pub const STYLES_ENTRY: &str = "scss/main.scss";
pub const STYLES_OUTPUT: &str = "assets/css/main.css";

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Source directory not specified")]
    MissingSourceDir,
    #[error("Source directory does not exist: {}", .0.display())]
    InvalidPath(PathBuf),
    #[error("No index.html in {}", .0.display())]
    MissingEntry(PathBuf),
    #[error("Stylesheet error: {0}")]
    Styles(#[from] Box<grass::Error>),
    #[error("Scan error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// What a build produced.
#[derive(Debug)]
pub struct BuildReport {
    pub output_dir: PathBuf,
    pub outcome: PageOutcome,
    pub copied: Vec<PathBuf>,
    /// Compiled stylesheet, relative to the output directory.
    pub stylesheet: Option<PathBuf>,
}

pub struct SiteBuilder {
    source_dir: Option<PathBuf>,
    output_dir: PathBuf,
    config: Config,
    data_url: Option<String>,
    live_reload: Option<(String, u16)>,
    release: bool,
}

impl Default for SiteBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SiteBuilder {
    pub fn new() -> Self {
        Self {
            source_dir: None,
            output_dir: PathBuf::from("./dist"),
            config: Config::default(),
            data_url: None,
            live_reload: None,
            release: false,
        }
    }

    // Required configuration
    pub fn source_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.source_dir = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn output_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.output_dir = path.as_ref().to_path_buf();
        self
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Fetch the content document from a running site instead of the
    /// source tree.
    pub fn data_url<S: Into<String>>(mut self, url: Option<S>) -> Self {
        self.data_url = url.map(Into::into);
        self
    }

    /// Inject the live reload client into rendered pages.
    pub fn live_reload<S: Into<String>>(mut self, host: S, port: u16) -> Self {
        self.live_reload = Some((host.into(), port));
        self
    }

    /// Compress the stylesheet and minify HTML output.
    pub fn release(mut self, release: bool) -> Self {
        self.release = release;
        self
    }

    pub fn build(self) -> Result<Site, BuildError> {
        let source_dir = self.source_dir.ok_or(BuildError::MissingSourceDir)?;
        if !source_dir.is_dir() {
            return Err(BuildError::InvalidPath(source_dir));
        }
        if !source_dir.join(ENTRY_PAGE).is_file() {
            return Err(BuildError::MissingEntry(source_dir));
        }

        Ok(Site {
            source_dir,
            output_dir: self.output_dir,
            config: self.config,
            data_url: self.data_url,
            live_reload: self.live_reload,
            release: self.release,
        })
    }
}

pub struct Site {
    source_dir: PathBuf,
    output_dir: PathBuf,
    config: Config,
    data_url: Option<String>,
    live_reload: Option<(String, u16)>,
    release: bool,
}

impl Site {
    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Cleans the output directory, copies static files, compiles the
    /// stylesheet and pre-renders the entry page.
    pub async fn render_all(&self) -> Result<BuildReport, BuildError> {
        if self.output_dir.exists() {
            std::fs::remove_dir_all(&self.output_dir)?;
        }
        std::fs::create_dir_all(&self.output_dir)?;

        let copied = self.copy_static()?;
        log::info!("Copied {} files", copied.len());

        let stylesheet = self.compile_styles()?;
        let outcome = self.render_entry().await?;

        Ok(BuildReport {
            output_dir: self.output_dir.clone(),
            outcome,
            copied,
            stylesheet,
        })
    }

    fn copy_static(&self) -> Result<Vec<PathBuf>, BuildError> {
        let mut copied = Vec::new();

        for entry in WalkDir::new(&self.source_dir) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(&self.source_dir)
                .unwrap_or(entry.path());
            if !should_copy(relative) {
                continue;
            }

            let target = self.output_dir.join(relative);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            if self.release && is_html(relative) {
                let html = std::fs::read_to_string(entry.path())?;
                std::fs::write(&target, minify_html(&html, true).as_bytes())?;
            } else {
                std::fs::copy(entry.path(), &target)?;
            }
            log::debug!("Copied {}", relative.display());
            copied.push(relative.to_path_buf());
        }

        Ok(copied)
    }

    fn compile_styles(&self) -> Result<Option<PathBuf>, BuildError> {
        let entry = self.source_dir.join(STYLES_ENTRY);
        if !entry.is_file() {
            log::debug!("No {STYLES_ENTRY}, skipping stylesheet");
            return Ok(None);
        }

        let style = if self.release {
            grass::OutputStyle::Compressed
        } else {
            grass::OutputStyle::Expanded
        };
        let css = grass::from_path(&entry, &grass::Options::default().style(style))?;

        let target = self.output_dir.join(STYLES_OUTPUT);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&target, css)?;
        log::info!("Compiled {STYLES_ENTRY}");

        Ok(Some(PathBuf::from(STYLES_OUTPUT)))
    }

    async fn render_entry(&self) -> Result<PageOutcome, BuildError> {
        let skeleton = std::fs::read_to_string(self.source_dir.join(ENTRY_PAGE))?;
        let mut doc = Document::parse(&skeleton);
        let options = PageOptions::from(&self.config);

        let outcome = match &self.data_url {
            Some(url) => boot(&mut doc, &HttpSource::new(url), &options).await,
            None => {
                let path = self.source_dir.join(self.config.site().data_path);
                boot(&mut doc, &FileSource::new(path), &options).await
            }
        };

        let mut html = minify_html(&doc.to_html(), self.release).into_owned();
        if let Some((host, port)) = &self.live_reload {
            html = inject_livereload_script(&html, host, *port);
        }

        std::fs::write(self.output_dir.join(ENTRY_PAGE), html)?;
        log::info!("Rendered {ENTRY_PAGE}");

        Ok(outcome)
    }
}

fn should_copy(relative: &Path) -> bool {
    if relative == Path::new(ENTRY_PAGE) {
        return false;
    }
    let top_level = relative
        .components()
        .next()
        .and_then(|c| c.as_os_str().to_str())
        .unwrap_or_default();
    is_html(relative) || COPIED_DIRS.contains(&top_level)
}

fn is_html(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "html")
}

/// Shorthand for a one-off build with the defaults.
pub async fn build_site(
    config: &Config,
    source_dir: &Path,
    output_dir: &Path,
) -> Result<BuildReport, BuildError> {
    SiteBuilder::new()
        .source_dir(source_dir)
        .output_dir(output_dir)
        .config(config.clone())
        .build()?
        .render_all()
        .await
}

/// Adds the live reload client before `</body>`, or at the end when there is
/// no body tag.
pub fn inject_livereload_script(html: &str, host: &str, port: u16) -> String {
    let script = format!(
        r#"
<script>
(function() {{
    const socket = new WebSocket('ws://{host}:{port}/__livereload');
    socket.onmessage = function(event) {{
        if (event.data === 'reload') {{
            location.reload();
        }}
    }};
}})();
</script>
"#
    );

    match html.rfind("</body>") {
        Some(pos) => format!("{}{}{}", &html[..pos], script, &html[pos..]),
        None => format!("{html}{script}"),
    }
}
