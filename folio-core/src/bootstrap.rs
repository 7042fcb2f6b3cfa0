use crate::config::Config;
use crate::data::{DataLoadError, DataSource, SiteData, load_data};
use crate::dom::{Dom, ElementOptions, NodeId};
use crate::form::{ContactForm, DEFAULT_RELAY_ENDPOINT};
use crate::render::{RenderContext, render_all};

pub const ERROR_BANNER: &str = "Error cargando datos del CV.";

/// Everything the page-ready sequence needs besides the DOM and the data.
#[derive(Debug, Clone, PartialEq)]
pub struct PageOptions {
    pub render: RenderContext,
    pub relay_endpoint: String,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            render: RenderContext::default(),
            relay_endpoint: DEFAULT_RELAY_ENDPOINT.to_string(),
        }
    }
}

impl From<&Config> for PageOptions {
    fn from(config: &Config) -> Self {
        Self {
            render: RenderContext::default().placeholder_image(config.site().placeholder_image),
            relay_endpoint: config.form().relay_endpoint,
        }
    }
}

/// How a page load ended.
#[derive(Debug)]
pub enum PageOutcome {
    Done {
        data: SiteData,
        form: Option<ContactForm>,
    },
    Error(DataLoadError),
}

impl PageOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, PageOutcome::Done { .. })
    }
}

/// The page-ready sequence: load the data, render every section, then wire
/// the contact form. On failure the error banner goes into `main` and
/// whatever was already rendered stays.
pub async fn boot<D: Dom, S: DataSource>(
    dom: &mut D,
    source: &S,
    options: &PageOptions,
) -> PageOutcome {
    match render_page(dom, source, options).await {
        Ok((data, form)) => PageOutcome::Done { data, form },
        Err(err) => {
            log::error!("{err}");
            if show_error_banner(dom).is_none() {
                log::warn!("Page has no <main>; error banner not shown");
            }
            PageOutcome::Error(err)
        }
    }
}

async fn render_page<D: Dom, S: DataSource>(
    dom: &mut D,
    source: &S,
    options: &PageOptions,
) -> Result<(SiteData, Option<ContactForm>), DataLoadError> {
    log::debug!("Loading site data");
    let data = load_data(source).await?;

    log::debug!("Rendering sections");
    render_all(dom, &data, &options.render);

    let form = ContactForm::setup(dom, &data.contact.email, &options.relay_endpoint);
    if form.is_none() {
        log::debug!("No contact form on this page");
    }

    Ok((data, form))
}

/// Prepends the load-failure banner to `main`.
pub fn show_error_banner<D: Dom>(dom: &mut D) -> Option<NodeId> {
    let main = dom.select_one("main")?;
    let banner = dom.create_element(
        "div",
        ElementOptions {
            class_name: Some("alert error"),
            html: Some(ERROR_BANNER),
        },
    );
    dom.prepend_child(main, banner);
    Some(banner)
}
