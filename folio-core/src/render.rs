use chrono::Datelike;

use crate::data::{Basics, Education, Experience, Project, SiteData};
use crate::dom::{Dom, El, NodeId};

pub const PLACEHOLDER_IMAGE: &str = "assets/images/avatar-placeholder.png";

/// Values the renderers need that don't come from the content document.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderContext {
    pub year: i32,
    pub placeholder_image: String,
}

impl Default for RenderContext {
    fn default() -> Self {
        Self {
            year: chrono::Local::now().year(),
            placeholder_image: PLACEHOLDER_IMAGE.to_string(),
        }
    }
}

impl RenderContext {
    pub fn placeholder_image<S: Into<String>>(mut self, path: S) -> Self {
        self.placeholder_image = path.into();
        self
    }
}

/// Runs every section renderer. They target disjoint containers, so order
/// doesn't matter.
pub fn render_all<D: Dom>(dom: &mut D, data: &SiteData, ctx: &RenderContext) {
    render_basics(dom, &data.basics, ctx);
    render_skills(dom, &data.skills);
    render_projects(dom, &data.projects, &ctx.placeholder_image);
    render_experience(dom, &data.experience);
    render_education(dom, &data.education);
}

/// Finds a section container and empties it, so re-rendering never
/// accumulates nodes.
fn reset_container<D: Dom>(dom: &mut D, selector: &str) -> Option<NodeId> {
    let container = dom.select_one(selector)?;
    dom.clear_children(container);
    Some(container)
}

fn external_link(href: &str) -> El {
    El::new("a")
        .attr("href", href)
        .attr("target", "_blank")
        .attr("rel", "noopener")
}

fn date_range(start: &str, end: &str) -> String {
    format!("{start} — {end}")
}

pub fn render_basics<D: Dom>(dom: &mut D, basics: &Basics, ctx: &RenderContext) {
    dom.set_text("name", &basics.name);
    dom.set_text("footer-name", &basics.name);
    dom.set_text("title", &basics.title);
    dom.set_text("summary", &basics.summary);
    dom.set_text("location", &basics.location);
    dom.set_text("year", &ctx.year.to_string());

    if let Some(email) = dom.select_one("#email") {
        dom.set_attribute(email, "href", &format!("mailto:{}", basics.email));
        dom.set_text_content(email, &basics.email);
    }

    if let Some(website) = dom.select_one("#website") {
        dom.set_attribute(website, "href", &basics.website);
        dom.set_text_content(website, &basics.website);
    }

    if let Some(phone) = dom.select_one("#phone") {
        dom.set_text_content(phone, &basics.phone);
    }

    let avatar = basics.avatar.as_deref().filter(|src| !src.is_empty());
    if let (Some(img), Some(src)) = (dom.select_one("#avatar"), avatar) {
        dom.set_attribute(img, "src", src);
    }

    if let Some(socials) = reset_container(dom, "#socials") {
        for social in &basics.socials {
            let link = external_link(&social.url).text(&social.label);
            let item = dom.build(El::new("li").child(link));
            dom.append_child(socials, item);
        }
    }

    // Shown until the document title catches up
    dom.set_text("page-title-fallback", &basics.name);
}

pub fn render_skills<D: Dom>(dom: &mut D, skills: &[String]) {
    let Some(list) = reset_container(dom, "#skills") else {
        return;
    };

    for skill in skills {
        let chip = dom.build(El::new("li").class("chip").text(skill));
        dom.append_child(list, chip);
    }
}

pub fn render_projects<D: Dom>(dom: &mut D, projects: &[Project], placeholder: &str) {
    let Some(container) = reset_container(dom, "#projects") else {
        return;
    };

    for project in projects {
        let image = project
            .image
            .as_deref()
            .filter(|src| !src.is_empty())
            .unwrap_or(placeholder);

        let card = El::new("article")
            .class("card")
            .child(
                El::new("img")
                    .attr("src", image)
                    .attr("alt", &project.name)
                    .class("card-img"),
            )
            .child(
                El::new("div")
                    .class("card-body")
                    .child(El::new("h3").text(&project.name))
                    .child(El::new("p").text(&project.description))
                    .child(external_link(&project.link).class("btn btn-link").text("Ver más")),
            );

        let card = dom.build(card);
        dom.append_child(container, card);
    }
}

/// Entries stay in document order; nothing is sorted by date.
pub fn render_experience<D: Dom>(dom: &mut D, experience: &[Experience]) {
    let Some(container) = reset_container(dom, "#experience") else {
        return;
    };

    for entry in experience {
        let item = El::new("article")
            .class("item")
            .child(El::new("h3").text(format!("{} · {}", entry.role, entry.company)))
            .child(El::new("p").class("muted").text(date_range(&entry.start, &entry.end)))
            .child(El::new("p").text(&entry.description));

        let item = dom.build(item);
        dom.append_child(container, item);
    }
}

pub fn render_education<D: Dom>(dom: &mut D, education: &[Education]) {
    let Some(container) = reset_container(dom, "#education") else {
        return;
    };

    for entry in education {
        let item = El::new("article")
            .class("item")
            .child(El::new("h3").text(format!("{} · {}", entry.degree, entry.school)))
            .child(El::new("p").class("muted").text(date_range(&entry.start, &entry.end)));

        let item = dom.build(item);
        dom.append_child(container, item);
    }
}
