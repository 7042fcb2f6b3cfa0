//! Contact form wiring: relay target, live field validation and the submit gate.
//!
//! Validation is a pure function of one field's value ([`validate`]); both the
//! input handler and the submit handler call it, so they can never disagree.

use std::sync::LazyLock;

use regex::Regex;

use crate::dom::{Dom, NodeId};

pub const DEFAULT_RELAY_ENDPOINT: &str = "https://formsubmit.co/";

pub const FORM_ERROR_MESSAGE: &str = "Revisa los errores antes de enviar.";
pub const FORM_SENDING_MESSAGE: &str = "Enviando…";
pub const ERROR_CLASS: &str = "error-text";

// Browsers count U+FEFF as whitespace; Unicode does not
static EMAIL_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@\x{FEFF}]+@[^\s@\x{FEFF}]+\.[^\s@\x{FEFF}]+$")
        .expect("valid email pattern")
});

fn trimmed_len(value: &str) -> usize {
    value
        .trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}')
        .chars()
        .count()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    Email,
    Message,
}

impl Field {
    pub const ALL: [Field; 3] = [Field::Name, Field::Email, Field::Message];

    pub fn input_id(self) -> &'static str {
        match self {
            Field::Name => "cf-name",
            Field::Email => "cf-email",
            Field::Message => "cf-message",
        }
    }

    pub fn error_message(self) -> &'static str {
        match self {
            Field::Name => "Mínimo 2 caracteres.",
            Field::Email => "Correo inválido.",
            Field::Message => "Mínimo 10 caracteres.",
        }
    }
}

/// Outcome of validating one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldCheck {
    Valid,
    Invalid(&'static str),
}

impl FieldCheck {
    pub fn is_valid(self) -> bool {
        matches!(self, FieldCheck::Valid)
    }
}

pub fn is_valid_email(value: &str) -> bool {
    EMAIL_SHAPE.is_match(value)
}

pub fn validate(field: Field, value: &str) -> FieldCheck {
    let ok = match field {
        Field::Name => trimmed_len(value) >= 2,
        Field::Email => is_valid_email(value),
        Field::Message => trimmed_len(value) >= 10,
    };

    if ok {
        FieldCheck::Valid
    } else {
        FieldCheck::Invalid(field.error_message())
    }
}

/// Whether the browser should go ahead with the POST to the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitDecision {
    Proceed,
    Cancel,
}

/// Builds the relay URL for a destination address.
pub fn relay_action(relay_endpoint: &str, email_to: &str) -> String {
    format!(
        "{}/{}",
        relay_endpoint.trim_end_matches('/'),
        urlencoding::encode(email_to)
    )
}

/// A contact form that has been found in the page and pointed at the relay.
#[derive(Debug, Clone)]
pub struct ContactForm {
    form: NodeId,
    action: String,
}

impl ContactForm {
    /// Points `#contact-form` at the relay for `email_to`. Returns `None` when
    /// the page has no contact form.
    pub fn setup<D: Dom>(dom: &mut D, email_to: &str, relay_endpoint: &str) -> Option<Self> {
        let form = dom.select_one("#contact-form")?;
        let action = relay_action(relay_endpoint, email_to);
        dom.set_attribute(form, "action", &action);
        log::debug!("Contact form posts to {action}");

        Some(Self { form, action })
    }

    pub fn form(&self) -> NodeId {
        self.form
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    /// Checks one field against the current document. A field whose input is
    /// missing from the page counts as valid.
    pub fn check<D: Dom>(&self, dom: &D, field: Field) -> FieldCheck {
        match dom.get_element_by_id(field.input_id()) {
            Some(input) => validate(field, &dom.value(input)),
            None => FieldCheck::Valid,
        }
    }

    /// Input event: refresh every inline error message.
    pub fn on_input<D: Dom>(&self, dom: &mut D) {
        for field in Field::ALL {
            let message = match self.check(dom, field) {
                FieldCheck::Valid => "",
                FieldCheck::Invalid(message) => message,
            };
            let selector = format!("[data-error-for=\"{}\"]", field.input_id());
            if let Some(slot) = dom.select_one(&selector) {
                dom.set_text_content(slot, message);
            }
        }
    }

    /// Submit event: re-validate and decide whether the POST goes out.
    pub fn on_submit<D: Dom>(&self, dom: &mut D) -> SubmitDecision {
        let ok = Field::ALL.iter().all(|field| self.check(dom, *field).is_valid());
        let feedback = dom.select_one("#form-feedback");

        if !ok {
            if let Some(feedback) = feedback {
                dom.set_text_content(feedback, FORM_ERROR_MESSAGE);
                dom.add_class(feedback, ERROR_CLASS);
            }
            return SubmitDecision::Cancel;
        }

        if let Some(feedback) = feedback {
            dom.set_text_content(feedback, FORM_SENDING_MESSAGE);
            dom.remove_class(feedback, ERROR_CLASS);
        }
        SubmitDecision::Proceed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    const FORM: &str = r#"<html><body><main>
<form id="contact-form" method="POST">
  <input id="cf-name" name="name">
  <small data-error-for="cf-name"></small>
  <input id="cf-email" name="email" type="email">
  <small data-error-for="cf-email"></small>
  <textarea id="cf-message" name="message"></textarea>
  <small data-error-for="cf-message"></small>
  <p id="form-feedback"></p>
</form>
</main></body></html>"#;

    fn fill(doc: &mut Document, name: &str, email: &str, message: &str) {
        for (id, value) in [("cf-name", name), ("cf-email", email), ("cf-message", message)] {
            let input = doc.get_element_by_id(id).unwrap();
            doc.set_value(input, value);
        }
    }

    fn error_text(doc: &Document, input_id: &str) -> String {
        let slot = doc
            .select_one(&format!("[data-error-for=\"{input_id}\"]"))
            .unwrap();
        doc.text_content(slot)
    }

    #[test]
    fn email_shape() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("ab.co"));
        assert!(!is_valid_email("a b@c.co"));
        assert!(!is_valid_email("a@@b.co"));
        assert!(is_valid_email("first.last@mail.example.org"));
        assert!(!is_valid_email("a\u{feff}b@c.co"));
    }

    #[test]
    fn name_needs_two_characters() {
        assert_eq!(validate(Field::Name, "A"), FieldCheck::Invalid("Mínimo 2 caracteres."));
        assert_eq!(validate(Field::Name, "Al"), FieldCheck::Valid);
        assert!(!validate(Field::Name, "  A  ").is_valid());
        assert!(validate(Field::Name, "Ñu").is_valid());
        assert!(!validate(Field::Name, "\u{feff}a").is_valid());
        assert!(!validate(Field::Message, "\u{feff}123456789\u{feff}").is_valid());
    }

    #[test]
    fn message_needs_ten_characters() {
        assert!(!validate(Field::Message, "123456789").is_valid());
        assert!(validate(Field::Message, "1234567890").is_valid());
        assert!(!validate(Field::Message, "   123456789   ").is_valid());
    }

    #[test]
    fn setup_sets_encoded_relay_action() {
        let mut doc = Document::parse(FORM);
        let form =
            ContactForm::setup(&mut doc, "me+cv@example.com", DEFAULT_RELAY_ENDPOINT).unwrap();

        assert_eq!(form.action(), "https://formsubmit.co/me%2Bcv%40example.com");
        assert_eq!(doc.attribute(form.form(), "action"), Some(form.action()));
    }

    #[test]
    fn setup_without_form_is_a_no_op() {
        let mut doc = Document::parse("<html><body><main></main></body></html>");
        assert!(ContactForm::setup(&mut doc, "me@example.com", DEFAULT_RELAY_ENDPOINT).is_none());
    }

    #[test]
    fn input_event_sets_and_clears_inline_errors() {
        let mut doc = Document::parse(FORM);
        let form = ContactForm::setup(&mut doc, "me@example.com", DEFAULT_RELAY_ENDPOINT).unwrap();

        fill(&mut doc, "A", "nope", "short");
        form.on_input(&mut doc);
        assert_eq!(error_text(&doc, "cf-name"), "Mínimo 2 caracteres.");
        assert_eq!(error_text(&doc, "cf-email"), "Correo inválido.");
        assert_eq!(error_text(&doc, "cf-message"), "Mínimo 10 caracteres.");

        fill(&mut doc, "Ana", "ana@example.com", "short");
        form.on_input(&mut doc);
        assert_eq!(error_text(&doc, "cf-name"), "");
        assert_eq!(error_text(&doc, "cf-email"), "");
        assert_eq!(error_text(&doc, "cf-message"), "Mínimo 10 caracteres.");
    }

    #[test]
    fn invalid_submit_is_cancelled_with_error_feedback() {
        let mut doc = Document::parse(FORM);
        let form = ContactForm::setup(&mut doc, "me@example.com", DEFAULT_RELAY_ENDPOINT).unwrap();
        fill(&mut doc, "Ana", "ana@example", "Hola, me interesa tu perfil");

        assert_eq!(form.on_submit(&mut doc), SubmitDecision::Cancel);
        let feedback = doc.get_element_by_id("form-feedback").unwrap();
        assert_eq!(doc.text_content(feedback), FORM_ERROR_MESSAGE);
        assert!(doc.has_class(feedback, ERROR_CLASS));
    }

    #[test]
    fn valid_submit_proceeds_and_clears_error_class() {
        let mut doc = Document::parse(FORM);
        let form = ContactForm::setup(&mut doc, "me@example.com", DEFAULT_RELAY_ENDPOINT).unwrap();

        fill(&mut doc, "A", "", "");
        assert_eq!(form.on_submit(&mut doc), SubmitDecision::Cancel);

        fill(&mut doc, "Ana", "ana@example.com", "Hola, me interesa tu perfil");
        assert_eq!(form.on_submit(&mut doc), SubmitDecision::Proceed);
        let feedback = doc.get_element_by_id("form-feedback").unwrap();
        assert_eq!(doc.text_content(feedback), FORM_SENDING_MESSAGE);
        assert!(!doc.has_class(feedback, ERROR_CLASS));
    }

    #[test]
    fn missing_inputs_count_as_valid() {
        let mut doc = Document::parse(
            r#"<html><body><form id="contact-form"><p id="form-feedback"></p></form></body></html>"#,
        );
        let form = ContactForm::setup(&mut doc, "me@example.com", DEFAULT_RELAY_ENDPOINT).unwrap();
        assert_eq!(form.on_submit(&mut doc), SubmitDecision::Proceed);
    }
}
