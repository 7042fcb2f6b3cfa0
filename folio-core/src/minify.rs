//! Release-mode minification of rendered pages.

use std::borrow::Cow;

/// Minifies a page when `enabled`, otherwise hands it back untouched.
pub fn minify_html(html: &str, enabled: bool) -> Cow<'_, str> {
    if !enabled {
        return Cow::Borrowed(html);
    }

    let mut cfg = minify_html::Cfg::new();
    cfg.keep_closing_tags = true;
    cfg.keep_html_and_head_opening_tags = true;
    cfg.keep_comments = false;
    cfg.minify_css = true;
    cfg.minify_js = true;
    cfg.remove_bangs = true;
    cfg.remove_processing_instructions = true;

    let minified = minify_html::minify(html.as_bytes(), &cfg);
    Cow::Owned(String::from_utf8_lossy(&minified).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html>
  <head>
    <style>
      body { color: red; }
    </style>
  </head>
  <body>
    <!-- note -->
    <p>Hola mundo</p>
  </body>
</html>"#;

    #[test]
    fn disabled_returns_input() {
        assert!(matches!(minify_html(PAGE, false), Cow::Borrowed(p) if p == PAGE));
    }

    #[test]
    fn enabled_strips_whitespace_and_comments() {
        let minified = minify_html(PAGE, true);

        assert!(minified.len() < PAGE.len());
        assert!(!minified.contains("\n  "));
        assert!(!minified.contains("note"));
        assert!(minified.contains("<p>Hola mundo</p>"));
    }
}
