//! Notebook template lookup helpers.
//!
//! # Responsibility
//! - Hold the built-in default template body served when a store has no
//!   row named `template`.
//! - Inject author/app footprint URIs into template placeholders.
//! - Provide the shallow marimo-app shape check used by client pulls.

use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};

/// Reserved notebook name holding the template body.
pub const TEMPLATE_NAME: &str = "template";

/// Body served when no `template` row exists.
pub const DEFAULT_TEMPLATE: &str = r#"import marimo

__generated_with = "0.18.4"
app = marimo.App(width="medium")

@app.cell
def __():
    import marimo as mo
    return (mo,)

@app.cell
def __(mo):
    mo.md("""
    # WPRDF Notebook

    Create RDF triples in Parquet format
    """)
    return

if __name__ == "__main__":
    app.run()
"#;

static MARIMO_APP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"app\s*=\s*marimo\.App\(").expect("valid marimo app regex"));
static AUTHOR_PLACEHOLDER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\bauthor\s*=\s*["'][^"']*["']"#).expect("valid author placeholder regex")
});
static APP_PLACEHOLDER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\bapp\s*=\s*["'][^"']*["']"#).expect("valid app placeholder regex")
});

/// Returns whether `code` declares a marimo app.
pub fn is_marimo_app(code: &str) -> bool {
    MARIMO_APP_RE.is_match(code)
}

/// Replaces `author="..."` and `app="..."` assignments with the given URIs.
///
/// Values are inserted literally; `$` in a URI is not treated as a capture
/// reference.
pub fn render_template(code: &str, author_uri: &str, app_uri: &str) -> String {
    let author = format!("author=\"{author_uri}\"");
    let app = format!("app=\"{app_uri}\"");
    let with_author = AUTHOR_PLACEHOLDER_RE.replace_all(code, NoExpand(&author));
    APP_PLACEHOLDER_RE
        .replace_all(&with_author, NoExpand(&app))
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::{is_marimo_app, render_template, DEFAULT_TEMPLATE};

    #[test]
    fn default_template_is_a_marimo_app() {
        assert!(is_marimo_app(DEFAULT_TEMPLATE));
        assert!(!is_marimo_app("print('plain script')"));
    }

    #[test]
    fn render_replaces_both_placeholders() {
        let code = "meta = dict(author='x', app=\"y\")\napp = marimo.App()";
        let rendered = render_template(code, "urn:author:1", "urn:app:$1");
        assert!(rendered.contains("author=\"urn:author:1\""));
        assert!(rendered.contains("app=\"urn:app:$1\""));
        assert!(rendered.contains("app = marimo.App()"));
    }
}
