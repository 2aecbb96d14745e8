//! Final page documents: converted body plus title, labels and breadcrumbs

use std::path::{Component, Path, PathBuf};

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Characters escaped inside one segment of a relative link
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b']')
    .add(b'(')
    .add(b')')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'|')
    .add(b'\\')
    .add(b'^');

/// Link to an ancestor's exported file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breadcrumb {
    pub title: String,
    /// Export path of the ancestor, relative to the output root
    pub path: PathBuf,
}

/// Everything written around a page body
#[derive(Debug, Clone, Copy)]
pub struct PageDocument<'a> {
    pub title: &'a str,
    /// Export path of the page itself, relative to the output root
    pub path: &'a Path,
    pub labels: &'a [String],
    /// Empty when breadcrumbs are disabled
    pub breadcrumbs: &'a [Breadcrumb],
    pub include_title: bool,
}

/// Relative URL from the file at `from` to the file at `to`
///
/// Both paths are relative to the same root. Segments are percent-encoded so
/// the link survives spaces and brackets in titles.
pub fn relative_link(from: &Path, to: &Path) -> String {
    let base: Vec<Component> = from
        .parent()
        .map(|p| p.components().collect())
        .unwrap_or_default();
    let target: Vec<Component> = to.components().collect();

    let common = base
        .iter()
        .zip(target.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut segments: Vec<String> = Vec::new();
    segments.extend(std::iter::repeat_n("..".to_string(), base.len() - common));
    segments.extend(target[common..].iter().map(|c| {
        utf8_percent_encode(&c.as_os_str().to_string_lossy(), SEGMENT).to_string()
    }));
    segments.join("/")
}

fn escape_link_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '[' | ']' | '\\' | '*' | '_' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// YAML front matter of a Markdown page
#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
struct FrontMatter {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tags: Vec<String>,
}

fn front_matter(labels: &[String]) -> Option<String> {
    if labels.is_empty() {
        return None;
    }
    let matter = FrontMatter {
        tags: labels.to_vec(),
    };
    match serde_yaml::to_string(&matter) {
        Ok(yaml) => Some(format!(
            "---\n{}\n---\n",
            yaml.trim_start_matches("---\n").trim_end_matches('\n')
        )),
        Err(e) => {
            warn!(error = %e, "could not serialize labels, omitting front matter");
            None
        }
    }
}

/// Assemble a Markdown page
///
/// Labels become a `tags` list in YAML front matter.
pub fn render_markdown(doc: &PageDocument<'_>, body: &str) -> String {
    let mut out = String::new();

    if let Some(matter) = front_matter(doc.labels) {
        out.push_str(&matter);
    }

    if !doc.breadcrumbs.is_empty() {
        let trail: Vec<String> = doc
            .breadcrumbs
            .iter()
            .map(|crumb| {
                format!(
                    "[{}]({})",
                    escape_link_text(&crumb.title),
                    relative_link(doc.path, &crumb.path)
                )
            })
            .collect();
        out.push_str(&trail.join(" > "));
        out.push_str("\n\n");
    }

    if doc.include_title {
        out.push_str(&format!("# {}\n\n", doc.title.trim()));
    }

    out.push_str(body.trim());
    let trimmed_len = out.trim_end().len();
    out.truncate(trimmed_len);
    out.push('\n');
    out
}

/// Wrap a rendered body in a standalone HTML document
pub fn render_html(doc: &PageDocument<'_>, body: &str) -> String {
    let title = escape_html(doc.title);
    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    out.push_str(&format!("<title>{}</title>\n", title));
    if !doc.labels.is_empty() {
        out.push_str(&format!(
            "<meta name=\"keywords\" content=\"{}\">\n",
            escape_html(&doc.labels.join(", "))
        ));
    }
    out.push_str("</head>\n<body>\n");

    if !doc.breadcrumbs.is_empty() {
        let trail: Vec<String> = doc
            .breadcrumbs
            .iter()
            .map(|crumb| {
                format!(
                    "<a href=\"{}\">{}</a>",
                    escape_html(&relative_link(doc.path, &crumb.path)),
                    escape_html(&crumb.title)
                )
            })
            .collect();
        out.push_str(&format!("<nav class=\"breadcrumbs\">{}</nav>\n", trail.join(" &gt; ")));
    }

    if doc.include_title {
        out.push_str(&format!("<h1>{}</h1>\n", title));
    }
    out.push_str(body.trim());
    out.push_str("\n</body>\n</html>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crumbs() -> Vec<Breadcrumb> {
        vec![
            Breadcrumb {
                title: "Home".to_string(),
                path: PathBuf::from("Docs/Home/Home.md"),
            },
            Breadcrumb {
                title: "Getting Started".to_string(),
                path: PathBuf::from("Docs/Home/Getting Started.md"),
            },
        ]
    }

    #[test]
    fn relative_link_between_siblings_and_parents() {
        let page = Path::new("Docs/Home/Getting Started/Install.md");
        assert_eq!(
            relative_link(page, Path::new("Docs/Home/Getting Started.md")),
            "../Getting%20Started.md"
        );
        assert_eq!(
            relative_link(page, Path::new("Docs/Home/Getting Started/Other.md")),
            "Other.md"
        );
        assert_eq!(
            relative_link(Path::new("a.md"), Path::new("x/y (1).md")),
            "x/y%20%281%29.md"
        );
    }

    #[test]
    fn markdown_with_everything() {
        let labels = vec!["howto".to_string(), "linux".to_string()];
        let crumbs = crumbs();
        let doc = PageDocument {
            title: "Install",
            path: Path::new("Docs/Home/Getting Started/Install.md"),
            labels: &labels,
            breadcrumbs: &crumbs,
            include_title: true,
        };

        let rendered = render_markdown(&doc, "Body text\n\n");
        assert_eq!(
            rendered,
            "---\ntags:\n- howto\n- linux\n---\n\
             [Home](../Home.md) > [Getting Started](../Getting%20Started.md)\n\n\
             # Install\n\nBody text\n"
        );
    }

    #[test]
    fn markdown_without_decoration_is_just_the_body() {
        let doc = PageDocument {
            title: "Plain",
            path: Path::new("Plain.md"),
            labels: &[],
            breadcrumbs: &[],
            include_title: false,
        };
        assert_eq!(render_markdown(&doc, "Just this\n"), "Just this\n");
    }

    #[test]
    fn awkward_labels_read_back_unchanged() {
        let labels = vec![
            "tab\there".to_string(),
            "two\nlines".to_string(),
            "say \"hi\"".to_string(),
            "back\\slash".to_string(),
            "yes".to_string(),
            "- dash".to_string(),
            "bell\u{7}".to_string(),
        ];
        let doc = PageDocument {
            title: "Labels",
            path: Path::new("l.md"),
            labels: &labels,
            breadcrumbs: &[],
            include_title: false,
        };

        let rendered = render_markdown(&doc, "body");
        let yaml = rendered
            .strip_prefix("---\n")
            .and_then(|rest| rest.split_once("\n---\n"))
            .map(|(yaml, _)| yaml)
            .unwrap();
        let parsed: FrontMatter = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(parsed.tags, labels);
        assert!(rendered.ends_with("\n---\nbody\n"));
    }

    #[test]
    fn markdown_escapes_breadcrumb_titles() {
        let crumbs = vec![Breadcrumb {
            title: "[draft] notes".to_string(),
            path: PathBuf::from("d.md"),
        }];
        let doc = PageDocument {
            title: "Child",
            path: Path::new("c.md"),
            labels: &[],
            breadcrumbs: &crumbs,
            include_title: false,
        };
        assert!(render_markdown(&doc, "x").starts_with("[\\[draft\\] notes](d.md)\n"));
    }

    #[test]
    fn html_document_wraps_body() {
        let labels = vec!["a&b".to_string()];
        let crumbs = crumbs();
        let doc = PageDocument {
            title: "Install <Linux>",
            path: Path::new("Docs/Home/Getting Started/Install.html"),
            labels: &labels,
            breadcrumbs: &crumbs,
            include_title: true,
        };

        let html = render_html(&doc, "<p>Body</p>");
        assert!(html.starts_with("<!DOCTYPE html>\n"));
        assert!(html.contains("<meta charset=\"utf-8\">"));
        assert!(html.contains("<title>Install &lt;Linux&gt;</title>"));
        assert!(html.contains("<meta name=\"keywords\" content=\"a&amp;b\">"));
        assert!(html.contains("<a href=\"../Home.md\">Home</a> &gt; <a href=\"../Getting%20Started.md\">"));
        assert!(html.contains("<h1>Install &lt;Linux&gt;</h1>\n<p>Body</p>\n</body>"));
    }

    #[test]
    fn html_body_with_own_heading_is_not_repeated() {
        let doc = PageDocument {
            title: "Test Page",
            path: Path::new("Test Page.html"),
            labels: &[],
            breadcrumbs: &[],
            include_title: false,
        };

        let html = render_html(&doc, "<h1>Test Page</h1><p>Body</p>");
        assert!(html.contains("<title>Test Page</title>"));
        assert_eq!(html.matches("<h1>").count(), 1);
        assert!(html.contains("<body>\n<h1>Test Page</h1><p>Body</p>\n</body>"));
    }
}
