//! Rendered page HTML to Markdown
//!
//! The `body.view` HTML is parsed into a [`Dom`]; rendering walks it
//! depth-first while tracking the line prefix for lists and quotes.

use crate::dom::{Dom, NodeData};
use crate::traits::Converter;

/// Bundled HTML to Markdown converter
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlToMarkdown;

impl HtmlToMarkdown {
    pub fn new() -> Self {
        Self
    }
}

impl Converter for HtmlToMarkdown {
    fn convert(&self, html: &str) -> String {
        let dom = Dom::parse(html);
        let mut renderer = Renderer::new(&dom);
        renderer.walk_children(Dom::DOCUMENT);
        renderer.finish()
    }
}

/// Smallest fence (at least three) that does not occur inside `content`
fn fence_length(content: &str) -> usize {
    longest_run(content, '`').max(2) + 1
}

fn longest_run(content: &str, ch: char) -> usize {
    let mut max_run = 0;
    let mut current = 0;
    for c in content.chars() {
        if c == ch {
            current += 1;
            max_run = max_run.max(current);
        } else {
            current = 0;
        }
    }
    max_run
}

#[derive(Debug)]
struct ListContext {
    ordered: bool,
    counter: usize,
}

struct Renderer<'a> {
    doc: &'a Dom,
    out: String,
    line_prefix: String,
    list_stack: Vec<ListContext>,
    at_line_start: bool,
    line_has_content: bool,
    /// A block ended; the next content starts after a blank line
    pending_blank: bool,
    /// Collapsed whitespace not yet written
    pending_space: bool,
    /// An opening marker was just written; leading whitespace is dropped
    after_marker: bool,
}

impl<'a> Renderer<'a> {
    fn new(doc: &'a Dom) -> Self {
        Self {
            doc,
            out: String::new(),
            line_prefix: String::new(),
            list_stack: Vec::new(),
            at_line_start: true,
            line_has_content: false,
            pending_blank: false,
            pending_space: false,
            after_marker: false,
        }
    }

    fn finish(self) -> String {
        let trimmed = self.out.trim_end();
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("{}\n", trimmed)
        }
    }

    fn newline(&mut self) {
        self.out.push('\n');
        self.at_line_start = true;
        self.line_has_content = false;
        self.pending_space = false;
    }

    fn ensure_line_started(&mut self) {
        if self.at_line_start {
            self.out.push_str(&self.line_prefix);
            self.at_line_start = false;
        }
    }

    fn start_block(&mut self) {
        self.pending_space = false;
        if self.out.is_empty() {
            self.pending_blank = false;
            return;
        }
        if !self.at_line_start && self.line_has_content {
            self.newline();
        }
        if self.pending_blank && self.at_line_start {
            self.out.push_str(self.line_prefix.trim_end());
            self.out.push('\n');
        }
        self.pending_blank = false;
    }

    fn end_block(&mut self) {
        self.pending_blank = true;
        self.pending_space = false;
    }

    /// Prepare to write inline content on the current line
    fn begin_inline(&mut self) {
        if self.pending_blank {
            self.start_block();
        }
        if self.pending_space && self.line_has_content && !self.after_marker {
            self.out.push(' ');
        }
        self.pending_space = false;
        self.ensure_line_started();
    }

    fn push_content(&mut self, s: &str) {
        self.out.push_str(s);
        self.line_has_content = true;
        self.after_marker = false;
    }

    fn write_text(&mut self, text: &str) {
        for c in text.chars() {
            if c.is_whitespace() {
                if self.line_has_content && !self.after_marker {
                    self.pending_space = true;
                }
                continue;
            }

            self.begin_inline();
            match c {
                '\\' | '*' | '_' | '`' | '[' | ']' => self.out.push('\\'),
                '#' if !self.line_has_content => self.out.push('\\'),
                _ => {}
            }
            self.out.push(c);
            self.line_has_content = true;
            self.after_marker = false;
        }
    }

    fn walk_children(&mut self, id: usize) {
        let doc = self.doc;
        for &child in doc.children(id) {
            self.walk_node(child);
        }
    }

    fn walk_node(&mut self, id: usize) {
        let doc = self.doc;
        match doc.data(id) {
            NodeData::Text(text) => self.write_text(text),
            NodeData::Element { name, .. } => self.walk_element(id, name),
            NodeData::Document => self.walk_children(id),
            NodeData::Comment => {}
        }
    }

    fn walk_element(&mut self, id: usize, name: &str) {
        let doc = self.doc;
        match name {
            "script" | "style" | "head" | "title" | "noscript" | "template" | "iframe" => {}

            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = name[1..].parse::<usize>().unwrap_or(1);
                self.start_block();
                self.ensure_line_started();
                self.push_content(&format!("{} ", "#".repeat(level)));
                self.after_marker = true;
                self.walk_children(id);
                self.end_block();
            }

            "p" | "div" | "section" | "article" | "main" | "header" | "footer" | "nav"
            | "aside" | "figure" | "figcaption" | "dl" | "dt" | "dd" | "address" | "details"
            | "summary" | "center" | "body" | "html" => {
                self.start_block();
                self.walk_children(id);
                self.end_block();
            }

            "ul" | "ol" => {
                self.start_block();
                let start = if name == "ol" {
                    doc.attr(id, "start")
                        .and_then(|s| s.trim().parse::<usize>().ok())
                        .unwrap_or(1)
                } else {
                    1
                };
                self.list_stack.push(ListContext {
                    ordered: name == "ol",
                    counter: start.saturating_sub(1),
                });
                self.walk_children(id);
                self.list_stack.pop();
                self.end_block();
            }

            "li" => self.write_list_item(id),

            "blockquote" => {
                self.start_block();
                let old_prefix = self.line_prefix.clone();
                self.line_prefix.push_str("> ");
                self.walk_children(id);
                self.line_prefix = old_prefix;
                self.end_block();
            }

            "pre" => self.write_code_block(id),

            "code" | "kbd" | "samp" | "tt" => self.write_inline_code(id),

            "strong" | "b" => self.wrap_inline(id, "**", "**"),
            "em" | "i" | "cite" => self.wrap_inline(id, "*", "*"),
            "del" | "s" | "strike" => self.wrap_inline(id, "~~", "~~"),

            "a" => match doc.attr(id, "href").map(str::trim) {
                Some(href) if !href.is_empty() => {
                    let target = if href.contains(' ') {
                        format!("<{}>", href)
                    } else {
                        href.to_string()
                    };
                    let before = self.out.len();
                    self.wrap_inline(id, "[", &format!("]({})", target));
                    if self.out.len() == before {
                        self.begin_inline();
                        self.push_content(&format!("<{}>", href));
                    }
                }
                _ => self.walk_children(id),
            },

            "img" => {
                let alt = doc
                    .attr(id, "alt")
                    .unwrap_or("")
                    .replace('[', "\\[")
                    .replace(']', "\\]");
                let src = doc.attr(id, "src").unwrap_or("").trim().to_string();
                if !src.is_empty() {
                    self.begin_inline();
                    self.push_content(&format!("![{}]({})", alt, src));
                }
            }

            "br" => {
                if self.line_has_content {
                    self.out.push('\\');
                    self.newline();
                }
            }

            "hr" => {
                self.start_block();
                self.ensure_line_started();
                self.push_content("---");
                self.end_block();
            }

            "table" => self.write_table(id),

            _ => self.walk_children(id),
        }
    }

    fn starts_with_space(&self, id: usize) -> bool {
        for &child in self.doc.children(id) {
            match self.doc.data(child) {
                NodeData::Text(text) if text.is_empty() => continue,
                NodeData::Text(text) => return text.starts_with(char::is_whitespace),
                NodeData::Element { .. } => return self.starts_with_space(child),
                NodeData::Document | NodeData::Comment => continue,
            }
        }
        false
    }

    fn wrap_inline(&mut self, id: usize, open: &str, close: &str) {
        if self.line_has_content && !self.after_marker && self.starts_with_space(id) {
            self.pending_space = true;
        }
        self.begin_inline();

        let start = self.out.len();
        let had_content = self.line_has_content;
        let was_after_marker = self.after_marker;
        self.out.push_str(open);
        self.line_has_content = true;
        self.after_marker = true;
        let inner = self.out.len();

        self.walk_children(id);

        if self.out.len() == inner {
            self.out.truncate(start);
            self.line_has_content = had_content;
            self.after_marker = was_after_marker;
        } else {
            self.push_content(close);
        }
    }

    fn collect_raw_text(&self, id: usize, buf: &mut String) {
        for &child in self.doc.children(id) {
            match self.doc.data(child) {
                NodeData::Text(text) => buf.push_str(text),
                NodeData::Element { name, .. } if name == "br" => buf.push('\n'),
                NodeData::Element { .. } => self.collect_raw_text(child, buf),
                NodeData::Document | NodeData::Comment => {}
            }
        }
    }

    fn write_inline_code(&mut self, id: usize) {
        let mut raw = String::new();
        self.collect_raw_text(id, &mut raw);
        let content = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        if content.is_empty() {
            return;
        }

        let ticks = "`".repeat(longest_run(&content, '`') + 1);
        let spacer = if content.starts_with('`') || content.ends_with('`') {
            " "
        } else {
            ""
        };
        self.begin_inline();
        self.push_content(&format!("{}{}{}{}{}", ticks, spacer, content, spacer, ticks));
    }

    fn code_language(&self, id: usize) -> String {
        if let Some(params) = self.doc.attr(id, "data-syntaxhighlighter-params") {
            let brush = params
                .split(';')
                .filter_map(|part| part.trim().strip_prefix("brush:"))
                .map(str::trim)
                .next();
            if let Some(brush) = brush {
                return brush.to_string();
            }
        }

        let mut candidates = vec![id];
        candidates.extend(self.doc.children(id).iter().copied());
        for node in candidates {
            if let Some(class) = self.doc.attr(node, "class") {
                if let Some(lang) = class
                    .split_whitespace()
                    .find_map(|c| c.strip_prefix("language-").or_else(|| c.strip_prefix("lang-")))
                {
                    return lang.to_string();
                }
            }
        }
        String::new()
    }

    fn write_code_block(&mut self, id: usize) {
        let mut raw = String::new();
        self.collect_raw_text(id, &mut raw);
        let code = raw.strip_prefix('\n').unwrap_or(&raw).trim_end();
        let fence = "`".repeat(fence_length(code));
        let language = self.code_language(id);

        self.start_block();
        self.ensure_line_started();
        self.push_content(&format!("{}{}", fence, language));
        self.newline();
        for line in code.lines() {
            self.ensure_line_started();
            self.out.push_str(line);
            self.newline();
        }
        self.ensure_line_started();
        self.push_content(&fence);
        self.end_block();
    }

    fn write_list_item(&mut self, id: usize) {
        if !self.at_line_start {
            self.newline();
        }
        self.pending_blank = false;
        self.ensure_line_started();

        let bullet = match self.list_stack.last_mut() {
            Some(ctx) if ctx.ordered => {
                ctx.counter += 1;
                format!("{}. ", ctx.counter)
            }
            _ => "- ".to_string(),
        };
        self.out.push_str(&bullet);
        self.line_has_content = false;
        self.after_marker = true;

        let old_prefix = self.line_prefix.clone();
        self.line_prefix.push_str(&" ".repeat(bullet.len()));
        self.walk_children(id);
        self.line_prefix = old_prefix;
        self.pending_blank = false;
    }

    fn collect_rows(&self, id: usize, rows: &mut Vec<usize>) {
        for &child in self.doc.children(id) {
            match self.doc.name(child) {
                "tr" => rows.push(child),
                "table" | "" => {}
                _ => self.collect_rows(child, rows),
            }
        }
    }

    fn render_cell(&self, id: usize) -> String {
        let mut cell = Renderer::new(self.doc);
        cell.walk_children(id);
        cell.finish()
            .trim()
            .replace("\\\n", "<br>")
            .replace('\n', " ")
            .replace('|', "\\|")
    }

    fn write_table(&mut self, id: usize) {
        let mut rows = Vec::new();
        self.collect_rows(id, &mut rows);

        let cells: Vec<Vec<String>> = rows
            .iter()
            .map(|&row| {
                self.doc
                    .children(row)
                    .iter()
                    .filter(|&&c| matches!(self.doc.name(c), "td" | "th"))
                    .map(|&c| self.render_cell(c))
                    .collect()
            })
            .collect();

        let width = cells.iter().map(Vec::len).max().unwrap_or(0);
        if width == 0 {
            return;
        }

        self.start_block();
        for (i, row) in cells.iter().enumerate() {
            let mut padded = row.clone();
            padded.resize(width, String::new());
            self.ensure_line_started();
            self.push_content(&format!("| {} |", padded.join(" | ")));
            self.newline();

            if i == 0 {
                self.ensure_line_started();
                self.push_content(&format!("|{}", " --- |".repeat(width)));
                self.newline();
            }
        }
        self.end_block();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn md(html: &str) -> String {
        HtmlToMarkdown::new().convert(html)
    }

    #[test]
    fn heading_and_paragraph() {
        assert_eq!(
            md("<h1>Title</h1><p>Hello <strong>World</strong></p>"),
            "# Title\n\nHello **World**\n"
        );
    }

    #[test]
    fn unordered_list() {
        assert_eq!(md("<ul><li>One</li><li>Two</li></ul>"), "- One\n- Two\n");
        assert_eq!(md("<ul>\n  <li>One</li>\n  <li>Two</li>\n</ul>"), "- One\n- Two\n");
    }

    #[test]
    fn ordered_list_honours_start() {
        assert_eq!(
            md("<ol start=\"3\"><li>Three</li><li>Four</li></ol>"),
            "3. Three\n4. Four\n"
        );
    }

    #[test]
    fn nested_list() {
        assert_eq!(
            md("<ul><li>One<ul><li>Sub</li></ul></li><li>Two</li></ul>"),
            "- One\n  - Sub\n- Two\n"
        );
    }

    #[test]
    fn unclosed_list_items() {
        assert_eq!(md("<ul><li>One<li>Two</ul>"), "- One\n- Two\n");
    }

    #[test]
    fn table_with_header() {
        assert_eq!(
            md("<table><tbody><tr><th>A</th><th>B</th></tr><tr><td>1</td><td>2</td></tr></tbody></table>"),
            "| A | B |\n| --- | --- |\n| 1 | 2 |\n"
        );
    }

    #[test]
    fn table_cells_escape_pipes_and_pad_rows() {
        assert_eq!(
            md("<table><tr><td>a|b</td><td>c</td></tr><tr><td>d</td></tr></table>"),
            "| a\\|b | c |\n| --- | --- |\n| d |  |\n"
        );
    }

    #[test]
    fn confluence_code_macro() {
        let html = "<pre class=\"syntaxhighlighter-pre\" \
                    data-syntaxhighlighter-params=\"brush: java; gutter: false\">int x = 1;\n\
                    if (x &lt; 2) {}</pre>";
        assert_eq!(md(html), "```java\nint x = 1;\nif (x < 2) {}\n```\n");
    }

    #[test]
    fn fence_grows_past_backticks_in_code() {
        assert_eq!(md("<pre>```\ninner\n```</pre>"), "````\n```\ninner\n```\n````\n");
    }

    #[test]
    fn links_and_images() {
        assert_eq!(
            md("<p>See <a href=\"https://x.org/a\">the docs</a> and <img src=\"/img.png\" alt=\"logo\"></p>"),
            "See [the docs](https://x.org/a) and ![logo](/img.png)\n"
        );
        assert_eq!(
            md("<p><a href=\"https://x.org\"></a></p>"),
            "<https://x.org>\n"
        );
    }

    #[test]
    fn entities_are_decoded() {
        assert_eq!(
            md("<p>Tom &amp; Jerry &lt;3 &#169; &#x41; &bogus;</p>"),
            "Tom & Jerry <3 \u{a9} A &bogus;\n"
        );
    }

    #[test]
    fn accented_named_entities_are_decoded() {
        assert_eq!(md("<p>&eacute;t&eacute; &auml;</p>"), "\u{e9}t\u{e9} \u{e4}\n");
        assert_eq!(
            md("<h2>Caf&eacute; &ndash; Men&uuml;</h2>"),
            "## Caf\u{e9} \u{2013} Men\u{fc}\n"
        );
    }

    #[test]
    fn misnested_markup_still_renders() {
        assert_eq!(md("<p><b>bold <i>both</b> italic</i></p>"), "**bold *both*** *italic*\n");
    }

    #[test]
    fn markdown_characters_are_escaped() {
        assert_eq!(md("<p>2*3 = 6_</p>"), "2\\*3 = 6\\_\n");
        assert_eq!(md("<p>#hashtag</p>"), "\\#hashtag\n");
    }

    #[test]
    fn whitespace_is_collapsed() {
        assert_eq!(md("<p>  a \n   b  </p>"), "a b\n");
    }

    #[test]
    fn script_style_and_comments_are_dropped() {
        assert_eq!(
            md("<style>p { color: red }</style><p>Text<!-- note --></p><script>alert('<p>')</script>"),
            "Text\n"
        );
    }

    #[test]
    fn blockquote_prefixes_every_line() {
        assert_eq!(
            md("<blockquote><p>Quote</p><p>More</p></blockquote>"),
            "> Quote\n>\n> More\n"
        );
    }

    #[test]
    fn horizontal_rule_separates_blocks() {
        assert_eq!(md("<p>a</p><hr><p>b</p>"), "a\n\n---\n\nb\n");
    }

    #[test]
    fn inline_code_and_emphasis() {
        assert_eq!(md("<p>Use <code>a`b</code></p>"), "Use ``a`b``\n");
        assert_eq!(md("<p>a<strong> b</strong></p>"), "a **b**\n");
        assert_eq!(md("<p><em>it</em> and <del>gone</del></p>"), "*it* and ~~gone~~\n");
        assert_eq!(md("<p>x<strong></strong>y</p>"), "xy\n");
    }

    #[test]
    fn line_breaks() {
        assert_eq!(md("<p>line1<br>line2</p>"), "line1\\\nline2\n");
        assert_eq!(md("<p>line1<br/>line2</p>"), "line1\\\nline2\n");
    }

    #[test]
    fn empty_input() {
        assert_eq!(md(""), "");
        assert_eq!(md("   \n  "), "");
    }

    #[test]
    fn text_after_block_starts_new_paragraph() {
        assert_eq!(md("<ul><li>a</li></ul>tail"), "- a\n\ntail\n");
    }
}
