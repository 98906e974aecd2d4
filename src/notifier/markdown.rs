// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// MARKDOWN -> HTML
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Conversor por linha para o subconjunto de markdown que os modelos geram:
// - Títulos `#` a `######`
// - Parágrafos (linhas consecutivas são unidas)
// - Listas `-`, `*`, `+` e `1.` (sem aninhamento)
// - Citações `>`
// - Blocos de código com cerca ```
// - Linhas horizontais `---`
// - Tabelas simples com `|`
// - Inline: `código`, **negrito**, *itálico*, [links](url)
//
// Todo texto é escapado antes da formatação inline.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use once_cell::sync::Lazy;
use regex::Regex;

static HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(#{1,6})\s+(.+?)\s*#*\s*$").unwrap());
static UNORDERED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-*+]\s+(.*)$").unwrap());
static ORDERED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+[.)]\s+(.*)$").unwrap());
static QUOTE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^>\s?(.*)$").unwrap());
static RULE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:-{3,}|\*{3,}|_{3,})$").unwrap());
static TABLE_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\|?\s*:?-+:?\s*(?:\|\s*:?-+:?\s*)*\|?$").unwrap());

// Destino aceita um nível de parênteses balanceados: wiki/Foo_(bar)
static LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]+)\]\(((?:[^()\s]|\([^()\s]*\))+)\)").unwrap());
static BOLD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*([^*]+?)\*\*|__([^_]+?)__").unwrap());
// `\B` impede que `5*3 and 4*2` vire ênfase
static ITALIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"\B\*([^*\s][^*]*?)\*\B").unwrap());

const LINK_SCHEMES: [&str; 3] = ["http://", "https://", "mailto:"];

const DOCUMENT_STYLE: &str = "body{font-family:-apple-system,Segoe UI,Helvetica,Arial,sans-serif;\
line-height:1.6;color:#1f2328;max-width:760px;margin:0 auto;padding:24px;}\
h1,h2,h3{line-height:1.25;}h1{border-bottom:1px solid #d0d7de;padding-bottom:.3em;}\
code{background:#f6f8fa;padding:.2em .4em;border-radius:4px;font-size:90%;}\
pre{background:#f6f8fa;padding:12px;border-radius:6px;overflow:auto;}\
pre code{background:none;padding:0;}\
blockquote{color:#59636e;border-left:4px solid #d0d7de;margin:0;padding:0 1em;}\
table{border-collapse:collapse;}th,td{border:1px solid #d0d7de;padding:6px 12px;}";

/// Converte markdown em um fragmento HTML (sem `<html>`/`<body>`).
pub fn render_markdown(markdown: &str) -> String {
    let mut renderer = Renderer::default();
    for line in markdown.lines() {
        renderer.line(line);
    }
    renderer.finish()
}

/// Envolve um fragmento em um documento HTML completo com estilo inline.
pub fn wrap_document(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n\
         <style>{}</style>\n</head>\n<body>\n{}</body>\n</html>\n",
        escape_html(title),
        DOCUMENT_STYLE,
        body
    )
}

/// Texto puro equivalente ao fragmento HTML, para a parte text/plain do email.
pub fn html_to_text(fragment: &str) -> String {
    html2text::from_read(fragment.as_bytes(), 80)
}

/// Escapa os caracteres especiais de HTML
pub fn escape_html(text: &str) -> String {
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

#[derive(Default)]
struct Renderer {
    out: String,
    paragraph: Vec<String>,
    list: Option<(bool, Vec<String>)>,
    quote: Vec<String>,
    table: Vec<String>,
    code: Option<Vec<String>>,
}

impl Renderer {
    fn line(&mut self, line: &str) {
        if let Some(code) = self.code.as_mut() {
            if line.trim_start().starts_with("```") {
                self.close_code();
            } else {
                code.push(line.to_string());
            }
            return;
        }

        let trimmed = line.trim();

        if trimmed.starts_with("```") {
            self.flush();
            self.code = Some(Vec::new());
            return;
        }

        if trimmed.is_empty() {
            self.flush();
            return;
        }

        if trimmed.starts_with('|') {
            self.flush_except_table();
            self.table.push(trimmed.to_string());
            return;
        }

        if let Some(caps) = HEADING.captures(trimmed) {
            self.flush();
            let level = caps[1].len();
            self.out.push_str(&format!(
                "<h{level}>{}</h{level}>\n",
                render_inline(&caps[2])
            ));
            return;
        }

        if RULE.is_match(trimmed) {
            self.flush();
            self.out.push_str("<hr>\n");
            return;
        }

        if let Some(caps) = QUOTE.captures(trimmed) {
            self.flush_except_quote();
            self.quote.push(caps[1].to_string());
            return;
        }

        let list_item = UNORDERED
            .captures(trimmed)
            .map(|caps| (false, caps[1].to_string()))
            .or_else(|| ORDERED.captures(trimmed).map(|caps| (true, caps[1].to_string())));

        if let Some((ordered, item)) = list_item {
            self.flush_paragraph();
            self.flush_quote();
            self.flush_table();
            if matches!(self.list, Some((kind, _)) if kind == ordered) {
                if let Some((_, items)) = self.list.as_mut() {
                    items.push(item);
                }
            } else {
                self.flush_list();
                self.list = Some((ordered, vec![item]));
            }
            return;
        }

        // Continuação de item de lista indentada
        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some((_, items)) = self.list.as_mut() {
                if let Some(last) = items.last_mut() {
                    last.push(' ');
                    last.push_str(trimmed);
                    return;
                }
            }
        }

        self.flush_list();
        self.flush_quote();
        self.flush_table();
        self.paragraph.push(trimmed.to_string());
    }

    fn finish(mut self) -> String {
        if self.code.is_some() {
            self.close_code();
        }
        self.flush();
        self.out
    }

    fn flush(&mut self) {
        self.flush_paragraph();
        self.flush_list();
        self.flush_quote();
        self.flush_table();
    }

    fn flush_except_table(&mut self) {
        self.flush_paragraph();
        self.flush_list();
        self.flush_quote();
    }

    fn flush_except_quote(&mut self) {
        self.flush_paragraph();
        self.flush_list();
        self.flush_table();
    }

    fn flush_paragraph(&mut self) {
        if self.paragraph.is_empty() {
            return;
        }
        let text = self.paragraph.join(" ");
        self.paragraph.clear();
        self.out.push_str(&format!("<p>{}</p>\n", render_inline(&text)));
    }

    fn flush_list(&mut self) {
        let Some((ordered, items)) = self.list.take() else {
            return;
        };
        let tag = if ordered { "ol" } else { "ul" };
        self.out.push_str(&format!("<{}>\n", tag));
        for item in items {
            self.out.push_str(&format!("<li>{}</li>\n", render_inline(&item)));
        }
        self.out.push_str(&format!("</{}>\n", tag));
    }

    fn flush_quote(&mut self) {
        if self.quote.is_empty() {
            return;
        }
        let text = self.quote.join(" ");
        self.quote.clear();
        self.out.push_str(&format!(
            "<blockquote><p>{}</p></blockquote>\n",
            render_inline(text.trim())
        ));
    }

    fn flush_table(&mut self) {
        if self.table.is_empty() {
            return;
        }
        let rows = std::mem::take(&mut self.table);
        let has_header = rows.len() > 1 && TABLE_SEPARATOR.is_match(&rows[1]);

        self.out.push_str("<table>\n");
        for (i, row) in rows.iter().enumerate() {
            if has_header && i == 1 {
                continue;
            }
            let cell_tag = if has_header && i == 0 { "th" } else { "td" };
            self.out.push_str("<tr>");
            for cell in split_row(row) {
                self.out.push_str(&format!(
                    "<{cell_tag}>{}</{cell_tag}>",
                    render_inline(cell)
                ));
            }
            self.out.push_str("</tr>\n");
        }
        self.out.push_str("</table>\n");
    }

    fn close_code(&mut self) {
        if let Some(lines) = self.code.take() {
            self.out.push_str(&format!(
                "<pre><code>{}</code></pre>\n",
                escape_html(&lines.join("\n"))
            ));
        }
    }
}

fn split_row(row: &str) -> Vec<&str> {
    let inner = row.trim().trim_start_matches('|');
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    inner.split('|').map(str::trim).collect()
}

/// Formatação inline. Trechos entre crases viram `<code>` sem outra formatação.
fn render_inline(text: &str) -> String {
    let parts: Vec<&str> = text.split('`').collect();
    let mut out = String::with_capacity(text.len() + 16);

    for (i, part) in parts.iter().enumerate() {
        let inside_code = i % 2 == 1;
        let closed = i + 1 < parts.len();
        if inside_code && closed {
            out.push_str("<code>");
            out.push_str(&escape_html(part));
            out.push_str("</code>");
        } else {
            if inside_code {
                out.push('`');
            }
            out.push_str(&format_emphasis(&escape_html(part)));
        }
    }

    out
}

fn format_emphasis(escaped: &str) -> String {
    let linked = LINK.replace_all(escaped, |caps: &regex::Captures| {
        let (label, target) = (&caps[1], &caps[2]);
        if is_safe_target(target) {
            format!("<a href=\"{}\">{}</a>", target, label)
        } else {
            log::debug!("🔗 Link descartado (esquema não permitido): {}", target);
            label.to_string()
        }
    });
    let bold = BOLD.replace_all(&linked, |caps: &regex::Captures| {
        let inner = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
        format!("<strong>{}</strong>", inner)
    });
    ITALIC.replace_all(&bold, "<em>$1</em>").into_owned()
}

/// Só `http`, `https` e `mailto` viram `<a>`; o resto fica como texto.
fn is_safe_target(target: &str) -> bool {
    let lower = target.to_ascii_lowercase();
    LINK_SCHEMES.iter().any(|scheme| lower.starts_with(scheme))
}
