// src/utils/html_debug.rs
use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::utils::error::StorageError;

// Text that usually sits inside the fields a selector profile should hit.
static DEBUG_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"R\$(?:\s|&nbsp;|\u{a0})*-?[\d.]+(?:,\d{1,2})?", "amount"),
        (
            r"(?i)\b(?:preg[ãa]o|concorr[êe]ncia|tomada\s+de\s+pre[çc]os|convite|leil[ãa]o|dispensa|inexigibilidade)\b",
            "modality",
        ),
    ]
    .iter()
    .filter_map(|(pat, kind)| Regex::new(pat).ok().map(|re| (re, *kind)))
    .collect()
});

/// Builds a standalone HTML document with each `(start, end, kind)` span wrapped in a
/// highlighted `<span>`. Spans overlapping an earlier one are dropped.
pub fn render_annotated(html: &str, highlights: &[(usize, usize, &str)]) -> String {
    let mut out = String::from("<!DOCTYPE html>\n<html>\n<head>\n<style>\n");
    out.push_str(".highlight-amount { background-color: #90EE90; }\n");
    out.push_str(".highlight-modality { background-color: #ADD8E6; }\n");
    out.push_str(".highlight-custom { background-color: #FFC0CB; }\n");
    out.push_str("</style>\n</head>\n<body>\n");

    let mut sorted = highlights.to_vec();
    sorted.sort_by_key(|h| h.0);

    let mut last_pos = 0;
    for (start, end, kind) in sorted {
        if start < last_pos || end > html.len() || start >= end {
            continue;
        }
        out.push_str(&html[last_pos..start]);

        let css_class = match kind {
            "amount" => "highlight-amount",
            "modality" => "highlight-modality",
            _ => "highlight-custom",
        };
        out.push_str(&format!(
            "<span class=\"{}\" title=\"{}-{} {}\">",
            css_class, start, end, kind
        ));
        out.push_str(&html[start..end]);
        out.push_str("</span>");
        last_pos = end;
    }
    out.push_str(&html[last_pos..]);

    out.push_str("\n</body>\n</html>");
    out
}

/// Finds currency amounts and modality keywords in a fetched page.
pub fn find_highlights(html: &str) -> Vec<(usize, usize, &'static str)> {
    DEBUG_PATTERNS
        .iter()
        .flat_map(|(re, kind)| re.find_iter(html).map(move |m| (m.start(), m.end(), *kind)))
        .collect()
}

/// Writes the raw page and an annotated copy into `debug_dir` as
/// `page_<n>.html` and `page_<n>_annotated.html`.
pub fn save_page_dump(debug_dir: &Path, page: u32, html: &str) -> Result<(), StorageError> {
    fs::create_dir_all(debug_dir)?;

    let raw_path = debug_dir.join(format!("page_{}.html", page));
    fs::write(&raw_path, html)?;

    let highlights = find_highlights(html);
    let annotated_path = debug_dir.join(format!("page_{}_annotated.html", page));
    fs::write(&annotated_path, render_annotated(html, &highlights))?;

    tracing::debug!(
        "Saved page {} dump ({} highlights) to {}",
        page,
        highlights.len(),
        annotated_path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_highlights_amount_and_modality() {
        let html = "<p>Pregão Eletrônico</p><span class=\"valor\">R$ 1.500,00</span>";
        let found = find_highlights(html);

        let kinds: Vec<&str> = found.iter().map(|h| h.2).collect();
        assert!(kinds.contains(&"amount"));
        assert!(kinds.contains(&"modality"));

        let amount = found.iter().find(|h| h.2 == "amount").unwrap();
        assert_eq!(&html[amount.0..amount.1], "R$ 1.500,00");
    }

    #[test]
    fn test_render_annotated_wraps_spans_and_skips_overlaps() {
        let html = "abc R$ 10,00 xyz";
        let rendered = render_annotated(html, &[(4, 12, "amount"), (6, 8, "custom")]);

        assert!(rendered.contains("<span class=\"highlight-amount\" title=\"4-12 amount\">R$ 10,00</span>"));
        assert!(!rendered.contains("highlight-custom\" title"));
        assert!(rendered.contains(" xyz\n</body>"));
    }

    #[test]
    fn test_save_page_dump_writes_both_files() {
        let dir = std::env::temp_dir().join(format!("procurement_dump_{}", std::process::id()));
        save_page_dump(&dir, 3, "<html>R$ 5,00</html>").unwrap();

        assert!(dir.join("page_3.html").exists());
        let annotated = fs::read_to_string(dir.join("page_3_annotated.html")).unwrap();
        assert!(annotated.contains("highlight-amount"));

        fs::remove_dir_all(&dir).ok();
    }
}
