// src/extractors/table.rs

// --- Imports ---
use crate::extractors::models::{AnswerRecord, DocumentScan, ModelKey, ModelType};
use crate::extractors::page::{ResultCell, ResultsPage};
use crate::utils::error::ExtractError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

// --- Regex Patterns for Text Matching (Lazy Static) ---
static CATEGORY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Results for (.+)").expect("Failed to compile CATEGORY_RE")
});

// Name, em dash, flavour label. Unanchored, like the page headings it is matched against.
static MODEL_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(.+) — (Colored|P/T)").expect("Failed to compile MODEL_NAME_RE")
});

// Formatting characters dropped from answer strings before they are split,
// on top of all whitespace.
const STRIPPED_ANSWER_CHARS: [char; 2] = ['(', ')'];

/// Knobs for a scan, built from the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanOptions {
    /// Suffix record names with the expected-result label (`ModelX-COL-ModelX-01`).
    pub include_variation: bool,
}

/// Visited marks for one document, keyed by marker index and row index.
#[derive(Debug, Default)]
pub struct ScanState {
    pub visited_markers: HashSet<usize>,
    pub visited_cells: HashSet<usize>,
}

pub struct TableScanner {
    options: ScanOptions,
}

impl TableScanner {
    pub fn new(options: ScanOptions) -> Self {
        Self { options }
    }

    /// Parses `html_content` and extracts every expected answer on the page.
    pub fn scan(&self, html_content: &str) -> Result<DocumentScan, ExtractError> {
        let page = ResultsPage::parse(html_content);
        self.scan_page(&page)
    }

    /// Walks markers in document order, then each marker's result rows, then
    /// each character of a row's answer string.
    pub fn scan_page(&self, page: &ResultsPage) -> Result<DocumentScan, ExtractError> {
        let category = extract_category(page)?;
        tracing::info!("found category {}", category);

        let mut state = ScanState::default();
        let mut scan = DocumentScan { category: category.clone(), ..Default::default() };

        while let Some(marker_idx) = next_unvisited_marker(page, &state.visited_markers) {
            state.visited_markers.insert(marker_idx);
            scan.markers_seen += 1;

            let marker = &page.markers[marker_idx];
            let Some(key) = classify_marker(&marker.text) else {
                tracing::debug!("Skipping non matching model title: {:?}", marker.text.trim());
                continue;
            };
            scan.markers_matched += 1;

            let Some(marker_row) = marker.row else {
                tracing::debug!("Model title for {} is not inside a table row", key);
                continue;
            };

            let cells = collect_cells(page, marker_row, &mut state.visited_cells);
            tracing::debug!("Model {}: {} expected result rows", key, cells.len());

            for (_, cell) in cells {
                let name = self.record_name(&key, cell);
                let answers = decode_answer(cell)
                    .ok_or_else(|| ExtractError::MissingAnswerText { model: name.clone() })?;

                scan.cells_visited += 1;
                scan.records.extend(answers.into_iter().map(|(query_index, answer)| AnswerRecord {
                    name: name.clone(),
                    category: category.clone(),
                    query_index,
                    answer,
                }));
            }
        }

        tracing::trace!(
            "Visited {} markers and {} cells",
            state.visited_markers.len(),
            state.visited_cells.len()
        );
        Ok(scan)
    }

    fn record_name(&self, key: &ModelKey, cell: &ResultCell) -> String {
        if self.options.include_variation {
            format!("{}-{}", key, cell.variation)
        } else {
            key.to_string()
        }
    }
}

/// Reads `<category>` out of the first `Results for <category>` heading.
pub fn extract_category(page: &ResultsPage) -> Result<String, ExtractError> {
    let heading = page.headings.first().ok_or(ExtractError::CategoryNotFound)?;
    CATEGORY_RE
        .captures(heading)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .ok_or_else(|| ExtractError::CategoryMismatch(heading.trim().to_string()))
}

/// First marker in document order that has not been visited yet.
pub fn next_unvisited_marker(page: &ResultsPage, visited: &HashSet<usize>) -> Option<usize> {
    (0..page.markers.len()).find(|idx| !visited.contains(idx))
}

/// Parses `<name> — (Colored|P/T)` into a model key. `None` when the text
/// does not look like a model title.
pub fn classify_marker(text: &str) -> Option<ModelKey> {
    let caps = MODEL_NAME_RE.captures(text)?;
    let model_type = ModelType::from_label(caps.get(2)?.as_str())?;
    let name = caps.get(1)?.as_str().trim();
    if name.is_empty() {
        return None;
    }
    Some(ModelKey { name: name.to_string(), model_type })
}

/// Collects the result rows belonging to the marker in `marker_row`.
///
/// The first result row is the nearest following sibling holding an
/// expected-result cell; rows without one are skipped, but the search never
/// crosses another model's row. After that, rows are taken while the
/// immediately next sibling holds an unvisited cell. Every returned row is
/// added to `visited` and returned with its cell.
pub fn collect_cells<'p>(
    page: &'p ResultsPage,
    marker_row: usize,
    visited: &mut HashSet<usize>,
) -> Vec<(usize, &'p ResultCell)> {
    let mut cells = Vec::new();

    let mut cursor = page.rows.get(marker_row).and_then(|row| row.next_sibling);
    let mut current = None;
    while let Some(idx) = cursor {
        let row = &page.rows[idx];
        if row.has_marker {
            break;
        }
        if let Some(cell) = row.cell.as_ref() {
            current = Some((idx, cell));
            break;
        }
        cursor = row.next_sibling;
    }

    while let Some((idx, cell)) = current {
        if !visited.insert(idx) {
            break;
        }
        cells.push((idx, cell));
        current = page.rows[idx].next_sibling.and_then(|next| {
            let row = &page.rows[next];
            if row.has_marker {
                None
            } else {
                row.cell.as_ref().map(|cell| (next, cell))
            }
        });
    }

    cells
}

/// Removes whitespace and parentheses from a raw answer string.
pub fn clean_answer(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && !STRIPPED_ANSWER_CHARS.contains(c))
        .collect()
}

/// Splits a cell's cleaned answer string into `(query_index, answer)` pairs.
/// `None` when the cell has no answer text.
pub fn decode_answer(cell: &ResultCell) -> Option<Vec<(usize, char)>> {
    let raw = cell.answer_text.as_deref()?;
    Some(clean_answer(raw).chars().enumerate().collect())
}

// --- Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    fn result_row(variation: &str, answers: &str) -> String {
        format!(
            r#"<tr><td>{v}</td><td><a class="expectedresult" href="/results">{v}<span><p><b>{a}</b></p></span></a></td></tr>"#,
            v = variation,
            a = answers
        )
    }

    fn model_row(title: &str) -> String {
        format!(r#"<tr><td class="modelname">{}</td></tr>"#, title)
    }

    fn page(category: &str, rows: &[String]) -> String {
        format!(
            r#"<!DOCTYPE html><html><body>
            <div class="secondarytitle">Results for {}</div>
            <table class="results">{}</table>
            </body></html>"#,
            category,
            rows.concat()
        )
    }

    fn lines(scan: &DocumentScan) -> Vec<String> {
        scan.records.iter().map(AnswerRecord::to_line).collect()
    }

    #[test]
    fn test_single_colored_model() {
        let html = page("Suite1", &[model_row("ModelX — Colored"), result_row("ModelX-01", "(A B)")]);

        let scan = TableScanner::new(ScanOptions::default()).scan(&html).unwrap();

        assert_eq!(scan.category, "Suite1");
        assert_eq!(lines(&scan), vec!["ModelX-COL,Suite1,0,A", "ModelX-COL,Suite1,1,B"]);
        assert_eq!(scan.markers_seen, 1);
        assert_eq!(scan.markers_matched, 1);
        assert_eq!(scan.cells_visited, 1);
    }

    #[test]
    fn test_unmatched_marker_is_skipped() {
        let html = page("Suite1", &[model_row("Unrelated text"), result_row("X", "TF")]);

        let scan = TableScanner::new(ScanOptions::default()).scan(&html).unwrap();

        assert!(scan.records.is_empty());
        assert_eq!(scan.markers_seen, 1);
        assert_eq!(scan.markers_matched, 0);
    }

    #[test]
    fn test_two_models_keep_marker_then_cell_order() {
        let html = page(
            "ReachabilityCardinality",
            &[
                model_row("Alpha — P/T"),
                result_row("Alpha-01", "TF"),
                model_row("Beta — Colored"),
                result_row("Beta-01", "FFT"),
            ],
        );

        let scan = TableScanner::new(ScanOptions::default()).scan(&html).unwrap();

        assert_eq!(scan.records.len(), 2 + 3);
        assert_eq!(
            lines(&scan),
            vec![
                "Alpha-PT,ReachabilityCardinality,0,T",
                "Alpha-PT,ReachabilityCardinality,1,F",
                "Beta-COL,ReachabilityCardinality,0,F",
                "Beta-COL,ReachabilityCardinality,1,F",
                "Beta-COL,ReachabilityCardinality,2,T",
            ]
        );
    }

    #[test]
    fn test_chain_stops_at_row_without_result() {
        let html = page(
            "Suite1",
            &[
                model_row("M — P/T"),
                result_row("M-01", "T"),
                result_row("M-02", "F"),
                "<tr><td>trailer</td></tr>".to_string(),
                result_row("Stray", "TTTT"),
            ],
        );

        let scan = TableScanner::new(ScanOptions::default()).scan(&html).unwrap();

        assert_eq!(lines(&scan), vec!["M-PT,Suite1,0,T", "M-PT,Suite1,0,F"]);
        assert_eq!(scan.cells_visited, 2);
    }

    #[test]
    fn test_first_result_may_follow_non_result_rows() {
        let html = page(
            "Suite1",
            &[
                model_row("M — Colored"),
                "<tr><th>Examination</th><th>Answers</th></tr>".to_string(),
                result_row("M-01", "(T F) (T)"),
            ],
        );

        let scan = TableScanner::new(ScanOptions::default()).scan(&html).unwrap();

        assert_eq!(lines(&scan), vec!["M-COL,Suite1,0,T", "M-COL,Suite1,1,F", "M-COL,Suite1,2,T"]);
    }

    #[test]
    fn test_model_without_results_does_not_take_next_models_rows() {
        let html = page(
            "Suite1",
            &[
                model_row("Empty — Colored"),
                "<tr><td>nothing</td></tr>".to_string(),
                model_row("Full — P/T"),
                result_row("Full-01", "TT"),
            ],
        );

        let scan = TableScanner::new(ScanOptions::default()).scan(&html).unwrap();

        assert_eq!(lines(&scan), vec!["Full-PT,Suite1,0,T", "Full-PT,Suite1,1,T"]);
        assert_eq!(scan.markers_matched, 2);
    }

    #[test]
    fn test_variation_qualified_names() {
        let html = page("Suite1", &[model_row("ModelX — Colored"), result_row("ModelX-01", "A")]);
        let options = ScanOptions { include_variation: true };

        let scan = TableScanner::new(options).scan(&html).unwrap();

        assert_eq!(lines(&scan), vec!["ModelX-COL-ModelX-01,Suite1,0,A"]);
    }

    #[test]
    fn test_missing_heading_is_an_error() {
        let html = r#"<table><tr><td class="modelname">M — P/T</td></tr></table>"#;
        let err = TableScanner::new(ScanOptions::default()).scan(html).unwrap_err();
        assert!(matches!(err, ExtractError::CategoryNotFound));
    }

    #[test]
    fn test_malformed_heading_is_an_error() {
        let html = r#"<h2 class="secondarytitle">Overview</h2>"#;
        let err = TableScanner::new(ScanOptions::default()).scan(html).unwrap_err();
        assert!(matches!(err, ExtractError::CategoryMismatch(ref text) if text == "Overview"));
    }

    #[test]
    fn test_missing_answer_text_aborts_document() {
        let html = page(
            "Suite1",
            &[
                model_row("M — P/T"),
                result_row("M-01", "T"),
                r#"<tr><td><a class="expectedresult">M-02</a></td></tr>"#.to_string(),
            ],
        );

        let err = TableScanner::new(ScanOptions::default()).scan(&html).unwrap_err();
        assert!(matches!(err, ExtractError::MissingAnswerText { ref model } if model == "M-PT"));
    }

    #[test]
    fn test_markers_are_visited_once() {
        let html = page(
            "Suite1",
            &[model_row("A — P/T"), model_row("junk"), model_row("B — Colored")],
        );
        let page = ResultsPage::parse(&html);
        let mut visited = HashSet::new();

        let mut order = Vec::new();
        while let Some(idx) = next_unvisited_marker(&page, &visited) {
            visited.insert(idx);
            order.push(idx);
        }

        assert_eq!(order, vec![0, 1, 2]);
        assert_eq!(next_unvisited_marker(&page, &visited), None);
    }

    #[test]
    fn test_cells_are_collected_once() {
        let html = page("Suite1", &[model_row("A — P/T"), result_row("A-01", "T"), result_row("A-02", "F")]);
        let page = ResultsPage::parse(&html);
        let mut visited = HashSet::new();

        let cells = collect_cells(&page, 0, &mut visited);
        assert_eq!(cells.iter().map(|(idx, _)| *idx).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(
            cells.iter().map(|(_, cell)| cell.variation.as_str()).collect::<Vec<_>>(),
            vec!["A-01", "A-02"]
        );
        assert!(collect_cells(&page, 0, &mut visited).is_empty());
    }

    #[test]
    fn test_classify_marker() {
        let key = classify_marker("ModelX — Colored").unwrap();
        assert_eq!(key.to_string(), "ModelX-COL");

        let key = classify_marker("  Philosophers-10 — P/T  ").unwrap();
        assert_eq!(key.name, "Philosophers-10");
        assert_eq!(key.model_type, ModelType::PlaceTransition);

        assert!(classify_marker("Unrelated text").is_none());
        assert!(classify_marker("ModelX - Colored").is_none());
        assert!(classify_marker(" — P/T").is_none());
    }

    #[test]
    fn test_decode_answer_indices_and_stripping() {
        let cell = ResultCell { variation: String::new(), answer_text: Some("(T F ?) (1)".to_string()) };
        let decoded = decode_answer(&cell).unwrap();
        let cleaned = clean_answer("(T F ?) (1)");

        assert_eq!(cleaned, "TF?1");
        assert_eq!(decoded.len(), cleaned.chars().count());
        assert_eq!(decoded.iter().map(|(i, _)| *i).collect::<Vec<_>>(), vec![0, 1, 2, 3]);
        assert!(decoded.iter().all(|(_, c)| *c != ' ' && !STRIPPED_ANSWER_CHARS.contains(c)));
    }

    #[test]
    fn test_multiline_answer_drops_line_breaks() {
        assert_eq!(clean_answer("(T\n F)\t(T\r\n)"), "TFT");

        let html = page("Suite1", &[model_row("M — P/T"), result_row("M-01", "(T\n F)")]);
        let scan = TableScanner::new(ScanOptions::default()).scan(&html).unwrap();

        assert_eq!(lines(&scan), vec!["M-PT,Suite1,0,T", "M-PT,Suite1,1,F"]);
    }

    #[test]
    fn test_decode_answer_without_text() {
        let cell = ResultCell { variation: "X".to_string(), answer_text: None };
        assert!(decode_answer(&cell).is_none());

        let empty = ResultCell { variation: "X".to_string(), answer_text: Some("( )".to_string()) };
        assert_eq!(decode_answer(&empty), Some(vec![]));
    }
}
