// src/extractors/page.rs

// --- Imports ---
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;

// --- CSS Selectors (Lazy Static) ---
static SECONDARY_TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(".secondarytitle").expect("Failed to compile SECONDARY_TITLE_SELECTOR")
});

static MODEL_NAME_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(".modelname").expect("Failed to compile MODEL_NAME_SELECTOR")
});

static ROW_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("tr").expect("Failed to compile ROW_SELECTOR")
});

// Only links sitting directly in a cell of the row are considered (checked after selection)
static RESULT_LINK_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("td > a.expectedresult").expect("Failed to compile RESULT_LINK_SELECTOR")
});

static ANSWER_TEXT_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("span > p > b").expect("Failed to compile ANSWER_TEXT_SELECTOR")
});

// --- Data Structures ---

/// A results page flattened into owned, index-addressed parts.
/// Rows keep document order; `next_sibling` links a row to the row that
/// immediately follows it under the same parent.
#[derive(Debug, Clone, Default)]
pub struct ResultsPage {
    pub headings: Vec<String>,
    pub markers: Vec<MarkerNode>,
    pub rows: Vec<RowNode>,
}

#[derive(Debug, Clone)]
pub struct MarkerNode {
    pub text: String,
    /// Index of the row holding the marker, when the marker is a table cell.
    pub row: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct RowNode {
    pub next_sibling: Option<usize>,
    pub has_marker: bool,
    pub cell: Option<ResultCell>,
}

#[derive(Debug, Clone)]
pub struct ResultCell {
    /// First text of the expected-result link, e.g. `ModelX-01`.
    pub variation: String,
    /// Text of the link's `span > p > b`, absent on malformed rows.
    pub answer_text: Option<String>,
}

impl ResultsPage {
    /// Parses an HTML document and flattens the parts the scanner walks.
    pub fn parse(html_content: &str) -> Self {
        let document = Html::parse_document(html_content);

        let headings = document
            .select(&SECONDARY_TITLE_SELECTOR)
            .map(|el| el.text().collect::<String>())
            .collect::<Vec<_>>();

        let row_elements = document.select(&ROW_SELECTOR).collect::<Vec<_>>();
        let row_index = row_elements
            .iter()
            .enumerate()
            .map(|(idx, row)| (row.id(), idx))
            .collect::<HashMap<_, _>>();

        let mut rows = row_elements
            .iter()
            .map(|row| RowNode {
                // `tr + tr`: the next element sibling, only if it is a row itself
                next_sibling: row
                    .next_siblings()
                    .find_map(ElementRef::wrap)
                    .and_then(|sibling| row_index.get(&sibling.id()).copied()),
                has_marker: false,
                cell: result_cell(*row),
            })
            .collect::<Vec<_>>();

        let markers = document
            .select(&MODEL_NAME_SELECTOR)
            .map(|el| {
                let row = if el.value().name() == "td" {
                    el.ancestors()
                        .filter_map(ElementRef::wrap)
                        .find(|ancestor| ancestor.value().name() == "tr")
                        .and_then(|tr| row_index.get(&tr.id()).copied())
                } else {
                    None
                };
                MarkerNode { text: el.text().collect::<String>(), row }
            })
            .collect::<Vec<_>>();

        for row in markers.iter().filter_map(|m| m.row) {
            rows[row].has_marker = true;
        }

        tracing::debug!(
            "Flattened page: {} headings, {} markers, {} rows ({} with expected results)",
            headings.len(),
            markers.len(),
            rows.len(),
            rows.iter().filter(|r| r.cell.is_some()).count()
        );

        Self { headings, markers, rows }
    }
}

/// Finds the first `td > a.expectedresult` whose cell belongs to `row` itself
/// (not to a nested table).
fn result_cell(row: ElementRef) -> Option<ResultCell> {
    let link = row.select(&RESULT_LINK_SELECTOR).find(|link| {
        link.parent()
            .and_then(|td| td.parent())
            .map(|tr| tr.id() == row.id())
            .unwrap_or(false)
    })?;

    let variation = link
        .text()
        .map(str::trim)
        .find(|text| !text.is_empty())
        .unwrap_or_default()
        .to_string();

    // `a > span > p > b`: the span must be a direct child of the link
    let answer_text = link
        .select(&ANSWER_TEXT_SELECTOR)
        .find(|b| {
            b.parent()
                .and_then(|p| p.parent())
                .and_then(|span| span.parent())
                .map(|owner| owner.id() == link.id())
                .unwrap_or(false)
        })
        .map(|b| b.text().collect::<String>());

    Some(ResultCell { variation, answer_text })
}
