//! Roster scrape from the [Wikipedia constituents article].
//!
//! One GET against the MediaWiki render API returns the article body as
//! HTML; the constituents table is then walked row by row for the ticker
//! symbols in column 2.
//!
//! [Wikipedia constituents article]: https://en.wikipedia.org/wiki/List_of_S%26P_500_companies

use crate::http::*;
use crate::Error;
use futures::future::BoxFuture;
use scraper::{Html, Selector};
use serde::Deserialize;
use std::collections::HashSet;
use tracing::{debug, error, trace, warn};

const WIKI_API: &str = "https://en.wikipedia.org/w/api.php";
const WIKI_PAGE: &str = "List_of_S&P_500_companies";

// id of the constituents table on the article; the first <table> is the
// fallback when the id disappears in a page edit.
const TABLE_ID: &str = "constituents";

/// Source of the raw (possibly duplicated) roster symbols.
///
/// The scheduler only sees this trait, so tests drive refresh cycles with
/// scripted rosters instead of the live wiki.
pub trait RosterSource: Send + Sync {
    fn fetch_symbols(&self) -> BoxFuture<'_, Result<Vec<String>, Error>>;
}

/// Client for the MediaWiki render API.
pub struct WikiClient {
    http: HttpClient,
    endpoint: String,
}

impl WikiClient {
    pub fn new() -> Self {
        Self::with_endpoint(WIKI_API)
    }

    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            http: build_client(),
            endpoint: endpoint.into(),
        }
    }

    /// GET the rendered HTML body of one article.
    ///
    /// Fixed query set: `action=parse&format=json&page=<title>&prop=text&
    /// formatversion=2`. No retry; the caller decides what a failed cycle
    /// means.
    pub async fn fetch_page(&self, title: &str) -> Result<String, Error> {
        trace!("fetching wiki page '{title}'");
        let envelope: ParseResponse = self
            .http
            .get(&self.endpoint)
            .query(&[
                ("action", "parse"),
                ("format", "json"),
                ("page", title),
                ("prop", "text"),
                ("formatversion", "2"),
            ])
            .send()
            .await
            .map_err(|err| {
                error!("failed to fetch wiki page '{title}', error({err})");
                err
            })?
            .json()
            .await
            .map_err(|err| {
                error!("failed to parse wiki envelope for '{title}', error({err})");
                err
            })?;

        let body = envelope.parse.ok_or_else(|| Error::EmptyEnvelope {
            page: title.to_string(),
        })?;
        debug!(
            "fetched wiki page '{}' (pageid {})",
            body.title.as_deref().unwrap_or(title),
            body.pageid.unwrap_or_default(),
        );

        body.text.ok_or_else(|| Error::EmptyEnvelope {
            page: title.to_string(),
        })
    }
}

impl Default for WikiClient {
    fn default() -> Self {
        Self::new()
    }
}

impl RosterSource for WikiClient {
    fn fetch_symbols(&self) -> BoxFuture<'_, Result<Vec<String>, Error>> {
        Box::pin(async move {
            let html = self.fetch_page(WIKI_PAGE).await?;
            extract_symbols(&html)
        })
    }
}

fn build_client() -> HttpClient {
    reqwest::ClientBuilder::new()
        .user_agent("sp500-spider/0.1")
        .build()
        .expect("failed to build reqwest client")
}

/// Walk the constituents table and return the raw symbol of every data row.
///
/// Row 0 is the header and is skipped; each remaining row contributes the
/// text of its second cell, with embedded newlines stripped. A row with
/// fewer than two cells is logged and skipped rather than failing the whole
/// extraction. Output keeps row order and may contain duplicates.
pub fn extract_symbols(html: &str) -> Result<Vec<String>, Error> {
    let document = Html::parse_document(html);

    let by_id = Selector::parse(&format!("table#{TABLE_ID}")).expect("static selector");
    let any_table = Selector::parse("table").expect("static selector");
    let row = Selector::parse("tr").expect("static selector");
    let cell = Selector::parse("td, th").expect("static selector");

    // the id is the contract; any table at all is the fallback. Neither
    // found is a hard failure, since it means the page structure changed.
    let table = match document.select(&by_id).next() {
        Some(table) => table,
        None => {
            warn!("table#{TABLE_ID} not found, falling back to the first table");
            document.select(&any_table).next().ok_or(Error::NoTable)?
        }
    };

    let mut symbols = Vec::new();
    for (idx, tr) in table.select(&row).enumerate() {
        if idx == 0 {
            continue;
        }
        let cells: Vec<_> = tr.select(&cell).collect();
        if cells.len() < 2 {
            warn!("row {idx} has {} cells, skipping", cells.len());
            continue;
        }
        let text: String = cells[1].text().collect();
        symbols.push(text.replace('\n', "").trim().to_string());
    }

    trace!("extracted {} raw symbols", symbols.len());
    Ok(symbols)
}

/// First-occurrence-order dedup. Pure; no failure modes.
pub fn dedup_symbols(raw: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.into_iter().filter(|s| seen.insert(s.clone())).collect()
}

// de
// ----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ParseResponse {
    parse: Option<ParseBody>,
}

// `formatversion=2` renders `text` as a plain string rather than the v1
// `{ "*": ... }` wrapper.
#[derive(Debug, Deserialize)]
struct ParseBody {
    title: Option<String>,
    pageid: Option<u64>,
    text: Option<String>,
}

//////////////////////////////////////////////////////////////
// -- TESTS --
//////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    fn constituents_table(rows: &[&str]) -> String {
        let body: String = rows
            .iter()
            .map(|symbol| {
                format!("<tr><td><a href=\"#\">link</a></td><td>{symbol}</td><td>Industrials</td></tr>")
            })
            .collect();
        format!(
            "<html><body><table id=\"constituents\">\
             <tr><th>Security</th><th>Symbol</th><th>GICS Sector</th></tr>\
             {body}</table></body></html>"
        )
    }

    #[test]
    fn extracts_one_symbol_per_data_row_in_order() {
        let html = constituents_table(&["MMM", "AOS", "ABT"]);
        let symbols = extract_symbols(&html).unwrap();
        assert_eq!(symbols, vec!["MMM", "AOS", "ABT"]);
    }

    #[test]
    fn strips_embedded_newlines() {
        let html = constituents_table(&["BRK.B\n"]);
        let symbols = extract_symbols(&html).unwrap();
        assert_eq!(symbols, vec!["BRK.B"]);
    }

    #[test]
    fn falls_back_to_first_table_without_the_id() {
        let html = "<html><body>\
            <table><tr><th>h1</th><th>h2</th></tr>\
            <tr><td>x</td><td>AAPL</td></tr></table>\
            </body></html>";
        let symbols = extract_symbols(html).unwrap();
        assert_eq!(symbols, vec!["AAPL"]);
    }

    #[test]
    fn no_table_is_a_hard_failure() {
        let html = "<html><body><p>nothing to see</p></body></html>";
        assert!(matches!(extract_symbols(html), Err(Error::NoTable)));
    }

    #[test]
    fn short_rows_are_skipped_not_fatal() {
        let html = "<html><body><table id=\"constituents\">\
            <tr><th>Security</th><th>Symbol</th></tr>\
            <tr><td>only-one-cell</td></tr>\
            <tr><td>x</td><td>MSFT</td></tr>\
            </table></body></html>";
        let symbols = extract_symbols(html).unwrap();
        assert_eq!(symbols, vec!["MSFT"]);
    }

    #[test]
    fn duplicates_pass_through_extraction_and_fall_to_dedup() {
        let html = constituents_table(&["AAPL", "MSFT", "AAPL"]);
        let raw = extract_symbols(&html).unwrap();
        assert_eq!(raw, vec!["AAPL", "MSFT", "AAPL"]);

        let unique = dedup_symbols(raw);
        assert_eq!(unique, vec!["AAPL", "MSFT"]);
    }

    #[test]
    fn dedup_is_idempotent() {
        let unique = vec!["AAPL".to_string(), "MSFT".to_string()];
        assert_eq!(dedup_symbols(unique.clone()), unique);
        assert_eq!(dedup_symbols(dedup_symbols(unique.clone())), unique);
    }
}
