//! HTML parsing for the trending listing page.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::models::split_full_name;

/// Candidate repository read from one listing row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingItem {
    /// `owner/repo`
    pub full_name: String,
    pub description: Option<String>,
    pub language: Option<String>,
    pub stars: u64,
    pub forks: u64,
    /// Stars gained within the requested period ("523 stars today")
    pub period_stars: u64,
    /// 1-based row position on the page
    pub rank: u32,
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|err| panic!("invalid selector {css:?}: {err}"))
}

static ROW: LazyLock<Selector> = LazyLock::new(|| selector("article.Box-row"));
static NAME_LINK: LazyLock<Selector> = LazyLock::new(|| selector("h2 a"));
static DESCRIPTION: LazyLock<Selector> = LazyLock::new(|| selector("p"));
static LANGUAGE: LazyLock<Selector> =
    LazyLock::new(|| selector("[itemprop=programmingLanguage]"));
static COUNTERS: LazyLock<Selector> =
    LazyLock::new(|| selector(".Link--muted.d-inline-block.mr-3"));
static PERIOD_GAIN: LazyLock<Selector> = LazyLock::new(|| selector(".float-sm-right"));

static NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d[\d,]*").unwrap_or_else(|err| panic!("invalid number pattern: {err}"))
});

/// Parse every row of a trending page. Rows without a usable name are skipped.
pub fn parse_listing(html: &str) -> Vec<ListingItem> {
    let document = Html::parse_document(html);
    let mut items = Vec::new();

    for (index, row) in document.select(&ROW).enumerate() {
        let rank = index as u32 + 1;
        match parse_row(row, rank) {
            Some(item) => items.push(item),
            None => debug!(rank, "Skipping trending row without a repository name"),
        }
    }

    items
}

fn parse_row(row: ElementRef<'_>, rank: u32) -> Option<ListingItem> {
    let href = row
        .select(&NAME_LINK)
        .next()
        .and_then(|link| link.value().attr("href"))?;
    let full_name = href.trim().trim_start_matches('/').trim_end_matches('/');
    split_full_name(full_name)?;

    let mut counters = row.select(&COUNTERS).map(|el| parse_count(&text_of(el)));
    let stars = counters.next().unwrap_or(0);
    let forks = counters.next().unwrap_or(0);

    let period_stars = row
        .select(&PERIOD_GAIN)
        .next()
        .map(|el| parse_count(&text_of(el)))
        .unwrap_or(0);

    Some(ListingItem {
        full_name: full_name.to_string(),
        description: first_text(row, &DESCRIPTION),
        language: first_text(row, &LANGUAGE),
        stars,
        forks,
        period_stars,
        rank,
    })
}

/// First integer in `text` with thousands separators removed; 0 when there is none.
pub fn parse_count(text: &str) -> u64 {
    NUMBER
        .find(text)
        .and_then(|found| found.as_str().replace(',', "").parse().ok())
        .unwrap_or(0)
}

fn first_text(row: ElementRef<'_>, selector: &Selector) -> Option<String> {
    row.select(selector)
        .next()
        .map(text_of)
        .filter(|text| !text.is_empty())
}

fn text_of(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
        <article class="Box-row">
          <h2 class="h3 lh-condensed">
            <a href="/acme/llm-kit" class="Link">
              <span class="text-normal">acme /</span> llm-kit
            </a>
          </h2>
          <p class="col-9 color-fg-muted my-1 pr-4">
            A toolkit for   large language models
          </p>
          <div class="f6 color-fg-muted mt-2">
            <span><span itemprop="programmingLanguage">Python</span></span>
            <a href="/acme/llm-kit/stargazers" class="Link--muted d-inline-block mr-3">12,345</a>
            <a href="/acme/llm-kit/forks" class="Link--muted d-inline-block mr-3">1,002</a>
            <span class="d-inline-block float-sm-right">1,523 stars today</span>
          </div>
        </article>
        <article class="Box-row">
          <h2><span>broken row</span></h2>
        </article>
        <article class="Box-row">
          <h2><a href="/solo/agent">solo / agent</a></h2>
          <div>
            <a class="Link--muted d-inline-block mr-3">87</a>
            <span class="float-sm-right">stars today</span>
          </div>
        </article>
        </body></html>
    "#;

    #[test]
    fn parses_rows_in_page_order() {
        let items = parse_listing(PAGE);
        assert_eq!(items.len(), 2);

        let first = &items[0];
        assert_eq!(first.full_name, "acme/llm-kit");
        assert_eq!(
            first.description.as_deref(),
            Some("A toolkit for large language models")
        );
        assert_eq!(first.language.as_deref(), Some("Python"));
        assert_eq!(first.stars, 12_345);
        assert_eq!(first.forks, 1_002);
        assert_eq!(first.period_stars, 1_523);
        assert_eq!(first.rank, 1);

        let second = &items[1];
        assert_eq!(second.full_name, "solo/agent");
        assert_eq!(second.description, None);
        assert_eq!(second.language, None);
        assert_eq!(second.stars, 87);
        assert_eq!(second.forks, 0);
        assert_eq!(second.period_stars, 0);
        assert_eq!(second.rank, 3);
    }

    #[test]
    fn parse_count_handles_separators_and_noise() {
        assert_eq!(parse_count("523 stars today"), 523);
        assert_eq!(parse_count("1,234"), 1234);
        assert_eq!(parse_count("  9,876 stars this week"), 9876);
        assert_eq!(parse_count("stars today"), 0);
        assert_eq!(parse_count(", 12"), 12);
        assert_eq!(parse_count(""), 0);
    }

    #[test]
    fn empty_page_yields_nothing() {
        assert!(parse_listing("<html></html>").is_empty());
    }
}
