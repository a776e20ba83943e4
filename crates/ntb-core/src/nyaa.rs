//! Search client and magnet extractor for nyaa.si.
//!
//! The site has no API, so this scrapes the results table and detail pages.
//! Every extraction step degrades to a placeholder or a skipped row rather
//! than aborting the whole page: the DOM is a moving target.

use std::time::Duration;

use scraper::{ElementRef, Html, Selector};

use crate::{config::Config, domain::SearchResult, errors::Error, Result};

/// Per-item detail pages live under this prefix on the site.
pub const DETAIL_PREFIX: &str = "/view/";

/// Builds the query-string search URL: free-text filter `f=0`, all-categories
/// selector `c=0_0`, percent-encoded query and 1-based page number.
pub fn build_search_url(base_url: &str, query: &str, page: u32) -> String {
    format!(
        "{}/?f=0&c=0_0&q={}&p={}",
        base_url,
        urlencoding::encode(query),
        page
    )
}

/// HTTP client for the search site.
pub struct NyaaClient {
    http: reqwest::Client,
    base_url: String,
}

impl NyaaClient {
    pub fn new(cfg: &Config) -> Result<Self> {
        Self::with_base_url(&cfg.search_base_url, cfg.http_timeout, &cfg.user_agent)
    }

    /// Build a client against an arbitrary base URL (tests point this at a
    /// mock server).
    pub fn with_base_url(base_url: &str, timeout: Duration, user_agent: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Search the site. `page` is 1-based.
    ///
    /// Non-2xx responses surface as `Error::Http`; callers treat that the
    /// same as an empty result list. An empty query never hits the network.
    pub async fn search(&self, query: &str, page: u32) -> Result<Vec<SearchResult>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::EmptyQuery);
        }

        let url = build_search_url(&self.base_url, query, page);
        let response = self.http.get(&url).send().await?.error_for_status()?;
        let html = response.text().await?;
        Ok(parse_search_page(&html, &self.base_url))
    }

    /// Fetch a result's detail page and pull out its magnet link.
    ///
    /// Missing anchor and non-2xx status both map to `Ok(None)`; only
    /// transport failures are errors. Never cached: repeated selection
    /// re-fetches.
    pub async fn fetch_magnet(&self, detail_url: &str) -> Result<Option<String>> {
        let response = self.http.get(detail_url).send().await?;
        if !response.status().is_success() {
            return Ok(None);
        }
        let html = response.text().await?;
        Ok(parse_magnet(&html))
    }
}

/// Extract result rows from a search page.
///
/// Rows without a detail-page anchor (header decoration, ads) are skipped;
/// a page with zero extractable rows is an empty vec, not an error.
pub fn parse_search_page(html: &str, base_url: &str) -> Vec<SearchResult> {
    let document = Html::parse_document(html);
    let row_selector = Selector::parse("table.torrent-list tbody tr").expect("valid selector");
    let anchor_selector = Selector::parse("a[href]").expect("valid selector");
    let cell_selector = Selector::parse("td").expect("valid selector");

    document
        .select(&row_selector)
        .filter_map(|row| parse_result_row(row, base_url, &anchor_selector, &cell_selector))
        .collect()
}

fn parse_result_row(
    row: ElementRef<'_>,
    base_url: &str,
    anchor_selector: &Selector,
    cell_selector: &Selector,
) -> Option<SearchResult> {
    // The name cell can hold two /view/ anchors: a "#comments" one and the
    // real title link. The fragment-free one is the title.
    let link = row.select(anchor_selector).find(|a| {
        a.value()
            .attr("href")
            .map(|h| h.starts_with(DETAIL_PREFIX) && !h.contains('#'))
            .unwrap_or(false)
    })?;

    let title = collect_text(link);
    if title.is_empty() {
        return None;
    }
    let href = link.value().attr("href")?;
    let detail_url = format!("{base_url}{href}");

    // Positional contract with the site's current table layout: size in the
    // 4th column, seeders in the 6th, leechers in the 7th. A short row
    // substitutes defaults instead of failing.
    let cells: Vec<ElementRef<'_>> = row.select(cell_selector).collect();
    let size = cell_text(&cells, 3).unwrap_or_else(|| "Unknown".to_string());
    let seeders = cell_text(&cells, 5).unwrap_or_else(|| "0".to_string());
    let leechers = cell_text(&cells, 6).unwrap_or_else(|| "0".to_string());

    Some(SearchResult {
        title,
        detail_url,
        size,
        seeders,
        leechers,
    })
}

/// First `magnet:`-scheme anchor on a detail page, if any.
pub fn parse_magnet(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(r#"a[href^="magnet:"]"#).expect("valid selector");
    document
        .select(&selector)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(str::to_string)
}

fn collect_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn cell_text(cells: &[ElementRef<'_>], index: usize) -> Option<String> {
    cells.get(index).map(|c| collect_text(*c))
}

#[cfg(test)]
mod tests {
    use super::*;

    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const BASE: &str = "https://nyaa.si";

    fn row(title: &str, id: u32, size: &str, seeders: &str, leechers: &str) -> String {
        format!(
            r#"<tr class="default">
              <td><a href="/?c=1_2"><img alt="cat"></a></td>
              <td colspan="2">
                <a href="/view/{id}#comments" class="comments"><i></i>3</a>
                <a href="/view/{id}" title="{title}">{title}</a>
              </td>
              <td class="text-center">
                <a href="/download/{id}.torrent"><i></i></a>
                <a href="magnet:?xt=urn:btih:feed{id}"><i></i></a>
              </td>
              <td class="text-center">{size}</td>
              <td class="text-center">2026-08-01 10:00</td>
              <td class="text-center">{seeders}</td>
              <td class="text-center">{leechers}</td>
              <td class="text-center">941</td>
            </tr>"#
        )
    }

    fn results_page(rows: &[String]) -> String {
        format!(
            r#"<html><body><div class="table-responsive">
            <table class="torrent-list table">
            <thead><tr><th>Category</th><th>Name</th><th></th><th>Size</th><th>Date</th><th>S</th><th>L</th><th>D</th></tr></thead>
            <tbody>{}</tbody>
            </table></div></body></html>"#,
            rows.join("\n")
        )
    }

    #[test]
    fn search_url_encodes_query_and_page() {
        let url = build_search_url(BASE, "naruto shippuden 1080p", 2);
        assert_eq!(
            url,
            "https://nyaa.si/?f=0&c=0_0&q=naruto%20shippuden%201080p&p=2"
        );
    }

    #[test]
    fn parses_every_well_formed_row() {
        let html = results_page(&[
            row("[Judas] Naruto (Season 1)", 100, "24.2 GiB", "120", "4"),
            row("Naruto Kai 1080p", 101, "1.4 GiB", "55", "2"),
        ]);

        let results = parse_search_page(&html, BASE);
        assert_eq!(results.len(), 2);

        let first = &results[0];
        assert_eq!(first.title, "[Judas] Naruto (Season 1)");
        assert_eq!(first.detail_url, "https://nyaa.si/view/100");
        assert_eq!(first.size, "24.2 GiB");
        assert_eq!(first.seeders, "120");
        assert_eq!(first.leechers, "4");
        assert!(results.iter().all(|r| r.detail_url.starts_with(BASE)));
    }

    #[test]
    fn comments_anchor_does_not_shadow_the_title() {
        let html = results_page(&[row("Real Title", 7, "1 GiB", "9", "1")]);
        let results = parse_search_page(&html, BASE);
        assert_eq!(results[0].title, "Real Title");
        assert_eq!(results[0].detail_url, "https://nyaa.si/view/7");
    }

    #[test]
    fn short_row_falls_back_to_placeholders() {
        // Category + name + links + size only: seeder/leecher columns absent.
        let html = results_page(&[r#"<tr>
            <td><img alt="cat"></td>
            <td><a href="/view/55">Sparse Row</a></td>
            <td></td>
            <td>700 MiB</td>
        </tr>"#
            .to_string()]);

        let results = parse_search_page(&html, BASE);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].size, "700 MiB");
        assert_eq!(results[0].seeders, "0");
        assert_eq!(results[0].leechers, "0");
    }

    #[test]
    fn row_missing_size_cell_reports_unknown() {
        let html = results_page(&[r#"<tr>
            <td><a href="/view/56">Tiny Row</a></td>
        </tr>"#
            .to_string()]);

        let results = parse_search_page(&html, BASE);
        assert_eq!(results[0].size, "Unknown");
        assert_eq!(results[0].seeders, "0");
        assert_eq!(results[0].leechers, "0");
    }

    #[test]
    fn decoration_rows_are_skipped() {
        let html = results_page(&[
            r#"<tr><td colspan="8">Sponsored banner</td></tr>"#.to_string(),
            row("Actual Result", 200, "3 GiB", "7", "0"),
        ]);

        let results = parse_search_page(&html, BASE);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Actual Result");
    }

    #[test]
    fn zero_parsable_rows_is_empty_not_error() {
        let results = parse_search_page("<html><body><p>cloudflare</p></body></html>", BASE);
        assert!(results.is_empty());
    }

    #[test]
    fn magnet_anchor_is_extracted() {
        let html = r#"<html><body>
            <div class="panel-footer">
              <a href="/download/1.torrent">Download</a>
              <a href="magnet:?xt=urn:btih:abcdef0123456789&amp;dn=x">Magnet</a>
            </div></body></html>"#;
        assert_eq!(
            parse_magnet(html),
            Some("magnet:?xt=urn:btih:abcdef0123456789&dn=x".to_string())
        );
    }

    #[test]
    fn detail_page_without_magnet_yields_none() {
        let html = r#"<html><body><a href="/download/1.torrent">Download</a></body></html>"#;
        assert_eq!(parse_magnet(html), None);
    }

    async fn test_client(server: &MockServer) -> NyaaClient {
        NyaaClient::with_base_url(&server.uri(), Duration::from_secs(5), "test-agent")
            .expect("client builds")
    }

    #[tokio::test]
    async fn search_hits_the_query_endpoint_and_parses_rows() {
        let server = MockServer::start().await;
        let body = results_page(&[row("Hit", 9, "1 GiB", "3", "1")]);

        Mock::given(method("GET"))
            .and(path("/"))
            .and(query_param("q", "naruto"))
            .and(query_param("p", "1"))
            .and(query_param("f", "0"))
            .and(query_param("c", "0_0"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server).await;
        let results = client.search("naruto", 1).await.expect("search succeeds");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Hit");
        assert_eq!(results[0].detail_url, format!("{}/view/9", server.uri()));
    }

    #[tokio::test]
    async fn non_success_status_is_a_search_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = test_client(&server).await;
        assert!(client.search("naruto", 1).await.is_err());
    }

    #[tokio::test]
    async fn empty_query_never_reaches_the_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = test_client(&server).await;
        assert!(matches!(
            client.search("   ", 1).await,
            Err(Error::EmptyQuery)
        ));
    }

    #[tokio::test]
    async fn magnet_fetch_maps_not_found_to_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/view/404"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = test_client(&server).await;
        let magnet = client
            .fetch_magnet(&format!("{}/view/404", server.uri()))
            .await
            .expect("transport ok");
        assert_eq!(magnet, None);
    }

    #[tokio::test]
    async fn magnet_fetch_returns_first_magnet_anchor() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/view/12"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<html><body><a href="magnet:?xt=urn:btih:cafe">m</a></body></html>"#,
            ))
            .mount(&server)
            .await;

        let client = test_client(&server).await;
        let magnet = client
            .fetch_magnet(&format!("{}/view/12", server.uri()))
            .await
            .expect("transport ok");
        assert_eq!(magnet, Some("magnet:?xt=urn:btih:cafe".to_string()));
    }
}
