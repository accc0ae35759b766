//! Web search and page reading.

use async_trait::async_trait;
use reqwest::Url;
use scraper::{Html, Selector};
use serde::Serialize;

use super::{Capability, arg, http_client};
use crate::domain::types::ToolArgs;

const SEARCH_ENDPOINT: &str = "https://html.duckduckgo.com/html/";
const MAX_SEARCH_RESULTS: usize = 3;
const MAX_PAGE_CHARS: usize = 2000;

#[derive(Debug, Serialize, PartialEq)]
struct SearchResult {
    title: String,
    href: String,
    body: String,
}

pub struct WebSearch;

#[async_trait]
impl Capability for WebSearch {
    fn name(&self) -> &'static str {
        "web_search"
    }

    fn params(&self) -> &'static [&'static str] {
        &["query"]
    }

    fn description(&self) -> &'static str {
        "Search the web for information."
    }

    async fn invoke(&self, args: &ToolArgs) -> String {
        let query = arg(args, "query");
        match search(&query).await {
            Ok(results) => {
                serde_json::to_string_pretty(&results).unwrap_or_else(|e| format!("Error searching web: {}", e))
            }
            Err(e) => format!("Error searching web: {}", e),
        }
    }
}

async fn search(query: &str) -> Result<Vec<SearchResult>, reqwest::Error> {
    let html = http_client()
        .post(SEARCH_ENDPOINT)
        .form(&[("q", query)])
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    Ok(parse_search_results(&html, MAX_SEARCH_RESULTS))
}

fn parse_search_results(html: &str, limit: usize) -> Vec<SearchResult> {
    let document = Html::parse_document(html);
    let (Ok(result_sel), Ok(link_sel), Ok(snippet_sel)) = (
        Selector::parse(".result"),
        Selector::parse("a.result__a"),
        Selector::parse(".result__snippet"),
    ) else {
        return Vec::new();
    };

    document
        .select(&result_sel)
        .filter_map(|result| {
            let link = result.select(&link_sel).next()?;
            let title = collapse(link.text());
            let href = decode_redirect(link.value().attr("href")?);
            let body = result
                .select(&snippet_sel)
                .next()
                .map(|s| collapse(s.text()))
                .unwrap_or_default();
            Some(SearchResult { title, href, body })
        })
        .take(limit)
        .collect()
}

/// Result links are wrapped as `//duckduckgo.com/l/?uddg=<target>`.
fn decode_redirect(href: &str) -> String {
    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else {
        href.to_string()
    };
    Url::parse(&absolute)
        .ok()
        .and_then(|url| {
            url.query_pairs()
                .find(|(key, _)| key == "uddg")
                .map(|(_, target)| target.into_owned())
        })
        .unwrap_or(absolute)
}

pub struct ReadUrl;

#[async_trait]
impl Capability for ReadUrl {
    fn name(&self) -> &'static str {
        "read_url"
    }

    fn params(&self) -> &'static [&'static str] {
        &["url"]
    }

    fn description(&self) -> &'static str {
        "Read the text content of a webpage."
    }

    async fn invoke(&self, args: &ToolArgs) -> String {
        let url = arg(args, "url");
        match fetch_text(&url).await {
            Ok(text) => truncate(&text, MAX_PAGE_CHARS),
            Err(e) => format!("Error reading URL: {}", e),
        }
    }
}

async fn fetch_text(url: &str) -> Result<String, reqwest::Error> {
    let html = http_client().get(url).send().await?.text().await?;
    Ok(page_text(&html))
}

/// Visible text of a document, whitespace-collapsed.
fn page_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut words: Vec<&str> = Vec::new();
    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let invisible = node.ancestors().any(|ancestor| {
            matches!(
                ancestor.value().as_element().map(|e| e.name()),
                Some("script" | "style" | "noscript" | "template")
            )
        });
        if !invisible {
            words.extend(text.split_whitespace());
        }
    }
    words.join(" ")
}

fn collapse<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let head: String = text.chars().take(max_chars).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESULTS_PAGE: &str = r#"
<html><body>
  <div class="result">
    <h2><a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.rust-lang.org%2F&amp;rut=abc">Rust  Programming
      Language</a></h2>
    <a class="result__snippet">A language empowering everyone.</a>
  </div>
  <div class="result">
    <h2><a class="result__a" href="https://doc.rust-lang.org/book/">The Book</a></h2>
  </div>
  <div class="result">
    <h2><a class="result__a" href="https://crates.io/">crates.io</a></h2>
    <a class="result__snippet">The Rust community's crate registry</a>
  </div>
  <div class="result">
    <h2><a class="result__a" href="https://example.com/">Fourth</a></h2>
  </div>
</body></html>"#;

    #[test]
    fn test_parse_search_results() {
        let results = parse_search_results(RESULTS_PAGE, 3);
        assert_eq!(results.len(), 3);
        assert_eq!(
            results[0],
            SearchResult {
                title: "Rust Programming Language".to_string(),
                href: "https://www.rust-lang.org/".to_string(),
                body: "A language empowering everyone.".to_string(),
            }
        );
        assert_eq!(results[1].href, "https://doc.rust-lang.org/book/");
        assert_eq!(results[1].body, "");
    }

    #[test]
    fn test_page_text_skips_scripts() {
        let html = r#"<html><head><title>Title</title><style>p { color: red }</style></head>
            <body><p>Hello
            world</p><script>var x = 1;</script><div>again</div></body></html>"#;
        assert_eq!(page_text(html), "Title Hello world again");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        let long = "a".repeat(2001);
        let out = truncate(&long, 2000);
        assert_eq!(out.len(), 2003);
        assert!(out.ends_with("..."));
    }
}
