//! Single-fact lookups against public HTTP APIs: weather, encyclopedia, stocks, clocks.

use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;

use super::{Capability, arg, http_client};
use crate::domain::types::ToolArgs;

const WEATHER_ENDPOINT: &str = "https://wttr.in/";
const WIKIPEDIA_API: &str = "https://en.wikipedia.org/w/api.php";
const WIKIPEDIA_SUMMARY: &str = "https://en.wikipedia.org/api/rest_v1/page/summary/";
const STOCK_ENDPOINT: &str = "https://query1.finance.yahoo.com/v8/finance/chart/";
const WORLD_TIME_ENDPOINT: &str = "http://worldtimeapi.org/api/timezone/";

/// Appends each `/`-separated piece of `value` as an encoded path segment.
fn endpoint(base: &str, value: &str) -> Result<Url, String> {
    let mut url = Url::parse(base).map_err(|e| e.to_string())?;
    url.path_segments_mut()
        .map_err(|_| "invalid base URL".to_string())?
        .pop_if_empty()
        .extend(
            value
                .split('/')
                .filter(|s| !matches!(*s, "" | "." | "..")),
        );
    Ok(url)
}

pub struct Weather;

#[async_trait]
impl Capability for Weather {
    fn name(&self) -> &'static str {
        "get_weather"
    }

    fn params(&self) -> &'static [&'static str] {
        &["city"]
    }

    fn description(&self) -> &'static str {
        "Get current weather for a city."
    }

    async fn invoke(&self, args: &ToolArgs) -> String {
        let city = arg(args, "city");
        let mut url = match endpoint(WEATHER_ENDPOINT, &city) {
            Ok(url) => url,
            Err(e) => return format!("Error fetching weather: {}", e),
        };
        url.set_query(Some("format=%C+%t"));

        match http_client().get(url).send().await {
            Ok(response) if response.status().is_success() => match response.text().await {
                Ok(text) => format!("The weather in {} is {}.", city, text.trim()),
                Err(e) => format!("Error fetching weather: {}", e),
            },
            Ok(_) => "Something went wrong fetching weather.".to_string(),
            Err(e) => format!("Error fetching weather: {}", e),
        }
    }
}

pub struct WikipediaSummary;

#[async_trait]
impl Capability for WikipediaSummary {
    fn name(&self) -> &'static str {
        "search_wikipedia"
    }

    fn params(&self) -> &'static [&'static str] {
        &["query"]
    }

    fn description(&self) -> &'static str {
        "Search Wikipedia for a short summary."
    }

    async fn invoke(&self, args: &ToolArgs) -> String {
        let query = arg(args, "query");
        match wikipedia_summary(&query).await {
            Ok(summary) => summary,
            Err(e) => format!("Error searching Wikipedia: {}", e),
        }
    }
}

async fn wikipedia_summary(query: &str) -> Result<String, String> {
    let search: Value = http_client()
        .get(WIKIPEDIA_API)
        .query(&[
            ("action", "query"),
            ("list", "search"),
            ("srsearch", query),
            ("srlimit", "1"),
            ("format", "json"),
        ])
        .send()
        .await
        .map_err(|e| e.to_string())?
        .json()
        .await
        .map_err(|e| e.to_string())?;

    let title = search["query"]["search"][0]["title"]
        .as_str()
        .ok_or_else(|| format!("no page matches '{}'", query))?;

    let url = endpoint(WIKIPEDIA_SUMMARY, &title.replace(' ', "_"))?;
    let page: Value = http_client()
        .get(url)
        .send()
        .await
        .map_err(|e| e.to_string())?
        .json()
        .await
        .map_err(|e| e.to_string())?;

    let extract = page["extract"]
        .as_str()
        .ok_or_else(|| format!("no summary for '{}'", title))?;
    Ok(first_sentences(extract, 2))
}

/// The first `count` sentences of `text`.
fn first_sentences(text: &str, count: usize) -> String {
    let mut seen = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((idx, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            let at_boundary = chars.peek().map_or(true, |(_, next)| next.is_whitespace());
            if at_boundary {
                seen += 1;
                if seen == count {
                    return text[..idx + c.len_utf8()].trim().to_string();
                }
            }
        }
    }
    text.trim().to_string()
}

pub struct StockPrice;

#[async_trait]
impl Capability for StockPrice {
    fn name(&self) -> &'static str {
        "get_stock_price"
    }

    fn params(&self) -> &'static [&'static str] {
        &["symbol"]
    }

    fn description(&self) -> &'static str {
        "Get the current stock price for a ticker symbol (e.g. AAPL)."
    }

    async fn invoke(&self, args: &ToolArgs) -> String {
        let symbol = arg(args, "symbol").to_uppercase();
        match stock_price(&symbol).await {
            Ok(price) => format!("The current price of {} is ${:.2}", symbol, price),
            Err(e) => format!("Error fetching stock price: {}", e),
        }
    }
}

async fn stock_price(symbol: &str) -> Result<f64, String> {
    let mut url = endpoint(STOCK_ENDPOINT, symbol)?;
    url.set_query(Some("range=1d&interval=1d"));
    let chart: Value = http_client()
        .get(url)
        .send()
        .await
        .map_err(|e| e.to_string())?
        .json()
        .await
        .map_err(|e| e.to_string())?;
    parse_chart_price(&chart)
}

/// Market price from a chart payload, falling back to the last close.
fn parse_chart_price(chart: &Value) -> Result<f64, String> {
    if let Some(description) = chart["chart"]["error"]["description"].as_str() {
        return Err(description.to_string());
    }
    let result = &chart["chart"]["result"][0];
    if let Some(price) = result["meta"]["regularMarketPrice"].as_f64() {
        return Ok(price);
    }
    result["indicators"]["quote"][0]["close"]
        .as_array()
        .and_then(|closes| closes.iter().rev().find_map(Value::as_f64))
        .ok_or_else(|| "no price data".to_string())
}

pub struct WorldTime;

#[async_trait]
impl Capability for WorldTime {
    fn name(&self) -> &'static str {
        "get_world_time"
    }

    fn params(&self) -> &'static [&'static str] {
        &["timezone"]
    }

    fn description(&self) -> &'static str {
        "Get the current time in a timezone (e.g. Europe/London)."
    }

    async fn invoke(&self, args: &ToolArgs) -> String {
        let timezone = arg(args, "timezone");
        let url = match endpoint(WORLD_TIME_ENDPOINT, &timezone) {
            Ok(url) => url,
            Err(e) => return format!("Error fetching time: {}", e),
        };

        let response = match http_client().get(url).send().await {
            Ok(r) => r,
            Err(e) => return format!("Error fetching time: {}", e),
        };
        if !response.status().is_success() {
            return "Invalid timezone or API error.".to_string();
        }
        match response.json::<Value>().await {
            Ok(data) => match data["datetime"].as_str() {
                Some(datetime) => format!("The time in {} is {}", timezone, datetime),
                None => "Invalid timezone or API error.".to_string(),
            },
            Err(e) => format!("Error fetching time: {}", e),
        }
    }
}
