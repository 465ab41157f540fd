use super::util::with_retry;
use crate::core::config::{QuoteConfig, SourceConfig};
use crate::core::error::RateError;
use crate::core::record::Quote;
use crate::core::source::RateSource;
use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use rust_decimal::Decimal;
use scraper::{ElementRef, Html, Selector};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, instrument};

/// Bank of China foreign exchange quotation page (`whpj`) provider
pub struct BocProvider {
    client: reqwest::Client,
    source: SourceConfig,
    quote: QuoteConfig,
}

impl BocProvider {
    pub fn new(source: &SourceConfig, quote: &QuoteConfig) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("zh-CN,zh;q=0.9,en;q=0.8"),
        );

        let client = reqwest::Client::builder()
            .user_agent(source.user_agent.as_str())
            .default_headers(headers)
            .timeout(Duration::from_secs(source.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            source: source.clone(),
            quote: quote.clone(),
        })
    }

    async fn fetch_html(&self) -> Result<String, RateError> {
        let url = self.source.url.as_str();
        debug!("Requesting quotation page from {}", url);

        with_retry(
            || async {
                self.client
                    .get(url)
                    .send()
                    .await?
                    .error_for_status()?
                    .text()
                    .await
            },
            self.source.max_attempts,
            Duration::from_millis(self.source.retry_delay_ms),
        )
        .await
        .map_err(|source| RateError::Network {
            url: url.to_string(),
            attempts: self.source.max_attempts.max(1),
            source,
        })
    }
}

#[async_trait]
impl RateSource for BocProvider {
    fn source_url(&self) -> &str {
        &self.source.url
    }

    #[instrument(
        name = "BocQuoteFetch",
        skip(self),
        fields(url = %self.source.url, pair = %self.quote.pair)
    )]
    async fn fetch_quote(&self) -> Result<Quote, RateError> {
        let html = self.fetch_html().await?;
        debug!(bytes = html.len(), "Received quotation page");
        extract_quote(&html, &self.quote)
    }
}

/// Column positions of the rate and publish time cells. `date` is set when
/// the header splits the publish date into its own column.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Columns {
    rate: usize,
    time: usize,
    date: Option<usize>,
}

/// Finds the configured currency row in the quotation table and reads its
/// rate and publish time.
///
/// Column positions come from the header row when one names both configured
/// fields, otherwise from `rate_column`/`time_column`. A separate publish date
/// column is joined in front of the time. Only the direct cells of
/// each `<tr>` are considered, so layout tables wrapping the quotation table
/// never match. A matching row with an unparsable rate is skipped.
pub fn extract_quote(html: &str, config: &QuoteConfig) -> Result<Quote, RateError> {
    if config.unit.is_zero() {
        return Err(RateError::Parse("quote unit must not be zero".to_string()));
    }

    let document = Html::parse_document(html);
    let row_selector = Selector::parse("tr")
        .map_err(|e| RateError::Parse(format!("invalid row selector: {e:?}")))?;

    let mut columns = Columns {
        rate: config.rate_column,
        time: config.time_column,
        date: None,
    };
    let mut candidates = 0;

    for row in document.select(&row_selector) {
        let cells = row_cells(row);

        if let Some(found) = header_columns(&cells, config) {
            debug!(?found, "Found header row");
            columns = found;
            continue;
        }

        let Some(label) = cells.first() else {
            continue;
        };
        if !config.aliases.iter().any(|alias| label.contains(alias.as_str())) {
            continue;
        }
        candidates += 1;

        let (Some(rate_text), Some(time_text)) =
            (cells.get(columns.rate), cells.get(columns.time))
        else {
            debug!(cells = ?cells, "Currency row has too few cells");
            continue;
        };

        let scaled = match parse_decimal(rate_text) {
            Some(value) => value,
            None => {
                debug!(cells = ?cells, "Could not parse rate cell '{}'", rate_text);
                continue;
            }
        };
        if time_text.is_empty() {
            debug!(cells = ?cells, "Currency row has an empty publish time");
            continue;
        }

        let publish_time_raw = match columns.date.and_then(|i| cells.get(i)) {
            Some(date_text) if !date_text.is_empty() => format!("{date_text} {time_text}"),
            _ => time_text.clone(),
        };

        let quote = Quote {
            currency: label.clone(),
            rate: scaled / config.unit,
            publish_time_raw,
        };
        debug!(?quote, "Extracted quote");
        return Ok(quote);
    }

    let wanted = config.aliases.join("/");
    if candidates == 0 {
        Err(RateError::Parse(format!("no row found for {wanted}")))
    } else {
        Err(RateError::Parse(format!(
            "{candidates} row(s) found for {wanted} but none had a usable {} and {}",
            config.field, config.time_field
        )))
    }
}

/// Text of the direct `th`/`td` children of a row, whitespace collapsed.
fn row_cells(row: ElementRef) -> Vec<String> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|cell| matches!(cell.value().name(), "td" | "th"))
        .map(|cell| {
            cell.text()
                .collect::<String>()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

fn header_columns(cells: &[String], config: &QuoteConfig) -> Option<Columns> {
    let rate = cells.iter().position(|c| *c == config.field)?;
    let time = cells.iter().position(|c| *c == config.time_field)?;
    let date = cells
        .iter()
        .position(|c| !config.date_field.is_empty() && *c == config.date_field)
        .filter(|date| *date != time);
    Some(Columns { rate, time, date })
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    let cleaned: String = text
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const BOC_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>中国银行外汇牌价</title></head>
<body>
<table width="100%"><tr><td>
  <div class="publish">
  <table cellpadding="0" cellspacing="0" width="100%">
    <tr>
      <th>货币名称</th>
      <th>现汇买入价</th>
      <th>现钞买入价</th>
      <th>现汇卖出价</th>
      <th>现钞卖出价</th>
      <th>中行折算价</th>
      <th>发布时间</th>
    </tr>
    <tr>
      <td>澳大利亚元</td><td>452.05</td><td>437.99</td><td>455.38</td><td>457.58</td><td>453.55</td>
      <td class="pjrq">2025.01.02 10:30:00</td>
    </tr>
    <tr>
      <td>英镑</td>
      <td>931.58</td>
      <td>902.63</td>
      <td>
        936.54
      </td>
      <td>938.82</td>
      <td>935.31</td>
      <td class="pjrq">2025.01.02&nbsp;
        10:30:00</td>
    </tr>
  </table>
  </div>
</td></tr></table>
</body>
</html>"#;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_extract_quote_from_boc_page() {
        let quote = extract_quote(BOC_PAGE, &QuoteConfig::default()).unwrap();
        assert_eq!(quote.currency, "英镑");
        assert_eq!(quote.rate, dec("9.3654"));
        assert_eq!(quote.publish_time_raw, "2025.01.02 10:30:00");
    }

    #[test]
    fn test_extract_quote_follows_header_when_columns_move() {
        let html = r#"<table>
            <tr><th>货币名称</th><th>现汇买入价</th><th>现钞买入价</th><th>现钞卖出价</th>
                <th>中行折算价</th><th>现汇卖出价</th><th>发布日期</th><th>发布时间</th></tr>
            <tr><td>英镑 GBP</td><td>931.58</td><td>902.63</td><td>938.82</td>
                <td>935.31</td><td>1,012.34</td><td>2025.01.02</td><td>10:30:00</td></tr>
        </table>"#;

        let quote = extract_quote(html, &QuoteConfig::default()).unwrap();
        assert_eq!(quote.currency, "英镑 GBP");
        assert_eq!(quote.rate, dec("10.1234"));
        assert_eq!(quote.publish_time_raw, "2025.01.02 10:30:00");
    }

    #[test]
    fn test_extract_quote_with_empty_date_cell_keeps_time() {
        let html = r#"<table>
            <tr><th>货币名称</th><th>现汇买入价</th><th>现钞买入价</th><th>现汇卖出价</th>
                <th>现钞卖出价</th><th>中行折算价</th><th>发布日期</th><th>发布时间</th></tr>
            <tr><td>英镑</td><td>931.58</td><td>902.63</td><td>936.54</td>
                <td>938.82</td><td>935.31</td><td></td><td>10:30:00</td></tr>
        </table>"#;

        let quote = extract_quote(html, &QuoteConfig::default()).unwrap();
        assert_eq!(quote.rate, dec("9.3654"));
        assert_eq!(quote.publish_time_raw, "10:30:00");
    }

    #[test]
    fn test_extract_quote_without_header_uses_default_columns() {
        let html = r#"<table>
            <tr><td>GBP</td><td>931.58</td><td>902.63</td><td>936.54</td>
                <td>938.82</td><td>935.31</td><td>2025.01.02 10:30:00</td></tr>
        </table>"#;

        let quote = extract_quote(html, &QuoteConfig::default()).unwrap();
        assert_eq!(quote.currency, "GBP");
        assert_eq!(quote.rate, dec("9.3654"));
        assert_eq!(quote.publish_time_raw, "2025.01.02 10:30:00");
    }

    #[test]
    fn test_extract_quote_skips_unparsable_duplicate() {
        let html = r#"<table>
            <tr><td>英镑</td><td>931.58</td><td>902.63</td><td></td>
                <td>938.82</td><td>935.31</td><td>2025.01.02 10:30:00</td></tr>
            <tr><td>英镑</td><td>931.58</td><td>902.63</td><td>937.00</td>
                <td>938.82</td><td>935.31</td><td>2025.01.02 11:00:00</td></tr>
        </table>"#;

        let quote = extract_quote(html, &QuoteConfig::default()).unwrap();
        assert_eq!(quote.rate, dec("9.37"));
        assert_eq!(quote.publish_time_raw, "2025.01.02 11:00:00");
    }

    #[test]
    fn test_extract_quote_missing_row() {
        let html = r#"<table>
            <tr><td>美元</td><td>718.2</td><td>712.4</td><td>721.24</td>
                <td>721.24</td><td>719.01</td><td>2025.01.02 10:30:00</td></tr>
        </table>"#;

        let err = extract_quote(html, &QuoteConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
        assert_eq!(
            err.to_string(),
            "Could not parse rate from page: no row found for 英镑/GBP"
        );
    }

    #[test]
    fn test_extract_quote_short_row() {
        let html = r#"<table><tr><td>英镑</td><td>931.58</td></tr></table>"#;

        let err = extract_quote(html, &QuoteConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
        assert!(err.to_string().contains("1 row(s) found for 英镑/GBP"));
    }

    #[test]
    fn test_extract_quote_not_html() {
        let err = extract_quote("Service Unavailable", &QuoteConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal(" 1,012.34 "), Some(dec("1012.34")));
        assert_eq!(parse_decimal("936.54"), Some(dec("936.54")));
        assert_eq!(parse_decimal(""), None);
        assert_eq!(parse_decimal("--"), None);
    }

    async fn create_mock_server(status: u16, body: &str, expected_calls: u64) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/sourcedb/whpj/"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .expect(expected_calls)
            .mount(&mock_server)
            .await;

        mock_server
    }

    fn provider_for(mock_server: &MockServer) -> BocProvider {
        let source = SourceConfig {
            url: format!("{}/sourcedb/whpj/", mock_server.uri()),
            timeout_secs: 5,
            retry_delay_ms: 0,
            ..SourceConfig::default()
        };
        BocProvider::new(&source, &QuoteConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_quote() {
        let mock_server = create_mock_server(200, BOC_PAGE, 1).await;
        let provider = provider_for(&mock_server);

        let quote = provider.fetch_quote().await.unwrap();
        assert_eq!(quote.rate, dec("9.3654"));
        assert_eq!(quote.publish_time_raw, "2025.01.02 10:30:00");
        assert!(provider.source_url().ends_with("/sourcedb/whpj/"));
    }

    #[tokio::test]
    async fn test_fetch_quote_server_error_exhausts_retries() {
        let mock_server = create_mock_server(500, "", 3).await;
        let provider = provider_for(&mock_server);

        let err = provider.fetch_quote().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Network);
        assert!(matches!(err, RateError::Network { attempts: 3, .. }));
        assert!(err.to_string().contains("after 3 attempts"));
    }

    #[tokio::test]
    async fn test_fetch_quote_page_without_rate() {
        let mock_server = create_mock_server(200, "<html><body>维护中</body></html>", 1).await;
        let provider = provider_for(&mock_server);

        let err = provider.fetch_quote().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }
}
