//! Web 搜索：DuckDuckGo Instant Answer API
//!
//! 请求带超时与 User-Agent；摘要中的 HTML 片段用 html2text 提取可读文本。

use std::time::Duration;

use async_trait::async_trait;
use html2text::from_read;
use reqwest::Client;
use serde::Deserialize;

use crate::core::CollaboratorError;

const DDG_ENDPOINT: &str = "https://api.duckduckgo.com/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub title: String,
    pub snippet: String,
    pub url: String,
}

#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, CollaboratorError>;
}

/// 离线环境：始终无结果
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopWebSearch;

#[async_trait]
impl WebSearch for NoopWebSearch {
    async fn search(&self, _query: &str) -> Result<Vec<SearchHit>, CollaboratorError> {
        Ok(Vec::new())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstantAnswer {
    #[serde(default)]
    heading: String,
    #[serde(default)]
    abstract_text: String,
    #[serde(default, rename = "AbstractURL")]
    abstract_url: String,
    #[serde(default)]
    related_topics: Vec<RelatedTopic>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RelatedTopic {
    #[serde(default)]
    text: String,
    #[serde(default, rename = "FirstURL")]
    first_url: String,
    /// 分组条目（Topics 嵌套）
    #[serde(default)]
    topics: Vec<RelatedTopic>,
}

pub struct DuckDuckGoSearch {
    client: Client,
    endpoint: String,
    max_results: usize,
}

impl DuckDuckGoSearch {
    pub fn new(timeout_secs: u64, max_results: usize) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .user_agent(concat!("ulcs/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self {
            client,
            endpoint: DDG_ENDPOINT.to_string(),
            max_results: max_results.max(1),
        }
    }

    /// 指向兼容端点（测试或自建代理）
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn plain_text(s: &str) -> String {
        let text = match from_read(s.as_bytes(), 200) {
            Ok(t) if !t.trim().is_empty() => t,
            _ => s.to_string(),
        };
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn collect_hits(&self, answer: InstantAnswer) -> Vec<SearchHit> {
        let mut hits = Vec::new();
        if !answer.abstract_text.trim().is_empty() {
            hits.push(SearchHit {
                title: answer.heading.clone(),
                snippet: Self::plain_text(&answer.abstract_text),
                url: answer.abstract_url,
            });
        }
        let flat = answer
            .related_topics
            .into_iter()
            .flat_map(|t| if t.topics.is_empty() { vec![t] } else { t.topics });
        for topic in flat {
            if hits.len() >= self.max_results {
                break;
            }
            if topic.text.trim().is_empty() {
                continue;
            }
            let snippet = Self::plain_text(&topic.text);
            let title = snippet.split(" - ").next().unwrap_or(&snippet).to_string();
            hits.push(SearchHit {
                title,
                snippet,
                url: topic.first_url,
            });
        }
        hits.truncate(self.max_results);
        hits
    }
}

#[async_trait]
impl WebSearch for DuckDuckGoSearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, CollaboratorError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        tracing::info!(query = %query, "web search");
        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await
            .map_err(|e| CollaboratorError::new("web_search", format!("Request failed: {}", e)))?;
        if !resp.status().is_success() {
            return Err(CollaboratorError::new(
                "web_search",
                format!("HTTP {}", resp.status()),
            ));
        }
        let answer: InstantAnswer = resp
            .json()
            .await
            .map_err(|e| CollaboratorError::new("web_search", format!("Bad response: {}", e)))?;
        Ok(self.collect_hits(answer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_hits_flattens_topics() {
        let raw = r#"{
            "Heading": "Rust",
            "AbstractText": "Rust is a <b>language</b>.",
            "AbstractURL": "https://en.wikipedia.org/wiki/Rust",
            "RelatedTopics": [
                {"Text": "Cargo - package manager", "FirstURL": "https://doc.rust-lang.org/cargo"},
                {"Name": "Group", "Topics": [
                    {"Text": "Crates - registry", "FirstURL": "https://crates.io"}
                ]},
                {"Text": "", "FirstURL": "https://skip.me"}
            ]
        }"#;
        let answer: InstantAnswer = serde_json::from_str(raw).unwrap();
        let search = DuckDuckGoSearch::new(5, 3);
        let hits = search.collect_hits(answer);
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].title, "Rust");
        assert!(hits[0].snippet.contains("language"));
        assert_eq!(hits[1].title, "Cargo");
        assert_eq!(hits[2].url, "https://crates.io");
    }

    #[test]
    fn test_max_results() {
        let answer = InstantAnswer {
            abstract_text: "one".into(),
            related_topics: vec![RelatedTopic {
                text: "two".into(),
                ..Default::default()
            }],
            ..Default::default()
        };
        let hits = DuckDuckGoSearch::new(5, 1).collect_hits(answer);
        assert_eq!(hits.len(), 1);
    }

    /// 本地桩：读完请求头后回一个固定响应
    async fn serve_once(status: &'static str, body: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = sock.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }
            let resp = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            sock.write_all(resp.as_bytes()).await.unwrap();
        });
        format!("http://{addr}/")
    }

    #[tokio::test]
    async fn test_search_against_local_endpoint() {
        let endpoint = serve_once(
            "200 OK",
            r#"{"Heading": "Tokio", "AbstractText": "An async runtime.", "AbstractURL": "https://tokio.rs"}"#,
        )
        .await;
        let search = DuckDuckGoSearch::new(5, 3).with_endpoint(endpoint);
        let hits = search.search("tokio").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Tokio");
        assert_eq!(hits[0].url, "https://tokio.rs");
    }

    #[tokio::test]
    async fn test_search_http_error() {
        let endpoint = serve_once("503 Service Unavailable", "{}").await;
        let search = DuckDuckGoSearch::new(5, 3).with_endpoint(endpoint);
        let err = search.search("tokio").await.unwrap_err();
        assert!(err.to_string().contains("HTTP 503"));
    }

    #[tokio::test]
    async fn test_noop_and_empty_query() {
        assert!(NoopWebSearch.search("rust").await.unwrap().is_empty());
        let search = DuckDuckGoSearch::new(1, 3).with_endpoint("http://127.0.0.1:9");
        assert!(search.search("   ").await.unwrap().is_empty());
    }
}
