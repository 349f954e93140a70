//! arXiv API 客户端
//!
//! 调用 arXiv 的 Atom 接口（`export.arxiv.org/api/query`），按提交时间倒序返回论文列表。

use std::sync::LazyLock;
use std::time::Duration;

use chrono::DateTime;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use tracing::debug;

use crate::error::SearchError;
use crate::models::PaperRef;

/// arXiv 单页最多返回的条目数
const MAX_PAGE_SIZE: usize = 100;

static NEW_STYLE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4}\.\d{4,5})(?:v\d+)?").expect("valid arXiv id regex"));
static OLD_STYLE_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([a-z\-]+(?:\.[A-Z]{2})?/\d{7})(?:v\d+)?").expect("valid arXiv id regex")
});
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// arXiv 客户端
#[derive(Clone)]
pub struct ArxivClient {
    http: Client,
    base: String,
}

impl ArxivClient {
    pub fn new(base: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .user_agent(concat!("paper-scout/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            base: base.into(),
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// 按主题检索，主题原样作为 `search_query`
    ///
    /// 没有结果时返回空列表
    pub async fn search(&self, query: &str, max_results: usize) -> Result<Vec<PaperRef>, SearchError> {
        let page_size = max_results.clamp(1, MAX_PAGE_SIZE);
        debug!("arXiv 检索: query='{}', max_results={}", query, page_size);

        let resp = self
            .http
            .get(&self.base)
            .query(&[("search_query", query)])
            .query(&[("start", 0), ("max_results", page_size)])
            .query(&[("sortBy", "submittedDate"), ("sortOrder", "descending")])
            .header(ACCEPT, "application/atom+xml, application/xml;q=0.9, text/xml;q=0.8")
            .send()
            .await
            .map_err(|source| SearchError::Request {
                endpoint: self.base.clone(),
                source,
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SearchError::BadStatus {
                endpoint: self.base.clone(),
                status: status.as_u16(),
            });
        }

        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = resp.text().await.map_err(|source| SearchError::Request {
            endpoint: self.base.clone(),
            source,
        })?;

        if !(content_type.contains("xml") || content_type.contains("atom")) {
            return Err(SearchError::UnexpectedContent {
                content_type,
                preview: crate::utils::logging::truncate_text(body.trim(), 200),
            });
        }

        let mut papers = parse_atom_feed(&body)?;
        papers.truncate(max_results);
        Ok(papers)
    }
}

/// 从 arXiv 链接或编号中提取不带版本号的 id
///
/// - `http://arxiv.org/abs/2301.07041v2` → `2301.07041`
/// - `arXiv:hep-th/9901001v1` → `hep-th/9901001`
pub fn normalize_arxiv_id(raw: &str) -> Option<String> {
    if let Some(caps) = NEW_STYLE_ID.captures(raw) {
        return caps.get(1).map(|m| m.as_str().to_string());
    }
    OLD_STYLE_ID
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

/// 当前正在读取文本的字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Id,
    Title,
    Summary,
    Published,
    AuthorName,
}

#[derive(Debug, Default)]
struct EntryBuilder {
    id: String,
    title: String,
    summary: String,
    published: String,
    authors: Vec<String>,
    html_url: Option<String>,
    pdf_url: Option<String>,
}

impl EntryBuilder {
    fn apply_link(&mut self, e: &BytesStart<'_>) {
        let mut rel = None;
        let mut href = None;
        let mut typ = None;
        let mut title = None;
        for attr in e.attributes().flatten() {
            let value = match attr.unescape_value() {
                Ok(v) => v.into_owned(),
                Err(_) => continue,
            };
            match attr.key.local_name().as_ref() {
                b"rel" => rel = Some(value),
                b"href" => href = Some(value),
                b"type" => typ = Some(value),
                b"title" => title = Some(value),
                _ => {}
            }
        }

        let Some(href) = href else { return };
        let is_pdf = title.as_deref().is_some_and(|t| t.eq_ignore_ascii_case("pdf"))
            || typ.as_deref().is_some_and(|t| t.contains("pdf"));
        if is_pdf {
            self.pdf_url.get_or_insert(href);
        } else if rel.as_deref() == Some("alternate") {
            self.html_url.get_or_insert(href);
        }
    }

    fn build(self) -> Result<PaperRef, SearchError> {
        // arXiv 用一个特殊 entry 表示查询语法错误
        if self.id.contains("/api/errors") {
            return Err(SearchError::Malformed(format!(
                "arXiv 返回错误: {}",
                collapse_whitespace(&self.summary)
            )));
        }
        if self.id.is_empty() {
            return Err(SearchError::Malformed("entry 缺少 id".to_string()));
        }

        let id = normalize_arxiv_id(&self.id).unwrap_or_else(|| {
            self.id
                .rsplit('/')
                .next()
                .unwrap_or(self.id.as_str())
                .to_string()
        });
        let html_url = self.html_url.unwrap_or_else(|| self.id.clone());
        let pdf_url = self
            .pdf_url
            .unwrap_or_else(|| html_url.replace("/abs/", "/pdf/"));

        let mut paper = PaperRef::new(id, collapse_whitespace(&self.title), pdf_url)
            .with_authors(self.authors)
            .with_url(html_url);
        if !self.summary.trim().is_empty() {
            paper = paper.with_abstract(collapse_whitespace(&self.summary));
        }
        if let Ok(published) = DateTime::parse_from_rfc3339(self.published.trim()) {
            paper = paper.with_published(published.date_naive());
        }
        Ok(paper)
    }
}

/// 解析 arXiv Atom feed
pub fn parse_atom_feed(xml: &str) -> Result<Vec<PaperRef>, SearchError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut papers = Vec::new();
    let mut entry: Option<EntryBuilder> = None;
    let mut field: Option<Field> = None;
    let mut saw_feed = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"feed" => saw_feed = true,
                b"entry" => entry = Some(EntryBuilder::default()),
                b"link" => {
                    if let Some(entry) = entry.as_mut() {
                        entry.apply_link(&e);
                    }
                }
                name if entry.is_some() => {
                    field = match name {
                        b"id" => Some(Field::Id),
                        b"title" => Some(Field::Title),
                        b"summary" => Some(Field::Summary),
                        b"published" => Some(Field::Published),
                        b"name" => Some(Field::AuthorName),
                        _ => None,
                    };
                }
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"link" {
                    if let Some(entry) = entry.as_mut() {
                        entry.apply_link(&e);
                    }
                }
            }
            Ok(Event::Text(t)) => {
                if let (Some(entry), Some(field)) = (entry.as_mut(), field) {
                    let text = t
                        .unescape()
                        .map_err(|e| SearchError::Malformed(e.to_string()))?;
                    match field {
                        Field::Id => entry.id.push_str(&text),
                        Field::Title => entry.title.push_str(&text),
                        Field::Summary => entry.summary.push_str(&text),
                        Field::Published => entry.published.push_str(&text),
                        Field::AuthorName => entry.authors.push(collapse_whitespace(&text)),
                    }
                }
            }
            Ok(Event::End(e)) => {
                if e.local_name().as_ref() == b"entry" {
                    if let Some(finished) = entry.take() {
                        papers.push(finished.build()?);
                    }
                }
                field = None;
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(SearchError::Malformed(format!(
                    "位置 {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    if !saw_feed {
        return Err(SearchError::Malformed("缺少 <feed> 根元素".to_string()));
    }

    Ok(papers)
}
