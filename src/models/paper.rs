use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 一篇被检索到的论文
///
/// 由搜索客户端创建，之后只读。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperRef {
    /// 数据库中的稳定标识（arXiv id，不含版本号）
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    /// 原始摘要，摘要生成失败时作为兜底展示
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
    /// PDF 位置（URL 或本地路径）
    pub pdf_url: String,
    /// 论文页面链接
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub published: Option<NaiveDate>,
}

impl PaperRef {
    pub fn new(id: impl Into<String>, title: impl Into<String>, pdf_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            authors: Vec::new(),
            abstract_text: None,
            pdf_url: pdf_url.into(),
            url: None,
            published: None,
        }
    }

    pub fn with_authors(mut self, authors: Vec<String>) -> Self {
        self.authors = authors;
        self
    }

    pub fn with_abstract(mut self, abstract_text: impl Into<String>) -> Self {
        self.abstract_text = Some(abstract_text.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_published(mut self, published: NaiveDate) -> Self {
        self.published = Some(published);
        self
    }
}

impl std::fmt::Display for PaperRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let title_preview = crate::utils::logging::truncate_text(&self.title, 60);
        write!(f, "{} ({})", title_preview, self.id)
    }
}
