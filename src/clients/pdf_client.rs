//! PDF 下载
//!
//! 支持 http(s) 链接和本地路径（可带 `file://` 前缀）。
//! 所有失败都归为 `DownloadFailed`。

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::debug;

use crate::error::SummarizeError;

const PDF_MAGIC: &[u8] = b"%PDF";

/// PDF 下载器
#[derive(Clone)]
pub struct PdfFetcher {
    http: Client,
    max_bytes: usize,
}

impl PdfFetcher {
    pub fn new(timeout: Duration, max_bytes: usize) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .user_agent(concat!("paper-scout/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self { http, max_bytes })
    }

    /// 获取 PDF 原始字节
    pub async fn fetch(&self, location: &str) -> Result<Vec<u8>, SummarizeError> {
        let bytes = if location.starts_with("http://") || location.starts_with("https://") {
            self.fetch_remote(location).await?
        } else {
            self.fetch_local(location).await?
        };

        if !bytes.starts_with(PDF_MAGIC) {
            return Err(SummarizeError::download(format!("不是有效的 PDF: {}", location)));
        }
        Ok(bytes)
    }

    async fn fetch_remote(&self, url: &str) -> Result<Vec<u8>, SummarizeError> {
        debug!("下载 PDF: {}", url);

        let mut response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| SummarizeError::download(format!("下载失败 {}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SummarizeError::download(format!("HTTP {} ({})", status, url)));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        if let Some(len) = response.content_length() {
            self.check_size(len, url)?;
        }

        // 分块响应没有 Content-Length，边读边检查
        let mut bytes = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| SummarizeError::download(format!("读取响应失败 {}: {}", url, e)))?
        {
            self.check_size((bytes.len() + chunk.len()) as u64, url)?;
            bytes.extend_from_slice(&chunk);
        }

        // 有些镜像返回 application/octet-stream，以文件头为准
        if !content_type.contains("pdf") && !bytes.starts_with(PDF_MAGIC) {
            return Err(SummarizeError::download(format!(
                "链接不是 PDF: {} (Content-Type: {})",
                url, content_type
            )));
        }

        Ok(bytes)
    }

    async fn fetch_local(&self, location: &str) -> Result<Vec<u8>, SummarizeError> {
        let path = location.strip_prefix("file://").unwrap_or(location);
        debug!("读取本地 PDF: {}", path);

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| SummarizeError::download(format!("读取文件失败 {}: {}", path, e)))?;
        self.check_size(metadata.len(), path)?;

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| SummarizeError::download(format!("读取文件失败 {}: {}", path, e)))?;
        self.check_size(bytes.len() as u64, path)?;
        Ok(bytes)
    }

    fn check_size(&self, len: u64, location: &str) -> Result<(), SummarizeError> {
        if len > self.max_bytes as u64 {
            return Err(SummarizeError::download(format!(
                "PDF 过大: {} MB > {} MB ({})",
                len / 1024 / 1024,
                self.max_bytes / 1024 / 1024,
                location
            )));
        }
        Ok(())
    }
}
