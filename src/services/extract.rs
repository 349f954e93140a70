//! PDF 文本提取
//!
//! `pdf-extract` 是同步且 CPU 密集的，放在 blocking 线程池中执行。

use tracing::debug;

use crate::error::SummarizeError;

/// 从 PDF 字节中提取文本，规整空白并截断到 `max_chars` 个字符
pub async fn extract_text(bytes: Vec<u8>, max_chars: usize) -> Result<String, SummarizeError> {
    let raw = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| SummarizeError::extraction(format!("提取线程异常: {}", e)))?
        .map_err(|e| SummarizeError::extraction(format!("无法解析 PDF: {}", e)))?;

    let text = normalize_text(&raw, max_chars);
    if text.is_empty() {
        // 扫描件或加密 PDF
        return Err(SummarizeError::extraction("PDF 中没有可读取的文本"));
    }

    debug!("提取文本 {} 字符", text.chars().count());
    Ok(text)
}

/// 合并每行内的多余空白、去掉空行，最多保留 `max_chars` 个字符
pub fn normalize_text(raw: &str, max_chars: usize) -> String {
    let joined = raw
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    match joined.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => joined[..byte_idx].to_string(),
        None => joined,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FailureKind;

    #[test]
    fn test_normalize_collapses_whitespace() {
        let raw = "  Title   of\tpaper \n\n\n  Abstract   text  \n";
        assert_eq!(normalize_text(raw, 1000), "Title of paper\nAbstract text");
    }

    #[test]
    fn test_normalize_truncates_on_char_boundary() {
        assert_eq!(normalize_text("量子计算", 2), "量子");
        assert_eq!(normalize_text("abc", 3), "abc");
        assert_eq!(normalize_text("   ", 10), "");
    }

    #[tokio::test]
    async fn test_extract_garbage_is_extraction_failure() {
        let err = extract_text(b"%PDF-1.4 not really".to_vec(), 1000)
            .await
            .unwrap_err();
        assert_eq!(err.kind, FailureKind::ExtractionFailed);
    }
}
