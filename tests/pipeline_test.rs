use std::sync::Arc;
use std::time::{Duration, Instant};

use paper_scout::error::PipelineError;
use paper_scout::models::{FailureKind, SummaryOutcome};
use paper_scout::orchestrator::{Pipeline, PipelineOptions};
use paper_scout::policy::{ExponentialBackoff, RetryPolicy};
use paper_scout::testing::{sample_papers, MockSearch, MockSummarizer};
use paper_scout::utils::logging;
use paper_scout::SummarizeError;
use tokio_util::sync::CancellationToken;

fn options(max_results: usize, concurrency: usize) -> PipelineOptions {
    PipelineOptions::default()
        .with_max_results(max_results)
        .with_concurrency(concurrency)
        .with_timeout(Duration::from_secs(5))
        .with_retry(RetryPolicy::immediate(3))
}

fn pipeline(search: &Arc<MockSearch>, summarizer: &Arc<MockSummarizer>) -> Pipeline {
    Pipeline::new(search.clone(), summarizer.clone())
}

fn ids(outcomes: &[SummaryOutcome]) -> Vec<String> {
    outcomes.iter().map(|o| o.paper().id.clone()).collect()
}

#[tokio::test]
async fn test_outcomes_follow_search_order() {
    logging::init();

    // 先提交的论文最慢完成
    let search = Arc::new(MockSearch::new(sample_papers(5)));
    let summarizer = Arc::new(
        MockSummarizer::new()
            .with_delay_for("p1", Duration::from_millis(120))
            .with_delay_for("p2", Duration::from_millis(80))
            .with_delay_for("p3", Duration::from_millis(40)),
    );

    let report = pipeline(&search, &summarizer)
        .run("graph neural networks", &options(5, 5))
        .await
        .unwrap();

    assert_eq!(ids(&report.outcomes), vec!["p1", "p2", "p3", "p4", "p5"]);
    assert_eq!(report.counts.requested, 5);
    assert_eq!(report.counts.succeeded, 5);
    assert_eq!(report.topic, "graph neural networks");
}

#[tokio::test]
async fn test_concurrency_is_bounded() {
    let search = Arc::new(MockSearch::new(sample_papers(8)));
    let summarizer = Arc::new(MockSummarizer::new().with_delay(Duration::from_millis(30)));

    let report = pipeline(&search, &summarizer)
        .run("diffusion models", &options(8, 2))
        .await
        .unwrap();

    assert_eq!(report.outcomes.len(), 8);
    assert!(summarizer.max_in_flight() <= 2, "max in flight: {}", summarizer.max_in_flight());
    assert!(summarizer.max_in_flight() >= 1);
}

#[tokio::test]
async fn test_max_results_limits_papers() {
    let search = Arc::new(MockSearch::new(sample_papers(10)));
    let summarizer = Arc::new(MockSummarizer::new());

    let report = pipeline(&search, &summarizer)
        .run("reinforcement learning", &options(3, 2))
        .await
        .unwrap();

    assert_eq!(report.counts.requested, 3);
    assert_eq!(summarizer.total_calls(), 3);
}

#[tokio::test]
async fn test_transient_failure_is_retried_until_success() {
    let search = Arc::new(MockSearch::new(sample_papers(1)));
    let summarizer = Arc::new(
        MockSummarizer::new()
            .fail_times("p1", SummarizeError::rate_limited("429 Too Many Requests"), 2)
            .with_summary("p1", "A concise summary."),
    );

    let report = pipeline(&search, &summarizer)
        .run("llm agents", &options(1, 1))
        .await
        .unwrap();

    match &report.outcomes[0] {
        SummaryOutcome::Success { summary, attempts, .. } => {
            assert_eq!(summary, "A concise summary.");
            assert_eq!(*attempts, 3);
        }
        other => panic!("expected success, got {:?}", other),
    }
    assert_eq!(summarizer.call_count("p1"), 3);
}

#[tokio::test]
async fn test_exhausted_retries_report_last_kind() {
    let search = Arc::new(MockSearch::new(sample_papers(1)));
    let summarizer = Arc::new(
        MockSummarizer::new().fail_always("p1", SummarizeError::download("HTTP 503")),
    );

    let report = pipeline(&search, &summarizer)
        .run("llm agents", &options(1, 1))
        .await
        .unwrap();

    let outcome = &report.outcomes[0];
    assert_eq!(outcome.failure_kind(), Some(FailureKind::DownloadFailed));
    assert_eq!(outcome.attempts(), 3);
    assert_eq!(summarizer.call_count("p1"), 3);
    assert_eq!(report.counts.failed, 1);
}

#[tokio::test]
async fn test_refusal_is_not_retried() {
    let search = Arc::new(MockSearch::new(sample_papers(1)));
    let summarizer = Arc::new(
        MockSummarizer::new().fail_always("p1", SummarizeError::refused("content_policy")),
    );

    let report = pipeline(&search, &summarizer)
        .run("llm agents", &options(1, 1))
        .await
        .unwrap();

    assert_eq!(report.outcomes[0].failure_kind(), Some(FailureKind::LlmRefused));
    assert_eq!(summarizer.call_count("p1"), 1);
}

#[tokio::test]
async fn test_slow_paper_times_out_without_blocking_others() {
    let search = Arc::new(MockSearch::new(sample_papers(3)));
    let summarizer =
        Arc::new(MockSummarizer::new().with_delay_for("p2", Duration::from_secs(5)));

    let opts = options(3, 3).with_timeout(Duration::from_millis(100));
    let started = Instant::now();
    let report = pipeline(&search, &summarizer)
        .run("protein folding", &opts)
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(3));
    assert!(report.outcomes[0].is_success());
    assert_eq!(report.outcomes[1].failure_kind(), Some(FailureKind::Timeout));
    assert_eq!(report.outcomes[1].attempts(), 1);
    assert!(report.outcomes[2].is_success());
    assert_eq!(summarizer.call_count("p2"), 1);
}

#[tokio::test]
async fn test_partial_failure_keeps_position() {
    let search = Arc::new(MockSearch::new(sample_papers(3)));
    let summarizer = Arc::new(
        MockSummarizer::new().fail_always("p2", SummarizeError::extraction("no text layer")),
    );

    let report = pipeline(&search, &summarizer)
        .run("quantum error correction", &options(3, 2))
        .await
        .unwrap();

    assert_eq!(ids(&report.outcomes), vec!["p1", "p2", "p3"]);
    assert_eq!(report.counts.requested, 3);
    assert_eq!(report.counts.succeeded, 2);
    assert_eq!(report.counts.failed, 1);
    match &report.outcomes[1] {
        SummaryOutcome::Failure { kind, message, .. } => {
            assert_eq!(*kind, FailureKind::ExtractionFailed);
            assert_eq!(message, "no text layer");
        }
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_blank_topic_is_rejected_before_search() {
    let search = Arc::new(MockSearch::new(sample_papers(3)));
    let summarizer = Arc::new(MockSummarizer::new());
    let pipeline = pipeline(&search, &summarizer);

    for topic in ["", "   \t"] {
        let err = pipeline.run(topic, &options(3, 1)).await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(_)));
    }
    assert_eq!(search.call_count(), 0);
}

#[tokio::test]
async fn test_invalid_options_are_rejected() {
    let search = Arc::new(MockSearch::new(sample_papers(3)));
    let summarizer = Arc::new(MockSummarizer::new());

    let err = pipeline(&search, &summarizer)
        .run("topic", &options(3, 0))
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::InvalidInput(_)));
    assert_eq!(search.call_count(), 0);
}

#[tokio::test]
async fn test_search_failure_aborts_run() {
    let search = Arc::new(MockSearch::failing(503));
    let summarizer = Arc::new(MockSummarizer::new());

    let err = pipeline(&search, &summarizer)
        .run("topic", &options(3, 1))
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::SearchUnavailable(_)));
    assert_eq!(summarizer.total_calls(), 0);
}

#[tokio::test]
async fn test_no_results_gives_empty_report() {
    let search = Arc::new(MockSearch::empty());
    let summarizer = Arc::new(MockSummarizer::new());

    let report = pipeline(&search, &summarizer)
        .run("a topic nobody studies", &options(3, 1))
        .await
        .unwrap();

    assert!(report.is_empty());
    assert_eq!(report.counts.requested, 0);
    assert_eq!(summarizer.total_calls(), 0);
}

#[tokio::test]
async fn test_cancel_settles_every_paper() {
    let search = Arc::new(MockSearch::new(sample_papers(3)));
    let summarizer = Arc::new(MockSummarizer::new().with_delay(Duration::from_secs(10)));

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            cancel.cancel();
        });
    }

    let started = Instant::now();
    let report = pipeline(&search, &summarizer)
        .run_with_cancel("topic", &options(3, 1), cancel)
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(ids(&report.outcomes), vec!["p1", "p2", "p3"]);
    for outcome in &report.outcomes {
        assert_eq!(outcome.failure_kind(), Some(FailureKind::Cancelled));
    }
    // 只有第一篇拿到了并发槽位
    assert_eq!(report.outcomes[0].attempts(), 1);
    assert_eq!(report.outcomes[1].attempts(), 0);
    assert_eq!(summarizer.total_calls(), 1);
}

#[tokio::test]
async fn test_cancel_before_search() {
    let search = Arc::new(MockSearch::new(sample_papers(3)).with_delay(Duration::from_secs(10)));
    let summarizer = Arc::new(MockSummarizer::new());

    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = pipeline(&search, &summarizer)
        .run_with_cancel("topic", &options(3, 1), cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Cancelled));
    assert_eq!(summarizer.total_calls(), 0);
}

#[tokio::test]
async fn test_quantum_computing_scenario() {
    let search = Arc::new(MockSearch::new(sample_papers(3)));
    let summarizer = Arc::new(
        MockSummarizer::new().fail_always("p2", SummarizeError::download("HTTP 404")),
    );

    let report = pipeline(&search, &summarizer)
        .run("quantum computing", &options(3, 2))
        .await
        .unwrap();

    assert!(report.outcomes[0].is_success());
    assert_eq!(report.outcomes[1].failure_kind(), Some(FailureKind::DownloadFailed));
    assert_eq!(report.outcomes[1].attempts(), 3);
    assert!(report.outcomes[2].is_success());
    assert_eq!(
        (report.counts.requested, report.counts.succeeded, report.counts.failed),
        (3, 2, 1)
    );
    assert_eq!(search.call_count(), 1);
}

#[tokio::test]
async fn test_abandoned_run_stops_queued_papers() {
    let search = Arc::new(MockSearch::new(sample_papers(6)));
    let summarizer = Arc::new(MockSummarizer::new().with_delay(Duration::from_millis(100)));
    let pipeline = pipeline(&search, &summarizer);

    // 调用方先放弃：run 的 future 被丢弃
    let opts = options(6, 1);
    let abandoned =
        tokio::time::timeout(Duration::from_millis(50), pipeline.run("topic", &opts)).await;
    assert!(abandoned.is_err());
    let calls_at_abort = summarizer.total_calls();

    tokio::time::sleep(Duration::from_millis(800)).await;

    assert_eq!(calls_at_abort, 1);
    assert_eq!(summarizer.total_calls(), calls_at_abort);
    assert_eq!(summarizer.max_in_flight(), 1);
}

#[tokio::test]
async fn test_topic_is_passed_to_search_verbatim() {
    let search = Arc::new(MockSearch::new(sample_papers(1)));
    let summarizer = Arc::new(MockSummarizer::new());

    let report = pipeline(&search, &summarizer)
        .run("  ti:transformer AND cat:cs.CL ", &options(1, 1))
        .await
        .unwrap();

    assert_eq!(search.topics(), vec!["  ti:transformer AND cat:cs.CL ".to_string()]);
    assert_eq!(report.topic, "  ti:transformer AND cat:cs.CL ");
}

#[tokio::test]
async fn test_duplicate_papers_keep_their_own_slots() {
    let papers = sample_papers(2);
    let search = Arc::new(MockSearch::new(vec![
        papers[0].clone(),
        papers[0].clone(),
        papers[1].clone(),
    ]));
    let summarizer = Arc::new(MockSummarizer::new());

    let report = pipeline(&search, &summarizer)
        .run("topic", &options(3, 2))
        .await
        .unwrap();

    assert_eq!(ids(&report.outcomes), vec!["p1", "p1", "p2"]);
    assert_eq!(report.counts.requested, 3);
    assert_eq!(report.counts.succeeded, 3);
    assert_eq!(summarizer.call_count("p1"), 2);
}

#[tokio::test]
async fn test_cancel_during_backoff() {
    let search = Arc::new(MockSearch::new(sample_papers(1)));
    let summarizer = Arc::new(
        MockSummarizer::new().fail_always("p1", SummarizeError::rate_limited("429")),
    );
    let retry = RetryPolicy::new(
        3,
        ExponentialBackoff::new(Duration::from_secs(30)).without_jitter(),
    );
    let opts = options(1, 1).with_retry(retry);

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            cancel.cancel();
        });
    }

    let started = Instant::now();
    let report = pipeline(&search, &summarizer)
        .run_with_cancel("topic", &opts, cancel)
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(report.outcomes[0].failure_kind(), Some(FailureKind::Cancelled));
    assert_eq!(report.outcomes[0].attempts(), 1);
    assert_eq!(summarizer.call_count("p1"), 1);
}
