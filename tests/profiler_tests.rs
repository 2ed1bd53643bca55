use crawltally::*;
use std::sync::Arc;
use std::time::Duration;

const PARSE: MethodId = MethodId {
    interface: "PageSource",
    method: "parse",
};

/// Source with a fixed per-call delay, optionally failing every call
struct SlowSource {
    delay: Duration,
    fail: bool,
}

impl SlowSource {
    fn new(delay: Duration) -> Self {
        Self { delay, fail: false }
    }

    fn failing(delay: Duration) -> Self {
        Self { delay, fail: true }
    }
}

#[async_trait::async_trait]
impl PageSource for SlowSource {
    async fn parse(&self, _url: &str) -> Result<PageResult, SourceError> {
        tokio::time::sleep(self.delay).await;
        if self.fail {
            return Err(SourceError::other("boom"));
        }
        Ok(PageResult::new(
            [("word".to_string(), 1)].into_iter().collect(),
            vec![],
        ))
    }
}

impl Capability for SlowSource {
    const INTERFACE: &'static str = "PageSource";
    const PROFILED_METHODS: &'static [&'static str] = &["parse"];
}

/// Source whose capability interface marks nothing as profiled
struct UnprofiledSource;

#[async_trait::async_trait]
impl PageSource for UnprofiledSource {
    async fn parse(&self, _url: &str) -> Result<PageResult, SourceError> {
        Ok(PageResult::empty())
    }
}

impl Capability for UnprofiledSource {
    const INTERFACE: &'static str = "PageSource";
    const PROFILED_METHODS: &'static [&'static str] = &[];
}

#[test]
fn wrap_rejects_interface_with_no_profiled_methods() {
    let profiler = Profiler::new();
    let result = profiler.wrap(UnprofiledSource);

    // Fails synchronously at wrap time, before any call is made.
    assert!(matches!(
        result,
        Err(ProfilerError::NoProfiledMethods("PageSource"))
    ));
}

#[tokio::test]
async fn totals_accumulate_across_wrapped_instances() {
    let delay = Duration::from_millis(10);
    let profiler = Profiler::new();
    let first = profiler.wrap(SlowSource::new(delay)).unwrap();
    let second = profiler.wrap(SlowSource::new(delay)).unwrap();

    for _ in 0..2 {
        first.parse("https://a.com").await.unwrap();
        second.parse("https://b.com").await.unwrap();
    }

    // Four calls of at least 10ms each, recorded into one shared state.
    assert!(
        profiler.elapsed(PARSE) >= Duration::from_millis(40),
        "recorded only {:?}",
        profiler.elapsed(PARSE)
    );
}

#[tokio::test]
async fn failed_calls_are_still_timed_and_errors_pass_through() {
    let delay = Duration::from_millis(10);
    let profiler = Profiler::new();
    let source = profiler.wrap(SlowSource::failing(delay)).unwrap();

    let result = source.parse("https://a.com").await;
    match result {
        Err(SourceError::Other(message)) => assert_eq!(message, "boom"),
        other => panic!("expected the delegate's error, got {other:?}"),
    }

    assert!(profiler.elapsed(PARSE) >= delay);
}

#[tokio::test]
async fn return_values_pass_through_unchanged() {
    let profiler = Profiler::new();
    let source = profiler.wrap(SlowSource::new(Duration::ZERO)).unwrap();

    let page = source.parse("https://a.com").await.unwrap();
    assert_eq!(page.word_counts.get("word"), Some(&1));
    assert!(page.links.is_empty());
}

#[tokio::test]
async fn report_appends_after_existing_content() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("profile.txt");
    std::fs::write(&path, "existing content\n").unwrap();

    let profiler = Profiler::new();
    let source = profiler.wrap(SlowSource::new(Duration::ZERO)).unwrap();
    source.parse("https://a.com").await.unwrap();

    profiler.write_report_to_path(&path).unwrap();
    profiler.write_report_to_path(&path).unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.starts_with("existing content\n"));
    assert_eq!(contents.matches("Run at ").count(), 2);
    assert_eq!(contents.matches("PageSource#parse took").count(), 2);
}

#[tokio::test]
async fn report_to_path_creates_missing_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fresh.txt");

    let profiler = Profiler::new();
    profiler.write_report_to_path(&path).unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.starts_with("Run at "));
}

#[tokio::test]
async fn wrapped_source_plugs_into_the_crawler() {
    let profiler = Profiler::new();
    let source = profiler.wrap(SlowSource::new(Duration::ZERO)).unwrap();

    let crawler = Crawler::builder()
        .page_source(Arc::new(source))
        .parallelism(2)
        .build()
        .unwrap();

    let outcome = crawler
        .crawl(CrawlRequest::new("https://a.com", Duration::from_secs(5), 1))
        .await;

    assert_eq!(outcome.pages_fetched, 1);
    assert!(profiler.state().snapshot().contains_key(&PARSE));
}
