use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use postclean::cleaner::Cleaner;
use postclean::config::Config;
use postclean::generation::{
    GenerationError, GenerationParams, Message, RefineOptions, TextGenerator, refine_jsonl,
};
use serde_json::Value;

/// Echoes the title back and tracks how many calls overlap.
struct RecordingGenerator {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl RecordingGenerator {
    fn new() -> Self {
        Self {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl TextGenerator for RecordingGenerator {
    async fn generate(
        &self,
        messages: &[Message],
        params: &GenerationParams,
    ) -> Result<String, GenerationError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if messages[1].content.contains("失敗") {
            return Err(GenerationError::Backend("quota exceeded".to_string()));
        }
        Ok(format!("# 導入\n{} で生成", params.model))
    }
}

#[tokio::test]
async fn test_refine_jsonl_end_to_end() {
    let input = [
        r#"{"id":"1","title":"映画「君の名は。」","text":"本文","category":"映画","post_date":"2023-01-01"}"#,
        r#"{"id":"2","title":"天気の子","text":"失敗する記事","category":"映画","post_date":"2023-01-02"}"#,
        "broken",
        r#"{"id":"3","title":"すずめの戸締まり","text":"本文3","category":"映画","post_date":"2023-01-03"}"#,
        r#"{"id":"4","title":"言の葉の庭","text":"本文4","category":"映画","post_date":"2023-01-04"}"#,
    ]
    .join("\n");

    let config = Config::default()
        .with_finetuned_model("ft:gpt-3.5-turbo:blog")
        .with_mention_handle("blog_author");
    let mut options = RefineOptions::from_config(&config, &Cleaner::default()).unwrap();
    options.concurrency = 2;

    let generator = Arc::new(RecordingGenerator::new());
    let mut out = Vec::new();
    let stats = refine_jsonl(
        input.as_bytes(),
        &mut out,
        Arc::clone(&generator),
        Arc::new(options),
    )
    .await
    .unwrap();

    assert_eq!(stats.written, 4);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.skipped, 1);
    assert!(generator.peak.load(Ordering::SeqCst) <= 2);

    let records: Vec<Value> = String::from_utf8(out)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    let ids: Vec<&str> = records.iter().map(|r| r["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["1", "2", "3", "4"]);

    assert_eq!(records[0]["title"], "「君の名は。」");
    assert_eq!(records[0]["text"], "# 導入\nft:gpt-3.5-turbo:blog で生成");
    assert_eq!(records[0]["post_date"], "2023-01-01");
    assert!(records[0].get("error").is_none());

    assert_eq!(records[1]["error"], "generation backend error: quota exceeded");
    assert!(
        records[1]["text"]
            .as_str()
            .unwrap()
            .ends_with("元のテキスト:\n失敗する記事")
    );
}
