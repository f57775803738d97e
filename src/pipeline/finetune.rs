use std::io::{BufRead, Write};

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::entities::ArticleRecord;
use crate::generation::Message;
use crate::pipeline::errors::PipelineError;

pub const DEFAULT_FINETUNE_OUTPUT: &str = "data/finetuning_data/training_corpus.jsonl";

const SYSTEM_PROMPT: &str =
    "あなたは、筆者の個人的な視点と文体を強く反映した映画レビューを書くアシスタントです。";

/// One chat-format training example.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FineTuneExample {
    pub messages: Vec<Message>,
}

impl FineTuneExample {
    /// `None` when the article lacks a title or body.
    pub fn from_article(article: &ArticleRecord) -> Option<Self> {
        let title = article.title_str().filter(|t| !t.is_empty())?;
        let text = article.text_str().filter(|t| !t.is_empty())?;

        Some(Self {
            messages: vec![
                Message::system(SYSTEM_PROMPT),
                Message::user(format!(
                    "映画「{title}」についてのブログ記事を、私のスタイルで執筆してください。"
                )),
                Message::assistant(text.trim()),
            ],
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FineTuneStats {
    pub written: usize,
    pub skipped: usize,
}

/// Packages cleaned articles as chat-format training examples.
#[instrument(skip_all)]
pub fn build_finetune_corpus<R: BufRead, W: Write>(
    input: R,
    mut output: W,
) -> Result<FineTuneStats, PipelineError> {
    let mut stats = FineTuneStats::default();

    for (index, line) in input.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let article: ArticleRecord = match serde_json::from_str(&line) {
            Ok(article) => article,
            Err(e) => {
                warn!(line = index + 1, error = %e, "skipping malformed record");
                stats.skipped += 1;
                continue;
            }
        };

        let Some(example) = FineTuneExample::from_article(&article) else {
            warn!(line = index + 1, id = %article.id, "skipping record without title or text");
            stats.skipped += 1;
            continue;
        };

        serde_json::to_writer(&mut output, &example)?;
        output.write_all(b"\n")?;
        stats.written += 1;
    }
    output.flush()?;

    info!(written = stats.written, skipped = stats.skipped, "fine-tuning corpus built");
    Ok(stats)
}
