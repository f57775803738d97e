//! The rewrite pass: editorial pre-cleaning, prompt assembly and bounded
//! concurrent calls to a [`TextGenerator`].

use std::io::{BufRead, Write};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, instrument, warn};

use crate::cleaner::{Cleaner, CleanerError, RuleSet, normalize};
use crate::config::Config;
use crate::entities::{ArticleRecord, RefinedRecord};
use crate::generation::{GenerationError, GenerationParams, Message, TextGenerator};
use crate::pipeline::PipelineError;

const TITLE_NOISE: &str = "映画";
const TITLE_BRACKETS: [char; 4] = ['「', '」', '【', '】'];

#[derive(Debug, Clone)]
pub struct RefineOptions {
    pub params: GenerationParams,
    /// Rules run over the article text before it is sent.
    pub rules: RuleSet,
    pub concurrency: usize,
}

impl RefineOptions {
    pub fn from_config(config: &Config, cleaner: &Cleaner) -> Result<Self, CleanerError> {
        Ok(Self {
            params: GenerationParams::for_refinement(config.model()),
            rules: cleaner.editorial_rules(config.mention_handle())?,
            concurrency: config.generation_concurrency(),
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefineStats {
    pub written: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Rewrites one article. A failed call never propagates: the record keeps
/// the pre-cleaned text behind an error notice and carries `error`.
pub async fn refine_article<G>(
    generator: &G,
    article: &ArticleRecord,
    options: &RefineOptions,
) -> RefinedRecord
where
    G: TextGenerator + ?Sized,
{
    let (title, prompt_title) = prepare_title(article.title_str().unwrap_or_default());
    let text = normalize(article.text_str().unwrap_or_default(), &options.rules);

    let messages = [
        Message::system(system_prompt(&prompt_title)),
        Message::user(user_prompt(&prompt_title, &text)),
    ];

    let outcome = match generator.generate(&messages, &options.params).await {
        Ok(generated) if generated.trim().is_empty() => Err(GenerationError::EmptyCompletion),
        Ok(generated) => Ok(generated.trim().to_string()),
        Err(e) => Err(e),
    };

    match outcome {
        Ok(generated) => RefinedRecord {
            id: article.id.clone(),
            title,
            text: generated,
            extra: article.extra.clone(),
            error: None,
        },
        Err(e) => {
            warn!(id = %article.id, title = %prompt_title, error = %e, "generation failed");
            failed_record(article, title, &text, &e)
        }
    }
}

/// Refines every article with at most `options.concurrency` calls in flight.
/// Output order matches input order.
#[instrument(skip_all, fields(articles = articles.len()))]
pub async fn refine_all<G>(
    generator: Arc<G>,
    articles: Vec<ArticleRecord>,
    options: Arc<RefineOptions>,
) -> Vec<RefinedRecord>
where
    G: TextGenerator + ?Sized + 'static,
{
    let semaphore = Arc::new(Semaphore::new(options.concurrency.max(1)));
    let mut tasks = JoinSet::new();

    for (index, article) in articles.iter().cloned().enumerate() {
        let generator = Arc::clone(&generator);
        let options = Arc::clone(&options);
        let semaphore = Arc::clone(&semaphore);
        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok();
            let record = refine_article(generator.as_ref(), &article, &options).await;
            (index, record)
        });
    }

    let mut slots: Vec<Option<RefinedRecord>> = vec![None; articles.len()];
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, record)) => slots[index] = Some(record),
            Err(e) => error!(error = %e, "refine task did not complete"),
        }
    }

    slots
        .into_iter()
        .zip(&articles)
        .map(|(slot, article)| {
            slot.unwrap_or_else(|| {
                let (title, _) = prepare_title(article.title_str().unwrap_or_default());
                let text = normalize(article.text_str().unwrap_or_default(), &options.rules);
                let e = GenerationError::Task("task aborted".to_string());
                failed_record(article, title, &text, &e)
            })
        })
        .collect()
}

/// Reads JSONL articles, refines them and writes one refined record per line.
#[instrument(skip_all)]
pub async fn refine_jsonl<R, W, G>(
    input: R,
    mut output: W,
    generator: Arc<G>,
    options: Arc<RefineOptions>,
) -> Result<RefineStats, PipelineError>
where
    R: BufRead,
    W: Write,
    G: TextGenerator + ?Sized + 'static,
{
    let mut stats = RefineStats::default();
    let mut articles = Vec::new();

    for (index, line) in input.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<ArticleRecord>(&line) {
            Ok(article) => articles.push(article),
            Err(e) => {
                warn!(line = index + 1, error = %e, "skipping malformed record");
                stats.skipped += 1;
            }
        }
    }

    for record in refine_all(generator, articles, options).await {
        if record.error.is_some() {
            stats.failed += 1;
        }
        serde_json::to_writer(&mut output, &record)?;
        output.write_all(b"\n")?;
        stats.written += 1;
    }
    output.flush()?;

    info!(
        written = stats.written,
        failed = stats.failed,
        skipped = stats.skipped,
        "refine pass finished"
    );
    Ok(stats)
}

/// Record title without the word 映画, and the prompt title additionally
/// without brackets.
fn prepare_title(title: &str) -> (String, String) {
    let title = title.replace(TITLE_NOISE, "").trim().to_string();
    let prompt_title = title.chars().filter(|c| !TITLE_BRACKETS.contains(c)).collect();
    (title, prompt_title)
}

fn failed_record(
    article: &ArticleRecord,
    title: String,
    text: &str,
    e: &GenerationError,
) -> RefinedRecord {
    RefinedRecord {
        id: article.id.clone(),
        title,
        text: format!("エラー: AIによる処理に失敗しました。詳細: {e}\n\n元のテキスト:\n{text}"),
        extra: article.extra.clone(),
        error: Some(e.to_string()),
    }
}

fn system_prompt(title: &str) -> String {
    format!(
        "あなたはプロの映画ブログ編集者です。提供された映画レビューのテキストを以下の指示に従って編集し、指定された6部構成に再編してください。

**編集指示:**
1. **冗長性の排除:** テキスト全体を読みやすく、自然な流れにしてください。特に映画のタイトル「{title}」の過度な繰り返しや、その他冗長な表現を減らしてください。
2. **文体維持:** 元の記事の文体、トーン、筆者の個人的な視点や口調は最大限維持してください。
3. **不要情報の削除:** 記事の本筋と関係の薄い情報（例: 外部リンク、商品紹介、他の記事への誘導、SNSの埋め込みや言及など）は削除してください。ただし、映画の評価に直接関わる引用は残しても構いません。

**再構成指示:**
編集後のテキストを、以下の6つのセクションに沿って再編成してください。各セクション見出しは `# セクション名` の形式で記述してください。

1. `# 導入`
2. `# 予告編とあらすじ`
3. `# 出演者・スタッフ情報`
4. `# 感想レビュー`
5. `# メインキャスト紹介`
6. `# まとめ`

**重要な注意点:**
* 各セクションには、元のテキストに含まれる情報のみを使用してください。
* 不足している情報を新たに追加したり、内容を創作したりしないでください。
* 該当する情報がほとんどないセクションは簡潔にするか、「このセクションに該当する情報は元のテキストにありませんでした。」と記述してください。
* 最終出力は、上記6部構成のマークダウン形式のみとしてください。"
    )
}

fn user_prompt(title: &str, text: &str) -> String {
    format!(
        "以下の映画レビューテキストを編集し、6部構成に再構成してください。

元のタイトル（参考情報、出力に含めない）: {title}
元のテキスト:
{text}

編集・再構成された記事:
"
    )
}
