use std::fs;

use serde_json::json;

use crate::cleaner::{Cleaner, CleanerError, HtmlExtractor, RuleSet};
use crate::config::Config;

#[test]
fn test_clean_post_fixture() {
    let html = fs::read_to_string("src/cleaner/tests/fixtures/post.html")
        .expect("Failed to read test fixture");

    let text = Cleaner::default().clean_html(&html);

    assert_eq!(
        text,
        "『君の名は。』を観てきました。\n\n\
         映像が とにかく美しい。\n音楽も良かった。\n\n\
         キャスト\n\n\
         神木隆之介\n上白石萌音\n\n\
         感想は @blog_author までどうぞ。"
    );
    assert!(!text.contains("amazon"));
    assert!(!text.contains("caption"));
    assert!(!text.contains("tracking"));
}

#[test]
fn test_tags_removed_paragraphs_joined() {
    let cleaner = Cleaner::default();
    let text = cleaner.clean_html("<p>これは<b>最初の</b>記事です。</p>\n\n<p>追加テキスト</p>");
    assert_eq!(text, "これは最初の記事です。\n\n追加テキスト");
}

#[test]
fn test_blank_line_between_inline_elements_kept() {
    let cleaner = Cleaner::default();
    let text = cleaner.clean_html("<strong>見出し</strong>\n\n<a href=\"/x\">本文リンク</a>");
    assert_eq!(text, "見出し\n\n本文リンク");
    assert_eq!(cleaner.clean_text(&text), text);
}

#[test]
fn test_affiliate_paragraph_absent() {
    let cleaner = Cleaner::default();
    let text = "最初の段落です。\n\n\
                この商品がおすすめです。\nhttps://www.amazon.co.jp/dp/XXXXX\nぜひどうぞ。\n\n\
                最後の段落です。";
    assert_eq!(cleaner.clean_text(text), "最初の段落です。\n\n最後の段落です。");
}

#[test]
fn test_blank_run_collapsed() {
    assert_eq!(Cleaner::default().clean_text("Line1\n\n\n\nLine2"), "Line1\n\nLine2");
}

#[test]
fn test_non_string_values_become_empty() {
    let cleaner = Cleaner::default();
    assert_eq!(cleaner.clean_value(None), "");
    assert_eq!(cleaner.clean_value(Some(&json!(null))), "");
    assert_eq!(cleaner.clean_value(Some(&json!(42))), "");
    assert_eq!(cleaner.clean_value(Some(&json!(["a"]))), "");
    assert_eq!(cleaner.clean_value(Some(&json!("  a  \n\n\n b"))), "a\n\nb");
}

#[test]
fn test_html_and_text_entry_points_agree() {
    let cleaner = Cleaner::default();
    let from_html = cleaner.clean_html("<p>一行目</p><p>二行目<br>三行目</p>");
    let from_text = cleaner.clean_text("一行目\n\n二行目\n三行目");
    assert_eq!(from_html, from_text);
}

#[test]
fn test_output_is_stable_under_recleaning() {
    let cleaner = Cleaner::default();
    let html = fs::read_to_string("src/cleaner/tests/fixtures/post.html")
        .expect("Failed to read test fixture");
    let once = cleaner.clean_html(&html);
    assert_eq!(cleaner.clean_text(&once), once);
}

#[test]
fn test_from_config_defaults_match_default() {
    let cleaner = Cleaner::from_config(&Config::default()).unwrap();
    assert_eq!(cleaner.rules().len(), RuleSet::standard().len());
    let html = "<p>a</p><div class=\"hatena-asin-detail\">ad</div><p>b</p>";
    assert_eq!(cleaner.clean_html(html), Cleaner::default().clean_html(html));
}

#[test]
fn test_from_config_strip_all_shortcodes() {
    let config = Config::default().with_strip_all_shortcodes(true);
    let cleaner = Cleaner::from_config(&config).unwrap();
    assert_eq!(cleaner.clean_text("a [gallery ids=\"1\"] b"), "a  b");
}

#[test]
fn test_from_config_specific_handle() {
    let config = Config::default().with_mention_handle("blog_author");
    let cleaner = Cleaner::from_config(&config).unwrap();
    let text = cleaner.clean_html("<p>by</p><p>@someone</p><p>and</p><p>@blog_author</p><p>end</p>");
    assert_eq!(text, "by\n\n@someone\n\nand @blog_author end");
}

#[test]
fn test_from_config_rules_file() {
    let path = std::env::temp_dir().join(format!("postclean-rules-{}.json", std::process::id()));
    fs::write(
        &path,
        r#"[{"name": "rakuten", "kind": "reject_paragraph", "pattern": "rakuten\\.co\\.jp"}]"#,
    )
    .unwrap();

    let cleaner = Cleaner::from_config(&Config::default().with_rules_file(&path)).unwrap();
    assert_eq!(
        cleaner.clean_text("keep\n\nhttps://item.rakuten.co.jp/x\n\nkeep too"),
        "keep\n\nkeep too"
    );
    fs::remove_file(&path).unwrap();
}

#[test]
fn test_from_config_missing_rules_file() {
    let config = Config::default().with_rules_file("/nonexistent/postclean/rules.json");
    let err = Cleaner::from_config(&config).unwrap_err();
    assert!(matches!(err, CleanerError::RulesFile { .. }));
}

#[test]
fn test_injected_rules_replace_standard_ones() {
    let cleaner = Cleaner::new(RuleSet::default(), HtmlExtractor::default());
    let text = "intro\n\nhttps://www.amazon.co.jp/dp/B0\n\n[caption]x[/caption]";
    assert_eq!(cleaner.clean_text(text), text);
}

#[test]
fn test_editorial_rules_extend_cleaner_rules() {
    let cleaner = Cleaner::default();
    let rules = cleaner.editorial_rules(None).unwrap();
    assert!(rules.len() > cleaner.rules().len());
    let text = crate::cleaner::normalize("本文\n\n目次\n\n1. a\n\n結論", &rules);
    assert_eq!(text, "本文\n\n結論");
}

#[cfg(feature = "fuzz")]
mod fuzz {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn captions_never_survive(
            before in "[a-zあ-ん ]{0,20}",
            inner in "[a-z<>=\" ]{0,15}(\n[a-z][a-z<>=\" ]{0,10})?",
            after in "[a-zあ-ん ]{0,20}",
        ) {
            let cleaner = Cleaner::default();
            let text = format!("{before}[caption id=\"1\"]{inner}[/caption]{after}");
            let out = cleaner.clean_text(&text);
            prop_assert!(!out.contains("[caption"));
            prop_assert!(!out.contains("[/caption]"));
        }

        #[test]
        fn html_never_panics(html in "(<[a-z]{1,3}>|</[a-z]{1,3}>|[a-z \n]{0,8}|<!--|-->){0,30}") {
            let cleaner = Cleaner::default();
            let out = cleaner.clean_html(&html);
            prop_assert!(!out.contains("\n\n\n"));
        }
    }
}
