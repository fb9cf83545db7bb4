//! Digest generation through the language model.
//!
//! The collected items are flattened into numbered lines, embedded in a fixed
//! briefing prompt, and sent in a single request. The answer is expected to be
//! an HTML fragment; the only post-processing is removing the fenced-code
//! markers models like to wrap around HTML.

use crate::api::{ApiError, AskAsync};
use crate::models::{DigestDocument, NewsItem};
use crate::utils::truncate_for_log;
use itertools::Itertools;
use thiserror::Error;
use tracing::{debug, info, instrument};

#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("nothing to summarize")]
    NoItems,

    #[error("language model call failed: {0}")]
    Api(#[from] ApiError),
}

/// Render one item as a single prompt line.
pub fn item_line(index: usize, item: &NewsItem) -> String {
    format!(
        "[{}] {} (키워드: {}) | Link: {}",
        index + 1,
        item.title,
        item.keyword,
        item.link
    )
}

/// Assemble the briefing prompt for `items`, dated `today` (e.g. `2025년 05월 06일`).
pub fn build_prompt(items: &[NewsItem], today: &str) -> String {
    let news_text = items
        .iter()
        .enumerate()
        .map(|(i, item)| item_line(i, item))
        .join("\n");

    format!(
        r#"오늘은 {today}입니다.
당신은 포스코이앤씨 구매계약실의 수석 애널리스트입니다.
아래 뉴스를 바탕으로 경영진과 실무자가 PC에서 읽기 좋은 'Daily Market & Risk Briefing' 이메일 본문을 작성하세요.

[뉴스 목록]
{news_text}

[작성 원칙]
1. 반드시 오늘 날짜({today})를 기준으로 작성하세요.
2. 건설 테마주, 주가 등락 등 주식/투자 관련 내용은 포함하지 마세요.
3. 계약, 납기, 단가, 법적 리스크 관점에서 분석하세요.

[형식]
- <html>, <head>, <body> 태그를 쓰지 말고 <div>로 시작하는 본문 HTML만 작성하세요.
- 모든 스타일은 인라인 style 속성으로 지정하세요.
- 첫 블록은 "Today's Market Weather" 제목(<h3>)과 ☀️/☁️/☔ 아이콘을 곁들인 1~2문장 요약입니다.
- 이어서 [규제/리스크], [자재/시황], [글로벌/물류] 등 카테고리별 <h2> 섹션을 두세요.
- 각 기사는 제목, 핵심 요약, "💡 Insight:" 로 시작하는 구매계약실 대응 방안, 그리고 원문 링크 버튼("🔗 기사 원문 보기")으로 구성하세요.
- 제목 자체에는 링크를 걸지 마세요."#
    )
}

/// Remove the ```` ```html ```` and ```` ``` ```` markers from a model answer.
pub fn strip_code_fences(text: &str) -> String {
    text.replace("```html", "").replace("```", "")
}

/// Ask the model for the digest body.
///
/// # Errors
///
/// Any backend failure is returned as [`SummarizeError::Api`]; the caller
/// must not send mail without a digest.
#[instrument(level = "info", skip_all, fields(items = items.len()))]
pub async fn summarize<A: AskAsync>(
    items: &[NewsItem],
    llm: &A,
    today: &str,
) -> Result<DigestDocument, SummarizeError> {
    if items.is_empty() {
        return Err(SummarizeError::NoItems);
    }

    let prompt = build_prompt(items, today);
    debug!(bytes = prompt.len(), "Built briefing prompt");

    // logged once by the caller, which decides what the failure means for the run
    let response = llm.ask(&prompt).await?;

    let html = strip_code_fences(&response);
    info!(
        bytes = html.len(),
        preview = %truncate_for_log(html.trim(), 120),
        "Digest generated"
    );
    Ok(DigestDocument::new(html))
}
