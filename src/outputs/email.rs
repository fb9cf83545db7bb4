//! HTML email body and subject line.
//!
//! The digest fragment is dropped verbatim into a fixed 800px layout: a blue
//! header band with the date, an intro paragraph, the content slot and a dark
//! footer. Styles live in a `<style>` block plus the inline styles the model
//! was asked to emit, which is what most desktop mail clients honour.
//!
//! The fragment is not sanitized; it is trusted as produced by the summarizer.

use crate::models::DigestDocument;

/// Subject line for the briefing dated `today` (e.g. `2025년 05월 06일`).
pub fn subject(today: &str) -> String {
    format!("[Daily] {today} 구매계약실 시장 동향 보고")
}

/// Wrap the digest in the full HTML email document.
pub fn render_email(digest: &DigestDocument, today: &str) -> String {
    let body = digest.as_str();
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<style>
    body {{ font-family: 'Malgun Gothic', 'Apple SD Gothic Neo', sans-serif; line-height: 1.6; color: #333; background-color: #f4f4f4; margin: 0; padding: 0; }}
    .email-wrapper {{ width: 100%; background-color: #f4f4f4; padding: 20px 0; }}
    .email-container {{ max-width: 800px; margin: 0 auto; background-color: #ffffff; border-radius: 8px; overflow: hidden; }}
    .header {{ background-color: #0054a6; color: #ffffff; padding: 30px 40px; }}
    .header h1 {{ margin: 0; font-size: 28px; font-weight: 800; }}
    .header-sub {{ font-size: 16px; margin-top: 10px; opacity: 0.9; }}
    .content {{ padding: 40px; }}
    .intro-text {{ margin-bottom: 40px; font-size: 18px; color: #444; border-bottom: 1px solid #eee; padding-bottom: 20px; }}
    .footer {{ background-color: #333333; padding: 30px; text-align: center; font-size: 14px; color: #bbbbbb; }}
    .footer p {{ margin: 5px 0; }}
</style>
</head>
<body>
    <div class="email-wrapper">
        <div class="email-container">
            <div class="header">
                <h1>Daily Market &amp; Risk Briefing</h1>
                <div class="header-sub">POSCO E&amp;C 구매계약실 | {today}</div>
            </div>
            <div class="content">
                <div class="intro-text">
                    안녕하십니까, 구매계약실 여러분.<br>
                    <strong>{today}</strong> 주요 시장 이슈와 리스크 요인을 정리해 드립니다.
                </div>
{body}
            </div>
            <div class="footer">
                <p>본 리포트는 AI Agent 시스템에 의해 자동으로 생성되었습니다.</p>
                <p>문의: 구매기획 그룹 | &copy; POSCO E&amp;C</p>
            </div>
        </div>
    </div>
</body>
</html>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject() {
        assert_eq!(
            subject("2025년 05월 06일"),
            "[Daily] 2025년 05월 06일 구매계약실 시장 동향 보고"
        );
    }

    #[test]
    fn test_render_email_embeds_digest_verbatim() {
        let digest = DigestDocument::new(r#"<div style="color: red">원문 <script>x</script></div>"#);
        let html = render_email(&digest, "2025년 05월 06일");

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains(r#"<div style="color: red">원문 <script>x</script></div>"#));
        assert!(html.contains("POSCO E&amp;C 구매계약실 | 2025년 05월 06일"));
        assert!(html.contains("<strong>2025년 05월 06일</strong>"));
    }

    #[test]
    fn test_render_email_keeps_css_braces() {
        let html = render_email(&DigestDocument::new(""), "d");
        assert!(html.contains(".content { padding: 40px; }"));
    }
}
