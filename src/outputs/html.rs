//! HTML rendering of the newsletter body.
//!
//! Both renderers are pure: the caller passes the timestamp, so output is
//! fully determined by the arguments.

use crate::models::Article;
use crate::utils::datetime_stamp;
use chrono::{DateTime, TimeZone};
use html_escape::{encode_double_quoted_attribute, encode_text};
use std::fmt::{Display, Write};

/// Body fragment used when a list render has no articles.
pub const NO_NEWS_FOUND_HTML: &str = "<p>Nenhuma notícia encontrada hoje sobre este tema.</p>";

const FOOTER_HTML: &str =
    "<p><small>Este é um email automático enviado pelo seu agendador de notícias.</small></p>";

fn open_document<Tz: TimeZone>(heading: &str, now: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    format!(
        "<html><body>\n<h1>{}</h1>\n<p>Notícias coletadas em: {}</p>\n<hr>\n",
        encode_text(heading),
        datetime_stamp(now)
    )
}

fn close_document(mut html: String) -> String {
    html.push_str(FOOTER_HTML);
    html.push_str("\n</body></html>\n");
    html
}

/// Render a heading, a timestamp and one list item per article.
///
/// With no articles the list is replaced by [`NO_NEWS_FOUND_HTML`] and no
/// list markup is emitted at all.
pub fn render_article_list<Tz: TimeZone>(
    heading: &str,
    articles: &[Article],
    now: &DateTime<Tz>,
) -> String
where
    Tz::Offset: Display,
{
    let mut html = open_document(heading, now);

    if articles.is_empty() {
        html.push_str(NO_NEWS_FOUND_HTML);
        html.push('\n');
        return close_document(html);
    }

    html.push_str("<ul>\n");
    for article in articles {
        write!(
            html,
            "<li><a href=\"{}\">{}</a>",
            encode_double_quoted_attribute(&article.link),
            encode_text(&article.title)
        )
        .unwrap();
        if let Some(source) = &article.source {
            write!(html, "<br><i>Fonte: {}</i>", encode_text(source)).unwrap();
        }
        if let Some(description) = &article.description {
            write!(html, "<br>{}", encode_text(description)).unwrap();
        }
        html.push_str("</li>\n");
    }
    html.push_str("</ul>\n");

    close_document(html)
}

/// Render a heading, a timestamp and an already-converted narrative body.
pub fn render_narrative<Tz: TimeZone>(
    heading: &str,
    narrative_html: &str,
    now: &DateTime<Tz>,
) -> String
where
    Tz::Offset: Display,
{
    let mut html = open_document(heading, now);
    html.push_str("<div>");
    html.push_str(narrative_html);
    html.push_str("</div>\n");
    close_document(html)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 6, 9, 30, 0).unwrap()
    }

    fn article(i: usize) -> Article {
        Article {
            title: format!("Notícia {i}"),
            link: format!("https://example.com/{i}"),
            source: None,
            description: None,
        }
    }

    #[test]
    fn test_empty_list_renders_no_news_fragment() {
        let html = render_article_list("Construção Civil", &[], &now());

        assert!(html.contains(NO_NEWS_FOUND_HTML));
        assert!(!html.contains("<ul"));
        assert!(!html.contains("<li"));
        assert!(html.contains("<h1>Construção Civil</h1>"));
        assert!(html.contains("06/05/2025 09:30"));
    }

    #[test]
    fn test_list_has_one_item_per_article() {
        let articles: Vec<Article> = (1..=4).map(article).collect();
        let html = render_article_list("Hoje", &articles, &now());

        assert_eq!(html.matches("<li>").count(), 4);
        assert!(!html.contains(NO_NEWS_FOUND_HTML));
        for a in &articles {
            assert!(html.contains(&format!("<a href=\"{}\">{}</a>", a.link, a.title)));
        }
    }

    #[test]
    fn test_list_includes_source_and_description() {
        let articles = vec![Article {
            title: "Juros <altos>".to_string(),
            link: "https://example.com/?a=1&b=2".to_string(),
            source: Some("Valor".to_string()),
            description: Some("Selic & crédito".to_string()),
        }];
        let html = render_article_list("Hoje", &articles, &now());

        assert!(html.contains(
            "<a href=\"https://example.com/?a=1&amp;b=2\">Juros &lt;altos&gt;</a>"
        ));
        assert!(html.contains("<i>Fonte: Valor</i>"));
        assert!(html.contains("Selic &amp; crédito"));
    }

    #[test]
    fn test_quotes_are_escaped_only_inside_href() {
        let articles = vec![Article {
            title: "O \"boom\" do aluguel".to_string(),
            link: "https://example.com/a\"b".to_string(),
            source: None,
            description: None,
        }];
        let html = render_article_list("Hoje", &articles, &now());

        assert!(html.contains("href=\"https://example.com/a&quot;b\""));
        assert!(html.contains(">O \"boom\" do aluguel</a>"));
    }

    #[test]
    fn test_narrative_is_inserted_verbatim() {
        let html = render_narrative("Mercado Imobiliario", "Olá <b>mundo</b><br>fim", &now());

        assert_eq!(html.matches("<h1>").count(), 1);
        assert!(html.contains("<div>Olá <b>mundo</b><br>fim</div>"));
        assert!(!html.contains("<ul"));
    }
}
