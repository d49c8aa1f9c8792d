//! Narrative digest generation.
//!
//! Turns the fetched articles into one context block, asks the text model to
//! rewrite it as a short newsletter, and converts the reply to HTML. The
//! model is called at most once per run; an empty context or a failed call
//! produce fixed messages instead.

use crate::api::AskAsync;
use crate::models::Article;
use crate::utils::truncate_for_log;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{error, info, instrument};

/// Shown when there is nothing to summarize.
pub const NO_NEWS_HTML: &str = "<p>Nenhuma notícia relevante foi encontrada hoje.</p>";

/// Shown when the model call fails.
pub const FALLBACK_HTML: &str =
    "<p>Não foi possível gerar o resumo das notícias hoje. Tente novamente mais tarde.</p>";

/// Upper bound on `**bold**` pairs converted to `<b>` tags.
pub const MAX_BOLD_PAIRS: usize = 10;

const PROMPT_TEMPLATE: &str = "\
Você é um jornalista que escreve uma newsletter diária em português do Brasil.
Com base nas notícias abaixo, escreva um resumo em forma de narrativa, com
parágrafos curtos, destacando em **negrito** os fatos mais importantes e
citando as fontes. Não invente informações que não estejam nas notícias.

NOTÍCIAS:
{context}";

static BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.+?)\*\*").unwrap());

/// Concatenate title, source and description of every article.
///
/// Blocks are separated by a blank line. Missing fields are written as `-`
/// so every block has the same shape.
pub fn build_context(articles: &[Article]) -> String {
    articles
        .iter()
        .map(|a| {
            format!(
                "Título: {}\nFonte: {}\nDescrição: {}",
                a.title.trim(),
                a.source.as_deref().unwrap_or("-"),
                a.description.as_deref().unwrap_or("-"),
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Embed `context` in the fixed prompt.
pub fn build_prompt(context: &str) -> String {
    PROMPT_TEMPLATE.replace("{context}", context)
}

/// Naive text-to-HTML conversion of a model reply.
///
/// Newlines become `<br>` and up to [`MAX_BOLD_PAIRS`] `**…**` pairs become
/// `<b>…</b>`. The reply is otherwise inserted as-is.
pub fn narrative_to_html(text: &str) -> String {
    let bolded = BOLD.replacen(text.trim(), MAX_BOLD_PAIRS, "<b>$1</b>");
    bolded.replace("\r\n", "\n").replace('\n', "<br>")
}

/// Produce the narrative HTML body for `articles`.
#[instrument(level = "info", skip_all, fields(articles = articles.len()))]
pub async fn generate(asker: &impl AskAsync, articles: &[Article]) -> String {
    let context = build_context(articles);
    if context.trim().is_empty() {
        info!("No articles to summarize");
        return NO_NEWS_HTML.to_string();
    }

    match asker.ask(&build_prompt(&context)).await {
        Ok(reply) => {
            info!(reply_preview = %truncate_for_log(&reply, 120), "Narrative generated");
            narrative_to_html(&reply)
        }
        Err(e) => {
            error!(error = %e, "Narrative generation failed; using fallback text");
            FALLBACK_HTML.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::error::Error;

    /// Records prompts and answers with a canned reply, or fails.
    struct StubAsk {
        reply: Option<&'static str>,
        prompts: RefCell<Vec<String>>,
    }

    impl StubAsk {
        fn new(reply: Option<&'static str>) -> Self {
            Self {
                reply,
                prompts: RefCell::new(Vec::new()),
            }
        }
    }

    impl AskAsync for StubAsk {
        async fn ask(&self, text: &str) -> Result<String, Box<dyn Error>> {
            self.prompts.borrow_mut().push(text.to_string());
            self.reply
                .map(str::to_string)
                .ok_or_else(|| "model unavailable".into())
        }
    }

    fn article(title: &str, source: Option<&str>, description: Option<&str>) -> Article {
        Article {
            title: title.to_string(),
            link: format!("https://example.com/{title}"),
            source: source.map(str::to_string),
            description: description.map(str::to_string),
        }
    }

    #[test]
    fn test_build_context() {
        let ctx = build_context(&[
            article("A", Some("Folha"), Some("primeira")),
            article("B", None, None),
        ]);
        assert_eq!(
            ctx,
            "Título: A\nFonte: Folha\nDescrição: primeira\n\nTítulo: B\nFonte: -\nDescrição: -"
        );
        assert_eq!(build_context(&[]), "");
    }

    #[test]
    fn test_build_prompt_embeds_context() {
        let prompt = build_prompt("Título: A");
        assert!(prompt.starts_with("Você é um jornalista"));
        assert!(prompt.ends_with("NOTÍCIAS:\nTítulo: A"));
    }

    #[test]
    fn test_narrative_to_html() {
        assert_eq!(
            narrative_to_html("Hoje **juros** caíram.\nVendas **subiram**."),
            "Hoje <b>juros</b> caíram.<br>Vendas <b>subiram</b>."
        );
        assert_eq!(narrative_to_html("sem marcação"), "sem marcação");
        assert_eq!(narrative_to_html("um ** solto"), "um ** solto");
    }

    #[test]
    fn test_narrative_to_html_bounds_bold_pairs() {
        let text = "**x** ".repeat(MAX_BOLD_PAIRS + 2);
        let html = narrative_to_html(&text);
        assert_eq!(html.matches("<b>x</b>").count(), MAX_BOLD_PAIRS);
        assert_eq!(html.matches("**x**").count(), 2);
    }

    #[tokio::test]
    async fn test_generate_short_circuits_on_empty_input() {
        let stub = StubAsk::new(Some("unused"));
        assert_eq!(generate(&stub, &[]).await, NO_NEWS_HTML);
        assert!(stub.prompts.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_generate_converts_reply() {
        let stub = StubAsk::new(Some("Resumo **forte**\nfim"));
        let html = generate(&stub, &[article("A", Some("G1"), Some("d"))]).await;

        assert_eq!(html, "Resumo <b>forte</b><br>fim");
        let prompts = stub.prompts.borrow();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Título: A\nFonte: G1\nDescrição: d"));
    }

    #[tokio::test]
    async fn test_generate_falls_back_on_error() {
        let stub = StubAsk::new(None);
        let html = generate(&stub, &[article("A", None, None)]).await;

        assert_eq!(html, FALLBACK_HTML);
        assert_eq!(stub.prompts.borrow().len(), 1);
    }
}
