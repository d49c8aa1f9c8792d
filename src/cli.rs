//! Command-line interface definitions for the news mailer.
//!
//! Every option can come from a flag or an environment variable, and every
//! option except the credentials has a default, so a scheduler only needs to
//! export the secrets and run `news_mailer scrape` or `news_mailer digest`.

use crate::api::{DEFAULT_GEMINI_MODEL, GEMINI_ENDPOINT};
use crate::outputs::email::{DEFAULT_SMTP_HOST, DEFAULT_SMTP_PORT};
use crate::scrapers::gnews::GNEWS_ENDPOINT;
use crate::scrapers::google_news::GOOGLE_NEWS_BASE;
use clap::{Args, Parser, Subcommand};
use tracing::debug;

/// Command-line arguments for the news mailer.
///
/// # Examples
///
/// ```sh
/// # Scrape Google News for the default topic and mail the top 5 links
/// news_mailer scrape
///
/// # Query GNews for three terms and mail a generated digest
/// GEMINI_API_KEY=... news_mailer digest -t "mercado imobiliario,aluguel,financiamento"
/// ```
#[derive(Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(flatten)]
    pub mail: MailArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// SMTP relay and sender/recipient settings shared by every variant.
#[derive(Args)]
pub struct MailArgs {
    /// Sender address, also used as the SMTP login
    #[arg(long, env = "SENDER_EMAIL", hide_env_values = true)]
    pub sender_email: Option<String>,

    /// Sender password or app password
    #[arg(long, env = "SENDER_PASSWORD", hide_env_values = true)]
    pub sender_password: Option<String>,

    /// Comma-separated recipient addresses
    #[arg(long, env = "RECEIVER_EMAIL", hide_env_values = true)]
    pub receiver_email: Option<String>,

    /// SMTP relay host
    #[arg(long, env = "SMTP_HOST", default_value = DEFAULT_SMTP_HOST)]
    pub smtp_host: String,

    /// SMTP submission port (STARTTLS)
    #[arg(long, env = "SMTP_PORT", default_value_t = DEFAULT_SMTP_PORT)]
    pub smtp_port: u16,
}

/// Names the scrape job used for the mail settings before they were renamed.
const LEGACY_MAIL_VARS: [(&str, &str); 3] = [
    ("SENDER_EMAIL", "EMAIL_REMETENTE"),
    ("SENDER_PASSWORD", "SENHA_REMETENTE"),
    ("RECEIVER_EMAIL", "EMAIL_DESTINATARIO"),
];

impl MailArgs {
    /// Fill unset mail settings from their legacy variable names.
    pub fn with_legacy_vars(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let fields = [
            &mut self.sender_email,
            &mut self.sender_password,
            &mut self.receiver_email,
        ];
        for (field, (current, legacy)) in fields.into_iter().zip(LEGACY_MAIL_VARS) {
            if field.is_none() {
                if let Some(value) = lookup(legacy) {
                    debug!(var = current, legacy, "Using legacy variable");
                    *field = Some(value);
                }
            }
        }
        self
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Scrape the Google News search page and mail a list of links
    Scrape(ScrapeArgs),
    /// Query the GNews API and mail a list or a generated digest
    Digest(DigestArgs),
}

#[derive(Args, Debug)]
pub struct ScrapeArgs {
    /// Search query
    #[arg(short, long, default_value = "construção civil")]
    pub query: String,

    /// Maximum number of result cards to read
    #[arg(short, long, default_value_t = 5)]
    pub limit: usize,

    /// Interface language
    #[arg(long, default_value = "pt-BR")]
    pub hl: String,

    /// Country
    #[arg(long, default_value = "BR")]
    pub gl: String,

    /// Edition id
    #[arg(long, default_value = "BR:pt-419")]
    pub ceid: String,

    /// Google News base URL
    #[arg(long, default_value = GOOGLE_NEWS_BASE)]
    pub base_url: String,

    /// Directory for the HTML snapshot written when scraping fails
    #[arg(long, env = "SNAPSHOT_DIR", default_value = ".")]
    pub snapshot_dir: String,
}

#[derive(Args)]
pub struct DigestArgs {
    /// Search terms, comma separated or repeated
    #[arg(short, long = "term", value_delimiter = ',', default_value = "mercado imobiliario")]
    pub terms: Vec<String>,

    /// Article language
    #[arg(long, default_value = "pt")]
    pub lang: String,

    /// Article country
    #[arg(long, default_value = "br")]
    pub country: String,

    /// Maximum articles per term
    #[arg(long, default_value_t = 10)]
    pub max: u32,

    /// GNews API key
    #[arg(long, env = "GNEWS_API_KEY", hide_env_values = true)]
    pub gnews_api_key: Option<String>,

    /// GNews base URL
    #[arg(long, env = "GNEWS_ENDPOINT", default_value = GNEWS_ENDPOINT)]
    pub gnews_endpoint: String,

    /// Gemini API key; without it the digest is a plain list of links
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    /// Gemini model name
    #[arg(long, env = "GEMINI_MODEL", default_value = DEFAULT_GEMINI_MODEL)]
    pub gemini_model: String,

    /// Gemini base URL
    #[arg(long, env = "GEMINI_ENDPOINT", default_value = GEMINI_ENDPOINT)]
    pub gemini_endpoint: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scrape_defaults() {
        let cli = Cli::parse_from(["news_mailer", "scrape"]);
        let Command::Scrape(args) = cli.command else {
            panic!("expected scrape");
        };
        assert_eq!(args.query, "construção civil");
        assert_eq!(args.limit, 5);
        assert_eq!(args.base_url, GOOGLE_NEWS_BASE);
        assert_eq!(cli.mail.smtp_port, 587);
    }

    #[test]
    fn test_digest_terms_are_split() {
        let cli = Cli::parse_from([
            "news_mailer",
            "--smtp-host",
            "mail.example.com",
            "digest",
            "-t",
            "imóveis,aluguel",
            "--term",
            "financiamento",
            "--max",
            "2",
        ]);
        assert_eq!(cli.mail.smtp_host, "mail.example.com");
        let Command::Digest(args) = cli.command else {
            panic!("expected digest");
        };
        assert_eq!(args.terms, vec!["imóveis", "aluguel", "financiamento"]);
        assert_eq!(args.max, 2);
        assert_eq!(args.lang, "pt");
        assert_eq!(args.country, "br");
    }

    #[test]
    fn test_legacy_mail_vars_fill_only_unset_values() {
        let mail = MailArgs {
            sender_email: Some("news@example.com".to_string()),
            sender_password: None,
            receiver_email: None,
            smtp_host: DEFAULT_SMTP_HOST.to_string(),
            smtp_port: DEFAULT_SMTP_PORT,
        };
        let mail = mail.with_legacy_vars(|name| match name {
            "EMAIL_REMETENTE" => Some("old@example.com".to_string()),
            "SENHA_REMETENTE" => Some("old-secret".to_string()),
            _ => None,
        });

        assert_eq!(mail.sender_email.as_deref(), Some("news@example.com"));
        assert_eq!(mail.sender_password.as_deref(), Some("old-secret"));
        assert_eq!(mail.receiver_email, None);
    }

    #[test]
    fn test_digest_default_term() {
        let cli = Cli::parse_from(["news_mailer", "digest"]);
        let Command::Digest(args) = cli.command else {
            panic!("expected digest");
        };
        assert_eq!(args.terms, vec!["mercado imobiliario"]);
    }
}
