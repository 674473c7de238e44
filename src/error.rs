use thiserror::Error;

#[derive(Error, Debug)]
pub enum MailerError {
    #[error("Member data error: {0}")]
    MemberData(String),

    #[error("Failed to load {kind} CSV '{path}': {source}")]
    MemberDataParse {
        kind: &'static str,
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Email send failed: {0}")]
    EmailSend(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Environment variable error: {0}")]
    Env(#[from] std::env::VarError),
}

pub type Result<T> = std::result::Result<T, MailerError>;
