use std::env;

use thiserror::Error;

use crate::payments::StripeConfig;

const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error(
        "STRIPE_WEBHOOK_SECRET is not set. Refusing to start: unauthenticated \
         webhooks can trigger enrollments. Set the secret, or set \
         COURSEPAY_ENV=dev to run without signature verification locally."
    )]
    InsecureWebhooks,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub base_url: String,
    pub success_page_url: String,
    pub cancel_page_url: String,
    pub stripe: StripeConfig,
    pub dev_mode: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("COURSEPAY_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let base_url =
            env::var("BASE_URL").unwrap_or_else(|_| format!("http://{}:{}", host, port));

        // The processor API key has no fallback: without it neither checkout
        // creation nor session retrieval can work.
        let secret_key =
            env::var("STRIPE_SECRET_KEY").map_err(|_| ConfigError::MissingVar("STRIPE_SECRET_KEY"))?;

        // Running without a webhook secret means trusting unauthenticated
        // input to grant course access. Allowed in dev mode only.
        let webhook_secret = env::var("STRIPE_WEBHOOK_SECRET").ok();
        if webhook_secret.is_none() && !dev_mode {
            return Err(ConfigError::InsecureWebhooks);
        }

        let api_base =
            env::var("STRIPE_API_BASE").unwrap_or_else(|_| DEFAULT_STRIPE_API_BASE.to_string());

        let success_page_url =
            env::var("SUCCESS_PAGE_URL").unwrap_or_else(|_| format!("{}/success", base_url));
        let cancel_page_url =
            env::var("CANCEL_PAGE_URL").unwrap_or_else(|_| format!("{}/cancel", base_url));

        Ok(Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "coursepay.db".to_string()),
            base_url,
            success_page_url,
            cancel_page_url,
            stripe: StripeConfig {
                secret_key,
                webhook_secret,
                api_base,
            },
            dev_mode,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
