use std::sync::Arc;

use learning_utils::{
    clock::Clock,
    clustering::ClusterStore,
    quiz::{QuestionBank, QuizStore},
    session::SessionStore,
};
use tracing::warn;
use zoom::{MeetingScheduler, ZoomConfig};

const DEFAULT_CORS_ORIGINS: [&str; 3] = [
    "http://localhost:5173",
    "http://localhost:3000",
    "http://localhost:5174",
];

/// Everything request handlers share. Constructed once at startup.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionStore>,
    pub quiz: Arc<QuizStore>,
    pub clusters: Arc<ClusterStore>,
    pub meetings: Arc<dyn MeetingScheduler>,
    pub zoom: Arc<ZoomConfig>,
    pub clock: Arc<dyn Clock>,
    pub env_vars: EnvVars,
}

impl AppState {
    pub fn new(
        env_vars: EnvVars,
        zoom: ZoomConfig,
        meetings: Arc<dyn MeetingScheduler>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let questions = Arc::new(QuestionBank::new(clock.clone()));
        Self {
            sessions: Arc::new(SessionStore::new(clock.clone())),
            quiz: Arc::new(QuizStore::new(questions, clock.clone())),
            clusters: Arc::new(ClusterStore::new()),
            meetings,
            zoom: Arc::new(zoom),
            clock,
            env_vars,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnvVars {
    pub cors_allowed_origins: Vec<String>,
    pub port: u16,
    pub request_body_size_limit: usize,
    pub request_timeout_in_ms: u64,
    pub sentry_dsn: Option<String>,
}

impl Default for EnvVars {
    fn default() -> Self {
        Self {
            cors_allowed_origins: DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect(),
            port: 3001,
            request_body_size_limit: 1024 * 1024,
            request_timeout_in_ms: 30_000,
            sentry_dsn: None,
        }
    }
}

impl EnvVars {
    pub fn new() -> Self {
        let defaults = Self::default();

        let port = match std::env::var("PORT") {
            Ok(port_string) => port_string.parse().expect("PORT to be parseable as u16"),
            Err(_e) => {
                warn!("PORT not set. Defaulting to {}", defaults.port);
                defaults.port
            }
        };

        let request_timeout_in_ms = match std::env::var("REQUEST_TIMEOUT_IN_MS") {
            Ok(s) => s
                .parse()
                .expect("REQUEST_TIMEOUT_IN_MS to be valid unsigned integer"),
            Err(_e) => {
                warn!(
                    "REQUEST_TIMEOUT_IN_MS not set. Defaulting to {}",
                    defaults.request_timeout_in_ms
                );
                defaults.request_timeout_in_ms
            }
        };

        let request_body_size_limit = match std::env::var("REQUEST_BODY_SIZE_LIMIT") {
            Ok(s) => s
                .parse()
                .expect("REQUEST_BODY_SIZE_LIMIT to be valid unsigned integer"),
            Err(_e) => {
                warn!(
                    "REQUEST_BODY_SIZE_LIMIT not set. Defaulting to {}",
                    defaults.request_body_size_limit
                );
                defaults.request_body_size_limit
            }
        };

        let cors_allowed_origins = match std::env::var("CORS_ALLOWED_ORIGINS") {
            Ok(s) if !s.trim().is_empty() => parse_cors_origins(&s),
            _ => {
                warn!(
                    "CORS_ALLOWED_ORIGINS not set. Defaulting to {}",
                    defaults.cors_allowed_origins.join(",")
                );
                defaults.cors_allowed_origins
            }
        };

        let sentry_dsn = match std::env::var("SENTRY_DSN") {
            Ok(dsn) if !dsn.is_empty() => Some(dsn),
            _ => {
                warn!("SENTRY_DSN not set.");
                None
            }
        };

        EnvVars {
            cors_allowed_origins,
            port,
            request_body_size_limit,
            request_timeout_in_ms,
            sentry_dsn,
        }
    }
}

/// Comma separated origin list. Credentials are allowed, so a wildcard is refused.
fn parse_cors_origins(value: &str) -> Vec<String> {
    let origins: Vec<String> = value
        .split(',')
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect();
    assert!(
        !origins.iter().any(|o| o == "*"),
        "CORS_ALLOWED_ORIGINS to list explicit origins, '*' cannot be used with credentials"
    );
    origins
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cors_origins_are_trimmed() {
        assert_eq!(
            parse_cors_origins(" https://learn.test, ,http://localhost:5173 "),
            vec!["https://learn.test", "http://localhost:5173"]
        );
    }

    #[test]
    #[should_panic(expected = "CORS_ALLOWED_ORIGINS to list explicit origins")]
    fn wildcard_cors_origin_is_refused() {
        parse_cors_origins("http://localhost:5173,*");
    }
}
