use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub bind_addr: String,
    pub database_url: String,
    pub question_api_url: String,
    pub quiz: QuizSettings,
}

/// Attempt-level settings. Defaults follow the strict proctored variant:
/// 2 minute timer, 5 questions, pass at any score, 3 warnings to
/// disqualification, 3 second warning banner.
#[derive(Debug, Clone, Deserialize)]
pub struct QuizSettings {
    pub total_seconds: u32,
    pub question_count: usize,
    pub passing_percent: f64,
    pub max_warnings: u32,
    pub warning_visible_seconds: u64,
    pub default_role: String,
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            total_seconds: 120,
            question_count: 5,
            passing_percent: 0.0,
            max_warnings: 3,
            warning_visible_seconds: 3,
            default_role: "FullStack (Web)".to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        // Determine environment (defaults to dev)
        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // Build configuration from config/*.toml + ENV overrides
        let settings = config::Config::builder()
            .add_source(
                config::File::with_name(&format!("config/{}", app_env)).required(false),
            )
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        let bind_addr = settings
            .get_string("server.bind_addr")
            .or_else(|_| env::var("BIND_ADDR"))
            .unwrap_or_else(|_| "0.0.0.0:8081".to_string());

        let database_url = settings
            .get_string("database.url")
            .or_else(|_| env::var("DATABASE_URL"))
            .unwrap_or_else(|_| {
                if app_env == "prod" {
                    panic!("FATAL: DATABASE_URL must be set in production!");
                }
                eprintln!("WARNING: Using default local DATABASE_URL (dev mode only!)");
                "mysql://root@localhost:3306/admin_db".to_string()
            });

        let question_api_url = settings
            .get_string("quiz.question_api_url")
            .or_else(|_| env::var("QUESTION_API_URL"))
            .unwrap_or_else(|_| "https://jm-ebg-cdp.el.r.appspot.com".to_string());

        let defaults = QuizSettings::default();
        let quiz = QuizSettings {
            total_seconds: get_u32(&settings, "quiz.total_seconds", "QUIZ_TOTAL_SECONDS")
                .unwrap_or(defaults.total_seconds),
            question_count: get_u32(&settings, "quiz.question_count", "QUIZ_QUESTION_COUNT")
                .map(|v| v as usize)
                .unwrap_or(defaults.question_count),
            passing_percent: settings
                .get_float("quiz.passing_percent")
                .ok()
                .or_else(|| {
                    env::var("QUIZ_PASSING_PERCENT")
                        .ok()
                        .and_then(|v| v.parse().ok())
                })
                .unwrap_or(defaults.passing_percent),
            max_warnings: get_u32(&settings, "quiz.max_warnings", "QUIZ_MAX_WARNINGS")
                .unwrap_or(defaults.max_warnings),
            warning_visible_seconds: get_u32(
                &settings,
                "quiz.warning_visible_seconds",
                "QUIZ_WARNING_VISIBLE_SECONDS",
            )
            .map(u64::from)
            .unwrap_or(defaults.warning_visible_seconds),
            default_role: settings
                .get_string("quiz.default_role")
                .or_else(|_| env::var("QUIZ_DEFAULT_ROLE"))
                .unwrap_or(defaults.default_role),
        };

        Ok(Config {
            bind_addr,
            database_url,
            question_api_url,
            quiz,
        })
    }
}

fn get_u32(settings: &config::Config, key: &str, env_key: &str) -> Option<u32> {
    settings
        .get_int(key)
        .ok()
        .and_then(|v| u32::try_from(v).ok())
        .or_else(|| env::var(env_key).ok().and_then(|v| v.parse().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn quiz_settings_default_to_strict_proctored_variant() {
        let defaults = QuizSettings::default();
        assert_eq!(defaults.total_seconds, 120);
        assert_eq!(defaults.question_count, 5);
        assert_eq!(defaults.passing_percent, 0.0);
        assert_eq!(defaults.max_warnings, 3);
        assert_eq!(defaults.warning_visible_seconds, 3);
        assert_eq!(defaults.default_role, "FullStack (Web)");
    }

    #[test]
    #[serial]
    fn env_overrides_quiz_settings() {
        std::env::set_var("QUIZ_TOTAL_SECONDS", "300");
        std::env::set_var("QUIZ_MAX_WARNINGS", "5");
        std::env::set_var("DATABASE_URL", "mysql://test@localhost/test_db");

        let config = Config::load().expect("config should load");
        assert_eq!(config.quiz.total_seconds, 300);
        assert_eq!(config.quiz.max_warnings, 5);
        assert_eq!(config.quiz.question_count, 5);
        assert_eq!(config.database_url, "mysql://test@localhost/test_db");

        std::env::remove_var("QUIZ_TOTAL_SECONDS");
        std::env::remove_var("QUIZ_MAX_WARNINGS");
        std::env::remove_var("DATABASE_URL");
    }
}
