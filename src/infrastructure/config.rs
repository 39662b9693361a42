use rust_decimal::Decimal;
use std::env;
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    pub profile: String,
    /// Where captured photos and signatures are written
    pub media_root: PathBuf,
    /// Percentage of the profit credited to the seller on each sale
    pub commission_rate: Decimal,
    pub superuser: Option<(String, String)>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            port: 8000,
            cors_allowed_origins: Vec::new(),
            profile: "default".to_string(),
            media_root: PathBuf::from("media"),
            commission_rate: Decimal::TEN,
            superuser: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let profile = env::var("PROFILE").unwrap_or_else(|_| "default".to_string());

        let database_url = env::var("DATABASE_URL").unwrap_or_else(|_| {
            if profile == "default" {
                "sqlite://phonedesk.db?mode=rwc".to_string()
            } else {
                format!("sqlite://phonedesk_{}.db?mode=rwc", profile)
            }
        });

        let commission_rate = match env::var("COMMISSION_RATE") {
            Ok(raw) => raw.trim().parse::<Decimal>().unwrap_or_else(|_| {
                tracing::warn!("Ignoring invalid COMMISSION_RATE '{}', using 10", raw);
                Decimal::TEN
            }),
            Err(_) => Decimal::TEN,
        };

        let superuser = match (env::var("SUPERUSER_USERNAME"), env::var("SUPERUSER_PASSWORD")) {
            (Ok(username), Ok(password)) if !username.is_empty() && !password.is_empty() => {
                Some((username, password))
            }
            _ => None,
        };

        Self {
            database_url,
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .ok()
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_else(Vec::new),
            media_root: env::var("MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("media")),
            commission_rate,
            superuser,
            profile,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_profile_suffixes_database_name() {
        env::remove_var("DATABASE_URL");
        env::set_var("PROFILE", "shop2");
        let config = Config::from_env();
        env::remove_var("PROFILE");

        assert_eq!(config.database_url, "sqlite://phonedesk_shop2.db?mode=rwc");
        assert_eq!(config.profile, "shop2");
    }

    #[test]
    #[serial]
    fn test_commission_rate_falls_back_to_ten() {
        env::set_var("COMMISSION_RATE", "lots");
        let config = Config::from_env();
        env::remove_var("COMMISSION_RATE");

        assert_eq!(config.commission_rate, Decimal::TEN);
    }
}
