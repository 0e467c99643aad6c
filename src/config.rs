// Application configuration, loaded from environment variables and CLI flags.

use std::path::PathBuf;
use std::time::Duration;

use crate::engine::config::{DEFAULT_BOT_COUNT, FEED_CAPACITY, MAX_BOT_COUNT, TICK_INTERVAL_MS};

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Directory containing question-set JSON files.
    pub questions_dir: PathBuf,
    /// Wall-clock length of one countdown tick.
    pub tick_interval: Duration,
    /// Opponents per battle when the request does not say.
    pub bot_count: usize,
    /// Fixed seed for bot behaviour. Random per battle when unset.
    pub bot_seed: Option<u64>,
    /// Entries kept in each battle's recent-answers feed.
    pub feed_capacity: usize,
    /// Battles allowed in play at once.
    pub max_active_battles: usize,
    /// How long a finished battle's final snapshot stays readable.
    pub finished_linger: Duration,
    /// Directory containing pre-built frontend files to serve.
    pub static_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 3000,
            questions_dir: PathBuf::from("data/question_sets"),
            tick_interval: Duration::from_millis(TICK_INTERVAL_MS),
            bot_count: DEFAULT_BOT_COUNT,
            bot_seed: None,
            feed_capacity: FEED_CAPACITY,
            max_active_battles: 100,
            finished_linger: Duration::from_secs(300),
            static_dir: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables and CLI arguments.
    ///
    /// Environment variables:
    /// - `PORT` - HTTP server port (default: 3000)
    /// - `QUESTIONS_DIR` - Path to question sets (default: `data/question_sets`)
    /// - `TICK_INTERVAL_MS` - Countdown tick length (default: 1000)
    /// - `BOT_COUNT` - Default opponents per battle (default: 3, max 8)
    /// - `BOT_SEED` - Fixed seed for reproducible bot behaviour
    /// - `FEED_CAPACITY` - Recent answers kept per battle (default: 5)
    /// - `MAX_ACTIVE_BATTLES` - Concurrent battle limit (default: 100)
    /// - `FINISHED_LINGER_SECS` - Seconds a finished battle stays readable (default: 300)
    /// - `STATIC_DIR` - Path to frontend dist directory for static file serving
    ///
    /// CLI flags:
    /// - `--port <PORT>` - Override the port
    /// - `--seed <SEED>` - Override the bot seed
    pub fn load() -> Self {
        let args: Vec<String> = std::env::args().collect();
        Self::from_sources(&args, |key| std::env::var(key).ok())
    }

    /// Build a config from CLI arguments and an environment lookup.
    pub fn from_sources<F>(args: &[String], env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let parsed = |key: &str| env(key).and_then(|v| v.parse::<u64>().ok());

        // Port: CLI flag --port takes precedence, then env var, then default
        let port = Self::parse_cli_value(args, "--port")
            .and_then(|v| v.parse().ok())
            .or_else(|| env("PORT").and_then(|v| v.parse().ok()))
            .unwrap_or(defaults.port);

        let questions_dir = env("QUESTIONS_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.questions_dir);

        let tick_interval = parsed("TICK_INTERVAL_MS")
            .filter(|&ms| ms > 0)
            .map(Duration::from_millis)
            .unwrap_or(defaults.tick_interval);

        let bot_count = parsed("BOT_COUNT")
            .map(|n| (n as usize).clamp(1, MAX_BOT_COUNT))
            .unwrap_or(defaults.bot_count);

        let bot_seed = Self::parse_cli_value(args, "--seed")
            .and_then(|v| v.parse().ok())
            .or_else(|| parsed("BOT_SEED"));

        let feed_capacity = parsed("FEED_CAPACITY")
            .map(|n| (n as usize).max(1))
            .unwrap_or(defaults.feed_capacity);

        let max_active_battles = parsed("MAX_ACTIVE_BATTLES")
            .map(|n| (n as usize).max(1))
            .unwrap_or(defaults.max_active_battles);

        let finished_linger = parsed("FINISHED_LINGER_SECS")
            .map(Duration::from_secs)
            .unwrap_or(defaults.finished_linger);

        let static_dir = env("STATIC_DIR").map(PathBuf::from);

        Config {
            port,
            questions_dir,
            tick_interval,
            bot_count,
            bot_seed,
            feed_capacity,
            max_active_battles,
            finished_linger,
            static_dir,
        }
    }

    /// Parse a CLI flag value like `--port 8080`.
    fn parse_cli_value(args: &[String], flag: &str) -> Option<String> {
        args.windows(2).find_map(|pair| {
            if pair[0] == flag {
                Some(pair[1].clone())
            } else {
                None
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(args: &[&str], vars: &[(&str, &str)]) -> Config {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_sources(&args, |k| vars.get(k).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&["bin"], &[]);
        assert_eq!(config.port, 3000);
        assert_eq!(config.tick_interval, Duration::from_secs(1));
        assert_eq!(config.bot_count, DEFAULT_BOT_COUNT);
        assert_eq!(config.feed_capacity, FEED_CAPACITY);
        assert!(config.bot_seed.is_none());
        assert!(config.static_dir.is_none());
    }

    #[test]
    fn test_cli_overrides_env() {
        let config = load(
            &["bin", "--port", "8080", "--seed", "7"],
            &[("PORT", "9000"), ("BOT_SEED", "1")],
        );
        assert_eq!(config.port, 8080);
        assert_eq!(config.bot_seed, Some(7));
    }

    #[test]
    fn test_env_values_are_clamped() {
        let config = load(
            &["bin"],
            &[
                ("BOT_COUNT", "50"),
                ("FEED_CAPACITY", "0"),
                ("TICK_INTERVAL_MS", "0"),
                ("FINISHED_LINGER_SECS", "30"),
                ("QUESTIONS_DIR", "/srv/questions"),
            ],
        );
        assert_eq!(config.bot_count, MAX_BOT_COUNT);
        assert_eq!(config.feed_capacity, 1);
        assert_eq!(config.tick_interval, Duration::from_millis(TICK_INTERVAL_MS));
        assert_eq!(config.finished_linger, Duration::from_secs(30));
        assert_eq!(config.questions_dir, PathBuf::from("/srv/questions"));
    }

    #[test]
    fn test_garbage_falls_back_to_defaults() {
        let config = load(&["bin", "--port"], &[("PORT", "not-a-port"), ("BOT_COUNT", "x")]);
        assert_eq!(config.port, 3000);
        assert_eq!(config.bot_count, DEFAULT_BOT_COUNT);
    }
}
