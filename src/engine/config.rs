// Battle tuning constants

// Timing
pub const TICK_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_TIME_LIMIT_SECS: u32 = 30;
pub const DEFAULT_POINTS: u32 = 10;
/// Largest base value a single question may carry.
pub const MAX_POINTS: u32 = 10_000;

// Recent-answers feed
pub const FEED_CAPACITY: usize = 5;

// Speed bonus tiers (more than 2/3 of the window left, more than 1/3, otherwise)
pub const SPEED_BONUS_LARGE: u32 = 10;
pub const SPEED_BONUS_MEDIUM: u32 = 5;
pub const SPEED_BONUS_SMALL: u32 = 2;

// Bot behaviour
pub const BOT_CORRECT_PROBABILITY: f64 = 0.8;
/// Bots lock in after this fraction of the window has elapsed, in percent.
pub const BOT_THINK_MIN_PERCENT: u32 = 30;
pub const BOT_THINK_MAX_PERCENT: u32 = 90;
/// Extra random points a bot earns on a correct answer (inclusive upper bound).
pub const BOT_BONUS_JITTER_MAX: u32 = 3;

pub const DEFAULT_BOT_COUNT: usize = 3;
pub const MAX_BOT_COUNT: usize = 8;

/// Names and avatar glyphs for simulated opponents, used in roster order.
pub const BOT_ROSTER: [(&str, &str); MAX_BOT_COUNT] = [
    ("QuizMaster", "🧠"),
    ("BrainStorm", "⚡"),
    ("SmartCookie", "🍪"),
    ("NerdAlert", "🤓"),
    ("Einstein Jr", "🔬"),
    ("BookWorm", "📚"),
    ("MathWhiz", "➗"),
    ("CleverClogs", "🦉"),
];

pub const DEFAULT_HUMAN_AVATAR: &str = "😎";
pub const DEFAULT_SUBJECT: &str = "General";
