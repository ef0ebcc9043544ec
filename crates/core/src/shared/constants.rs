/// Minimum cosine similarity for two face embeddings to share a person ID.
pub const DEFAULT_MATCH_THRESHOLD: f32 = 0.5;

/// Frame-level setting label for frames with no faces.
pub const UNKNOWN_SETTING: &str = "Unknown";

pub const DEFAULT_ORACLE_MODEL: &str = "gpt-4o";
pub const DEFAULT_ORACLE_BASE_URL: &str = "https://api.openai.com/v1";

/// Upper bound on a single same-setting comparison (~1 minute).
pub const DEFAULT_ORACLE_TIMEOUT_SECS: u64 = 60;
pub const ORACLE_MAX_TOKENS: u32 = 300;

/// Oracle replies (lower-cased, trimmed) that count as "same setting".
pub const AFFIRMATIVE_ANSWERS: &[&str] = &["true", "true.", "yes", "yes."];

pub const IDENTITY_STORE_FILENAME: &str = "known_faces.json";
pub const APP_DIR_NAME: &str = "Locus";
