use std::sync::LazyLock;

use regex::Regex;

static CHAT_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\d{5,20}@(?:c\.us|lid)|[\d-]{5,40}@g\.us|[\w.-]{1,64}@newsletter)$")
        .expect("chat id pattern")
});

static SESSION_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,64}$").expect("session name pattern"));

/// Personal (`@c.us`, `@lid`), group (`@g.us`) or channel (`@newsletter`) chat id.
pub fn is_valid_chat_id(chat_id: &str) -> bool {
    CHAT_ID.is_match(chat_id)
}

pub fn is_valid_session_name(name: &str) -> bool {
    SESSION_NAME.is_match(name)
}
