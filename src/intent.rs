//! Intent detection for CFO chat messages
//!
//! Keyword groups are checked in a fixed order; the first group with a
//! keyword contained in the lowercased message wins.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Balance,
    Runway,
    Hiring,
    Spending,
    General,
}

/// Static keyword lists, zero allocation
const BALANCE_KEYWORDS: &[&str] = &["balance", "cash"];
const RUNWAY_KEYWORDS: &[&str] = &["runway", "survive", "last"];
const HIRING_KEYWORDS: &[&str] = &["hire", "employee", "salary"];
const SPENDING_KEYWORDS: &[&str] = &["spend", "buy", "purchase"];

const INTENT_GROUPS: &[(Intent, &[&str])] = &[
    (Intent::Balance, BALANCE_KEYWORDS),
    (Intent::Runway, RUNWAY_KEYWORDS),
    (Intent::Hiring, HIRING_KEYWORDS),
    (Intent::Spending, SPENDING_KEYWORDS),
];

/// Detect what the user is asking about
pub fn detect_intent(message: &str) -> Intent {
    let message = message.to_lowercase();

    INTENT_GROUPS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|kw| message.contains(kw)))
        .map(|(intent, _)| *intent)
        .unwrap_or(Intent::General)
}
