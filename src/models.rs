//! Core data models for the cash-flow service

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use uuid::Uuid;

use crate::error::CashflowError;
use crate::Result;

//
// ================= Enums =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordKind {
    Inflow,
    Outflow,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskTier {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReplySource {
    /// Answer produced by the external text generator
    Gemini,
    /// Deterministic narrative over the user's summary
    Rules,
    /// Static advisory message, used when nothing else could be derived
    Fallback,
}

//
// ================= Records =================
//

/// A single dated income or expense entry, owned by one account
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransactionRecord {
    pub id: Uuid,
    pub owner_id: Uuid,
    #[serde(rename = "type")]
    pub kind: RecordKind,
    pub amount: Decimal,
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub occurred_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Unvalidated record as submitted by a client
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordDraft {
    #[serde(rename = "type")]
    pub kind: Option<RecordKind>,
    pub amount: Option<Decimal>,
    pub category: Option<String>,
    pub description: Option<String>,
    /// `YYYY-MM-DD` or RFC 3339
    pub date: Option<String>,
}

impl RecordDraft {
    pub fn new(kind: RecordKind, amount: Decimal) -> Self {
        Self {
            kind: Some(kind),
            amount: Some(amount),
            ..Self::default()
        }
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    /// Turn the draft into a record owned by `owner_id`.
    ///
    /// Missing `type` or `amount` and non-positive amounts are rejected here;
    /// the summary engine assumes every record it sees passed this check.
    pub fn into_record(self, owner_id: Uuid, now: DateTime<Utc>) -> Result<TransactionRecord> {
        let (kind, amount) = match (self.kind, self.amount) {
            (Some(kind), Some(amount)) => (kind, amount),
            _ => {
                return Err(CashflowError::InvalidInput(
                    "Type and amount are required".to_string(),
                ))
            }
        };

        if amount <= Decimal::ZERO {
            return Err(CashflowError::InvalidInput(format!(
                "Amount must be positive, got {}",
                amount
            )));
        }

        let occurred_at = match self.date.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => parse_occurred_at(raw)?,
            _ => now,
        };

        let category = self
            .category
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| "General".to_string());

        Ok(TransactionRecord {
            id: Uuid::new_v4(),
            owner_id,
            kind,
            amount,
            category,
            description: self.description.unwrap_or_default(),
            occurred_at,
            created_at: now,
        })
    }
}

/// Accepts a calendar date (midnight UTC) or a full RFC 3339 timestamp
pub fn parse_occurred_at(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| {
            CashflowError::InvalidInput(format!(
                "Invalid date '{}', expected YYYY-MM-DD or RFC 3339",
                raw
            ))
        })
}

//
// ================= Summary =================
//

/// Aggregates derived from a record set; recomputed on every query
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinancialSummary {
    pub balance: Decimal,
    pub total_inflow: Decimal,
    pub total_outflow: Decimal,
    pub monthly_inflow: Decimal,
    pub monthly_outflow: Decimal,
    pub burn_rate: Decimal,
    pub runway_days: i64,
    pub as_of: DateTime<Utc>,
}

//
// ================= Chat =================
//

/// One question/answer pair of the CFO chat; append-only
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatExchange {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub user_message: String,
    pub assistant_response: String,
    pub source: ReplySource,
    pub timestamp: DateTime<Utc>,
}

//
// ================= Accounts =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    /// bcrypt hash, salt and cost included
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// User fields that are safe to hand back to clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
        }
    }
}

/// Login session; only the SHA-256 digest of the bearer token is stored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token_digest: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

//
// ================= RiskTier Ordering =================
//

impl RiskTier {
    pub fn severity(&self) -> u8 {
        match self {
            RiskTier::Low => 0,
            RiskTier::Medium => 1,
            RiskTier::High => 2,
            RiskTier::Critical => 3,
        }
    }

    /// Symbolic marker shown next to the tier in narratives
    pub fn marker(&self) -> &'static str {
        match self {
            RiskTier::Low => "🟢",
            RiskTier::Medium => "🟡",
            RiskTier::High => "🟠",
            RiskTier::Critical => "🔴",
        }
    }
}

impl PartialOrd for RiskTier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RiskTier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.severity().cmp(&other.severity())
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskTier::Low => "Low",
            RiskTier::Medium => "Medium",
            RiskTier::High => "High",
            RiskTier::Critical => "Critical",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RecordKind::Inflow => "INFLOW",
            RecordKind::Outflow => "OUTFLOW",
        };
        write!(f, "{}", s)
    }
}
