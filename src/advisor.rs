//! CFO chat advisor
//!
//! Always answers. The optional text generator gets one bounded attempt;
//! any failure (disabled, timeout, error, empty output) falls through to
//! the deterministic narrative, and a missing summary to the static
//! advisory message.

use crate::error::CashflowError;
use crate::gemini::TextGenerator;
use crate::models::{ChatExchange, FinancialSummary, PublicUser, ReplySource, TransactionRecord};
use crate::narrative::{format_money, format_narrative, FALLBACK_MESSAGE};
use crate::risk::{RiskLadder, RiskRung};
use crate::store::{ChatLog, RecordStore};
use crate::summary::{compute_summary, empty_summary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

const RECENT_TRANSACTIONS_IN_PROMPT: usize = 5;
const DEFAULT_OWNER_NAME: &str = "Business Owner";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    pub message: String,
    pub source: ReplySource,
    pub history: ChatExchange,
}

pub struct Advisor {
    records: Arc<dyn RecordStore>,
    chats: Arc<dyn ChatLog>,
    generator: Option<Arc<dyn TextGenerator>>,
    generation_timeout: Duration,
    ladder: RiskLadder,
}

impl Advisor {
    pub fn new(records: Arc<dyn RecordStore>, chats: Arc<dyn ChatLog>, ladder: RiskLadder) -> Self {
        Self {
            records,
            chats,
            generator: None,
            generation_timeout: Duration::from_secs(15),
            ladder,
        }
    }

    pub fn with_generator(mut self, generator: Arc<dyn TextGenerator>, timeout: Duration) -> Self {
        self.generator = Some(generator);
        self.generation_timeout = timeout;
        self
    }

    pub fn ladder(&self) -> &RiskLadder {
        &self.ladder
    }

    /// Name of the configured text generator, if any
    pub fn generator_name(&self) -> Option<&'static str> {
        self.generator.as_ref().map(|g| g.name())
    }

    /// Answer a chat message for `owner` (anonymous callers get an empty book).
    ///
    /// Exchanges of known owners are appended to the chat log; a failed
    /// append is logged and the reply is still returned.
    pub async fn respond(
        &self,
        owner: Option<&PublicUser>,
        message: &str,
        now: DateTime<Utc>,
    ) -> ChatReply {
        let (records, summary) = match owner {
            Some(user) => match self.records.list(user.id).await {
                Ok(records) => {
                    let summary = compute_summary(&records, now);
                    (records, Some(summary))
                }
                Err(e) => {
                    warn!(user_id = %user.id, "Failed to load records for chat: {}", e);
                    (Vec::new(), None)
                }
            },
            None => (Vec::new(), Some(empty_summary(now))),
        };

        let owner_name = owner
            .and_then(|u| u.name.as_deref())
            .unwrap_or(DEFAULT_OWNER_NAME);

        let (text, source) = self
            .compose(owner_name, message, &records, summary.as_ref())
            .await;

        let exchange = ChatExchange {
            id: Uuid::new_v4(),
            owner_id: owner.map(|u| u.id).unwrap_or_else(Uuid::nil),
            user_message: message.to_string(),
            assistant_response: text.clone(),
            source,
            timestamp: now,
        };

        if owner.is_some() {
            if let Err(e) = self.chats.append(exchange.clone()).await {
                warn!(exchange_id = %exchange.id, "Failed to save chat exchange: {}", e);
            }
        }

        info!(source = ?source, "Chat reply ready");

        ChatReply {
            message: text,
            source,
            history: exchange,
        }
    }

    async fn compose(
        &self,
        owner_name: &str,
        message: &str,
        records: &[TransactionRecord],
        summary: Option<&FinancialSummary>,
    ) -> (String, ReplySource) {
        let Some(summary) = summary else {
            return (FALLBACK_MESSAGE.to_string(), ReplySource::Fallback);
        };

        let rung = self.ladder.assess(summary);

        if let Some(generator) = &self.generator {
            let prompt = build_prompt(owner_name, message, summary, rung, records);
            match self.generate(generator.as_ref(), &prompt).await {
                Ok(text) => return (text, ReplySource::Gemini),
                Err(e) => warn!(
                    generator = generator.name(),
                    "Text generation failed, using rule-based answer: {}", e
                ),
            }
        } else {
            debug!("Text generator disabled, using rule-based answer");
        }

        (format_narrative(message, summary, rung), ReplySource::Rules)
    }

    async fn generate(&self, generator: &dyn TextGenerator, prompt: &str) -> crate::Result<String> {
        let text = tokio::time::timeout(self.generation_timeout, generator.generate(prompt))
            .await
            .map_err(|_| {
                CashflowError::GenerationError(format!(
                    "timed out after {:?}",
                    self.generation_timeout
                ))
            })??;

        if text.trim().is_empty() {
            return Err(CashflowError::GenerationError("empty answer".to_string()));
        }

        Ok(text)
    }
}

/// Prompt handed to the text generator
pub fn build_prompt(
    owner_name: &str,
    message: &str,
    summary: &FinancialSummary,
    rung: &RiskRung,
    records: &[TransactionRecord],
) -> String {
    let start = records.len().saturating_sub(RECENT_TRANSACTIONS_IN_PROMPT);
    let recent = records[start..]
        .iter()
        .map(|r| format!("{}: {} ({})", r.kind, format_money(r.amount), r.category))
        .collect::<Vec<_>>();
    let recent = if recent.is_empty() {
        "none recorded".to_string()
    } else {
        recent.join(", ")
    };

    format!(
        r#"You are the virtual CFO of a small business. Give actionable, data-driven cash-flow advice.

Owner: {owner}

Financial context:
- Cash balance: {balance}
- Total inflow: {total_in}
- Total outflow: {total_out}
- Last 30 days: inflow {month_in}, outflow {month_out}
- Runway: {runway} days at the current burn rate
- Risk tier: {tier} ({label})
- Recent transactions: {recent}

Question: "{message}"

Guidelines:
1. Start from the balance versus expenses: is the business safe or in danger?
2. Cite specific numbers from the context.
3. Be direct about risks, in the tone of a senior financial advisor.
4. Use bullet points for steps and stay under 150 words.
5. Do not describe yourself; go straight to the insight."#,
        owner = owner_name,
        balance = format_money(summary.balance),
        total_in = format_money(summary.total_inflow),
        total_out = format_money(summary.total_outflow),
        month_in = format_money(summary.monthly_inflow),
        month_out = format_money(summary.monthly_outflow),
        runway = summary.runway_days,
        tier = rung.tier,
        label = rung.label,
        recent = recent,
        message = message,
    )
}
