//! Matching bank statement deposits to rent tenants

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;
use uuid::Uuid;

use crate::config::MatcherConfig;
use crate::reconciliation::similarity::name_similarity;
use crate::types::*;

/// Scores closer than this are treated as equal
const SCORE_EPSILON: f64 = 1e-9;

/// How a deposit compares with the tenant's monthly rent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmountMatch {
    /// Within the configured tolerance
    Exact,
    Under,
    Over,
}

impl AmountMatch {
    pub fn compare(amount: &BigDecimal, expected: &BigDecimal, tolerance: &BigDecimal) -> Self {
        let difference = amount - expected;
        if difference.abs() <= *tolerance {
            AmountMatch::Exact
        } else if difference < BigDecimal::from(0) {
            AmountMatch::Under
        } else {
            AmountMatch::Over
        }
    }

    fn rank(&self) -> u8 {
        match self {
            AmountMatch::Exact => 0,
            AmountMatch::Under | AmountMatch::Over => 1,
        }
    }
}

/// Tenant considered for a bank entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub tenant_id: Uuid,
    pub tenant_name: String,
    /// Tenant name or alias that scored best
    pub matched_name: String,
    pub score: f64,
    pub amount_match: AmountMatch,
}

/// Why an entry was left out of matching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    /// Withdrawals and zero-amount rows
    NotADeposit,
    /// A payment was already recorded from this entry
    AlreadyRecorded,
}

/// Outcome of matching one bank entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MatchResult {
    Matched {
        entry: BankEntry,
        candidate: MatchCandidate,
    },
    /// Several tenants fit equally well; needs a manual pick
    Ambiguous {
        entry: BankEntry,
        candidates: Vec<MatchCandidate>,
    },
    /// No name matched, but exactly one tenant's rent equals the amount
    AmountOnly {
        entry: BankEntry,
        candidate: MatchCandidate,
    },
    Unmatched {
        entry: BankEntry,
    },
    Ignored {
        entry: BankEntry,
        reason: IgnoreReason,
    },
}

impl MatchResult {
    pub fn entry(&self) -> &BankEntry {
        match self {
            MatchResult::Matched { entry, .. }
            | MatchResult::Ambiguous { entry, .. }
            | MatchResult::AmountOnly { entry, .. }
            | MatchResult::Unmatched { entry }
            | MatchResult::Ignored { entry, .. } => entry,
        }
    }

    /// Tenant the entry should be booked against, if the match is decisive.
    ///
    /// Amount-only suggestions are not decisive and return `None`.
    pub fn matched_tenant(&self) -> Option<Uuid> {
        match self {
            MatchResult::Matched { candidate, .. } => Some(candidate.tenant_id),
            _ => None,
        }
    }

    /// Rent payment for a decisive match
    pub fn to_payment(&self, owner_id: &str) -> Option<RentPayment> {
        let tenant_id = self.matched_tenant()?;
        Some(payment_from_entry(owner_id, self.entry(), tenant_id))
    }
}

/// Build a rent payment from a bank entry, remembering where it came from
pub fn payment_from_entry(owner_id: &str, entry: &BankEntry, tenant_id: Uuid) -> RentPayment {
    let mut payment = RentPayment::new(owner_id.to_string(), tenant_id, entry.date, entry.amount.clone());
    payment.source_entry_id = Some(entry.id.clone());
    payment
}

/// Count of each outcome over a statement
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationSummary {
    pub matched: usize,
    pub ambiguous: usize,
    pub amount_only: usize,
    pub unmatched: usize,
    pub ignored: usize,
    /// Sum of the matched deposits
    pub matched_amount: BigDecimal,
}

impl ReconciliationSummary {
    pub fn from_results(results: &[MatchResult]) -> Self {
        let mut summary = Self::default();
        for result in results {
            match result {
                MatchResult::Matched { entry, .. } => {
                    summary.matched += 1;
                    summary.matched_amount += &entry.amount;
                }
                MatchResult::Ambiguous { .. } => summary.ambiguous += 1,
                MatchResult::AmountOnly { .. } => summary.amount_only += 1,
                MatchResult::Unmatched { .. } => summary.unmatched += 1,
                MatchResult::Ignored { .. } => summary.ignored += 1,
            }
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.matched + self.ambiguous + self.amount_only + self.unmatched + self.ignored
    }

    /// Share of considered deposits matched decisively
    pub fn match_rate(&self) -> f64 {
        let considered = self.total() - self.ignored;
        if considered == 0 {
            0.0
        } else {
            self.matched as f64 / considered as f64
        }
    }
}

/// Name and amount matcher for rent deposits
#[derive(Debug, Clone)]
pub struct PaymentMatcher {
    config: MatcherConfig,
}

impl Default for PaymentMatcher {
    fn default() -> Self {
        Self::new(MatcherConfig::default())
    }
}

impl PaymentMatcher {
    pub fn new(config: MatcherConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Match every entry against the active tenants
    pub fn match_entries(&self, entries: &[BankEntry], tenants: &[RentTenant]) -> Vec<MatchResult> {
        let active: Vec<&RentTenant> = tenants.iter().filter(|t| t.active).collect();
        entries
            .iter()
            .map(|entry| self.match_one(entry, &active))
            .collect()
    }

    /// Match a single entry
    pub fn match_entry(&self, entry: &BankEntry, tenants: &[RentTenant]) -> MatchResult {
        let active: Vec<&RentTenant> = tenants.iter().filter(|t| t.active).collect();
        self.match_one(entry, &active)
    }

    fn match_one(&self, entry: &BankEntry, tenants: &[&RentTenant]) -> MatchResult {
        if entry.amount <= BigDecimal::from(0) {
            return MatchResult::Ignored {
                entry: entry.clone(),
                reason: IgnoreReason::NotADeposit,
            };
        }

        let text = match &entry.reference {
            Some(reference) => format!("{} {}", entry.description, reference),
            None => entry.description.clone(),
        };

        let mut candidates: Vec<MatchCandidate> = tenants
            .iter()
            .filter_map(|tenant| self.score_tenant(tenant, &text, &entry.amount))
            .filter(|candidate| candidate.score >= self.config.name_threshold)
            .collect();

        candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.amount_match.rank().cmp(&b.amount_match.rank()))
        });

        match candidates.len() {
            0 => self.match_by_amount(entry, tenants),
            1 => MatchResult::Matched {
                entry: entry.clone(),
                candidate: candidates.remove(0),
            },
            _ => {
                let (first, second) = (&candidates[0], &candidates[1]);
                let tied = (first.score - second.score).abs() < SCORE_EPSILON
                    && first.amount_match.rank() == second.amount_match.rank();
                if tied {
                    let best = (first.score, first.amount_match.rank());
                    candidates.retain(|c| {
                        (c.score - best.0).abs() < SCORE_EPSILON && c.amount_match.rank() == best.1
                    });
                    debug!(entry_id = %entry.id, count = candidates.len(), "ambiguous rent match");
                    MatchResult::Ambiguous {
                        entry: entry.clone(),
                        candidates,
                    }
                } else {
                    MatchResult::Matched {
                        entry: entry.clone(),
                        candidate: candidates.remove(0),
                    }
                }
            }
        }
    }

    fn score_tenant(
        &self,
        tenant: &RentTenant,
        text: &str,
        amount: &BigDecimal,
    ) -> Option<MatchCandidate> {
        let (matched_name, score) = tenant
            .names()
            .map(|name| (name, name_similarity(name, text)))
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal))?;

        Some(MatchCandidate {
            tenant_id: tenant.id,
            tenant_name: tenant.name.clone(),
            matched_name: matched_name.to_string(),
            score,
            amount_match: AmountMatch::compare(
                amount,
                &tenant.monthly_rent,
                &self.config.amount_tolerance,
            ),
        })
    }

    fn match_by_amount(&self, entry: &BankEntry, tenants: &[&RentTenant]) -> MatchResult {
        let mut by_amount = tenants.iter().filter(|tenant| {
            AmountMatch::compare(&entry.amount, &tenant.monthly_rent, &self.config.amount_tolerance)
                == AmountMatch::Exact
        });

        match (by_amount.next(), by_amount.next()) {
            (Some(tenant), None) => MatchResult::AmountOnly {
                entry: entry.clone(),
                candidate: MatchCandidate {
                    tenant_id: tenant.id,
                    tenant_name: tenant.name.clone(),
                    matched_name: String::new(),
                    score: 0.0,
                    amount_match: AmountMatch::Exact,
                },
            },
            _ => MatchResult::Unmatched {
                entry: entry.clone(),
            },
        }
    }
}
