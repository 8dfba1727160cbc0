//! In-memory doubles shared by the use-case tests.

use std::{collections::HashMap, sync::Mutex};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::Utc;
use crates::domain::{
    entities::{payment_records::PaymentRecordEntity, user_balances::UserBalanceEntity},
    repositories::ledger::{LedgerRepository, LedgerWriteOutcome},
    value_objects::{
        enums::{payment_rails::PaymentRail, payment_statuses::PaymentStatus},
        project_progress::{ProjectProgress, apply_credit},
        verified_payments::{LedgerEntry, VerifiedPayment},
    },
};
use serde_json::json;
use uuid::Uuid;

#[derive(Default)]
struct LedgerState {
    records: HashMap<String, PaymentRecordEntity>,
    balances: HashMap<Uuid, BigDecimal>,
    /// project id -> (current, target, progress)
    projects: HashMap<i64, (BigDecimal, BigDecimal, BigDecimal)>,
}

/// Ledger that mirrors the Postgres transaction's all-or-nothing behaviour
/// under a single lock.
#[derive(Default)]
pub struct InMemoryLedger {
    state: Mutex<LedgerState>,
}

impl InMemoryLedger {
    pub fn with_balance(user_id: Uuid, balance: i64) -> Self {
        let ledger = Self::default();
        ledger
            .state
            .lock()
            .unwrap()
            .balances
            .insert(user_id, BigDecimal::from(balance));
        ledger
    }

    pub fn add_project(&self, project_id: i64, current: i64, target: i64) {
        self.state.lock().unwrap().projects.insert(
            project_id,
            (BigDecimal::from(current), BigDecimal::from(target), BigDecimal::from(0)),
        );
    }

    pub fn balance_of(&self, user_id: Uuid) -> BigDecimal {
        self.state
            .lock()
            .unwrap()
            .balances
            .get(&user_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn project(&self, project_id: i64) -> Option<ProjectProgress> {
        self.state
            .lock()
            .unwrap()
            .projects
            .get(&project_id)
            .map(|(current, _, progress)| ProjectProgress {
                current_amount: current.clone(),
                progress_percentage: progress.clone(),
            })
    }

    pub fn record_count(&self) -> usize {
        self.state.lock().unwrap().records.len()
    }

    pub fn record(&self, reference: &str) -> Option<PaymentRecordEntity> {
        self.state.lock().unwrap().records.get(reference).cloned()
    }
}

#[async_trait]
impl LedgerRepository for InMemoryLedger {
    async fn is_reference_used(&self, reference: &str) -> Result<bool> {
        Ok(self.state.lock().unwrap().records.contains_key(reference))
    }

    async fn record_payment(&self, entry: LedgerEntry) -> Result<LedgerWriteOutcome> {
        let mut state = self.state.lock().unwrap();

        if state.records.contains_key(&entry.reference) {
            return Ok(LedgerWriteOutcome::DuplicateReference);
        }

        // Validate everything before touching state: a failure writes nothing.
        let balance = state
            .balances
            .get(&entry.user_id)
            .cloned()
            .ok_or_else(|| anyhow!("no balance row for user {}", entry.user_id))?;

        let progress = match entry.project_id {
            Some(project_id) => {
                let (current, target, _) = state
                    .projects
                    .get(&project_id)
                    .ok_or_else(|| anyhow!("fundraising project {} not found", project_id))?;
                Some((project_id, target.clone(), apply_credit(current, target, &entry.amount)))
            }
            None => None,
        };

        state
            .balances
            .insert(entry.user_id, balance + entry.amount.clone());
        if let Some((project_id, target, progress)) = progress {
            state.projects.insert(
                project_id,
                (progress.current_amount, target, progress.progress_percentage),
            );
        }

        let record = PaymentRecordEntity {
            id: Uuid::new_v4(),
            status: PaymentStatus::Completed.to_string(),
            status_label: entry.status_label.clone(),
            amount: entry.amount.clone(),
            total: entry.total.clone(),
            reference: entry.reference.clone(),
            rail: entry.rail.to_string(),
            payer_identifier: entry.payer_identifier.clone(),
            user_id: Some(entry.user_id),
            project_id: entry.project_id,
            raw_payload: entry.raw_payload.clone(),
            created_at: Utc::now(),
            payment_date: entry.payment_date,
        };
        state.records.insert(entry.reference, record.clone());

        Ok(LedgerWriteOutcome::Committed(record))
    }

    async fn project_exists(&self, project_id: i64) -> Result<bool> {
        Ok(self.state.lock().unwrap().projects.contains_key(&project_id))
    }

    async fn find_balance(&self, user_id: Uuid) -> Result<Option<UserBalanceEntity>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .balances
            .get(&user_id)
            .map(|balance| UserBalanceEntity {
                user_id,
                balance: balance.clone(),
                updated_at: Utc::now(),
            }))
    }

    async fn list_recent_payments(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<PaymentRecordEntity>> {
        let state = self.state.lock().unwrap();
        let mut records: Vec<_> = state
            .records
            .values()
            .filter(|record| record.user_id == Some(user_id))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(limit as usize);
        Ok(records)
    }
}

pub fn ledger_entry(reference: &str, amount: i64, user_id: Uuid) -> LedgerEntry {
    LedgerEntry::from_verified(
        VerifiedPayment {
            reference: reference.to_string(),
            amount: BigDecimal::from(amount),
            total: BigDecimal::from(amount),
            payer_identifier: None,
            raw_payload: json!({ "reference": reference }),
        },
        PaymentRail::Bank,
        user_id,
        None,
    )
}
