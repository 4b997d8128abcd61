use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("amount must be greater than zero")]
    InvalidAmount,
}

/// One recorded income or expense line. Immutable once appended; entries
/// carry no identifier or timestamp and cannot be edited or deleted.
///
/// Serde names match the on-disk document keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    #[serde(rename = "concepto")]
    pub concept: String,
    #[serde(rename = "monto")]
    pub amount: Decimal,
}

/// Income and expense records for one user, with derived totals.
///
/// Invariant: every stored amount is strictly positive, enforced at
/// insertion. Totals and balance are always recomputed from the entry
/// lists and never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    #[serde(rename = "ingresos", default)]
    pub incomes: Vec<Entry>,
    #[serde(rename = "gastos", default)]
    pub expenses: Vec<Entry>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_income(&mut self, amount: Decimal, concept: &str) -> Result<(), LedgerError> {
        Self::push(&mut self.incomes, amount, concept)
    }

    pub fn add_expense(&mut self, amount: Decimal, concept: &str) -> Result<(), LedgerError> {
        Self::push(&mut self.expenses, amount, concept)
    }

    fn push(entries: &mut Vec<Entry>, amount: Decimal, concept: &str) -> Result<(), LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount);
        }
        entries.push(Entry {
            concept: concept.to_string(),
            amount,
        });
        Ok(())
    }

    pub fn total_incomes(&self) -> Decimal {
        self.incomes.iter().map(|e| e.amount).sum()
    }

    pub fn total_expenses(&self) -> Decimal {
        self.expenses.iter().map(|e| e.amount).sum()
    }

    pub fn balance(&self) -> Decimal {
        self.total_incomes() - self.total_expenses()
    }

    /// Full projection of the ledger, recomputed on every call.
    pub fn detail(&self) -> LedgerDetail {
        LedgerDetail {
            incomes: self.incomes.clone(),
            expenses: self.expenses.clone(),
            total_incomes: self.total_incomes(),
            total_expenses: self.total_expenses(),
            balance: self.balance(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerDetail {
    #[serde(rename = "ingresos")]
    pub incomes: Vec<Entry>,
    #[serde(rename = "gastos")]
    pub expenses: Vec<Entry>,
    #[serde(rename = "total_ingresos")]
    pub total_incomes: Decimal,
    #[serde(rename = "total_gastos")]
    pub total_expenses: Decimal,
    pub balance: Decimal,
}

/// Durable record for one user: the opaque credential hash plus the
/// ledger snapshot. The hash is fixed at registration; the snapshot is
/// overwritten on every successful entry addition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(rename = "password")]
    pub password_hash: String,
    #[serde(rename = "movimientos", default)]
    pub movements: Ledger,
}

/// The whole persisted document: every user, keyed by username.
/// BTreeMap keeps the serialized key order deterministic.
pub type UserMap = BTreeMap<String, UserRecord>;
