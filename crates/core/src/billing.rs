//! Billing gate: which visits still owe money, and what came in today.

use crate::config::CoreConfig;
use crate::store::Store;
use crate::transaction::Transaction;
use crate::workflow::{VisitOverview, VisitService};
use crate::SimrsResult;
use chrono::{DateTime, NaiveDate, TimeZone};
use serde::Serialize;
use std::sync::Arc;

/// Visits with no paid transaction. A paid visit is never offered for payment again.
pub fn pending_visits(visits: Vec<VisitOverview>) -> Vec<VisitOverview> {
    visits.into_iter().filter(|v| !v.is_paid()).collect()
}

fn created_on<Tz: TimeZone>(transaction: &Transaction, now: &DateTime<Tz>) -> bool {
    transaction
        .created_at
        .with_timezone(&now.timezone())
        .date_naive()
        == now.date_naive()
}

/// Sum of every transaction created on `now`'s calendar day, pending ones included.
pub fn today_revenue<Tz: TimeZone>(transactions: &[Transaction], now: &DateTime<Tz>) -> u64 {
    transactions
        .iter()
        .filter(|t| created_on(t, now))
        .map(|t| t.amount)
        .sum()
}

/// Like [`today_revenue`] but counting only paid transactions.
pub fn today_paid_revenue<Tz: TimeZone>(transactions: &[Transaction], now: &DateTime<Tz>) -> u64 {
    transactions
        .iter()
        .filter(|t| t.is_paid() && created_on(t, now))
        .map(|t| t.amount)
        .sum()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TodayBilling {
    pub date: NaiveDate,
    pub transaction_count: usize,
    pub revenue: u64,
}

#[derive(Clone)]
pub struct BillingService {
    cfg: Arc<CoreConfig>,
    store: Arc<dyn Store>,
}

impl BillingService {
    pub fn new(cfg: Arc<CoreConfig>, store: Arc<dyn Store>) -> Self {
        Self { cfg, store }
    }

    /// Unpaid visits, newest first.
    pub fn pending(&self) -> SimrsResult<Vec<VisitOverview>> {
        let visits = VisitService::new(self.cfg.clone(), self.store.clone()).overviews()?;
        Ok(pending_visits(visits))
    }

    /// Today's transaction count and revenue in the clinic's time zone.
    pub fn today(&self) -> SimrsResult<TodayBilling> {
        let now = self.cfg.clinic_now();
        let transactions = self.store.transactions()?;
        Ok(TodayBilling {
            date: now.date_naive(),
            transaction_count: transactions.iter().filter(|t| created_on(t, &now)).count(),
            revenue: today_revenue(&transactions, &now),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::TransactionStatus;
    use crate::visit::{Visit, VisitStatus};
    use chrono::{FixedOffset, Utc};
    use simrs_types::{NonEmptyText, RecordId};

    fn transaction(amount: u64, status: TransactionStatus, at: DateTime<Utc>) -> Transaction {
        Transaction {
            id: RecordId::new(),
            visit_id: RecordId::new(),
            amount,
            status,
            created_at: at,
        }
    }

    fn overview(transactions: Vec<Transaction>) -> VisitOverview {
        VisitOverview {
            visit: Visit {
                id: RecordId::new(),
                patient_id: RecordId::new(),
                doctor: NonEmptyText::new("Poli Anak").unwrap(),
                status: VisitStatus::Registered,
                created_at: Utc::now(),
            },
            patient_name: "Budi".into(),
            transactions,
        }
    }

    #[test]
    fn paid_visits_never_appear_pending() {
        let now = Utc::now();
        let unpaid = overview(vec![]);
        let pending_only = overview(vec![transaction(5, TransactionStatus::Pending, now)]);
        let paid = overview(vec![
            transaction(5, TransactionStatus::Pending, now),
            transaction(5, TransactionStatus::Paid, now),
        ]);
        let paid_id = paid.visit.id;

        let pending = pending_visits(vec![unpaid, pending_only, paid]);
        assert_eq!(pending.len(), 2);
        assert!(pending.iter().all(|v| v.visit.id != paid_id));
    }

    #[test]
    fn today_revenue_counts_every_status_on_the_clinic_day() {
        let wib = FixedOffset::east_opt(7 * 3600).unwrap();
        let now = wib.with_ymd_and_hms(2024, 3, 2, 9, 0, 0).unwrap();
        let transactions = [
            // 01:30 WIB on the 2nd.
            transaction(100, TransactionStatus::Paid, Utc.with_ymd_and_hms(2024, 3, 1, 18, 30, 0).unwrap()),
            transaction(50, TransactionStatus::Pending, Utc.with_ymd_and_hms(2024, 3, 2, 3, 0, 0).unwrap()),
            // 23:00 WIB on the 1st.
            transaction(999, TransactionStatus::Paid, Utc.with_ymd_and_hms(2024, 3, 1, 16, 0, 0).unwrap()),
        ];

        assert_eq!(today_revenue(&transactions, &now), 150);
        assert_eq!(today_paid_revenue(&transactions, &now), 100);
        assert_eq!(today_revenue(&[], &now), 0);
    }
}
