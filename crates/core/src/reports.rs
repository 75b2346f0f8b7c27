//! Management summary figures.
//!
//! Revenue here counts paid transactions only, unlike the billing desk's running total.

use crate::billing::today_paid_revenue;
use crate::config::CoreConfig;
use crate::store::Store;
use crate::visit::VisitStatus;
use crate::SimrsResult;
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub registered: usize,
    pub in_consultation: usize,
    pub closed: usize,
    pub paid: usize,
}

impl StatusCounts {
    fn add(&mut self, status: VisitStatus) {
        match status {
            VisitStatus::Registered => self.registered += 1,
            VisitStatus::InConsultation => self.in_consultation += 1,
            VisitStatus::Closed => self.closed += 1,
            VisitStatus::Paid => self.paid += 1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub date: NaiveDate,
    pub total_patients: usize,
    pub total_visits: usize,
    pub visits_today: usize,
    pub total_revenue: u64,
    pub revenue_today: u64,
    pub status_counts: StatusCounts,
}

#[derive(Clone)]
pub struct ReportService {
    cfg: Arc<CoreConfig>,
    store: Arc<dyn Store>,
}

impl ReportService {
    pub fn new(cfg: Arc<CoreConfig>, store: Arc<dyn Store>) -> Self {
        Self { cfg, store }
    }

    pub fn summary(&self) -> SimrsResult<ReportSummary> {
        let now = self.cfg.clinic_now();
        let today = now.date_naive();
        let visits = self.store.visits()?;
        let transactions = self.store.transactions()?;

        let mut status_counts = StatusCounts::default();
        for visit in &visits {
            status_counts.add(visit.status);
        }

        Ok(ReportSummary {
            date: today,
            total_patients: self.store.patients()?.len(),
            total_visits: visits.len(),
            visits_today: visits
                .iter()
                .filter(|v| self.cfg.clinic_date(v.created_at) == today)
                .count(),
            total_revenue: transactions
                .iter()
                .filter(|t| t.is_paid())
                .map(|t| t.amount)
                .sum(),
            revenue_today: today_paid_revenue(&transactions, &now),
            status_counts,
        })
    }
}
