//! Metrics over a batch of outcomes sent from one request

use std::collections::BTreeMap;

use serde::Serialize;

use crate::errors::{SharedError, SharedResult};
use crate::outcome::TransactionOutcome;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub count: usize,
    pub approved: usize,
    /// Mean over outcomes that carry a response time
    pub average_response_time: f64,
    /// STANs seen more than once, in ascending order
    pub duplicate_stans: Vec<String>,
    pub missing_stans: usize,
}

impl BatchSummary {
    pub fn from_outcomes(outcomes: &[TransactionOutcome]) -> Self {
        let mut stans: BTreeMap<&str, usize> = BTreeMap::new();
        let mut missing_stans = 0;
        for outcome in outcomes {
            match outcome.stan.as_deref().map(str::trim) {
                Some(stan) if !stan.is_empty() => *stans.entry(stan).or_insert(0) += 1,
                _ => missing_stans += 1,
            }
        }

        let times: Vec<u64> = outcomes.iter().filter_map(|o| o.response_time).collect();
        let average_response_time = if times.is_empty() {
            0.0
        } else {
            times.iter().map(|&t| u128::from(t)).sum::<u128>() as f64 / times.len() as f64
        };

        Self {
            count: outcomes.len(),
            approved: outcomes.iter().filter(|o| o.success).count(),
            average_response_time,
            duplicate_stans: stans
                .into_iter()
                .filter(|(_, seen)| *seen > 1)
                .map(|(stan, _)| stan.to_string())
                .collect(),
            missing_stans,
        }
    }

    pub fn all_approved(&self) -> bool {
        self.count > 0 && self.approved == self.count
    }

    /// Every outcome carries a STAN and no two share one
    pub fn require_unique_stans(&self) -> SharedResult<()> {
        if self.missing_stans > 0 {
            return Err(SharedError::ValidationFailed {
                field: "stan".to_string(),
                reason: format!("{} of {} replies carry no STAN", self.missing_stans, self.count),
            });
        }
        if !self.duplicate_stans.is_empty() {
            return Err(SharedError::ValidationFailed {
                field: "stan".to_string(),
                reason: format!("duplicates {}", self.duplicate_stans.join(", ")),
            });
        }
        Ok(())
    }
}
