use rust_decimal::Decimal;
use sea_orm::{ConnectionTrait, DatabaseConnection, TransactionTrait};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::PayrollError;

/// Shape shared by every per-period payroll computation
///
/// A run selects its candidates (employees plus whatever inputs they need),
/// computes a line for each eligible candidate without touching the store,
/// then persists the lines and its aggregate.
#[allow(async_fn_in_trait)]
pub trait PayrollRun {
    type Candidate;
    type Line;
    type Outcome;

    /// Short name used in logs
    fn name(&self) -> &'static str;

    async fn select<C: ConnectionTrait>(&self, db: &C) -> Result<Vec<Self::Candidate>, PayrollError>;

    /// `None` skips the candidate
    fn compute(&self, candidate: &Self::Candidate) -> Option<Self::Line>;

    async fn persist<C: ConnectionTrait>(&self, db: &C, considered: usize, lines: Vec<Self::Line>) -> Result<Self::Outcome, PayrollError>;
}

/// Pending payouts of a payment period moved to processed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedPeriod {
    pub payment_period: String,
    pub processed_count: usize,
    pub total_amount: Decimal,
}

/// Runs `run` inside a single transaction
pub async fn execute<R: PayrollRun>(run: &R, db: &DatabaseConnection) -> Result<R::Outcome, PayrollError> {
    let txn = db.begin().await?;

    let candidates = run.select(&txn).await?;
    let lines = candidates.iter()
        .filter_map(|candidate| run.compute(candidate))
        .collect::<Vec<_>>();

    info!(run = run.name(), considered = candidates.len(), eligible = lines.len(), "payroll run computed");

    let outcome = run.persist(&txn, candidates.len(), lines).await?;
    txn.commit().await?;

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use sea_orm::{DatabaseBackend, MockDatabase};

    use super::*;

    struct Doubling {
        persisted: Cell<Option<(usize, Vec<i32>)>>,
    }

    impl PayrollRun for Doubling {
        type Candidate = i32;
        type Line = i32;
        type Outcome = i32;

        fn name(&self) -> &'static str {
            "doubling"
        }

        async fn select<C: ConnectionTrait>(&self, _db: &C) -> Result<Vec<i32>, PayrollError> {
            Ok(vec![1, -2, 3])
        }

        fn compute(&self, candidate: &i32) -> Option<i32> {
            (*candidate > 0).then(|| candidate * 2)
        }

        async fn persist<C: ConnectionTrait>(&self, _db: &C, considered: usize, lines: Vec<i32>) -> Result<i32, PayrollError> {
            let total = lines.iter().sum();
            self.persisted.set(Some((considered, lines)));

            Ok(total)
        }
    }

    #[actix_web::test]
    async fn test_execute_skips_and_persists() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let run = Doubling { persisted: Cell::new(None) };

        let total = execute(&run, &db).await.unwrap();

        assert_eq!(total, 8);
        assert_eq!(run.persisted.take(), Some((3, vec![2, 6])));
    }
}
