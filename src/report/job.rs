use std::fmt;

use crate::{
    error::{Error, Result},
    types::{FeeTotals, JobId, PoolKey, TimeRange},
};

/// Lifecycle of a report job.
///
/// ```text
/// Pending -> InProgress -> Completed
///                      \-> Failed
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum ReportStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// The only allowed forward transitions, anything else is
    /// [`Error::InvalidTransition`].
    pub fn advance(self, next: ReportStatus) -> Result<ReportStatus> {
        use ReportStatus::*;
        match (self, next) {
            (Pending, InProgress) | (InProgress, Completed) | (InProgress, Failed) => Ok(next),
            (from, to) => Err(Error::InvalidTransition { from, to }),
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request to aggregate the fees of a pool over a time range.
#[derive(Clone, Debug, PartialEq)]
pub struct ReportJob {
    id: JobId,
    key: PoolKey,
    range: TimeRange,
    status: ReportStatus,
    totals: FeeTotals,
}

impl ReportJob {
    /// New pending job with a random ID.
    pub fn new(key: PoolKey, range: TimeRange) -> Self {
        Self {
            id: JobId::new_v4(),
            key,
            range,
            status: ReportStatus::Pending,
            totals: FeeTotals::default(),
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn key(&self) -> PoolKey {
        self.key
    }

    pub fn range(&self) -> TimeRange {
        self.range
    }

    pub fn status(&self) -> ReportStatus {
        self.status
    }

    /// Totals of the report, available once the job is completed.
    pub fn aggregates(&self) -> Option<FeeTotals> {
        (self.status == ReportStatus::Completed).then_some(self.totals)
    }

    pub(crate) fn advance(&mut self, next: ReportStatus) -> Result<()> {
        self.status = self.status.advance(next)?;
        Ok(())
    }

    pub(crate) fn complete(&mut self, totals: FeeTotals) -> Result<()> {
        self.advance(ReportStatus::Completed)?;
        self.totals = totals;
        Ok(())
    }
}
