use crate::dispatcher::DispatchError;
use crate::scheduler::{CronError, ScheduleError};
use crate::task::DraftError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("task not found: {0}")]
    TaskNotFound(String),
    #[error("variable not found: {0}")]
    VariableNotFound(String),
    #[error("execution log not found: {0}")]
    LogNotFound(String),
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Draft(#[from] DraftError),
    #[error(transparent)]
    Cron(#[from] CronError),
    #[error("task '{0}' is already running")]
    AlreadyRunning(String),
    #[error("task '{0}' is not running")]
    NotRunning(String),
    #[error("task '{0}' is not scheduled")]
    NotScheduled(String),
    #[error("task '{0}' has no cron expression")]
    NoCronExpr(String),
    #[error("run aborted: {0}")]
    Aborted(String),
    #[error("persistence error: {0:#}")]
    Persistence(#[from] anyhow::Error),
}

impl From<DispatchError> for EngineError {
    fn from(e: DispatchError) -> Self {
        match e {
            DispatchError::NotFound(id) => EngineError::TaskNotFound(id),
            DispatchError::AlreadyRunning(name) => EngineError::AlreadyRunning(name),
            DispatchError::Aborted(reason) => EngineError::Aborted(reason),
        }
    }
}

impl From<ScheduleError> for EngineError {
    fn from(e: ScheduleError) -> Self {
        match e {
            ScheduleError::NotFound(id) => EngineError::TaskNotFound(id),
            ScheduleError::NoCronExpr(name) => EngineError::NoCronExpr(name),
            ScheduleError::NotScheduled(id) => EngineError::NotScheduled(id),
            ScheduleError::Cron(e) => EngineError::Cron(e),
        }
    }
}

impl EngineError {
    /// Errors caused by the caller's input rather than by state or I/O.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            EngineError::Invalid(_)
                | EngineError::Draft(_)
                | EngineError::Cron(_)
                | EngineError::NoCronExpr(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            EngineError::TaskNotFound(_)
                | EngineError::VariableNotFound(_)
                | EngineError::LogNotFound(_)
        )
    }

    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            EngineError::AlreadyRunning(_)
                | EngineError::NotRunning(_)
                | EngineError::NotScheduled(_)
        )
    }
}
