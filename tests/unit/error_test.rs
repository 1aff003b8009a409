//! Tests for error types

use cron_pool::{AppResult, JobId, TimerError};

#[test]
fn test_error_display() {
    assert_eq!(TimerError::Closed.to_string(), "task timer is closed");
    let err = TimerError::InvalidSpec {
        spec: "x".into(),
        reason: "bad".into(),
    };
    assert_eq!(err.to_string(), "invalid schedule spec `x`: bad");
}

#[test]
fn test_existing_job_only_for_duplicates() {
    let dup = TimerError::DuplicateTask {
        name: "a".into(),
        job_id: JobId::new(3),
    };
    assert_eq!(dup.existing_job(), Some(JobId::new(3)));
    assert_eq!(TimerError::InstanceRemoved.existing_job(), None);
}

#[test]
fn test_converts_into_app_result() {
    fn fails() -> AppResult<()> {
        Err(TimerError::Closed)?;
        Ok(())
    }
    let err = fails().unwrap_err();
    assert!(err.downcast_ref::<TimerError>().is_some());
}
