// Consistent exit codes for the canvas CLI.
//
//   0  = success
//   1  = general error
//   2  = usage/argument error
//   12 = conflict (a save lost to a newer remote version)
//   13 = network error (store unreachable or misbehaving)
//   14 = document not found

use std::process;

use canvas_sync::{StoreError, SyncError};

/// Named exit codes for the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    Error = 1,
    Usage = 2,
    Conflict = 12,
    Network = 13,
    NotFound = 14,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Map an anyhow error to an exit code by inspecting the error chain.
    pub fn from_error(err: &anyhow::Error) -> Self {
        for cause in err.chain() {
            if let Some(sync_err) = cause.downcast_ref::<SyncError>() {
                return Self::from_sync_error(sync_err);
            }
            if let Some(store_err) = cause.downcast_ref::<StoreError>() {
                return Self::from_store_error(store_err);
            }
            if cause.downcast_ref::<clap::Error>().is_some() {
                return Self::Usage;
            }
        }
        Self::Error
    }

    pub fn from_sync_error(err: &SyncError) -> Self {
        match err {
            SyncError::NetworkFailure(store_err) => Self::from_store_error(store_err),
            SyncError::StaleWrite(_) => Self::Conflict,
            SyncError::NotFound(_) => Self::NotFound,
            SyncError::NotOpen(_) | SyncError::ControllerStopped => Self::Error,
        }
    }

    pub fn from_store_error(err: &StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => Self::NotFound,
            StoreError::InvalidUrl(_) => Self::Usage,
            StoreError::Transport(_)
            | StoreError::Status { .. }
            | StoreError::Malformed(_)
            | StoreError::Rejected(_) => Self::Network,
        }
    }
}

impl From<ExitCode> for process::ExitCode {
    fn from(code: ExitCode) -> Self {
        process::ExitCode::from(code.code() as u8)
    }
}
