/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::fmt;

use aws_sdk_s3::error::ProvideErrorMetadata;

/// A boxed error that is `Send` and `Sync`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors returned by this library
///
/// NOTE: Use [`aws_smithy_types::error::display::DisplayErrorContext`] or similar to display
/// the entire error cause/source chain.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    source: BoxError,
}

/// General categories of transfer errors.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Operation input validation issues (e.g. uploading an object without a body).
    ///
    /// These are reported before any request is sent and are never retried.
    InputInvalid,

    /// I/O errors
    IOError,

    /// Some kind of internal runtime issue (e.g. task failure, poisoned mutex, etc)
    RuntimeError,

    /// Resource not found (e.g. bucket or key not found)
    NotFound,

    /// The remote store rejected or failed a request
    StoreError,

    /// The operation kept failing after the configured number of retries
    RetriesExhausted,

    /// The object body was written but replacing its access control policy failed.
    ///
    /// The body is not rolled back.
    AclNotApplied,

    /// The operation was abandoned because its cancellation token fired or its deadline passed
    OperationCancelled,
}

impl Error {
    /// Creates a new transfer [`Error`] from a known kind of error as well as an arbitrary error
    /// source.
    pub fn new<E>(kind: ErrorKind, err: E) -> Error
    where
        E: Into<BoxError>,
    {
        Error {
            kind,
            source: err.into(),
        }
    }

    /// Returns the corresponding [`ErrorKind`] for this error.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Returns true if this error, or any error in its source chain, is a cancellation.
    pub fn is_cancellation(&self) -> bool {
        if self.kind == ErrorKind::OperationCancelled {
            return true;
        }
        let mut next = std::error::Error::source(self);
        while let Some(err) = next {
            if let Some(err) = err.downcast_ref::<Error>() {
                if err.kind == ErrorKind::OperationCancelled {
                    return true;
                }
            }
            next = err.source();
        }
        false
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::InputInvalid => write!(f, "invalid input"),
            ErrorKind::IOError => write!(f, "I/O error"),
            ErrorKind::RuntimeError => write!(f, "runtime error"),
            ErrorKind::NotFound => write!(f, "resource not found"),
            ErrorKind::StoreError => write!(f, "object store request failed"),
            ErrorKind::RetriesExhausted => write!(f, "retries exhausted"),
            ErrorKind::AclNotApplied => {
                write!(f, "object written but access control policy not applied")
            }
            ErrorKind::OperationCancelled => write!(f, "operation cancelled"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::new(ErrorKind::RuntimeError, value)
    }
}

impl From<aws_smithy_types::error::operation::BuildError> for Error {
    fn from(value: aws_smithy_types::error::operation::BuildError) -> Self {
        Self::new(ErrorKind::InputInvalid, value)
    }
}

impl From<aws_smithy_types::byte_stream::error::Error> for Error {
    fn from(value: aws_smithy_types::byte_stream::error::Error) -> Self {
        Self::new(ErrorKind::IOError, value)
    }
}

impl<E, R> From<aws_sdk_s3::error::SdkError<E, R>> for Error
where
    E: std::error::Error + ProvideErrorMetadata + Send + Sync + 'static,
    R: Send + Sync + fmt::Debug + 'static,
{
    fn from(value: aws_sdk_s3::error::SdkError<E, R>) -> Self {
        let kind = match value.code() {
            Some("NotFound" | "NoSuchKey" | "NoSuchBucket" | "NoSuchVersion") => {
                ErrorKind::NotFound
            }
            _ => ErrorKind::StoreError,
        };

        Error::new(kind, value)
    }
}

pub(crate) fn invalid_input<E>(err: E) -> Error
where
    E: Into<BoxError>,
{
    Error::new(ErrorKind::InputInvalid, err)
}

pub(crate) fn retries_exhausted(attempts: u32, last_err: Error) -> Error {
    Error::new(
        ErrorKind::RetriesExhausted,
        RetriesExhausted {
            attempts,
            source: last_err,
        },
    )
}

pub(crate) fn acl_not_applied(err: Error) -> Error {
    Error::new(ErrorKind::AclNotApplied, err)
}

static CANCELLATION_ERROR: &str = "operation cancelled before it could complete";

pub(crate) fn operation_cancelled() -> Error {
    Error::new(ErrorKind::OperationCancelled, CANCELLATION_ERROR)
}

static DEADLINE_ERROR: &str = "operation deadline elapsed";

pub(crate) fn deadline_elapsed() -> Error {
    Error::new(ErrorKind::OperationCancelled, DEADLINE_ERROR)
}

/// The last error seen by a retried operation along with how many attempts were made
#[derive(Debug)]
struct RetriesExhausted {
    attempts: u32,
    source: Error,
}

impl fmt::Display for RetriesExhausted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "request failed after {} attempts", self.attempts)
    }
}

impl std::error::Error for RetriesExhausted {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}
