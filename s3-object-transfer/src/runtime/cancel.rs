/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{self, Error};

/// Signals that an operation must stop: the client's token fired or the operation deadline
/// passed.
#[derive(Debug, Clone, Default)]
pub(crate) struct Cancellation {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Cancellation {
    pub(crate) fn new(token: CancellationToken, deadline: Option<Instant>) -> Self {
        Self { token, deadline }
    }

    /// Returns an error if the operation must stop now
    pub(crate) fn check(&self) -> Result<(), Error> {
        if self.token.is_cancelled() {
            return Err(error::operation_cancelled());
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(error::deadline_elapsed()),
            _ => Ok(()),
        }
    }

    /// Resolves with the reason once the operation must stop
    pub(crate) async fn cancelled(&self) -> Error {
        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.token.cancelled() => error::operation_cancelled(),
            _ = deadline => error::deadline_elapsed(),
        }
    }
}

impl From<CancellationToken> for Cancellation {
    fn from(token: CancellationToken) -> Self {
        Self::new(token, None)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::Instant;
    use tokio_util::sync::CancellationToken;

    use super::Cancellation;
    use crate::error::ErrorKind;

    #[tokio::test(start_paused = true)]
    async fn test_deadline() {
        let cancel = Cancellation::new(
            CancellationToken::new(),
            Some(Instant::now() + Duration::from_secs(5)),
        );
        assert!(cancel.check().is_ok());

        let start = Instant::now();
        let err = cancel.cancelled().await;
        assert_eq!(&ErrorKind::OperationCancelled, err.kind());
        assert_eq!(Duration::from_secs(5), start.elapsed());
        assert!(cancel.check().is_err());
    }

    #[tokio::test]
    async fn test_token() {
        let token = CancellationToken::new();
        let cancel = Cancellation::from(token.clone());
        assert!(cancel.check().is_ok());
        token.cancel();
        assert!(cancel.check().unwrap_err().is_cancellation());
        assert!(cancel.cancelled().await.is_cancellation());
    }
}
