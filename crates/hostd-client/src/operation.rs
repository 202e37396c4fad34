//! Handle to a background operation
//!
//! Calls that start long-running work on the host return an [`Operation`]
//! instead of blocking. The caller decides how long to wait: the handle only
//! polls when asked, and dropping it leaves the task running server-side.

use crate::error::HostError;
use crate::models::{OperationInfo, OperationStatus};
use crate::host_trait::HostClientTrait;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Client-side handle to a server-side task
#[derive(Debug, Clone)]
pub struct Operation {
    info: OperationInfo,
}

impl Operation {
    pub fn new(info: OperationInfo) -> Self {
        Self { info }
    }

    pub fn id(&self) -> &str {
        &self.info.id
    }

    /// Last snapshot read from the host
    pub fn info(&self) -> &OperationInfo {
        &self.info
    }

    pub fn status(&self) -> OperationStatus {
        self.info.state()
    }

    /// Re-read the operation once
    pub async fn poll<C>(&mut self, client: &C) -> Result<OperationStatus, HostError>
    where
        C: HostClientTrait + ?Sized,
    {
        self.info = client.get_operation(&self.info.id).await?;
        Ok(self.status())
    }

    /// Wait for a terminal state, giving up at `deadline`
    ///
    /// Success yields the final snapshot. Failure yields the host's error
    /// verbatim, cancellation yields [`HostError::OperationCancelled`]. When
    /// the deadline passes first the result is [`HostError::Timeout`] and the
    /// operation keeps running on the host.
    pub async fn wait_until<C>(
        &mut self,
        client: &C,
        deadline: Instant,
    ) -> Result<&OperationInfo, HostError>
    where
        C: HostClientTrait + ?Sized,
    {
        loop {
            if self.status().is_terminal() {
                return self.outcome();
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(self.timed_out());
            }
            let remaining = deadline - now;

            debug!(
                "Waiting up to {:?} for operation {} ({})",
                remaining,
                self.info.id,
                self.status()
            );
            match tokio::time::timeout(remaining, client.wait_operation(&self.info.id, remaining))
                .await
            {
                Ok(info) => self.info = info?,
                Err(_) => return Err(self.timed_out()),
            }
        }
    }

    /// Wait for at most `timeout` from now
    pub async fn wait<C>(&mut self, client: &C, timeout: Duration) -> Result<&OperationInfo, HostError>
    where
        C: HostClientTrait + ?Sized,
    {
        self.wait_until(client, Instant::now() + timeout).await
    }

    /// Ask the host to cancel the operation, then refresh the snapshot
    pub async fn cancel<C>(&mut self, client: &C) -> Result<(), HostError>
    where
        C: HostClientTrait + ?Sized,
    {
        client.cancel_operation(&self.info.id).await?;
        self.poll(client).await?;
        Ok(())
    }

    fn outcome(&self) -> Result<&OperationInfo, HostError> {
        match self.status() {
            OperationStatus::Success => Ok(&self.info),
            OperationStatus::Cancelled => Err(HostError::OperationCancelled(self.info.id.clone())),
            _ => Err(HostError::Api(if self.info.err.is_empty() {
                format!("operation {} failed", self.info.id)
            } else {
                self.info.err.clone()
            })),
        }
    }

    fn timed_out(&self) -> HostError {
        HostError::Timeout(format!(
            "operation {} still {} at deadline",
            self.info.id,
            self.status()
        ))
    }
}
