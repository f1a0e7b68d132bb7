// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::future::Future;

use log::debug;
use tokio::{select, task::JoinHandle};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

/// The tasks launched on behalf of one controller. Closing the scope drops
/// every task that is still running, which runs their cleanup guards.
#[derive(Default)]
pub(crate) struct Scope {
    cancel: CancellationToken,
    tracker: TaskTracker,
}

impl Scope {
    pub(crate) fn spawn<F>(&self, task: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let cancel = self.cancel.clone();
        self.tracker.spawn(async move {
            select! {
                biased;
                () = cancel.cancelled() => debug!("Dropped a task because its scope was closed"),
                () = task => {}
            }
        })
    }

    /// Cancels outstanding tasks. Anything spawned afterwards is cancelled
    /// immediately.
    pub(crate) fn close(&self) {
        self.cancel.cancel();
        _ = self.tracker.close();
    }

    #[cfg(test)]
    pub(crate) fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Waits for every task spawned so far.
    pub(crate) async fn wait(&self) {
        _ = self.tracker.close();
        self.tracker.wait().await;
        _ = self.tracker.reopen();
    }
}
