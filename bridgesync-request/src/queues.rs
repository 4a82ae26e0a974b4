use tokio::runtime::Handle;

/// The runtimes a request runs its work on.
///
/// Remote operations are spawned on `remote`; translation, graph building
/// and hops into the store context use the blocking pool of `compute`.
#[derive(Debug, Clone)]
pub struct ExecutionQueues {
    pub remote: Handle,
    pub compute: Handle,
}

impl ExecutionQueues {
    pub fn new(remote: Handle, compute: Handle) -> Self {
        Self { remote, compute }
    }

    /// Uses the current runtime for both queues.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a tokio runtime.
    pub fn current() -> Self {
        let handle = Handle::current();
        Self {
            remote: handle.clone(),
            compute: handle,
        }
    }
}
