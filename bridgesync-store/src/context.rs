use bridgesync_model::{LocalStore, StoreError, StoreResult};
use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;

/// Serialized access to a local store.
///
/// Cloning a context shares the same store; all work submitted through any
/// clone runs one block at a time.
#[derive(Clone)]
pub struct StoreContext {
    store: Arc<Mutex<dyn LocalStore>>,
}

impl StoreContext {
    pub fn new<S: LocalStore + 'static>(store: S) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
        }
    }

    /// Runs `f` with exclusive access to the store, blocking the current
    /// thread until the context is free.
    pub fn perform<T>(&self, f: impl FnOnce(&mut dyn LocalStore) -> T) -> StoreResult<T> {
        let mut store = self.store.lock().map_err(|_| StoreError::ContextPoisoned)?;
        Ok(f(&mut *store))
    }

    /// Runs `f` inside the context from async code, on the blocking pool of
    /// the current runtime.
    pub async fn perform_async<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut dyn LocalStore) -> T + Send + 'static,
    {
        self.perform_on(&Handle::current(), f).await
    }

    /// Runs `f` inside the context on the blocking pool of `runtime`.
    pub async fn perform_on<T, F>(&self, runtime: &Handle, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut dyn LocalStore) -> T + Send + 'static,
    {
        let context = self.clone();
        runtime
            .spawn_blocking(move || context.perform(f))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }

    /// Whether both contexts serialize access to the same store.
    pub fn same_store(&self, other: &StoreContext) -> bool {
        Arc::ptr_eq(&self.store, &other.store)
    }
}

impl fmt::Debug for StoreContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreContext")
            .field("store", &Arc::as_ptr(&self.store).cast::<()>())
            .finish()
    }
}
