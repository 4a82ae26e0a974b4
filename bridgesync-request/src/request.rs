use bridgesync_model::ObjectHandle;
use bridgesync_store::StoreContext;

/// The inputs of one request.
#[derive(Debug, Clone)]
pub struct Request<Q> {
    /// Context the local-to-remote hooks run in.
    pub store: StoreContext,
    /// Context the results are imported into, when not `store`.
    pub import_store: Option<StoreContext>,
    /// Bridge-specific description of the request.
    pub query: Q,
    /// Object the root representation should update.
    pub update_target: Option<ObjectHandle>,
}

impl<Q> Request<Q> {
    pub fn new(store: StoreContext, query: Q) -> Self {
        Self {
            store,
            import_store: None,
            query,
            update_target: None,
        }
    }

    pub fn with_import_store(mut self, store: StoreContext) -> Self {
        self.import_store = Some(store);
        self
    }

    pub fn with_update_target(mut self, target: ObjectHandle) -> Self {
        self.update_target = Some(target);
        self
    }

    pub fn import_store(&self) -> &StoreContext {
        self.import_store.as_ref().unwrap_or(&self.store)
    }
}
