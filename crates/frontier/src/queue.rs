use feedcrawl_core::{CallbackResult, Request};

/// A single entry on the work queue: either a fetch waiting to happen, or
/// a callback's output waiting to be dispatched by the engine.
pub enum WorkItem {
    Request(Box<Request>),
    Callback(CallbackResult),
}

/// MPMC work queue shared by all engine workers. Backed by an async
/// channel rather than a mutex-guarded deque so pops from different
/// worker tasks never serialize behind a single lock.
pub struct WorkQueue {
    tx: async_channel::Sender<WorkItem>,
    rx: async_channel::Receiver<WorkItem>,
}

impl Default for WorkQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkQueue {
    pub fn new() -> Self {
        let (tx, rx) = async_channel::unbounded();
        Self { tx, rx }
    }

    pub fn push_request(&self, request: Request) {
        // Only fails if every receiver has been dropped, which only happens
        // after the engine has already decided to stop.
        let _ = self.tx.try_send(WorkItem::Request(Box::new(request)));
    }

    pub fn push_callback(&self, result: CallbackResult) {
        let _ = self.tx.try_send(WorkItem::Callback(result));
    }

    pub async fn pop(&self) -> Option<WorkItem> {
        self.rx.recv().await.ok()
    }

    pub fn close(&self) {
        self.rx.close();
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
