// Linkshelf state managers
// Managers own durable state: the local bookmark table and the pending operation queue.

pub mod bookmark_store;
pub mod pending_queue;
