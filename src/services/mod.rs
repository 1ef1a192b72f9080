pub mod orders;
pub mod products;
pub mod sheets_sync;
