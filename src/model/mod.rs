pub mod board_sync;
pub mod ticket;

pub use board_sync::BoardSyncRequest;
pub use ticket::Ticket;
