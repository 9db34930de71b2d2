pub mod _entities;
pub mod customer_limits;
pub mod dead_letter;
pub mod event;
pub mod transaction;

pub use customer_limits::CustomerLimit;
pub use dead_letter::DeadLetterEntry;
pub use event::Event;
pub use transaction::{CreateTransactionRequest, Transaction, TransactionQueryFilters, TransactionStatus, TransactionType};
