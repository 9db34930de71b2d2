pub use super::customer_limits::Entity as CustomerLimits;
pub use super::dead_letter::Entity as DeadLetter;
pub use super::events::Entity as Events;
pub use super::locks::Entity as Locks;
pub use super::transactions::Entity as Transactions;
