//! External collaborators for CampusFlow -- data store, messaging, calendar,
//! ledger.
//!
//! Each collaborator is a narrow async trait defined in [`traits`]; the
//! workflows depend only on those traits.  The implementations shipped here
//! run entirely in process and are what the CLI and the tests use.

pub mod calendar;
pub mod error;
pub mod ledger;
pub mod messaging;
pub mod store;
pub mod traits;

pub use calendar::MockCalendar;
pub use error::{AdapterError, Result};
pub use ledger::{LedgerEntry, MockLedger};
pub use messaging::{MockMessenger, SentMessage};
pub use store::{InMemoryDataStore, Seed, demo_seed};
pub use traits::{
    Assignment, Calendar, DataStore, Ledger, LedgerReceipt, LogEntry, Meeting, MessageReceipt,
    Messenger, NewLogEntry, Student,
};
