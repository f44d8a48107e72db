//! Treasury posting.

pub mod poster;

pub use poster::{PostingError, PostingReceipt, TreasuryPoster, UnitOfWork};
