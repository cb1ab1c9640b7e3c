pub use directory_entry::*;

mod directory_entry;
