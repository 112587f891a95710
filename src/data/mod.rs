pub mod bar;
pub mod loader;

pub use bar::{Bar, BarError, RawBar};
pub use loader::{load_clean_csv, load_raw_csv, parse_naive, parse_timestamp};
