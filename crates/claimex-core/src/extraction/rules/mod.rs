//! Rule helpers shared by matchers, conversion and post-processing.

pub mod amounts;
pub mod dates;
pub mod patterns;

pub use amounts::{format_currency, format_vnd_amount, parse_vnd_amount};
pub use dates::{format_date, is_dmy_shaped, parse_date, parse_dmy};
pub use patterns::{VIETNAMESE_LETTER, VIETNAMESE_NAME};
