//! Domain module - listing data and page addressing
//!
//! Pure types and functions with no I/O.

pub mod car_attribute;
pub mod car_record;
pub mod listing_url;
pub mod pagination;

pub use car_attribute::RawAttribute;
pub use car_record::{KNOWN_FIELDS, NormalizedCarRecord, is_known_field, populated_columns};
pub use listing_url::ListingUrl;
pub use pagination::{PageUrlError, PageUrlGenerator};
