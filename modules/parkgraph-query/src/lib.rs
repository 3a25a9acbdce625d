pub mod geocoder;
pub mod service;
pub mod traits;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use geocoder::NominatimGeocoder;
pub use service::{FilterOptions, QueryService, ADDRESS_SEARCH_RADIUS_M};
pub use traits::{Geocoder, GraphLookup};
