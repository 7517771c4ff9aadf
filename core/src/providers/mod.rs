/// Network collaborators that discover what is around the traveller
pub mod places;

pub use places::{
    is_same_poi, PhotoRef, PlaceLookup, PlacesClient, PlacesConfig, PoiKey, PointOfInterest,
    MAX_RESULTS,
};
