//! Place page: Objects handed to the host UI for a selected place.
//!
//! [`PlacePageInfo`] is the domain record assembled for a selection.
//! [`MapObject::from_info`] decides what the host is shown: the user's
//! own position, a point from an API deep link, a saved bookmark or a
//! plain point of interest. Each variant carries only the fields the host
//! needs for it.

use std::collections::BTreeMap;

use crate::geometry::PointD;
use crate::message::FeatureId;

/// Kinds of feature metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetadataType {
    /// Cuisine.
    Cuisine,
    /// Opening hours.
    OpenHours,
    /// Phone number.
    Phone,
    /// Star rating.
    Stars,
    /// Operator.
    Operator,
    /// Web site.
    Website,
    /// Internet access.
    Internet,
    /// Elevation.
    Elevation,
    /// E-mail address.
    Email,
    /// Postal code.
    Postcode,
    /// Wikipedia article as `lang:Title`.
    Wikipedia,
}

/// Feature metadata, ordered by type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata(BTreeMap<MetadataType, String>);

impl Metadata {
    /// Empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value; empty values are removed.
    pub fn set(&mut self, kind: MetadataType, value: impl Into<String>) {
        let value = value.into();
        if value.is_empty() {
            self.0.remove(&kind);
        } else {
            self.0.insert(kind, value);
        }
    }

    /// Raw value of a type.
    pub fn get(&self, kind: MetadataType) -> Option<&str> {
        self.0.get(&kind).map(String::as_str)
    }

    /// Whether nothing is set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Mobile Wikipedia link for the `Wikipedia` entry.
    ///
    /// A value without a language prefix is returned as is. Spaces in the
    /// title become underscores and `%` is escaped.
    pub fn wiki_url(&self) -> Option<String> {
        let value = self.get(MetadataType::Wikipedia)?;
        let Some((lang, title)) = value.split_once(':') else {
            return Some(value.to_string());
        };
        let title = title.replace(' ', "_").replace('%', "%25");
        Some(format!("https://{lang}.m.wikipedia.org/wiki/{title}"))
    }

    /// Entries as shown to the host, with Wikipedia exported as its link.
    pub fn export(&self) -> Vec<(MetadataType, String)> {
        self.0
            .iter()
            .map(|(kind, value)| match kind {
                MetadataType::Wikipedia => (*kind, self.wiki_url().unwrap_or_else(|| value.clone())),
                _ => (*kind, value.clone()),
            })
            .collect()
    }
}

/// Geographic coordinates in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LatLon {
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lon: f64,
}

/// Ad networks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    /// Facebook audience network.
    Facebook,
    /// RB.
    Rb,
    /// MoPub.
    Mopub,
}

/// An ad slot on the place page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    /// Placement identifier.
    pub id: String,
    /// Network.
    pub kind: BannerKind,
}

/// Local ads state of a place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocalAdsStatus {
    /// Not eligible.
    #[default]
    NotAvailable,
    /// Could become a customer.
    Candidate,
    /// Paying customer.
    Customer,
}

/// Local ads details.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LocalAdInfo {
    /// Eligibility.
    pub status: LocalAdsStatus,
    /// Landing page.
    pub url: String,
}

/// Role of a route point mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteMarkType {
    /// Route start.
    Start,
    /// Intermediate stop.
    Intermediate,
    /// Route finish.
    Finish,
}

/// A place that is also a point of the planned route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutePointInfo {
    /// Role of the point.
    pub mark_type: RouteMarkType,
    /// Position among intermediate stops.
    pub intermediate_index: usize,
}

/// A saved bookmark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookmarkRef {
    /// Category index.
    pub category: usize,
    /// Index inside the category.
    pub bookmark: usize,
    /// Name the user gave the bookmark.
    pub name: String,
}

/// Everything known about a selected place.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlacePageInfo {
    /// Backing feature, if the place is a map feature.
    pub feature: Option<FeatureId>,
    /// Position in mercator space.
    pub mercator: PointD,
    /// Position in degrees.
    pub lat_lon: LatLon,
    /// Main title.
    pub title: String,
    /// Title in a second language.
    pub secondary_title: String,
    /// Type or category line.
    pub subtitle: String,
    /// Formatted address.
    pub address: String,
    /// Feature metadata.
    pub metadata: Metadata,
    /// Deep link the place came from.
    pub api_url: Option<String>,
    /// Bookmark the place is saved as.
    pub bookmark: Option<BookmarkRef>,
    /// Whether this is the user's own position.
    pub is_my_position: bool,
    /// Ad slots.
    pub banners: Vec<Banner>,
    /// Whether a taxi can be ordered here.
    pub reachable_by_taxi: bool,
    /// Booking search link.
    pub booking_search_url: String,
    /// Local ads details.
    pub local_ad: LocalAdInfo,
    /// Route point role, if the place is on the route.
    pub route_point: Option<RoutePointInfo>,
}

/// Kind of a [`MapObject`], with codes shared with the host.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapObjectType {
    /// Plain point of interest.
    Poi = 0,
    /// Point from an API deep link.
    ApiPoint = 1,
    /// Saved bookmark.
    Bookmark = 2,
    /// The user's own position.
    MyPosition = 3,
}

/// Fields every map object carries.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceSummary {
    /// Backing feature; default when the place is not a feature.
    pub feature: FeatureId,
    /// Main title.
    pub title: String,
    /// Title in a second language.
    pub secondary_title: String,
    /// Ad slots.
    pub banners: Vec<Banner>,
    /// Whether a taxi can be ordered here.
    pub reachable_by_taxi: bool,
    /// Booking search link.
    pub booking_search_url: String,
    /// Local ads details.
    pub local_ad: LocalAdInfo,
    /// Route point role.
    pub route_point: Option<RoutePointInfo>,
}

/// Location fields of the non-bookmark variants.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceLocation {
    /// Type or category line.
    pub subtitle: String,
    /// Position in degrees.
    pub lat_lon: LatLon,
    /// Formatted address.
    pub address: String,
}

/// What the host UI is given for a place.
#[derive(Debug, Clone, PartialEq)]
pub enum MapObject {
    /// The user's own position. Carries no metadata.
    MyPosition {
        /// Common fields.
        summary: PlaceSummary,
        /// Location fields.
        location: PlaceLocation,
    },
    /// A point from a deep link.
    ApiPoint {
        /// Common fields.
        summary: PlaceSummary,
        /// Location fields.
        location: PlaceLocation,
        /// Exported metadata.
        metadata: Vec<(MetadataType, String)>,
        /// The deep link.
        api_id: String,
    },
    /// A saved bookmark.
    Bookmark {
        /// Common fields.
        summary: PlaceSummary,
        /// Category index.
        category: usize,
        /// Index inside the category.
        bookmark: usize,
        /// Bookmark name.
        name: String,
        /// Exported metadata; empty unless backed by a feature.
        metadata: Vec<(MetadataType, String)>,
    },
    /// A plain point of interest.
    Poi {
        /// Common fields.
        summary: PlaceSummary,
        /// Location fields.
        location: PlaceLocation,
        /// Exported metadata; empty unless backed by a feature.
        metadata: Vec<(MetadataType, String)>,
    },
}

impl MapObject {
    /// Build the host object for a place.
    ///
    /// A bookmark wins over everything else, then the user's position,
    /// then a deep link; anything left is a point of interest.
    pub fn from_info(info: &PlacePageInfo) -> Self {
        let summary = PlaceSummary {
            feature: info.feature.clone().unwrap_or_default(),
            title: info.title.clone(),
            secondary_title: info.secondary_title.clone(),
            banners: info.banners.clone(),
            reachable_by_taxi: info.reachable_by_taxi,
            booking_search_url: info.booking_search_url.clone(),
            local_ad: info.local_ad.clone(),
            route_point: info.route_point,
        };
        let feature_metadata = || {
            if info.feature.is_some() {
                info.metadata.export()
            } else {
                Vec::new()
            }
        };

        if let Some(bookmark) = &info.bookmark {
            return Self::Bookmark {
                summary,
                category: bookmark.category,
                bookmark: bookmark.bookmark,
                name: bookmark.name.clone(),
                metadata: feature_metadata(),
            };
        }

        let location = PlaceLocation {
            subtitle: info.subtitle.clone(),
            lat_lon: info.lat_lon,
            address: info.address.clone(),
        };
        if info.is_my_position {
            return Self::MyPosition { summary, location };
        }
        if let Some(api_url) = &info.api_url {
            return Self::ApiPoint {
                summary,
                location,
                metadata: info.metadata.export(),
                api_id: api_url.clone(),
            };
        }
        Self::Poi { summary, location, metadata: feature_metadata() }
    }

    /// Kind of this object.
    pub const fn kind(&self) -> MapObjectType {
        match self {
            Self::MyPosition { .. } => MapObjectType::MyPosition,
            Self::ApiPoint { .. } => MapObjectType::ApiPoint,
            Self::Bookmark { .. } => MapObjectType::Bookmark,
            Self::Poi { .. } => MapObjectType::Poi,
        }
    }

    /// Common fields.
    pub const fn summary(&self) -> &PlaceSummary {
        match self {
            Self::MyPosition { summary, .. }
            | Self::ApiPoint { summary, .. }
            | Self::Bookmark { summary, .. }
            | Self::Poi { summary, .. } => summary,
        }
    }

    /// Exported metadata; empty for the user's position.
    pub fn metadata(&self) -> &[(MetadataType, String)] {
        match self {
            Self::MyPosition { .. } => &[],
            Self::ApiPoint { metadata, .. } | Self::Bookmark { metadata, .. } | Self::Poi { metadata, .. } => {
                metadata
            }
        }
    }

    /// Deep link of the object; empty unless it is an API point.
    pub fn api_id(&self) -> &str {
        match self {
            Self::ApiPoint { api_id, .. } => api_id,
            _ => "",
        }
    }
}
