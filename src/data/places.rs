use crate::geo::GeoCoordinate;
use std::collections::BTreeSet;

/// A named city used as an attack endpoint
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct City {
    pub name: &'static str,
    /// ISO 3166-1 numeric code of the country it sits in
    pub country: u16,
    pub coord: GeoCoordinate,
}

const fn city(name: &'static str, country: u16, lon: f64, lat: f64) -> City {
    City {
        name,
        country,
        coord: GeoCoordinate::new(lon, lat),
    }
}

/// Default endpoint pool
pub const CORE_CITIES: [City; 10] = [
    city("São Paulo", 76, -46.6333, -23.5505),
    city("New York", 840, -74.006, 40.7128),
    city("London", 826, -0.1278, 51.5074),
    city("Tokyo", 392, 139.6503, 35.6762),
    city("Hong Kong", 344, 114.1095, 22.3964),
    city("Sydney", 36, 151.2093, -33.8688),
    city("Moscow", 643, 37.6173, 55.7558),
    city("Paris", 250, 2.3522, 48.8566),
    city("Singapore", 702, 103.8198, 1.3521),
    city("Cape Town", 710, 18.4241, -33.9249),
];

/// Added to the pool when the city density toggle is on
pub const EXTRA_CITIES: [City; 14] = [
    city("Los Angeles", 840, -118.2437, 34.0522),
    city("Washington", 840, -77.0369, 38.9072),
    city("Beijing", 156, 116.4074, 39.9042),
    city("Shanghai", 156, 121.4737, 31.2304),
    city("Saint Petersburg", 643, 30.3351, 59.9343),
    city("Berlin", 276, 13.405, 52.52),
    city("Mumbai", 356, 72.8777, 19.076),
    city("Seoul", 410, 126.978, 37.5665),
    city("Tehran", 364, 51.389, 35.6892),
    city("Kyiv", 804, 30.5234, 50.4501),
    city("Mexico City", 484, -99.1332, 19.4326),
    city("Buenos Aires", 32, -58.3816, -34.6037),
    city("Lagos", 566, 3.3792, 6.5244),
    city("Toronto", 124, -79.3832, 43.6532),
];

/// Countries that draw most of the simulated traffic, by ISO numeric code
pub const HIGH_INTENSITY_COUNTRIES: [u16; 13] = [
    840, // United States
    156, // China
    643, // Russia
    76,  // Brazil
    356, // India
    276, // Germany
    826, // United Kingdom
    250, // France
    364, // Iran
    408, // North Korea
    804, // Ukraine
    392, // Japan
    410, // South Korea
];

/// Region ids accepted by the region filter
pub const REGIONS: [(&str, &[u16]); 5] = [
    ("USA", &[840]),
    ("CHINA", &[156]),
    ("RUSSIA", &[643]),
    ("EUROPE", &[276, 250, 826, 380, 724, 616, 528, 804]),
    ("ASIA", &[156, 356, 392, 410, 408, 364]),
];

/// Region set the filter toggle switches to
pub const FOCUS_REGIONS: [&str; 3] = ["USA", "CHINA", "RUSSIA"];

pub fn city_pool(include_extra: bool) -> Vec<City> {
    let mut pool = CORE_CITIES.to_vec();
    if include_extra {
        pool.extend_from_slice(&EXTRA_CITIES);
    }
    pool
}

/// Country codes covered by the given region ids; unknown ids are ignored
pub fn region_countries(regions: &BTreeSet<String>) -> BTreeSet<u16> {
    REGIONS
        .iter()
        .filter(|(id, _)| regions.iter().any(|r| r.eq_ignore_ascii_case(id)))
        .flat_map(|(_, codes)| codes.iter().copied())
        .collect()
}

pub fn is_known_region(id: &str) -> bool {
    REGIONS.iter().any(|(r, _)| r.eq_ignore_ascii_case(id))
}
