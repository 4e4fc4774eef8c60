//! Routing API client and route-to-segment transformation.

use serde::Deserialize;

use tachosim_common::{GeoPosition, PositionSegment, SpeedSegment};

use crate::config::RoutingApiConfig;

/// Mean Earth radius, kilometers.
const EARTH_RADIUS_KM: f64 = 6371.008_771_4;

/// Segments shorter than this are merged away (they carry no useful motion).
const MIN_SEGMENT_METERS: f64 = 1.0;

/// Error type for route generation.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("Routing API request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Routing API returned no route")]
    MissingRoute,
}

/// One step of the computed route, as returned by the API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteStep {
    pub distance_meters: f64,
    /// Duration string, e.g. `"137s"`.
    pub static_duration: String,
    pub polyline: Polyline,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Polyline {
    pub encoded_polyline: String,
}

#[derive(Debug, Deserialize)]
struct RoutesResponse {
    #[serde(default)]
    routes: Vec<Route>,
}

#[derive(Debug, Deserialize)]
struct Route {
    #[serde(default)]
    legs: Vec<RouteLeg>,
}

#[derive(Debug, Deserialize)]
struct RouteLeg {
    #[serde(default)]
    steps: Vec<RouteStep>,
}

/// The generated feed payloads: one list per simulator, index-aligned.
#[derive(Debug, Default)]
pub struct RoutePlan {
    pub positions: Vec<PositionSegment>,
    pub speeds: Vec<SpeedSegment>,
}

/// Request the route and return the steps of its first leg.
pub async fn fetch_route_steps(api: &RoutingApiConfig) -> Result<Vec<RouteStep>, RouteError> {
    let body = serde_json::json!({
        "origin": { "address": api.origin },
        "destination": { "address": api.destination },
        "travelMode": "DRIVE",
        "languageCode": api.language_code,
        "units": "METRIC",
    });

    tracing::info!(origin = %api.origin, destination = %api.destination, "Requesting route");

    let response = reqwest::Client::new()
        .post(&api.url)
        .header("X-Goog-Api-Key", &api.api_key)
        .header("X-Goog-FieldMask", "routes.duration,routes.legs")
        .json(&body)
        .send()
        .await?
        .error_for_status()?;

    let decoded: RoutesResponse = response.json().await?;

    decoded
        .routes
        .into_iter()
        .next()
        .and_then(|route| route.legs.into_iter().next())
        .map(|leg| leg.steps)
        .ok_or(RouteError::MissingRoute)
}

/// Expand route steps into per-simulator feed segments.
///
/// Each step's polyline is decoded and every consecutive coordinate pair
/// farther apart than [`MIN_SEGMENT_METERS`] becomes one position segment
/// and one speed segment, traversed at the step's average speed.
pub fn build_plan(steps: &[RouteStep]) -> RoutePlan {
    let mut plan = RoutePlan::default();

    for step in steps {
        let Some(duration_secs) = parse_duration_secs(&step.static_duration) else {
            tracing::warn!(duration = %step.static_duration, "Skipping step with bad duration");
            continue;
        };
        let speed_ms = step.distance_meters / duration_secs;
        if !(speed_ms > 0.0) || !speed_ms.is_finite() {
            tracing::warn!(
                distance = step.distance_meters,
                duration = duration_secs,
                "Skipping stationary step"
            );
            continue;
        }

        let path = decode_polyline(&step.polyline.encoded_polyline);
        for pair in path.windows(2) {
            let meters = great_circle_km(pair[0], pair[1]) * 1000.0;
            if meters <= MIN_SEGMENT_METERS {
                continue;
            }

            let sub_duration = meters / speed_ms;
            let speed_kmh = speed_ms * 3.6;
            plan.positions.push(PositionSegment {
                origin: pair[0],
                destination: pair[1],
                speed: speed_kmh,
                duration_secs: sub_duration,
            });
            plan.speeds.push(SpeedSegment {
                speed: speed_kmh,
                duration_secs: sub_duration,
            });
        }
    }

    plan
}

/// Parse an API duration string of the form `"<seconds>s"`.
fn parse_duration_secs(value: &str) -> Option<f64> {
    let secs: f64 = value.strip_suffix('s')?.parse().ok()?;
    (secs > 0.0).then_some(secs)
}

/// Decode a Google encoded polyline into coordinates (1e-5 precision).
///
/// Truncated input yields the coordinates decoded up to that point.
pub fn decode_polyline(encoded: &str) -> Vec<GeoPosition> {
    let bytes = encoded.as_bytes();
    let mut index = 0;
    let mut lat = 0i64;
    let mut lon = 0i64;
    let mut coordinates = Vec::new();

    fn next_delta(bytes: &[u8], index: &mut usize) -> Option<i64> {
        let mut shift = 0;
        let mut result = 0i64;
        loop {
            let byte = (*bytes.get(*index)? as i64) - 63;
            *index += 1;
            result |= (byte & 0x1f) << shift;
            shift += 5;
            if byte < 0x20 {
                break;
            }
        }
        Some(if result & 1 != 0 {
            !(result >> 1)
        } else {
            result >> 1
        })
    }

    while index < bytes.len() {
        let Some(dlat) = next_delta(bytes, &mut index) else {
            break;
        };
        let Some(dlon) = next_delta(bytes, &mut index) else {
            break;
        };
        lat += dlat;
        lon += dlon;
        coordinates.push(GeoPosition {
            latitude: lat as f64 / 1e5,
            longitude: lon as f64 / 1e5,
        });
    }

    coordinates
}

/// Great-circle distance between two positions, kilometers.
pub fn great_circle_km(a: GeoPosition, b: GeoPosition) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let cos_angle = lat_a.cos() * lat_b.cos() * dlon.cos() + lat_a.sin() * lat_b.sin();
    EARTH_RADIUS_KM * cos_angle.clamp(-1.0, 1.0).acos()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_polyline_reference_vector() {
        // Published reference vector for the encoding algorithm.
        let path = decode_polyline("_p~iF~ps|U_ulLnnqC_mqNvxq`@");

        assert_eq!(path.len(), 3);
        assert!((path[0].latitude - 38.5).abs() < 1e-9);
        assert!((path[0].longitude - -120.2).abs() < 1e-9);
        assert!((path[1].latitude - 40.7).abs() < 1e-9);
        assert!((path[1].longitude - -120.95).abs() < 1e-9);
        assert!((path[2].latitude - 43.252).abs() < 1e-9);
        assert!((path[2].longitude - -126.453).abs() < 1e-9);
    }

    #[test]
    fn test_decode_polyline_truncated_input() {
        // A dangling continuation byte must not panic or loop forever.
        let path = decode_polyline("_p~iF~ps|U_");
        assert_eq!(path.len(), 1);
    }

    #[test]
    fn test_great_circle_known_distance() {
        let paris = GeoPosition {
            latitude: 48.8566,
            longitude: 2.3522,
        };
        let london = GeoPosition {
            latitude: 51.5074,
            longitude: -0.1278,
        };

        let km = great_circle_km(paris, london);
        assert!((km - 343.5).abs() < 2.0, "got {} km", km);
    }

    #[test]
    fn test_great_circle_identical_points() {
        let p = GeoPosition {
            latitude: 40.0,
            longitude: -3.0,
        };
        assert_eq!(great_circle_km(p, p), 0.0);
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration_secs("137s"), Some(137.0));
        assert_eq!(parse_duration_secs("0s"), None);
        assert_eq!(parse_duration_secs("abc"), None);
        assert_eq!(parse_duration_secs("137"), None);
    }

    #[test]
    fn test_build_plan_from_step() {
        // Two points roughly 1.11 km apart along a meridian.
        let step = RouteStep {
            distance_meters: 1110.0,
            static_duration: "100s".to_string(),
            polyline: Polyline {
                // (40.0, -3.0) -> (40.01, -3.0)
                encoded_polyline: "_ocsF~|hQo}@?".to_string(),
            },
        };

        let plan = build_plan(&[step]);
        assert_eq!(plan.positions.len(), 1);
        assert_eq!(plan.speeds.len(), 1);

        let position = &plan.positions[0];
        assert!((position.origin.latitude - 40.0).abs() < 1e-9);
        assert!((position.destination.latitude - 40.01).abs() < 1e-9);

        // Step speed is 11.1 m/s = 39.96 km/h; both lists agree.
        assert!((plan.speeds[0].speed - 39.96).abs() < 0.01);
        assert_eq!(plan.speeds[0].speed, position.speed);
        assert!((plan.speeds[0].duration_secs - 100.0).abs() < 1.0);
    }

    #[test]
    fn test_build_plan_skips_bad_steps() {
        let steps = vec![
            RouteStep {
                distance_meters: 100.0,
                static_duration: "bogus".to_string(),
                polyline: Polyline {
                    encoded_polyline: "_ocsF~|hQo}@?".to_string(),
                },
            },
            RouteStep {
                distance_meters: 0.0,
                static_duration: "10s".to_string(),
                polyline: Polyline {
                    encoded_polyline: "_ocsF~|hQo}@?".to_string(),
                },
            },
        ];

        let plan = build_plan(&steps);
        assert!(plan.positions.is_empty());
        assert!(plan.speeds.is_empty());
    }
}
