//! Site lookup handlers

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use timeclock_core::haversine_distance;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;
use crate::validation::validate_coordinates;

/// Query parameters for the nearby-site lookup
#[derive(Debug, Deserialize, IntoParams)]
pub struct NearbyQuery {
    #[param(example = 40.4168)]
    pub latitude: f64,
    #[param(example = -3.7038)]
    pub longitude: f64,
}

/// An active site with its distance from the reported position
#[derive(Debug, Serialize, ToSchema)]
pub struct NearbySite {
    #[schema(value_type = String)]
    pub id: Uuid,
    pub name: String,
    /// Distance from the reported position in meters, rounded
    pub distance_meters: f64,
    pub radius_meters: f64,
    /// Whether a punch from this position would resolve inside the radius
    pub within_radius: bool,
}

/// GET /sites/nearby
///
/// Active sites ordered by distance from the reported position. Lets a
/// client show where it stands relative to the geofences before punching.
#[utoipa::path(
    get,
    path = "/sites/nearby",
    tag = "Sites",
    params(NearbyQuery),
    responses(
        (status = 200, description = "Active sites by distance", body = [NearbySite]),
        (status = 400, description = "Invalid coordinates"),
        (status = 503, description = "Site store not configured")
    )
)]
pub async fn nearby_sites(
    State(state): State<AppState>,
    Query(query): Query<NearbyQuery>,
) -> Result<Json<Vec<NearbySite>>, ApiError> {
    validate_coordinates(query.latitude, query.longitude)?;

    let sites = state
        .site_repo()?
        .list_active()
        .await
        .map_err(|e| ApiError::internal(format!("site lookup failed: {e}")))?;

    let mut nearby: Vec<NearbySite> = sites
        .iter()
        .map(|site| {
            let distance = haversine_distance(
                query.latitude,
                query.longitude,
                site.latitude,
                site.longitude,
            );
            NearbySite {
                id: site.id,
                name: site.name.clone(),
                distance_meters: distance.round(),
                radius_meters: site.radius_meters,
                within_radius: distance <= site.radius_meters,
            }
        })
        .collect();
    nearby.sort_by(|a, b| a.distance_meters.total_cmp(&b.distance_meters));

    Ok(Json(nearby))
}
