//! Site entity and repository
//!
//! Sites define the geofences punches are validated against. They are
//! created and edited by the admin collaborator and consumed read-only here.
//! A site with punches referencing it is only ever soft-deleted.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use timeclock_core::GeoSite;
use utoipa::ToSchema;
use uuid::Uuid;

/// Site entity from database
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Site {
    #[schema(value_type = String, example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Allowed punch radius in meters, always positive
    pub radius_meters: f64,
    pub active: bool,
    #[schema(value_type = String, example = "2026-01-08T10:00:00Z")]
    pub created_at: DateTime<Utc>,
}

impl Site {
    /// View of this site for geofence resolution.
    pub fn to_geo(&self) -> GeoSite {
        GeoSite {
            id: self.id.to_string(),
            name: self.name.clone(),
            latitude: self.latitude,
            longitude: self.longitude,
            radius_meters: self.radius_meters,
        }
    }
}

/// Repository for site database operations
#[derive(Clone)]
pub struct SiteRepository {
    pool: PgPool,
}

impl SiteRepository {
    /// Create a new site repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// List all active sites, in creation order.
    ///
    /// The order matters: geofence tie-breaks are resolved by input order.
    pub async fn list_active(&self) -> Result<Vec<Site>, sqlx::Error> {
        sqlx::query_as::<_, Site>(
            r#"
            SELECT id, name, latitude, longitude, radius_meters, active, created_at
            FROM sites
            WHERE active
            ORDER BY created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    /// Find a site by id regardless of active flag (report attribution).
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Site>, sqlx::Error> {
        sqlx::query_as::<_, Site>(
            r#"
            SELECT id, name, latitude, longitude, radius_meters, active, created_at
            FROM sites
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }
}

impl std::fmt::Debug for SiteRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteRepository")
            .field("pool", &"<PgPool>")
            .finish()
    }
}
