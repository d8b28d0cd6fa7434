//! OpenAPI documentation configuration
//!
//! Generates OpenAPI 3.0 specification for the Timeclock API.

use utoipa::OpenApi;

use crate::ceremony::{
    BeginAuthenticationRequest, BeginRegistrationRequest, CompleteAuthenticationResponse,
    CredentialSummary,
};
use crate::db::{PunchRecord, PunchStatus, Site};
use crate::handlers::{
    EmployeeHours, FormattedTotals, HealthResponse, HoursReportResponse, NearbySite,
    PunchRequest, PunchResponse, ReadyResponse,
};

/// Timeclock API - OpenAPI Documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Timeclock API",
        version = "0.1.0",
        description = r#"
## Verified Attendance API

Records employee clock-ins and clock-outs with:

- **Geofencing** - Entry punches must resolve inside the radius of the nearest active site
- **Verification ceremonies** - Challenge-response credential checks with replay-protected counters
- **Strict alternation** - Entries and exits alternate per employee, enforced at write time
- **Worked-hours reports** - Normal, overtime, and night-differential totals per employee

### How It Works

1. Register a credential for an employee via `POST /auth/registration/begin` and `.../complete`
2. Verify presence via `POST /auth/authentication/begin` and `.../complete`
3. Punch in via `POST /punch/entry`; the reported position is validated against the site geofences
4. Punch out via `POST /punch/exit`; exits are never blocked by the geofence
5. Aggregate worked hours via `GET /reports/hours`
"#,
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server")
    ),
    tags(
        (name = "Punch", description = "Clock-in and clock-out operations with geofence validation"),
        (name = "Auth", description = "Credential registration and authentication ceremonies"),
        (name = "Reports", description = "Worked-hours aggregation"),
        (name = "Sites", description = "Site geofence lookups"),
        (name = "Health", description = "Service health and readiness endpoints")
    ),
    paths(
        crate::handlers::health::health,
        crate::handlers::health::ready,
        crate::handlers::punch::punch_entry,
        crate::handlers::punch::punch_exit,
        crate::handlers::punch::punch_status,
        crate::handlers::reports::hours_report,
        crate::handlers::sites::nearby_sites,
        crate::ceremony::handlers::begin_registration,
        crate::ceremony::handlers::complete_registration,
        crate::ceremony::handlers::begin_authentication,
        crate::ceremony::handlers::complete_authentication,
        crate::ceremony::handlers::list_credentials,
        crate::ceremony::handlers::revoke_credential,
    ),
    components(
        schemas(
            HealthResponse,
            ReadyResponse,
            PunchRequest,
            PunchResponse,
            PunchRecord,
            PunchStatus,
            Site,
            NearbySite,
            HoursReportResponse,
            EmployeeHours,
            FormattedTotals,
            BeginRegistrationRequest,
            BeginAuthenticationRequest,
            CompleteAuthenticationResponse,
            CredentialSummary,
        )
    )
)]
pub struct ApiDoc;
