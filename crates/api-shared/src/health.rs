use crate::wire::HealthRes;

/// Health check shared by the REST server and tooling.
#[derive(Clone, Default)]
pub struct HealthService;

impl HealthService {
    /// Static health check; the service holds no state.
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: crate::BANNER.into(),
        }
    }
}
