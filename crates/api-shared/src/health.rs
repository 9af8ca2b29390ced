use crate::wire::HealthRes;

/// Simple health service used by every HTTP entry point.
#[derive(Clone, Default)]
pub struct HealthService;

impl HealthService {
    pub fn new() -> Self {
        Self
    }

    /// Static method to check health without creating an instance.
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "Telecare is alive".into(),
        }
    }
}
