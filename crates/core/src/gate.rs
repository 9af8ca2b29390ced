//! Request gate.
//!
//! Every inbound request is classified as [`GateDecision::Continue`],
//! [`GateDecision::Redirect`] or [`GateDecision::Reject`] before any page or API handler runs.
//! The decision is a pure function of the path, the resolved identity and the feature-flag
//! snapshot, so it is tested here without any HTTP machinery.
//!
//! Rules are evaluated in order and the first one that returns a decision wins:
//!
//! | # | Rule | Effect |
//! |---|------|--------|
//! | 0 | `ungated` | probes, API docs and static assets continue |
//! | 1 | `flags-unavailable` | no flag snapshot (store read failed): continue (fail open) |
//! | 2 | `maintenance` | pages only; maintenance page, auth pages and admins on admin pages continue, everything else goes to `/maintenance` |
//! | 3 | `maintenance-over` | maintenance off and path is `/maintenance`: go to `/` |
//! | 4 | `registration-disabled` | sign-up page goes to sign-in, sign-up API is rejected with 403 |
//! | 5 | `appointments-disabled` | non-admins: appointment API rejected with 403, appointment pages go to `/dashboard` |
//! | 6 | `api` | any other API path continues (API handlers authorise themselves) |
//! | 7 | `auth-page` | signed-in users go to their home page, others continue |
//! | 8 | `admin-only` | admin pages without an admin identity go to sign-in |
//! | 9 | `sign-in-required` | any other page without an identity goes to sign-in |
//! | 10 | `allow` | continue |
//!
//! Maintenance mode deliberately does not gate `/api/*`.

use crate::constants::{
    ADMIN_PREFIX, API_PREFIX, APPOINTMENTS_DISABLED_MESSAGE, APPOINTMENT_API_PREFIX,
    APPOINTMENT_PAGE_MARKERS, AUTH_PREFIX, HOME_PATH, MAINTENANCE_PATH, PATIENT_HOME_PATH,
    REGISTRATION_DISABLED_MESSAGE, SIGNIN_PATH, SIGNUP_API_PATH, SIGNUP_PATH, UNGATED_PREFIXES,
};
use crate::flags::FeatureFlags;
use crate::session::IdentityClaim;

/// The outcome of gating one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Continue,
    Redirect(&'static str),
    Reject { status: u16, message: &'static str },
}

/// A decision together with the name of the rule that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub rule: &'static str,
    pub decision: GateDecision,
}

/// Everything the gate looks at.
#[derive(Debug, Clone, Copy)]
pub struct GateInput<'a> {
    path: &'a str,
    identity: Option<&'a IdentityClaim>,
    flags: Option<&'a FeatureFlags>,
}

impl<'a> GateInput<'a> {
    /// `flags` is `None` when the flag store could not be read.
    pub fn new(
        path: &'a str,
        identity: Option<&'a IdentityClaim>,
        flags: Option<&'a FeatureFlags>,
    ) -> Self {
        let path = if path.len() > 1 {
            path.trim_end_matches('/')
        } else {
            path
        };
        let path = if path.is_empty() { HOME_PATH } else { path };
        Self {
            path,
            identity,
            flags,
        }
    }

    fn is_api(&self) -> bool {
        self.path.starts_with(API_PREFIX) || self.path == API_PREFIX.trim_end_matches('/')
    }

    fn is_auth_page(&self) -> bool {
        self.path.starts_with(AUTH_PREFIX) || self.path == AUTH_PREFIX.trim_end_matches('/')
    }

    fn is_admin_page(&self) -> bool {
        has_segment_prefix(self.path, ADMIN_PREFIX)
    }

    fn is_admin(&self) -> bool {
        self.identity.is_some_and(|i| i.is_admin)
    }
}

fn has_segment_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

type Rule = fn(&GateInput<'_>) -> Option<GateDecision>;

/// The ordered rule list. See the module docs.
pub const RULES: &[(&str, Rule)] = &[
    ("ungated", ungated),
    ("flags-unavailable", flags_unavailable),
    ("maintenance", maintenance),
    ("maintenance-over", maintenance_over),
    ("registration-disabled", registration_disabled),
    ("appointments-disabled", appointments_disabled),
    ("api", api),
    ("auth-page", auth_page),
    ("admin-only", admin_only),
    ("sign-in-required", sign_in_required),
];

/// Evaluates the rules in order and returns the first decision.
pub fn decide(input: &GateInput<'_>) -> Verdict {
    for (rule, check) in RULES {
        if let Some(decision) = check(input) {
            return Verdict { rule, decision };
        }
    }
    Verdict {
        rule: "allow",
        decision: GateDecision::Continue,
    }
}

/// Probes, API docs and static assets. Callers may skip reading flags for these.
pub fn is_ungated(path: &str) -> bool {
    UNGATED_PREFIXES
        .iter()
        .any(|prefix| has_segment_prefix(path, prefix))
}

fn ungated(input: &GateInput<'_>) -> Option<GateDecision> {
    is_ungated(input.path).then_some(GateDecision::Continue)
}

fn flags_unavailable(input: &GateInput<'_>) -> Option<GateDecision> {
    input.flags.is_none().then_some(GateDecision::Continue)
}

fn maintenance(input: &GateInput<'_>) -> Option<GateDecision> {
    let flags = input.flags?;
    if !flags.maintenance.enabled || input.is_api() {
        return None;
    }

    let allowed = input.path == MAINTENANCE_PATH
        || input.is_auth_page()
        || (input.is_admin() && input.is_admin_page());

    Some(if allowed {
        GateDecision::Continue
    } else {
        GateDecision::Redirect(MAINTENANCE_PATH)
    })
}

fn maintenance_over(input: &GateInput<'_>) -> Option<GateDecision> {
    let flags = input.flags?;
    (!flags.maintenance.enabled && input.path == MAINTENANCE_PATH)
        .then_some(GateDecision::Redirect(HOME_PATH))
}

fn registration_disabled(input: &GateInput<'_>) -> Option<GateDecision> {
    let flags = input.flags?;
    if flags.registration.enabled {
        return None;
    }

    if input.path == SIGNUP_PATH {
        Some(GateDecision::Redirect(SIGNIN_PATH))
    } else if input.path == SIGNUP_API_PATH {
        Some(GateDecision::Reject {
            status: 403,
            message: REGISTRATION_DISABLED_MESSAGE,
        })
    } else {
        None
    }
}

fn appointments_disabled(input: &GateInput<'_>) -> Option<GateDecision> {
    let flags = input.flags?;
    if flags.appointments.enabled || input.is_admin() {
        return None;
    }

    if input.is_api() {
        return has_segment_prefix(input.path, APPOINTMENT_API_PREFIX).then_some(
            GateDecision::Reject {
                status: 403,
                message: APPOINTMENTS_DISABLED_MESSAGE,
            },
        );
    }

    APPOINTMENT_PAGE_MARKERS
        .iter()
        .any(|marker| input.path.contains(marker))
        .then_some(GateDecision::Redirect(PATIENT_HOME_PATH))
}

fn api(input: &GateInput<'_>) -> Option<GateDecision> {
    input.is_api().then_some(GateDecision::Continue)
}

fn auth_page(input: &GateInput<'_>) -> Option<GateDecision> {
    if !input.is_auth_page() {
        return None;
    }
    Some(match input.identity {
        Some(identity) => GateDecision::Redirect(identity.home_path()),
        None => GateDecision::Continue,
    })
}

fn admin_only(input: &GateInput<'_>) -> Option<GateDecision> {
    (input.is_admin_page() && !input.is_admin()).then_some(GateDecision::Redirect(SIGNIN_PATH))
}

fn sign_in_required(input: &GateInput<'_>) -> Option<GateDecision> {
    input
        .identity
        .is_none()
        .then_some(GateDecision::Redirect(SIGNIN_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::{AppointmentSettings, Toggle};

    fn patient() -> IdentityClaim {
        IdentityClaim {
            subject: "p-1".into(),
            name: "Sam Patient".into(),
            is_doctor: false,
            is_admin: false,
        }
    }

    fn doctor() -> IdentityClaim {
        IdentityClaim {
            is_doctor: true,
            ..patient()
        }
    }

    fn admin() -> IdentityClaim {
        IdentityClaim {
            is_admin: true,
            ..patient()
        }
    }

    fn flags(maintenance: bool, registration: bool, appointments: bool) -> FeatureFlags {
        FeatureFlags {
            maintenance: Toggle {
                enabled: maintenance,
            },
            registration: Toggle {
                enabled: registration,
            },
            appointments: AppointmentSettings {
                enabled: appointments,
                ..AppointmentSettings::default()
            },
            notifications: Toggle::ON,
        }
    }

    fn decision(path: &str, identity: Option<&IdentityClaim>, f: &FeatureFlags) -> GateDecision {
        decide(&GateInput::new(path, identity, Some(f))).decision
    }

    #[test]
    fn maintenance_redirects_non_admin_pages() {
        let f = flags(true, true, true);
        assert_eq!(
            decision("/dashboard", Some(&patient()), &f),
            GateDecision::Redirect("/maintenance")
        );
        assert_eq!(
            decision("/admin/users", Some(&patient()), &f),
            GateDecision::Redirect("/maintenance")
        );
        assert_eq!(decision("/", None, &f), GateDecision::Redirect("/maintenance"));
    }

    #[test]
    fn maintenance_allows_its_page_auth_pages_and_admins_on_admin_pages() {
        let f = flags(true, true, true);
        assert_eq!(decision("/maintenance", None, &f), GateDecision::Continue);
        assert_eq!(decision("/auth/signin", None, &f), GateDecision::Continue);
        assert_eq!(
            decision("/admin/settings", Some(&admin()), &f),
            GateDecision::Continue
        );
        assert_eq!(
            decision("/dashboard", Some(&admin()), &f),
            GateDecision::Redirect("/maintenance")
        );
    }

    #[test]
    fn maintenance_does_not_gate_api_paths() {
        let f = flags(true, true, true);
        assert_eq!(
            decision("/api/documents/summarize", None, &f),
            GateDecision::Continue
        );
    }

    #[test]
    fn maintenance_page_redirects_home_when_maintenance_is_off() {
        let f = flags(false, true, true);
        assert_eq!(
            decision("/maintenance", Some(&patient()), &f),
            GateDecision::Redirect("/")
        );
        assert_eq!(decision("/maintenance/", None, &f), GateDecision::Redirect("/"));
    }

    #[test]
    fn disabled_registration_redirects_page_and_rejects_api() {
        let f = flags(false, false, true);
        assert_eq!(
            decision("/auth/signup", None, &f),
            GateDecision::Redirect("/auth/signin")
        );
        assert_eq!(
            decision("/api/auth/signup", None, &f),
            GateDecision::Reject {
                status: 403,
                message: "Registration is currently disabled"
            }
        );
        assert_eq!(
            decision("/auth/signup", None, &flags(false, true, true)),
            GateDecision::Continue
        );
    }

    #[test]
    fn disabled_appointments_block_non_admins() {
        let f = flags(false, true, false);
        for path in [
            "/appointments",
            "/dashboard/appointments/new",
            "/book-appointment",
            "/doctor-dashboard/appointment-settings",
            "/doctor-dashboard/schedule",
        ] {
            assert_eq!(
                decision(path, Some(&doctor()), &f),
                GateDecision::Redirect("/dashboard"),
                "{path}"
            );
        }
        assert_eq!(
            decision("/api/appointments/42", Some(&patient()), &f),
            GateDecision::Reject {
                status: 403,
                message: "Appointments are currently disabled"
            }
        );
        assert_eq!(
            decision("/api/appointments", Some(&admin()), &f),
            GateDecision::Continue
        );
        assert_eq!(
            decision("/appointments", Some(&admin()), &f),
            GateDecision::Continue
        );
    }

    #[test]
    fn other_api_paths_pass_without_identity() {
        let f = flags(false, true, true);
        assert_eq!(decision("/api/settings", None, &f), GateDecision::Continue);
        assert_eq!(
            decision("/api/appointments", None, &f),
            GateDecision::Continue
        );
    }

    #[test]
    fn signed_in_users_leave_auth_pages_for_their_home() {
        let f = flags(false, true, true);
        assert_eq!(
            decision("/auth/signin", Some(&doctor()), &f),
            GateDecision::Redirect("/doctor-dashboard")
        );
        assert_eq!(
            decision("/auth/signin", Some(&patient()), &f),
            GateDecision::Redirect("/dashboard")
        );
        assert_eq!(decision("/auth/signin", None, &f), GateDecision::Continue);
    }

    #[test]
    fn admin_pages_require_admin_identity() {
        let f = flags(false, true, true);
        assert_eq!(
            decision("/admin", None, &f),
            GateDecision::Redirect("/auth/signin")
        );
        assert_eq!(
            decision("/admin/doctors", Some(&doctor()), &f),
            GateDecision::Redirect("/auth/signin")
        );
        assert_eq!(
            decision("/admin/doctors", Some(&admin()), &f),
            GateDecision::Continue
        );
        assert_eq!(
            decision("/administrator-guide", None, &f),
            GateDecision::Redirect("/auth/signin")
        );
    }

    #[test]
    fn pages_require_identity() {
        let f = flags(false, true, true);
        assert_eq!(
            decision("/dashboard", None, &f),
            GateDecision::Redirect("/auth/signin")
        );
        assert_eq!(
            decision("/prescriptions", Some(&patient()), &f),
            GateDecision::Continue
        );
    }

    #[test]
    fn unreadable_flags_fail_open() {
        let verdict = decide(&GateInput::new("/admin/users", None, None));
        assert_eq!(verdict.decision, GateDecision::Continue);
        assert_eq!(verdict.rule, "flags-unavailable");
    }

    #[test]
    fn health_checks_docs_and_assets_are_never_gated() {
        let f = flags(true, false, false);
        for path in ["/health", "/swagger-ui/index.html", "/static/app.css", "/favicon.ico"] {
            let verdict = decide(&GateInput::new(path, None, Some(&f)));
            assert_eq!(verdict.rule, "ungated", "{path}");
        }
    }

    #[test]
    fn ungated_prefixes_match_whole_segments_only() {
        assert!(is_ungated("/api-docs/openapi.json"));
        assert!(is_ungated("/swagger-ui"));
        for path in ["/healthcare-records", "/health-history", "/swagger-uiX", "/staticky"] {
            assert!(!is_ungated(path), "{path}");
        }
    }

    #[test]
    fn pages_sharing_a_health_prefix_are_still_gated() {
        let open = flags(false, true, true);
        let verdict = decide(&GateInput::new("/healthcare-records", None, Some(&open)));
        assert_eq!(verdict.rule, "sign-in-required");
        assert_eq!(verdict.decision, GateDecision::Redirect("/auth/signin"));

        let down = flags(true, true, true);
        let verdict = decide(&GateInput::new("/healthcare-records", None, Some(&down)));
        assert_eq!(verdict.rule, "maintenance");
        assert_eq!(verdict.decision, GateDecision::Redirect("/maintenance"));
    }

    #[test]
    fn decision_is_a_pure_function_of_its_inputs() {
        let identities = [None, Some(patient()), Some(doctor()), Some(admin())];
        let paths = [
            "/",
            "/dashboard",
            "/doctor-dashboard/schedule",
            "/admin/users",
            "/auth/signin",
            "/auth/signup",
            "/maintenance",
            "/api/auth/signup",
            "/api/appointments/1",
            "/api/documents/summarize",
        ];

        for bits in 0..8u8 {
            let f = flags(bits & 1 != 0, bits & 2 != 0, bits & 4 != 0);
            for identity in &identities {
                for path in paths {
                    let first = decide(&GateInput::new(path, identity.as_ref(), Some(&f)));
                    let second = decide(&GateInput::new(path, identity.as_ref(), Some(&f)));
                    assert_eq!(first, second);

                    if f.maintenance.enabled
                        && !identity.as_ref().is_some_and(|i| i.is_admin)
                        && path == "/dashboard"
                    {
                        assert_eq!(first.decision, GateDecision::Redirect("/maintenance"));
                    }
                }
            }
        }
    }
}
