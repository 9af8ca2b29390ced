//! Constants used throughout the telecare core crate.
//!
//! Route paths consulted by the request gate live here so the gate rules and the REST router
//! agree on them.

/// Prefix of every API route.
pub const API_PREFIX: &str = "/api/";

/// Prefix of the admin pages.
pub const ADMIN_PREFIX: &str = "/admin";

/// Prefix of the authentication pages.
pub const AUTH_PREFIX: &str = "/auth/";

pub const SIGNIN_PATH: &str = "/auth/signin";
pub const SIGNUP_PATH: &str = "/auth/signup";
pub const SIGNUP_API_PATH: &str = "/api/auth/signup";
pub const MAINTENANCE_PATH: &str = "/maintenance";
pub const HOME_PATH: &str = "/";
pub const PATIENT_HOME_PATH: &str = "/dashboard";
pub const DOCTOR_HOME_PATH: &str = "/doctor-dashboard";

/// Prefix of the appointment API.
pub const APPOINTMENT_API_PREFIX: &str = "/api/appointments";

/// Any page path containing one of these is an appointment page.
pub const APPOINTMENT_PAGE_MARKERS: &[&str] = &[
    "/appointments",
    "/book-appointment",
    "/appointment-settings",
    "/doctor-dashboard/schedule",
];

/// Paths that are never gated (probes, API docs, static assets). Each entry matches the path
/// itself and anything below it, never a longer segment such as `/healthcare`.
pub const UNGATED_PREFIXES: &[&str] = &[
    "/health",
    "/swagger-ui",
    "/api-docs",
    "/static",
    "/favicon.ico",
];

pub const REGISTRATION_DISABLED_MESSAGE: &str = "Registration is currently disabled";
pub const APPOINTMENTS_DISABLED_MESSAGE: &str = "Appointments are currently disabled";

/// Default appointment length in minutes when the settings row does not say.
pub const DEFAULT_APPOINTMENT_MINUTES: u32 = 30;

/// Default daily appointment cap when the settings row does not say.
pub const DEFAULT_MAX_DAILY_APPOINTMENTS: u32 = 20;

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "session";

pub const DEFAULT_MODEL_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_MODEL_COOLDOWN_SECS: u64 = 10;
pub const DEFAULT_MODEL_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_MODEL_BACKOFF_SECS: u64 = 2;
pub const DEFAULT_MODEL_TIMEOUT_SECS: u64 = 60;

/// Longest symptom description accepted for analysis.
pub const MAX_SYMPTOM_CHARS: usize = 5_000;

/// Largest image accepted alongside a symptom description.
pub const MAX_SYMPTOM_IMAGE_BYTES: u64 = 4 * 1024 * 1024;
