pub mod network {
    pub const DEFAULT_SERVICE_URL: &str = "http://localhost:9030";
    pub const TIMEOUT_API_REQUEST_MS: u64 = 30_000;
    pub const TIMEOUT_SYNC_REQUEST_MS: u64 = 60_000;
    pub const TIMEOUT_HEALTH_CHECK_MS: u64 = 10_000;
}

pub mod env {
    pub const SERVICE_URL: &str = "PSA_SERVICE_URL";
    pub const USE_MOCK_DATA: &str = "USE_MOCK_DATA";
    pub const LOG_LEVEL: &str = "LOG_LEVEL";
}

pub mod limits {
    pub const OVERVIEW_SAMPLE_SIZE: usize = 5;
    pub const SUMMARY_FALLBACK_CHARS: usize = 100;
    pub const LOG_BODY_PREVIEW_BYTES: usize = 240;
    pub const SCHEMA_ERRORS_SHOWN: usize = 10;
}

pub mod messages {
    pub const VALIDATION_ERROR: &str = "Validation Error";
    pub const BAD_REQUEST: &str = "Bad Request";
    pub const NOT_FOUND: &str = "Not Found";
    pub const SYNC_TIMED_OUT: &str = "Sync operation timed out";
    pub const SYNC_STILL_RUNNING: &str =
        "The sync is taking longer than expected. It may still be running in the background.";
}
