/// Exit codes for CI/automation.
pub const SUCCESS: i32 = 0;
pub const VALIDATION_FAILED: i32 = 2;
/// At least one record failed delivery.
pub const RUN_FAILED: i32 = 3;
pub const RUNTIME_ERROR: i32 = 4;
