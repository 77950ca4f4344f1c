/// Binding layer configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Enable development validation: commit-time checks of unbound variables and
    /// reflection mismatches, plus backend validation layers when the backend supports them
    pub enable_validation: bool,
    /// Application name
    pub app_name: String,
    /// Application version (major, minor, patch)
    pub app_version: (u32, u32, u32),
    /// SRB allocation granularity used by signatures that leave it at 0
    pub srb_allocation_granularity: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enable_validation: cfg!(debug_assertions),
            app_name: "Galaxy3D Application".to_string(),
            app_version: (1, 0, 0),
            srb_allocation_granularity: 1,
        }
    }
}
