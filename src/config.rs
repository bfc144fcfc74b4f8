use serde::{Deserialize, Serialize};

/// Kernel-wide configuration. Additive sugar: the stepping contract
/// doesn't depend on any of these values, but a real embedding
/// application wants a place to set logging verbosity and a display name
/// without threading extra constructor arguments through every primitive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KernelConfig {
    pub verbosity: u8,
    pub name: Option<String>,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            verbosity: 3,
            name: None,
        }
    }
}
