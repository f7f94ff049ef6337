use thiserror::Error;

use webrig_core_types::RigError;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("not found")]
    NotFound,
    #[error("id already in use")]
    IdInUse,
}

impl RegistryError {
    pub fn into_rig_error(self, detail: impl Into<String>) -> RigError {
        let detail = detail.into();
        match self {
            RegistryError::NotFound => RigError::not_found(detail),
            RegistryError::IdInUse => RigError::validation("sessionId", detail),
        }
    }
}
