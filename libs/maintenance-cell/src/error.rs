use thiserror::Error;

use shared_models::AppError;

#[derive(Error, Debug)]
pub enum MaintenanceError {
    #[error("Asset not found: {0}")]
    AssetNotFound(String),

    #[error("Asset inventory error: {0}")]
    Inventory(String),
}

impl From<std::io::Error> for MaintenanceError {
    fn from(err: std::io::Error) -> Self {
        MaintenanceError::Inventory(err.to_string())
    }
}

impl From<serde_json::Error> for MaintenanceError {
    fn from(err: serde_json::Error) -> Self {
        MaintenanceError::Inventory(format!("invalid inventory document: {}", err))
    }
}

impl From<MaintenanceError> for AppError {
    fn from(err: MaintenanceError) -> Self {
        match err {
            MaintenanceError::AssetNotFound(id) => AppError::NotFound(format!("Asset {} not found", id)),
            MaintenanceError::Inventory(msg) => AppError::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::*;

    #[test]
    fn unknown_asset_becomes_not_found() {
        let err = AppError::from(MaintenanceError::AssetNotFound("srv-9".into()));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "Not Found: Asset srv-9 not found");
    }

    #[test]
    fn unreadable_inventory_becomes_internal_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "inventory.json");
        let err = AppError::from(MaintenanceError::from(io));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
