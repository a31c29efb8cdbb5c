use std::sync::Arc;

use chrono::FixedOffset;

use crate::config::Config;
use crate::services::attendance_service::CheckInLocks;
use crate::services::auth_service::TokenKeys;
use crate::services::staff_service::StaffDirectory;
use crate::stores::Stores;

#[derive(Debug, Clone)]
pub struct WebSettings {
    pub cookie_secure: bool,
    pub allow_registration: bool,
    pub event_offset: FixedOffset,
}

#[derive(Clone)]
pub struct AppState {
    pub stores: Stores,
    pub staff: Arc<StaffDirectory>,
    pub tokens: Arc<TokenKeys>,
    pub check_in_locks: Arc<CheckInLocks>,
    pub settings: Arc<WebSettings>,
}

impl AppState {
    pub fn new(stores: Stores, config: &Config) -> Self {
        Self {
            staff: Arc::new(StaffDirectory::new(stores.staff.clone())),
            tokens: Arc::new(TokenKeys::new(&config.jwt_secret)),
            check_in_locks: Arc::new(CheckInLocks::default()),
            settings: Arc::new(WebSettings {
                cookie_secure: config.cookie_secure,
                allow_registration: config.allow_registration,
                event_offset: config.event_offset(),
            }),
            stores,
        }
    }
}
