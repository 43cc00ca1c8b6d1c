use std::sync::Arc;

use crate::application::auth::SessionService;
use crate::application::drafts::DraftService;
use crate::application::lifecycle::SchemaLifecycle;
use crate::application::posts::PostService;
use crate::application::repos::HealthRepo;
use crate::application::settings::SettingsService;

#[derive(Clone)]
pub struct ApiState {
    pub sessions: Arc<SessionService>,
    pub posts: Arc<PostService>,
    pub drafts: Arc<DraftService>,
    pub settings: Arc<SettingsService>,
    pub lifecycle: Arc<SchemaLifecycle>,
    pub health: Arc<dyn HealthRepo>,
    /// Mark cookies `Secure`. Disable only for plain-HTTP local development.
    pub secure_cookies: bool,
    /// Take the client address from `X-Forwarded-For`. Enable only behind a proxy.
    pub trust_forwarded_for: bool,
}
