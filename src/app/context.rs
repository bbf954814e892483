use std::sync::Arc;

use crate::app::Result;
use crate::config::Config;
use crate::gateway::{Gateway, HttpGateway};
use crate::session::SessionController;

pub struct AppContext {
    pub gateway: Arc<dyn Gateway>,
    pub config: Arc<Config>,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let gateway: Arc<dyn Gateway> = Arc::new(HttpGateway::new(&config)?);
        Ok(Self {
            gateway,
            config: Arc::new(config),
        })
    }

    /// Wire for a custom gateway; the tests hang a mock off this.
    pub fn with_gateway(config: Config, gateway: Arc<dyn Gateway>) -> Self {
        Self {
            gateway,
            config: Arc::new(config),
        }
    }

    /// A controller bound to this context's gateway and OAuth settings.
    pub fn controller(&self) -> SessionController {
        SessionController::new(
            self.gateway.clone(),
            &self.config.oauth.provider,
            &self.config.oauth.redirect_url,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::mock::MockGateway;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_context_hands_out_working_controllers() {
        let gateway = Arc::new(MockGateway::new());
        let user = Uuid::new_v4();
        gateway.set_session(Some(MockGateway::make_session(user)));
        gateway.push_row(user, "A", "http://a");

        let ctx = AppContext::with_gateway(Config::default(), gateway);

        let mut controller = ctx.controller();
        controller.initialize().await;
        assert_eq!(controller.identity(), Some(user));
        assert_eq!(controller.bookmarks().len(), 1);
    }
}
