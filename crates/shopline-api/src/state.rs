//! Shared application state.

use std::sync::Arc;

use anyhow::{Context, Result};
use shopline_auth::{PasswordHasher, TokenIssuer};
use shopline_commerce::checkout::ShippingPolicy;
use shopline_commerce::Currency;
use shopline_db::Db;

use crate::config::{Config, GatewayKind};
use crate::gateway::{PaymentGateway, SandboxGateway};

/// State every handler receives.
pub struct AppState {
    pub db: Db,
    pub tokens: TokenIssuer,
    pub hasher: PasswordHasher,
    /// Currency every price and cost is in.
    pub currency: Currency,
    pub shipping: ShippingPolicy,
    pub gateway: Arc<dyn PaymentGateway>,
    pub config: Config,
}

impl AppState {
    /// Build state from a validated config and an open database.
    pub fn new(config: Config, db: Db) -> Result<Arc<Self>> {
        let gateway: Arc<dyn PaymentGateway> = match config.payment.gateway {
            GatewayKind::Sandbox => Arc::new(SandboxGateway::new(
                config.payment.redirect_base_url.clone(),
            )),
        };
        Self::with_gateway(config, db, gateway)
    }

    /// Build state with a specific gateway.
    pub fn with_gateway(
        config: Config,
        db: Db,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Result<Arc<Self>> {
        let tokens = TokenIssuer::new(&config.auth.jwt_secret, config.auth.issuer.clone())
            .context("Failed to create token issuer")?
            .with_ttls(config.auth.access_ttl_secs, config.auth.refresh_ttl_secs);

        Ok(Arc::new(Self {
            db,
            tokens,
            hasher: PasswordHasher::default(),
            currency: config.currency()?,
            shipping: config.shipping_policy()?,
            gateway,
            config,
        }))
    }
}
