use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::{DbPool, OrmConn};
use crate::payments::PaymentClient;
use crate::push::PushTransport;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub config: Arc<AppConfig>,
    pub payments: PaymentClient,
    pub push: Arc<dyn PushTransport>,
}
