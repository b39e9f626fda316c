use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{error, success, types::PkceToken, youtube};

pub async fn auth(shared_state: Arc<Mutex<Option<PkceToken>>>) {
    match youtube::auth::auth(shared_state).await {
        Ok(()) => success!("Authentication successful."),
        Err(e) => error!("Authentication failed. Err: {}", e),
    }
}
