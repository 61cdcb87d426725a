pub mod api_client;
pub mod auth_store;
pub mod config;
pub mod error;
pub mod models;
pub mod posts_store;
pub mod storage;

pub use api_client::{ApiClient, Credentials};
pub use auth_store::{AuthPhase, AuthState, AuthStore, RestoreOutcome};
pub use config::ClientConfig;
pub use error::ClientError;
pub use posts_store::{PostsState, PostsStore};
pub use storage::{FileStorage, MemoryStorage, StorageError, UserStorage};

use std::sync::Arc;

/// One API client shared by the auth and posts stores.
#[derive(Clone)]
pub struct RealWorld {
    pub api: ApiClient,
    pub auth: AuthStore,
    pub posts: PostsStore,
}

impl RealWorld {
    pub fn new(config: &ClientConfig, storage: Arc<dyn UserStorage>) -> Self {
        let api = ApiClient::new(config);
        let auth = AuthStore::new(api.clone(), storage);
        let posts = PostsStore::new(api.clone());

        Self { api, auth, posts }
    }

    /// Build the stores and restore the persisted user.
    pub async fn start(config: &ClientConfig, storage: Arc<dyn UserStorage>) -> Self {
        let app = Self::new(config, storage);
        if let RestoreOutcome::Failed(reason) = app.auth.restore().await {
            tracing::warn!("Continuing anonymously, stored session unusable: {}", reason);
        }
        app
    }

    /// Spawn the task that reloads articles when the signed-in user changes.
    pub fn follow_auth(&self) -> tokio::task::JoinHandle<()> {
        self.posts.follow_auth(self.auth.subscribe())
    }
}
