//! Article list, tag list and the client-side tag filter.
//!
//! Fetches carry a generation number: a response is applied only if no newer
//! fetch of the same kind was started in the meantime.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexSet;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::api_client::ApiClient;
use crate::auth_store::AuthState;
use crate::error::ClientError;
use crate::models::{Article, Tag};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostsState {
    /// Unfiltered collection as last returned by the server.
    pub all_posts: Vec<Article>,
    pub tags: IndexSet<Tag>,
    pub selected_tags: IndexSet<String>,
    /// Requests currently in flight.
    pub pending: usize,
    pub error: Option<String>,
}

impl PostsState {
    /// Articles carrying at least one selected tag, or all of them when no tag
    /// is selected.
    pub fn posts(&self) -> Vec<&Article> {
        filter_by_tags(&self.all_posts, &self.selected_tags)
    }

    pub fn is_loading(&self) -> bool {
        self.pending > 0
    }

    pub fn find(&self, slug: &str) -> Option<&Article> {
        self.all_posts.iter().find(|p| p.slug == slug)
    }
}

pub fn filter_by_tags<'a>(posts: &'a [Article], selected: &IndexSet<String>) -> Vec<&'a Article> {
    if selected.is_empty() {
        return posts.iter().collect();
    }
    posts
        .iter()
        .filter(|post| post.tag_list.iter().any(|tag| selected.contains(tag)))
        .collect()
}

/// What the auth follower should do after observing an auth state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFollowAction {
    /// Auth just became known: first load.
    InitialFetch,
    /// Identity changed and there is data to refresh.
    Refetch,
    Skip,
}

/// `last` is the identity seen on the previous settled observation (`None`
/// before auth was ever settled); an identity is the current token, if any.
pub fn auth_follow_action(
    last: Option<&Option<String>>,
    current: &Option<String>,
    populated: bool,
) -> AuthFollowAction {
    match last {
        None => AuthFollowAction::InitialFetch,
        Some(prev) if prev != current && populated => AuthFollowAction::Refetch,
        Some(_) => AuthFollowAction::Skip,
    }
}

/// One in-flight request counted in `pending`. The count is given back on
/// `finish` or, if the request future is dropped first, on drop.
struct InFlight<'a> {
    state: &'a watch::Sender<PostsState>,
    done: bool,
}

impl<'a> InFlight<'a> {
    fn start(state: &'a watch::Sender<PostsState>) -> Self {
        state.send_modify(|s| {
            s.pending += 1;
            s.error = None;
        });
        Self { state, done: false }
    }

    fn finish(mut self, apply: impl FnOnce(&mut PostsState)) {
        self.done = true;
        self.state.send_modify(|s| {
            s.pending = s.pending.saturating_sub(1);
            apply(s);
        });
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.state
                .send_modify(|s| s.pending = s.pending.saturating_sub(1));
        }
    }
}

#[derive(Clone)]
pub struct PostsStore {
    inner: Arc<PostsInner>,
}

struct PostsInner {
    api: ApiClient,
    state: watch::Sender<PostsState>,
    posts_generation: AtomicU64,
    tags_generation: AtomicU64,
}

impl PostsStore {
    pub fn new(api: ApiClient) -> Self {
        let (state, _) = watch::channel(PostsState::default());
        Self {
            inner: Arc::new(PostsInner {
                api,
                state,
                posts_generation: AtomicU64::new(0),
                tags_generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn state(&self) -> PostsState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PostsState> {
        self.inner.state.subscribe()
    }

    /// Current filtered view, cloned.
    pub fn posts(&self) -> Vec<Article> {
        self.inner
            .state
            .borrow()
            .posts()
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn find_post(&self, slug: &str) -> Option<Article> {
        self.inner.state.borrow().find(slug).cloned()
    }

    fn begin(&self) -> InFlight<'_> {
        InFlight::start(&self.inner.state)
    }

    /// Replace the unfiltered collection. On failure the previous articles stay.
    pub async fn fetch_posts(&self) -> Result<(), ClientError> {
        let generation = self.inner.posts_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let in_flight = self.begin();

        let result = self.inner.api.list_articles(None).await;
        let current = self.inner.posts_generation.load(Ordering::SeqCst) == generation;

        in_flight.finish(|s| {
            if !current {
                return;
            }
            match &result {
                Ok(articles) => s.all_posts = articles.clone(),
                Err(e) => s.error = Some(e.to_string()),
            }
        });

        if !current {
            tracing::debug!("Discarding stale articles response (generation {})", generation);
        }
        result.map(|articles| tracing::debug!("Loaded {} articles", articles.len()))
    }

    /// Replace the tag collection. On failure the previous tags stay.
    pub async fn fetch_tags(&self) -> Result<(), ClientError> {
        let generation = self.inner.tags_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let in_flight = self.begin();

        let result = self.inner.api.list_tags().await;
        let current = self.inner.tags_generation.load(Ordering::SeqCst) == generation;

        in_flight.finish(|s| {
            if !current {
                return;
            }
            match &result {
                Ok(tags) => s.tags = tags.iter().cloned().map(Tag::from).collect(),
                Err(e) => s.error = Some(e.to_string()),
            }
        });

        if !current {
            tracing::debug!("Discarding stale tags response (generation {})", generation);
        }
        result.map(|_| ())
    }

    /// Fetch one article. The unfiltered collection is left as is.
    pub async fn fetch_post_by_slug(&self, slug: &str) -> Result<Article, ClientError> {
        let in_flight = self.begin();

        let result = self.inner.api.get_article(slug).await;

        in_flight.finish(|s| {
            if let Err(e) = &result {
                s.error = Some(e.to_string());
            }
        });
        result
    }

    /// Cached article if present, otherwise a fetch.
    pub async fn load_post(&self, slug: &str) -> Result<Article, ClientError> {
        match self.find_post(slug) {
            Some(article) => Ok(article),
            None => self.fetch_post_by_slug(slug).await,
        }
    }

    pub fn toggle_tag(&self, tag: &str) {
        self.inner.state.send_modify(|s| {
            if !s.selected_tags.shift_remove(tag) {
                s.selected_tags.insert(tag.to_string());
            }
        });
    }

    pub fn clear_tags(&self) {
        self.inner.state.send_modify(|s| s.selected_tags.clear());
    }

    /// Patch one article by slug; no-op when the slug is unknown.
    pub fn update_post_favorite_status(&self, slug: &str, favorited: bool, favorites_count: u64) {
        self.inner.state.send_if_modified(|s| {
            match s.all_posts.iter_mut().find(|p| p.slug == slug) {
                Some(post) => {
                    post.favorited = favorited;
                    post.favorites_count = favorites_count;
                    true
                }
                None => false,
            }
        });
    }

    /// Favorite or unfavorite on the server, then adopt the server's counts.
    pub async fn set_favorite(&self, slug: &str, favorite: bool) -> Result<Article, ClientError> {
        let in_flight = self.begin();

        let result = if favorite {
            self.inner.api.favorite_article(slug).await
        } else {
            self.inner.api.unfavorite_article(slug).await
        };

        in_flight.finish(|s| {
            if let Err(e) = &result {
                s.error = Some(e.to_string());
            }
        });

        match result {
            Ok(article) => {
                self.update_post_favorite_status(slug, article.favorited, article.favorites_count);
                Ok(article)
            }
            Err(e) => {
                tracing::warn!("Failed to update favorite status of {}: {}", slug, e);
                Err(e)
            }
        }
    }

    pub async fn toggle_favorite(&self, article: &Article) -> Result<Article, ClientError> {
        self.set_favorite(&article.slug, !article.favorited).await
    }

    /// Keep the article list in step with the signed-in identity.
    ///
    /// The first settled auth state triggers the initial load; later identity
    /// changes refetch only when articles were already loaded.
    pub fn follow_auth(&self, mut auth: watch::Receiver<AuthState>) -> JoinHandle<()> {
        let store = self.clone();

        tokio::spawn(async move {
            let mut last: Option<Option<String>> = None;

            loop {
                let observed = {
                    let state = auth.borrow_and_update();
                    if state.is_initializing() {
                        None
                    } else {
                        Some(state.user().map(|u| u.token.clone()))
                    }
                };

                if let Some(identity) = observed {
                    let populated = !store.inner.state.borrow().all_posts.is_empty();
                    let action = auth_follow_action(last.as_ref(), &identity, populated);
                    last = Some(identity);

                    if action != AuthFollowAction::Skip {
                        tracing::debug!("Auth changed, {:?}", action);
                        if let Err(e) = store.fetch_posts().await {
                            tracing::warn!("Failed to fetch posts: {}", e);
                        }
                    }
                }

                if auth.changed().await.is_err() {
                    break;
                }
            }
        })
    }
}
