// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{
    future::Future,
    sync::{Arc, Mutex as StdMutex, PoisonError},
};

use log::{debug, info, warn};
use secrecy::SecretString;
use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
};

use crate::{
    api::{Api, Coffee, CoffeeDetail, Comment},
    error::Error,
    repository::Repository,
};

use super::{login, scope::Scope};

pub(crate) const COMMENTS_UNAVAILABLE: &str = "could not refresh comments";

/// Counts refreshes that have started and not yet finished, including those
/// queued behind another. `is_refreshing` is high while the count is nonzero.
struct Refreshes {
    active: StdMutex<usize>,
    flag: watch::Sender<bool>,
}

impl Refreshes {
    fn new() -> Self {
        Self {
            active: StdMutex::new(0),
            flag: watch::channel(false).0,
        }
    }

    fn begin(&self) -> Refreshing<'_> {
        self.adjust(|active| active + 1);
        Refreshing(self)
    }

    fn adjust(&self, f: impl FnOnce(usize) -> usize) {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        *active = f(*active);
        let refreshing = *active > 0;
        _ = self.flag.send_if_modified(|flag| {
            let changed = *flag != refreshing;
            *flag = refreshing;
            changed
        });
    }
}

/// One counted refresh. Dropping it, also when the owning future is dropped
/// mid-flight, ends the refresh.
struct Refreshing<'refreshes>(&'refreshes Refreshes);

impl Drop for Refreshing<'_> {
    fn drop(&mut self) {
        self.0.adjust(|active| active.saturating_sub(1));
    }
}

/// State behind the coffee list and coffee detail screens.
#[derive(Clone)]
pub(crate) struct Controller {
    inner: Arc<Inner>,
}

struct Inner {
    repository: Repository,
    api: Arc<dyn Api>,
    login: login::Controller,
    coffee_list: watch::Sender<Option<Vec<Coffee>>>,
    coffee_detail: watch::Sender<Option<CoffeeDetail>>,
    comments: watch::Sender<Vec<Comment>>,
    refreshes: Refreshes,
    error_message: watch::Sender<Option<String>>,
    // Refreshes are serialized so that their writes to `comments` cannot
    // interleave.
    refresh: Mutex<()>,
    scope: Scope,
}

impl Controller {
    pub(crate) fn new(repository: Repository, login: login::Controller) -> Self {
        Self {
            inner: Arc::new(Inner {
                api: repository.api(),
                repository,
                login,
                coffee_list: watch::channel(None).0,
                coffee_detail: watch::channel(None).0,
                comments: watch::channel(Vec::new()).0,
                refreshes: Refreshes::new(),
                error_message: watch::channel(None).0,
                refresh: Mutex::new(()),
                scope: Scope::default(),
            }),
        }
    }

    pub(crate) fn coffee_list(&self) -> watch::Receiver<Option<Vec<Coffee>>> {
        self.inner.coffee_list.subscribe()
    }

    pub(crate) fn coffee_detail(&self) -> watch::Receiver<Option<CoffeeDetail>> {
        self.inner.coffee_detail.subscribe()
    }

    pub(crate) fn comments(&self) -> watch::Receiver<Vec<Comment>> {
        self.inner.comments.subscribe()
    }

    pub(crate) fn is_refreshing(&self) -> watch::Receiver<bool> {
        self.inner.refreshes.flag.subscribe()
    }

    pub(crate) fn error_message(&self) -> watch::Receiver<Option<String>> {
        self.inner.error_message.subscribe()
    }

    fn set_error(&self, message: Option<String>) {
        _ = self.inner.error_message.send_replace(message);
    }

    /// Logs the failure, and performs the forced logout when the server has
    /// rejected our token.
    async fn fail(&self, action: &str, error: &Error) {
        match error {
            Error::Unauthorized => self.inner.login.expire_session().await,
            other => warn!("Could not {}: {}", action, other),
        }
    }

    pub(crate) async fn fetch_coffees(&self) {
        let _refreshing = self.inner.refreshes.begin();
        let _serial = self.inner.refresh.lock().await;
        self.set_error(None);

        match self.inner.repository.list_coffees().await {
            Ok(coffees) => {
                debug!("Fetched {} coffees", coffees.len());
                _ = self.inner.coffee_list.send_replace(Some(coffees));
            }
            Err(e @ Error::Unauthorized) => {
                self.fail("fetch coffees", &e).await;
                _ = self.inner.coffee_list.send_replace(Some(Vec::new()));
                self.set_error(Some(e.to_string()));
            }
            Err(e @ Error::NoToken) => {
                info!("Not fetching coffees: {}", e);
                self.set_error(Some(e.to_string()));
            }
            Err(e) => {
                self.fail("fetch coffees", &e).await;
                self.set_error(Some(format!("could not fetch coffees: {e}")));
            }
        }
    }

    pub(crate) async fn load_coffee_detail(&self, token: &SecretString, id: i32) {
        match self.inner.api.coffee_detail(token, id).await {
            Ok(detail) => {
                _ = self.inner.coffee_detail.send_replace(Some(detail));
            }
            Err(e) => {
                self.fail(&format!("load coffee {id}"), &e).await;
                _ = self.inner.coffee_detail.send_replace(None);
            }
        }
    }

    pub(crate) async fn load_comments(&self, token: &SecretString, coffee_id: i32) {
        let _refreshing = self.inner.refreshes.begin();
        let _serial = self.inner.refresh.lock().await;
        self.set_error(None);

        match self.inner.api.list_comments(token, coffee_id).await {
            Ok(comments) => {
                debug!("Loaded {} comments for coffee {}", comments.len(), coffee_id);
                _ = self.inner.comments.send_replace(comments);
            }
            Err(e) => {
                self.fail(&format!("load comments for coffee {coffee_id}"), &e)
                    .await;
                _ = self.inner.comments.send_replace(Vec::new());
                self.set_error(Some(COMMENTS_UNAVAILABLE.to_owned()));
            }
        }
    }

    /// Loads a coffee's detail and then its comments. The comments are not
    /// requested when the detail could not be loaded, which includes the
    /// server rejecting the token.
    pub(crate) async fn open_coffee(&self, token: &SecretString, id: i32) {
        self.load_coffee_detail(token, id).await;
        let loaded = self.inner.coffee_detail.borrow().is_some();
        if loaded {
            self.load_comments(token, id).await;
        } else {
            debug!("Not loading comments for coffee {}", id);
        }
    }

    /// Posts a comment, then refreshes the comments of its coffee. Exactly one
    /// of the callbacks runs.
    pub(crate) async fn post_comment<S, E>(
        &self,
        token: &SecretString,
        comment: Comment,
        on_success: S,
        on_error: E,
    ) where
        S: FnOnce(Comment) + Send,
        E: FnOnce(String) + Send,
    {
        match self.inner.api.post_comment(token, &comment).await {
            Ok(created) => {
                info!("Posted comment {} on coffee {}", created.id, comment.coffee_id);
                on_success(created);
                self.load_comments(token, comment.coffee_id).await;
            }
            Err(e) => {
                self.fail(&format!("post a comment on coffee {}", comment.coffee_id), &e)
                    .await;
                on_error(format!("Error: {e}"));
            }
        }
    }

    pub(crate) fn launch<F, Fut>(&self, action: F) -> JoinHandle<()>
    where
        F: FnOnce(Self) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.inner.scope.spawn(action(self.clone()))
    }

    pub(crate) fn close(&self) {
        self.inner.scope.close();
    }

    pub(crate) async fn wait(&self) {
        self.inner.scope.wait().await;
    }
}

#[cfg(test)]
mod tests {
    use tokio::task;

    use crate::{
        api::mock::{self, Call, Failure, Mock},
        controller::{fixture, fixture_with, login::LoginState},
        error::Result,
        render,
    };

    use super::*;

    fn token() -> SecretString {
        SecretString::new(mock::TOKEN.to_owned())
    }

    async fn wait_until_refreshing(controller: &Controller) -> Result<()> {
        _ = controller
            .is_refreshing()
            .wait_for(|refreshing| *refreshing)
            .await
            .map_err(|_| Error::Cancelled)?;
        Ok(())
    }

    #[tokio::test]
    async fn fetch_coffees_after_login() -> Result<()> {
        let fixture = fixture().await?;
        fixture.log_in().await;
        fixture.coffee.fetch_coffees().await;

        let list = fixture.coffee.coffee_list().borrow().clone().unwrap_or_default();
        assert!(list.contains(&Coffee {
            id: 1,
            name: "Espresso".to_owned(),
            comment_count: "3".to_owned(),
        }));
        assert!(!*fixture.coffee.is_refreshing().borrow());
        assert_eq!(*fixture.coffee.error_message().borrow(), None);
        Ok(())
    }

    #[tokio::test]
    async fn fetch_coffees_without_token() -> Result<()> {
        let fixture = fixture().await?;
        fixture.coffee.fetch_coffees().await;

        assert!(fixture.mock.calls().await.is_empty());
        assert!(fixture.coffee.coffee_list().borrow().is_none());
        assert_eq!(
            fixture.coffee.error_message().borrow().as_deref(),
            Some("you are not logged in")
        );
        Ok(())
    }

    #[tokio::test]
    async fn unauthorized_fetch_forces_logout() -> Result<()> {
        let fixture = fixture().await?;
        fixture.log_in().await;
        fixture.mock.fail_with(Some(Failure::Unauthorized)).await;

        fixture.coffee.fetch_coffees().await;

        assert!(!fixture.repository.session().is_authenticated());
        assert!(matches!(*fixture.login.state().borrow(), LoginState::Idle));
        assert_eq!(*fixture.coffee.coffee_list().borrow(), Some(Vec::new()));
        assert!(!*fixture.coffee.is_refreshing().borrow());
        Ok(())
    }

    #[tokio::test]
    async fn other_fetch_failures_keep_previous_list() -> Result<()> {
        let fixture = fixture().await?;
        fixture.log_in().await;
        fixture.coffee.fetch_coffees().await;

        fixture.mock.fail_with(Some(Failure::Status(503))).await;
        fixture.coffee.fetch_coffees().await;

        assert_eq!(
            fixture.coffee.coffee_list().borrow().as_ref().map(Vec::len),
            Some(2)
        );
        let message = fixture.coffee.error_message().borrow().clone().unwrap_or_default();
        assert!(message.contains("503"));
        assert!(fixture.repository.session().is_authenticated());
        Ok(())
    }

    #[tokio::test]
    async fn coffee_detail_renders() -> Result<()> {
        let fixture = fixture().await?;
        fixture.log_in().await;
        fixture.coffee.fetch_coffees().await;
        fixture.coffee.load_coffee_detail(&token(), 1).await;

        let detail = fixture.coffee.coffee_detail().borrow().clone();
        let detail = detail.ok_or(Error::Cancelled)?;
        assert_eq!(detail.name, "Espresso");
        assert!(detail.description_html.contains("<b>"));

        let text = render::html_to_text(&detail.description_html);
        assert!(text.contains("short, intense coffee."));
        assert!(!text.contains('<'));
        Ok(())
    }

    #[tokio::test]
    async fn coffee_detail_failure_clears() -> Result<()> {
        let fixture = fixture().await?;
        fixture.coffee.load_coffee_detail(&token(), 1).await;
        assert!(fixture.coffee.coffee_detail().borrow().is_some());

        fixture.coffee.load_coffee_detail(&token(), 99).await;
        assert!(fixture.coffee.coffee_detail().borrow().is_none());
        Ok(())
    }

    #[tokio::test]
    async fn comments_load() -> Result<()> {
        let fixture = fixture().await?;
        fixture.coffee.load_comments(&token(), 1).await;

        let comments = fixture.coffee.comments().borrow().clone();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].user, "ana");
        assert_eq!(*fixture.coffee.error_message().borrow(), None);
        Ok(())
    }

    #[tokio::test]
    async fn comments_failure_surfaces_message() -> Result<()> {
        let fixture = fixture().await?;
        fixture.coffee.load_comments(&token(), 1).await;
        fixture.mock.fail_with(Some(Failure::Status(500))).await;
        fixture.coffee.load_comments(&token(), 1).await;

        assert!(fixture.coffee.comments().borrow().is_empty());
        assert_eq!(
            fixture.coffee.error_message().borrow().as_deref(),
            Some(COMMENTS_UNAVAILABLE)
        );
        assert!(!*fixture.coffee.is_refreshing().borrow());
        Ok(())
    }

    #[tokio::test]
    async fn unauthorized_comments_force_logout() -> Result<()> {
        let fixture = fixture().await?;
        fixture.log_in().await;
        fixture.coffee.load_comments(&SecretString::new("stale".to_owned()), 1).await;

        assert!(!fixture.repository.session().is_authenticated());
        assert_eq!(
            fixture.coffee.error_message().borrow().as_deref(),
            Some(COMMENTS_UNAVAILABLE)
        );
        Ok(())
    }

    #[tokio::test]
    async fn refreshing_spans_the_call() -> Result<()> {
        let (mock, gate) = Mock::new().gated();
        let fixture = fixture_with(mock).await?;

        let handle = fixture
            .coffee
            .launch(|coffee| async move { coffee.load_comments(&token(), 1).await });
        wait_until_refreshing(&fixture.coffee).await?;
        assert!(fixture.coffee.comments().borrow().is_empty());

        gate.add_permits(1);
        handle.await?;
        assert!(!*fixture.coffee.is_refreshing().borrow());
        assert_eq!(fixture.coffee.comments().borrow().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn refreshing_spans_a_failed_call() -> Result<()> {
        let (mock, gate) = Mock::new().gated();
        let fixture = fixture_with(mock).await?;
        fixture.mock.fail_with(Some(Failure::Status(502))).await;

        let handle = fixture
            .coffee
            .launch(|coffee| async move { coffee.load_comments(&token(), 1).await });
        wait_until_refreshing(&fixture.coffee).await?;

        gate.add_permits(1);
        handle.await?;
        assert!(!*fixture.coffee.is_refreshing().borrow());
        assert!(fixture.coffee.error_message().borrow().is_some());
        Ok(())
    }

    #[tokio::test]
    async fn closing_resets_refreshing() -> Result<()> {
        let (mock, _gate) = Mock::new().gated();
        let fixture = fixture_with(mock).await?;

        let _handle = fixture
            .coffee
            .launch(|coffee| async move { coffee.load_comments(&token(), 1).await });
        wait_until_refreshing(&fixture.coffee).await?;

        fixture.coffee.close();
        fixture.coffee.wait().await;
        assert!(!*fixture.coffee.is_refreshing().borrow());
        assert!(fixture.mock.calls().await.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn refreshes_run_one_at_a_time() -> Result<()> {
        let (mock, gate) = Mock::new().gated();
        let fixture = fixture_with(mock).await?;

        let first = fixture
            .coffee
            .launch(|coffee| async move { coffee.load_comments(&token(), 1).await });
        let second = fixture
            .coffee
            .launch(|coffee| async move { coffee.load_comments(&token(), 5).await });
        wait_until_refreshing(&fixture.coffee).await?;
        for _ in 0..4 {
            task::yield_now().await;
        }
        assert!(fixture.mock.calls().await.is_empty());

        gate.add_permits(2);
        first.await?;
        second.await?;

        assert_eq!(
            fixture.mock.calls().await,
            vec![Call::ListComments(1), Call::ListComments(5)]
        );
        let comments = fixture.coffee.comments().borrow().clone();
        assert!(comments.iter().all(|comment| comment.coffee_id == 5));
        assert!(!*fixture.coffee.is_refreshing().borrow());
        Ok(())
    }

    #[tokio::test]
    async fn posting_refreshes_comments_once() -> Result<()> {
        let fixture = fixture().await?;
        let mut created = None;
        let mut failure = None;

        fixture
            .coffee
            .post_comment(
                &token(),
                Comment::draft(5, "u", "t"),
                |comment| created = Some(comment),
                |message| failure = Some(message),
            )
            .await;

        assert!(failure.is_none());
        assert_eq!(created.map(|comment| comment.coffee_id), Some(5));
        assert_eq!(fixture.mock.count(&Call::ListComments(5)).await, 1);
        assert_eq!(fixture.mock.count(&Call::PostComment(5)).await, 1);

        let comments = fixture.coffee.comments().borrow().clone();
        assert!(comments
            .iter()
            .any(|comment| comment.user == "u" && comment.text == "t"));
        Ok(())
    }

    #[tokio::test]
    async fn posting_failure_reports_status() -> Result<()> {
        let fixture = fixture().await?;
        fixture.mock.fail_with(Some(Failure::Status(500))).await;
        let mut created = None;
        let mut failure = None;

        fixture
            .coffee
            .post_comment(
                &token(),
                Comment::draft(5, "u", "t"),
                |comment| created = Some(comment),
                |message| failure = Some(message),
            )
            .await;

        assert!(created.is_none());
        let message = failure.unwrap_or_default();
        assert!(message.starts_with("Error: "));
        assert!(message.contains("500"));
        assert_eq!(fixture.mock.count(&Call::ListComments(5)).await, 0);
        Ok(())
    }

    #[tokio::test]
    async fn login_fetch_detail_scenario() -> Result<()> {
        let fixture = fixture_with(Mock::new()).await?;
        fixture
            .login
            .login(mock::USER, SecretString::new(mock::PASSWORD.to_owned()))
            .await;
        let token = fixture
            .repository
            .session()
            .token()
            .cloned()
            .ok_or(Error::NoToken)?;

        fixture.coffee.fetch_coffees().await;
        fixture.coffee.load_coffee_detail(&token, 1).await;

        assert!(fixture
            .coffee
            .coffee_list()
            .borrow()
            .iter()
            .flatten()
            .any(|coffee| coffee.id == 1 && coffee.name == "Espresso" && coffee.comment_count == "3"));
        let html = fixture
            .coffee
            .coffee_detail()
            .borrow()
            .as_ref()
            .map(|detail| detail.description_html.clone())
            .unwrap_or_default();
        assert!(!render::html_to_text(&html).is_empty());
        Ok(())
    }

    #[test]
    fn overlapping_refreshes_keep_the_flag_up() {
        let refreshes = Refreshes::new();
        let flag = refreshes.flag.subscribe();

        let first = refreshes.begin();
        let second = refreshes.begin();
        assert!(*flag.borrow());

        drop(first);
        assert!(*flag.borrow());

        drop(second);
        assert!(!*flag.borrow());
    }

    #[tokio::test]
    async fn queued_refresh_counts_as_refreshing() -> Result<()> {
        let (mock, gate) = Mock::new().gated();
        let fixture = fixture_with(mock).await?;

        let first = fixture
            .coffee
            .launch(|coffee| async move { coffee.load_comments(&token(), 1).await });
        let second = fixture
            .coffee
            .launch(|coffee| async move { coffee.load_comments(&token(), 5).await });
        wait_until_refreshing(&fixture.coffee).await?;

        gate.add_permits(1);
        first.await?;
        assert_eq!(fixture.mock.count(&Call::ListComments(5)).await, 0);
        assert!(*fixture.coffee.is_refreshing().borrow());

        gate.add_permits(1);
        second.await?;
        assert!(!*fixture.coffee.is_refreshing().borrow());
        Ok(())
    }

    #[tokio::test]
    async fn opening_a_coffee_loads_detail_and_comments() -> Result<()> {
        let fixture = fixture().await?;
        fixture.coffee.open_coffee(&token(), 1).await;

        assert!(fixture.coffee.coffee_detail().borrow().is_some());
        assert_eq!(fixture.coffee.comments().borrow().len(), 1);
        assert_eq!(
            fixture.mock.calls().await,
            vec![Call::CoffeeDetail(1), Call::ListComments(1)]
        );
        Ok(())
    }

    #[tokio::test]
    async fn rejected_token_skips_comments() -> Result<()> {
        let fixture = fixture().await?;
        fixture.log_in().await;
        fixture.mock.fail_with(Some(Failure::Unauthorized)).await;

        fixture.coffee.open_coffee(&token(), 1).await;

        assert!(!fixture.repository.session().is_authenticated());
        assert!(fixture.coffee.coffee_detail().borrow().is_none());
        assert_eq!(fixture.mock.count(&Call::ListComments(1)).await, 0);
        Ok(())
    }

    #[tokio::test]
    async fn missing_coffee_skips_comments() -> Result<()> {
        let fixture = fixture().await?;
        fixture.coffee.open_coffee(&token(), 99).await;

        assert!(fixture.coffee.coffee_detail().borrow().is_none());
        assert_eq!(fixture.mock.calls().await, vec![Call::CoffeeDetail(99)]);
        Ok(())
    }
}
