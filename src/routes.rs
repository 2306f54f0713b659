//! Client-side routes and the guards that keep them consistent with the
//! session.
//!
//! Two routes exist: the unauthenticated entry (`/`, the auth form) and the
//! protected application view (`/application`).

#[cfg(test)]
#[path = "routes_test.rs"]
mod routes_test;

use std::sync::Arc;

use tokio::sync::watch;

use crate::state::session::Session;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Route {
    #[default]
    Entry,
    Application,
}

impl Route {
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Entry => "/",
            Self::Application => "/application",
        }
    }

    #[must_use]
    pub fn from_path(path: &str) -> Option<Self> {
        match path.trim_end_matches('/') {
            "" => Some(Self::Entry),
            "/application" => Some(Self::Application),
            _ => None,
        }
    }
}

/// What a route should do for the current session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Guard {
    Render,
    Loading,
    Redirect(Route),
}

/// Decide whether `route` may render.
///
/// Nothing redirects until bootstrap has finished. The entry route holds
/// still while a post-submit redirect is pending so the success message stays
/// readable.
#[must_use]
pub fn guard(route: Route, session: &Session, redirect_pending: bool) -> Guard {
    if session.loading || !session.bootstrapped {
        return Guard::Loading;
    }
    match (route, session.is_authenticated()) {
        (Route::Entry, true) if !redirect_pending => Guard::Redirect(Route::Application),
        (Route::Application, false) => Guard::Redirect(Route::Entry),
        _ => Guard::Render,
    }
}

/// Current-route holder shared by everything that navigates.
#[derive(Clone, Debug)]
pub struct Navigator {
    tx: Arc<watch::Sender<Route>>,
}

impl Navigator {
    #[must_use]
    pub fn new(initial: Route) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    pub fn navigate(&self, route: Route) {
        let changed = self.tx.send_if_modified(|current| {
            let changed = *current != route;
            *current = route;
            changed
        });
        if changed {
            tracing::debug!(path = route.path(), "navigated");
        }
    }

    #[must_use]
    pub fn current(&self) -> Route {
        *self.tx.borrow()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Route> {
        self.tx.subscribe()
    }
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new(Route::Entry)
    }
}
