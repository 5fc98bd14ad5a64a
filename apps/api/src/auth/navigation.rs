//! Role-gated navigation for the portal's client routes.
//!
//! Every role-restricted route sends a principal of the wrong role to the
//! generic dashboard router, which requires no role itself and forwards by
//! role. That keeps every redirect chain finite.

use serde::Serialize;
use thiserror::Error;

use crate::auth::models::{Principal, Role};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Unauthenticated,
    /// Signed in, role not yet fetched from the profile store.
    UnknownPending,
    Employee,
    Hr,
}

impl SessionState {
    pub const ALL: [SessionState; 4] = [
        SessionState::Unauthenticated,
        SessionState::UnknownPending,
        SessionState::Employee,
        SessionState::Hr,
    ];

    pub fn from_principal(principal: Option<&Principal>) -> Self {
        match principal {
            None => SessionState::Unauthenticated,
            Some(p) => SessionState::Unauthenticated.begin_sign_in().role_resolved(p.role),
        }
    }

    pub fn begin_sign_in(self) -> Self {
        match self {
            SessionState::Unauthenticated => SessionState::UnknownPending,
            other => other,
        }
    }

    /// Ignored while unauthenticated: a role without a sign-in grants nothing.
    pub fn role_resolved(self, role: Role) -> Self {
        match self {
            SessionState::Unauthenticated => SessionState::Unauthenticated,
            _ => match role {
                Role::Employee => SessionState::Employee,
                Role::Hr => SessionState::Hr,
            },
        }
    }

    pub fn sign_out(self) -> Self {
        SessionState::Unauthenticated
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Root,
    Login,
    Signup,
    Dashboard,
    EmployeeDashboard,
    HrDashboard,
}

impl Route {
    pub const ALL: [Route; 6] = [
        Route::Root,
        Route::Login,
        Route::Signup,
        Route::Dashboard,
        Route::EmployeeDashboard,
        Route::HrDashboard,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Route::Root => "/",
            Route::Login => "/login",
            Route::Signup => "/signup",
            Route::Dashboard => "/dashboard",
            Route::EmployeeDashboard => "/employee-dashboard",
            Route::HrDashboard => "/hr-dashboard",
        }
    }

    pub fn from_path(path: &str) -> Option<Route> {
        let trimmed = path.trim();
        let normalized = if trimmed.len() > 1 {
            trimmed.trim_end_matches('/')
        } else {
            trimmed
        };
        Route::ALL.into_iter().find(|r| r.path() == normalized)
    }

    pub fn requires_sign_in(&self) -> bool {
        matches!(
            self,
            Route::Dashboard | Route::EmployeeDashboard | Route::HrDashboard
        )
    }

    pub fn required_role(&self) -> Option<Role> {
        match self {
            Route::EmployeeDashboard => Some(Role::Employee),
            Route::HrDashboard => Some(Role::Hr),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(tag = "action", content = "route", rename_all = "snake_case")]
pub enum Navigation {
    Render(Route),
    Redirect(Route),
    /// Show a loading state until the role is known.
    Wait,
}

/// One navigation step for `route` in `state`.
pub fn navigate(route: Route, state: SessionState) -> Navigation {
    if route == Route::Root {
        return Navigation::Redirect(Route::Login);
    }
    if !route.requires_sign_in() {
        return Navigation::Render(route);
    }

    let role = match state {
        SessionState::Unauthenticated => return Navigation::Redirect(Route::Login),
        SessionState::UnknownPending => return Navigation::Wait,
        SessionState::Employee => Role::Employee,
        SessionState::Hr => Role::Hr,
    };

    match route.required_role() {
        Some(required) if required == role => Navigation::Render(route),
        Some(_) => Navigation::Redirect(Route::Dashboard),
        None => match role {
            Role::Employee => Navigation::Redirect(Route::EmployeeDashboard),
            Role::Hr => Navigation::Redirect(Route::HrDashboard),
        },
    }
}

pub const MAX_REDIRECTS: usize = 4;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("redirect loop starting at {start:?}")]
pub struct RedirectLoop {
    pub start: Route,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Resolution {
    pub outcome: Navigation,
    /// Routes visited after the first, in order.
    pub redirects: Vec<Route>,
}

/// Follows redirects until a route renders or the session must wait.
pub fn follow(start: Route, state: SessionState) -> Result<Resolution, RedirectLoop> {
    let mut route = start;
    let mut redirects = Vec::new();
    loop {
        match navigate(route, state) {
            Navigation::Redirect(next) => {
                if redirects.len() == MAX_REDIRECTS {
                    return Err(RedirectLoop { start });
                }
                redirects.push(next);
                route = next;
            }
            outcome => return Ok(Resolution { outcome, redirects }),
        }
    }
}
