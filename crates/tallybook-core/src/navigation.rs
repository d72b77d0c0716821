//! Client routes and the login guard.

use std::fmt;

use crate::auth::AuthManager;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Login,
    Dashboard,
    Transactions,
    ManageTransactions,
    AddTransaction,
    EditTransaction(String),
    Budget,
}

impl Route {
    pub fn parse(path: &str) -> Option<Self> {
        let trimmed = path.trim().trim_end_matches('/');
        let route = match trimmed {
            "" => Route::Dashboard,
            "/login" => Route::Login,
            "/transactions" => Route::Transactions,
            "/transactions/manage" => Route::ManageTransactions,
            "/transactions/add" => Route::AddTransaction,
            "/budget" => Route::Budget,
            other => {
                let id = other.strip_prefix("/transactions/edit/")?;
                if id.is_empty() || id.contains('/') {
                    return None;
                }
                Route::EditTransaction(id.to_string())
            }
        };
        Some(route)
    }

    pub fn path(&self) -> String {
        match self {
            Route::Login => "/login".to_string(),
            Route::Dashboard => "/".to_string(),
            Route::Transactions => "/transactions".to_string(),
            Route::ManageTransactions => "/transactions/manage".to_string(),
            Route::AddTransaction => "/transactions/add".to_string(),
            Route::EditTransaction(id) => format!("/transactions/edit/{}", id),
            Route::Budget => "/budget".to_string(),
        }
    }

    pub fn requires_auth(&self) -> bool {
        !matches!(self, Route::Login)
    }

    pub fn title(&self) -> &'static str {
        match self {
            Route::Login => "Login",
            Route::Dashboard => "Dashboard",
            Route::Transactions => "Transaction Overview",
            Route::ManageTransactions | Route::AddTransaction => "Add Transaction",
            Route::EditTransaction(_) => "Edit Transaction",
            Route::Budget => "Budget Management",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// The route to actually show: login when the target needs a session
/// and there is none.
pub fn guard(target: Route, auth: &AuthManager) -> Route {
    if target.requires_auth() && !auth.is_authenticated() {
        Route::Login
    } else {
        target
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::parse_base_url;
    use crate::auth::{Session, SessionStore};

    fn auth(session: Option<Session>) -> AuthManager {
        let store = SessionStore::in_memory();
        if let Some(session) = session {
            store.save(&session).unwrap();
        }
        let base = parse_base_url("http://localhost:8000/api/").unwrap();
        AuthManager::new(reqwest::Client::new(), base, store)
    }

    #[test]
    fn test_parse_routes() {
        assert_eq!(Route::parse("/"), Some(Route::Dashboard));
        assert_eq!(Route::parse("/login"), Some(Route::Login));
        assert_eq!(Route::parse("/transactions/"), Some(Route::Transactions));
        assert_eq!(Route::parse("/transactions/manage"), Some(Route::ManageTransactions));
        assert_eq!(Route::parse("/transactions/add"), Some(Route::AddTransaction));
        assert_eq!(
            Route::parse("/transactions/edit/42"),
            Some(Route::EditTransaction("42".to_string()))
        );
        assert_eq!(Route::parse("/budget"), Some(Route::Budget));
        assert_eq!(Route::parse("/transactions/edit/"), None);
        assert_eq!(Route::parse("/reports"), None);
    }

    #[test]
    fn test_path_matches_parse() {
        let route = Route::EditTransaction("7".to_string());
        assert_eq!(Route::parse(&route.path()), Some(route));
        assert_eq!(Route::Dashboard.to_string(), "/");
    }

    #[test]
    fn test_guard_redirects_without_session() {
        let auth = auth(None);
        assert_eq!(guard(Route::Budget, &auth), Route::Login);
        assert_eq!(guard(Route::Login, &auth), Route::Login);
    }

    #[test]
    fn test_guard_allows_with_session() {
        let auth = auth(Some(Session::new("A1", "R1", "u1")));
        assert_eq!(guard(Route::Transactions, &auth), Route::Transactions);
    }
}
