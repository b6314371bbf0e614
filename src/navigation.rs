// Navigation collaborator
// Fire-and-forget hook invoked when the session cannot be recovered

/// Invoked exactly once per failed refresh to send the user back to the
/// login surface. Must be idempotent; implementations are expected to
/// no-op when the application is already showing login.
pub trait SessionNavigator: Send + Sync {
    fn redirect_to_login(&self);
}

/// Navigator that does nothing, for headless and test use.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNavigator;

impl SessionNavigator for NoopNavigator {
    fn redirect_to_login(&self) {}
}
