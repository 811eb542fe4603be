//! Authentication state trait and macro.

use super::service::AuthService;

/// Trait for router state types that can authenticate requests.
pub trait HasAuthBackend {
    fn auth(&self) -> &AuthService;
}

/// Implement `HasAuthBackend` for a state struct with an `auth: AuthService` field.
///
/// # Example
/// ```ignore
/// #[derive(Clone)]
/// pub struct MyState {
///     pub auth: AuthService,
/// }
///
/// impl_has_auth_backend!(MyState);
/// ```
#[macro_export]
macro_rules! impl_has_auth_backend {
    ($state_type:ty) => {
        impl $crate::auth::HasAuthBackend for $state_type {
            fn auth(&self) -> &$crate::auth::AuthService {
                &self.auth
            }
        }
    };
}
