// Credential cache module.
// Key-value token storage, credential model and derived authentication state.

pub mod credential;
pub mod paths;
pub mod store;

pub use credential::{
    AuthState, CREDENTIAL_KEYS, Credential, derive_auth_state, load, purge, save,
};
pub use store::{CredentialStore, FileStore, MemoryStore};
