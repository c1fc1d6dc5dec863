//! Session-managed HTTP client for the Campus platform.
//!
//! Owns the access/refresh token pair, attaches bearer credentials to every
//! authenticated call, and recovers from token expiry with a single
//! coordinated refresh and one transparent replay of the request that
//! tripped it. Concurrent callers that hit the same expiry share one
//! refresh exchange.
//!
//! ```no_run
//! use campus_client::{LoginRequest, SessionManager};
//!
//! # async fn run() -> Result<(), campus_client::ClientError> {
//! let manager = SessionManager::builder()
//!     .base_url("https://api.campus.example")
//!     .build()?;
//!
//! // Pick up a session persisted by a previous run, if there is one.
//! if !manager.init().await {
//!     manager
//!         .login(LoginRequest::with_email("jdoe@example.com", "hunter2"))
//!         .await?;
//! }
//!
//! let profile = manager.profile().await?;
//! println!("hello, {}", profile.full_name());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod session;
#[cfg(target_arch = "wasm32")]
pub mod storage;
pub mod types;

pub use campus_core::{
    ListEnvelope, MemoryTokenStore, Session, SessionState, SessionStatus, SessionUpdate,
    StoredSession, SubscriptionId, TokenStore, UserProfile, UserRole,
};
pub use client::{CampusClient, CampusClientBuilder};
pub use error::ClientError;
pub use session::{RefreshCoordinator, SessionManager, SessionManagerBuilder};
#[cfg(target_arch = "wasm32")]
pub use storage::WebTokenStore;
pub use types::{
    Course, CourseFields, LoginRequest, LoginResponse, LogoutRequest, ProfileFields,
    ProfileImage, ProfileUpdate, RegisterOutcome, RegisterRequest, RegisterResponse, Student,
    TokenRefreshRequest, TokenRefreshResponse,
};
