//! Typed Horizon cloud API
//!
//! This crate wraps the Horizon REST services behind a household session.
//! It uses the private `rest-client` crate for the HTTP transport.
//!
//! # Sessions
//!
//! A [`SessionStore`] owns the current [`Session`]. Every authenticated call
//! goes through the [`MetadataFetcher`], which re-authenticates once when the
//! access token is rejected:
//!
//! ```rust,ignore
//! use horizon_api::{HorizonClient, MetadataFetcher, PasswordAuthenticator, RegionSettings,
//!                   RetryPolicy, ServiceEndpoints, SessionStore};
//! use rest_client::RestClient;
//! use std::sync::Arc;
//!
//! let rest = RestClient::new();
//! let region = RegionSettings::lookup("nl").unwrap();
//! let endpoints = ServiceEndpoints::discover(&rest, region)?;
//! let auth = PasswordAuthenticator::new(rest.clone(), region, &endpoints, "user", "secret");
//! let sessions = Arc::new(SessionStore::establish(Arc::new(auth))?);
//! let fetcher = MetadataFetcher::new(rest, sessions, RetryPolicy::default());
//! let client = HorizonClient::new(fetcher, endpoints, region);
//! let customer = client.customer()?;
//! ```

pub mod auth;
pub mod client;
pub mod endpoints;
pub mod error;
pub mod fetcher;
pub mod model;
pub mod region;
pub mod session;

pub use auth::{Authenticator, PasswordAuthenticator, RefreshTokenAuthenticator};
pub use client::{HorizonClient, MetadataSource};
pub use endpoints::ServiceEndpoints;
pub use error::{ApiError, AuthError, FetchError, Result};
pub use fetcher::{MetadataFetcher, RetryPolicy};
pub use model::{
    AssignedDevice, ChannelRecord, Customer, RecordingDetail, RecordingEntry, RecordingGroup,
    RecordingQuota, ReplayEvent, ShowEpisodeEntry, VodDetail,
};
pub use region::{is_supported_platform, AuthFlow, Hardware, RegionSettings};
pub use session::{Session, SessionStore};

pub use rest_client::RestClient;
