//! Private HTTP connections.

use reqwest::{redirect, Client};
use std::time::Duration;

/// Builds a client that owns its connection for a single request.
///
/// Pooling is disabled so no connection outlives the caller, redirects are
/// not followed, and proxy settings from the environment are ignored. The
/// connection is released when the returned client is dropped.
pub(crate) fn private_client(timeout: Option<Duration>) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .pool_max_idle_per_host(0)
        .redirect(redirect::Policy::none())
        .no_proxy();

    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }

    builder.build()
}
