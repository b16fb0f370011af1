// X (Twitter) API v2 client: user lookup and timeline fetching.
//
// A thin reqwest wrapper, authenticated with the bearer token from the
// vault. Each submodule handles one area of the API surface.

pub mod client;
pub mod posts;
