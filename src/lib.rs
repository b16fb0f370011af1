// Next Sight: harmful-content analysis for X.com accounts
//
// This is the library root. Posts fetched from the X API flow through the
// flagging pipeline (toxicity oracle + keyword taxonomy) into a report; the
// vault keeps the API bearer token encrypted between runs.

pub mod config;
pub mod error;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod rate_limiter;
pub mod status;
pub mod taxonomy;
pub mod toxicity;
pub mod vault;
pub mod xapi;
