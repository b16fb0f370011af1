// Flagging pipeline: hybrid classifier + keyword flagging over posts.
//
// Each post is scored once by the toxicity oracle. A confident harmful
// verdict becomes a "General Toxicity" finding; every taxonomy category
// whose triggers appear in the post becomes a finding carrying the same
// toxicity confidence. Posts are independent, so the driver fans them out
// while keeping findings in input order.

pub mod flagging;

pub use flagging::{classify, findings_for, run, PipelineRun, GENERAL_TOXICITY, TOXICITY_THRESHOLD};
