// Toxicity scoring: trait-based abstraction for swappable classifiers.
//
// The ToxicityOracle trait defines the interface. OnnxOracle runs a local
// pretrained model; PerspectiveOracle calls Google's Perspective API. The
// pipeline only ever sees the trait, so tests substitute a deterministic stub.

pub mod download;
pub mod onnx;
pub mod perspective;
pub mod traits;
