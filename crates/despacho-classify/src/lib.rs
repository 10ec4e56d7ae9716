//! Despacho Adaptive Classifier
//!
//! Resolves a document's type through three stages, each tried only when
//! the previous one failed or fell below its confidence threshold:
//!
//! 1. **Adaptive**: weighted nearest-neighbor vote over the vector index
//! 2. **LLM**: zero-shot prompt against the configured generators, in order
//! 3. **Rule-based**: keyword tables; always terminates, worst case with
//!    the `Unclassified` sentinel at confidence zero
//!
//! Classification never returns an error to the caller.

#![warn(missing_docs)]

pub mod classifier;
pub mod keywords;
pub mod prompt;

pub use classifier::{AdaptiveClassifier, ClassifierConfig};
