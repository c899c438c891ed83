//! Utility functions shared by the estimators and the annotator.

pub mod safe_cast;
