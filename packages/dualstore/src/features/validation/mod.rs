//! Post-write business validation

pub mod rules;

pub use rules::{
    approved_gemstones, AllowList, Predicate, ValidationRule, Validator, DEFAULT_APPROVED_GEMS,
};
