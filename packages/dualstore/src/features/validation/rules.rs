//! Business validation applied after both writes
//!
//! A `Validator` runs its rules in order and stops at the first rejection,
//! which surfaces as `ErrorKind::Validation`.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::features::dao::domain::models::Gemstone;
use crate::shared::models::{DaoError, Result};

/// Gem names approved out of the box
pub const DEFAULT_APPROVED_GEMS: &[&str] = &[
    "ALEXANDRITE",
    "AQUAMARINE",
    "DIAMOND",
    "OPAL",
    "PEARL",
    "RUBY",
    "SAPPHIRE",
    "SPINEL",
    "TOPAZ",
];

pub trait ValidationRule<T>: Send + Sync {
    fn name(&self) -> &str;

    fn check(&self, record: &T) -> Result<()>;
}

/// Case-insensitive allow-list over one text field
pub struct AllowList<T> {
    name: String,
    allowed: BTreeSet<String>,
    field: fn(&T) -> &str,
}

impl<T> AllowList<T> {
    pub fn new<I, S>(name: impl Into<String>, allowed: I, field: fn(&T) -> &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            name: name.into(),
            allowed: allowed
                .into_iter()
                .map(|s| s.as_ref().to_uppercase())
                .collect(),
            field,
        }
    }

    pub fn allows(&self, value: &str) -> bool {
        self.allowed.contains(&value.to_uppercase())
    }
}

impl<T> ValidationRule<T> for AllowList<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn check(&self, record: &T) -> Result<()> {
        let value = (self.field)(record);
        if self.allows(value) {
            Ok(())
        } else {
            Err(DaoError::validation(format!(
                "{} rejected {:?}: not in the approved list",
                self.name, value
            )))
        }
    }
}

fn gemstone_name(gem: &Gemstone) -> &str {
    &gem.name
}

/// Allow-list over `Gemstone::name`
pub fn approved_gemstones<I, S>(names: I) -> AllowList<Gemstone>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    AllowList::new("approved_gemstone", names, gemstone_name)
}

/// Rule from a closure returning `true` when the record is acceptable
pub struct Predicate<T> {
    name: String,
    test: Arc<dyn Fn(&T) -> bool + Send + Sync>,
}

impl<T> Predicate<T> {
    pub fn new(name: impl Into<String>, test: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        Self {
            name: name.into(),
            test: Arc::new(test),
        }
    }
}

impl<T> ValidationRule<T> for Predicate<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn check(&self, record: &T) -> Result<()> {
        if (self.test)(record) {
            Ok(())
        } else {
            Err(DaoError::validation(format!("{} rejected the record", self.name)))
        }
    }
}

/// Ordered rule set
pub struct Validator<T> {
    rules: Vec<Arc<dyn ValidationRule<T>>>,
}

impl<T> Default for Validator<T> {
    fn default() -> Self {
        Self { rules: Vec::new() }
    }
}

impl<T> Clone for Validator<T> {
    fn clone(&self) -> Self {
        Self {
            rules: self.rules.clone(),
        }
    }
}

impl<T> Validator<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rule(mut self, rule: impl ValidationRule<T> + 'static) -> Self {
        self.rules.push(Arc::new(rule));
        self
    }

    pub fn validate(&self, record: &T) -> Result<()> {
        for rule in &self.rules {
            rule.check(record)?;
        }
        Ok(())
    }

    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|rule| rule.name()).collect()
    }
}

impl<T> fmt::Debug for Validator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.rule_names()).finish()
    }
}
