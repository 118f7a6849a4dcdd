//! Lazy record sequences returned by `find_all`
//!
//! A `RecordSet` pulls pages from its `PageSource` on demand. Each call to
//! `iter` starts again from the first page, so the same set can be walked
//! more than once; a failing page fetch surfaces as an `Err` item and ends
//! that walk.

use std::fmt;
use std::sync::Arc;

use crate::shared::models::Result;

/// One fetched page
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub records: Vec<T>,
    /// No further pages follow
    pub last: bool,
}

impl<T> Page<T> {
    /// Page built from a `LIMIT limit` query: short means last
    pub fn from_rows(records: Vec<T>, limit: usize) -> Self {
        let last = records.len() < limit;
        Self { records, last }
    }
}

/// Anything that can fetch `limit` records starting at `offset`
pub trait PageSource<T>: Send + Sync {
    fn page(&self, offset: usize, limit: usize) -> Result<Page<T>>;
}

impl<T, F> PageSource<T> for F
where
    F: Fn(usize, usize) -> Result<Page<T>> + Send + Sync,
{
    fn page(&self, offset: usize, limit: usize) -> Result<Page<T>> {
        self(offset, limit)
    }
}

pub struct RecordSet<T> {
    source: Box<dyn PageSource<T>>,
    page_size: usize,
}

impl<T: 'static> RecordSet<T> {
    pub fn new(source: impl PageSource<T> + 'static, page_size: usize) -> Self {
        Self {
            source: Box::new(source),
            page_size: page_size.max(1),
        }
    }

    /// Set over records already in memory
    pub fn from_vec(records: Vec<T>, page_size: usize) -> Self
    where
        T: Clone + Send + Sync,
    {
        let records = Arc::new(records);
        Self::new(
            move |offset: usize, limit: usize| -> Result<Page<T>> {
                let end = (offset + limit).min(records.len());
                let start = offset.min(end);
                Ok(Page {
                    records: records[start..end].to_vec(),
                    last: end >= records.len(),
                })
            },
            page_size,
        )
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Walk from the first page
    pub fn iter(&self) -> RecordIter<'_, T> {
        RecordIter {
            set: self,
            buffer: Vec::new().into_iter(),
            offset: 0,
            done: false,
        }
    }

    /// Collect everything, stopping at the first failure
    pub fn to_vec(&self) -> Result<Vec<T>> {
        self.iter().collect()
    }
}

impl<'a, T: 'static> IntoIterator for &'a RecordSet<T> {
    type Item = Result<T>;
    type IntoIter = RecordIter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T> fmt::Debug for RecordSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordSet")
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

pub struct RecordIter<'a, T> {
    set: &'a RecordSet<T>,
    buffer: std::vec::IntoIter<T>,
    offset: usize,
    done: bool,
}

impl<T> Iterator for RecordIter<'_, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.buffer.next() {
                return Some(Ok(record));
            }
            if self.done {
                return None;
            }

            match self.set.source.page(self.offset, self.set.page_size) {
                Ok(page) => {
                    self.offset += page.records.len();
                    self.done = page.last || page.records.is_empty();
                    self.buffer = page.records.into_iter();
                }
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::DaoError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_iterates_across_pages() {
        let set = RecordSet::from_vec((1..=7).collect::<Vec<i32>>(), 3);
        assert_eq!(set.to_vec().unwrap(), vec![1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_restartable() {
        let set = RecordSet::from_vec(vec!["a", "b"], 1);
        let first: Vec<_> = set.iter().collect::<Result<_>>().unwrap();
        let second: Vec<_> = set.iter().collect::<Result<_>>().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_lazy_fetching() {
        let fetches = Arc::new(AtomicUsize::new(0));
        let counter = fetches.clone();
        let set = RecordSet::new(
            move |offset: usize, limit: usize| -> Result<Page<usize>> {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Page::from_rows(
                    (offset..(offset + limit).min(10)).collect::<Vec<usize>>(),
                    limit,
                ))
            },
            4,
        );
        assert_eq!(fetches.load(Ordering::SeqCst), 0);

        let first_two: Vec<usize> = set.iter().take(2).map(|r| r.unwrap()).collect();
        assert_eq!(first_two, vec![0, 1]);
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_page_failure_ends_iteration() {
        let set: RecordSet<i32> = RecordSet::new(
            |offset: usize, _limit: usize| -> Result<Page<i32>> {
                if offset == 0 {
                    Ok(Page {
                        records: vec![1, 2],
                        last: false,
                    })
                } else {
                    Err(DaoError::connectivity("gone"))
                }
            },
            2,
        );

        let items: Vec<Result<i32>> = set.iter().collect();
        assert_eq!(items.len(), 3);
        assert!(items[2].as_ref().unwrap_err().is_connectivity());
        assert!(set.to_vec().is_err());
    }
}
