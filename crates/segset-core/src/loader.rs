//! Sequential batch driver over any [`ImageDataset`].
//!
//! Indices are ordered once up front (optionally shuffled with a seed), then
//! consumed in chunks of `batch_size`. Items are fetched one at a time on the
//! calling thread; there is no prefetching.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::debug;

use crate::collate::collate;
use crate::domain::Batch;
use crate::error::{DatasetError, Result};
use crate::ports::ImageDataset;

/// Batching options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderOptions {
    /// Items per batch. Must be non-zero.
    pub batch_size: usize,
    /// Shuffle the index order once at construction.
    pub shuffle: bool,
    /// Seed for the shuffle; `None` draws one from the OS.
    pub seed: Option<u64>,
    /// Skip a trailing batch smaller than `batch_size`.
    pub drop_last: bool,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            batch_size: 8,
            shuffle: false,
            seed: None,
            drop_last: false,
        }
    }
}

/// Iterator of [`Batch`]es drawn from a dataset.
///
/// A failing item fails its whole batch: the iterator yields `Err` for that
/// chunk and moves on to the next one, leaving the decision to skip, retry,
/// or abort with the caller.
pub struct BatchLoader<'a, D: ImageDataset + ?Sized> {
    dataset: &'a D,
    order: Vec<usize>,
    cursor: usize,
    options: LoaderOptions,
}

impl<'a, D: ImageDataset + ?Sized> BatchLoader<'a, D> {
    /// Creates a loader over `dataset`.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::Config`] if `batch_size` is zero.
    pub fn new(dataset: &'a D, options: LoaderOptions) -> Result<Self> {
        if options.batch_size == 0 {
            return Err(DatasetError::Config("batch_size must be at least 1".into()));
        }

        let mut order: Vec<usize> = (0..dataset.len()).collect();
        if options.shuffle {
            let mut rng = match options.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_rng(&mut rand::rng()),
            };
            order.shuffle(&mut rng);
        }

        Ok(Self {
            dataset,
            order,
            cursor: 0,
            options,
        })
    }

    /// Index order batches are drawn in.
    #[must_use]
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Total number of batches this loader yields.
    #[must_use]
    pub fn num_batches(&self) -> usize {
        let n = self.order.len();
        let bs = self.options.batch_size;
        if self.options.drop_last {
            n / bs
        } else {
            n.div_ceil(bs)
        }
    }

    fn load(&self, start: usize, end: usize) -> Result<Batch> {
        let items = self.order[start..end]
            .iter()
            .map(|&index| self.dataset.get(index))
            .collect::<Result<Vec<_>>>()?;
        collate(items)
    }
}

impl<D: ImageDataset + ?Sized> Iterator for BatchLoader<'_, D> {
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.cursor;
        if start >= self.order.len() {
            return None;
        }

        let end = (start + self.options.batch_size).min(self.order.len());
        if self.options.drop_last && end - start < self.options.batch_size {
            self.cursor = self.order.len();
            return None;
        }
        self.cursor = end;

        let result = self.load(start, end);
        if let Err(e) = &result {
            debug!("Batch over positions {start}..{end} failed: {e}");
        }
        Some(result)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::{Entry, ImageDimensions, Item};
    use candle_core::{Device, Tensor};

    /// Serves `len` items; the item's single value is its index.
    struct Counting {
        entries: Vec<Entry>,
        fail_at: Option<usize>,
    }

    impl Counting {
        fn new(len: usize) -> Self {
            Self {
                entries: (0..len)
                    .map(|i| Entry::new(format!("img{i}"), format!("img{i}.png")))
                    .collect(),
                fail_at: None,
            }
        }
    }

    impl ImageDataset for Counting {
        fn len(&self) -> usize {
            self.entries.len()
        }

        fn entries(&self) -> &[Entry] {
            &self.entries
        }

        fn get(&self, index: usize) -> Result<Item> {
            let entry = self.entries.get(index).ok_or(DatasetError::IndexOutOfRange {
                index,
                len: self.entries.len(),
            })?;
            if self.fail_at == Some(index) {
                return Err(DatasetError::ResourceNotFound {
                    location: entry.location.clone(),
                });
            }
            #[allow(clippy::cast_precision_loss)]
            let image = Tensor::new(&[index as f32], &Device::Cpu)?;
            Ok(Item::new(image, entry.identifier.clone(), ImageDimensions::new(1, 1)))
        }
    }

    #[test]
    fn test_sequential_batches() {
        let ds = Counting::new(5);
        let options = LoaderOptions {
            batch_size: 2,
            ..LoaderOptions::default()
        };
        let loader = BatchLoader::new(&ds, options).unwrap();
        assert_eq!(loader.num_batches(), 3);

        let batches: Vec<Batch> = loader.map(Result::unwrap).collect();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].images.dims(), &[2, 1]);
        assert_eq!(batches[2].images.dims(), &[1, 1]);
        assert_eq!(batches[2].meta[0].identifier, "img4");
    }

    #[test]
    fn test_drop_last() {
        let ds = Counting::new(5);
        let options = LoaderOptions {
            batch_size: 2,
            drop_last: true,
            ..LoaderOptions::default()
        };
        let loader = BatchLoader::new(&ds, options).unwrap();
        assert_eq!(loader.num_batches(), 2);
        assert_eq!(loader.count(), 2);
    }

    #[test]
    fn test_seeded_shuffle_is_reproducible() {
        let ds = Counting::new(32);
        let options = LoaderOptions {
            batch_size: 4,
            shuffle: true,
            seed: Some(7),
            drop_last: false,
        };
        let a = BatchLoader::new(&ds, options).unwrap();
        let b = BatchLoader::new(&ds, options).unwrap();

        assert_eq!(a.order(), b.order());
        let mut sorted = a.order().to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..32).collect::<Vec<_>>());
    }

    #[test]
    fn test_failing_item_fails_only_its_batch() {
        let mut ds = Counting::new(4);
        ds.fail_at = Some(1);
        let options = LoaderOptions {
            batch_size: 2,
            ..LoaderOptions::default()
        };
        let loader = BatchLoader::new(&ds, options).unwrap();

        let results: Vec<_> = loader.collect();
        assert_eq!(results.len(), 2);
        assert!(matches!(results[0], Err(DatasetError::ResourceNotFound { .. })));
        assert!(results[1].is_ok());
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let ds = Counting::new(1);
        let options = LoaderOptions {
            batch_size: 0,
            ..LoaderOptions::default()
        };
        assert!(matches!(
            BatchLoader::new(&ds, options),
            Err(DatasetError::Config(_))
        ));
    }

    #[test]
    fn test_empty_dataset_yields_nothing() {
        let ds = Counting::new(0);
        let mut loader = BatchLoader::new(&ds, LoaderOptions::default()).unwrap();
        assert_eq!(loader.num_batches(), 0);
        assert!(loader.next().is_none());
    }
}
