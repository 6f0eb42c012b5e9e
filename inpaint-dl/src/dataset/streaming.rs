use super::InpaintDataset;
use crate::common::*;

/// A batch of stacked sample tensors (`[B, C, H, W]` each).
#[derive(Debug, TensorLike)]
pub struct SampleBatch {
    pub image: Tensor,
    pub gray: Tensor,
    pub edge: Tensor,
    pub mask: Tensor,
}

/// Infinite, restartable batched sample stream.
///
/// Each pass shuffles the full index range, yields whole batches, and drops
/// the incomplete trailing batch; exhaustion restarts with a fresh shuffle.
/// The stream owns its RNG, so a seeded stream replays the same schedule.
#[derive(Debug)]
pub struct SampleStream {
    dataset: Arc<InpaintDataset>,
    batch_size: usize,
    rng: StdRng,
    order: Vec<usize>,
    cursor: usize,
}

impl SampleStream {
    pub fn new(
        dataset: Arc<InpaintDataset>,
        batch_size: NonZeroUsize,
        seed: Option<u64>,
    ) -> Result<Self> {
        let batch_size = batch_size.get();
        ensure!(
            dataset.len() >= batch_size,
            "batch size {} exceeds dataset size {}",
            batch_size,
            dataset.len()
        );

        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut stream = Self {
            dataset,
            batch_size,
            rng,
            order: vec![],
            cursor: 0,
        };
        stream.restart();
        Ok(stream)
    }

    /// Begin a fresh shuffled pass over the dataset.
    pub fn restart(&mut self) {
        let mut order: Vec<_> = (0..self.dataset.len()).collect();
        order.shuffle(&mut self.rng);
        self.order = order;
        self.cursor = 0;
    }

    fn next_batch(&mut self) -> Result<SampleBatch> {
        if self.cursor + self.batch_size > self.order.len() {
            self.restart();
        }

        let indexes = self.order[self.cursor..self.cursor + self.batch_size].to_vec();
        self.cursor += self.batch_size;

        let records: Vec<_> = indexes
            .into_iter()
            .map(|index| self.dataset.load(index, &mut self.rng))
            .try_collect()?;

        let images: Vec<_> = records.iter().map(|r| r.image.shallow_clone()).collect();
        let grays: Vec<_> = records.iter().map(|r| r.gray.shallow_clone()).collect();
        let edges: Vec<_> = records.iter().map(|r| r.edge.shallow_clone()).collect();
        let masks: Vec<_> = records.iter().map(|r| r.mask.shallow_clone()).collect();

        Ok(SampleBatch {
            image: Tensor::stack(&images, 0),
            gray: Tensor::stack(&grays, 0),
            edge: Tensor::stack(&edges, 0),
            mask: Tensor::stack(&masks, 0),
        })
    }
}

impl Iterator for SampleStream {
    type Item = Result<SampleBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_batch())
    }
}
