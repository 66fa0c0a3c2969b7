use log::info;

#[allow(unused_imports)]
use crate::TreeTable;

/// Depth of leaves in a [`TreeTable`] tree, gathered while validating.
/// A leaf is an absent child position, so an empty tree has a single
/// leaf at depth zero.
#[derive(Clone, Debug, Default)]
pub struct Depth {
    samples: usize,
    total: usize,
    min: usize,
    max: usize,
    counts: Vec<u64>, // number of leaves at each depth.
}

impl Depth {
    // A red black tree of n entries is no taller than 2*log2(n+1),
    // leaves sit one level below.
    pub(crate) fn new(entries: usize) -> Depth {
        let log2 = entries
            .saturating_add(1)
            .next_power_of_two()
            .trailing_zeros() as usize;
        Depth {
            counts: vec![0; 2 * log2 + 2],
            ..Default::default()
        }
    }

    pub(crate) fn sample(&mut self, depth: usize) {
        if self.samples == 0 || depth < self.min {
            self.min = depth
        }
        self.max = self.max.max(depth);
        self.samples += 1;
        self.total += depth;
        if depth >= self.counts.len() {
            self.counts.resize(depth + 1, 0);
        }
        self.counts[depth] += 1;
    }

    /// Return number of leaves sampled.
    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Return depth of the shallowest leaf.
    pub fn min(&self) -> usize {
        self.min
    }

    /// Return depth of the deepest leaf.
    pub fn max(&self) -> usize {
        self.max
    }

    /// Return the average leaf depth, rounded down.
    pub fn mean(&self) -> usize {
        self.total.checked_div(self.samples).unwrap_or(0)
    }

    /// Return (percentile, depth) pairs for the 90th percentile and up.
    /// Each pair gives the percentage of leaves no deeper than depth.
    pub fn percentiles(&self) -> Vec<(u8, usize)> {
        let mut percentiles: Vec<(u8, usize)> = vec![];
        let mut acc = 0_u64;
        for (depth, count) in self.counts.iter().enumerate() {
            if *count == 0 {
                continue;
            }
            acc += count;
            let perc = (acc * 100 / (self.samples as u64)) as u8;
            match percentiles.last() {
                None if perc < 90 => (),
                Some((prev, _)) if perc < *prev => (),
                _ => percentiles.push((perc, depth)),
            }
        }
        percentiles
    }

    /// Log depth statistics in human readable format.
    pub fn pretty_print(&self, prefix: &str) {
        info!(
            "{}depth (min, avg, max): {:?}",
            prefix,
            (self.min, self.mean(), self.max)
        );
        for (perc, depth) in self.percentiles().into_iter() {
            info!("{}  {} percentile = {}", prefix, perc, depth);
        }
    }
}
