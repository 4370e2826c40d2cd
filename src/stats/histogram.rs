//! Equal-width histograms over draw totals.

/// Bin width substituted when every sample has the same value, so density
/// division stays finite.
pub const DEGENERATE_BIN_WIDTH: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub x_min: f64,
    pub x_max: f64,
    pub bin_width: f64,
    pub counts: Vec<u64>,
}

impl Histogram {
    /// Histogram over `[min(samples), max(samples)]`. Constant samples get
    /// [DEGENERATE_BIN_WIDTH] instead of a zero-width bin.
    pub fn from_samples(samples: &[u64], bins: usize) -> Self {
        let x_min = samples.iter().copied().min().unwrap_or(0) as f64;
        let x_max = samples.iter().copied().max().unwrap_or(0) as f64;
        Self::over_range(samples, bins, x_min, x_max)
    }

    /// Histogram over an explicit domain. Samples outside the domain are
    /// dropped. The renderer uses this with a widened domain for constant
    /// sample sets.
    pub fn over_range(samples: &[u64], bins: usize, x_min: f64, x_max: f64) -> Self {
        let bins = bins.max(1);
        let bin_width = if x_max > x_min {
            (x_max - x_min) / bins as f64
        } else {
            DEGENERATE_BIN_WIDTH
        };
        let mut counts = vec![0u64; bins];
        for sample in samples {
            let value = *sample as f64;
            if value < x_min || value > x_max {
                continue;
            }
            let mut index = ((value - x_min) / bin_width) as usize;
            if index >= bins {
                index = bins - 1;
            }
            counts[index] += 1;
        }
        Self {
            x_min,
            x_max,
            bin_width,
            counts,
        }
    }

    pub fn bins(&self) -> usize {
        self.counts.len()
    }

    /// Index of the bin containing `value`, or None outside the domain.
    /// The upper domain edge belongs to the last bin.
    pub fn bin_index(&self, value: f64) -> Option<usize> {
        if value < self.x_min || value > self.x_max {
            return None;
        }
        let index = ((value - self.x_min) / self.bin_width) as usize;
        Some(index.min(self.bins() - 1))
    }

    /// Density of one bin given the total sample count used to build the
    /// histogram: count / (n * bin_width).
    pub fn density(&self, bin: usize, n_samples: usize) -> f64 {
        if n_samples == 0 {
            return 0.0;
        }
        self.counts[bin] as f64 / (n_samples as f64 * self.bin_width)
    }

    /// Density of the bin containing `value`; zero outside the domain.
    pub fn density_at(&self, value: f64, n_samples: usize) -> f64 {
        match self.bin_index(value) {
            Some(bin) => self.density(bin, n_samples),
            None => 0.0,
        }
    }

    pub fn max_density(&self, n_samples: usize) -> f64 {
        (0..self.bins())
            .map(|bin| self.density(bin, n_samples))
            .fold(0.0, f64::max)
    }
}
