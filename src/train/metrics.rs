//! Training statistics

use std::collections::VecDeque;

const HISTORY_CAP: usize = 100;

/// Rolling loss history for a training run
#[derive(Debug, Clone)]
pub struct StackGanStats {
    /// Total global steps recorded
    pub steps: u64,
    /// Recent combined generator losses
    pub generator_losses: VecDeque<f32>,
    /// Recent per-stage discriminator losses, indexed by stage
    pub discriminator_losses: Vec<VecDeque<f32>>,
}

impl StackGanStats {
    /// Create empty stats for a stack of the given depth
    #[must_use]
    pub fn new(stack_depth: usize) -> Self {
        Self {
            steps: 0,
            generator_losses: VecDeque::with_capacity(HISTORY_CAP),
            discriminator_losses: (0..stack_depth)
                .map(|_| VecDeque::with_capacity(HISTORY_CAP))
                .collect(),
        }
    }

    /// Record one global step's losses
    pub fn record_step(&mut self, generator_loss: f32, discriminator_losses: &[f32]) {
        debug_assert_eq!(discriminator_losses.len(), self.discriminator_losses.len());
        self.steps += 1;

        if self.generator_losses.len() >= HISTORY_CAP {
            self.generator_losses.pop_front();
        }
        self.generator_losses.push_back(generator_loss);

        for (history, &loss) in self.discriminator_losses.iter_mut().zip(discriminator_losses) {
            if history.len() >= HISTORY_CAP {
                history.pop_front();
            }
            history.push_back(loss);
        }
    }

    /// Average generator loss over recent history
    #[must_use]
    pub fn avg_generator_loss(&self) -> f32 {
        if self.generator_losses.is_empty() {
            return 0.0;
        }
        self.generator_losses.iter().sum::<f32>() / self.generator_losses.len() as f32
    }

    /// Average discriminator loss for one stage over recent history, or
    /// `None` for a stage the stack does not have
    #[must_use]
    pub fn avg_discriminator_loss(&self, stage: usize) -> Option<f32> {
        let history = self.discriminator_losses.get(stage)?;
        if history.is_empty() {
            return Some(0.0);
        }
        Some(history.iter().sum::<f32>() / history.len() as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_average() {
        let mut stats = StackGanStats::new(2);
        for i in 0..10 {
            stats.record_step(i as f32, &[i as f32 * 2.0, i as f32 * 3.0]);
        }
        assert_eq!(stats.steps, 10);
        assert!((stats.avg_generator_loss() - 4.5).abs() < 1e-6);
        assert!((stats.avg_discriminator_loss(0).unwrap() - 9.0).abs() < 1e-6);
        assert!((stats.avg_discriminator_loss(1).unwrap() - 13.5).abs() < 1e-6);
    }

    #[test]
    fn test_unknown_stage_has_no_average() {
        let mut stats = StackGanStats::new(2);
        stats.record_step(1.0, &[0.5, 0.5]);
        assert!(stats.avg_discriminator_loss(2).is_none());
    }

    #[test]
    fn test_history_is_capped() {
        let mut stats = StackGanStats::new(1);
        for i in 0..150 {
            stats.record_step(i as f32, &[i as f32]);
        }
        assert_eq!(stats.generator_losses.len(), 100);
        assert_eq!(stats.discriminator_losses[0].len(), 100);
        assert_eq!(stats.steps, 150);
        // Oldest entries evicted first.
        assert_eq!(*stats.generator_losses.front().unwrap(), 50.0);
    }

    #[test]
    fn test_empty_averages_are_zero() {
        let stats = StackGanStats::new(2);
        assert_eq!(stats.avg_generator_loss(), 0.0);
        assert_eq!(stats.avg_discriminator_loss(1), Some(0.0));
    }
}
