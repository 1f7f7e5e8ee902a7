//! Multi-epoch training loop

use super::core::Trainer;
use super::result::TrainResult;
use crate::error::Result;
use crate::train::callback::CallbackAction;

impl Trainer {
    /// Train for `num_epochs` epochs of `steps_per_epoch` steps each
    ///
    /// `step_fn` runs once per step, after the counters have advanced, and
    /// reports metrics through `Trainer::add_scalar`. Each epoch ends with an
    /// epoch trigger. `after_train` runs even when a step fails, so writers
    /// still flush and close.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use entrenar_writers::train::Trainer;
    /// # let mut trainer = Trainer::new();
    /// let result = trainer.train(3, 10, |t| {
    ///     let step = t.counters().global_step;
    ///     t.add_scalar("loss", 1.0 / step as f64);
    ///     Ok(())
    /// })?;
    /// println!("stopped after {} steps", result.counters.global_step);
    /// # Ok::<(), entrenar_writers::WriterError>(())
    /// ```
    pub fn train<F>(
        &mut self,
        num_epochs: usize,
        steps_per_epoch: usize,
        mut step_fn: F,
    ) -> Result<TrainResult>
    where
        F: FnMut(&mut Trainer) -> Result<()>,
    {
        if self.before_train(num_epochs, steps_per_epoch)? == CallbackAction::Stop {
            self.after_train();
            return Ok(self.result(true));
        }

        let outcome = self.run_epochs(num_epochs, steps_per_epoch, &mut step_fn);
        self.after_train();
        outcome.map(|stopped_early| self.result(stopped_early))
    }

    fn run_epochs<F>(
        &mut self,
        num_epochs: usize,
        steps_per_epoch: usize,
        step_fn: &mut F,
    ) -> Result<bool>
    where
        F: FnMut(&mut Trainer) -> Result<()>,
    {
        for _ in 0..num_epochs {
            match self.begin_epoch() {
                CallbackAction::Stop => return Ok(true),
                CallbackAction::SkipEpoch => continue,
                CallbackAction::Continue => {}
            }

            for _ in 0..steps_per_epoch {
                if self.step() == CallbackAction::Stop {
                    return Ok(true);
                }
                step_fn(self)?;
                if self.end_step() == CallbackAction::Stop {
                    return Ok(true);
                }
            }

            if self.trigger_epoch()? == CallbackAction::Stop {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn result(&self, stopped_early: bool) -> TrainResult {
        TrainResult {
            counters: self.handle.counters(),
            stopped_early,
            elapsed_secs: self.start_time.map_or(0.0, |t| t.elapsed().as_secs_f64()),
        }
    }
}
