//! Observers for long running decode and merge operations
//!
//! Nothing in the library writes to the console. Instead every operation takes a
//! `&mut dyn Progress` and reports the stage it is in, how far through that stage it is, and
//! any warning that did not abort the operation. [`Logged`] forwards these to `tracing`,
//! [`Silent`] drops them.

/// Receives progress reports from decoders and the merge engine
pub trait Progress {
    /// a new stage of work has started, `total` is the number of steps it has
    fn stage(&mut self, _name: &str, _total: usize) {}

    /// step `current` (1-based) of the current stage has finished
    fn step(&mut self, _current: usize) {}

    /// a non-fatal problem with the input
    fn warn(&mut self, _message: &str) {}
}

#[derive(Debug, Default, Clone, Copy)]
/// Discards every report
pub struct Silent;

impl Progress for Silent {}

#[derive(Debug, Default, Clone)]
/// Forwards reports to `tracing`: stages at `info`, steps at `debug`, warnings at `warn`
pub struct Logged {
    stage: String,
    total: usize,
}

impl Progress for Logged {
    fn stage(&mut self, name: &str, total: usize) {
        self.stage = name.to_string();
        self.total = total;
        tracing::info!(total, "{name}");
    }

    fn step(&mut self, current: usize) {
        tracing::debug!(stage = %self.stage, "{current}/{}", self.total);
    }

    fn warn(&mut self, message: &str) {
        tracing::warn!("{message}");
    }
}

#[cfg(test)]
pub(crate) mod recording {
    //! observer that remembers everything it was told, for assertions in tests
    use super::Progress;

    #[derive(Debug, Default)]
    pub(crate) struct Recording {
        pub(crate) stages: Vec<(String, usize)>,
        pub(crate) steps: usize,
        pub(crate) warnings: Vec<String>,
    }

    impl Progress for Recording {
        fn stage(&mut self, name: &str, total: usize) {
            self.stages.push((name.to_string(), total));
        }

        fn step(&mut self, _current: usize) {
            self.steps += 1;
        }

        fn warn(&mut self, message: &str) {
            self.warnings.push(message.to_string());
        }
    }
}
