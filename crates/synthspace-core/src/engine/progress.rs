#[derive(Debug, Clone)]
pub enum Progress {
    PhaseStart { name: &'static str },
    PhaseFinish,

    TaskStart { total: u64 },
    TaskIncrement,
    TaskFinish,

    /// One job (a reaction, a seed, a frag type) finished successfully.
    JobFinished { label: String, accepted: usize },

    Message(String),
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn callback_receives_events_in_order() {
        let seen = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            let tag = match event {
                Progress::PhaseStart { name } => name.to_string(),
                Progress::JobFinished { label, accepted } => format!("{label}={accepted}"),
                _ => "other".to_string(),
            };
            seen.lock().unwrap().push(tag);
        }));
        reporter.report(Progress::PhaseStart { name: "Seeds" });
        reporter.report(Progress::JobFinished {
            label: "R1".to_string(),
            accepted: 3,
        });
        reporter.report(Progress::PhaseFinish);
        drop(reporter);
        assert_eq!(seen.into_inner().unwrap(), vec!["Seeds", "R1=3", "other"]);
    }

    #[test]
    fn silent_reporter_ignores_events() {
        ProgressReporter::new().report(Progress::Message("ignored".to_string()));
    }
}
