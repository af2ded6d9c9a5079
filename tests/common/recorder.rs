//! Event recording for assertions on lifecycle order

use std::sync::{Arc, Mutex};

use batch_loader::FetchScheduler;

/// One recorded lifecycle event
#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    Start(Vec<String>),
    Progress { index: usize, loaded: f64 },
    Item { index: usize, data: String },
    Load,
    End { loaded: usize, errored: usize },
    Error { source: String, message: String },
    Abort { index: Option<usize> },
}

/// Shared log of every event a scheduler raised
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<Recorded>>>);

impl EventLog {
    /// Register handlers for every hook on `scheduler`
    pub fn attach(scheduler: &mut FetchScheduler<String>) -> Self {
        let log = Self::default();

        let l = log.clone();
        scheduler.on_load_start(move |e| {
            l.push(Recorded::Start(
                e.source.iter().map(|r| r.locator.clone()).collect(),
            ))
        });
        let l = log.clone();
        scheduler.on_progress(move |e| {
            l.push(Recorded::Progress {
                index: e.index,
                loaded: e.loaded,
            })
        });
        let l = log.clone();
        scheduler.on_load_item(move |e| {
            l.push(Recorded::Item {
                index: e.index,
                data: e.data,
            })
        });
        let l = log.clone();
        scheduler.on_load(move |_| l.push(Recorded::Load));
        let l = log.clone();
        scheduler.on_load_end(move |e| {
            l.push(Recorded::End {
                loaded: e.summary.loaded,
                errored: e.summary.errored,
            })
        });
        let l = log.clone();
        scheduler.on_error(move |e| {
            l.push(Recorded::Error {
                source: e.source.locator.clone(),
                message: e.error.to_string(),
            })
        });
        let l = log.clone();
        scheduler.on_abort(move |e| l.push(Recorded::Abort { index: e.index }));

        log
    }

    fn push(&self, event: Recorded) {
        self.0.lock().unwrap().push(event);
    }

    /// Snapshot of the events so far
    pub fn events(&self) -> Vec<Recorded> {
        self.0.lock().unwrap().clone()
    }

    /// Events other than progress reports
    pub fn milestones(&self) -> Vec<Recorded> {
        self.events()
            .into_iter()
            .filter(|e| !matches!(e, Recorded::Progress { .. }))
            .collect()
    }

    /// Number of events matching `pred`
    pub fn count(&self, pred: impl Fn(&Recorded) -> bool) -> usize {
        self.events().iter().filter(|e| pred(e)).count()
    }
}
