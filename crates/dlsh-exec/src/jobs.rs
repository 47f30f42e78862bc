#![forbid(unsafe_code)]

//! Background jobs started with `&`.
//!
//! The table is polled, never waited on: the shell calls
//! [`JobTable::reap_finished`] before each prompt.

use std::io;
use std::process::{Child, ExitStatus};

/// A background process the shell still has to reap.
#[derive(Debug)]
pub struct BackgroundJob {
    command: String,
    child: Child,
}

impl BackgroundJob {
    #[must_use]
    pub fn new(command: String, child: Child) -> Self {
        Self { command, child }
    }

    #[must_use]
    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    fn try_reap(&mut self) -> io::Result<Option<ExitStatus>> {
        self.child.try_wait()
    }
}

/// A job that exited since the last poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finished {
    pub id: usize,
    pub command: String,
    pub status: ExitStatus,
}

/// Running background jobs, numbered from 1 in start order.
#[derive(Debug, Default)]
pub struct JobTable {
    jobs: Vec<(usize, BackgroundJob)>,
    next_id: usize,
}

impl JobTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Adopt a job; returns its number.
    pub fn push(&mut self, job: BackgroundJob) -> usize {
        if self.jobs.is_empty() {
            self.next_id = 0;
        }
        self.next_id += 1;
        tracing::debug!(id = self.next_id, pid = job.pid(), command = %job.command, "background job");
        self.jobs.push((self.next_id, job));
        self.next_id
    }

    /// Collect every job that has exited, without blocking.
    pub fn reap_finished(&mut self) -> Vec<Finished> {
        let mut finished = Vec::new();
        self.jobs.retain_mut(|(id, job)| match job.try_reap() {
            Ok(Some(status)) => {
                finished.push(Finished {
                    id: *id,
                    command: job.command.clone(),
                    status,
                });
                false
            }
            Ok(None) => true,
            Err(err) => {
                tracing::warn!(id = *id, error = %err, "cannot poll background job");
                false
            }
        });
        finished
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &BackgroundJob)> {
        self.jobs.iter().map(|(id, job)| (*id, job))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;
    use std::thread;
    use std::time::{Duration, Instant};

    fn start(program: &str, args: &[&str]) -> BackgroundJob {
        let child = Command::new(program).args(args).spawn().unwrap();
        BackgroundJob::new(format!("{program} {}", args.join(" ")), child)
    }

    #[test]
    fn finished_jobs_are_reported_once() {
        let mut table = JobTable::new();
        assert_eq!(table.push(start("true", &[])), 1);
        assert_eq!(table.push(start("sleep", &["5"])), 2);

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut done = Vec::new();
        while done.is_empty() && Instant::now() < deadline {
            done = table.reap_finished();
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].id, 1);
        assert!(done[0].status.success());
        assert_eq!(table.len(), 1);
        assert!(table.reap_finished().is_empty());

        for (_, job) in table.iter() {
            let _ = Command::new("kill").arg(job.pid().to_string()).status();
        }
    }

    #[test]
    fn numbering_restarts_when_empty() {
        let mut table = JobTable::new();
        table.push(start("true", &[]));
        let deadline = Instant::now() + Duration::from_secs(5);
        while !table.is_empty() && Instant::now() < deadline {
            table.reap_finished();
            thread::sleep(Duration::from_millis(10));
        }
        assert!(table.is_empty());
        assert_eq!(table.push(start("true", &[])), 1);
    }
}
