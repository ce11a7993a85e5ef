//! Process-local job registry.
//!
//! Keeps jobs and host max loads in memory and performs the bookkeeping a
//! real registry does on update: optimistic versioning, state machine
//! enforcement, timestamps and queue/run times, processing host assignment.
//! Useful for embedding the producer and barrier in a single process and for
//! exercising them in tests.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::job::{Job, JobId, JobStatus};

use super::{JobRegistry, NodeLoad, RegistryError};

#[derive(Debug, Default)]
struct State {
    hosts: HashMap<String, f32>,
    jobs: BTreeMap<JobId, Job>,
    next_id: JobId,
}

impl State {
    fn load_on(&self, host: &str) -> f32 {
        self.jobs
            .values()
            .filter(|j| j.status.influences_load())
            .filter(|j| j.processing_host.as_deref() == Some(host))
            .map(|j| j.job_load)
            .sum()
    }
}

#[derive(Debug)]
pub struct InMemoryRegistry {
    hostname: String,
    state: Mutex<State>,
}

impl InMemoryRegistry {
    /// Registry living on `hostname`, which is registered with `max_load`.
    pub fn new(hostname: impl Into<String>, max_load: f32) -> Self {
        let hostname = hostname.into();
        let mut state = State {
            next_id: 1,
            ..State::default()
        };
        state.hosts.insert(hostname.clone(), max_load);
        Self {
            hostname,
            state: Mutex::new(state),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register_host(&self, host: impl Into<String>, max_load: f32) {
        let host = host.into();
        tracing::debug!(host = %host, max_load, "registering host");
        self.state().hosts.insert(host, max_load);
    }

    pub fn unregister_host(&self, host: &str) {
        self.state().hosts.remove(host);
    }

    /// Stores a new job built from `template` and returns the stored copy.
    ///
    /// The registry assigns id, creation date and creating host. Dispatchable
    /// jobs start `QUEUED`, others `INSTANTIATED`. A parent link that points at
    /// a known job inherits that job's root.
    pub fn create_job(&self, template: Job) -> Job {
        let mut state = self.state();
        let id = state.next_id;
        state.next_id += 1;

        let mut job = template;
        job.id = id;
        job.version = 0;
        job.date_created = Some(Utc::now());
        job.created_host = Some(self.hostname.clone());
        job.status = if job.dispatchable {
            JobStatus::Queued
        } else {
            JobStatus::Instantiated
        };
        if let Some(parent) = job.parent_job_id.and_then(|p| state.jobs.get(&p)) {
            job.root_job_id = Some(parent.root_job_id.unwrap_or(parent.id));
        }

        tracing::debug!(job_id = id, job_type = %job.job_type, operation = %job.operation, "created job");
        state.jobs.insert(id, job.clone());
        job
    }

    /// All jobs, optionally filtered by type and status, ordered by id.
    pub fn jobs(&self, job_type: Option<&str>, status: Option<JobStatus>) -> Vec<Job> {
        self.state()
            .jobs
            .values()
            .filter(|j| job_type.map_or(true, |t| j.job_type == t))
            .filter(|j| status.map_or(true, |s| j.status == s))
            .cloned()
            .collect()
    }

    /// Descendants of `id` (children, grandchildren, ...), ordered by id.
    pub fn child_jobs(&self, id: JobId) -> Vec<Job> {
        let state = self.state();
        let mut frontier = vec![id];
        let mut found: BTreeMap<JobId, Job> = BTreeMap::new();
        while let Some(parent) = frontier.pop() {
            for job in state.jobs.values() {
                if job.parent_job_id == Some(parent) && !found.contains_key(&job.id) {
                    frontier.push(job.id);
                    found.insert(job.id, job.clone());
                }
            }
        }
        found.into_values().collect()
    }

    /// Removes the given jobs; fails without removing anything if one is unknown.
    pub fn remove_jobs(&self, ids: &[JobId]) -> Result<(), RegistryError> {
        let mut state = self.state();
        if let Some(missing) = ids.iter().find(|id| !state.jobs.contains_key(id)) {
            return Err(RegistryError::NotFound(*missing));
        }
        for id in ids {
            state.jobs.remove(id);
        }
        Ok(())
    }

    fn apply_bookkeeping(&self, job: &mut Job, now: DateTime<Utc>) {
        let created = *job.date_created.get_or_insert(now);
        if job.status.influences_load() && job.processing_host.is_none() {
            job.processing_host = Some(self.hostname.clone());
        }
        match job.status {
            JobStatus::Running => {
                if job.date_started.is_none() {
                    job.date_started = Some(now);
                    job.queue_time = Some(millis_between(created, now));
                }
            }
            // Completion is stamped once; later updates of a completed job keep it.
            JobStatus::Failed if job.date_completed.is_none() => {
                job.date_completed = Some(now);
                if let Some(started) = job.date_started {
                    job.run_time = Some(millis_between(started, now));
                }
            }
            JobStatus::Finished if job.date_completed.is_none() => {
                // Jobs that never went through dispatch count as started at creation.
                let started = *job.date_started.get_or_insert(created);
                job.date_completed = Some(now);
                job.run_time = Some(millis_between(started, now));
            }
            _ => {}
        }
    }
}

fn millis_between(from: DateTime<Utc>, to: DateTime<Utc>) -> u64 {
    u64::try_from((to - from).num_milliseconds()).unwrap_or(0)
}

impl JobRegistry for InMemoryRegistry {
    fn get_job(&self, id: JobId) -> Result<Job, RegistryError> {
        self.state()
            .jobs
            .get(&id)
            .cloned()
            .ok_or(RegistryError::NotFound(id))
    }

    fn update_job(&self, job: &Job) -> Result<Job, RegistryError> {
        let mut state = self.state();
        let stored = state
            .jobs
            .get(&job.id)
            .ok_or(RegistryError::NotFound(job.id))?;

        if stored.version != job.version {
            return Err(RegistryError::Conflict {
                job_id: job.id,
                reason: format!(
                    "stale version {} (registry has {})",
                    job.version, stored.version
                ),
            });
        }
        if !stored.status.can_transition_to(job.status) {
            return Err(RegistryError::Conflict {
                job_id: job.id,
                reason: format!("illegal transition {} -> {}", stored.status, job.status),
            });
        }

        let previous = stored.status;
        let mut updated = job.clone();
        self.apply_bookkeeping(&mut updated, Utc::now());
        updated.version = stored.version + 1;
        if previous != updated.status {
            tracing::debug!(job_id = job.id, from = %previous, to = %updated.status, "job status changed");
        }
        state.jobs.insert(updated.id, updated.clone());
        Ok(updated)
    }

    fn count(&self, job_type: &str, status: JobStatus) -> Result<u64, RegistryError> {
        let n = self
            .state()
            .jobs
            .values()
            .filter(|j| j.job_type == job_type && j.status == status)
            .count();
        Ok(n as u64)
    }

    fn own_load(&self) -> Result<f32, RegistryError> {
        Ok(self.state().load_on(&self.hostname))
    }

    fn max_load_on_node(&self, host: &str) -> Result<NodeLoad, RegistryError> {
        let state = self.state();
        let max_load = *state
            .hosts
            .get(host)
            .ok_or_else(|| RegistryError::HostNotFound(host.to_string()))?;
        Ok(NodeLoad {
            host: host.to_string(),
            current_load: state.load_on(host),
            max_load,
        })
    }

    fn registry_hostname(&self) -> Result<String, RegistryError> {
        Ok(self.hostname.clone())
    }
}
