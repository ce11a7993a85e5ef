use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::*;
use crate::registry::{InMemoryRegistry, NodeLoad};

const HOST: &str = "http://worker-1:8080";

/// Registry that answers own-load queries from a fixed script.
#[derive(Debug)]
struct ScriptedRegistry {
    own_loads: Mutex<VecDeque<f32>>,
    max_load: f32,
    unreachable: bool,
}

impl ScriptedRegistry {
    fn new(own_loads: &[f32], max_load: f32) -> Self {
        Self {
            own_loads: Mutex::new(own_loads.iter().copied().collect()),
            max_load,
            unreachable: false,
        }
    }

    fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::new(&[], 4.0)
        }
    }
}

impl JobRegistry for ScriptedRegistry {
    fn get_job(&self, id: JobId) -> Result<Job, RegistryError> {
        Err(RegistryError::NotFound(id))
    }

    fn update_job(&self, job: &Job) -> Result<Job, RegistryError> {
        Ok(job.clone())
    }

    fn count(&self, _job_type: &str, _status: JobStatus) -> Result<u64, RegistryError> {
        Ok(3)
    }

    fn own_load(&self) -> Result<f32, RegistryError> {
        if self.unreachable {
            return Err(RegistryError::communication("connection refused"));
        }
        self.own_loads
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| RegistryError::communication("script exhausted"))
    }

    fn max_load_on_node(&self, host: &str) -> Result<NodeLoad, RegistryError> {
        if self.unreachable {
            return Err(RegistryError::communication("connection refused"));
        }
        Ok(NodeLoad {
            host: host.to_string(),
            current_load: 0.0,
            max_load: self.max_load,
        })
    }

    fn registry_hostname(&self) -> Result<String, RegistryError> {
        Ok(HOST.to_string())
    }
}

struct Encoder {
    fail: bool,
    ready: AtomicBool,
}

impl Encoder {
    fn ok() -> Self {
        Self {
            fail: false,
            ready: AtomicBool::new(true),
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::ok()
        }
    }
}

impl JobProcessor for Encoder {
    fn job_type(&self) -> &str {
        "encode"
    }

    fn is_ready_to_accept_jobs(&self, _operation: &str) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn process(&self, job: &Job) -> Result<Option<String>, ProcessError> {
        if self.fail {
            return Err(ProcessError::new("encoder crashed"));
        }
        Ok(Some(format!("track-{}.mp4", job.id)))
    }
}

fn admission_sequence(accept_oversize: bool) -> Vec<bool> {
    let registry = Arc::new(ScriptedRegistry::new(&[1.0, 5.0, 10.0], 4.0));
    let producer =
        JobProducer::new(Encoder::ok(), registry).with_accept_oversize_jobs(accept_oversize);
    [1.0, 1.0, 10.0]
        .into_iter()
        .map(|load| {
            let job = Job::new("encode", "mp4").with_id(1).with_job_load(load);
            producer.is_ready_to_accept(&job).unwrap()
        })
        .collect()
}

#[test]
fn default_policy_rejects_overload_and_oversize() {
    assert_eq!(admission_sequence(false), vec![true, false, false]);
}

#[test]
fn oversize_policy_admits_oversize_job() {
    assert_eq!(admission_sequence(true), vec![true, false, true]);
}

#[test]
fn admission_fails_closed_when_registry_unreachable() {
    let producer = JobProducer::new(Encoder::ok(), Arc::new(ScriptedRegistry::unreachable()));
    let job = Job::new("encode", "mp4").with_job_load(1.0);
    let err = producer.is_ready_to_accept(&job).unwrap_err();
    assert!(matches!(
        err,
        ProducerError::Registry(RegistryError::Communication { .. })
    ));
}

#[test]
fn count_jobs_uses_producer_type() {
    let producer = JobProducer::new(Encoder::ok(), Arc::new(ScriptedRegistry::new(&[], 4.0)));
    assert_eq!(producer.job_type(), "encode");
    assert_eq!(producer.count_jobs(JobStatus::Running).unwrap(), 3);
}

fn dispatching_job(registry: &InMemoryRegistry, load: f32) -> Job {
    let mut job = registry.create_job(Job::new("encode", "mp4").with_job_load(load));
    job.transition_to(JobStatus::Dispatching).unwrap();
    registry.update_job(&job).unwrap()
}

#[test]
fn accept_job_marks_running_and_finishes() {
    let registry = Arc::new(InMemoryRegistry::new(HOST, 4.0));
    let producer = JobProducer::new(Encoder::ok(), Arc::clone(&registry));
    let mut job = dispatching_job(&registry, 1.0);

    let running = producer.accept_job(&mut job).unwrap();
    assert_eq!(job.status, JobStatus::Running);
    assert!(job.date_started.is_some());

    let done = running.join().unwrap();
    assert_eq!(done.status, JobStatus::Finished);
    assert_eq!(done.payload.as_deref(), Some(format!("track-{}.mp4", job.id).as_str()));
    assert_eq!(registry.get_job(job.id).unwrap(), done);
}

#[test]
fn process_failure_marks_job_failed() {
    let registry = Arc::new(InMemoryRegistry::new(HOST, 4.0));
    let producer = JobProducer::new(Encoder::failing(), Arc::clone(&registry));
    let mut job = dispatching_job(&registry, 1.0);

    let done = producer.accept_job(&mut job).unwrap().join().unwrap();
    assert_eq!(done.status, JobStatus::Failed);
    assert!(done.date_completed.is_some());
    assert!(done.payload.is_none());
}

#[test]
fn accept_job_requires_dispatching() {
    let registry = Arc::new(InMemoryRegistry::new(HOST, 4.0));
    let producer = JobProducer::new(Encoder::ok(), Arc::clone(&registry));
    let mut job = registry.create_job(Job::new("encode", "mp4"));

    let err = producer.accept_job(&mut job).unwrap_err();
    assert!(matches!(
        err,
        ProducerError::IllegalState {
            expected: JobStatus::Dispatching,
            actual: JobStatus::Queued,
            ..
        }
    ));
    assert_eq!(registry.get_job(job.id).unwrap().status, JobStatus::Queued);
}

#[test]
fn accept_job_rejects_foreign_job_type() {
    let registry = Arc::new(InMemoryRegistry::new(HOST, 4.0));
    let producer = JobProducer::new(Encoder::ok(), Arc::clone(&registry));
    let mut job = registry.create_job(Job::new("inspect", "probe"));
    job.transition_to(JobStatus::Dispatching).unwrap();
    let mut job = registry.update_job(&job).unwrap();

    assert!(matches!(
        producer.accept_job(&mut job),
        Err(ProducerError::WrongJobType { .. })
    ));
}

#[test]
fn accept_job_on_scripted_registry_sets_running() {
    let producer = JobProducer::new(Encoder::ok(), Arc::new(ScriptedRegistry::new(&[], 4.0)));
    let mut job = Job::new("encode", "mp4")
        .with_id(9)
        .with_status(JobStatus::Dispatching);
    let running = producer.accept_job(&mut job).unwrap();
    assert_eq!(job.status, JobStatus::Running);
    assert_eq!(running.job_id(), 9);
    // The scripted registry forgets jobs, so the worker cannot re-fetch.
    assert!(matches!(
        running.join(),
        Err(ProducerError::Registry(RegistryError::NotFound(9)))
    ));
}

#[test]
fn dispatch_picks_first_ready_producer_of_matching_type() {
    let registry = Arc::new(InMemoryRegistry::new(HOST, 4.0));
    let busy = Encoder::ok();
    busy.ready.store(false, Ordering::SeqCst);
    let busy = JobProducer::new(busy, Arc::clone(&registry));
    let idle = JobProducer::new(Encoder::ok(), Arc::clone(&registry));
    let mut job = registry.create_job(Job::new("encode", "mp4").with_job_load(1.0));

    let running = dispatch_job(registry.as_ref(), &[&busy, &idle], &mut job)
        .unwrap()
        .expect("job should be dispatched");
    assert_eq!(job.status, JobStatus::Running);
    assert_eq!(job.processing_host.as_deref(), Some(HOST));
    assert_eq!(running.join().unwrap().status, JobStatus::Finished);
}

#[test]
fn dispatch_leaves_job_queued_when_rejected() {
    let registry = Arc::new(InMemoryRegistry::new(HOST, 4.0));
    let producer = JobProducer::new(Encoder::ok(), Arc::clone(&registry));
    let mut job = registry.create_job(Job::new("encode", "mp4").with_job_load(4.0));

    assert!(dispatch_job(registry.as_ref(), &[&producer], &mut job)
        .unwrap()
        .is_none());
    assert_eq!(registry.get_job(job.id).unwrap().status, JobStatus::Queued);
}

#[test]
fn dispatch_requires_queued_job() {
    let registry = InMemoryRegistry::new(HOST, 4.0);
    let mut job = Job::new("encode", "mp4").with_status(JobStatus::Running);
    assert!(matches!(
        dispatch_job(&registry, &[], &mut job),
        Err(ProducerError::IllegalState { .. })
    ));
}

#[test]
fn dispatch_skips_producer_whose_admission_check_fails() {
    let registry = Arc::new(InMemoryRegistry::new(HOST, 4.0));
    let cut_off = JobProducer::new(Encoder::ok(), Arc::new(ScriptedRegistry::unreachable()));
    let healthy = JobProducer::new(Encoder::ok(), Arc::clone(&registry));
    let mut job = registry.create_job(Job::new("encode", "mp4").with_job_load(1.0));

    let running = dispatch_job(registry.as_ref(), &[&cut_off, &healthy], &mut job)
        .unwrap()
        .expect("healthy producer should take the job");
    assert_eq!(job.status, JobStatus::Running);
    assert_eq!(running.join().unwrap().status, JobStatus::Finished);
}

#[test]
fn dispatch_with_only_failing_admission_leaves_job_queued() {
    let registry = Arc::new(InMemoryRegistry::new(HOST, 4.0));
    let cut_off = JobProducer::new(Encoder::ok(), Arc::new(ScriptedRegistry::unreachable()));
    let mut job = registry.create_job(Job::new("encode", "mp4").with_job_load(1.0));

    assert!(dispatch_job(registry.as_ref(), &[&cut_off], &mut job)
        .unwrap()
        .is_none());
    assert_eq!(registry.get_job(job.id).unwrap().status, JobStatus::Queued);
}

/// In-memory registry that refuses to store terminal statuses.
#[derive(Debug)]
struct NoCompletionRegistry(InMemoryRegistry);

impl JobRegistry for NoCompletionRegistry {
    fn get_job(&self, id: JobId) -> Result<Job, RegistryError> {
        self.0.get_job(id)
    }

    fn update_job(&self, job: &Job) -> Result<Job, RegistryError> {
        if job.is_terminated() {
            return Err(RegistryError::communication("registry went away"));
        }
        self.0.update_job(job)
    }

    fn count(&self, job_type: &str, status: JobStatus) -> Result<u64, RegistryError> {
        self.0.count(job_type, status)
    }

    fn own_load(&self) -> Result<f32, RegistryError> {
        self.0.own_load()
    }

    fn max_load_on_node(&self, host: &str) -> Result<NodeLoad, RegistryError> {
        self.0.max_load_on_node(host)
    }

    fn registry_hostname(&self) -> Result<String, RegistryError> {
        self.0.registry_hostname()
    }
}

#[test]
fn failed_outcome_update_reaches_join() {
    let registry = Arc::new(NoCompletionRegistry(InMemoryRegistry::new(HOST, 4.0)));
    let producer = JobProducer::new(Encoder::ok(), Arc::clone(&registry));
    let mut job = dispatching_job(&registry.0, 1.0);

    let err = producer.accept_job(&mut job).unwrap().join().unwrap_err();
    assert!(matches!(
        err,
        ProducerError::Registry(RegistryError::Communication { .. })
    ));
    assert_eq!(registry.0.get_job(job.id).unwrap().status, JobStatus::Running);
}
