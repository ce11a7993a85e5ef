//! Load-based admission rule.

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Accept,
    /// Own load plus job load reaches the node's maximum.
    RejectOverloaded,
    /// The job alone meets or exceeds the node's maximum and oversize jobs are not accepted.
    RejectOversize,
}

impl Admission {
    pub fn is_accepted(self) -> bool {
        matches!(self, Admission::Accept)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Admission::Accept => "accept",
            Admission::RejectOverloaded => "reject (node overloaded)",
            Admission::RejectOversize => "reject (job exceeds max load)",
        }
    }
}

impl std::fmt::Display for Admission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decides whether a job with `job_load` fits on a node currently at `own_load`
/// with configured `max_load`.
///
/// Without `accept_oversize`: accept iff `own + job < max` and `job < max`.
/// With it: accept iff `own + job < max` or `job >= max`, so a job that could
/// never fit even on an idle node is not starved.
///
/// The strict `<` on the projected load and the inclusive `>=` on the oversize
/// test are intentional: a job whose load equals the maximum is rejected by
/// default and accepted in oversize mode.
pub fn decide(own_load: f32, job_load: f32, max_load: f32, accept_oversize: bool) -> Admission {
    let fits = own_load + job_load < max_load;
    let oversize = job_load >= max_load;
    match (accept_oversize, fits, oversize) {
        (true, _, true) => Admission::Accept,
        (_, true, false) => Admission::Accept,
        (false, _, true) => Admission::RejectOversize,
        (_, false, false) => Admission::RejectOverloaded,
    }
}
