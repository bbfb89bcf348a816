use fail::FailScenario;

/// Guard that keeps a set of failpoints configured for the duration of a
/// test.
///
/// Dropping the guard switches every configured failpoint off again, so
/// faults never leak into other tests running in the same process.
pub struct FailpointGuard<'a> {
    _scenario: FailScenario<'a>,
    names: Vec<String>,
}

/// Configures the given `(failpoint, action)` pairs and returns the guard
/// that owns them.
pub fn with_failpoints<'a>(points: &[(&str, &str)]) -> FailpointGuard<'a> {
    let scenario = FailScenario::setup();
    let mut names = Vec::with_capacity(points.len());

    for &(name, action) in points {
        fail::cfg(name, action).expect("failpoint action is valid");
        names.push(name.to_string());
    }

    FailpointGuard {
        _scenario: scenario,
        names,
    }
}

impl Drop for FailpointGuard<'_> {
    fn drop(&mut self) {
        for name in &self.names {
            let _ = fail::cfg(name.as_str(), "off");
        }
    }
}
