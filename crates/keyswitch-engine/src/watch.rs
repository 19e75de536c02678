//! Permission transitions.

/// A change in permission state worth acting on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionChange {
    /// Everything needed is now granted; (re)start the tap.
    Granted,
    /// Something was revoked or is still missing at first check.
    Revoked {
        /// Names of the missing permissions.
        missing: Vec<&'static str>,
    },
}

/// Turns periodic permission checks into edge-triggered changes.
#[derive(Debug, Default)]
pub struct PermissionWatcher {
    /// Missing permissions at the last check; `None` before the first.
    last: Option<Vec<&'static str>>,
}

impl PermissionWatcher {
    /// Watcher that reports the first observation as a change.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a check. Returns a change when the grant state flipped or the
    /// set of missing permissions changed.
    pub fn observe(&mut self, missing: Vec<&'static str>) -> Option<PermissionChange> {
        if self.last.as_ref() == Some(&missing) {
            return None;
        }
        self.last = Some(missing.clone());
        Some(if missing.is_empty() {
            PermissionChange::Granted
        } else {
            PermissionChange::Revoked { missing }
        })
    }

    /// True when the last check found everything granted.
    pub fn granted(&self) -> bool {
        self.last.as_ref().is_some_and(Vec::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_edges_only() {
        let mut w = PermissionWatcher::new();
        assert!(!w.granted());
        assert_eq!(
            w.observe(vec!["Accessibility"]),
            Some(PermissionChange::Revoked {
                missing: vec!["Accessibility"]
            })
        );
        assert_eq!(w.observe(vec!["Accessibility"]), None);
        assert_eq!(w.observe(vec![]), Some(PermissionChange::Granted));
        assert!(w.granted());
        assert_eq!(w.observe(vec![]), None);
        assert!(matches!(
            w.observe(vec!["Input Monitoring"]),
            Some(PermissionChange::Revoked { .. })
        ));
    }
}
