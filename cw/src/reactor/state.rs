//! Display state

use crate::status::RepoStatus;

/// What the view shows; the only input to rendering
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DisplayState {
    /// Nothing announced yet
    #[default]
    Idle,
    /// Target is a repository and `status` is its latest snapshot
    Watching { target: String, status: RepoStatus },
    /// Target was announced but cannot be watched
    Unwatchable { target: String, reason: String },
}

impl DisplayState {
    /// The announced path, if any
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::Idle => None,
            Self::Watching { target, .. } | Self::Unwatchable { target, .. } => Some(target),
        }
    }

    pub fn is_watching(&self, path: &str) -> bool {
        matches!(self, Self::Watching { target, .. } if target == path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_idle() {
        assert_eq!(DisplayState::default(), DisplayState::Idle);
        assert_eq!(DisplayState::Idle.target(), None);
    }

    #[test]
    fn test_target_and_is_watching() {
        let watching = DisplayState::Watching {
            target: "/repo".to_string(),
            status: RepoStatus::default(),
        };
        assert_eq!(watching.target(), Some("/repo"));
        assert!(watching.is_watching("/repo"));
        assert!(!watching.is_watching("/other"));

        let unwatchable = DisplayState::Unwatchable {
            target: "/tmp/x".to_string(),
            reason: "nope".to_string(),
        };
        assert_eq!(unwatchable.target(), Some("/tmp/x"));
        assert!(!unwatchable.is_watching("/tmp/x"));
    }
}
