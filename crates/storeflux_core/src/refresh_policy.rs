use std::time::Duration;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RefreshPolicy {
    #[default]
    Manual,
    Interval {
        every_secs: u32,
    },
}

impl RefreshPolicy {
    /// `0` means manual refresh only.
    pub fn from_secs(every_secs: u32) -> Self {
        if every_secs == 0 {
            RefreshPolicy::Manual
        } else {
            RefreshPolicy::Interval { every_secs }
        }
    }

    pub fn every_secs(self) -> Option<u32> {
        match self {
            RefreshPolicy::Manual => None,
            RefreshPolicy::Interval { every_secs } => Some(every_secs),
        }
    }

    pub fn duration(self) -> Option<Duration> {
        self.every_secs()
            .map(|secs| Duration::from_secs(secs as u64))
    }

    pub fn label(self) -> String {
        match self {
            RefreshPolicy::Manual => "off".to_string(),
            RefreshPolicy::Interval { every_secs } => format!("{}s", every_secs),
        }
    }
}
