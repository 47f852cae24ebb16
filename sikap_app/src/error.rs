use sikap_data_management::DataManagerError;

use crate::session::SessionState;

/// Static text shown to the user when an operation hits a dead end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Advisory {
    pub title: &'static str,
    pub message: &'static str,
}

const SIGNAL_HINT: &str = "Please move to a spot with better signal & make sure location services are enabled.";

pub const LOCATION_DENIED: Advisory = Advisory {
    title: "Please allow access to current location",
    message: "Go to your device's Settings, scroll down & tap Sikap, tap Location, then tap - While Using the App.",
};

pub const LOCATION_RESTRICTED: Advisory = Advisory {
    title: "Restricted Access",
    message: "Sorry. You do not have permission to configure this device's settings.",
};

pub const NO_CURRENT_LOCATION: Advisory = Advisory {
    title: "Current Location Not Found!",
    message: SIGNAL_HINT,
};

pub const SEARCH_FAILED: Advisory = Advisory {
    title: "Search Error",
    message: "Nothing matched your search. Please try another place.",
};

pub const DIRECTIONS_FAILED: Advisory = Advisory {
    title: "Location Not Found!",
    message: SIGNAL_HINT,
};

#[derive(Debug, thiserror::Error)]
pub enum SikapError {
    #[error("location access denied")]
    PermissionDenied,
    #[error("location access restricted")]
    Restricted,
    #[error("no current location")]
    NoCurrentLocation,
    #[error("search failed: {0}")]
    SearchFailed(String),
    #[error("directions failed: {0}")]
    DirectionsFailed(String),
    #[error("persistence failed: {0}")]
    Persistence(#[from] DataManagerError),
    #[error("no user is signed in")]
    NotSignedIn,
    #[error("sign in failed: {0}")]
    SignIn(String),
    #[error("cannot {action} while {from:?}")]
    InvalidTransition {
        from: SessionState,
        action: &'static str,
    },
    #[error("configuration error: {0}")]
    Config(String),
}

impl SikapError {
    /// The advisory to show, if this error is one the user gets to see.
    /// Persistence failures are only logged.
    pub fn advisory(&self) -> Option<Advisory> {
        match self {
            SikapError::PermissionDenied => Some(LOCATION_DENIED),
            SikapError::Restricted => Some(LOCATION_RESTRICTED),
            SikapError::NoCurrentLocation => Some(NO_CURRENT_LOCATION),
            SikapError::SearchFailed(_) => Some(SEARCH_FAILED),
            SikapError::DirectionsFailed(_) => Some(DIRECTIONS_FAILED),
            _ => None,
        }
    }
}
