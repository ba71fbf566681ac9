use serde::Serialize;
use std::fmt;

/// The notices a front end shows the user. Rendering is up to the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Alert {
    NotAuthorizedToRequestLocation,
    FailedToRequestLocation,
    NoWeatherDataAvailable,
}

impl Alert {
    pub fn title(&self) -> &'static str {
        match self {
            Alert::NotAuthorizedToRequestLocation | Alert::FailedToRequestLocation => {
                "Unable to Fetch Weather Data for Your Location"
            }
            Alert::NoWeatherDataAvailable => "Unable to Fetch Weather Data",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Alert::NotAuthorizedToRequestLocation => {
                "wherecast is not authorized to access your current location. \
                 You can grant access to your current location in the settings."
            }
            Alert::FailedToRequestLocation => {
                "wherecast is not able to fetch your current location due to a technical issue."
            }
            Alert::NoWeatherDataAvailable => {
                "wherecast is unable to fetch weather data. \
                 Please make sure your device is connected to the network."
            }
        }
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title(), self.message())
    }
}
