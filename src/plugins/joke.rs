use reqwest::blocking::Client;
use reqwest::header::ACCEPT;

use crate::actuator::Actuator;
use crate::error::{AppError, CommandFailure, FailureKind};
use crate::registry::{CommandDescriptor, CommandFactory, CommandOutcome, Plugin};
use crate::util::repair_response;

pub const JOKE_URL: &str = "https://icanhazdadjoke.com/";

/// Dad jokes from icanhazdadjoke.com.
pub struct JokePlugin {
    client: Client,
    url: String,
}

impl JokePlugin {
    pub fn new() -> Result<Self, AppError> {
        Self::with_url(JOKE_URL)
    }

    pub fn with_url(url: impl Into<String>) -> Result<Self, AppError> {
        Ok(Self {
            client: super::http_client()?,
            url: url.into(),
        })
    }

    fn fetch(&self) -> Result<String, CommandFailure> {
        let text = self
            .client
            .get(&self.url)
            .header(ACCEPT, "text/plain")
            .send()?
            .error_for_status()?
            .text()?;
        Ok(repair_response(&text))
    }

    fn joke(&self, actuator: &mut dyn Actuator) -> CommandOutcome {
        let to_say = self.fetch()?;
        actuator.speak(&to_say)?;
        Ok(to_say)
    }
}

impl Plugin for JokePlugin {
    fn name(&self) -> &str {
        "joke"
    }

    fn commands(&self, factory: &CommandFactory) -> Result<Vec<CommandDescriptor>, AppError> {
        Ok(vec![factory.create(
            "joke",
            JokePlugin::joke,
            0.5,
            [FailureKind::ConnectionError, FailureKind::NetworkTimeout],
            None,
        )?])
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::registry::BindingKind;
    use crate::testing::RecordingActuator;

    #[test]
    fn exposes_one_bound_command() {
        let plugin = JokePlugin::new().unwrap();
        let commands = plugin
            .commands(&CommandFactory::new(PathBuf::from("sounds")))
            .unwrap();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].name(), "joke");
        assert_eq!(commands[0].binding_kind(), BindingKind::Bound);
        assert!(commands[0].is_recoverable(&FailureKind::ConnectionError));
    }

    #[test]
    fn unreachable_service_is_a_connection_error() {
        let plugin = JokePlugin::with_url("http://127.0.0.1:9/").unwrap();
        let (mut actuator, events) = RecordingActuator::new();
        let err = plugin.joke(&mut actuator).unwrap_err();
        assert_eq!(err.kind, FailureKind::ConnectionError);
        assert!(events.lock().spoken().is_empty());
    }
}
