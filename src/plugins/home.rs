//! Household commands registered directly on the runtime.

use std::thread;
use std::time::Duration;

use chrono::Local;

use super::clock;
use crate::actuator::Actuator;
use crate::error::AppError;
use crate::registry::CommandOutcome;
use crate::runtime::Runtime;

const LAMP: &str = "lamp";
const BLINK: Duration = Duration::from_secs(2);
const SENSITIVITY: f64 = 0.5;

/// Register `toggle_lamp`, `blink_led`, `neat`, `why`, `time` and `date`.
pub fn register_home_commands(runtime: &mut Runtime) -> Result<(), AppError> {
    runtime.register_command("toggle_lamp", toggle_lamp, SENSITIVITY, [], Some("akuwhat"))?;
    runtime.register_command("blink_led", blink_led, SENSITIVITY, [], Some("akuwhat"))?;
    runtime.register_command("neat", neat, SENSITIVITY, [], None)?;
    runtime.register_command("why", why, SENSITIVITY, [], None)?;
    runtime.register_command("time", time, SENSITIVITY, [], Some("thicc"))?;
    runtime.register_command("date", date, SENSITIVITY, [], Some("why"))?;
    Ok(())
}

fn toggle_lamp(actuator: &mut dyn Actuator) -> CommandOutcome {
    actuator.toggle(LAMP)?;
    Ok("Toggled lamp.".into())
}

/// The busy indicator is already lit while a command runs; holding it
/// for a moment is the blink.
fn blink_led() -> CommandOutcome {
    thread::sleep(BLINK);
    Ok("Blinked thinking LED.".into())
}

fn neat(actuator: &mut dyn Actuator) -> CommandOutcome {
    actuator.play_sound("neat")
}

fn why(actuator: &mut dyn Actuator) -> CommandOutcome {
    actuator.play_sound("why")
}

fn time(actuator: &mut dyn Actuator) -> CommandOutcome {
    let to_say = clock::spoken_time(Local::now().naive_local());
    actuator.speak(&to_say)?;
    Ok(to_say)
}

fn date(actuator: &mut dyn Actuator) -> CommandOutcome {
    let to_say = clock::spoken_date(Local::now().naive_local());
    actuator.speak(&to_say)?;
    Ok(to_say)
}
