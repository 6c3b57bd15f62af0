//! Foreground alarm clock.
//!
//! Owns the 1 Hz tick and reads commands from stdin. Every scheduler event
//! is printed to stdout as one JSON line; prompts and warnings go to stderr.

use std::str::FromStr;
use std::time::Duration;

use clap::Args;
use mathalarm_core::{
    AlarmId, AlarmScheduler, AlarmTime, ChallengeSource, Clock, Config, Event, Outcome, Player,
    RngChallengeSource, SoundRef, SystemClock,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::MissedTickBehavior;

use crate::player::{TerminalPlayer, BUILTIN_BELL};

type Scheduler = AlarmScheduler<SystemClock, TerminalPlayer, RngChallengeSource>;

#[derive(Args)]
pub struct RunArgs {
    /// Alarm to set at startup (repeatable)
    #[arg(long = "at", value_name = "HH:MM[=SOUND]")]
    alarms: Vec<AlarmSpec>,
    /// Seed for challenge generation
    #[arg(long)]
    seed: Option<u64>,
}

/// `HH:MM` optionally followed by `=SOUND`.
#[derive(Debug, Clone, PartialEq)]
pub struct AlarmSpec {
    time: AlarmTime,
    sound: Option<SoundRef>,
}

impl FromStr for AlarmSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (time, sound) = match s.split_once('=') {
            Some((t, snd)) if !snd.is_empty() => (t, Some(SoundRef::new(snd))),
            Some((t, _)) => (t, None),
            None => (s, None),
        };
        let time = time.parse().map_err(|e| format!("{e}"))?;
        Ok(Self { time, sound })
    }
}

/// One line of stdin input.
#[derive(Debug, Clone, PartialEq)]
pub enum HostCommand {
    Add {
        time: AlarmTime,
        sound: Option<SoundRef>,
    },
    Edit {
        id: AlarmId,
        time: Option<AlarmTime>,
        sound: Option<SoundRef>,
    },
    Remove(AlarmId),
    Enable(AlarmId),
    Disable(AlarmId),
    DefaultSound(SoundRef),
    List,
    Answer {
        id: AlarmId,
        value: i64,
    },
    Quit,
}

const USAGE: &str = "commands: add HH:MM [SOUND] | edit ID HH:MM|- [SOUND] | rm ID | enable ID | \
                     disable ID | default SOUND | list | answer ID VALUE | quit";

fn parse_id(word: Option<&str>) -> Result<AlarmId, String> {
    let word = word.ok_or("missing alarm id")?;
    word.parse().map_err(|_| format!("invalid alarm id '{word}'"))
}

fn parse_time(word: Option<&str>) -> Result<AlarmTime, String> {
    word.ok_or("missing time")?
        .parse()
        .map_err(|e| format!("{e}"))
}

impl FromStr for HostCommand {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let verb = words.next().ok_or_else(|| USAGE.to_string())?;
        let cmd = match verb {
            "add" => HostCommand::Add {
                time: parse_time(words.next())?,
                sound: words.next().map(SoundRef::new),
            },
            "edit" => {
                let id = parse_id(words.next())?;
                let time = match words.next() {
                    Some("-") | None => None,
                    Some(t) => Some(parse_time(Some(t))?),
                };
                HostCommand::Edit {
                    id,
                    time,
                    sound: words.next().map(SoundRef::new),
                }
            }
            "rm" | "remove" => HostCommand::Remove(parse_id(words.next())?),
            "enable" => HostCommand::Enable(parse_id(words.next())?),
            "disable" => HostCommand::Disable(parse_id(words.next())?),
            "default" => HostCommand::DefaultSound(SoundRef::new(
                words.next().ok_or("missing sound")?,
            )),
            "list" | "ls" => HostCommand::List,
            "answer" | "a" => {
                let id = parse_id(words.next())?;
                let raw = words.next().ok_or("missing answer")?;
                let value = raw
                    .parse()
                    .map_err(|_| format!("answer '{raw}' is not a whole number"))?;
                HostCommand::Answer { id, value }
            }
            "quit" | "exit" => HostCommand::Quit,
            _ => return Err(USAGE.to_string()),
        };
        if let Some(extra) = words.next() {
            return Err(format!("unexpected '{extra}'"));
        }
        Ok(cmd)
    }
}

/// Whether the host should keep running after a command.
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

fn apply<C: Clock, P: Player, R: ChallengeSource>(
    scheduler: &mut AlarmScheduler<C, P, R>,
    cmd: HostCommand,
) -> Result<Flow, Box<dyn std::error::Error>> {
    match cmd {
        HostCommand::Add { time, sound } => {
            scheduler.add_alarm(time, sound);
        }
        HostCommand::Edit { id, time, sound } => {
            if !scheduler.edit_alarm(id, time, sound) {
                eprintln!("no alarm {id}");
            }
        }
        HostCommand::Remove(id) => {
            if !scheduler.remove_alarm(id) {
                eprintln!("no alarm {id}");
            }
        }
        HostCommand::Enable(id) => {
            if !scheduler.set_enabled(id, true) {
                eprintln!("no alarm {id}");
            }
        }
        HostCommand::Disable(id) => {
            if !scheduler.set_enabled(id, false) {
                eprintln!("no alarm {id}");
            }
        }
        HostCommand::DefaultSound(sound) => scheduler.set_default_sound(sound),
        HostCommand::List => {
            println!("{}", serde_json::to_string(&scheduler.snapshot())?);
        }
        HostCommand::Answer { id, value } => match scheduler.submit_answer(id, value) {
            Ok(Outcome::Solved) => eprintln!("alarm {id} dismissed"),
            Ok(Outcome::Correct) => eprintln!("correct"),
            Ok(Outcome::Incorrect) => eprintln!("incorrect answer, streak reset"),
            Err(e) => eprintln!("{e}"),
        },
        HostCommand::Quit => {
            // The puzzle has no way out; neither does the host.
            if scheduler.alarms().iter().any(|a| a.state().is_active()) {
                eprintln!("an alarm is ringing; solve it before quitting");
            } else {
                return Ok(Flow::Quit);
            }
        }
    }
    Ok(Flow::Continue)
}

fn report(scheduler: &mut Scheduler) -> Result<(), Box<dyn std::error::Error>> {
    for event in scheduler.drain_events() {
        println!("{}", serde_json::to_string(&event)?);
        match &event {
            Event::ChallengeIssued {
                id,
                a,
                b,
                correct_streak,
                ..
            } => {
                let need = scheduler
                    .session(*id)
                    .map(|s| s.required_streak())
                    .unwrap_or_default();
                eprintln!(
                    "alarm {id}: what is {a} * {b}? ({correct_streak}/{need}) -> answer {id} <value>"
                );
            }
            Event::AlarmEscalated { id, .. } => {
                eprintln!("alarm {id} ignored for too long, siren on");
            }
            Event::SoundDegraded { sound, reason, .. } => {
                eprintln!("warning: cannot play {sound} ({reason}); ringing silently");
            }
            _ => {}
        }
    }
    Ok(())
}

async fn host_loop(mut scheduler: Scheduler) -> Result<(), Box<dyn std::error::Error>> {
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    eprintln!("{USAGE}");
    report(&mut scheduler)?;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                scheduler.on_tick();
                scheduler.player().render()?;
            }
            line = lines.next_line(), if stdin_open => match line? {
                Some(line) if line.trim().is_empty() => {}
                Some(line) => match line.parse::<HostCommand>() {
                    Ok(cmd) => {
                        if apply(&mut scheduler, cmd)? == Flow::Quit {
                            break;
                        }
                    }
                    Err(e) => eprintln!("{e}"),
                },
                None => {
                    stdin_open = false;
                    if !scheduler.alarms().iter().any(|a| a.state().is_active()) {
                        break;
                    }
                    tracing::warn!("stdin closed while an alarm is ringing");
                }
            },
        }
        report(&mut scheduler)?;
        if !stdin_open && !scheduler.alarms().iter().any(|a| a.state().is_active()) {
            break;
        }
    }
    report(&mut scheduler)
}

pub fn run(args: RunArgs, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut settings = config.alarm_settings()?;
    for sound in [&mut settings.default_sound, &mut settings.siren_sound] {
        if !std::path::Path::new(sound.as_str()).is_file() {
            tracing::info!("{} not found, using the terminal bell", sound);
            *sound = SoundRef::new(BUILTIN_BELL);
        }
    }
    let mut scheduler = AlarmScheduler::new(
        SystemClock,
        TerminalPlayer::new(),
        RngChallengeSource::new(args.seed),
        settings,
    );
    for spec in args.alarms {
        scheduler.add_alarm(spec.time, spec.sound);
    }

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(host_loop(scheduler))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mathalarm_core::{ManualClock, MemoryPlayer, ScriptedSource};

    fn t(h: u8, m: u8) -> AlarmTime {
        AlarmTime::new(h, m).unwrap()
    }

    #[test]
    fn parse_alarm_spec() {
        assert_eq!(
            "06:30".parse::<AlarmSpec>().unwrap(),
            AlarmSpec {
                time: t(6, 30),
                sound: None
            }
        );
        assert_eq!(
            "06:30=birds.ogg".parse::<AlarmSpec>().unwrap(),
            AlarmSpec {
                time: t(6, 30),
                sound: Some(SoundRef::new("birds.ogg"))
            }
        );
        assert!("6h30".parse::<AlarmSpec>().is_err());
    }

    #[test]
    fn parse_host_commands() {
        assert_eq!(
            "add 07:15 bell".parse::<HostCommand>().unwrap(),
            HostCommand::Add {
                time: t(7, 15),
                sound: Some(SoundRef::new("bell"))
            }
        );
        assert_eq!(
            "edit 2 - chime.wav".parse::<HostCommand>().unwrap(),
            HostCommand::Edit {
                id: AlarmId(2),
                time: None,
                sound: Some(SoundRef::new("chime.wav"))
            }
        );
        assert_eq!(
            "answer 1 -4".parse::<HostCommand>().unwrap(),
            HostCommand::Answer {
                id: AlarmId(1),
                value: -4
            }
        );
        assert_eq!("rm 3".parse::<HostCommand>().unwrap(), HostCommand::Remove(AlarmId(3)));
        assert_eq!("list".parse::<HostCommand>().unwrap(), HostCommand::List);
        assert_eq!("quit".parse::<HostCommand>().unwrap(), HostCommand::Quit);
    }

    #[test]
    fn reject_bad_host_commands() {
        for line in [
            "",
            "snooze 1",
            "add 25:00",
            "add",
            "answer 1",
            "answer x 5",
            "answer 1 1.5",
            "disable",
            "list now",
        ] {
            assert!(line.parse::<HostCommand>().is_err(), "accepted '{line}'");
        }
    }

    #[test]
    fn quit_is_refused_while_ringing() {
        let mut scheduler = AlarmScheduler::new(
            ManualClock::new(t(6, 0)),
            MemoryPlayer::new(),
            ScriptedSource::new([2, 5]),
            Default::default(),
        );
        assert_eq!(apply(&mut scheduler, HostCommand::Quit).unwrap(), Flow::Quit);

        let id = scheduler.add_alarm(t(6, 0), None);
        scheduler.on_tick();
        assert!(scheduler.alarm(id).unwrap().state().is_active());
        assert_eq!(
            apply(&mut scheduler, HostCommand::Quit).unwrap(),
            Flow::Continue
        );

        for _ in 0..3 {
            let answer = HostCommand::Answer { id, value: 10 };
            assert_eq!(apply(&mut scheduler, answer).unwrap(), Flow::Continue);
        }
        assert!(!scheduler.alarm(id).unwrap().state().is_active());
        assert_eq!(apply(&mut scheduler, HostCommand::Quit).unwrap(), Flow::Quit);
    }
}
