//! Practice the dismissal puzzle without an alarm ringing.

use std::io::BufRead;

use clap::Args;
use mathalarm_core::{Config, Outcome, RngChallengeSource};

#[derive(Args)]
pub struct DrillArgs {
    /// Seed for challenge generation
    #[arg(long)]
    seed: Option<u64>,
}

pub fn run(args: DrillArgs, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let gate = config.alarm_settings()?.puzzle;
    let mut source = RngChallengeSource::new(args.seed);
    let mut session = gate.open(&mut source);

    println!("What is {}?", session.challenge());
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let Ok(answer) = line.trim().parse::<i64>() else {
            println!("Please enter a whole number.");
            continue;
        };
        match session.submit(answer) {
            Outcome::Solved => {
                println!("Solved!");
                return Ok(());
            }
            Outcome::Correct => println!(
                "Correct ({}/{})",
                session.correct_streak(),
                session.required_streak()
            ),
            Outcome::Incorrect => println!("Incorrect answer! Try again."),
        }
        session.next_challenge(gate.new_challenge(&mut source));
        println!("What is {}?", session.challenge());
    }
    Err("input ended before the puzzle was solved".into())
}
