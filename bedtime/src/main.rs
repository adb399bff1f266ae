//! Bedtime story teller.
//!
//! Asks a few questions about the child and the story, then writes either a
//! standalone story or the next chapter of a 28-chapter serial.
//!
//! ```bash
//! RUST_LOG=bedtime_core=info cargo run -p bedtime
//! ```

mod menu;

use anyhow::Context;
use bedtime_core::{
    parse_age_input, ChildProfile, ResumeChoice, ResumeOffer, SerialStoryRecord, Setting,
    StoryConfig, StoryOutcome, StoryRequest, StorySession, StoryStore, StoryType, TOTAL_CHAPTERS,
};
use menu::Console;
use std::io::{BufRead, Write};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let mut console = Console::stdio();
    match run(&mut console).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            eprintln!("Please check your network connection and Azure configuration.");
            ExitCode::FAILURE
        }
    }
}

async fn run<R: BufRead, W: Write>(console: &mut Console<R, W>) -> anyhow::Result<ExitCode> {
    let config = StoryConfig::from_env()?;
    let store = StoryStore::new(&config.data_dir);

    console.say("\nTip: answer y to re-enter the child's age and gender.")?;
    if console.yes("Reset the child's information? (y/n, Enter to keep): ")? {
        let report = store.reset().await?;
        console.say(report.to_string())?;
        console.say("Please enter the child's details again.")?;
    }

    let profile = match store.load_profile().await? {
        Some(profile) => profile,
        None => {
            let age = console.ask("Child's age (for example 3y6m, or 3岁6个月): ")?;
            let months = match parse_age_input(&age) {
                Ok(months) => months,
                Err(e) => {
                    console.say(format!("Error: {e}"))?;
                    return Ok(ExitCode::from(2));
                }
            };
            let gender = console.ask("Child's gender: ")?;
            let profile = ChildProfile::recorded_today(months, gender);
            store.save_profile(&profile).await?;
            profile
        }
    };

    let months = profile.current_months();
    console.say(format!(
        "Child's current age: {} years {} months",
        months / 12,
        months % 12
    ))?;

    let session = StorySession::from_config(&config, store, months)
        .context("could not set up the story services")?;

    let story_type = ask_story_type(console)?;
    let setting = ask_setting(console)?;

    if story_type == StoryType::Serial {
        let offer = session.resume_offer(story_type, setting).await?;
        if let Some(code) = handle_resume(console, &session, offer).await? {
            return Ok(code);
        }
        if let Some(previous) = session.superseded_story(setting).await? {
            console.say(replacement_warning(&previous))?;
            if !console.yes("Start a new story anyway? (y/n): ")? {
                console.say("Goodbye!")?;
                return Ok(ExitCode::SUCCESS);
            }
            tracing::info!(story_id = %previous.story_id, "replacing stored serial story");
        }
    }

    let request = ask_story_request(console, setting)?;

    match story_type {
        StoryType::Standalone => {
            let story = match session.standalone(&request, console).await {
                StoryOutcome::Created(story) => story,
                other => return report_outcome(console, other),
            };
            console.say(format!("\n=== Bedtime Story ===\n{story}\n"))?;
            offer_narration(console, &session, &story, "story").await?;
        }
        StoryType::Serial => {
            console.say("\nStarting a new serial story.")?;
            console.say(format!(
                "It has {TOTAL_CHAPTERS} chapters, and each one continues the last."
            ))?;
            let record = match session.start_serial(&request, console).await? {
                StoryOutcome::Created(record) => record,
                other => return report_outcome(console, other),
            };
            show_latest_chapter(console, &session, &record).await?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn ask_story_type<R: BufRead, W: Write>(console: &mut Console<R, W>) -> anyhow::Result<StoryType> {
    console.say("\nChoose a story type:")?;
    console.say("1. Standalone story")?;
    console.say(format!("2. Serial story ({TOTAL_CHAPTERS} chapters)"))?;

    let choice = console.number("\nYour choice (1-2): ", 1..=2)?;
    StoryType::from_menu(choice).context("story type out of range")
}

fn ask_setting<R: BufRead, W: Write>(console: &mut Console<R, W>) -> anyhow::Result<Setting> {
    console.say("\nChoose where the story takes place:")?;
    for (i, setting) in Setting::ALL.iter().enumerate() {
        console.say(format!("{}. {}", i + 1, setting.name()))?;
    }

    loop {
        let choice = console.number("\nSetting number (1-6): ", 1..=Setting::ALL.len())?;
        let setting = Setting::from_menu(choice).context("setting out of range")?;
        console.say(format!("\nSetting chosen: {}", setting.name()))?;
        if !console.yes("Change the setting? (y/n, Enter to keep): ")? {
            return Ok(setting);
        }
    }
}

fn ask_story_request<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    setting: Setting,
) -> anyhow::Result<StoryRequest> {
    let kind = console.ask_non_empty(&format!(
        "Main character type (for example: {}): ",
        setting.character_hint()
    ))?;
    let name = console.ask_non_empty(&format!("Give the {kind} a name: "))?;
    let elements = console.ask_non_empty("Story elements (for example: friendship, courage, music): ")?;

    Ok(StoryRequest::new(format!("{kind} {name}"), setting, elements))
}

/// Returns an exit code when the flow ends here, `None` to go on to a new story.
async fn handle_resume<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    session: &StorySession,
    offer: ResumeOffer,
) -> anyhow::Result<Option<ExitCode>> {
    let choices = offer.choices();
    let mut record = match offer {
        ResumeOffer::Fresh => return Ok(None),
        ResumeOffer::InProgress(record) => {
            console.say("\nFound a serial story in this setting!")?;
            record
        }
        ResumeOffer::Completed(record) => {
            console.say("\nFound a finished serial story in this setting!")?;
            record
        }
    };
    console.say(record.progress())?;

    console.say("Please choose:")?;
    for (i, choice) in choices.iter().enumerate() {
        console.say(format!("{}. {}", i + 1, describe(*choice)))?;
    }
    let picked = console.number(&format!("\nYour choice (1-{}): ", choices.len()), 1..=choices.len())?;

    match choices[picked - 1] {
        ResumeChoice::StartNew => Ok(None),
        ResumeChoice::Continue => {
            console.say("\nWriting the next chapter, please wait...")?;
            match session.continue_serial(&mut record).await? {
                Some(_) => show_latest_chapter(console, session, &record).await?,
                None => console.say("Sorry, the next chapter could not be written this time.")?,
            }
            Ok(Some(ExitCode::SUCCESS))
        }
        ResumeChoice::Reread => {
            console.say(format!("\n=== The Whole Story ===\n{}", record.full_text()))?;
            offer_narration(console, session, &record.full_text(), "story").await?;
            Ok(Some(ExitCode::SUCCESS))
        }
        ResumeChoice::ViewFullText => {
            console.say(format!("\n=== The Whole Story ===\n{}", record.full_text()))?;
            Ok(Some(ExitCode::SUCCESS))
        }
    }
}

fn replacement_warning(previous: &SerialStoryRecord) -> String {
    format!(
        "\nNote: a new serial story replaces the saved {} story about {} \
         (story {}, chapter {} of {TOTAL_CHAPTERS}).",
        previous.setting,
        previous.character,
        previous.short_id(),
        previous.current_chapter
    )
}

fn describe(choice: ResumeChoice) -> &'static str {
    match choice {
        ResumeChoice::Continue => "Continue this story",
        ResumeChoice::Reread => "Read this story again",
        ResumeChoice::StartNew => "Start a brand new story",
        ResumeChoice::ViewFullText => "View the full story",
    }
}

async fn show_latest_chapter<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    session: &StorySession,
    record: &SerialStoryRecord,
) -> anyhow::Result<()> {
    let Some(text) = record.chapters.last() else {
        return Ok(());
    };
    let number = record.current_chapter;
    console.say(format!("\n=== Chapter {number} ===\n{text}\n"))?;
    if record.is_complete() {
        console.say("The End. This story is complete.")?;
    }
    offer_narration(console, session, text, &format!("chapter{number}")).await
}

async fn offer_narration<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    session: &StorySession,
    text: &str,
    prefix: &str,
) -> anyhow::Result<()> {
    if !session.can_narrate() || !console.yes("Create an audio version? (y/n): ")? {
        return Ok(());
    }

    match session.narrate(text, prefix).await {
        Some(Ok(path)) => console.say(format!("Audio saved to {}", path.display()))?,
        Some(Err(e)) => console.say(format!("Audio could not be created: {e}"))?,
        None => {}
    }
    Ok(())
}

fn report_outcome<T, R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    outcome: StoryOutcome<T>,
) -> anyhow::Result<ExitCode> {
    match outcome {
        StoryOutcome::Created(_) => {}
        StoryOutcome::Aborted => console.say("Goodbye!")?,
        StoryOutcome::NoSummary => {
            console.say("Could not get usable story summaries. Please try again later.")?
        }
        StoryOutcome::GenerationFailed => {
            console.say("Sorry, the story could not be written this time.")?
        }
    }
    Ok(ExitCode::SUCCESS)
}
