//! Scripted end-to-end flows against a mock generator.
//!
//! Nothing here touches the network. Run with: `cargo test -p bedtime-core --test story_flow`

use bedtime_core::testing::{assert_calls, assert_last_prompt_contains, candidate, candidate_batch};
use bedtime_core::{
    ContextWindow, MockGenerator, Purpose, ResumeOffer, ScriptedChooser, SerialStoryRecord, Setting,
    StoryOutcome, StoryRequest, StorySession, StoryStore, StoryType, SummaryNegotiator,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn session(mock: &Arc<MockGenerator>, dir: &TempDir, months: u32) -> StorySession {
    let negotiator = SummaryNegotiator::new(mock.clone()).with_backoff(Duration::ZERO);
    StorySession::new(mock.clone(), StoryStore::new(dir.path()), months).with_negotiator(negotiator)
}

fn ocean_record(chapters: u32) -> SerialStoryRecord {
    let mut record = SerialStoryRecord::new(
        "a little fish named Bubbles",
        Setting::Ocean,
        "courage",
        Some(candidate(1)),
        "Chapter 1 text",
    );
    for i in 2..=chapters {
        assert!(record.append_chapter(format!("Chapter {i} text")));
    }
    record
}

// =============================================================================
// New serial story
// =============================================================================

#[tokio::test]
async fn test_new_serial_story_picks_second_candidate() {
    let dir = TempDir::new().unwrap();
    let mock = Arc::new(MockGenerator::new(vec![
        Ok(candidate_batch()),
        Ok("Beibei hops out of the burrow.".to_string()),
    ]));
    let session = session(&mock, &dir, 48);

    let request = StoryRequest::new("a rabbit named Beibei", Setting::Forest, "friendship");
    let mut chooser = ScriptedChooser::picking(2);
    let outcome = session.start_serial(&request, &mut chooser).await.unwrap();

    let record = match outcome {
        StoryOutcome::Created(record) => record,
        other => panic!("expected a new story, got {other:?}"),
    };
    assert_eq!(record.current_chapter, 1);
    assert_eq!(record.chapters, vec!["Beibei hops out of the burrow."]);
    assert_eq!(record.story_summary.as_deref(), Some(candidate(2).as_str()));
    assert_eq!(record.setting, Setting::Forest);

    let requests = mock.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].purpose, Purpose::Summary);
    assert!(requests[0].user_prompt().contains("between 300 and 600 words"));
    assert!(requests[0].user_prompt().contains("4-year-old"));
    assert_eq!(requests[1].purpose, Purpose::Chapter);
    assert_last_prompt_contains(&mock, "chapter 1 of 28");
    assert_last_prompt_contains(&mock, &candidate(2));

    let stored = session.store().load().await.unwrap().unwrap();
    assert_eq!(stored, record);
}

#[tokio::test]
async fn test_failed_first_chapter_keeps_previous_story() {
    let dir = TempDir::new().unwrap();
    let store = StoryStore::new(dir.path());
    let previous = ocean_record(4);
    store.save(&previous).await.unwrap();

    let mock = Arc::new(MockGenerator::new(vec![Ok(candidate_batch())]));
    let session = session(&mock, &dir, 48);

    let request = StoryRequest::new("a dragon", Setting::Castle, "sharing");
    let outcome = session
        .start_serial(&request, &mut ScriptedChooser::picking(1))
        .await
        .unwrap();

    assert_eq!(outcome, StoryOutcome::GenerationFailed);
    assert_eq!(store.load().await.unwrap(), Some(previous));
}

// =============================================================================
// Resuming
// =============================================================================

#[tokio::test]
async fn test_resume_in_same_setting_continues_to_next_chapter() {
    let dir = TempDir::new().unwrap();
    StoryStore::new(dir.path()).save(&ocean_record(10)).await.unwrap();

    let mock = Arc::new(MockGenerator::new(vec![Ok("Chapter 11 text".to_string())]));
    let session = session(&mock, &dir, 30);

    let offer = session
        .resume_offer(StoryType::Serial, Setting::Ocean)
        .await
        .unwrap();
    let mut record = match offer {
        ResumeOffer::InProgress(record) => record,
        other => panic!("expected an in-progress offer, got {other:?}"),
    };

    let chapter = session.continue_serial(&mut record).await.unwrap();

    assert_eq!(chapter.as_deref(), Some("Chapter 11 text"));
    assert_eq!(record.current_chapter, 11);
    assert_eq!(record.character, "a little fish named Bubbles");
    assert_calls(&mock, 1);
    assert_last_prompt_contains(&mock, "chapter 11 of 28");
    assert_last_prompt_contains(&mock, "Chapter 10 text");
    assert_last_prompt_contains(&mock, "a little fish named Bubbles");

    let stored = session.store().load().await.unwrap().unwrap();
    assert_eq!(stored.current_chapter, 11);
    assert_eq!(stored.chapters.len(), 11);
}

#[tokio::test]
async fn test_no_offer_for_other_setting_or_standalone() {
    let dir = TempDir::new().unwrap();
    StoryStore::new(dir.path()).save(&ocean_record(3)).await.unwrap();
    let session = session(&Arc::new(MockGenerator::failing()), &dir, 48);

    let castle = session.resume_offer(StoryType::Serial, Setting::Castle).await.unwrap();
    let standalone = session
        .resume_offer(StoryType::Standalone, Setting::Ocean)
        .await
        .unwrap();

    assert_eq!(castle, ResumeOffer::Fresh);
    assert_eq!(standalone, ResumeOffer::Fresh);
}

#[tokio::test]
async fn test_completed_story_is_offered_for_rereading() {
    let dir = TempDir::new().unwrap();
    StoryStore::new(dir.path()).save(&ocean_record(28)).await.unwrap();
    let mock = Arc::new(MockGenerator::failing());
    let session = session(&mock, &dir, 48);

    let offer = session.resume_offer(StoryType::Serial, Setting::Ocean).await.unwrap();
    let mut record = match offer {
        ResumeOffer::Completed(record) => record,
        other => panic!("expected a completed offer, got {other:?}"),
    };

    assert_eq!(session.continue_serial(&mut record).await.unwrap(), None);
    assert_eq!(record.current_chapter, 28);
    assert_calls(&mock, 0);
}

#[tokio::test]
async fn test_final_chapter_completes_story_with_recent_window() {
    let dir = TempDir::new().unwrap();
    StoryStore::new(dir.path()).save(&ocean_record(27)).await.unwrap();

    let mock = Arc::new(MockGenerator::new(vec![Ok("Chapter 28 text".to_string())]));
    let session = session(&mock, &dir, 48).with_context_window(ContextWindow::Recent(2));

    let mut record = match session.resume_offer(StoryType::Serial, Setting::Ocean).await.unwrap() {
        ResumeOffer::InProgress(record) => record,
        other => panic!("expected an in-progress offer, got {other:?}"),
    };
    let chapter = session.continue_serial(&mut record).await.unwrap();

    assert_eq!(chapter.as_deref(), Some("Chapter 28 text"));
    assert!(record.is_complete());
    assert_last_prompt_contains(&mock, "This is chapter 28 of 28.");
    assert_last_prompt_contains(&mock, "The story so far (chapters 26 to 27):");
    assert_last_prompt_contains(&mock, "Chapter 26 text\nChapter 27 text");
    assert_last_prompt_contains(&mock, "This is the final chapter.");
    assert_last_prompt_contains(&mock, &candidate(1));
    let prompt = mock.last_prompt().unwrap();
    assert!(!prompt.contains("Chapter 25 text"));
    assert!(!prompt.contains("Keep developing the plot"));

    let offer = session.resume_offer(StoryType::Serial, Setting::Ocean).await.unwrap();
    assert!(matches!(offer, ResumeOffer::Completed(ref stored) if stored.chapters.len() == 28));
}

#[tokio::test]
async fn test_story_in_other_setting_is_reported_before_replacing() {
    let dir = TempDir::new().unwrap();
    let previous = ocean_record(6);
    StoryStore::new(dir.path()).save(&previous).await.unwrap();
    let mock = Arc::new(MockGenerator::new(vec![
        Ok(candidate_batch()),
        Ok("A knight wakes in the castle.".to_string()),
    ]));
    let session = session(&mock, &dir, 48);

    let same = session.superseded_story(Setting::Ocean).await.unwrap();
    let other = session.superseded_story(Setting::Castle).await.unwrap();
    assert_eq!(same, None);
    assert_eq!(other.map(|r| r.story_id), Some(previous.story_id));

    let request = StoryRequest::new("a knight", Setting::Castle, "bravery");
    let record = match session
        .start_serial(&request, &mut ScriptedChooser::picking(1))
        .await
        .unwrap()
    {
        StoryOutcome::Created(record) => record,
        other => panic!("expected a new story, got {other:?}"),
    };
    assert_ne!(record.story_id, previous.story_id);
    assert_eq!(session.superseded_story(Setting::Castle).await.unwrap(), None);
    assert_eq!(
        session.superseded_story(Setting::Ocean).await.unwrap().map(|r| r.story_id),
        Some(record.story_id)
    );
}

// =============================================================================
// Failures and bounds
// =============================================================================

#[tokio::test]
async fn test_failed_chapter_leaves_record_unchanged() {
    let dir = TempDir::new().unwrap();
    let store = StoryStore::new(dir.path());
    let original = ocean_record(5);
    store.save(&original).await.unwrap();

    let mock = Arc::new(MockGenerator::failing());
    let session = session(&mock, &dir, 48);

    let mut record = original.clone();
    assert_eq!(session.continue_serial(&mut record).await.unwrap(), None);

    assert_eq!(record, original);
    assert_eq!(store.load().await.unwrap(), Some(original));
    assert_calls(&mock, 1);
}

#[tokio::test]
async fn test_chapter_beyond_arc_is_not_requested() {
    let dir = TempDir::new().unwrap();
    let mock = Arc::new(MockGenerator::new(vec![Ok("unused".to_string())]));
    let session = session(&mock, &dir, 48);

    let chapter = session
        .engine()
        .generate_chapter("BASE", 29, &[], Some("summary"))
        .await;

    assert!(chapter.is_none());
    assert_calls(&mock, 0);
}

// =============================================================================
// Summary negotiation
// =============================================================================

fn negotiator(mock: &Arc<MockGenerator>) -> SummaryNegotiator {
    SummaryNegotiator::new(mock.clone()).with_backoff(Duration::ZERO)
}

#[tokio::test]
async fn test_summary_gives_up_after_bounded_attempts() {
    let invalid = "1. too short\n2. also short\n3. short again".to_string();
    let mock = Arc::new(MockGenerator::new((0..20).map(|_| Ok(invalid.clone())).collect()));

    let outcome = negotiator(&mock)
        .select_summary("BASE", &mut ScriptedChooser::picking(1))
        .await;

    assert_eq!(outcome, bedtime_core::SelectOutcome::Exhausted);
    // three outer attempts of three requests each
    assert_calls(&mock, 9);
}

#[tokio::test]
async fn test_summary_service_failure_is_bounded() {
    let mock = Arc::new(MockGenerator::failing());
    let mut chooser = ScriptedChooser::picking(1);

    let outcome = negotiator(&mock).select_summary("BASE", &mut chooser).await;

    assert_eq!(outcome, bedtime_core::SelectOutcome::Exhausted);
    assert_calls(&mock, 3);
    assert!(chooser.shown().is_empty());
}

#[tokio::test]
async fn test_summary_regenerate_does_not_use_up_attempts() {
    use bedtime_core::SummaryChoice::{Regenerate, Select};

    let mock = Arc::new(MockGenerator::new((0..5).map(|_| Ok(candidate_batch())).collect()));
    let mut chooser = ScriptedChooser::new([Regenerate, Regenerate, Regenerate, Regenerate, Select(2)]);

    let outcome = negotiator(&mock).select_summary("BASE", &mut chooser).await;

    assert_eq!(outcome, bedtime_core::SelectOutcome::Selected(candidate(3)));
    assert_calls(&mock, 5);
    assert_eq!(chooser.shown().len(), 5);
}

#[tokio::test]
async fn test_summary_invalid_pick_asks_again() {
    use bedtime_core::SummaryChoice::Select;

    let mock = Arc::new(MockGenerator::new(vec![Ok(candidate_batch())]));
    let mut chooser = ScriptedChooser::new([Select(7), Select(0)]);

    let outcome = negotiator(&mock).select_summary("BASE", &mut chooser).await;

    assert_eq!(outcome, bedtime_core::SelectOutcome::Selected(candidate(1)));
    assert_eq!(chooser.rejections(), &[Select(7)]);
    assert_calls(&mock, 1);
}

#[tokio::test]
async fn test_summary_quit_aborts_without_story() {
    let dir = TempDir::new().unwrap();
    let mock = Arc::new(MockGenerator::new(vec![Ok(candidate_batch())]));
    let session = session(&mock, &dir, 48);

    let request = StoryRequest::new("a kitten", Setting::ToyWorld, "tidying up");
    let outcome = session
        .standalone(&request, &mut ScriptedChooser::new([bedtime_core::SummaryChoice::Quit]))
        .await;

    assert_eq!(outcome, StoryOutcome::Aborted);
    assert_calls(&mock, 1);
}

#[tokio::test]
async fn test_summary_repeated_candidates_are_regenerated() {
    let mock = Arc::new(MockGenerator::new(vec![
        Ok(format!("1. {}\n2. {}\n3. {}", candidate(1), candidate(2), candidate(1))),
        Ok(candidate_batch()),
    ]));
    let mut chooser = ScriptedChooser::picking(3);

    let outcome = negotiator(&mock).select_summary("BASE", &mut chooser).await;

    assert_eq!(outcome, bedtime_core::SelectOutcome::Selected(candidate(3)));
    assert_calls(&mock, 2);
    assert_eq!(chooser.shown().len(), 1);
}

#[tokio::test]
async fn test_summary_bad_batch_is_regenerated() {
    let mock = Arc::new(MockGenerator::new(vec![
        Ok(format!("1. {}\n2. {}", candidate(1), candidate(2))),
        Ok(candidate_batch()),
    ]));

    let outcome = negotiator(&mock)
        .select_summary("BASE", &mut ScriptedChooser::picking(1))
        .await;

    assert_eq!(outcome, bedtime_core::SelectOutcome::Selected(candidate(1)));
    assert_calls(&mock, 2);
}

// =============================================================================
// Standalone stories and reset
// =============================================================================

#[tokio::test]
async fn test_standalone_story_uses_chosen_summary() {
    let dir = TempDir::new().unwrap();
    let mock = Arc::new(MockGenerator::new(vec![
        Ok(candidate_batch()),
        Ok("The astronaut waves goodnight to the moon.".to_string()),
    ]));
    let session = session(&mock, &dir, 70);

    let request = StoryRequest::new("an astronaut", Setting::Space, "curiosity");
    let outcome = session
        .standalone(&request, &mut ScriptedChooser::picking(3))
        .await;

    assert_eq!(
        outcome,
        StoryOutcome::Created("The astronaut waves goodnight to the moon.".to_string())
    );
    let requests = mock.requests();
    assert_eq!(requests[1].purpose, Purpose::Story);
    assert_last_prompt_contains(&mock, &candidate(3));
    assert_last_prompt_contains(&mock, "between 600 and 1000 words");
    // standalone stories are never persisted
    assert_eq!(session.store().load().await.unwrap(), None);
}

#[tokio::test]
async fn test_reset_removes_everything() {
    let dir = TempDir::new().unwrap();
    let store = StoryStore::new(dir.path());
    store.save(&ocean_record(2)).await.unwrap();
    store
        .save_profile(&bedtime_core::ChildProfile::recorded_today(40, "girl"))
        .await
        .unwrap();

    let report = store.reset().await.unwrap();
    assert!(report.profile_removed && report.serial_removed);
    assert_eq!(store.load().await.unwrap(), None);
    assert_eq!(store.load_profile().await.unwrap(), None);

    let again = store.reset().await.unwrap();
    assert!(!again.profile_removed && !again.serial_removed);
}
