use super::*;
use shared::error::ErrorCode;

#[test]
fn showcase_passes_validation() {
    let showcase = StoryTable::showcase();
    let validated =
        StoryTable::new(4, showcase.phases().to_vec()).expect("showcase table validates");
    assert_eq!(validated, showcase);
    assert_eq!(showcase.total_parts(), 8);
}

#[test]
fn segment_of_is_non_decreasing_across_all_parts() {
    for table in [
        StoryTable::showcase(),
        StoryTable::uniform(5).expect("uniform"),
    ] {
        let segments: Vec<usize> = (0..table.total_parts())
            .map(|part| table.segment_of(PartIndex(part)).expect("mapped part").0)
            .collect();
        assert!(segments.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(segments.first(), Some(&0));
        assert_eq!(segments.last(), Some(&(table.segment_count() - 1)));
    }
}

#[test]
fn showcase_first_parts_match_segment_boundaries() {
    let table = StoryTable::showcase();
    let firsts: Vec<usize> = (0..4)
        .map(|segment| table.first_part_of(SegmentIndex(segment)).expect("mapped").0)
        .collect();
    assert_eq!(firsts, vec![0, 3, 6, 7]);

    let boundaries: Vec<usize> = (0..table.total_parts())
        .filter(|part| table.is_segment_boundary(PartIndex(*part)))
        .collect();
    assert_eq!(boundaries, firsts);
}

#[test]
fn unmapped_lookups_are_rejected() {
    let table = StoryTable::showcase();
    let err = table.segment_of(PartIndex(8)).expect_err("past the end");
    assert_eq!(err.code(), ErrorCode::InvalidPart);

    let err = table.first_part_of(SegmentIndex(4)).expect_err("no such segment");
    assert_eq!(
        err,
        SequencerError::InvalidSegmentIndex {
            index: SegmentIndex(4),
            segment_count: 4
        }
    );
}

#[test]
fn rejects_segment_without_phases() {
    let phases = vec![
        PhaseDescriptor::begin(0, 0, AdvanceTrigger::SegmentCompleted),
        PhaseDescriptor::begin(2, 2, AdvanceTrigger::SegmentCompleted),
    ];
    let err = StoryTable::new(3, phases).expect_err("segment 1 missing");
    assert_eq!(err.code(), ErrorCode::InvalidConfig);
}

#[test]
fn rejects_decreasing_segments() {
    let phases = vec![
        PhaseDescriptor::begin(0, 0, AdvanceTrigger::SegmentCompleted),
        PhaseDescriptor::begin(1, 1, AdvanceTrigger::SegmentCompleted),
        PhaseDescriptor::fade_out(0, FadeTarget::Description),
    ];
    assert!(StoryTable::new(2, phases).is_err());
}

#[test]
fn rejects_segment_opened_by_a_fade() {
    let phases = vec![
        PhaseDescriptor::begin(0, 0, AdvanceTrigger::SegmentCompleted),
        PhaseDescriptor::fade_out(1, FadeTarget::Section),
    ];
    assert!(StoryTable::new(2, phases).is_err());
}

#[test]
fn rejects_begin_segment_waiting_for_a_fade() {
    let phases = vec![PhaseDescriptor::begin(0, 0, AdvanceTrigger::FadeFinished)];
    assert!(StoryTable::new(1, phases).is_err());
}

#[test]
fn rejects_waiting_on_an_animation_that_was_swapped_out() {
    let phases = vec![
        PhaseDescriptor::begin(0, 0, AdvanceTrigger::SegmentCompleted),
        PhaseDescriptor::swap_and_fade_in(
            0,
            FadeTarget::Description,
            1,
            AdvanceTrigger::FadeFinished,
        ),
        PhaseDescriptor::fade_out(0, FadeTarget::Section),
    ];
    let mut stalled = phases.clone();
    stalled[2].advance_on = AdvanceTrigger::AnimationFinished;
    let err = StoryTable::new(1, stalled).expect_err("animation never replays");
    assert_eq!(err.code(), ErrorCode::InvalidConfig);
    assert!(err.to_string().contains("part 2"), "{err}");

    let swap_waiting_on_itself = vec![
        PhaseDescriptor::begin(0, 0, AdvanceTrigger::SegmentCompleted),
        PhaseDescriptor::swap_and_fade_in(
            0,
            FadeTarget::Section,
            1,
            AdvanceTrigger::AnimationFinished,
        ),
    ];
    assert!(StoryTable::new(1, swap_waiting_on_itself).is_err());

    // A description-only swap leaves the segment's animation running.
    let mut description_only = phases;
    description_only[1].animation = None;
    description_only[2].advance_on = AdvanceTrigger::AnimationFinished;
    assert!(StoryTable::new(1, description_only).is_ok());
}

#[test]
fn rejects_out_of_range_and_uncovered_segments() {
    let phases = vec![PhaseDescriptor::begin(0, 0, AdvanceTrigger::SegmentCompleted)];
    assert!(StoryTable::new(2, phases.clone()).is_err());

    let phases = vec![
        PhaseDescriptor::begin(0, 0, AdvanceTrigger::SegmentCompleted),
        PhaseDescriptor::begin(1, 1, AdvanceTrigger::SegmentCompleted),
    ];
    assert!(StoryTable::new(1, phases).is_err());
    assert!(StoryTable::uniform(0).is_err());
}

#[test]
fn parses_phase_table_from_toml() {
    let raw = r#"
segment_count = 2

[[phases]]
segment = 0
action = { kind = "begin_segment" }
description = 0
animation = 0
advance_on = "segment_completed"

[[phases]]
segment = 0
action = { kind = "fade_out", target = "section" }
advance_on = "fade_finished"

[[phases]]
segment = 1
action = { kind = "begin_segment" }
description = 1
animation = 1
advance_on = "animation_finished"
"#;
    let table = StoryTable::from_toml_str(raw).expect("valid table");
    assert_eq!(table.total_parts(), 3);
    assert_eq!(
        table.phase(PartIndex(1)).map(|phase| phase.action),
        Some(PhaseAction::FadeOut {
            target: FadeTarget::Section
        })
    );
    assert_eq!(table.first_part_of(SegmentIndex(1)), Ok(PartIndex(2)));
}

#[test]
fn invalid_toml_table_surfaces_validation_message() {
    let raw = r#"
segment_count = 2

[[phases]]
segment = 0
action = { kind = "begin_segment" }
description = 0
animation = 0
advance_on = "segment_completed"
"#;
    let err = StoryTable::from_toml_str(raw).expect_err("segment 1 uncovered");
    assert_eq!(err.code(), ErrorCode::InvalidConfig);
    assert!(err.to_string().contains("1 of 2 segments"), "{err}");
}
